//! Working-copy editing of one bank and its programs.
//!
//! A session owns a deep copy of the bank taken when it opens. Edits only
//! touch that copy; [`EditorSession::commit`] hands it back for the store to
//! replace atomically, and dropping the session discards it.

use bd_core::{
    validate_bank, Bank, FieldKey, MortgageProgram, ProgramId, RateSource, ValidationErrors,
};

/// Editor tabs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EditorTab {
    #[default]
    General,
    Programs,
}

impl EditorTab {
    pub fn toggle(self) -> Self {
        match self {
            EditorTab::General => EditorTab::Programs,
            EditorTab::Programs => EditorTab::General,
        }
    }
}

/// Edits to the general bank fields.
#[derive(Clone, Debug, PartialEq)]
pub enum BankEdit {
    Name(String),
    Logo(Option<String>),
    Description(Option<String>),
    Active(bool),
    AutoRates(bool),
}

/// Edits to one program.
#[derive(Clone, Debug, PartialEq)]
pub enum ProgramEdit {
    Name(String),
    Rate(f64),
    MinTerm(u32),
    MaxTerm(u32),
    MinDownPayment(f64),
    PskMin(Option<f64>),
    PskMax(Option<f64>),
    Conditions(Option<String>),
    SpecialConditions(bool),
    AutoRates(bool),
}

/// An open edit session.
#[derive(Clone, Debug, PartialEq)]
pub struct EditorSession {
    draft: Bank,
    is_new: bool,
    tab: EditorTab,
    errors: ValidationErrors,
}

impl EditorSession {
    /// Open a session over a copy of an existing bank.
    pub fn edit(bank: &Bank, tab: EditorTab) -> Self {
        Self {
            draft: bank.clone(),
            is_new: false,
            tab,
            errors: ValidationErrors::new(),
        }
    }

    /// Open a session for a bank that is not in the store yet.
    pub fn create(bank: Bank) -> Self {
        Self {
            draft: bank,
            is_new: true,
            tab: EditorTab::General,
            errors: ValidationErrors::new(),
        }
    }

    /// The working copy.
    pub fn draft(&self) -> &Bank {
        &self.draft
    }

    /// Whether saving will add a new bank rather than update one.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub fn tab(&self) -> EditorTab {
        self.tab
    }

    /// Errors from the most recent save attempt.
    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    pub fn select_tab(&mut self, tab: EditorTab) {
        self.tab = tab;
    }

    /// Apply a general field edit to the working copy.
    pub fn edit_bank(&mut self, edit: BankEdit) {
        match edit {
            BankEdit::Name(name) => {
                self.draft.name = name;
                self.errors.remove(FieldKey::BankName);
            }
            BankEdit::Logo(logo) => self.draft.logo = logo,
            BankEdit::Description(description) => self.draft.description = description,
            BankEdit::Active(active) => self.draft.is_active = active,
            BankEdit::AutoRates(enabled) => self.draft.auto_rates = enabled,
        }
    }

    /// Append a program with default terms and return its id.
    pub fn add_program(&mut self) -> ProgramId {
        let id = ProgramId::generate();
        self.draft.programs.push(MortgageProgram::new(id.clone()));
        id
    }

    /// Remove a program from the working copy.
    pub fn remove_program(&mut self, id: &ProgramId) -> bool {
        let before = self.draft.programs.len();
        self.draft.programs.retain(|program| &program.id != id);
        before != self.draft.programs.len()
    }

    /// Apply a program edit. Turning auto-rates on pulls terms from `rates`.
    pub fn edit_program(
        &mut self,
        id: &ProgramId,
        edit: ProgramEdit,
        rates: &dyn RateSource,
    ) -> bool {
        let Some(program) = self.draft.program_mut(id) else {
            return false;
        };
        match edit {
            ProgramEdit::Name(name) => program.name = name,
            ProgramEdit::Rate(rate) => program.rate = rate,
            ProgramEdit::MinTerm(years) => program.min_term = years,
            ProgramEdit::MaxTerm(years) => program.max_term = years,
            ProgramEdit::MinDownPayment(percent) => program.min_down_payment = percent,
            ProgramEdit::PskMin(value) => program.psk_min = value,
            ProgramEdit::PskMax(value) => program.psk_max = value,
            ProgramEdit::Conditions(text) => program.conditions = text,
            ProgramEdit::SpecialConditions(flag) => program.special_conditions = flag,
            ProgramEdit::AutoRates(enabled) => program.set_auto_rates(enabled, rates),
        }
        true
    }

    /// Validate the working copy. On success returns the bank to store;
    /// on failure the errors replace the previous ones and the session stays
    /// open.
    pub fn commit(&mut self) -> Result<Bank, &ValidationErrors> {
        match validate_bank(&self.draft) {
            Ok(()) => {
                self.errors = ValidationErrors::new();
                Ok(self.draft.clone())
            }
            Err(errors) => {
                self.errors = errors;
                Err(&self.errors)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bd_core::{BankId, FixedRateTable};

    fn stored_bank() -> Bank {
        let mut bank = Bank::blank();
        bank.id = BankId::new("sber").unwrap();
        bank.name = "Sberbank".into();
        bank
    }

    #[test]
    fn edits_do_not_touch_the_source() {
        let original = stored_bank();
        let mut session = EditorSession::edit(&original, EditorTab::General);
        session.edit_bank(BankEdit::Name("Changed".into()));
        session.add_program();

        assert_eq!(original.name, "Sberbank");
        assert!(original.programs.is_empty());
        assert_eq!(session.draft().name, "Changed");
        assert_eq!(session.draft().programs.len(), 1);
    }

    #[test]
    fn inverted_terms_commit() {
        let rates = FixedRateTable::new();
        let mut session = EditorSession::edit(&stored_bank(), EditorTab::Programs);
        let id = session.add_program();
        session.edit_program(&id, ProgramEdit::MinTerm(40), &rates);
        session.edit_program(&id, ProgramEdit::MaxTerm(5), &rates);
        session.edit_program(&id, ProgramEdit::PskMin(Some(9.0)), &rates);
        session.edit_program(&id, ProgramEdit::PskMax(Some(3.0)), &rates);

        let bank = session.commit().expect("inverted ranges are accepted");
        assert_eq!(bank.programs[0].min_term, 40);
        assert_eq!(bank.programs[0].max_term, 5);
    }

    #[test]
    fn added_program_has_defaults_and_can_be_removed() {
        let mut session = EditorSession::edit(&stored_bank(), EditorTab::Programs);
        let first = session.add_program();
        let second = session.add_program();
        assert_ne!(first, second);

        let program = session.draft().program(&first).unwrap();
        assert_eq!(program.name, "Standard mortgage");
        assert_eq!(program.min_down_payment, 15.0);

        assert!(session.remove_program(&first));
        assert!(!session.remove_program(&first));
        assert_eq!(session.draft().programs.len(), 1);
        assert_eq!(session.draft().programs[0].id, second);
    }

    #[test]
    fn failed_commit_keeps_session_and_reports_fields() {
        let mut session = EditorSession::create(Bank::blank());
        let id = session.add_program();
        session.edit_program(&id, ProgramEdit::Rate(31.0), &FixedRateTable::new());

        let errors = session.commit().unwrap_err();
        assert!(errors.contains(FieldKey::BankName));
        assert!(errors.contains(FieldKey::ProgramRate(0)));
        assert_eq!(session.errors().len(), 2);
    }

    #[test]
    fn errors_are_recomputed_on_each_commit() {
        let mut session = EditorSession::create(Bank::blank());
        let id = session.add_program();
        session.edit_program(&id, ProgramEdit::MinDownPayment(120.0), &FixedRateTable::new());
        assert!(session.commit().is_err());

        session.edit_bank(BankEdit::Name("Alfa-Bank".into()));
        assert!(!session.errors().contains(FieldKey::BankName));
        assert!(session.errors().contains(FieldKey::ProgramDownPayment(0)));

        session.edit_program(&id, ProgramEdit::MinDownPayment(100.0), &FixedRateTable::new());
        let bank = session.commit().unwrap();
        assert_eq!(bank.name, "Alfa-Bank");
        assert!(session.errors().is_empty());
    }

    #[test]
    fn auto_rates_toggle_is_one_way() {
        let mut session = EditorSession::edit(&stored_bank(), EditorTab::Programs);
        let id = session.add_program();
        let rates = FixedRateTable::new();
        session.edit_program(&id, ProgramEdit::Name("IT mortgage".into()), &rates);
        session.edit_program(&id, ProgramEdit::AutoRates(true), &rates);
        session.edit_program(&id, ProgramEdit::AutoRates(false), &rates);

        let program = session.draft().program(&id).unwrap();
        assert!(!program.auto_rates);
        assert_eq!(program.rate, 5.0);
        assert_eq!(program.psk_max, Some(6.5));
    }

    #[test]
    fn unknown_program_edit_is_ignored() {
        let mut session = EditorSession::edit(&stored_bank(), EditorTab::General);
        let missing = ProgramId::new("missing").unwrap();
        assert!(!session.edit_program(&missing, ProgramEdit::Rate(1.0), &FixedRateTable::new()));
    }
}
