//! Core domain entities, form rules, and rate derivation for BankDesk.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors returned by core validation and domain rules.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Returned when a validation rule is violated.
    #[error("validation error: {0}")]
    Validation(String),
    /// Returned when seed or config data cannot be read.
    #[error("storage error: {0}")]
    Storage(String),
}

/// Opaque identifier of a bank, unique within the store.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct BankId {
    value: String,
}

impl BankId {
    /// Wrap an existing identifier, rejecting empty or whitespace-only values.
    pub fn new(value: impl Into<String>) -> CoreResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(CoreError::Validation("bank id cannot be empty".into()));
        }
        Ok(Self { value })
    }

    /// Generate a fresh identifier for a newly created bank.
    pub fn generate() -> Self {
        Self {
            value: Uuid::new_v4().to_string(),
        }
    }

    /// Access the identifier text.
    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for BankId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// Opaque identifier of a program, unique within its owning bank.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct ProgramId {
    value: String,
}

impl ProgramId {
    /// Wrap an existing identifier, rejecting empty or whitespace-only values.
    pub fn new(value: impl Into<String>) -> CoreResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(CoreError::Validation("program id cannot be empty".into()));
        }
        Ok(Self { value })
    }

    /// Generate a fresh identifier for a newly added program.
    pub fn generate() -> Self {
        Self {
            value: format!("new-{}", Uuid::new_v4()),
        }
    }

    /// Access the identifier text.
    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// The fixed set of mortgage program categories offered in the editor.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ProgramCategory {
    /// State program for families with children.
    Family,
    /// Market-rate mortgage.
    Standard,
    /// Military savings mortgage.
    Military,
    /// Program for accredited IT employees.
    It,
    /// Generic state-subsidized program.
    StateSubsidized,
    /// Commercial real estate.
    Commercial,
    /// Far East regional program.
    FarEast,
    /// Arctic regional program.
    Arctic,
}

impl ProgramCategory {
    /// All categories in menu order.
    pub const ALL: [ProgramCategory; 8] = [
        ProgramCategory::Family,
        ProgramCategory::Standard,
        ProgramCategory::Military,
        ProgramCategory::It,
        ProgramCategory::StateSubsidized,
        ProgramCategory::Commercial,
        ProgramCategory::FarEast,
        ProgramCategory::Arctic,
    ];

    /// Display label, also used as the program name.
    pub fn label(self) -> &'static str {
        match self {
            ProgramCategory::Family => "Family mortgage",
            ProgramCategory::Standard => "Standard mortgage",
            ProgramCategory::Military => "Military mortgage",
            ProgramCategory::It => "IT mortgage",
            ProgramCategory::StateSubsidized => "State-subsidized mortgage",
            ProgramCategory::Commercial => "Commercial real estate",
            ProgramCategory::FarEast => "Far East mortgage",
            ProgramCategory::Arctic => "Arctic mortgage",
        }
    }

    /// Find the category whose label matches exactly.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|category| category.label() == label.trim())
    }

    /// The next category in menu order, wrapping around.
    pub fn next(self) -> Self {
        let index = Self::ALL
            .iter()
            .position(|category| *category == self)
            .unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for ProgramCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A named set of loan terms offered by one bank.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct MortgageProgram {
    /// Identifier, unique within the owning bank.
    pub id: ProgramId,
    /// Program name, normally a category label.
    pub name: String,
    /// Nominal interest rate in percent.
    pub rate: f64,
    /// Minimum loan term in years.
    pub min_term: u32,
    /// Maximum loan term in years.
    pub max_term: u32,
    /// Minimum down payment in percent.
    pub min_down_payment: f64,
    /// Lower bound of the full cost of credit.
    #[serde(default)]
    pub psk_min: Option<f64>,
    /// Upper bound of the full cost of credit.
    #[serde(default)]
    pub psk_max: Option<f64>,
    /// Free-text program conditions.
    #[serde(default)]
    pub conditions: Option<String>,
    /// Whether the program carries special conditions.
    #[serde(default)]
    pub special_conditions: bool,
    /// Whether numeric terms are derived from the rate table.
    #[serde(default)]
    pub auto_rates: bool,
}

impl MortgageProgram {
    /// Default category for a newly added program.
    pub const DEFAULT_CATEGORY: ProgramCategory = ProgramCategory::Standard;

    /// A new program with editor defaults: standard category, 0% rate,
    /// 1 to 30 years, 15% down payment.
    pub fn new(id: ProgramId) -> Self {
        Self {
            id,
            name: Self::DEFAULT_CATEGORY.label().to_string(),
            rate: 0.0,
            min_term: 1,
            max_term: 30,
            min_down_payment: 15.0,
            psk_min: None,
            psk_max: None,
            conditions: None,
            special_conditions: false,
            auto_rates: false,
        }
    }

    /// Set the auto-rates flag. Switching it on overwrites the numeric terms
    /// with the quote for this program's name; switching it off keeps them.
    pub fn set_auto_rates(&mut self, enabled: bool, source: &dyn RateSource) {
        self.auto_rates = enabled;
        if enabled {
            let quote = source.quote(&self.name);
            self.apply_quote(&quote);
        }
    }

    fn apply_quote(&mut self, quote: &RateQuote) {
        self.rate = quote.rate;
        self.min_down_payment = quote.min_down_payment;
        self.psk_min = Some(quote.psk_min);
        self.psk_max = Some(quote.psk_max);
        self.min_term = quote.min_term;
        self.max_term = quote.max_term;
        if let Some(conditions) = quote.conditions {
            self.conditions = Some(conditions.to_string());
        }
    }
}

/// A partner bank and the programs it offers.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Bank {
    /// Identifier, unique within the store.
    pub id: BankId,
    /// Display name.
    pub name: String,
    /// Optional logo URL.
    #[serde(default)]
    pub logo: Option<String>,
    /// Optional free-text description.
    #[serde(default)]
    pub description: Option<String>,
    /// Whether the bank is visible to the public calculator.
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// Whether bank details refresh automatically.
    #[serde(default)]
    pub auto_rates: bool,
    /// Programs in display order.
    #[serde(default)]
    pub programs: Vec<MortgageProgram>,
}

fn default_active() -> bool {
    true
}

impl Bank {
    /// A blank bank with a fresh id, for custom entries.
    pub fn blank() -> Self {
        Self {
            id: BankId::generate(),
            name: String::new(),
            logo: None,
            description: None,
            is_active: true,
            auto_rates: false,
            programs: Vec::new(),
        }
    }

    /// A new bank pre-filled from a predefined template.
    pub fn from_template(template: &BankTemplate) -> Self {
        let mut bank = Self::blank();
        bank.name = template.name.to_string();
        if !template.logo.is_empty() {
            bank.logo = Some(template.logo.to_string());
        }
        bank
    }

    /// Look up a program by id.
    pub fn program(&self, id: &ProgramId) -> Option<&MortgageProgram> {
        self.programs.iter().find(|program| &program.id == id)
    }

    /// Look up a program by id for mutation.
    pub fn program_mut(&mut self, id: &ProgramId) -> Option<&mut MortgageProgram> {
        self.programs.iter_mut().find(|program| &program.id == id)
    }
}

/// A predefined bank offered by the add-bank menu.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BankTemplate {
    /// Bank display name.
    pub name: &'static str,
    /// Logo URL, empty when none is known.
    pub logo: &'static str,
}

/// Banks offered by the add-bank menu, in menu order.
pub const PREDEFINED_BANKS: [BankTemplate; 10] = [
    BankTemplate {
        name: "Sberbank",
        logo: "https://companieslogo.com/img/orig/SBER.ME-1004a469.png",
    },
    BankTemplate {
        name: "VTB",
        logo: "https://upload.wikimedia.org/wikipedia/commons/7/7c/VTB_Logo_2018_color.png",
    },
    BankTemplate {
        name: "Alfa-Bank",
        logo: "https://upload.wikimedia.org/wikipedia/commons/8/87/Alfa-Bank_logo_2008_2.svg",
    },
    BankTemplate {
        name: "Dom.RF",
        logo: "https://upload.wikimedia.org/wikipedia/commons/2/29/DOM.RF_Logo.svg",
    },
    BankTemplate {
        name: "Gazprombank",
        logo: "https://upload.wikimedia.org/wikipedia/commons/3/36/Gazprombank_logo.svg",
    },
    BankTemplate {
        name: "Rosselkhozbank",
        logo: "",
    },
    BankTemplate {
        name: "Sovcombank",
        logo: "",
    },
    BankTemplate {
        name: "Promsvyazbank",
        logo: "",
    },
    BankTemplate {
        name: "Otkritie",
        logo: "",
    },
    BankTemplate {
        name: "Rosbank",
        logo: "",
    },
];

/// Rate-table bucket a program name falls into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateBucket {
    /// Family programs.
    Family,
    /// IT programs.
    It,
    /// Standard market programs.
    Standard,
    /// Everything else.
    Other,
}

impl RateBucket {
    /// Classify a program name by the keywords in its label.
    pub fn classify(name: &str) -> Self {
        let lowered = name.to_lowercase();
        if lowered.contains("family") {
            RateBucket::Family
        } else if name.contains("IT") {
            RateBucket::It
        } else if lowered.contains("standard") {
            RateBucket::Standard
        } else {
            RateBucket::Other
        }
    }
}

/// Terms derived for an auto-rated program.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RateQuote {
    /// Nominal rate in percent.
    pub rate: f64,
    /// Minimum down payment in percent.
    pub min_down_payment: f64,
    /// Lower bound of the full cost of credit.
    pub psk_min: f64,
    /// Upper bound of the full cost of credit.
    pub psk_max: f64,
    /// Minimum term in years.
    pub min_term: u32,
    /// Maximum term in years.
    pub max_term: u32,
    /// Replacement conditions text, if the bucket defines one.
    pub conditions: Option<&'static str>,
}

/// Source of auto-rate quotes.
pub trait RateSource: fmt::Debug {
    /// Return the source name.
    fn name(&self) -> &'static str;
    /// Quote terms for a program with the given name.
    fn quote(&self, program_name: &str) -> RateQuote;
}

/// Local lookup table keyed by [`RateBucket`].
#[derive(Debug, Default, Clone, Copy)]
pub struct FixedRateTable;

impl FixedRateTable {
    /// Create the fixed table.
    pub fn new() -> Self {
        Self
    }

    /// Terms for a bucket.
    pub fn bucket_quote(bucket: RateBucket) -> RateQuote {
        let (rate, min_down_payment, psk_min, psk_max, conditions) = match bucket {
            RateBucket::Family => (
                6.0,
                20.0,
                6.2,
                7.1,
                Some("Standard state program terms for families with children."),
            ),
            RateBucket::It => (
                5.0,
                15.0,
                5.2,
                6.5,
                Some("For employees of accredited IT companies."),
            ),
            RateBucket::Standard => (18.5, 10.0, 18.8, 22.0, None),
            RateBucket::Other => (12.0, 15.0, 12.5, 14.0, None),
        };
        RateQuote {
            rate,
            min_down_payment,
            psk_min,
            psk_max,
            min_term: 1,
            max_term: 30,
            conditions,
        }
    }
}

impl RateSource for FixedRateTable {
    fn name(&self) -> &'static str {
        "fixed-table"
    }

    fn quote(&self, program_name: &str) -> RateQuote {
        Self::bucket_quote(RateBucket::classify(program_name))
    }
}

/// Largest accepted nominal rate for manually rated programs.
pub const MAX_RATE: f64 = 30.0;
/// Largest accepted down payment percentage.
pub const MAX_DOWN_PAYMENT: f64 = 100.0;

/// Form field that can carry a validation message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldKey {
    /// The bank name.
    BankName,
    /// Name of the program at the given position.
    ProgramName(usize),
    /// Rate of the program at the given position.
    ProgramRate(usize),
    /// Down payment of the program at the given position.
    ProgramDownPayment(usize),
}

impl FieldKey {
    /// Bank fields first, then each program's fields in form order.
    fn sort_key(self) -> (Option<usize>, u8) {
        match self {
            FieldKey::BankName => (None, 0),
            FieldKey::ProgramName(index) => (Some(index), 0),
            FieldKey::ProgramRate(index) => (Some(index), 1),
            FieldKey::ProgramDownPayment(index) => (Some(index), 2),
        }
    }
}

impl Ord for FieldKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl PartialOrd for FieldKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKey::BankName => f.write_str("name"),
            FieldKey::ProgramName(index) => write!(f, "program_{index}_name"),
            FieldKey::ProgramRate(index) => write!(f, "program_{index}_rate"),
            FieldKey::ProgramDownPayment(index) => write!(f, "program_{index}_downpayment"),
        }
    }
}

/// Field-scoped validation messages, ordered as the form lays them out.
#[derive(Clone, Debug, Default, PartialEq, Eq, Error)]
#[error("{} field(s) failed validation", .errors.len())]
pub struct ValidationErrors {
    errors: BTreeMap<FieldKey, String>,
}

impl ValidationErrors {
    /// An empty error set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message for a field, replacing any previous one.
    pub fn insert(&mut self, key: FieldKey, message: impl Into<String>) {
        self.errors.insert(key, message.into());
    }

    /// Drop the message for a field.
    pub fn remove(&mut self, key: FieldKey) -> Option<String> {
        self.errors.remove(&key)
    }

    /// Message for a field, if any.
    pub fn get(&self, key: FieldKey) -> Option<&str> {
        self.errors.get(&key).map(String::as_str)
    }

    /// Whether a field has a message.
    pub fn contains(&self, key: FieldKey) -> bool {
        self.errors.contains_key(&key)
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Iterate over field messages in field order.
    pub fn iter(&self) -> impl Iterator<Item = (FieldKey, &str)> {
        self.errors.iter().map(|(key, message)| (*key, message.as_str()))
    }
}

/// Run the save-time rule set over a bank and its programs.
///
/// Auto-rated programs skip the name and range checks.
pub fn validate_bank(bank: &Bank) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if bank.name.trim().is_empty() {
        errors.insert(FieldKey::BankName, "Bank name is required");
    }

    for (index, program) in bank.programs.iter().enumerate() {
        if program.auto_rates {
            continue;
        }
        if program.name.trim().is_empty() {
            errors.insert(FieldKey::ProgramName(index), "Program name is required");
        }
        if !(0.0..=MAX_RATE).contains(&program.rate) {
            errors.insert(
                FieldKey::ProgramRate(index),
                "Rate must be between 0 and 30",
            );
        }
        if !(0.0..=MAX_DOWN_PAYMENT).contains(&program.min_down_payment) {
            errors.insert(
                FieldKey::ProgramDownPayment(index),
                "Down payment must be between 0 and 100",
            );
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program(name: &str) -> MortgageProgram {
        let mut program = MortgageProgram::new(ProgramId::new("p1").unwrap());
        program.name = name.into();
        program
    }

    fn bank_with(programs: Vec<MortgageProgram>) -> Bank {
        let mut bank = Bank::blank();
        bank.name = "Sberbank".into();
        bank.programs = programs;
        bank
    }

    #[test]
    fn ids_reject_empty() {
        assert!(matches!(BankId::new("  "), Err(CoreError::Validation(_))));
        assert!(matches!(ProgramId::new(""), Err(CoreError::Validation(_))));
    }

    #[test]
    fn generated_ids_are_distinct() {
        assert_ne!(BankId::generate(), BankId::generate());
        assert!(ProgramId::generate().as_str().starts_with("new-"));
    }

    #[test]
    fn new_program_uses_editor_defaults() {
        let program = MortgageProgram::new(ProgramId::new("p").unwrap());
        assert_eq!(program.name, "Standard mortgage");
        assert_eq!(program.rate, 0.0);
        assert_eq!((program.min_term, program.max_term), (1, 30));
        assert_eq!(program.min_down_payment, 15.0);
        assert!(!program.auto_rates);
    }

    #[test]
    fn template_prefills_name_and_logo() {
        let bank = Bank::from_template(&PREDEFINED_BANKS[1]);
        assert_eq!(bank.name, "VTB");
        assert!(bank.logo.is_some());
        assert!(bank.is_active);
        assert!(!bank.auto_rates);

        let no_logo = Bank::from_template(&PREDEFINED_BANKS[5]);
        assert_eq!(no_logo.logo, None);
    }

    #[test]
    fn category_cycle_wraps() {
        assert_eq!(ProgramCategory::Arctic.next(), ProgramCategory::Family);
        assert_eq!(
            ProgramCategory::from_label("IT mortgage"),
            Some(ProgramCategory::It)
        );
    }

    #[test]
    fn buckets_follow_keywords() {
        assert_eq!(RateBucket::classify("Family mortgage"), RateBucket::Family);
        assert_eq!(RateBucket::classify("IT mortgage"), RateBucket::It);
        assert_eq!(RateBucket::classify("Standard mortgage"), RateBucket::Standard);
        assert_eq!(RateBucket::classify("Military mortgage"), RateBucket::Other);
        assert_eq!(RateBucket::classify("Commercial real estate"), RateBucket::Other);
        assert_eq!(RateBucket::classify("IT-mortgage"), RateBucket::It);
        assert_eq!(RateBucket::classify("Mortgage for IT staff"), RateBucket::It);
        assert_eq!(RateBucket::classify("it mortgage"), RateBucket::Other);
    }

    #[test]
    fn enabling_auto_rates_overwrites_terms() {
        let mut program = program("Family mortgage");
        program.rate = 25.0;
        program.min_term = 5;
        program.max_term = 10;
        program.set_auto_rates(true, &FixedRateTable::new());

        assert!(program.auto_rates);
        assert_eq!(program.rate, 6.0);
        assert_eq!(program.min_down_payment, 20.0);
        assert_eq!(program.psk_min, Some(6.2));
        assert_eq!(program.psk_max, Some(7.1));
        assert_eq!((program.min_term, program.max_term), (1, 30));
        assert!(program.conditions.is_some());
    }

    #[test]
    fn disabling_auto_rates_keeps_derived_terms() {
        let mut program = program("Standard mortgage");
        program.conditions = Some("custom".into());
        program.set_auto_rates(true, &FixedRateTable::new());
        program.set_auto_rates(false, &FixedRateTable::new());

        assert!(!program.auto_rates);
        assert_eq!(program.rate, 18.5);
        assert_eq!(program.min_down_payment, 10.0);
        assert_eq!(program.conditions.as_deref(), Some("custom"));
    }

    #[test]
    fn blank_name_is_rejected() {
        let mut bank = bank_with(Vec::new());
        bank.name = "   ".into();
        let errors = validate_bank(&bank).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors.contains(FieldKey::BankName));
    }

    #[test]
    fn range_boundaries_are_accepted() {
        let mut low = program("Standard mortgage");
        low.rate = 0.0;
        low.min_down_payment = 0.0;
        let mut high = program("IT mortgage");
        high.rate = 30.0;
        high.min_down_payment = 100.0;
        assert!(validate_bank(&bank_with(vec![low, high])).is_ok());
    }

    #[test]
    fn out_of_range_manual_program_is_rejected() {
        let mut first = program("Standard mortgage");
        first.rate = 30.5;
        let mut second = program("");
        second.min_down_payment = -1.0;
        let errors = validate_bank(&bank_with(vec![first, second])).unwrap_err();

        let keys: Vec<String> = errors.iter().map(|(key, _)| key.to_string()).collect();
        insta::assert_snapshot!(
            keys.join(","),
            @"program_0_rate,program_1_name,program_1_downpayment"
        );
    }

    #[test]
    fn errors_follow_form_order() {
        let mut first = program("");
        first.min_down_payment = 101.0;
        let mut second = program("");
        second.rate = -0.5;
        let mut bank = bank_with(vec![first, second]);
        bank.name = String::new();
        let errors = validate_bank(&bank).unwrap_err();

        let keys: Vec<FieldKey> = errors.iter().map(|(key, _)| key).collect();
        assert_eq!(
            keys,
            [
                FieldKey::BankName,
                FieldKey::ProgramName(0),
                FieldKey::ProgramDownPayment(0),
                FieldKey::ProgramName(1),
                FieldKey::ProgramRate(1),
            ]
        );
    }

    #[test]
    fn inverted_ranges_still_validate() {
        let mut program = program("Standard mortgage");
        program.min_term = 40;
        program.max_term = 5;
        program.psk_min = Some(9.0);
        program.psk_max = Some(3.0);
        assert!(validate_bank(&bank_with(vec![program])).is_ok());
    }

    #[test]
    fn auto_rated_program_is_exempt() {
        let mut program = program("");
        program.auto_rates = true;
        program.rate = 99.0;
        program.min_down_payment = 250.0;
        assert!(validate_bank(&bank_with(vec![program])).is_ok());
    }

    #[test]
    fn field_keys_render_form_names() {
        assert_eq!(FieldKey::BankName.to_string(), "name");
        assert_eq!(FieldKey::ProgramDownPayment(3).to_string(), "program_3_downpayment");
    }
}
