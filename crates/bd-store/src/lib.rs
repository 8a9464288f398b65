//! Application state and reducer for BankDesk.
//!
//! Every user intent is an [`Action`]; [`AppState::reduce`] is the only place
//! the bank list, filters, editor, deletion prompt, and notifications change.

mod confirm;
mod editor;
mod filter;
mod notify;
mod store;

use std::time::Instant;

use chrono::{DateTime, Utc};

use bd_core::{Bank, BankId, BankTemplate, FixedRateTable, ProgramId, RateSource};

pub use confirm::{DeletionGuard, PendingDeletion};
pub use editor::{BankEdit, EditorSession, EditorTab, ProgramEdit};
pub use filter::{BankSelector, Filters, ProgramFilter, StatusFilter};
pub use notify::{Notification, NotificationKind, NotificationQueue, NOTIFICATION_TTL};
pub use store::{BankStore, Direction, Upsert};

/// A user intent.
#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    /// Open the editor on a new bank, from a template or blank.
    NewBank(Option<BankTemplate>),
    /// Open the editor on a copy of a stored bank.
    EditBank { id: BankId, tab: EditorTab },
    SelectTab(EditorTab),
    EditGeneral(BankEdit),
    AddProgram,
    RemoveProgram(ProgramId),
    EditProgram(ProgramId, ProgramEdit),
    /// Validate and commit the working copy.
    Save,
    /// Discard the working copy.
    CloseEditor,
    SetActive { id: BankId, active: bool },
    Reorder { id: BankId, direction: Direction },
    RequestDelete(BankId),
    ConfirmDelete,
    CancelDelete,
    SelectBank(BankSelector),
    SetStatusFilter(StatusFilter),
    SetProgramFilter(ProgramFilter),
    ResetFilters,
    SetApplyToAll(bool),
    Dismiss(u64),
    /// Expire notifications.
    Tick,
}

/// Everything the front end renders.
#[derive(Debug)]
pub struct AppState {
    store: BankStore,
    filters: Filters,
    editor: Option<EditorSession>,
    deletion: DeletionGuard,
    notifications: NotificationQueue,
    rates: Box<dyn RateSource>,
    apply_to_all_projects: bool,
    last_updated: Option<DateTime<Utc>>,
}

impl AppState {
    /// State seeded with banks, using the fixed rate table.
    pub fn new(banks: Vec<Bank>) -> Self {
        Self::with_rate_source(banks, Box::new(FixedRateTable::new()))
    }

    pub fn with_rate_source(banks: Vec<Bank>, rates: Box<dyn RateSource>) -> Self {
        Self {
            store: BankStore::new(banks),
            filters: Filters::default(),
            editor: None,
            deletion: DeletionGuard::default(),
            notifications: NotificationQueue::default(),
            rates,
            apply_to_all_projects: true,
            last_updated: None,
        }
    }

    pub fn store(&self) -> &BankStore {
        &self.store
    }

    pub fn filters(&self) -> &Filters {
        &self.filters
    }

    pub fn editor(&self) -> Option<&EditorSession> {
        self.editor.as_ref()
    }

    pub fn deletion(&self) -> &DeletionGuard {
        &self.deletion
    }

    pub fn notifications(&self) -> &NotificationQueue {
        &self.notifications
    }

    pub fn apply_to_all_projects(&self) -> bool {
        self.apply_to_all_projects
    }

    /// When the bank list last changed.
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    /// The filtered view in store order.
    pub fn visible_banks(&self) -> Vec<&Bank> {
        self.filters.apply(self.store.banks())
    }

    /// Apply an action. `now` stamps and expires notifications.
    pub fn reduce(&mut self, action: Action, now: Instant) {
        match action {
            Action::NewBank(template) => {
                let bank = match template {
                    Some(template) => Bank::from_template(&template),
                    None => Bank::blank(),
                };
                tracing::debug!(bank_id = %bank.id, "opening editor for new bank");
                self.editor = Some(EditorSession::create(bank));
            }
            Action::EditBank { id, tab } => {
                if let Some(bank) = self.store.get(&id) {
                    tracing::debug!(bank_id = %id, ?tab, "opening editor");
                    self.editor = Some(EditorSession::edit(bank, tab));
                }
            }
            Action::SelectTab(tab) => {
                if let Some(editor) = self.editor.as_mut() {
                    editor.select_tab(tab);
                }
            }
            Action::EditGeneral(edit) => {
                if let Some(editor) = self.editor.as_mut() {
                    editor.edit_bank(edit);
                }
            }
            Action::AddProgram => {
                if let Some(editor) = self.editor.as_mut() {
                    editor.add_program();
                }
            }
            Action::RemoveProgram(id) => {
                if let Some(editor) = self.editor.as_mut() {
                    editor.remove_program(&id);
                }
            }
            Action::EditProgram(id, edit) => {
                if let Some(editor) = self.editor.as_mut() {
                    editor.edit_program(&id, edit, self.rates.as_ref());
                }
            }
            Action::Save => self.save(now),
            Action::CloseEditor => {
                self.editor = None;
            }
            Action::SetActive { id, active } => {
                if let Some(bank) = self.store.set_active(&id, active) {
                    let message = format!(
                        "Bank \"{}\" is now {}.",
                        bank.name,
                        if active { "active" } else { "inactive" }
                    );
                    tracing::info!(bank_id = %id, active, "bank status changed");
                    self.notifications.push(NotificationKind::Info, message, now);
                    self.touch();
                }
            }
            Action::Reorder { id, direction } => {
                if self.store.reorder(&id, direction) {
                    tracing::debug!(bank_id = %id, ?direction, "bank moved");
                    self.touch();
                } else {
                    tracing::debug!(bank_id = %id, ?direction, "move ignored at boundary");
                }
            }
            Action::RequestDelete(id) => {
                if let Some(bank) = self.store.get(&id) {
                    self.deletion.request(bank);
                }
            }
            Action::ConfirmDelete => self.confirm_delete(now),
            Action::CancelDelete => self.deletion.cancel(),
            Action::SelectBank(selector) => self.filters.bank = selector,
            Action::SetStatusFilter(status) => self.filters.status = status,
            Action::SetProgramFilter(programs) => self.filters.programs = programs,
            Action::ResetFilters => self.filters = Filters::default(),
            Action::SetApplyToAll(enabled) => self.apply_to_all_projects = enabled,
            Action::Dismiss(id) => {
                self.notifications.dismiss(id);
            }
            Action::Tick => {
                self.notifications.tick(now);
            }
        }
    }

    fn save(&mut self, now: Instant) {
        let Some(editor) = self.editor.as_mut() else {
            return;
        };
        let bank = match editor.commit() {
            Ok(bank) => bank,
            Err(errors) => {
                tracing::debug!(errors = errors.len(), "save rejected by validation");
                return;
            }
        };
        self.editor = None;

        let name = bank.name.clone();
        let id = bank.id.clone();
        let message = match self.store.add_or_update(bank) {
            Upsert::Added => format!("Bank \"{name}\" added."),
            Upsert::Updated => format!("Bank \"{name}\" updated."),
        };
        tracing::info!(bank_id = %id, "bank saved");
        self.notifications.push(NotificationKind::Success, message, now);
        self.touch();
    }

    fn confirm_delete(&mut self, now: Instant) {
        let Some(pending) = self.deletion.confirm() else {
            return;
        };
        if self.store.remove(&pending.bank_id).is_none() {
            return;
        }
        if self.filters.bank == BankSelector::Bank(pending.bank_id.clone()) {
            self.filters.bank = BankSelector::All;
        }
        tracing::info!(bank_id = %pending.bank_id, "bank deleted");
        self.notifications.push(
            NotificationKind::Success,
            format!("Bank \"{}\" deleted.", pending.bank_name),
            now,
        );
        self.touch();
    }

    fn touch(&mut self) {
        self.last_updated = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bd_core::{FieldKey, MortgageProgram, PREDEFINED_BANKS};
    use std::time::Duration;

    fn bank(id: &str, active: bool, programs: usize) -> Bank {
        let mut bank = Bank::blank();
        bank.id = BankId::new(id).unwrap();
        bank.name = format!("Bank {}", id.to_uppercase());
        bank.is_active = active;
        for index in 0..programs {
            bank.programs
                .push(MortgageProgram::new(ProgramId::new(format!("{id}-{index}")).unwrap()));
        }
        bank
    }

    fn state() -> AppState {
        AppState::new(vec![bank("a", true, 0), bank("b", false, 1)])
    }

    fn id(value: &str) -> BankId {
        BankId::new(value).unwrap()
    }

    fn messages(state: &AppState, now: Instant) -> Vec<String> {
        state
            .notifications()
            .visible(now)
            .map(|message| message.message.clone())
            .collect()
    }

    #[test]
    fn blank_name_never_reaches_the_store() {
        let now = Instant::now();
        let mut state = state();
        state.reduce(Action::NewBank(None), now);
        state.reduce(Action::EditGeneral(BankEdit::Name("   ".into())), now);
        state.reduce(Action::Save, now);

        assert_eq!(state.store().len(), 2);
        let editor = state.editor().unwrap();
        assert!(editor.errors().contains(FieldKey::BankName));
        assert!(state.notifications().is_empty());
        assert!(state.last_updated().is_none());
    }

    #[test]
    fn saving_new_bank_prepends_and_notifies() {
        let now = Instant::now();
        let mut state = state();
        state.reduce(Action::NewBank(Some(PREDEFINED_BANKS[0])), now);
        state.reduce(Action::AddProgram, now);
        state.reduce(Action::Save, now);

        assert!(state.editor().is_none());
        let first = &state.store().banks()[0];
        assert_eq!(first.name, "Sberbank");
        assert_eq!(first.programs.len(), 1);
        assert_eq!(messages(&state, now), ["Bank \"Sberbank\" added."]);
        assert!(state.last_updated().is_some());
    }

    #[test]
    fn saving_existing_bank_replaces_in_place() {
        let now = Instant::now();
        let mut state = state();
        state.reduce(
            Action::EditBank {
                id: id("b"),
                tab: EditorTab::Programs,
            },
            now,
        );
        assert_eq!(state.editor().unwrap().tab(), EditorTab::Programs);
        state.reduce(Action::EditGeneral(BankEdit::Name("Bank Beta".into())), now);
        state.reduce(Action::Save, now);

        let names: Vec<&str> = state.store().banks().iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, ["Bank A", "Bank Beta"]);
        assert_eq!(messages(&state, now), ["Bank \"Bank Beta\" updated."]);
    }

    #[test]
    fn closing_editor_discards_working_copy() {
        let now = Instant::now();
        let mut state = state();
        state.reduce(
            Action::EditBank {
                id: id("a"),
                tab: EditorTab::General,
            },
            now,
        );
        state.reduce(Action::AddProgram, now);
        state.reduce(Action::EditGeneral(BankEdit::Active(false)), now);
        state.reduce(Action::CloseEditor, now);

        let stored = state.store().get(&id("a")).unwrap();
        assert!(stored.programs.is_empty());
        assert!(stored.is_active);
    }

    #[test]
    fn auto_rated_program_saves_despite_range() {
        let now = Instant::now();
        let mut state = state();
        state.reduce(
            Action::EditBank {
                id: id("b"),
                tab: EditorTab::Programs,
            },
            now,
        );
        let program_id = ProgramId::new("b-0").unwrap();
        state.reduce(
            Action::EditProgram(program_id.clone(), ProgramEdit::AutoRates(true)),
            now,
        );
        state.reduce(Action::EditProgram(program_id, ProgramEdit::Rate(75.0)), now);
        state.reduce(Action::Save, now);

        assert!(state.editor().is_none());
        assert_eq!(state.store().get(&id("b")).unwrap().programs[0].rate, 75.0);
    }

    #[test]
    fn delete_requires_confirmation() {
        let now = Instant::now();
        let mut state = state();
        state.reduce(Action::RequestDelete(id("b")), now);
        assert_eq!(state.store().len(), 2);
        assert!(state.deletion().is_open());

        state.reduce(Action::CancelDelete, now);
        state.reduce(Action::ConfirmDelete, now);
        assert_eq!(state.store().len(), 2);

        state.reduce(Action::RequestDelete(id("b")), now);
        state.reduce(Action::ConfirmDelete, now);
        assert_eq!(state.store().len(), 1);
        assert!(state.store().get(&id("a")).is_some());
        assert_eq!(messages(&state, now), ["Bank \"Bank B\" deleted."]);
    }

    #[test]
    fn deleting_selected_bank_resets_selector() {
        let now = Instant::now();
        let mut state = state();
        state.reduce(Action::SelectBank(BankSelector::Bank(id("a"))), now);
        state.reduce(Action::RequestDelete(id("a")), now);
        state.reduce(Action::ConfirmDelete, now);
        assert_eq!(state.filters().bank, BankSelector::All);
        assert_eq!(state.visible_banks().len(), 1);
    }

    #[test]
    fn toggle_status_notifies() {
        let now = Instant::now();
        let mut state = state();
        state.reduce(
            Action::SetActive {
                id: id("b"),
                active: true,
            },
            now,
        );
        assert!(state.store().get(&id("b")).unwrap().is_active);
        let kinds: Vec<NotificationKind> =
            state.notifications().visible(now).map(|m| m.kind).collect();
        assert_eq!(kinds, [NotificationKind::Info]);
        assert_eq!(messages(&state, now), ["Bank \"Bank B\" is now active."]);
    }

    #[test]
    fn filters_follow_seed_example() {
        let now = Instant::now();
        let mut state = state();
        state.reduce(Action::SetStatusFilter(StatusFilter::Active), now);
        let names: Vec<&str> = state.visible_banks().iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, ["Bank A"]);

        state.reduce(Action::ResetFilters, now);
        state.reduce(Action::SetProgramFilter(ProgramFilter::WithPrograms), now);
        let names: Vec<&str> = state.visible_banks().iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, ["Bank B"]);
    }

    #[test]
    fn reorder_at_boundary_leaves_timestamp() {
        let now = Instant::now();
        let mut state = state();
        state.reduce(
            Action::Reorder {
                id: id("a"),
                direction: Direction::Up,
            },
            now,
        );
        assert!(state.last_updated().is_none());

        state.reduce(
            Action::Reorder {
                id: id("a"),
                direction: Direction::Down,
            },
            now,
        );
        assert_eq!(state.store().banks()[1].id, id("a"));
        assert!(state.last_updated().is_some());
    }

    #[test]
    fn tick_expires_notifications() {
        let now = Instant::now();
        let mut state = state();
        state.reduce(
            Action::SetActive {
                id: id("a"),
                active: false,
            },
            now,
        );
        state.reduce(Action::Tick, now + Duration::from_secs(3));
        assert_eq!(state.notifications().len(), 1);
        state.reduce(Action::Tick, now + NOTIFICATION_TTL);
        assert!(state.notifications().is_empty());
    }

    #[test]
    fn dismiss_removes_one_message() {
        let now = Instant::now();
        let mut state = state();
        state.reduce(Action::SetActive { id: id("a"), active: false }, now);
        state.reduce(Action::SetActive { id: id("b"), active: true }, now);
        let first = state.notifications().visible(now).next().unwrap().id;
        state.reduce(Action::Dismiss(first), now);
        assert_eq!(messages(&state, now), ["Bank \"Bank B\" is now active."]);
    }
}
