//! Two-step guard in front of bank deletion.

use bd_core::{Bank, BankId};

/// The bank awaiting confirmation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingDeletion {
    pub bank_id: BankId,
    pub bank_name: String,
}

impl PendingDeletion {
    /// Prompt text shown to the user.
    pub fn prompt(&self) -> String {
        format!(
            "Delete \"{}\"? This also removes all of its mortgage programs and cannot be undone.",
            self.bank_name
        )
    }
}

/// Holds at most one pending deletion. Only [`DeletionGuard::confirm`]
/// releases the target for removal.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeletionGuard {
    pending: Option<PendingDeletion>,
}

impl DeletionGuard {
    /// First step: remember the target and open the prompt.
    pub fn request(&mut self, bank: &Bank) {
        self.pending = Some(PendingDeletion {
            bank_id: bank.id.clone(),
            bank_name: bank.name.clone(),
        });
    }

    /// Second step: hand out the target and close the prompt.
    pub fn confirm(&mut self) -> Option<PendingDeletion> {
        self.pending.take()
    }

    /// Close the prompt without deleting anything.
    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn pending(&self) -> Option<&PendingDeletion> {
        self.pending.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bank() -> Bank {
        let mut bank = Bank::blank();
        bank.id = BankId::new("vtb").unwrap();
        bank.name = "VTB".into();
        bank
    }

    #[test]
    fn confirm_releases_target_once() {
        let mut guard = DeletionGuard::default();
        guard.request(&bank());
        assert!(guard.is_open());

        let pending = guard.confirm().unwrap();
        assert_eq!(pending.bank_id.as_str(), "vtb");
        assert!(guard.confirm().is_none());
        assert!(!guard.is_open());
    }

    #[test]
    fn cancel_clears_target() {
        let mut guard = DeletionGuard::default();
        guard.request(&bank());
        guard.cancel();
        assert!(guard.confirm().is_none());
    }

    #[test]
    fn prompt_names_the_bank() {
        let mut guard = DeletionGuard::default();
        guard.request(&bank());
        insta::assert_snapshot!(
            guard.pending().unwrap().prompt(),
            @r#"Delete "VTB"? This also removes all of its mortgage programs and cannot be undone."#
        );
    }
}
