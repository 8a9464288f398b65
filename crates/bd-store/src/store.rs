//! Ordered collection of banks.

use bd_core::{Bank, BankId};

/// Direction for moving a bank one step in the order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// How an upsert landed in the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Upsert {
    /// A new bank was prepended.
    Added,
    /// An existing bank was replaced in place.
    Updated,
}

/// The ordered list of banks. Order only changes through [`BankStore::reorder`]
/// and prepending new banks.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BankStore {
    banks: Vec<Bank>,
}

impl BankStore {
    /// Create a store seeded with banks in the given order.
    pub fn new(banks: Vec<Bank>) -> Self {
        Self { banks }
    }

    pub fn banks(&self) -> &[Bank] {
        &self.banks
    }

    pub fn len(&self) -> usize {
        self.banks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.banks.is_empty()
    }

    /// Look up a bank by id.
    pub fn get(&self, id: &BankId) -> Option<&Bank> {
        self.banks.iter().find(|bank| &bank.id == id)
    }

    /// Position of a bank in the order.
    pub fn position(&self, id: &BankId) -> Option<usize> {
        self.banks.iter().position(|bank| &bank.id == id)
    }

    /// Replace the bank with the same id in place, or prepend it.
    pub fn add_or_update(&mut self, bank: Bank) -> Upsert {
        match self.position(&bank.id) {
            Some(index) => {
                self.banks[index] = bank;
                Upsert::Updated
            }
            None => {
                self.banks.insert(0, bank);
                Upsert::Added
            }
        }
    }

    /// Remove a bank together with its programs.
    pub fn remove(&mut self, id: &BankId) -> Option<Bank> {
        let index = self.position(id)?;
        Some(self.banks.remove(index))
    }

    /// Set the active flag. Programs are untouched.
    pub fn set_active(&mut self, id: &BankId, active: bool) -> Option<&Bank> {
        let index = self.position(id)?;
        let bank = &mut self.banks[index];
        bank.is_active = active;
        Some(bank)
    }

    /// Swap a bank with its neighbour. Returns false at the boundary or for
    /// an unknown id.
    pub fn reorder(&mut self, id: &BankId, direction: Direction) -> bool {
        let Some(index) = self.position(id) else {
            return false;
        };
        let target = match direction {
            Direction::Up if index > 0 => index - 1,
            Direction::Down if index + 1 < self.banks.len() => index + 1,
            _ => return false,
        };
        self.banks.swap(index, target);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bd_core::{MortgageProgram, ProgramId};

    fn bank(id: &str) -> Bank {
        let mut bank = Bank::blank();
        bank.id = BankId::new(id).unwrap();
        bank.name = id.to_uppercase();
        bank
    }

    fn ids(store: &BankStore) -> Vec<&str> {
        store.banks().iter().map(|bank| bank.id.as_str()).collect()
    }

    #[test]
    fn new_bank_is_prepended() {
        let mut store = BankStore::new(vec![bank("a"), bank("b")]);
        assert_eq!(store.add_or_update(bank("c")), Upsert::Added);
        assert_eq!(ids(&store), ["c", "a", "b"]);
    }

    #[test]
    fn existing_bank_keeps_its_position() {
        let mut store = BankStore::new(vec![bank("a"), bank("b"), bank("c")]);
        let mut updated = bank("b");
        updated.name = "Renamed".into();
        assert_eq!(store.add_or_update(updated), Upsert::Updated);
        assert_eq!(ids(&store), ["a", "b", "c"]);
        assert_eq!(store.banks()[1].name, "Renamed");
    }

    #[test]
    fn remove_drops_only_the_target() {
        let mut target = bank("b");
        target
            .programs
            .push(MortgageProgram::new(ProgramId::new("p").unwrap()));
        let mut store = BankStore::new(vec![bank("a"), target, bank("c")]);

        let removed = store.remove(&BankId::new("b").unwrap()).unwrap();
        assert_eq!(removed.programs.len(), 1);
        assert_eq!(ids(&store), ["a", "c"]);
        assert!(store.remove(&BankId::new("b").unwrap()).is_none());
    }

    #[test]
    fn set_active_leaves_programs() {
        let mut target = bank("a");
        target
            .programs
            .push(MortgageProgram::new(ProgramId::new("p").unwrap()));
        let mut store = BankStore::new(vec![target.clone()]);

        let bank = store.set_active(&target.id, false).unwrap();
        assert!(!bank.is_active);
        assert_eq!(bank.programs, target.programs);
    }

    #[test]
    fn reorder_is_noop_at_boundaries() {
        let mut store = BankStore::new(vec![bank("a"), bank("b"), bank("c")]);
        assert!(!store.reorder(&BankId::new("a").unwrap(), Direction::Up));
        assert!(!store.reorder(&BankId::new("c").unwrap(), Direction::Down));
        assert!(!store.reorder(&BankId::new("zzz").unwrap(), Direction::Down));
        assert_eq!(ids(&store), ["a", "b", "c"]);
    }

    #[test]
    fn reorder_swaps_only_neighbours() {
        let mut store = BankStore::new(vec![bank("a"), bank("b"), bank("c"), bank("d")]);
        assert!(store.reorder(&BankId::new("b").unwrap(), Direction::Down));
        assert_eq!(ids(&store), ["a", "c", "b", "d"]);
        assert!(store.reorder(&BankId::new("d").unwrap(), Direction::Up));
        assert_eq!(ids(&store), ["a", "c", "d", "b"]);
    }
}
