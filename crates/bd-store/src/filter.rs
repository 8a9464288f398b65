//! Conjunctive filters over the bank list.

use bd_core::{Bank, BankId};

/// Which bank the identity filter selects.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum BankSelector {
    #[default]
    All,
    Bank(BankId),
}

impl BankSelector {
    fn matches(&self, bank: &Bank) -> bool {
        match self {
            BankSelector::All => true,
            BankSelector::Bank(id) => &bank.id == id,
        }
    }
}

/// Status predicate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Inactive,
}

impl StatusFilter {
    fn matches(self, bank: &Bank) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Active => bank.is_active,
            StatusFilter::Inactive => !bank.is_active,
        }
    }

    /// Next option in the select box order.
    pub fn next(self) -> Self {
        match self {
            StatusFilter::All => StatusFilter::Active,
            StatusFilter::Active => StatusFilter::Inactive,
            StatusFilter::Inactive => StatusFilter::All,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StatusFilter::All => "All statuses",
            StatusFilter::Active => "Active only",
            StatusFilter::Inactive => "Inactive only",
        }
    }
}

/// Program-presence predicate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProgramFilter {
    #[default]
    All,
    WithPrograms,
    NoPrograms,
}

impl ProgramFilter {
    fn matches(self, bank: &Bank) -> bool {
        match self {
            ProgramFilter::All => true,
            ProgramFilter::WithPrograms => !bank.programs.is_empty(),
            ProgramFilter::NoPrograms => bank.programs.is_empty(),
        }
    }

    /// Next option in the select box order.
    pub fn next(self) -> Self {
        match self {
            ProgramFilter::All => ProgramFilter::WithPrograms,
            ProgramFilter::WithPrograms => ProgramFilter::NoPrograms,
            ProgramFilter::NoPrograms => ProgramFilter::All,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ProgramFilter::All => "All programs",
            ProgramFilter::WithPrograms => "With programs",
            ProgramFilter::NoPrograms => "Without programs",
        }
    }
}

/// The three independent predicates; a bank is visible iff it matches all.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Filters {
    pub bank: BankSelector,
    pub status: StatusFilter,
    pub programs: ProgramFilter,
}

impl Filters {
    /// Whether a bank passes every predicate.
    pub fn matches(&self, bank: &Bank) -> bool {
        self.bank.matches(bank) && self.status.matches(bank) && self.programs.matches(bank)
    }

    /// The visible subset, in store order.
    pub fn apply<'a>(&self, banks: &'a [Bank]) -> Vec<&'a Bank> {
        banks.iter().filter(|bank| self.matches(bank)).collect()
    }

    /// Whether every predicate is `all`.
    pub fn is_unfiltered(&self) -> bool {
        *self == Filters::default()
    }
}
