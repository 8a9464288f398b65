//! Seed dataset and configuration for BankDesk.
//!
//! Banks are read once at startup, from a YAML seed file or the built-in
//! dataset. Nothing is written back.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use bd_core::{Bank, BankId, CoreError, CoreResult, MortgageProgram, ProgramId};

/// Directory name under the platform config dir.
pub const CONFIG_DIR_NAME: &str = "bankdesk";

/// Environment variable that overrides the configured seed path.
pub const SEED_ENV: &str = "BANKDESK_SEED";

const CONFIG_FILE_NAME: &str = "config.yaml";

/// Settings read from `config.yaml`.
#[derive(Debug, Default, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct DeskConfig {
    /// Path to a YAML seed file.
    #[serde(default)]
    pub seed: Option<String>,
    /// Initial value of the "apply to all projects" switch.
    #[serde(default)]
    pub apply_to_all_projects: Option<bool>,
}

/// Location of the config file.
pub fn config_path() -> CoreResult<PathBuf> {
    if let Some(dir) = dirs::config_dir() {
        return Ok(dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME));
    }
    Err(CoreError::Storage(
        "unable to determine config directory".into(),
    ))
}

/// Load the config file, or defaults when it does not exist.
pub fn load_config() -> CoreResult<DeskConfig> {
    load_config_from(&config_path()?)
}

/// Load a config file from an explicit path.
pub fn load_config_from(path: &Path) -> CoreResult<DeskConfig> {
    if !path.exists() {
        return Ok(DeskConfig::default());
    }
    let contents =
        fs::read_to_string(path).map_err(|err| CoreError::Storage(err.to_string()))?;
    serde_yaml::from_str(&contents).map_err(|err| CoreError::Storage(err.to_string()))
}

/// Pick the seed file: explicit flag, then environment, then config.
/// `None` means the built-in dataset.
pub fn resolve_seed_path(flag: Option<&Path>, config: &DeskConfig) -> Option<PathBuf> {
    if let Some(path) = flag {
        return Some(path.to_path_buf());
    }
    if let Ok(value) = std::env::var(SEED_ENV) {
        if !value.trim().is_empty() {
            return Some(PathBuf::from(value));
        }
    }
    config
        .seed
        .as_deref()
        .filter(|path| !path.trim().is_empty())
        .map(PathBuf::from)
}

/// Load banks from the given seed file, or the built-in dataset.
pub fn load_banks(seed: Option<&Path>) -> CoreResult<Vec<Bank>> {
    match seed {
        Some(path) => load_seed_file(path),
        None => Ok(builtin_seed()),
    }
}

/// Read and check a YAML seed file.
pub fn load_seed_file(path: &Path) -> CoreResult<Vec<Bank>> {
    let contents = fs::read_to_string(path)
        .map_err(|err| CoreError::Storage(format!("{}: {err}", path.display())))?;
    let banks = parse_seed(&contents)?;
    tracing::info!(path = %path.display(), banks = banks.len(), "seed loaded");
    Ok(banks)
}

/// Parse seed YAML and reject duplicate or empty identifiers.
pub fn parse_seed(contents: &str) -> CoreResult<Vec<Bank>> {
    let banks: Vec<Bank> =
        serde_yaml::from_str(contents).map_err(|err| CoreError::Storage(err.to_string()))?;
    check_identities(&banks)?;
    Ok(banks)
}

fn check_identities(banks: &[Bank]) -> CoreResult<()> {
    let mut bank_ids = HashSet::new();
    for bank in banks {
        if bank.id.as_str().trim().is_empty() {
            return Err(CoreError::Storage("seed bank with empty id".into()));
        }
        if !bank_ids.insert(&bank.id) {
            tracing::warn!(bank_id = %bank.id, "duplicate bank id in seed");
            return Err(CoreError::Storage(format!("duplicate bank id '{}'", bank.id)));
        }
        let mut program_ids = HashSet::new();
        for program in &bank.programs {
            if program.id.as_str().trim().is_empty() {
                return Err(CoreError::Storage(format!(
                    "bank '{}' has a program with an empty id",
                    bank.id
                )));
            }
            if !program_ids.insert(&program.id) {
                tracing::warn!(bank_id = %bank.id, program_id = %program.id, "duplicate program id in seed");
                return Err(CoreError::Storage(format!(
                    "bank '{}' has duplicate program id '{}'",
                    bank.id, program.id
                )));
            }
        }
    }
    Ok(())
}

/// The dataset used when no seed file is configured.
pub fn builtin_seed() -> Vec<Bank> {
    vec![
        seed_bank(
            "sber",
            "Sberbank",
            Some("Largest retail lender, state programs and market mortgages."),
            true,
            vec![
                seed_program("sber-family", "Family mortgage", 6.0, (1, 30), 20.0, (6.2, 7.1)),
                seed_program("sber-standard", "Standard mortgage", 18.5, (1, 30), 10.0, (18.8, 22.0)),
            ],
        ),
        seed_bank(
            "vtb",
            "VTB",
            None,
            true,
            vec![seed_program("vtb-it", "IT mortgage", 5.0, (1, 30), 15.0, (5.2, 6.5))],
        ),
        seed_bank("alfa", "Alfa-Bank", None, false, Vec::new()),
        seed_bank(
            "domrf",
            "Dom.RF",
            Some("State development institute."),
            false,
            vec![seed_program("domrf-fareast", "Far East mortgage", 2.0, (1, 20), 20.0, (2.2, 2.9))],
        ),
    ]
}

fn seed_bank(
    id: &str,
    name: &str,
    description: Option<&str>,
    is_active: bool,
    programs: Vec<MortgageProgram>,
) -> Bank {
    let logo = bd_core::PREDEFINED_BANKS
        .iter()
        .find(|template| template.name == name && !template.logo.is_empty())
        .map(|template| template.logo.to_string());
    Bank {
        id: BankId::new(id).unwrap_or_else(|_| BankId::generate()),
        name: name.to_string(),
        logo,
        description: description.map(str::to_string),
        is_active,
        auto_rates: false,
        programs,
    }
}

fn seed_program(
    id: &str,
    name: &str,
    rate: f64,
    (min_term, max_term): (u32, u32),
    min_down_payment: f64,
    (psk_min, psk_max): (f64, f64),
) -> MortgageProgram {
    let mut program = MortgageProgram::new(ProgramId::new(id).unwrap_or_else(|_| ProgramId::generate()));
    program.name = name.to_string();
    program.rate = rate;
    program.min_term = min_term;
    program.max_term = max_term;
    program.min_down_payment = min_down_payment;
    program.psk_min = Some(psk_min);
    program.psk_max = Some(psk_max);
    program
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SEED: &str = r"
- id: a
  name: Bank A
  programs: []
- id: b
  name: Bank B
  is_active: false
  programs:
    - id: b-1
      name: Standard mortgage
      rate: 18.5
      min_term: 1
      max_term: 30
      min_down_payment: 10
";

    #[test]
    fn seed_file_round_trip() {
        let temp = TempDir::new().expect("temp dir");
        let path = temp.path().join("banks.yaml");
        fs::write(&path, SEED).expect("write seed");

        let banks = load_banks(Some(&path)).expect("load seed");
        assert_eq!(banks.len(), 2);
        assert!(banks[0].is_active);
        assert!(!banks[1].is_active);
        assert_eq!(banks[1].programs[0].rate, 18.5);
        assert_eq!(banks[1].programs[0].psk_min, None);
        assert!(!banks[1].programs[0].auto_rates);
    }

    #[test]
    fn duplicate_bank_ids_are_rejected() {
        let contents = "- id: a\n  name: One\n- id: a\n  name: Two\n";
        assert!(matches!(parse_seed(contents), Err(CoreError::Storage(_))));
    }

    #[test]
    fn duplicate_program_ids_are_rejected() {
        let contents = r"
- id: a
  name: One
  programs:
    - {id: p, name: Standard mortgage, rate: 1, min_term: 1, max_term: 30, min_down_payment: 10}
    - {id: p, name: IT mortgage, rate: 1, min_term: 1, max_term: 30, min_down_payment: 10}
";
        assert!(matches!(parse_seed(contents), Err(CoreError::Storage(_))));
    }

    #[test]
    fn missing_seed_file_is_a_storage_error() {
        let temp = TempDir::new().expect("temp dir");
        let result = load_seed_file(&temp.path().join("missing.yaml"));
        assert!(matches!(result, Err(CoreError::Storage(_))));
    }

    #[test]
    fn config_defaults_when_absent() {
        let temp = TempDir::new().expect("temp dir");
        let config = load_config_from(&temp.path().join("config.yaml")).expect("config");
        assert_eq!(config, DeskConfig::default());
    }

    #[test]
    fn config_is_parsed() {
        let temp = TempDir::new().expect("temp dir");
        let path = temp.path().join("config.yaml");
        fs::write(&path, "seed: /tmp/banks.yaml\napply_to_all_projects: false\n")
            .expect("write config");
        let config = load_config_from(&path).expect("config");
        assert_eq!(config.seed.as_deref(), Some("/tmp/banks.yaml"));
        assert_eq!(config.apply_to_all_projects, Some(false));
    }

    #[test]
    fn flag_wins_over_config() {
        let config = DeskConfig {
            seed: Some("from-config.yaml".into()),
            apply_to_all_projects: None,
        };
        let flag = PathBuf::from("from-flag.yaml");
        assert_eq!(resolve_seed_path(Some(&flag), &config), Some(flag));
    }

    #[test]
    fn builtin_seed_has_unique_ids() {
        let banks = builtin_seed();
        assert!(check_identities(&banks).is_ok());
        assert!(banks.iter().any(|bank| bank.programs.is_empty()));
        assert!(banks.iter().any(|bank| !bank.is_active));
    }
}
