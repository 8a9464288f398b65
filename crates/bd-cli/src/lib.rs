use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use bd_core::{
    validate_bank, Bank, BankId, BankTemplate, FixedRateTable, ProgramCategory, RateBucket,
    ValidationErrors, PREDEFINED_BANKS,
};
use bd_seed::{load_banks, load_config, resolve_seed_path, DeskConfig, SEED_ENV};
use bd_store::{Action, AppState, BankSelector, Filters, ProgramFilter, StatusFilter};
use bd_utils::format_percent;

#[derive(Parser)]
#[command(name = "bankdesk", version, about = "Partner banks and mortgage programs")]
struct Cli {
    /// YAML seed file with the initial banks.
    #[arg(long, global = true)]
    seed: Option<PathBuf>,
    /// Write logs to this file.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// List banks matching the filters.
    List {
        /// Only this bank id.
        #[arg(long)]
        bank: Option<String>,
        #[arg(long, value_enum, default_value = "all")]
        status: StatusArg,
        #[arg(long, value_enum, default_value = "all")]
        programs: ProgramsArg,
    },
    /// Show a single bank with its programs.
    Show { id: String },
    /// List the predefined bank templates.
    Templates,
    /// List program categories and their auto-rate terms.
    Categories,
    /// Validate every seed bank with the editor's rules.
    Check,
}

#[derive(Clone, Copy, ValueEnum)]
enum StatusArg {
    All,
    Active,
    Inactive,
}

impl From<StatusArg> for StatusFilter {
    fn from(value: StatusArg) -> Self {
        match value {
            StatusArg::All => StatusFilter::All,
            StatusArg::Active => StatusFilter::Active,
            StatusArg::Inactive => StatusFilter::Inactive,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ProgramsArg {
    All,
    WithPrograms,
    NoPrograms,
}

impl From<ProgramsArg> for ProgramFilter {
    fn from(value: ProgramsArg) -> Self {
        match value {
            ProgramsArg::All => ProgramFilter::All,
            ProgramsArg::WithPrograms => ProgramFilter::WithPrograms,
            ProgramsArg::NoPrograms => ProgramFilter::NoPrograms,
        }
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // The TUI owns the terminal, so it only logs when a file is given.
    if cli.command.is_some() || cli.log_file.is_some() {
        init_tracing(cli.log_file.as_deref())?;
    }

    execute(cli)
}

fn execute(cli: Cli) -> Result<()> {
    match &cli.command {
        Some(Command::Templates) => {
            for template in &PREDEFINED_BANKS {
                println!("{}", format_template(template));
            }
            return Ok(());
        }
        Some(Command::Categories) => {
            for category in ProgramCategory::ALL {
                println!("{}", format_category(category));
            }
            return Ok(());
        }
        _ => {}
    }

    let config = config_for(&cli)?;
    let seed = resolve_seed_path(cli.seed.as_deref(), &config);
    let banks = load_banks(seed.as_deref()).context("failed to load seed banks")?;
    tracing::debug!(banks = banks.len(), seed = ?seed, "seed resolved");

    let command = match cli.command {
        Some(c) => c,
        None => return bd_tui::run(initial_state(banks, &config)),
    };

    match command {
        Command::List {
            bank,
            status,
            programs,
        } => list_banks(&banks, bank, status, programs),
        Command::Show { id } => show_bank(&banks, &id),
        Command::Check => check_banks(&banks),
        Command::Templates | Command::Categories => Ok(()),
    }
}

/// The config file is read only when the TUI runs or no seed was given
/// on the command line or in the environment.
fn config_for(cli: &Cli) -> Result<DeskConfig> {
    let seed_given = cli.seed.is_some()
        || std::env::var(SEED_ENV).is_ok_and(|value| !value.trim().is_empty());
    if cli.command.is_some() && seed_given {
        return Ok(DeskConfig::default());
    }
    load_config().context("failed to read config")
}

fn init_tracing(log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let installed = match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .try_init()
        }
        None => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init(),
    };
    installed.map_err(|err| anyhow!("failed to install logger: {err}"))
}

fn initial_state(banks: Vec<Bank>, config: &DeskConfig) -> AppState {
    let mut state = AppState::new(banks);
    if let Some(enabled) = config.apply_to_all_projects {
        state.reduce(Action::SetApplyToAll(enabled), Instant::now());
    }
    state
}

fn list_banks(
    banks: &[Bank],
    bank: Option<String>,
    status: StatusArg,
    programs: ProgramsArg,
) -> Result<()> {
    let selector = match bank {
        Some(id) => BankSelector::Bank(BankId::new(id).context("invalid bank id")?),
        None => BankSelector::All,
    };
    let filters = Filters {
        bank: selector,
        status: status.into(),
        programs: programs.into(),
    };
    let visible = filters.apply(banks);
    if visible.is_empty() {
        eprintln!("No banks found");
    }
    for bank in visible {
        println!("{}", format_bank_line(bank));
    }
    Ok(())
}

fn show_bank(banks: &[Bank], id: &str) -> Result<()> {
    let id = BankId::new(id).context("invalid bank id")?;
    let bank = banks
        .iter()
        .find(|bank| bank.id == id)
        .ok_or_else(|| anyhow!("no bank with id '{id}'"))?;
    println!("{}", format_bank_detail(bank));
    Ok(())
}

fn check_banks(banks: &[Bank]) -> Result<()> {
    let mut failed = 0;
    for bank in banks {
        if let Err(errors) = validate_bank(bank) {
            failed += 1;
            tracing::warn!(bank_id = %bank.id, errors = errors.len(), "bank failed validation");
            for line in format_errors(bank, &errors) {
                println!("{line}");
            }
        }
    }
    if failed > 0 {
        bail!("{failed} bank(s) failed validation");
    }
    println!("{} bank(s) ok", banks.len());
    Ok(())
}

fn format_bank_line(bank: &Bank) -> String {
    let status = if bank.is_active { "active" } else { "inactive" };
    let programs = match bank.programs.len() {
        0 => "no programs".to_string(),
        1 => "1 program".to_string(),
        n => format!("{n} programs"),
    };
    format!("{}\t{}\t{}\t{}", bank.id, bank.name, status, programs)
}

fn format_bank_detail(bank: &Bank) -> String {
    let mut lines = vec![format!(
        "{} ({}){}",
        bank.name,
        if bank.is_active { "active" } else { "inactive" },
        if bank.auto_rates { ", auto-rates" } else { "" }
    )];
    if let Some(description) = &bank.description {
        lines.push(description.clone());
    }
    if let Some(logo) = &bank.logo {
        lines.push(format!("logo: {logo}"));
    }
    if bank.programs.is_empty() {
        lines.push("no programs".into());
    }
    for program in &bank.programs {
        lines.push(format!("- {}", bd_tui::program_summary(program)));
        if let Some(conditions) = &program.conditions {
            lines.push(format!("  {conditions}"));
        }
    }
    lines.join("\n")
}

fn format_template(template: &BankTemplate) -> String {
    if template.logo.is_empty() {
        template.name.to_string()
    } else {
        format!("{}\t{}", template.name, template.logo)
    }
}

fn format_category(category: ProgramCategory) -> String {
    let bucket = RateBucket::classify(category.label());
    let quote = FixedRateTable::bucket_quote(bucket);
    format!(
        "{}\t{} · DP {} · PSK {}-{} · {}-{} yrs",
        category.label(),
        format_percent(quote.rate),
        format_percent(quote.min_down_payment),
        format_percent(quote.psk_min),
        format_percent(quote.psk_max),
        quote.min_term,
        quote.max_term
    )
}

fn format_errors(bank: &Bank, errors: &ValidationErrors) -> Vec<String> {
    errors
        .iter()
        .map(|(field, message)| format!("{}\t{}\t{}", bank.id, field, message))
        .collect()
}
