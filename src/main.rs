//! Lifelog - a personal journal on the command line.
//!
//! Logs are short texts whose `#hashtags` become tags. They can be exported
//! as CSV for spreadsheets, backed up as JSON, and restored from either.
//!
//!   lifelog add "morning run #health"
//!   lifelog list --tag health
//!   lifelog export --encoding shift-jis
//!   lifelog import ~/.lifelog/letslog/backup_file.letslog

use std::path::Path;

use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use lifelog::application::{
    format_records, format_stats, format_tags_table, DateRange, ExportOutcome, JournalService,
    OutputFormat,
};
use lifelog::cli::{Cli, Commands, ConfigAction};
use lifelog::domain::{AppConfig, ExportEncoding, Language, LogRecord};
use lifelog::infrastructure::{ensure_config_exists, load_config, save_config};

fn main() {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

/// Main application logic.
fn run(cli: Cli) -> anyhow::Result<()> {
    let format = cli.output_format().map_err(anyhow::Error::msg)?;
    let data_dir = cli.data_dir.as_deref();
    let config = load_config(data_dir).context("Failed to load configuration")?;

    let command = match cli.command {
        Commands::Config { action } => return cmd_config(action, config, data_dir),
        command => command,
    };

    let mut journal = JournalService::new(&config).context("Failed to open the journal")?;

    match command {
        Commands::Add { text, at } => {
            let at = at.map(|value| parse_time(&journal, &value)).transpose()?;
            let record = journal.add(&text, at)?;
            print_saved("Saved", &record);
        }
        Commands::Edit { id, text } => {
            let record = journal.edit(&id, &text)?;
            print_saved("Updated", &record);
        }
        Commands::Redate { id, at } => {
            let at = parse_time(&journal, &at)?;
            let record = journal.redate(&id, at)?;
            print_saved("Moved", &record);
        }
        Commands::Delete { id } => {
            let record = journal.delete(&id)?;
            print_saved("Deleted", &record);
        }
        Commands::List {
            limit,
            offset,
            tag,
            from,
            to,
        } => {
            let records = match (tag, from, to) {
                (Some(tag), _, _) => journal.by_tag(&tag)?,
                (None, Some(from), Some(to)) => {
                    journal.in_range(DateRange::from_days(&from, &to, journal.format())?)?
                }
                _ => journal.list(offset, limit)?,
            };
            print_records(&journal, &records, format)?;
        }
        Commands::Show { id } => {
            let record = journal.show(&id)?;
            let format = match format {
                OutputFormat::Table => OutputFormat::Markdown,
                other => other,
            };
            print_records(&journal, std::slice::from_ref(&record), format)?;
        }
        Commands::Search { keyword } => {
            let records = journal.search(&keyword)?;
            print_records(&journal, &records, format)?;
        }
        Commands::Tags => {
            let tags = journal.tags()?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&tags)?),
                _ => println!("{}", format_tags_table(&tags)),
            }
        }
        Commands::Stats => {
            let stats = journal.stats()?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
                _ => println!("{}", format_stats(&stats, journal.format())),
            }
        }
        Commands::Export {
            encoding,
            from,
            to,
            output,
        } => {
            let range = match (from, to) {
                (Some(from), Some(to)) => Some(DateRange::from_days(&from, &to, journal.format())?),
                _ => None,
            };
            let encoding = encoding.unwrap_or(config.export.encoding);
            let destination = output.unwrap_or_else(|| config.export_file_path());

            let outcome = journal.export_csv(range, encoding, &destination)?;
            print_outcome(&outcome, "Exported", Some(encoding));
        }
        Commands::Backup { output } => {
            let destination = output.unwrap_or_else(|| config.backup_file_path());
            let outcome = journal.backup(&destination)?;
            print_outcome(&outcome, "Backed up", None);
        }
        Commands::Import { path, encoding } => {
            let encoding = encoding.or(Some(config.export.encoding));
            let count = journal
                .import(&path, encoding)
                .with_context(|| format!("Import of {} failed", path.display()))?;
            println!(
                "{} Imported {} logs from {}",
                "✓".green().bold(),
                count,
                path.display()
            );
        }
        Commands::Config { .. } => {}
    }

    Ok(())
}

/// Configuration subcommands.
fn cmd_config(
    action: ConfigAction,
    mut config: AppConfig,
    data_dir: Option<&Path>,
) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            println!("{}", "⚙ Configuration".bold());
            println!("  Data directory: {}", config.data_dir().display());
            println!(
                "  Export encoding: {}",
                config.export.encoding.select_title().cyan()
            );
            println!("  Language: {}", config.display.language.title().cyan());
            println!(
                "  UTC offset: {}",
                config
                    .display
                    .utc_offset_minutes
                    .map_or_else(|| "system".to_string(), |m| format!("{m} min"))
            );
            println!("  Export file: {}", config.export_file_path().display());
            println!("  Backup file: {}", config.backup_file_path().display());
            println!();
            println!("Encodings:");
            for encoding in ExportEncoding::ALL {
                println!("  {:<10} {}", encoding.code(), encoding.export_title());
            }
            println!("Languages:");
            for language in Language::ALL {
                println!("  {:<10} {}", language.code(), language.title());
            }
            return Ok(());
        }
        ConfigAction::Init => {
            let path = ensure_config_exists(data_dir)?;
            println!("{} Configuration at {}", "✓".green().bold(), path.display());
            return Ok(());
        }
        ConfigAction::SetEncoding { encoding } => config.export.encoding = encoding,
        ConfigAction::SetLanguage { language } => config.display.language = language,
        ConfigAction::SetOffset { minutes } => {
            if minutes.is_some_and(|m| m.abs() >= 24 * 60) {
                bail!("UTC offset must be less than 24 hours");
            }
            config.display.utc_offset_minutes = minutes;
        }
    }

    save_config(&config)?;
    println!("{} Configuration saved", "✓".green().bold());
    Ok(())
}

fn parse_time(journal: &JournalService, value: &str) -> anyhow::Result<DateTime<Utc>> {
    journal
        .format()
        .parse_user_datetime(value)
        .with_context(|| format!("Invalid date '{value}', use YYYY-MM-DD or \"YYYY-MM-DD HH:MM\""))
}

fn print_records(
    journal: &JournalService,
    records: &[LogRecord],
    format: OutputFormat,
) -> anyhow::Result<()> {
    if records.is_empty() && !matches!(format, OutputFormat::Json) {
        println!("No logs found.");
        return Ok(());
    }

    println!("{}", format_records(records, format, journal.format())?);
    Ok(())
}

fn print_saved(verb: &str, record: &LogRecord) {
    println!(
        "{} {} {} ({} {})",
        "✓".green().bold(),
        verb,
        record.id.to_string()[..8].cyan(),
        record.create_day,
        record.create_time
    );
}

fn print_outcome(outcome: &ExportOutcome, verb: &str, encoding: Option<ExportEncoding>) {
    match outcome {
        ExportOutcome::Written { path, count } => {
            let suffix = encoding.map(|e| format!(" ({})", e.select_title())).unwrap_or_default();
            println!(
                "{} {} {} logs to {}{}",
                "✓".green().bold(),
                verb,
                count,
                path.display(),
                suffix
            );
        }
        ExportOutcome::NoRecords => println!("{}", "No logs to write.".yellow()),
    }
}

/// Setup tracing/logging based on verbosity level.
fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time())
        .with(filter)
        .init();
}
