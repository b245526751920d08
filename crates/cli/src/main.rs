//! checksync command-line tool.
//!
//! Provides subcommands for translating text between the two checklist
//! markup dialects, parsing Jira checklist changelogs, applying a changelog
//! against a stored wiki snapshot, and generating / validating
//! configuration files.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use comfy_table::{presets::UTF8_FULL_CONDENSED, Table};
use console::style;
use tracing_subscriber::EnvFilter;

use checksync_core::checklist::{read_field_file, write_field_file};
use checksync_core::config::{AppConfig, SanitizerKind};
use checksync_core::mapping::{BmpSanitizer, PassthroughSanitizer, TextSanitizer};
use checksync_core::markup::{checklist_to_wiki, wiki_to_checklist};
use checksync_core::merge::MergeEngine;
use checksync_core::{parse_item_changes, Checklist, ConfiguredMapping};

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// checksync command-line tool.
#[derive(Parser, Debug)]
#[command(
    name = "checksync",
    version,
    about = "Synchronize Jira checklist fields with wiki checklist documents"
)]
struct Cli {
    /// Path to the TOML configuration file. Defaults to
    /// `checksync/config.toml` under the user configuration directory;
    /// built-in defaults are used when no file exists.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate text between the two checklist markup dialects.
    Translate {
        /// Translation direction.
        #[arg(value_enum)]
        direction: Direction,

        /// Text to translate. Read from --file when omitted.
        text: Option<String>,

        /// Read the text to translate from this file.
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Parse a checklist changelog into change records.
    Parse {
        /// Changelog text file.
        file: PathBuf,

        /// Print records as JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Apply a changelog against a stored snapshot and emit the merged field.
    Merge {
        /// Wiki field markup file holding the current snapshot.
        snapshot: PathBuf,

        /// Changelog file with the new values of the change batch.
        changelog: PathBuf,

        /// Changelog file with the previous values of the same batch
        /// (carries pre-rename names for removals and renames).
        #[arg(long)]
        old_changelog: Option<PathBuf>,

        /// Write the merged field markup to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate a default configuration file.
    Init {
        /// Output path for the generated config file.
        #[arg(short, long, default_value = "./checksync.toml")]
        output: PathBuf,
    },

    /// Validate a configuration file.
    Validate,
}

/// Translation direction for the `translate` subcommand.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Direction {
    /// Checklist markup -> wiki markup.
    ToWiki,
    /// Wiki markup -> checklist markup.
    ToChecklist,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    // Minimal logging for CLI
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("warn"))
        .with_target(false)
        .without_time()
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Translate {
            direction,
            text,
            file,
        } => cmd_translate(direction, text, file),
        Commands::Parse { file, json } => cmd_parse(&cli.config, &file, json),
        Commands::Merge {
            snapshot,
            changelog,
            old_changelog,
            output,
        } => cmd_merge(&cli.config, &snapshot, &changelog, old_changelog, output),
        Commands::Init { output } => cmd_init(&output),
        Commands::Validate => cmd_validate(&cli.config),
    }
}

// ---------------------------------------------------------------------------
// Config helpers
// ---------------------------------------------------------------------------

/// Default config location under the user configuration directory.
fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("checksync").join("config.toml"))
}

/// Load the configuration. An explicitly given path must exist; the default
/// path is optional and falls back to built-in defaults.
fn resolve_config(config: &Option<PathBuf>) -> Result<AppConfig> {
    match config {
        Some(path) => {
            AppConfig::load_from_file(path).context("failed to load configuration file")
        }
        None => match default_config_path().filter(|p| p.exists()) {
            Some(path) => {
                AppConfig::load_from_file(&path).context("failed to load configuration file")
            }
            None => Ok(AppConfig::default()),
        },
    }
}

fn sanitizer_for(config: &AppConfig) -> Box<dyn TextSanitizer> {
    match config.sync.sanitizer {
        SanitizerKind::Passthrough => Box::new(PassthroughSanitizer),
        SanitizerKind::Bmp => Box::new(BmpSanitizer),
    }
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

fn cmd_translate(direction: Direction, text: Option<String>, file: Option<PathBuf>) -> Result<()> {
    let input = match (text, file) {
        (Some(text), _) => text,
        (None, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        (None, None) => anyhow::bail!("either a text argument or --file is required"),
    };

    let translated = match direction {
        Direction::ToWiki => checklist_to_wiki(&input),
        Direction::ToChecklist => wiki_to_checklist(&input),
    };

    println!("{translated}");
    Ok(())
}

fn cmd_parse(config: &Option<PathBuf>, file: &Path, json: bool) -> Result<()> {
    let config = resolve_config(config)?;
    let sanitizer = sanitizer_for(&config);

    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let changes = parse_item_changes(&sanitizer.sanitize(&raw));

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&changes).context("failed to encode change records")?
        );
        return Ok(());
    }

    if changes.is_empty() {
        println!("{}", style("no change records").dim());
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(["#", "Kinds", "Name", "Status", "Priority", "Due", "Assignees"]);

    for (index, change) in &changes {
        let kinds: Vec<&str> = ["added", "modified", "removed", "reordered", "h"]
            .into_iter()
            .filter(|kind| change.has_changed(kind))
            .collect();

        table.add_row([
            index.to_string(),
            kinds.join(", "),
            change.name().unwrap_or_default().to_string(),
            change.status().unwrap_or_default().to_string(),
            change.priority().unwrap_or_default().to_string(),
            change.due_date().map(|d| d.to_string()).unwrap_or_default(),
            change.assignee_ids().unwrap_or_default().to_string(),
        ]);
    }

    println!("{table}");
    Ok(())
}

fn cmd_merge(
    config: &Option<PathBuf>,
    snapshot: &Path,
    changelog: &Path,
    old_changelog: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<()> {
    let config = resolve_config(config)?;
    let sanitizer = sanitizer_for(&config);
    let mapping = ConfiguredMapping::from_config(&config.mapping);

    let stored = read_field_file(snapshot)
        .with_context(|| format!("failed to read {}", snapshot.display()))?;
    let baseline = stored.clone().unwrap_or_default();

    let new_raw = std::fs::read_to_string(changelog)
        .with_context(|| format!("failed to read {}", changelog.display()))?;
    let new_changes = parse_item_changes(&sanitizer.sanitize(&new_raw));

    let old_changes = match old_changelog {
        Some(path) => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            parse_item_changes(&sanitizer.sanitize(&raw))
        }
        None => Default::default(),
    };

    let engine = MergeEngine::new(&mapping);
    let outcome = engine.apply(&baseline, &old_changes, &new_changes, stored.as_ref());

    match output {
        Some(path) => {
            write_field_file(&path, &outcome.checklist)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!(
                "{} {} record(s) applied, {} item(s), written to {}",
                style("✓").green(),
                new_changes.len(),
                outcome.checklist.len(),
                path.display()
            );
        }
        None => {
            print_checklist(&outcome.checklist);
            println!("{}", outcome.after);
        }
    }

    Ok(())
}

fn print_checklist(checklist: &Checklist) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(["", "Name", "Description", "Flags", "Due"]);

    for item in checklist.items() {
        let mut flags = Vec::new();
        if item.header {
            flags.push("header");
        }
        if item.pinned {
            flags.push("pinned");
        }
        if item.mandatory {
            flags.push("mandatory");
        }

        table.add_row([
            if item.checked { "[x]" } else { "[ ]" }.to_string(),
            item.name.clone().unwrap_or_default(),
            item.description.clone().unwrap_or_default(),
            flags.join(", "),
            item.end_date.map(|d| d.to_string()).unwrap_or_default(),
        ]);
    }

    eprintln!("{table}");
}

fn cmd_init(output: &Path) -> Result<()> {
    if output.exists() {
        anyhow::bail!("{} already exists, not overwriting", output.display());
    }

    std::fs::write(output, AppConfig::default_toml())
        .with_context(|| format!("failed to write {}", output.display()))?;
    println!(
        "{} wrote default configuration to {}",
        style("✓").green(),
        output.display()
    );
    Ok(())
}

fn cmd_validate(config: &Option<PathBuf>) -> Result<()> {
    let path = config
        .clone()
        .or_else(default_config_path)
        .context("no configuration path available")?;

    AppConfig::load_from_file(&path).context("configuration is invalid")?;
    println!("{} {} is valid", style("✓").green(), path.display());
    Ok(())
}
