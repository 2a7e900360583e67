//! CLI definition and command dispatch for snapseek.
//!
//! This module defines the command-line interface using `clap` and provides
//! the `run()` function that dispatches commands to the engine.
//!
//! ## Configuration Precedence
//!
//! Configuration is resolved with the following precedence (highest to lowest):
//! 1. CLI flags (e.g., `--config`, `--data-dir`, `--device`)
//! 2. Environment variables (`SNAPSEEK_CONFIG`, `SNAPSEEK_DATA_DIR`, `SNAPSEEK_DEVICE`)
//! 3. Config file (`~/.snapseek/config.yaml` or path from `--config`/`SNAPSEEK_CONFIG`)
//! 4. Built-in defaults
//!
//! Commands that only touch stored entries (`list`, `describe`, `activate`,
//! `deactivate`, `health`, `rebuild`) open the index without loading any model.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::json;

use crate::ui::color::terminal_width;
use crate::ui::{format, table, ColorMode, MessageType, Progress, ProgressMode, StepTree, Style};

use snapseek_core::{
    collect_image_files, effective_caption, rebuild_index, DevicePreference, GlobalConfig,
    IndexManager, SnapEngine, SnapError, SnapResult, DEFAULT_TOP_K,
};

// ============================================================================
// CLI Definition
// ============================================================================

/// Version string including git commit hash
const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ")");

/// Exit code for fatal startup errors (configuration, index alignment).
const EXIT_FATAL: u8 = 2;

/// snapseek – find images by describing them
#[derive(Parser, Debug)]
#[command(name = "snapseek")]
#[command(author, version = VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true, env = "SNAPSEEK_VERBOSE")]
    pub verbose: bool,

    /// Suppress progress and informational messages
    #[arg(short, long, global = true, env = "SNAPSEEK_QUIET")]
    pub quiet: bool,

    /// Path to configuration file (default: ~/.snapseek/config.yaml)
    #[arg(long, global = true, env = "SNAPSEEK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding the index, metadata and images (default: ~/.snapseek/data)
    #[arg(long, global = true, env = "SNAPSEEK_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Device preference for embedding inference (auto/gpu/cpu)
    #[arg(long, global = true, env = "SNAPSEEK_DEVICE")]
    pub device: Option<String>,

    /// Color output mode: always, never, or auto (default: auto)
    #[arg(long, global = true, env = "SNAPSEEK_COLOR", default_value = "auto")]
    pub color: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add images (files or folders) to the index
    #[command(after_help = r#"EXAMPLES:
    # Ingest a single photo with a description
    snapseek ingest beach.jpg --description "our dog at the beach"

    # Ingest every image under a folder
    snapseek ingest ~/Pictures/holiday

    # Report as JSON
    snapseek ingest ./photos --json
"#)]
    Ingest {
        /// Image files or folders to ingest
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Caption stored with every ingested image
        #[arg(short, long, value_name = "TEXT")]
        description: Option<String>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Search images with a text prompt
    #[command(after_help = r#"EXAMPLES:
    # Top 5 matches
    snapseek query "a dog running on sand"

    # Only the best 3, as JSON
    snapseek query "red car" --top-k 3 --json
"#)]
    Query {
        /// What the image shows
        text: String,

        /// Maximum number of results (values <= 0 use the default of 5)
        #[arg(short = 'k', long, default_value_t = DEFAULT_TOP_K as i64, allow_negative_numbers = true)]
        top_k: i64,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// List indexed images
    #[command(after_help = r#"EXAMPLES:
    # Active images only
    snapseek list

    # Include deactivated images
    snapseek list --all --json
"#)]
    List {
        /// Include deactivated entries
        #[arg(long)]
        all: bool,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show, set or clear the description of an image
    #[command(after_help = r#"EXAMPLES:
    # Show current captions
    snapseek describe 0b7c9d2e-...

    # Set a description
    snapseek describe 0b7c9d2e-... "grandma's birthday cake"

    # Remove it again
    snapseek describe 0b7c9d2e-... --clear
"#)]
    Describe {
        /// External id of the image
        id: String,

        /// New description
        #[arg(conflicts_with = "clear")]
        text: Option<String>,

        /// Remove the user description
        #[arg(long)]
        clear: bool,
    },

    /// Make a deactivated image searchable again
    Activate {
        /// External id of the image
        id: String,
    },

    /// Hide an image from search results (its row is kept until `rebuild`)
    Deactivate {
        /// External id of the image
        id: String,
    },

    /// Print the caption of the image that best matches a prompt
    #[command(after_help = r#"EXAMPLES:
    snapseek check "birthday cake"
"#)]
    Check {
        /// What the image shows
        text: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show row counts of the vector index and metadata store
    Health {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Drop deactivated images and renumber rows (offline)
    #[command(after_help = r#"EXAMPLES:
    # Compact the index; index.ssvx.bak and meta.db.bak are written first
    snapseek rebuild
"#)]
    Rebuild {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Inspect snapseek configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration and report warnings
    Check {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show the resolved configuration (file, environment and flags merged)
    Show {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

// ============================================================================
// Run function
// ============================================================================

/// Run the CLI application.
///
/// Returns `ExitCode::SUCCESS` on success, exit code 2 for fatal startup
/// errors (configuration, index alignment), and `ExitCode::FAILURE` otherwise.
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    // Warnings always (config issues, skipped files, failed captions);
    // debug only with --verbose.
    let log_level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    let filter = format!(
        "snapseek_core={lvl},snapseek_db={lvl},snapseek_model={lvl},snapseek_cli={lvl}",
        lvl = log_level
    );

    tracing_subscriber::fmt()
        .with_env_filter(&filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let color_mode = ColorMode::parse(&cli.color).unwrap_or_default();
    let style = Style::new(color_mode);

    let config = match resolve_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            let hint = match &cli.config {
                Some(path) => format!("Check your config at {}", path.display()),
                None => "Check your global config at ~/.snapseek/config.yaml".to_string(),
            };
            eprintln!(
                "{}",
                style.error_with_context(
                    "Failed to load configuration",
                    Some(&e.to_string()),
                    Some(&hint),
                )
            );
            return ExitCode::from(EXIT_FATAL);
        }
    };

    let result = dispatch(&cli, &style, config);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", render_error(&style, &e));
            if e.is_fatal() {
                ExitCode::from(EXIT_FATAL)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn dispatch(cli: &Cli, style: &Style, config: GlobalConfig) -> SnapResult<()> {
    match &cli.command {
        Command::Ingest {
            paths,
            description,
            json,
        } => {
            let mode = ProgressMode::detect(cli.quiet, *json);
            handle_ingest(style, mode, config, paths, description.as_deref(), *json)
        }
        Command::Query { text, top_k, json } => {
            let mode = ProgressMode::detect(cli.quiet, *json);
            handle_query(style, mode, config, text, *top_k, *json)
        }
        Command::Check { text, json } => {
            let mode = ProgressMode::detect(cli.quiet, *json);
            handle_check(style, mode, config, text, *json)
        }
        Command::List { all, json } => handle_list(style, &open_index(&config)?, *all, *json),
        Command::Describe { id, text, clear } => {
            handle_describe(style, &open_index(&config)?, id, text.as_deref(), *clear)
        }
        Command::Activate { id } => handle_set_active(style, &open_index(&config)?, id, true),
        Command::Deactivate { id } => handle_set_active(style, &open_index(&config)?, id, false),
        Command::Health { json } => handle_health(style, &config, &open_index(&config)?, *json),
        Command::Rebuild { json } => {
            let mode = ProgressMode::detect(cli.quiet, *json);
            handle_rebuild(style, mode, &open_index(&config)?, *json)
        }
        Command::Config { action } => match action {
            ConfigAction::Check { json } => handle_config_check(style, cli, &config, *json),
            ConfigAction::Show { json } => handle_config_show(style, &config, *json),
        },
    }
}

/// Load the config file and apply flag/environment overrides.
fn resolve_config(cli: &Cli) -> SnapResult<GlobalConfig> {
    let mut config = match &cli.config {
        Some(path) => GlobalConfig::from_path(path)?,
        None => GlobalConfig::load_default()?,
    };

    if let Some(dir) = &cli.data_dir {
        config = config.with_data_dir(dir);
    }

    if let Some(device) = &cli.device {
        let preference: DevicePreference = device
            .parse()
            .map_err(|e: String| SnapError::configuration(e, "Valid options: auto, gpu, cpu"))?;
        config = config.with_device(preference);
    }

    Ok(config)
}

/// Open the stores without loading models.
fn open_index(config: &GlobalConfig) -> SnapResult<IndexManager> {
    for warning in config.validate()? {
        tracing::warn!("Config warning: {}", warning);
    }
    IndexManager::open(&config.resolved_data_dir(), &config.index)
}

/// Load models and open the engine, showing a step while models load.
fn open_engine(steps: &mut StepTree, config: GlobalConfig) -> SnapResult<SnapEngine> {
    steps.step("Loading models");
    match SnapEngine::from_global_config(config) {
        Ok(engine) => Ok(engine),
        Err(e) => {
            steps.abandon();
            Err(e.downcast::<SnapError>().unwrap_or_else(SnapError::Other))
        }
    }
}

fn render_error(style: &Style, err: &SnapError) -> String {
    match err {
        SnapError::Configuration { message, hint } => {
            style.error_with_context("Configuration error", Some(message.as_str()), Some(hint.as_str()))
        }
        SnapError::Alignment { .. } => style.error_with_context(
            "Index is inconsistent",
            Some(&err.to_string()),
            Some("If the last ingest was interrupted, set index.recoverDanglingTail: true; otherwise restore index.ssvx.bak and meta.db.bak"),
        ),
        SnapError::NotFound(id) => style.error_with_context(
            &format!("No image with id '{}'", id),
            None,
            Some("Run `snapseek list --all` to see ids"),
        ),
        SnapError::Capability { provider, reason } => style.error_with_context(
            &format!("Model '{}' unavailable", provider),
            Some(reason.as_str()),
            Some("Place the CLIP checkpoint under ~/.snapseek/models or set SNAPSEEK_MODELS_DIR"),
        ),
        other => style.message(MessageType::Err, &other.to_string()),
    }
}

// ============================================================================
// Command handlers
// ============================================================================

fn handle_ingest(
    style: &Style,
    mode: ProgressMode,
    config: GlobalConfig,
    paths: &[PathBuf],
    description: Option<&str>,
    json: bool,
) -> SnapResult<()> {
    let mut steps = StepTree::new(mode);
    let engine = open_engine(&mut steps, config)?;

    steps.step("Collecting images");
    let files = match collect_targets(paths) {
        Ok(files) => files,
        Err(e) => {
            steps.abandon();
            return Err(e);
        }
    };
    steps.finish_last_step();

    let progress = Progress::bar(files.len() as u64, "Ingesting", mode);
    let report = engine.ingest_files(&files, description, |p| {
        progress.set_position(p.done as u64)
    });
    progress.finish_clear();
    let report = report?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).unwrap_or_default()
        );
        return Ok(());
    }

    for skip in &report.skipped {
        println!(
            "{}",
            style.message(
                MessageType::Skip,
                &format!("{}: {}", skip.path.display(), skip.reason)
            )
        );
    }

    if report.ingested.is_empty() {
        println!("{}", style.message(MessageType::Warn, "No images ingested"));
    } else {
        println!(
            "{}",
            style.message(
                MessageType::Ok,
                &format!(
                    "Ingested {} of {} images",
                    report.ingested.len(),
                    report.discovered
                )
            )
        );
        if report.ingested.len() == 1 {
            let single = &report.ingested[0];
            println!("{}", style.message_detail("Id", &single.external_id));
            println!("{}", style.message_detail("Stored", &single.stored_path));
            if let Some(caption) = &single.effective_caption {
                println!("{}", style.message_detail("Caption", caption));
            }
        }
    }
    Ok(())
}

/// Expand folders into their image files; plain files are kept as given.
fn collect_targets(paths: &[PathBuf]) -> SnapResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            files.extend(collect_image_files(path)?);
        } else if path.is_file() {
            files.push(path.clone());
        } else {
            return Err(SnapError::validation(format!(
                "{} does not exist",
                path.display()
            )));
        }
    }
    Ok(files)
}

fn handle_query(
    style: &Style,
    mode: ProgressMode,
    config: GlobalConfig,
    text: &str,
    top_k: i64,
    json: bool,
) -> SnapResult<()> {
    let mut steps = StepTree::new(mode);
    let engine = open_engine(&mut steps, config)?;
    steps.step("Searching");
    let results = match engine.query(text, top_k) {
        Ok(results) => results,
        Err(e) => {
            steps.abandon();
            return Err(e);
        }
    };
    steps.finish_last_step();

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&results).unwrap_or_default()
        );
        return Ok(());
    }

    println!("{}", style.section("RESULTS"));
    println!();
    println!("  {}", style.key_value("Query", text));

    if results.is_empty() {
        println!();
        println!("{}", style.message(MessageType::Info, "The index is empty."));
        println!(
            "{}",
            style.message(MessageType::Hint, "Add images with `snapseek ingest <folder>`")
        );
        return Ok(());
    }

    if results.iter().any(|r| r.low_confidence) {
        println!();
        println!(
            "{}",
            style.message(
                MessageType::Warn,
                "No confident match; showing the closest image"
            )
        );
    }

    println!();
    let path_width = (terminal_width() / 2).max(20);
    println!("{}", table::render_results_table(&results, path_width));
    Ok(())
}

fn handle_check(
    style: &Style,
    mode: ProgressMode,
    config: GlobalConfig,
    text: &str,
    json: bool,
) -> SnapResult<()> {
    let mut steps = StepTree::new(mode);
    let engine = open_engine(&mut steps, config)?;
    steps.step("Searching");
    let caption = match engine.describe_best_match(text) {
        Ok(caption) => caption,
        Err(e) => {
            steps.abandon();
            return Err(e);
        }
    };
    steps.finish_last_step();

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({ "query": text, "caption": caption }))
                .unwrap_or_default()
        );
        return Ok(());
    }

    match caption {
        Some(caption) => println!("{}", style.caption(&caption)),
        None => println!(
            "{}",
            style.message(MessageType::Info, "No described image matches well enough.")
        ),
    }
    Ok(())
}

fn handle_list(style: &Style, index: &IndexManager, all: bool, json: bool) -> SnapResult<()> {
    let entries = index.list(all)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&entries).unwrap_or_default()
        );
        return Ok(());
    }

    if entries.is_empty() {
        println!("{}", style.message(MessageType::Info, "No images indexed."));
        return Ok(());
    }

    println!("{}", table::render_entries_table(&entries));
    println!();
    println!(
        "{}",
        style.message(
            MessageType::Info,
            &format!("{} images", format::format_thousands(entries.len() as u64))
        )
    );
    Ok(())
}

fn handle_describe(
    style: &Style,
    index: &IndexManager,
    id: &str,
    text: Option<&str>,
    clear: bool,
) -> SnapResult<()> {
    if clear {
        index.set_user_caption(id, None)?;
        println!(
            "{}",
            style.message(MessageType::Ok, &format!("Cleared description of {}", style.entry_id(id)))
        );
        return Ok(());
    }

    match text.map(str::trim).filter(|t| !t.is_empty()) {
        Some(text) => {
            index.set_user_caption(id, Some(text))?;
            println!(
                "{}",
                style.message(MessageType::Ok, &format!("Described {}", style.entry_id(id)))
            );
        }
        None => {
            let entry = index
                .get(id)?
                .ok_or_else(|| SnapError::NotFound(id.to_string()))?;
            println!("{}", style.section("ENTRY"));
            println!();
            println!("  {}", style.key_value("Id", &entry.external_id));
            println!("  {}", style.key_value("Row", &entry.row_index.to_string()));
            println!("  {}", style.key_value("Path", &style.file_path(&entry.stored_path)));
            println!("  {}", style.key_value("Status", &style.active_flag(entry.active)));
            println!(
                "  {}",
                style.key_value("Description", entry.user_caption.as_deref().unwrap_or("-"))
            );
            println!(
                "  {}",
                style.key_value("Auto caption", entry.auto_caption.as_deref().unwrap_or("-"))
            );
            println!(
                "  {}",
                style.key_value("Effective", effective_caption(&entry).unwrap_or("-"))
            );
        }
    }
    Ok(())
}

fn handle_set_active(style: &Style, index: &IndexManager, id: &str, active: bool) -> SnapResult<()> {
    index.set_active(id, active)?;
    let verb = if active { "Activated" } else { "Deactivated" };
    println!(
        "{}",
        style.message(MessageType::Ok, &format!("{} {}", verb, style.entry_id(id)))
    );
    if !active {
        println!(
            "{}",
            style.message(MessageType::Hint, "Run `snapseek rebuild` to reclaim its row")
        );
    }
    Ok(())
}

fn handle_health(
    style: &Style,
    config: &GlobalConfig,
    index: &IndexManager,
    json: bool,
) -> SnapResult<()> {
    let report = index.health()?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).unwrap_or_default()
        );
        return Ok(());
    }

    println!("{}", style.section("HEALTH"));
    println!();
    println!(
        "  {}",
        style.key_value("Data dir", &style.file_path(&report.data_dir.display().to_string()))
    );
    println!("  {}", style.key_value("Dimension", &report.dimension.to_string()));
    println!(
        "  {}",
        style.key_value("Vectors", &format::format_thousands(report.vectors as u64))
    );
    println!(
        "  {}",
        style.key_value("Entries", &format::format_thousands(report.entries as u64))
    );
    println!(
        "  {}",
        style.key_value("Active", &format::format_thousands(report.active as u64))
    );
    println!(
        "  {}",
        style.key_value("Images", &format::format_bytes(dir_size(&config.images_dir())))
    );
    println!();

    if report.is_aligned() {
        println!("{}", style.message(MessageType::Ok, "Stores aligned"));
    } else {
        println!("{}", style.message(MessageType::Err, "Stores out of alignment"));
    }
    let inactive = report.entries.saturating_sub(report.active);
    if inactive > 0 {
        println!(
            "{}",
            style.message(
                MessageType::Hint,
                &format!("{} deactivated rows; `snapseek rebuild` drops them", inactive)
            )
        );
    }
    Ok(())
}

/// Total size of the regular files directly inside `dir` (0 if missing).
fn dir_size(dir: &Path) -> u64 {
    fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter_map(|e| e.metadata().ok())
                .filter(|m| m.is_file())
                .map(|m| m.len())
                .sum()
        })
        .unwrap_or(0)
}

fn handle_rebuild(
    style: &Style,
    mode: ProgressMode,
    index: &IndexManager,
    json: bool,
) -> SnapResult<()> {
    let spinner = Progress::spinner("Rebuilding index", mode);
    let report = match rebuild_index(index) {
        Ok(report) => report,
        Err(e) => {
            spinner.finish_clear();
            return Err(e);
        }
    };

    if json {
        spinner.finish_clear();
        println!(
            "{}",
            serde_json::to_string_pretty(&report).unwrap_or_default()
        );
        return Ok(());
    }

    spinner.finish_with_message(&style.message(
        MessageType::Ok,
        &format!("Rebuilt index: {} rows -> {}", report.rows_before, report.rows_after),
    ));
    println!("{}", style.message_detail("Removed", &report.removed().to_string()));
    Ok(())
}

// ============================================================================
// Config command handlers
// ============================================================================

fn handle_config_check(
    style: &Style,
    cli: &Cli,
    config: &GlobalConfig,
    json: bool,
) -> SnapResult<()> {
    let warnings = config.validate()?;
    let source = cli
        .config
        .clone()
        .or_else(GlobalConfig::default_path)
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(defaults)".to_string());

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "valid": true,
                "source": source,
                "warnings": warnings,
            }))
            .unwrap_or_default()
        );
        return Ok(());
    }

    println!(
        "{}",
        style.message(MessageType::Ok, &format!("Configuration valid ({})", source))
    );
    for warning in &warnings {
        println!("{}", style.message(MessageType::Warn, warning));
    }
    Ok(())
}

fn handle_config_show(style: &Style, config: &GlobalConfig, json: bool) -> SnapResult<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(config).unwrap_or_default()
        );
        return Ok(());
    }

    println!("{}", style.section("CONFIG"));
    println!();
    println!(
        "  {}",
        style.key_value("Data dir", &config.resolved_data_dir().display().to_string())
    );
    println!("  {}", style.key_value("Dimension", &config.index.dimension.to_string()));
    println!(
        "  {}",
        style.key_value(
            "Recover dangling tail",
            &config.index.recover_dangling_tail.to_string()
        )
    );
    println!("  {}", style.key_value("Model", &config.embedding.model_id));
    println!("  {}", style.key_value("Device", &config.embedding.device.to_string()));
    println!(
        "  {}",
        style.key_value(
            "Caption weights",
            &format!(
                "user {:.2}, auto {:.2}",
                config.scoring.user_caption_weight, config.scoring.auto_caption_weight
            )
        )
    );
    println!(
        "  {}",
        style.key_value("Score floor", &format!("{:.2}", config.scoring.min_score_floor))
    );
    println!(
        "  {}",
        style.key_value(
            "Image weight",
            &format!("{:.2}", config.blend.primary_weight)
        )
    );
    let captions = if config.captioning.enabled {
        format!("{} via {}", config.captioning.model, config.captioning.endpoint)
    } else {
        "off".to_string()
    };
    println!("  {}", style.key_value("Auto captions", &captions));
    println!(
        "  {}",
        style.key_value("Ingest batch", &config.ingest.batch_size.to_string())
    );
    Ok(())
}
