//! Stormgate replay (.SGReplay) parser CLI
//!
//! A command-line interface for parsing, validating, and analyzing SGReplay files.
//!
//! ## Commands
//!
//! - `info` - Display quick replay metadata
//! - `parse` - Parse replay with output format options
//! - `validate` - Validate replay format (exit codes for scripting)
//! - `dump` - Print raw message field trees for format research
//! - `batch` - Process multiple replays from a directory
//!
//! Log output goes to stderr and is controlled with `RUST_LOG`.

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::json;
use sgreplay_parser::batch::{find_replays, parse_files};
use sgreplay_parser::stats::ReplaySummary;
use sgreplay_parser::wire::json::to_json;
use sgreplay_parser::{
    decode_container, parse_replay_with_assets, AssetTable, Game, ParseOptions, TickRate,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Stormgate replay (.SGReplay) parser
#[derive(Parser)]
#[command(name = "sgreplay-parser")]
#[command(about = "Stormgate replay (.SGReplay) parser", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display replay information
    Info {
        /// Path to the replay file
        file: PathBuf,
    },
    /// Parse a replay file
    Parse {
        /// Path to the replay file
        file: PathBuf,
        /// Output format: json, pretty
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,
        /// Include all events in output
        #[arg(long)]
        events: bool,
        /// Include chat messages
        #[arg(long)]
        chat: bool,
        /// Include entity activity
        #[arg(long)]
        entities: bool,
        /// runtime_session.json used to resolve names
        #[arg(long)]
        assets: Option<PathBuf>,
        /// Override the tick convention
        #[arg(long)]
        tick_rate: Option<TickRateArg>,
    },
    /// Validate replay format
    Validate {
        /// Path to the replay file
        file: PathBuf,
        /// Verbose error reporting
        #[arg(short, long)]
        verbose: bool,
    },
    /// Print decoded message field trees as JSON lines
    Dump {
        /// Path to the replay file
        file: PathBuf,
        /// Skip this many messages
        #[arg(long, default_value_t = 0)]
        skip: usize,
        /// Print at most this many messages
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        /// Nesting depth for nested messages
        #[arg(long, default_value_t = sgreplay_parser::wire::json::DEFAULT_RENDER_DEPTH)]
        depth: usize,
        /// Also print the footer
        #[arg(long)]
        footer: bool,
    },
    /// Parse multiple replay files
    Batch {
        /// Directory containing replay files
        directory: PathBuf,
        /// Output directory for JSON files
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Descend into subdirectories
        #[arg(short, long)]
        recursive: bool,
        /// Generate summary report
        #[arg(long)]
        summary: bool,
        /// Player whose point of view the summary takes
        #[arg(long)]
        player: Option<String>,
        /// runtime_session.json used to resolve names
        #[arg(long)]
        assets: Option<PathBuf>,
        /// Override the tick convention
        #[arg(long)]
        tick_rate: Option<TickRateArg>,
        /// Continue on errors
        #[arg(long)]
        continue_on_error: bool,
    },
}

/// Output format options
#[derive(Clone, Debug, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

/// Tick convention options
#[derive(Clone, Copy, Debug, ValueEnum)]
enum TickRateArg {
    /// 1024 ticks per second
    Hz1024,
    /// One tick per millisecond
    Ms,
}

impl From<TickRateArg> for TickRate {
    fn from(arg: TickRateArg) -> Self {
        match arg {
            TickRateArg::Hz1024 => TickRate::Hz1024,
            TickRateArg::Ms => TickRate::Milliseconds,
        }
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Info { file } => cmd_info(&file),
        Commands::Parse {
            file,
            output,
            events,
            chat,
            entities,
            assets,
            tick_rate,
        } => {
            let sections = Sections {
                events,
                chat,
                entities,
            };
            cmd_parse(&file, &output, sections, assets.as_deref(), tick_rate)
        }
        Commands::Validate { file, verbose } => cmd_validate(&file, verbose),
        Commands::Dump {
            file,
            skip,
            limit,
            depth,
            footer,
        } => cmd_dump(&file, skip, limit, depth, footer),
        Commands::Batch {
            directory,
            output,
            recursive,
            summary,
            player,
            assets,
            tick_rate,
            continue_on_error,
        } => cmd_batch(&BatchArgs {
            directory,
            output,
            recursive,
            summary,
            player,
            assets,
            tick_rate,
            continue_on_error,
        }),
    }
}

fn parse_options(tick_rate: Option<TickRateArg>, keep_events: bool) -> ParseOptions {
    let options = ParseOptions::default().keep_events(keep_events);
    match tick_rate {
        Some(rate) => options.with_tick_rate(rate.into()),
        None => options,
    }
}

fn load_assets(path: Option<&Path>) -> Result<Option<AssetTable>, ExitCode> {
    match path.map(AssetTable::from_file).transpose() {
        Ok(table) => Ok(table),
        Err(e) => {
            eprintln!("Error loading asset table: {e}");
            Err(ExitCode::FAILURE)
        }
    }
}

fn read_file(file: &Path) -> Result<Vec<u8>, ExitCode> {
    std::fs::read(file).map_err(|e| {
        eprintln!("Error reading file: {e}");
        ExitCode::FAILURE
    })
}

// ============================================================================
// Info Command Implementation
// ============================================================================

fn cmd_info(file: &Path) -> ExitCode {
    let data = match read_file(file) {
        Ok(d) => d,
        Err(code) => return code,
    };

    let options = ParseOptions::default().keep_events(false);
    let game = match parse_replay_with_assets(&data, &options, None) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    print_info(&game, data.len());
    ExitCode::SUCCESS
}

#[allow(clippy::cast_precision_loss)]
fn print_info(game: &Game, file_size: usize) {
    println!("=== Replay Information ===\n");

    println!("File:");
    println!(
        "  Size: {} bytes ({:.2} KB)",
        file_size,
        file_size as f64 / 1024.0
    );
    println!("  Version: {}", game.header.version);
    println!("  Changelist: {}", game.header.changelist);
    println!("  Messages: {}", game.message_count);
    if let Some(name) = &game.gzip_header.filename {
        println!("  Stream name: {name}");
    }

    println!("\nGame:");
    println!("  Map: {}", game.map_name.as_deref().unwrap_or("Unknown"));
    println!("  Duration: {}", game.duration);
    if let Some(id) = &game.match_id {
        println!("  Match: {id}");
    }
    println!(
        "  Result: {}",
        if game.footer.is_some() {
            "recorded"
        } else {
            "not recorded"
        }
    );

    println!("\nPlayers ({}):", game.players.len());
    for player in &game.players {
        let team = player
            .team
            .map_or_else(String::new, |t| format!(" team {t}"));
        println!(
            "  [{}] {}{} - {:?}",
            player.player_id,
            player.display_name(),
            team,
            player.outcome
        );
    }
}

// ============================================================================
// Parse Command Implementation
// ============================================================================

/// Optional output sections for `parse`.
#[derive(Clone, Copy)]
struct Sections {
    events: bool,
    chat: bool,
    entities: bool,
}

fn cmd_parse(
    file: &Path,
    output: &OutputFormat,
    sections: Sections,
    assets_path: Option<&Path>,
    tick_rate: Option<TickRateArg>,
) -> ExitCode {
    let assets = match load_assets(assets_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let data = match read_file(file) {
        Ok(d) => d,
        Err(code) => return code,
    };

    let options = parse_options(tick_rate, sections.events);
    let mut game = match parse_replay_with_assets(&data, &options, assets.as_ref()) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if !sections.chat {
        game.chat.clear();
    }
    if !sections.entities {
        game.entities.clear();
    }

    match output {
        OutputFormat::Json => print_json(&game),
        OutputFormat::Pretty => print_pretty(&game, sections),
    }

    ExitCode::SUCCESS
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("Error serializing to JSON: {e}"),
    }
}

fn print_pretty(game: &Game, sections: Sections) {
    println!("=== Header ===");
    println!("Version: {}", game.header.version);
    println!("Changelist: {}", game.header.changelist);
    println!("Map: {}", game.map_name.as_deref().unwrap_or("Unknown"));
    println!("Duration: {} ({} ticks)", game.duration, game.duration_frames);
    println!("Tick rate: {:?}", game.tick_rate);
    println!();

    println!("=== Players ({}) ===", game.players.len());
    for player in &game.players {
        println!(
            "\nPlayer {} ({}): {:?}",
            player.player_id,
            player.display_name(),
            player.outcome
        );
        if let Some(team) = player.team {
            println!("  Team: {team}");
        }
        println!("  Commands: {}", player.command_count);
        println!("  APM: {:.1}", player.apm);

        if !player.build_order.is_empty() {
            println!("  Build order:");
            for entry in &player.build_order {
                println!("    {:>6}  {}", entry.time, entry.label());
            }
        }
        if !player.upgrades.is_empty() {
            println!("  Upgrades:");
            for upgrade in &player.upgrades {
                println!("    {:>6}  {}", upgrade.time, upgrade.name);
            }
        }
        if !player.rewards.is_empty() {
            println!("  Stormgate rewards:");
            for reward in &player.rewards {
                println!("    {:>6}  {}", reward.time, reward.name);
            }
        }
    }
    println!();

    println!("=== Events ===");
    for (kind, count) in &game.event_counts {
        println!("  {kind}: {count}");
    }
    println!();

    if sections.chat {
        println!("=== Chat Messages ({}) ===", game.chat.len());
        for msg in &game.chat {
            println!("  [{}] {}: {}", msg.time, msg.speaker, msg.text);
        }
        println!();
    }

    if sections.entities {
        println!("=== Entities ({}) ===", game.entities.len());
        for entity in game.entities.iter().take(20) {
            println!(
                "  {:>12}  {:>5} actions  {}-{}  {}",
                entity.target_id,
                entity.action_count,
                entity.first_seen,
                entity.last_seen,
                entity.inferred_type.as_deref().unwrap_or("-")
            );
        }
        if game.entities.len() > 20 {
            println!("  ... and {} more entities", game.entities.len() - 20);
        }
        println!();
    }

    if sections.events {
        println!("=== Event Log ({}) ===", game.events.len());
        // Only show first 50 events in pretty mode to avoid spam
        for event in game.events.iter().take(50) {
            println!("  {event}");
        }
        if game.events.len() > 50 {
            println!("  ... and {} more events", game.events.len() - 50);
        }
        println!();
    }

    if !game.anomalies.is_empty() {
        println!("=== Anomalies ({}) ===", game.anomalies.len());
        for anomaly in &game.anomalies {
            println!("  - {anomaly}");
        }
    }
    if game.truncated {
        println!("\nWARNING: message stream ended early; later events are missing");
    }
}

// ============================================================================
// Validate Command Implementation
// ============================================================================

struct ValidationResult {
    header_valid: bool,
    decompression_valid: bool,
    framing_valid: bool,
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl ValidationResult {
    fn is_valid(&self) -> bool {
        self.header_valid && self.decompression_valid && self.framing_valid
    }
}

fn cmd_validate(file: &Path, verbose: bool) -> ExitCode {
    let result = validate_replay(file);

    if verbose {
        print_validation_details(&result, file);
    } else {
        print_validation_summary(&result, file);
    }

    if result.is_valid() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn validate_replay(file: &Path) -> ValidationResult {
    let mut result = ValidationResult {
        header_valid: false,
        decompression_valid: false,
        framing_valid: false,
        errors: Vec::new(),
        warnings: Vec::new(),
    };

    let data = match std::fs::read(file) {
        Ok(d) => d,
        Err(e) => {
            result.errors.push(format!("Failed to read file: {e}"));
            return result;
        }
    };

    if let Err(e) = sgreplay_parser::header::read_container(&data) {
        result.errors.push(format!("Header parsing failed: {e}"));
        return result;
    }
    result.header_valid = true;

    if let Err(e) = decode_container(&data) {
        result.errors.push(format!("Decompression failed: {e}"));
        return result;
    }
    result.decompression_valid = true;

    let options = ParseOptions::default().keep_events(false);
    match parse_replay_with_assets(&data, &options, None) {
        Ok(game) => {
            result.framing_valid = !game.truncated;
            if game.truncated {
                result
                    .errors
                    .push("Message framing stopped before the end of the stream".to_string());
            }
            if game.footer.is_none() {
                result.warnings.push("No result footer".to_string());
            }
            if game.players.is_empty() {
                result.warnings.push("No players found in replay".to_string());
            }
            result
                .warnings
                .extend(game.anomalies.iter().map(ToString::to_string));
        }
        Err(e) => result.errors.push(format!("Parsing failed: {e}")),
    }

    result
}

fn print_validation_summary(result: &ValidationResult, file: &Path) {
    let status = if result.is_valid() { "VALID" } else { "INVALID" };
    println!("{}: {}", file.display(), status);
}

fn print_validation_details(result: &ValidationResult, file: &Path) {
    println!("Validating: {}\n", file.display());

    println!("Checks:");
    println!("  Header parsing:    {}", status_icon(result.header_valid));
    println!(
        "  Decompression:     {}",
        status_icon(result.decompression_valid)
    );
    println!("  Message framing:   {}", status_icon(result.framing_valid));

    if !result.errors.is_empty() {
        println!("\nErrors:");
        for error in &result.errors {
            println!("  - {error}");
        }
    }

    if !result.warnings.is_empty() {
        println!("\nWarnings:");
        for warning in &result.warnings {
            println!("  - {warning}");
        }
    }

    println!(
        "\nResult: {}",
        if result.is_valid() { "VALID" } else { "INVALID" }
    );
}

fn status_icon(valid: bool) -> &'static str {
    if valid {
        "[OK]"
    } else {
        "[FAIL]"
    }
}

// ============================================================================
// Dump Command Implementation
// ============================================================================

fn cmd_dump(file: &Path, skip: usize, limit: Option<usize>, depth: usize, footer: bool) -> ExitCode {
    let data = match read_file(file) {
        Ok(d) => d,
        Err(code) => return code,
    };

    let decoded = match decode_container(&data) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let options = ParseOptions::default().with_render_depth(depth);
    let mut status = ExitCode::SUCCESS;
    let lines = decoded
        .render_messages(&options)
        .skip(skip)
        .take(limit.unwrap_or(usize::MAX));
    for line in lines {
        match line {
            Ok(line) => println!("{line}"),
            Err(e) => {
                eprintln!("Framing stopped: {e}");
                status = ExitCode::FAILURE;
                break;
            }
        }
    }

    if footer {
        let recovery = decoded.footer();
        let rendered = recovery
            .footer
            .map(|f| to_json(&f.raw, options.render_depth));
        println!("{}", json!({ "footer": rendered }));
    }

    status
}

// ============================================================================
// Batch Command Implementation
// ============================================================================

struct BatchArgs {
    directory: PathBuf,
    output: Option<PathBuf>,
    recursive: bool,
    summary: bool,
    player: Option<String>,
    assets: Option<PathBuf>,
    tick_rate: Option<TickRateArg>,
    continue_on_error: bool,
}

fn cmd_batch(args: &BatchArgs) -> ExitCode {
    let replays = match find_replays(&args.directory, args.recursive) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error reading {}: {e}", args.directory.display());
            return ExitCode::FAILURE;
        }
    };

    if replays.is_empty() {
        eprintln!("No .SGReplay files found in {}", args.directory.display());
        return ExitCode::FAILURE;
    }

    eprintln!("Found {} replay files", replays.len());

    if let Some(ref dir) = args.output {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!("Failed to create output directory: {e}");
            return ExitCode::FAILURE;
        }
    }

    let assets = match load_assets(args.assets.as_deref()) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let options = parse_options(args.tick_rate, false);
    let report = parse_files(&replays, &options, assets.as_ref());

    for entry in &report.entries {
        let name = entry.path.file_name().unwrap_or_default().to_string_lossy();
        match &entry.result {
            Ok(game) => {
                eprintln!("{name}... OK");
                if let Some(dir) = &args.output {
                    if let Err(e) = write_game(dir, &entry.path, game) {
                        eprintln!("  failed to write output: {e}");
                    }
                }
            }
            Err(e) => eprintln!("{name}... ERROR: {e}"),
        }
    }

    eprintln!(
        "\nProcessed: {} success, {} errors",
        report.success_count(),
        report.failure_count()
    );

    if args.summary {
        let summary = report.summary(args.player.as_deref());
        print_summary(&summary);
        if let Some(dir) = &args.output {
            let summary_file = dir.join("summary.json");
            if let Ok(json) = serde_json::to_string_pretty(&summary) {
                if std::fs::write(&summary_file, json).is_ok() {
                    println!("\nSummary written to: {}", summary_file.display());
                }
            }
        }
    }

    if report.failure_count() > 0 && !args.continue_on_error {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn write_game(dir: &Path, replay: &Path, game: &Game) -> std::io::Result<()> {
    let output_file = dir
        .join(replay.file_stem().unwrap_or_default())
        .with_extension("json");
    let content = serde_json::to_string_pretty(game)?;
    std::fs::write(output_file, content)
}

fn print_summary(summary: &ReplaySummary) {
    println!("\n=== Batch Summary ===");
    if let Some(player) = &summary.player {
        println!("Player: {player}");
    }
    println!("Games: {}", summary.total_games);
    if summary.player.is_some() {
        println!(
            "Record: {}W {}L",
            summary.record.wins, summary.record.losses
        );
    }

    if let Some(avg) = summary.average_duration_seconds {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let total = avg.round() as u64;
        println!("Average duration: {}:{:02}", total / 60, total % 60);
    }

    println!("\nMaps:");
    for (map, record) in &summary.maps {
        println!("  {map}: {} games", record.games);
    }

    println!("\nChangelists:");
    for (changelist, record) in &summary.changelists {
        println!("  {changelist}: {} games", record.games);
    }

    let openings = summary.top_openings(10);
    if !openings.is_empty() {
        println!("\nTop openings:");
        for (opening, record) in openings {
            let rate = record
                .win_rate()
                .map_or_else(|| "-".to_string(), |r| format!("{:.0}%", r * 100.0));
            println!("  {:>3}x {:>4}  {opening}", record.games, rate);
        }
    }
}
