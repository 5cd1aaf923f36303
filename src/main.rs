use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use r3e_adaptation::config::AdaptationConfig;
use r3e_adaptation::data::{FsLoader, TextLoader};
use r3e_adaptation::fit::TrackPrediction;
use r3e_adaptation::game_data::AssetCatalog;
use r3e_adaptation::game_types::{ClassId, TrackId};
use r3e_adaptation::modify::suggest_range;
use r3e_adaptation::session::Session;
use r3e_adaptation::time::{make_time, parse_time};
use rootcause::prelude::*;
use tracing_subscriber::EnvFilter;

/// Inspect and edit RaceRoom `aiadaptation.xml` files
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log debug output (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON file with fitting options (minAI, maxAI, fitAll, ...)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// RaceRoom's r3e-data.json, used for class and track names
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List classes and track layouts from r3e-data.json, sorted by name
    Catalog,
    /// Summarize the AI levels and player times of adaptation files
    Summary {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Print predicted lap times for one class/track
    Predict {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(long)]
        class: ClassId,
        #[arg(long)]
        track: TrackId,
    },
    /// Replace a track's AI levels with predicted ones
    Apply {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(long)]
        class: ClassId,
        #[arg(long)]
        track: TrackId,
        /// Lowest AI level to write
        #[arg(long, requires = "to", conflicts_with = "center")]
        from: Option<u32>,
        /// Highest AI level to write
        #[arg(long, requires = "from")]
        to: Option<u32>,
        /// Write `aiNumLevels` levels around this one instead of --from/--to
        #[arg(long, required_unless_present = "from")]
        center: Option<u32>,
        /// Distance between written levels (defaults to `aiSpacing`)
        #[arg(long)]
        spacing: Option<u32>,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Drop every generated AI level
    RemoveGenerated {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Drop all AI levels, keeping player times
    Reset {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Remove player lap times
    PrunePlayer {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(long, requires = "track")]
        class: Option<ClassId>,
        #[arg(long, requires = "class")]
        track: Option<TrackId>,
        /// Position of the time to remove
        #[arg(long, requires = "class", conflicts_with = "keep_best")]
        index: Option<usize>,
        /// Keep only the fastest time (of one class/track, or everywhere)
        #[arg(long)]
        keep_best: bool,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Convert between seconds and `H:MM:SS.ffff` lap times
    Time {
        #[arg(required = true)]
        values: Vec<String>,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<AdaptationConfig, Report> {
    let Some(path) = path else {
        return Ok(AdaptationConfig::default());
    };
    let json = FsLoader
        .read_text(path)
        .context_with(|| format!("Could not read config {}", path.display()))?;
    let config = AdaptationConfig::from_json(&json)
        .context_with(|| format!("Invalid config {}", path.display()))?;
    Ok(config)
}

fn load_catalog(path: Option<&Path>) -> Result<Option<AssetCatalog>, Report> {
    let Some(path) = path else {
        return Ok(None);
    };
    let json = FsLoader
        .read_text(path)
        .context_with(|| format!("Could not read game data {}", path.display()))?;
    let catalog = AssetCatalog::from_json(&json)
        .context_with(|| format!("Could not parse game data {}", path.display()))?;
    Ok(Some(catalog))
}

/// Catalog spanning exactly the ids present in the loaded data.
fn catalog_from_session(session: &Session) -> AssetCatalog {
    let database = session.database();
    let player_times = session.player_times();

    let classes: BTreeSet<ClassId> = database
        .classes
        .keys()
        .chain(player_times.classes.keys())
        .copied()
        .collect();
    let tracks: BTreeSet<TrackId> = database
        .classes
        .values()
        .flat_map(|class| class.tracks.keys())
        .chain(player_times.classes.values().flat_map(|class| class.tracks.keys()))
        .copied()
        .collect();
    AssetCatalog::from_ids(classes, tracks)
}

fn load_session(files: &[PathBuf], catalog: Option<AssetCatalog>) -> Result<Session, Report> {
    let mut session = Session::new(catalog.clone().unwrap_or_default());
    for path in files {
        session
            .load_file(&FsLoader, path)
            .context_with(|| format!("Could not load {}", path.display()))?;
    }
    if catalog.is_none() {
        session.set_catalog(catalog_from_session(&session));
    }
    Ok(session)
}

fn save_session(session: &Session, output: &Path) -> Result<(), Report> {
    session
        .save(&FsLoader, output)
        .context_with(|| format!("Could not write {}", output.display()))?;
    println!("Wrote {}", output.display());
    Ok(())
}

fn class_label(catalog: &AssetCatalog, class: ClassId) -> String {
    match catalog.class_name(class) {
        Some(name) if name != class.to_string() => format!("{name} ({class})"),
        _ => class.to_string(),
    }
}

fn track_label(catalog: &AssetCatalog, track: TrackId) -> String {
    match catalog.track_name(track) {
        Some(name) if name != track.to_string() => format!("{name} ({track})"),
        _ => track.to_string(),
    }
}

fn print_catalog(catalog: &AssetCatalog) {
    println!("Classes:");
    for entry in catalog.classes_by_name() {
        println!("  {:>6}  {}", entry.id.raw(), entry.name);
    }
    println!("Tracks:");
    for entry in catalog.tracks_by_name() {
        match catalog.max_vehicles(entry.id) {
            Some(max) => println!("  {:>6}  {} ({max} cars)", entry.id.raw(), entry.name),
            None => println!("  {:>6}  {}", entry.id.raw(), entry.name),
        }
    }
}

fn print_summary(session: &Session) {
    let catalog = session.catalog();
    let summary = session.database().summary();
    println!(
        "{} classes, {} tracks, {} AI levels ({} generated)",
        summary.classes, summary.tracks, summary.levels, summary.generated_levels
    );

    for (class_id, class) in &session.database().classes {
        for (track_id, track) in class.tracks.iter().filter(|(_, t)| !t.is_empty()) {
            let (Some(min), Some(max)) = (track.min_ai, track.max_ai) else {
                continue;
            };
            let generated = track
                .ailevels
                .keys()
                .filter(|level| track.is_generated(**level))
                .count();
            let best = session
                .player_times()
                .track(*class_id, *track_id)
                .and_then(|player| player.best())
                .map(|time| make_time(time, ":"))
                .unwrap_or_else(|| "-".to_string());
            println!(
                "{} / {}: AI {min}..={max}, {} levels ({generated} generated), player best {best}",
                class_label(catalog, *class_id),
                track_label(catalog, *track_id),
                track.ailevels.len(),
            );
        }
    }
}

fn print_prediction(prediction: &TrackPrediction) {
    let quality = prediction.quality;
    println!(
        "degree {} fit, {}/{} observed levels off ({})",
        prediction.model.degree(),
        quality.failed,
        quality.attempted,
        if prediction.reliable { "reliable" } else { "unreliable" },
    );
    for (level, time) in &prediction.ailevels {
        println!("  {level:>4}  {}", make_time(*time, ":"));
    }
}

fn convert_time(value: &str) -> Result<String, Report> {
    if let Ok(seconds) = value.trim().parse::<f64>() {
        return Ok(make_time(seconds, ":"));
    }
    match parse_time(value) {
        Some(seconds) => Ok(format!("{seconds:.4}")),
        None => bail!("Not a lap time or number of seconds: {value}"),
    }
}

fn main() -> Result<(), Report> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut config = load_config(args.config.as_deref())?;
    let catalog = load_catalog(args.data.as_deref())?;

    match args.command {
        Command::Catalog => {
            let Some(catalog) = catalog else {
                bail!("The catalog command needs --data <r3e-data.json>");
            };
            print_catalog(&catalog);
        }
        Command::Summary { files } => {
            let session = load_session(&files, catalog)?;
            print_summary(&session);
        }
        Command::Predict {
            files,
            class,
            track,
        } => {
            let session = load_session(&files, catalog)?;
            let processed = session.processed(&config);
            let prediction = processed
                .prediction(class, track)
                .ok_or_else(|| rootcause::report!("Not enough data to predict class {class} on track {track}"))?;
            println!(
                "{} / {}",
                class_label(session.catalog(), class),
                track_label(session.catalog(), track)
            );
            print_prediction(prediction);
        }
        Command::Apply {
            files,
            class,
            track,
            from,
            to,
            center,
            spacing,
            output,
        } => {
            if let Some(spacing) = spacing {
                config.ai_spacing = spacing;
                config.validate()?;
            }
            let (from, to) = match (from, to, center) {
                (Some(from), Some(to), _) => (from, to),
                (_, _, Some(center)) => suggest_range(center, &config),
                _ => bail!("Either --from/--to or --center is required"),
            };

            let mut session = load_session(&files, catalog)?;
            let processed = session.processed(&config);
            if let Some(prediction) = processed.prediction(class, track)
                && !prediction.reliable
            {
                println!("Warning: the fit for this track is unreliable");
            }
            session
                .apply_range(&processed, class, track, from, to, config.ai_spacing)
                .context_with(|| format!("Could not apply AI levels {from}..={to}"))?;
            save_session(&session, &output)?;
        }
        Command::RemoveGenerated { files, output } => {
            let mut session = load_session(&files, catalog)?;
            let removed = session.remove_generated();
            println!("Removed {removed} generated AI levels");
            save_session(&session, &output)?;
        }
        Command::Reset { files, output } => {
            let mut session = load_session(&files, catalog)?;
            session.reset_database();
            save_session(&session, &output)?;
        }
        Command::PrunePlayer {
            files,
            class,
            track,
            index,
            keep_best,
            output,
        } => {
            let mut session = load_session(&files, catalog)?;
            match (class.zip(track), index) {
                (Some((class, track)), Some(index)) => {
                    session.remove_player_time(class, track, index)?;
                }
                (Some((class, track)), None) if keep_best => {
                    session.keep_best_player_time(class, track);
                }
                (None, None) if keep_best => session.keep_best_player_times_everywhere(),
                _ => bail!("Use --index with --class/--track, or --keep-best"),
            }
            if !session.player_times_changed() {
                println!("Player times unchanged");
            }
            save_session(&session, &output)?;
        }
        Command::Time { values } => {
            for value in values {
                println!("{value} => {}", convert_time(&value)?);
            }
        }
    }

    Ok(())
}
