use std::path::PathBuf;

use clap::ArgMatches;
use tracing::{error, info, warn};

use civic_core::config::ExplorerConfig;
use civic_core::events;
use civic_core::state::StateMap;
use civic_core::{
    AppState, Explorer, ExplorerSnapshot, HashPatch, HashValue, HeadlessSurface, LoadStatus,
    MemoryLocation,
};

use crate::sources::{FileGeometrySource, FileTransport};

/// Load configuration with warning on errors.
///
/// Falls back to defaults if config loading fails, but notifies the user via:
/// - stderr message for immediate visibility
/// - structured log event `cli.config.load_failed` for debugging
fn load_config_with_warning() -> ExplorerConfig {
    match ExplorerConfig::load_hierarchy() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Could not load config: {}. Using defaults.\n\
                 Tip: Check ~/.civic/config.toml and ./.civic/config.toml for syntax errors.",
                e
            );
            warn!(
                event = "cli.config.load_failed",
                error = %e,
                "Config load failed, using defaults"
            );
            ExplorerConfig::default()
        }
    }
}

/// Split a `key=value` argument. The value goes through hash value parsing,
/// so `zoom=15` is stored as a number and `open=true` as a boolean.
fn parse_assignment(raw: &str) -> Result<(String, HashValue), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), HashValue::parse(value))),
        _ => Err(format!("Invalid assignment '{}': expected key=value", raw)),
    }
}

pub fn run_command(matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    events::log_app_startup();

    match matches.subcommand() {
        Some(("explore", sub_matches)) => handle_explore_command(sub_matches),
        Some(("hash", sub_matches)) => handle_hash_command(sub_matches),
        Some(("config", _)) => handle_config_command(),
        _ => {
            error!(event = "cli.command_unknown");
            Err("Unknown command".into())
        }
    }
}

fn handle_explore_command(matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config_with_warning();
    let json_output = matches.get_flag("json");
    let hash = matches
        .get_one::<String>("hash")
        .map(String::as_str)
        .unwrap_or_default();

    let records_path = match matches.get_one::<String>("records") {
        Some(path) => PathBuf::from(path),
        None => config
            .transport
            .records_path
            .clone()
            .ok_or("No records file: pass --records or set transport.records_path in config")?,
    };
    let geometry_dir = matches
        .get_one::<String>("geometry-dir")
        .map(PathBuf::from)
        .unwrap_or_else(|| config.transport.geometry_dir());

    info!(
        event = "cli.explore_started",
        records = %records_path.display(),
        hash = hash,
        json_output = json_output
    );

    let (width, height) = config.map.viewport_size();
    let surface = HeadlessSurface::new(width, height, (config.map.min_zoom(), config.map.max_zoom()));
    let mut explorer = Explorer::new(
        &config,
        Box::new(MemoryLocation::new(hash)),
        surface,
        FileTransport::new(&records_path),
        FileGeometrySource::new(geometry_dir),
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(explorer.start());

    let snapshot = explorer.snapshot();
    explorer.teardown();

    if snapshot.status == LoadStatus::Failed {
        eprintln!("❌ Failed to load records from {}", records_path.display());
        error!(
            event = "cli.explore_failed",
            records = %records_path.display()
        );
        return Err(format!("Failed to load records from {}", records_path.display()).into());
    }

    if json_output {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print_snapshot(&snapshot);
    }

    info!(
        event = "cli.explore_completed",
        records = snapshot.record_count,
        markers = snapshot.markers.len()
    );

    Ok(())
}

fn print_snapshot(snapshot: &ExplorerSnapshot) {
    let shown = snapshot.markers.iter().filter(|m| m.attached).count();

    println!("Hash:      #{}", snapshot.hash);
    println!("View:      {}", snapshot.view.as_deref().unwrap_or("-"));
    println!(
        "Viewport:  {:.6}, {:.6} @ zoom {}",
        snapshot.viewport.lat, snapshot.viewport.lng, snapshot.viewport.zoom
    );
    println!("Records:   {}", snapshot.record_count);
    println!("Markers:   {} ({} shown)", snapshot.markers.len(), shown);
    if !snapshot.regions.is_empty() {
        println!("Regions:   {}", snapshot.regions.join(", "));
    }
    if !snapshot.layers_shown.is_empty() {
        println!("Layers:    {}", snapshot.layers_shown.join(", "));
    }
    if let Some(filter_box) = &snapshot.filter_box {
        println!("Box:       {}", filter_box);
    }
    println!();
    println!("{}", snapshot.results_info);
    for row in &snapshot.list {
        let marker = if row.selected { "*" } else { " " };
        println!("  {} {}", marker, row.reference);
    }
}

fn handle_hash_command(matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    let from = matches
        .get_one::<String>("from")
        .map(String::as_str)
        .unwrap_or_default();
    let json_output = matches.get_flag("json");

    let mut patch = HashPatch::new();
    for raw in matches.get_many::<String>("set").into_iter().flatten() {
        let (key, value) = parse_assignment(raw)?;
        patch.insert(key, Some(value));
    }
    for key in matches.get_many::<String>("unset").into_iter().flatten() {
        patch.insert(key.as_str(), None);
    }

    info!(event = "cli.hash_started", from = from, edits = patch.len());

    let mut state = AppState::new(Box::new(MemoryLocation::new(from)));
    state.init();
    if !patch.is_empty() {
        match state.extend_hash(patch, false) {
            Ok(events) => info!(event = "cli.hash_completed", events = events.len()),
            Err(e) => {
                eprintln!("❌ Failed to update hash: {}", e);
                error!(event = "cli.hash_failed", error = %e);
                events::log_app_error(&e);
                return Err(e.into());
            }
        }
    }

    if json_output {
        let decoded: StateMap = state.get_state();
        println!("{}", serde_json::to_string_pretty(&decoded)?);
    } else {
        println!("#{}", state.hash());
    }

    Ok(())
}

fn handle_config_command() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config_with_warning();
    if let Err(e) = config.validate() {
        eprintln!("Warning: {}", e);
        warn!(event = "cli.config.invalid", error = %e);
    }
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_assignment() {
        assert_eq!(
            parse_assignment("zoom=15").unwrap(),
            ("zoom".to_string(), HashValue::Num(15.0))
        );
        assert_eq!(
            parse_assignment("sort=-price").unwrap(),
            ("sort".to_string(), HashValue::from("-price"))
        );
        assert_eq!(
            parse_assignment("f.text=").unwrap(),
            ("f.text".to_string(), HashValue::from(""))
        );
    }

    #[test]
    fn test_parse_assignment_rejects_missing_key() {
        assert!(parse_assignment("=1").is_err());
        assert!(parse_assignment("zoom").is_err());
    }
}
