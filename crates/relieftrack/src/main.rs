//! `reltrack` - CLI for relieftrack
//!
//! This binary provides the command-line interface for issuing codes,
//! registering intake lists and kits, and following live vehicle tracks.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::sync::{mpsc, Mutex};
use tracing::warn;

use relieftrack::cli::{
    Cli, CodesCommand, Command, ConfigCommand, IntakeCommand, KitsCommand, OutputFormat,
    TrackCommand,
};
use relieftrack::map::{MapContext, RenderStyle};
use relieftrack::telemetry::{GeoDataClient, TrackedEntity};
use relieftrack::tracking::{TickOutcome, TickReport, TrackingController};
use relieftrack::{codes, geolocate, init_logging, intake, kits, Config, Error};
use relieftrack_store::StoreClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = Config::load_from(cli.config.clone())?;

    // Execute the command
    match cli.command {
        Command::Codes(cmd) => handle_codes(&config, cmd).await,
        Command::Intake(cmd) => handle_intake(&config, cmd).await,
        Command::Kits(cmd) => handle_kits(&config, cmd).await,
        Command::Track(cmd) => handle_track(&config, cmd).await,
        Command::Config(cmd) => handle_config(&config, cmd),
    }
}

/// Build a store client from the configured credentials.
fn store_client(config: &Config) -> anyhow::Result<StoreClient> {
    StoreClient::new(&config.store.base_url, &config.store.api_key)
        .map_err(Error::from)
        .context("store is not configured (set store.base_url and store.api_key)")
}

async fn handle_codes(config: &Config, cmd: CodesCommand) -> anyhow::Result<()> {
    match cmd {
        CodesCommand::Issue { count } => {
            let store = store_client(config)?;
            let batch = codes::issue_batch(&store, &config.links, count).await?;
            for code in &batch.codes {
                let mark = if code.saved { "saved" } else { "NOT SAVED" };
                println!("{}  {}  [{mark}]", code.uuid, code.url);
            }
            println!();
            println!("Issued {} of {} requested.", batch.saved_count(), batch.requested);
        }
        CodesCommand::Show { identifier } => {
            let store = store_client(config)?;
            match codes::lookup(&store, &identifier).await? {
                Some(summary) => print_code_summary(&summary),
                None => println!("Code is not registered."),
            }
        }
        CodesCommand::List { format } => {
            let store = store_client(config)?;
            let rows = intake::overview(&store).await?;
            print_code_list(&rows, format)?;
        }
    }
    Ok(())
}

fn print_code_summary(summary: &codes::CodeSummary) {
    println!("uuid:       {}", summary.uuid);
    println!("status:     {}", summary.status.as_deref().unwrap_or("-"));
    println!("created at: {}", summary.created_at.as_deref().unwrap_or("-"));
    println!("updated at: {}", summary.updated_at.as_deref().unwrap_or("-"));
    match &summary.list_text {
        Some(list) => {
            println!(
                "list ({}):",
                summary.list_status.as_deref().unwrap_or("no status")
            );
            for line in list.lines() {
                println!("  {line}");
            }
        }
        None => println!("list:       none registered"),
    }
}

fn print_code_list(rows: &[codes::CodeSummary], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => print_json(rows)?,
        OutputFormat::Plain => {
            for row in rows {
                println!("{}", row.uuid);
            }
        }
        OutputFormat::Table => {
            println!("{:<38} {:<12} {:<22} list", "uuid", "status", "created at");
            for row in rows {
                println!(
                    "{:<38} {:<12} {:<22} {}",
                    row.uuid,
                    row.status.as_deref().unwrap_or("-"),
                    row.created_at.as_deref().unwrap_or("-"),
                    if row.list_text.is_some() { "yes" } else { "no" },
                );
            }
            println!();
            println!("{} codes.", rows.len());
        }
    }
    Ok(())
}

async fn handle_intake(config: &Config, cmd: IntakeCommand) -> anyhow::Result<()> {
    match cmd {
        IntakeCommand::Scan { text } => {
            let uuid = codes::extract_uuid(&text)?;
            println!("uuid: {uuid}");
            println!("register at: {}", intake::registration_url(&config.links, &uuid));
        }
        IntakeCommand::Register { uuid, list, file } => {
            let uuid = codes::normalize_identifier(&uuid)?;
            let list = read_text_arg(list, file, "--list or --file")?;
            let store = store_client(config)?;
            let outcome = intake::register_list(&store, &uuid, &list).await?;
            println!("List registered for {}.", outcome.uuid);
            if let Some(warning) = outcome.warning {
                println!("warning: {warning}");
            }
        }
        IntakeCommand::Queue { text, file, format } => {
            let text = read_text_arg(text, file, "queue text or --file")?;
            let entries = intake::parse_queue(&text);
            match format {
                OutputFormat::Json => print_json(&entries)?,
                OutputFormat::Plain | OutputFormat::Table => {
                    for entry in &entries {
                        match entry.quantity {
                            Some(quantity) => println!("{:>6}  {}", quantity, entry.item),
                            None => println!("     -  {}", entry.item),
                        }
                    }
                    println!();
                    println!("{} entries.", entries.len());
                }
            }
        }
    }
    Ok(())
}

async fn handle_kits(config: &Config, cmd: KitsCommand) -> anyhow::Result<()> {
    match cmd {
        KitsCommand::Catalog => {
            for kit in kits::catalog() {
                println!("{}", kit.name);
                for item in kit.items {
                    println!("  - {item}");
                }
                println!();
            }
        }
        KitsCommand::Register { category, list } => {
            let list = match list {
                Some(list) => list,
                None => kits::default_list(&category).ok_or_else(|| {
                    Error::validation(format!(
                        "'{category}' is not a catalog category and no --list was given"
                    ))
                })?,
            };
            let store = store_client(config)?;
            let kit = kits::register_kit(&store, &config.links, &category, &list).await?;
            println!("Kit {} registered.", kits::short_id(&kit.id));
            println!("receipt: {}", kit.receipt_url);
        }
        KitsCommand::Confirm {
            id,
            partial,
            notes,
            message,
            address,
            locate,
        } => {
            let coordinates = if locate {
                match geolocate::current_position(config.geolocate_timeout()).await {
                    Ok(position) => Some(position),
                    Err(error) => {
                        // Confirmation still goes through without a position.
                        warn!(%error, "device position unavailable");
                        println!("note: device position unavailable, confirming without it");
                        None
                    }
                }
            } else {
                None
            };

            let form = kits::ReceiptForm {
                received_complete: !partial,
                notes,
                message,
                address,
                coordinates,
            };
            let store = store_client(config)?;
            kits::confirm_receipt(&store, &id, &form).await?;
            println!(
                "Receipt confirmed ({}).",
                if partial { "partial delivery" } else { "complete delivery" }
            );
        }
        KitsCommand::List { format } => {
            let store = store_client(config)?;
            let groups = kits::list_kits(&store).await?;
            match format {
                OutputFormat::Json => print_json(&groups)?,
                OutputFormat::Plain => {
                    for (_, rows) in &groups {
                        for row in rows {
                            println!("{}", row.id);
                        }
                    }
                }
                OutputFormat::Table => {
                    for (category, rows) in &groups {
                        println!("{category} ({})", rows.len());
                        for row in rows {
                            println!(
                                "  {:<14} {:<18} confirmed: {}",
                                kits::short_id(&row.id),
                                row.status.as_deref().unwrap_or("-"),
                                row.confirmed.unwrap_or(false),
                            );
                        }
                        println!();
                    }
                }
            }
        }
    }
    Ok(())
}

async fn handle_track(config: &Config, cmd: TrackCommand) -> anyhow::Result<()> {
    match cmd {
        TrackCommand::Vehicles { format } => {
            let geo = GeoDataClient::new(store_client(config)?);
            let entities = geo.entities().await?;
            match format {
                OutputFormat::Json => print_json(&entities)?,
                OutputFormat::Plain => {
                    for entity in &entities {
                        println!("{}", entity.id);
                    }
                }
                OutputFormat::Table => {
                    println!("{:>6}  name", "id");
                    for entity in &entities {
                        println!("{:>6}  {}", entity.id, entity.name);
                    }
                }
            }
        }
        TrackCommand::Follow {
            vehicle,
            cycles,
            interval,
        } => {
            let geo = GeoDataClient::new(store_client(config)?);
            let entity = resolve_vehicle(&geo, vehicle).await?;

            let interval = match interval {
                Some(0) => return Err(Error::validation("--interval must be greater than 0").into()),
                Some(secs) => Duration::from_secs(secs),
                None => config.poll_interval(),
            };

            follow_vehicle(&geo, config, entity, interval, cycles).await;
        }
        TrackCommand::Scatter => {
            let geo = GeoDataClient::new(store_client(config)?);
            let samples = geo.movements().await?;
            let mut map = MapContext::new(RenderStyle::Scatter, &config.map);
            map.render(&samples);

            let viewport = map.viewport();
            println!("{} movements plotted.", map.overlay().markers.len());
            println!(
                "viewport: center {:.5},{:.5}  zoom {}",
                viewport.center.lat, viewport.center.lon, viewport.zoom
            );
        }
    }
    Ok(())
}

async fn resolve_vehicle(geo: &GeoDataClient, id: i64) -> anyhow::Result<TrackedEntity> {
    let entities = geo.entities().await?;
    entities
        .into_iter()
        .find(|entity| entity.id == id)
        .ok_or_else(|| Error::validation(format!("no vehicle with id {id}")).into())
}

/// Drive a polling session until interrupted or the cycle limit is reached.
async fn follow_vehicle(
    geo: &GeoDataClient,
    config: &Config,
    entity: TrackedEntity,
    interval: Duration,
    cycles: Option<u64>,
) {
    let map = Arc::new(Mutex::new(MapContext::new(RenderStyle::Route, &config.map)));
    let (tx, mut rx) = mpsc::channel(32);
    let mut controller =
        TrackingController::new(Arc::new(geo.clone()), Arc::clone(&map), interval, tx);

    println!(
        "Following {} (id {}), every {}s. Ctrl-C to stop.",
        entity.name,
        entity.id,
        interval.as_secs()
    );
    controller.start(entity);

    let mut completed: u64 = 0;
    loop {
        tokio::select! {
            report = rx.recv() => {
                let Some(report) = report else { break };
                print_tick(&report);
                completed += 1;
                if cycles.is_some_and(|limit| completed >= limit) {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("Interrupted.");
                break;
            }
        }
    }
    controller.stop();
}

fn print_tick(report: &TickReport) {
    let stamp = report.at.format("%H:%M:%S");
    match &report.outcome {
        TickOutcome::Rendered { samples } => println!(
            "{stamp}  {}  {} samples  center {:.5},{:.5}  zoom {}",
            report.entity.name,
            samples,
            report.viewport.center.lat,
            report.viewport.center.lon,
            report.viewport.zoom,
        ),
        TickOutcome::Failed { error } => {
            println!("{stamp}  {}  fetch failed: {error}", report.entity.name);
        }
    }
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Store]");
                println!("  Base URL:        {}", display_or_unset(&config.store.base_url));
                println!(
                    "  API key:         {}",
                    if config.store.api_key.is_empty() { "(unset)" } else { "(set)" }
                );
                println!();
                println!("[Tracking]");
                println!("  Poll interval:   {}s", config.tracking.poll_interval_secs);
                println!();
                println!("[Map]");
                println!(
                    "  Viewport:        {}x{} (padding {})",
                    config.map.width_px, config.map.height_px, config.map.padding_px
                );
                println!(
                    "  Initial view:    {:.4},{:.4} zoom {}",
                    config.map.center_lat, config.map.center_lon, config.map.default_zoom
                );
                println!("  Max zoom:        {}", config.map.max_zoom);
                println!();
                println!("[Links]");
                println!("  Public origin:   {}", config.links.public_origin);
                println!("  Lookup route:    {}", config.links.lookup_route);
                println!("  Receipt route:   {}", config.links.receipt_route);
                println!("  Register route:  {}", config.links.registration_route);
                println!();
                println!("[Geolocate]");
                println!("  Timeout:         {}s", config.geolocate.timeout_secs);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}

fn display_or_unset(value: &str) -> &str {
    if value.is_empty() { "(unset)" } else { value }
}

/// Resolve an inline-text-or-file argument pair.
fn read_text_arg(
    text: Option<String>,
    file: Option<PathBuf>,
    what: &str,
) -> anyhow::Result<String> {
    match (text, file) {
        (Some(text), _) => Ok(text),
        (None, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("could not read {}", path.display())),
        (None, None) => Err(Error::validation(format!("{what} is required")).into()),
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
