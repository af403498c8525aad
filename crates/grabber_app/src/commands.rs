use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use grabber_core::{BuildId, ChangeSet, CoordinationState, DepotId};
use grabber_engine::{load_changes, Coordinator, EngineConfig, LogEventSink, RunRequest};
use grabber_logging::{grabber_info, grabber_warn};

use crate::cli::{AppArgs, ChangesArgs, Cli, Command};

pub async fn execute(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    match cli.command {
        Command::Builds(args) => builds(&config, args).await,
        Command::Changes(args) => changes(config, args).await,
        Command::Resume(args) => resume(&config, args).await,
        Command::Status => status(&config),
        Command::Reset => reset(&config),
        Command::Show(args) => show(&args.file),
    }
}

fn load_config(cli: &Cli) -> Result<EngineConfig> {
    let mut config = EngineConfig::load(&cli.config)
        .with_context(|| format!("loading config {}", cli.config.display()))?;
    if let Some(state) = &cli.state {
        config.state_path = state.clone();
    }
    Ok(config)
}

fn coordinator(config: &EngineConfig) -> Result<Coordinator> {
    Coordinator::from_config(config, Arc::new(LogEventSink)).context("setting up the grabber")
}

async fn builds(config: &EngineConfig, args: AppArgs) -> Result<()> {
    let listing = coordinator(config)?
        .builds(&args.app)
        .await
        .with_context(|| format!("reading builds for app {}", args.app))?;
    if listing.builds.is_empty() {
        bail!("app {} lists no builds", args.app);
    }
    if !listing.app.name.is_empty() {
        println!("{} ({})", listing.app.name, listing.app.app_id);
    }
    for build in &listing.builds {
        println!("{build}");
    }
    Ok(())
}

async fn changes(mut config: EngineConfig, args: ChangesArgs) -> Result<()> {
    if let Some(output) = args.output {
        config.output_dir = output;
    }
    let coordinator = coordinator(&config)?;

    let cancel = coordinator.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            grabber_warn!("Interrupted; stopping after the current wait");
            cancel.cancel();
        }
    });

    let summary = coordinator
        .run(RunRequest {
            app_id: args.app.clone(),
            depot_id: DepotId::new(args.depot),
            build_from: BuildId::new(args.from),
            build_to: BuildId::new(args.to),
        })
        .await
        .context("collecting changes")?;

    for (build, outcome) in &summary.visits {
        println!("{build}: {outcome}");
    }
    match summary.export_path {
        Some(path) => println!("{}", path.display()),
        None => bail!(
            "run finished without writing a changes file; try `resume --app {}`",
            args.app
        ),
    }
    Ok(())
}

async fn resume(config: &EngineConfig, args: AppArgs) -> Result<()> {
    match coordinator(config)?.resume(&args.app).await? {
        Some(path) => println!("{}", path.display()),
        None => grabber_info!("Nothing waiting for export"),
    }
    Ok(())
}

fn status(config: &EngineConfig) -> Result<()> {
    let state = coordinator(config)?
        .state()
        .with_context(|| format!("reading {}", config.state_path.display()))?;
    print!("{}", render_state(&state));
    Ok(())
}

fn reset(config: &EngineConfig) -> Result<()> {
    coordinator(config)?
        .reset()
        .with_context(|| format!("clearing {}", config.state_path.display()))
}

fn show(path: &Path) -> Result<()> {
    let changes = load_changes(path).with_context(|| format!("reading {}", path.display()))?;
    print!("{}", render_changes(&changes));
    Ok(())
}

fn render_state(state: &CoordinationState) -> String {
    let mut out = String::new();
    let depot = state.depot_id.as_ref().map_or("-", DepotId::as_str);
    let _ = writeln!(out, "depot:            {depot}");
    let _ = writeln!(
        out,
        "manifest:         {}",
        state.manifest_id.as_deref().unwrap_or("-")
    );
    let _ = writeln!(out, "visit in flight:  {}", state.visit_in_flight);
    let _ = writeln!(out, "ready to export:  {}", state.ready_to_export);
    match &state.aggregate {
        Some(changes) => {
            let _ = writeln!(
                out,
                "collected:        {} -> {}: {} added, {} removed, {} modified",
                changes.initial_build,
                changes.final_build,
                changes.added.len(),
                changes.removed.len(),
                changes.modified.len()
            );
        }
        None => {
            let _ = writeln!(out, "collected:        nothing");
        }
    }
    out
}

fn render_changes(changes: &ChangeSet) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} (app {}) depot {}: build {} -> {}",
        changes.app_name, changes.app_id, changes.depot_id, changes.initial_build, changes.final_build
    );
    if let Some(manifest) = &changes.manifest_id {
        let _ = writeln!(out, "manifest {manifest}");
    }
    for (marker, paths) in [
        ('+', &changes.added),
        ('-', &changes.removed),
        ('~', &changes.modified),
    ] {
        for path in paths {
            let _ = writeln!(out, "{marker} {path}");
        }
    }
    let _ = writeln!(
        out,
        "{} added, {} removed, {} modified",
        changes.added.len(),
        changes.removed.len(),
        changes.modified.len()
    );
    out
}
