use anyhow::Context;
use clap::Parser;
use satlink::config::{BundleArgs, Cli, Command, LogFormat, RunArgs};
use satlink::core::bundle::{ArchiveAssembler, Manifest};
use satlink::domain::ports::ConfigProvider;
use satlink::utils::error::exit_code_for;
use satlink::utils::{logger, validation::Validate};
use satlink::{LinkEngine, LocalStorage, SatLinkConfig, SatLinkError, SchedulePipeline};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match cli.log_format {
        LogFormat::Compact => logger::init_cli_logger(cli.verbose),
        LogFormat::Json => logger::init_json_logger(cli.verbose),
    }

    tracing::info!("Starting satlink {}", env!("CARGO_PKG_VERSION"));
    if cli.verbose {
        tracing::debug!("CLI arguments: {:?}", cli);
    }

    if let Err(e) = dispatch(&cli).await {
        std::process::exit(report_failure(&e));
    }
}

async fn dispatch(cli: &Cli) -> anyhow::Result<()> {
    let (config, source) = SatLinkConfig::load(cli.config.as_deref())?;
    tracing::info!("Using configuration from {}", source);

    match cli.command() {
        Command::Run(args) => run(config, args).await,
        Command::Check => check(config).await,
        Command::Bundle(args) => bundle(&config, &args),
    }
}

async fn run(mut config: SatLinkConfig, args: RunArgs) -> anyhow::Result<()> {
    if let Some(step) = args.time_step {
        config.set_time_step_ms(step);
    }
    if args.archive {
        config.enable_archive();
    }
    config.validate()?;

    let monitor_enabled = args.monitor.unwrap_or_else(|| config.monitoring_enabled());
    if monitor_enabled {
        tracing::info!("System monitoring enabled");
    }

    let pipeline = SchedulePipeline::new(LocalStorage::default(), config);
    let engine = LinkEngine::new_with_monitoring(pipeline, monitor_enabled);
    let summary = engine.run().await?;

    println!("Downlink plan completed");
    println!(
        "  {} stations, {} satellites, epoch {}",
        summary.stations, summary.satellites, summary.epoch
    );
    println!(
        "  {} downlink sessions, {} skipped slices, {:.3} MB received",
        summary.downlink_sessions, summary.skipped_windows, summary.data_received_mb
    );
    println!("  Schedules:  {}", summary.results_path);
    println!("  Statistics: {}", summary.statistics_path);
    if let Some(archive) = &summary.archive_path {
        println!("  Archive:    {}", archive);
    }
    Ok(())
}

async fn check(config: SatLinkConfig) -> anyhow::Result<()> {
    config.validate()?;

    let pipeline = SchedulePipeline::new(LocalStorage::default(), config);
    let survey = pipeline.survey().await?;
    let schedules = &survey.schedules;

    println!("Epoch: {}", schedules.epoch);
    println!(
        "Stations ({}): {}",
        schedules.station_count(),
        schedules.station_names.join(", ")
    );
    println!("Satellites: {}", schedules.satellite_count());
    println!("Connection windows: {}", schedules.connections.len());
    println!("Shooting windows: {}", schedules.shootings.len());
    println!("Recording time per satellite (s):");
    for (satellite, seconds) in &survey.recording_totals {
        println!("  {:<30}{:>15.3}", satellite, seconds);
    }
    Ok(())
}

fn bundle(config: &SatLinkConfig, args: &BundleArgs) -> anyhow::Result<()> {
    let manifest = Manifest::new(
        args.title.as_deref().unwrap_or(config.archive_title()),
        args.version.as_str(),
        args.entry_point
            .as_deref()
            .unwrap_or(config.archive_entry_point()),
    );

    let mut assembler = ArchiveAssembler::new(&manifest);
    for input in &args.inputs {
        let added = assembler
            .add_path(input)
            .with_context(|| format!("failed to add {}", input.display()))?;
        tracing::info!("{}: {} entries", input.display(), added);
    }

    let entries = assembler.len();
    let duplicates = assembler.duplicates();
    let bytes = assembler.finish()?;

    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(&args.output, bytes)
        .with_context(|| format!("failed to write {}", args.output.display()))?;

    println!(
        "Wrote {} ({} entries, {} duplicates skipped)",
        args.output.display(),
        entries,
        duplicates
    );
    Ok(())
}

/// Logs the failure and returns the process exit code.
fn report_failure(e: &anyhow::Error) -> i32 {
    let Some(err) = e.downcast_ref::<SatLinkError>() else {
        tracing::error!("satlink failed: {:#}", e);
        eprintln!("Error: {:#}", e);
        return exit_code_for(e);
    };

    tracing::error!(
        "satlink failed: {:#} (Category: {:?}, Severity: {:?})",
        e,
        err.category(),
        err.severity()
    );
    tracing::error!("Recovery suggestion: {}", err.recovery_suggestion());

    eprintln!("Error: {}", err.user_friendly_message());
    eprintln!("Suggestion: {}", err.recovery_suggestion());

    exit_code_for(e)
}
