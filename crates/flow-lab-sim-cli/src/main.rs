use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use flow_lab_abstract::{MonitorSettings, SettingsOverride, TcpVariant};
use flow_lab_simulator::sink::timestamped_filename;
use flow_lab_simulator::{
    Configurator, CsvSink, MonitorReport, SamplingScheduler, Simulator, scenario_runner, summary,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Adaptive flow-health monitor for a point-to-point TCP experiment")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one randomized experiment and write the classified records as CSV.
    Run(RunArgs),
    /// Replay scripted counters from a scenario TOML and check its assertions.
    Replay {
        #[arg(long)]
        scenario: PathBuf,
    },
    /// Print class balance of previously written record files.
    Summarize {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Seed for the run configuration; defaults to the current Unix time.
    #[arg(long)]
    seed: Option<u64>,

    /// Force a congestion-control variant instead of drawing one.
    #[arg(long)]
    variant: Option<String>,

    /// TOML file overriding the fixed experiment settings.
    #[arg(long)]
    settings: Option<PathBuf>,

    #[arg(long)]
    stop_time: Option<f64>,

    #[arg(long)]
    period: Option<f64>,

    /// Record CSV path; defaults to a timestamped name in --out-dir.
    #[arg(long)]
    out: Option<PathBuf>,

    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Write a JSON report of the finished run.
    #[arg(long)]
    report_out: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt::init();
    info!("flow-lab starting…");

    match cli.command {
        Command::Run(args) => run(args),
        Command::Replay { scenario } => {
            let path = scenario
                .to_str()
                .context("Scenario path contains invalid UTF-8")?;
            let outcome = scenario_runner::run_scenario(path)?;
            info!(
                "Scenario '{}' replayed: {} ticks, {} records",
                outcome.name,
                outcome.ticks,
                outcome.records.len()
            );
            Ok(())
        }
        Command::Summarize { files } => {
            let summary = summary::summarize(&files)?;
            print!("{summary}");
            Ok(())
        }
    }
}

fn run(args: RunArgs) -> Result<()> {
    let settings = args.monitor_settings()?;
    let seed = args
        .seed
        .unwrap_or_else(|| chrono::Utc::now().timestamp().unsigned_abs());

    let mut config = Configurator::new(seed).configure();
    if let Some(name) = &args.variant {
        config.variant = TcpVariant::from_name(name)
            .with_context(|| format!("Unknown variant '{name}'. Try one of {:?}", TcpVariant::ALL))?;
        info!("Variant forced to {}", config.variant);
    }
    println!("Using TCP variant: {}", config.variant);

    let out = match &args.out {
        Some(path) => path.clone(),
        None => args.out_dir.join(timestamped_filename(&chrono::Local::now())),
    };
    let mut sink = CsvSink::create(&out)
        .with_context(|| format!("Failed to create record file {}", out.display()))?;

    let mut monitor = SamplingScheduler::new(&settings, config.variant)?;
    let mut sim = Simulator::new(config, settings);
    sim.run(&mut monitor, &mut sink)
        .context("Failed to write flow records")?;

    info!(
        "{} records ({} FAILURE) over {} ticks",
        monitor.records(),
        monitor.failures(),
        monitor.ticks()
    );

    if let Some(report_path) = &args.report_out {
        write_report(report_path, &sim.export_report(&monitor))?;
    }

    println!("Output saved to: {}", out.display());
    Ok(())
}

impl RunArgs {
    fn monitor_settings(&self) -> Result<MonitorSettings> {
        let mut settings = MonitorSettings::default();
        if let Some(path) = &self.settings {
            load_settings(path)?.apply_to(&mut settings);
        }
        let cli = SettingsOverride {
            stop_time_s: self.stop_time,
            sample_period_s: self.period,
            ..Default::default()
        };
        cli.apply_to(&mut settings);

        anyhow::ensure!(
            settings.sample_period_s > 0.0,
            "Sample period must be positive, got {}",
            settings.sample_period_s
        );
        settings.validate().context("Invalid monitor settings")?;
        Ok(settings)
    }
}

fn load_settings(path: &Path) -> Result<SettingsOverride> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings file {}", path.display()))?;
    let settings: SettingsOverride =
        toml::from_str(&content).context("Failed to parse settings file")?;
    Ok(settings)
}

fn write_report(path: &Path, report: &MonitorReport) -> Result<()> {
    let data = serde_json::to_vec_pretty(report).context("Failed to serialize run report")?;
    fs::write(path, &data)
        .with_context(|| format!("Failed to write report file {}", path.display()))?;
    Ok(())
}
