use std::error::Error;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use log::{error, info};

use datacenter_energy::config::{DEFAULT_DATA_PATH, DEFAULT_OUTPUT_DIR};
use datacenter_energy::cumulative_impact::calculate_cumulative_impact;
use datacenter_energy::monthly_averages::analyze_monthly_averages;
use datacenter_energy::quality_check::check_data_quality;
use datacenter_energy::regression::model_grid_dependence;
use datacenter_energy::threshold_days::{highlight_threshold_days, ThresholdReport};
use datacenter_energy::AnalysisConfig;

/// Quality checks, grid dependence regression and trend charts for daily energy data
#[derive(Parser)]
#[command(name = "datacenter-energy", version)]
struct Cli {
    /// CSV file with one row per day
    #[arg(long, global = true, default_value = DEFAULT_DATA_PATH)]
    data: PathBuf,

    /// Directory the charts are written to
    #[arg(long, global = true, default_value = DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Clone, Copy)]
enum Command {
    /// Summary statistics and outlier boxplots
    Quality {
        /// Print the statistics only
        #[arg(long)]
        no_plots: bool,
    },
    /// Grid energy use against its drivers
    Regression,
    /// Monthly averages, cumulative impact and threshold days
    Trends,
    /// Trends, then regression, then quality
    All,
}

fn run_trends(config: &AnalysisConfig) -> Result<(), Box<dyn Error>> {
    let monthly = analyze_monthly_averages(&config.data_path, &config.output_dir)?;
    println!("Monthly averages:");
    println!("{}", monthly);

    let impact = calculate_cumulative_impact(&config.data_path, &config.output_dir)?;
    println!("Cumulative impact (last 5 days):");
    for row in impact.tail(5) {
        println!(
            "{:<10} {:>3}  grid avoided {:>12.2}  emissions avoided {:>12.2}  cost savings {:>12.2}",
            row.month, row.day, row.cumulative_grid_avoided, row.cumulative_emissions_avoided, row.cumulative_cost_savings
        );
    }
    println!();

    let thresholds = highlight_threshold_days(&config.data_path, &config.output_dir)?;
    println!("Threshold days ({} flagged, first 5):", thresholds.days.len());
    let preview = ThresholdReport {
        days: thresholds.head(5).to_vec(),
        ..thresholds
    };
    println!("{}", preview);
    Ok(())
}

fn run_regression(config: &AnalysisConfig) -> Result<(), Box<dyn Error>> {
    let report = model_grid_dependence(&config.data_path, &config.output_dir)?;
    println!("{}", report);
    Ok(())
}

fn run_quality(config: &AnalysisConfig, plots: bool) -> Result<(), Box<dyn Error>> {
    let plot_dir = plots.then_some(config.output_dir.as_path());
    check_data_quality(&config.data_path, plot_dir)?;
    Ok(())
}

fn run(command: Command, config: &AnalysisConfig) -> Result<(), Box<dyn Error>> {
    match command {
        Command::Quality { no_plots } => run_quality(config, !no_plots),
        Command::Regression => run_regression(config),
        Command::Trends => run_trends(config),
        Command::All => {
            run_trends(config)?;
            run_regression(config)?;
            run_quality(config, true)
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = AnalysisConfig::new(cli.data, cli.output_dir);

    if !config.data_path.is_file() {
        error!("File not found: {}", config.data_path.display());
        process::exit(1);
    }

    run(cli.command.unwrap_or(Command::All), &config)?;
    info!("Analysis finished");
    Ok(())
}
