//! MLB Moneyline Edge
//!
//! Daily bet recommendations and calibration tracking for MLB moneylines.

use clap::{Parser, Subcommand};
use moneyline_edge::{
    calibration::{CalibrationMethod, CalibrationMetrics, CalibrationTracker, ProbabilityCalibrator},
    config::Config,
    data,
    model::LogisticModel,
    pipeline::{OutcomeSummary, PipelineDriver},
    storage::{CalibrationStore, Database},
    strategy::{BetRecommender, RecommendationReport},
};
use rust_decimal::Decimal;
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "moneyline-edge")]
#[command(about = "MLB moneyline bet sizing and calibration tracking")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Predict tomorrow's slate and write sized bets
    Recommend {
        /// Slate file (overrides paths.slate)
        #[arg(long)]
        slate: Option<String>,
        /// Output file (overrides paths.recommendations)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Log final scores against pending predictions
    Finalize {
        /// Outcomes file (overrides paths.outcomes)
        #[arg(long)]
        outcomes: Option<String>,
    },
    /// Show calibration metrics
    Metrics {
        /// Number of reliability bins (overrides calibration.bin_count)
        #[arg(short, long)]
        bins: Option<usize>,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Fit the recalibration layer on the calibration log
    Recalibrate {
        /// platt | isotonic (overrides calibration.method)
        #[arg(short, long)]
        method: Option<CalibrationMethod>,
    },
    /// Finalize yesterday, then recommend today
    Daily,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Recommend { slate, output } => recommend(config, slate, output).await,
        Commands::Finalize { outcomes } => finalize(config, outcomes).await,
        Commands::Metrics { bins, json } => show_metrics(config, bins, json).await,
        Commands::Recalibrate { method } => recalibrate(config, method).await,
        Commands::Daily => daily(config).await,
    }
}

async fn build_driver(config: &Config) -> anyhow::Result<PipelineDriver<Database>> {
    let model = LogisticModel::load(&config.paths.model).await?;

    let calibrator = if Path::new(&config.paths.calibrator).exists() {
        let c = ProbabilityCalibrator::load(&config.paths.calibrator).await?;
        tracing::info!("Using {} recalibration ({} samples)", c.method(), c.sample_count());
        Some(c)
    } else {
        tracing::info!("No calibrator at {}, serving raw probabilities", config.paths.calibrator);
        None
    };

    let recommender = BetRecommender::from_config(config)?;
    let db = Database::connect(&config.database.path).await?;
    Ok(PipelineDriver::new(Box::new(model), calibrator, recommender, db).await?)
}

async fn recommend(config: Config, slate: Option<String>, output: Option<String>) -> anyhow::Result<()> {
    let mut driver = build_driver(&config).await?;
    let slate_path = slate.unwrap_or_else(|| config.paths.slate.clone());
    let output_path = output.unwrap_or_else(|| config.paths.recommendations.clone());
    run_recommend(&mut driver, &config, &slate_path, &output_path).await
}

async fn run_recommend(
    driver: &mut PipelineDriver<Database>,
    config: &Config,
    slate_path: &str,
    output_path: &str,
) -> anyhow::Result<()> {
    let slate = data::load_slate(slate_path).await?;
    let mut run = driver.run_predictions(&slate.games).await?;
    run.report.skipped.extend(slate.rejected);

    data::write_recommendations(output_path, &run.report.recommendations).await?;
    print_recommendations(&run.report, config.bankroll.size);
    Ok(())
}

async fn finalize(config: Config, outcomes: Option<String>) -> anyhow::Result<()> {
    let mut driver = build_driver(&config).await?;
    let path = outcomes.unwrap_or_else(|| config.paths.outcomes.clone());
    let loaded = data::load_outcomes(&path).await?;
    let mut summary = driver.log_outcomes(&loaded.outcomes).await?;
    summary.skipped.extend(loaded.rejected);
    print_outcome_summary(&summary);
    Ok(())
}

async fn load_tracker(config: &Config) -> anyhow::Result<CalibrationTracker> {
    let db = Database::connect(&config.database.path).await?;
    let pending = db.load_pending().await?;
    let records = db.load_records().await?;
    Ok(CalibrationTracker::from_parts(pending, records)?)
}

async fn show_metrics(config: Config, bins: Option<usize>, json: bool) -> anyhow::Result<()> {
    let tracker = load_tracker(&config).await?;
    let metrics = tracker.compute_metrics(bins.unwrap_or(config.calibration.bin_count))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&metrics)?);
    } else {
        print_metrics(&metrics, tracker.pending_count());
    }
    Ok(())
}

async fn recalibrate(config: Config, method: Option<CalibrationMethod>) -> anyhow::Result<()> {
    let tracker = load_tracker(&config).await?;
    let method = method.unwrap_or(config.calibration.method);

    let mut calibrator = ProbabilityCalibrator::new(method, config.calibration.min_samples);
    calibrator.fit(tracker.records())?;
    let report = calibrator.evaluate(tracker.records());
    calibrator.save(&config.paths.calibrator).await?;

    println!("\n🎯 Recalibration ({})\n", report.method);
    println!("Samples:       {}", report.samples);
    println!("Brier (raw):   {}", fmt_opt(report.brier_before));
    println!("Brier (fit):   {}", fmt_opt(report.brier_after));
    println!("Saved to {}", config.paths.calibrator);
    Ok(())
}

async fn daily(config: Config) -> anyhow::Result<()> {
    let mut driver = build_driver(&config).await?;

    if Path::new(&config.paths.outcomes).exists() {
        let loaded = data::load_outcomes(&config.paths.outcomes).await?;
        let mut summary = driver.log_outcomes(&loaded.outcomes).await?;
        summary.skipped.extend(loaded.rejected);
        print_outcome_summary(&summary);
    } else {
        tracing::warn!("No outcomes file at {}, skipping finalize", config.paths.outcomes);
    }

    run_recommend(&mut driver, &config, &config.paths.slate, &config.paths.recommendations).await?;

    let metrics = driver.metrics(config.calibration.bin_count)?;
    print_metrics(&metrics, driver.tracker().pending_count());
    Ok(())
}

fn fmt_opt(v: Option<Decimal>) -> String {
    v.map(|d| format!("{:.4}", d)).unwrap_or_else(|| "n/a".to_string())
}

fn print_recommendations(report: &RecommendationReport, bankroll: Decimal) {
    println!("\n💰 Recommended Bets (bankroll ${:.2})\n", bankroll);
    if report.recommendations.is_empty() {
        println!("No bets clear the edge threshold.");
    } else {
        println!(
            "{:<12} {:<22} {:>7} {:>8} {:>7} {:>8} {:>8} {:>7} {:>7}",
            "Game", "Pick", "Model", "Implied", "Edge", "Stake%", "Stake$", "EV", "Risk"
        );
        println!("{}", "-".repeat(96));
        for r in &report.recommendations {
            println!(
                "{:<12} {:<22} {:>6.1}% {:>7.1}% {:>6.1}% {:>7.2}% {:>8.2} {:>7.2} {:>7}",
                r.game_id,
                r.pick,
                r.predicted_prob * Decimal::ONE_HUNDRED,
                r.implied_prob * Decimal::ONE_HUNDRED,
                r.edge * Decimal::ONE_HUNDRED,
                r.stake_fraction * Decimal::ONE_HUNDRED,
                r.stake_amount,
                r.expected_value,
                r.risk.to_string()
            );
        }
        println!(
            "\nTotal stake: {:.2}% of bankroll, expected value ${:.2}",
            report.total_stake_fraction() * Decimal::ONE_HUNDRED,
            report.total_expected_value()
        );
    }

    if !report.skipped.is_empty() {
        println!("\nSkipped {} games:", report.skipped.len());
        for s in &report.skipped {
            println!("  {}: {}", s.game_id, s.error);
        }
    }
}

fn print_outcome_summary(summary: &OutcomeSummary) {
    println!(
        "\n📝 Logged {} outcomes ({} skipped, {} not final)",
        summary.finalized.len(),
        summary.skipped.len(),
        summary.not_final
    );
    for s in &summary.skipped {
        println!("  {}: {}", s.game_id, s.error);
    }
}

fn print_metrics(metrics: &CalibrationMetrics, pending: usize) {
    println!("\n📈 Calibration\n");
    println!("Finalized:   {}", metrics.sample_count);
    println!("Pending:     {}", pending);
    println!("Brier:       {}", fmt_opt(metrics.brier_score));
    println!("ECE:         {}", fmt_opt(metrics.expected_calibration_error));
    println!("Base rate:   {}", fmt_opt(metrics.base_rate));

    if metrics.bins.is_empty() {
        return;
    }
    println!("\n{:<13} {:>8} {:>10} {:>10}", "Bin", "Count", "Predicted", "Observed");
    println!("{}", "-".repeat(44));
    for bin in &metrics.bins {
        println!(
            "{:<13} {:>8} {:>10.3} {:>10.3}",
            format!("[{:.2}, {:.2})", bin.lower, bin.upper),
            bin.count,
            bin.mean_predicted,
            bin.observed_rate
        );
    }
}
