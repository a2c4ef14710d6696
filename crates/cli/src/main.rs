//! desmat CLI - municipal deforestation pipeline

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use desmat_algorithms::pipeline::{Pipeline, PipelineConfig, PipelineReport};
use desmat_algorithms::statistics::Summary;
use desmat_core::io::{read_bronze, read_layer, read_silver};
use desmat_core::{SilverTable, YearLabelStyle};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "desmat")]
#[command(author, version, about = "Municipal deforestation pipeline", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON configuration file; absent fields take their defaults
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Commands,
}

/// Flags that override single configuration fields
#[derive(Args, Default)]
struct Overrides {
    /// Deforestation polygon layer (GeoJSON)
    #[arg(long, global = true)]
    deforestation: Option<PathBuf>,
    /// Municipal boundary layer (GeoJSON)
    #[arg(long, global = true)]
    municipalities: Option<PathBuf>,
    /// Socioeconomic indicator table (CSV)
    #[arg(long, global = true)]
    indicators: Option<PathBuf>,
    /// Root directory of the written tiers
    #[arg(short, long, global = true)]
    output_dir: Option<PathBuf>,
    /// Region code kept by the harmonizer
    #[arg(long, global = true)]
    region: Option<String>,
    /// Drop intersections smaller than this many km²
    #[arg(long, global = true)]
    min_area_km2: Option<f64>,
    /// Write year headers as `2019.0`
    #[arg(long, global = true)]
    decimal_years: bool,
    /// Write CSV files without a byte order mark
    #[arg(long, global = true)]
    no_bom: bool,
}

impl Overrides {
    fn apply(self, config: &mut PipelineConfig) {
        if let Some(p) = self.deforestation {
            config.inputs.deforestation = p;
        }
        if let Some(p) = self.municipalities {
            config.inputs.municipalities = p;
        }
        if let Some(p) = self.indicators {
            config.inputs.indicators = p;
        }
        if let Some(p) = self.output_dir {
            config.outputs.dir = p;
        }
        if let Some(r) = self.region {
            config.harmonize.region = r.clone();
            config.feed.region = r;
        }
        if let Some(a) = self.min_area_km2 {
            config.min_area_km2 = a;
        }
        if self.decimal_years {
            config.year_style = YearLabelStyle::Decimal;
        }
        if self.no_bom {
            config.bom = false;
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run every stage: Bronze, Silver, summary and dashboard feed
    Run,
    /// Overlay the layers and write the Bronze table
    Bronze,
    /// Join a Bronze table with the indicators and write the Silver table
    Silver {
        /// Bronze CSV; defaults to the configured Bronze output
        #[arg(long)]
        bronze: Option<PathBuf>,
    },
    /// Normalize, correlate and project the Silver analysis columns
    Summarize {
        /// Silver CSV; defaults to the configured Silver output
        #[arg(long)]
        silver: Option<PathBuf>,
    },
    /// Prepare the dashboard feed as JSON
    Feed {
        /// Silver CSV; defaults to the configured Silver output
        #[arg(long)]
        silver: Option<PathBuf>,
        /// Output file; printed to stdout when omitted
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Show information about a GeoJSON layer
    Info {
        /// Input layer
        input: PathBuf,
    },
    /// Print the effective configuration as JSON
    ShowConfig,
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn load_config(path: Option<&Path>, overrides: Overrides) -> Result<PipelineConfig> {
    let mut config = match path {
        Some(p) => PipelineConfig::from_json_file(p)
            .with_context(|| format!("Failed to read config {}", p.display()))?,
        None => PipelineConfig::default(),
    };
    overrides.apply(&mut config);
    Ok(config)
}

fn read_silver_input(path: &Path) -> Result<SilverTable> {
    let pb = spinner("Reading silver table...");
    let silver = read_silver(path)
        .with_context(|| format!("Failed to read silver table {}", path.display()))?;
    pb.finish_and_clear();
    info!("Silver: {} municipalities", silver.len());
    Ok(silver)
}

fn print_written(report: &PipelineReport) {
    for path in &report.written {
        println!("  wrote {}", path.display());
    }
}

fn print_summary(summary: &Summary) {
    let corr = &summary.correlation;
    println!("Correlation ({} columns):", corr.labels.len());
    for (label, row) in corr.labels.iter().zip(corr.rows()) {
        let cells: Vec<String> = row.iter().map(|v| format!("{:>7.3}", v)).collect();
        println!("  {:<32} {}", label, cells.join(" "));
    }
    let pca = &summary.pca;
    println!("PCA: {} complete municipalities", pca.n_rows());
    for (i, ratio) in pca.variance_explained.iter().enumerate() {
        println!("  PC{}: {:.1}% of variance", i + 1, 100.0 * ratio);
    }
}

fn done(name: &str, elapsed: std::time::Duration) {
    println!("{} finished", name);
    println!("  Processing time: {:.2?}", elapsed);
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;
    let config = load_config(cli.config.as_deref(), cli.overrides)?;

    match cli.command {
        // ── Full pipeline ────────────────────────────────────────────
        Commands::Run => {
            let pipeline = Pipeline::new(config);
            let start = Instant::now();
            let pb = spinner("Running pipeline...");
            let outcome = pipeline.run();
            pb.finish_and_clear();
            let outcome = outcome.context("Pipeline failed")?;

            let r = &outcome.report;
            println!(
                "Bronze: {} municipalities from {} intersections",
                r.bronze_rows, r.intersections
            );
            println!("Silver: {} municipalities", r.silver_rows);
            print_summary(&outcome.summary);
            print_written(r);
            done("Pipeline", start.elapsed());
        }

        // ── Single stages ────────────────────────────────────────────
        Commands::Bronze => {
            let pipeline = Pipeline::new(config);
            let mut report = PipelineReport::default();
            let start = Instant::now();
            let pb = spinner("Overlaying layers...");
            let out = pipeline.run_bronze(&mut report);
            pb.finish_and_clear();
            let out = out.context("Bronze stage failed")?;

            if let Some(status) = &report.deforestation {
                println!("Deforestation layer: {}", status);
            }
            if let Some(status) = &report.municipalities {
                println!("Municipal layer: {}", status);
            }
            println!(
                "Harmonize: {} records dropped, {} outside the region",
                report.harmonize.dropped(),
                report.harmonize.region_filtered
            );
            println!(
                "Bronze: {} municipalities x {} years",
                out.table.len(),
                out.table.years().len()
            );
            for (year, total) in out.table.annual_totals() {
                println!("  {}: {:.3} km²", year, total);
            }
            print_written(&report);
            done("Bronze", start.elapsed());
        }

        Commands::Silver { bronze } => {
            let path = bronze.unwrap_or_else(|| config.bronze_path());
            let pb = spinner("Reading bronze table...");
            let table = read_bronze(&path)
                .with_context(|| format!("Failed to read bronze table {}", path.display()))?;
            pb.finish_and_clear();

            let pipeline = Pipeline::new(config);
            let mut report = PipelineReport::default();
            let start = Instant::now();
            let silver = pipeline
                .run_silver(&table, &mut report)
                .context("Silver stage failed")?;
            let matched = silver
                .rows()
                .iter()
                .filter(|r| r.municipality_area_km2.is_some())
                .count();
            println!(
                "Silver: {} municipalities, {} with indicators",
                silver.len(),
                matched
            );
            print_written(&report);
            done("Silver", start.elapsed());
        }

        Commands::Summarize { silver } => {
            let path = silver.unwrap_or_else(|| config.silver_path());
            let table = read_silver_input(&path)?;
            let pipeline = Pipeline::new(config);
            let mut report = PipelineReport::default();
            let start = Instant::now();
            let summary = pipeline
                .run_summarize(&table, &mut report)
                .context("Summary failed")?;
            print_summary(&summary);
            print_written(&report);
            done("Summary", start.elapsed());
        }

        Commands::Feed { silver, output } => {
            let path = silver.unwrap_or_else(|| config.silver_path());
            let table = read_silver_input(&path)?;
            let mut config = config;
            config.outputs.feed = None;
            let feed = Pipeline::new(config)
                .run_feed(&table, &mut PipelineReport::default())
                .context("Dashboard feed failed")?;
            let json = feed.to_json().context("Failed to serialize feed")?;
            match output {
                Some(out) => {
                    if let Some(parent) = out.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(&out, json)
                        .with_context(|| format!("Failed to write {}", out.display()))?;
                    println!("Dashboard feed saved to: {}", out.display());
                }
                None => println!("{}", json),
            }
        }

        // ── Inspection ───────────────────────────────────────────────
        Commands::Info { input } => {
            let pb = spinner("Reading layer...");
            let layer = read_layer(&input)
                .with_context(|| format!("Failed to read layer {}", input.display()))?;
            pb.finish_and_clear();

            println!("File: {}", input.display());
            println!("Features: {}", layer.len());
            match &layer.crs {
                Some(crs) => println!("CRS: {}", crs),
                None => println!("CRS: unknown"),
            }
            let with_geometry = layer.iter().filter(|f| f.geometry.is_some()).count();
            println!("With geometry: {}", with_geometry);
            println!("Columns:");
            for column in layer.columns() {
                println!("  {}", column);
            }
        }

        Commands::ShowConfig => {
            println!("{}", config.to_json().context("Failed to serialize config")?);
        }
    }

    Ok(())
}
