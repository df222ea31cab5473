#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]

use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressIterator, ProgressStyle};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use kindred::calibrate::data::load_training_data;
use kindred::calibrate::estimate::train_model;
use kindred::calibrate::generate::{
    DEFAULT_DATASET_PATH, DEFAULT_ROWS, generate_rows, write_dataset,
};
use kindred::calibrate::model::ModelConfig;
use kindred::classifier::DEFAULT_MODEL_PATH;
use kindred::request::{RelativeFacts, ReportBatch, RequestBatch};
use kindred::{
    CarrierClassifier, EstimatorKind, InheritanceMode, RiskEngine, RiskReport, RiskRequest, Sex,
};

#[derive(Clone, Copy, ValueEnum)]
pub enum SexCli {
    Male,
    Female,
}

impl From<SexCli> for Sex {
    fn from(value: SexCli) -> Self {
        match value {
            SexCli::Male => Sex::Male,
            SexCli::Female => Sex::Female,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum EstimatorCli {
    Rules,
    Model,
}

impl From<EstimatorCli> for EstimatorKind {
    fn from(value: EstimatorCli) -> Self {
        match value {
            EstimatorCli::Rules => EstimatorKind::Rules,
            EstimatorCli::Model => EstimatorKind::Model,
        }
    }
}

#[derive(Args)]
pub struct GenerateArgs {
    /// Number of simulated individuals
    #[arg(long, default_value_t = DEFAULT_ROWS)]
    pub rows: usize,

    /// Seed of the simulation; the same seed reproduces the same file
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Output CSV path
    #[arg(long, default_value = DEFAULT_DATASET_PATH)]
    pub output: PathBuf,
}

#[derive(Args)]
pub struct TrainArgs {
    /// Path to training CSV file with affected_self,affected_parent,affected_sibling,affected_child,generation,carrier columns
    pub training_data: PathBuf,

    /// Where to write the trained model (.toml)
    #[arg(long, default_value = DEFAULT_MODEL_PATH)]
    pub output: PathBuf,

    /// Ridge penalty on the feature weights (the intercept is never penalized)
    #[arg(long, default_value = "1.0")]
    pub ridge_penalty: f64,

    /// Maximum number of P-IRLS iterations
    #[arg(long, default_value = "50")]
    pub max_iterations: usize,

    /// Convergence tolerance for the relative penalized deviance change
    #[arg(long, default_value = "1e-8")]
    pub convergence_tolerance: f64,

    /// Share of rows held out to report accuracy and ROC-AUC
    #[arg(long, default_value = "0.2")]
    pub holdout_fraction: f64,

    /// Seed of the holdout shuffle
    #[arg(long, default_value = "42")]
    pub seed: u64,
}

#[derive(Args)]
pub struct EstimateArgs {
    /// Read the whole family history from a TOML request file instead of flags
    #[arg(
        long,
        value_name = "PATH",
        conflicts_with_all = [
            "mode",
            "estimator",
            "child_sex",
            "child_affected",
            "mother_affected",
            "father_affected",
            "maternal_grandmother_affected",
            "maternal_grandfather_affected",
            "paternal_grandmother_affected",
            "paternal_grandfather_affected",
            "maternal_siblings",
            "paternal_siblings",
            "siblings",
        ]
    )]
    pub request: Option<PathBuf>,

    /// Inheritance mode: AR, AD or XL
    #[arg(long, required_unless_present = "request")]
    pub mode: Option<String>,

    /// Carrier-probability estimator
    #[arg(long, value_enum, default_value_t = EstimatorCli::Rules)]
    pub estimator: EstimatorCli,

    /// Trained carrier model used by `--estimator model`
    #[arg(long, value_name = "PATH")]
    pub model: Option<PathBuf>,

    /// Sex of the child
    #[arg(long, value_enum, default_value_t = SexCli::Male)]
    pub child_sex: SexCli,

    #[arg(long)]
    pub child_affected: bool,

    #[arg(long)]
    pub mother_affected: bool,

    #[arg(long)]
    pub father_affected: bool,

    #[arg(long)]
    pub maternal_grandmother_affected: bool,

    #[arg(long)]
    pub maternal_grandfather_affected: bool,

    #[arg(long)]
    pub paternal_grandmother_affected: bool,

    #[arg(long)]
    pub paternal_grandfather_affected: bool,

    /// A sibling of the mother, as SEX or SEX:affected (repeatable)
    #[arg(long = "maternal-sibling", value_name = "SEX[:affected]", value_parser = parse_relative)]
    pub maternal_siblings: Vec<RelativeFacts>,

    /// A sibling of the father, as SEX or SEX:affected (repeatable)
    #[arg(long = "paternal-sibling", value_name = "SEX[:affected]", value_parser = parse_relative)]
    pub paternal_siblings: Vec<RelativeFacts>,

    /// A sibling of the child, as SEX or SEX:affected (repeatable)
    #[arg(long = "sibling", value_name = "SEX[:affected]", value_parser = parse_relative)]
    pub siblings: Vec<RelativeFacts>,

    /// Also write the full report to this TOML file
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,
}

#[derive(Args)]
pub struct BatchArgs {
    /// TOML file with one [[requests]] table per family
    pub requests: PathBuf,

    /// Trained carrier model for requests using the model estimator
    #[arg(long, value_name = "PATH")]
    pub model: Option<PathBuf>,

    /// Write all reports to this TOML file
    #[arg(long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

fn parse_relative(value: &str) -> Result<RelativeFacts, String> {
    let (sex, status) = match value.split_once(':') {
        Some((sex, status)) => (sex, Some(status)),
        None => (value, None),
    };
    let sex = match sex.trim().to_ascii_lowercase().as_str() {
        "male" | "m" => Sex::Male,
        "female" | "f" => Sex::Female,
        other => return Err(format!("unknown sex '{other}', expected male or female")),
    };
    let affected = match status.map(|s| s.trim().to_ascii_lowercase()) {
        None => false,
        Some(s) if s == "affected" => true,
        Some(s) if s == "unaffected" => false,
        Some(s) => return Err(format!("unknown status '{s}', expected affected or unaffected")),
    };
    Ok(RelativeFacts { sex, affected })
}

impl EstimateArgs {
    fn to_request(&self) -> Result<RiskRequest, Box<dyn std::error::Error>> {
        if let Some(path) = &self.request {
            println!("Loading request from: {}", path.display());
            return Ok(RiskRequest::load(path)?);
        }
        let mode = self
            .mode
            .clone()
            .ok_or("either --mode or --request must be given")?;
        let mut request = RiskRequest::new(mode, self.child_sex.into());
        request.estimator = self.estimator.into();
        request.child_affected = self.child_affected;
        request.mother_affected = self.mother_affected;
        request.father_affected = self.father_affected;
        request.maternal_grandmother_affected = self.maternal_grandmother_affected;
        request.maternal_grandfather_affected = self.maternal_grandfather_affected;
        request.paternal_grandmother_affected = self.paternal_grandmother_affected;
        request.paternal_grandfather_affected = self.paternal_grandfather_affected;
        request.mother_siblings = self.maternal_siblings.clone();
        request.father_siblings = self.paternal_siblings.clone();
        request.siblings = self.siblings.clone();
        Ok(request)
    }
}

pub fn generate(args: GenerateArgs) -> Result<(), Box<dyn std::error::Error>> {
    println!(
        "Simulating {} individuals (seed {}) into: {}",
        args.rows,
        args.seed,
        args.output.display()
    );
    let progress = ProgressBar::new(args.rows as u64);
    progress.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} rows",
        )?
        .progress_chars("#>-"),
    );
    let written = write_dataset(
        &args.output,
        generate_rows(args.rows, args.seed).progress_with(progress),
    )?;
    println!("Synthetic dataset saved: {} rows", written);
    Ok(())
}

pub fn train(args: TrainArgs) -> Result<(), Box<dyn std::error::Error>> {
    println!("Loading training data from: {}", args.training_data.display());
    let data = load_training_data(&args.training_data)?;
    println!(
        "Loaded {} samples ({:.1}% carriers)",
        data.len(),
        100.0 * data.carrier_fraction()
    );

    let config = ModelConfig {
        ridge_penalty: args.ridge_penalty,
        max_iterations: args.max_iterations,
        convergence_tolerance: args.convergence_tolerance,
        holdout_fraction: args.holdout_fraction,
        seed: args.seed,
        ..ModelConfig::default()
    };

    println!("Training carrier model...");
    let model = train_model(&data, &config)?;

    println!("Coefficients:");
    println!("  intercept: {:+.4}", model.coefficients.intercept);
    for (name, weight) in config
        .feature_names
        .iter()
        .zip(&model.coefficients.weights)
    {
        println!("  {name}: {weight:+.4}");
    }
    println!(
        "Evaluation on {} held-out rows: accuracy {:.4}, ROC-AUC {}",
        model.summary.evaluation_rows,
        model.summary.accuracy,
        model
            .summary
            .roc_auc
            .map_or_else(|| "n/a".to_string(), |auc| format!("{auc:.4}"))
    );

    model.save(&args.output)?;
    println!("Model saved to: {}", args.output.display());
    Ok(())
}

fn engine_for(
    model: Option<&PathBuf>,
    needs_model: bool,
) -> Result<RiskEngine, Box<dyn std::error::Error>> {
    match model {
        Some(path) => Ok(RiskEngine::with_classifier(Arc::new(
            CarrierClassifier::load(path)?,
        ))),
        // The default artifact is only loaded when some request actually needs it.
        None if needs_model => Ok(RiskEngine::with_classifier(Arc::new(
            CarrierClassifier::load(DEFAULT_MODEL_PATH)?,
        ))),
        None => Ok(RiskEngine::new()),
    }
}

fn print_report(report: &RiskReport) {
    println!("\nCarrier probability inference ({} estimator)\n", report.estimator);
    for member in &report.members {
        println!(
            "{} ({}{})",
            member.name,
            member.sex,
            if member.affected { ", affected" } else { "" }
        );
        println!(
            "  Carrier probability: {:.2}%",
            member.carrier_probability * 100.0
        );
        println!("  Reason: {}", member.reason);
    }

    println!("\nChild risk estimation ({})\n", report.mode);
    for line in &report.explanation {
        println!("  {line}");
    }
    println!(
        "\nFinal risk of the child being affected: {:.2}%",
        report.risk * 100.0
    );
}

pub fn estimate(args: EstimateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let request = args.to_request()?;
    // An unsupported mode is reported before any model file is touched.
    request.mode.parse::<InheritanceMode>()?;
    let engine = engine_for(
        args.model.as_ref(),
        request.estimator == EstimatorKind::Model,
    )?;
    let report = engine.estimate(&request)?;
    print_report(&report);

    if let Some(path) = &args.report {
        report.save(path)?;
        println!("\nReport saved to: {}", path.display());
    }
    Ok(())
}

pub fn batch(args: BatchArgs) -> Result<(), Box<dyn std::error::Error>> {
    println!("Loading requests from: {}", args.requests.display());
    let batch = RequestBatch::load(&args.requests)?;
    let needs_model = batch
        .requests
        .iter()
        .any(|r| r.estimator == EstimatorKind::Model);
    let engine = engine_for(args.model.as_ref(), needs_model)?;

    let results = engine.estimate_batch(&batch.requests);
    let failures = results.iter().filter(|r| r.is_err()).count();
    for (index, result) in results.iter().enumerate() {
        match result {
            Ok(report) => println!(
                "#{index}: {} {} ({}) risk {:.2}%",
                report.mode,
                batch.requests[index].child_sex,
                report.estimator,
                report.risk * 100.0
            ),
            Err(e) => println!("#{index}: error: {e}"),
        }
    }
    println!(
        "Processed {} requests, {} failed.",
        results.len(),
        failures
    );

    if let Some(path) = &args.output {
        ReportBatch::from_results(results).save(path)?;
        println!("Reports saved to: {}", path.display());
    }
    Ok(())
}

#[derive(Parser)]
#[command(
    name = "kindred",
    about = "Carrier-probability inference and child-risk estimation from family history",
    long_about = "Estimates the probability that each relative carries a disease allele, \
                 and the risk that a child is affected, under autosomal recessive, \
                 autosomal dominant or X-linked inheritance. Educational model, not medical advice."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a synthetic labelled pedigree dataset
    #[command(about = "Generate synthetic training data (outputs: synthetic_genetic_data.csv)")]
    Generate(GenerateArgs),

    /// Fit the logistic carrier classifier
    #[command(about = "Train the carrier classifier (outputs: carrier_model.toml)")]
    Train(TrainArgs),

    /// Estimate carrier probabilities and child risk for one family
    #[command(about = "Estimate child risk for one family")]
    Estimate(EstimateArgs),

    /// Estimate many families from a request file in parallel
    #[command(about = "Estimate child risk for a batch of families")]
    Batch(BatchArgs),

    /// Display version and build information
    #[command(about = "Display version and build information")]
    Version,
}

fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();
}

fn main() {
    init_logging();
    let cli = Cli::parse();
    let Cli { command } = cli;

    let result = match command {
        Some(Commands::Generate(args)) => generate(args),
        Some(Commands::Train(args)) => train(args),
        Some(Commands::Estimate(args)) => estimate(args),
        Some(Commands::Batch(args)) => batch(args),
        Some(Commands::Version) => {
            print_version_info();
            Ok(())
        }
        None => Cli::command()
            .print_help()
            .map(|()| println!())
            .map_err(Into::into),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn print_version_info() {
    let version = env!("CARGO_PKG_VERSION");
    let build_timestamp: u64 = env!("KINDRED_BUILD_TIMESTAMP").parse().unwrap_or(0);

    println!("kindred {}", version);

    if build_timestamp > 0 {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        if now > build_timestamp {
            println!("Built: {}", format_duration_ago(now - build_timestamp));
        } else {
            println!("Built: just now");
        }
    }
}

/// Format seconds into a human-readable duration like "2.4 hours ago"
fn format_duration_ago(seconds: u64) -> String {
    const MINUTE: u64 = 60;
    const HOUR: u64 = 60 * MINUTE;
    const DAY: u64 = 24 * HOUR;

    if seconds < MINUTE {
        format!("{seconds} seconds ago")
    } else if seconds < HOUR {
        format!("{:.1} minutes ago", seconds as f64 / MINUTE as f64)
    } else if seconds < DAY {
        format!("{:.1} hours ago", seconds as f64 / HOUR as f64)
    } else {
        format!("{:.1} days ago", seconds as f64 / DAY as f64)
    }
}
