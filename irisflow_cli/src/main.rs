#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Command-line entry point for the Iris classification pipeline.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use irisflow_pipeline::{
    artefacts::load_json, ArtefactLayout, DataPreparation, DecisionTreeClassifier, FeatureColumn,
    FeatureRow, ModelTraining, SplitConfig, TreeConfig,
};
use shared_logging::Logger;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "irisflow", version, about = "Iris classification pipeline")]
struct Cli {
    /// Root artefact directory.
    #[arg(long, default_value = "artifacts")]
    artefacts: PathBuf,

    /// Log file path. Defaults to `<artefacts>/logs/pipeline.log`.
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Suppress log echo to stderr.
    #[arg(long)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Runs data preparation followed by model training.
    Run(PrepareArgs),
    /// Runs the data preparation stage only.
    Prepare(PrepareArgs),
    /// Runs the model training stage only.
    Train,
    /// Classifies one flower using the persisted model.
    Predict(PredictArgs),
}

#[derive(Parser, Debug)]
struct PrepareArgs {
    /// Raw input CSV. Defaults to `<artefacts>/raw/data.csv`.
    #[arg(long)]
    data: Option<PathBuf>,

    /// Seed for the train/test shuffle.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Fraction of rows held out for testing.
    #[arg(long, default_value_t = 0.2)]
    test_ratio: f64,
}

#[derive(Parser, Debug)]
struct PredictArgs {
    /// Sepal length in cm.
    sepal_length: f64,
    /// Sepal width in cm.
    sepal_width: f64,
    /// Petal length in cm.
    petal_length: f64,
    /// Petal width in cm.
    petal_width: f64,
}

/// Sanity ranges for prediction inputs, from the canonical dataset.
const FEATURE_RANGES: [(FeatureColumn, f64, f64); 4] = [
    (FeatureColumn::SepalLength, 4.3, 7.9),
    (FeatureColumn::SepalWidth, 2.0, 4.4),
    (FeatureColumn::PetalLength, 1.0, 6.9),
    (FeatureColumn::PetalWidth, 0.1, 2.5),
];

fn main() -> Result<()> {
    let cli = Cli::parse();
    let layout = ArtefactLayout::new(&cli.artefacts);
    let log_path = cli.log_file.clone().unwrap_or_else(|| layout.log_file());
    let logger = shared_logging::init_global(&log_path, !cli.quiet)
        .with_context(|| format!("opening log file {}", log_path.display()))?;

    let run_id = format!("run-{}", Uuid::new_v4());
    logger
        .info(format!("{run_id}: starting {}", command_name(&cli.command)))
        .ok();

    let outcome = dispatch(&cli, &layout, &logger);
    match &outcome {
        Ok(()) => {
            logger.info(format!("{run_id}: completed successfully")).ok();
        }
        Err(err) => {
            logger.error(format!("{run_id}: failed: {err:#}")).ok();
        }
    }
    outcome
}

const fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Run(_) => "run",
        Commands::Prepare(_) => "prepare",
        Commands::Train => "train",
        Commands::Predict(_) => "predict",
    }
}

fn dispatch(cli: &Cli, layout: &ArtefactLayout, logger: &Logger) -> Result<()> {
    match &cli.command {
        Commands::Run(args) => {
            handle_prepare(args, layout, logger)?;
            handle_train(layout, logger)
        }
        Commands::Prepare(args) => handle_prepare(args, layout, logger),
        Commands::Train => handle_train(layout, logger),
        Commands::Predict(args) => handle_predict(args, layout, logger),
    }
}

fn handle_prepare(args: &PrepareArgs, layout: &ArtefactLayout, logger: &Logger) -> Result<()> {
    let raw_path = args.data.clone().unwrap_or_else(|| layout.raw_data());
    let split = SplitConfig {
        test_ratio: args.test_ratio,
        seed: args.seed,
    };
    DataPreparation::new(raw_path, layout.clone())
        .with_split(split)
        .with_logger(logger.clone())
        .run()
        .context("data preparation stage failed")?;
    Ok(())
}

fn handle_train(layout: &ArtefactLayout, logger: &Logger) -> Result<()> {
    let summary = ModelTraining::new(layout.clone())
        .with_config(TreeConfig::default())
        .with_logger(logger.clone())
        .run()
        .context("model training stage failed")?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn handle_predict(args: &PredictArgs, layout: &ArtefactLayout, logger: &Logger) -> Result<()> {
    let row = FeatureRow {
        sepal_length_cm: args.sepal_length,
        sepal_width_cm: args.sepal_width,
        petal_length_cm: args.petal_length,
        petal_width_cm: args.petal_width,
    };
    validate_inputs(&row)?;

    let model: DecisionTreeClassifier = load_json(layout.model())
        .context("loading persisted model (run the pipeline first)")?;
    let species = model.predict_one(&row)?;
    logger
        .info(format!("Prediction successful: {species}"))
        .ok();
    println!("{species}");
    Ok(())
}

fn validate_inputs(row: &FeatureRow) -> Result<()> {
    for (column, min, max) in FEATURE_RANGES {
        let value = row.get(column);
        anyhow::ensure!(
            value.is_finite(),
            "{column}: value must be a finite number"
        );
        anyhow::ensure!(
            (min..=max).contains(&value),
            "{column}: {value} is out of range [{min}, {max}]"
        );
    }
    Ok(())
}
