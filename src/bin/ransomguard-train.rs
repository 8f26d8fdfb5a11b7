//! Train the ransomware random forest from a labeled CSV dataset.

use std::path::PathBuf;
use std::process::ExitCode;

use ransomguard::config;
use ransomguard::dataset::{DatasetError, load_dataset, train_test_split};
use ransomguard::logging;
use ransomguard::ml::forest::{TrainingSummary, train_forest};

fn main() -> ExitCode {
    if let Err(err) = logging::init("ransomguard-train") {
        eprintln!("Logging disabled: {err}");
    }
    match run(std::env::args().skip(1).collect()) {
        Ok(code) => code,
        Err(err) => {
            tracing::error!("Training failed: {err}");
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Vec<String>) -> Result<ExitCode, String> {
    let Some(options) = parse_args(args)? else {
        return Ok(ExitCode::SUCCESS);
    };
    let settings = config::load_settings().map_err(|err| err.to_string())?;
    let dataset_path = config::resolve_dataset_path(options.dataset, &settings);
    let model_path = config::resolve_model_path(options.out, &settings);

    let mut train_options = settings.training.train_options();
    if let Some(trees) = options.trees {
        train_options.n_trees = trees;
    }
    if let Some(seed) = options.seed {
        train_options.seed = seed;
    }
    if let Some(max_depth) = options.max_depth {
        train_options.max_depth = Some(max_depth);
    }
    let test_fraction = options
        .test_size
        .unwrap_or(settings.training.test_fraction);

    println!("Loading dataset...");
    let dataset = match load_dataset(&dataset_path) {
        Ok(dataset) => dataset,
        Err(err @ DatasetError::NotFound { .. }) => {
            tracing::warn!("{err}");
            println!("Error: {err}");
            return Ok(ExitCode::FAILURE);
        }
        Err(err) => return Err(err.to_string()),
    };
    let (train, test) = train_test_split(&dataset, test_fraction, train_options.seed)?;
    tracing::info!(
        "Split {} rows into {} train / {} test (seed {})",
        dataset.len(),
        train.len(),
        test.len(),
        train_options.seed
    );

    println!("Training Random Forest Classifier...");
    let mut model = train_forest(&train, &train_options)?;
    let cm = model.evaluate(&test);
    let accuracy = cm.accuracy();
    model.summary = TrainingSummary {
        n_train: train.len(),
        n_test: test.len(),
        holdout_accuracy: Some(accuracy),
    };

    println!("Model Accuracy: {:.2}%", accuracy * 100.0);
    println!(
        "precision={:.3}  recall={:.3}  f1={:.3}  support={}",
        cm.precision(),
        cm.recall(),
        cm.f1(),
        test.positives()
    );
    println!("confusion matrix (rows=true, cols=pred):");
    println!("{:>12}{:>8}{:>12}", "", "safe", "ransomware");
    println!(
        "{:>12}{:>8}{:>12}",
        "safe", cm.true_negative, cm.false_positive
    );
    println!(
        "{:>12}{:>8}{:>12}",
        "ransomware", cm.false_negative, cm.true_positive
    );

    println!("Saving model to {}...", model_path.display());
    model
        .save_json(&model_path)
        .map_err(|err| err.to_string())?;
    println!("Done.");
    Ok(ExitCode::SUCCESS)
}

#[derive(Debug, Clone, Default)]
struct CliOptions {
    dataset: Option<PathBuf>,
    out: Option<PathBuf>,
    trees: Option<usize>,
    seed: Option<u64>,
    test_size: Option<f64>,
    max_depth: Option<usize>,
}

fn parse_args(args: Vec<String>) -> Result<Option<CliOptions>, String> {
    let mut options = CliOptions::default();
    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => {
                println!("{}", help_text());
                return Ok(None);
            }
            "--dataset" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--dataset requires a value".to_string())?;
                options.dataset = Some(PathBuf::from(value));
            }
            "--out" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--out requires a value".to_string())?;
                options.out = Some(PathBuf::from(value));
            }
            "--trees" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--trees requires a value".to_string())?;
                let trees = value
                    .parse::<usize>()
                    .map_err(|_| format!("Invalid --trees value: {value}"))?;
                if trees == 0 {
                    return Err("--trees must be at least 1".to_string());
                }
                options.trees = Some(trees);
            }
            "--seed" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--seed requires a value".to_string())?;
                options.seed = Some(
                    value
                        .parse::<u64>()
                        .map_err(|_| format!("Invalid --seed value: {value}"))?,
                );
            }
            "--test-size" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--test-size requires a value".to_string())?;
                let fraction = value
                    .parse::<f64>()
                    .map_err(|_| format!("Invalid --test-size value: {value}"))?;
                if !(fraction > 0.0 && fraction < 1.0) {
                    return Err(format!("--test-size must be between 0 and 1, got {value}"));
                }
                options.test_size = Some(fraction);
            }
            "--max-depth" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--max-depth requires a value".to_string())?;
                options.max_depth = Some(
                    value
                        .parse::<usize>()
                        .map_err(|_| format!("Invalid --max-depth value: {value}"))?,
                );
            }
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }
    Ok(Some(options))
}

fn help_text() -> String {
    [
        "ransomguard-train",
        "",
        "Trains a seeded random forest on dataset.csv and writes the model as JSON.",
        "",
        "Usage:",
        "  ransomguard-train [options]",
        "",
        "Options:",
        "  --dataset <file>     Labeled CSV (default: RANSOMGUARD_DATASET, config, or dataset.csv).",
        "  --out <file>         Model output (default: RANSOMGUARD_MODEL, config, or ransomware_model.json).",
        "  --trees <n>          Number of trees (default: 100).",
        "  --seed <n>           Seed for the split and the forest (default: 42).",
        "  --test-size <f64>    Holdout fraction (default: 0.2).",
        "  --max-depth <n>      Maximum tree depth (default: unlimited).",
    ]
    .join("\n")
}
