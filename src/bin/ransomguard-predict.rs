//! Classify one feature vector and print the decision as a JSON line.

use std::path::PathBuf;
use std::process::ExitCode;

use ransomguard::config;
use ransomguard::features::FEATURE_COUNT;
use ransomguard::logging;
use ransomguard::predict::{Output, PredictError, Prediction, load_model, parse_feature_args};

const USAGE: &str =
    "Usage: ransomguard-predict [--model <path>] <entropy> <size_mb> <mod_rate> <rename_count>";

fn main() -> ExitCode {
    let options = match parse_args(std::env::args().skip(1).collect()) {
        Ok(options) => options,
        Err(err) => {
            eprintln!("{err}\n{USAGE}");
            return ExitCode::from(2);
        }
    };
    if options.help {
        println!("{USAGE}");
        return ExitCode::SUCCESS;
    }
    if options.values.len() < FEATURE_COUNT {
        eprintln!("{USAGE}");
        return ExitCode::from(2);
    }

    if let Err(err) = logging::init("ransomguard-predict") {
        eprintln!("Logging disabled: {err}");
    }
    let result = predict(options);
    if let Err(err) = &result {
        tracing::warn!("Prediction failed: {err}");
    }
    println!("{}", Output::from_result(result).to_json());
    ExitCode::SUCCESS
}

fn predict(options: CliOptions) -> Result<Prediction, PredictError> {
    let settings = config::load_settings()?;
    let model_path = config::resolve_model_path(options.model, &settings);
    let model = load_model(&model_path)?;
    let features = parse_feature_args(&options.values)?;
    let prediction = Prediction::from_model(&model, &features);
    tracing::info!(
        "Predicted {:?} for {:?} with confidence {:.4}",
        prediction.status,
        features,
        prediction.confidence
    );
    Ok(prediction)
}

#[derive(Debug, Default)]
struct CliOptions {
    model: Option<PathBuf>,
    values: Vec<String>,
    help: bool,
}

/// Anything that is not a known flag is a positional value, so negative numbers pass through.
fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut options = CliOptions::default();
    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" => options.help = true,
            "--model" => {
                let value = iter
                    .next()
                    .ok_or_else(|| "--model requires a value".to_string())?;
                options.model = Some(PathBuf::from(value));
            }
            _ => options.values.push(arg),
        }
    }
    Ok(options)
}
