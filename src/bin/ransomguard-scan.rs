//! Scan a file on disk: measure its entropy and size, then classify it.

use std::path::PathBuf;
use std::process::ExitCode;

use ransomguard::config;
use ransomguard::logging;
use ransomguard::predict::{Output, PredictError, load_model, parse_number};
use ransomguard::scan::{ScanReport, scan_file};

fn main() -> ExitCode {
    let options = match parse_args(std::env::args().skip(1).collect()) {
        Ok(Some(options)) => options,
        Ok(None) => {
            println!("{}", help_text());
            return ExitCode::SUCCESS;
        }
        Err(err) => {
            eprintln!("{err}\n\n{}", help_text());
            return ExitCode::from(2);
        }
    };

    if let Err(err) = logging::init("ransomguard-scan") {
        eprintln!("Logging disabled: {err}");
    }
    let result = scan(&options);
    if let Err(err) = &result {
        tracing::warn!("Scan of {} failed: {err}", options.file.display());
    }
    println!("{}", Output::from_result(result).to_json());
    ExitCode::SUCCESS
}

fn scan(options: &CliOptions) -> Result<ScanReport, PredictError> {
    let settings = config::load_settings()?;
    let model_path = config::resolve_model_path(options.model.clone(), &settings);
    let model = load_model(&model_path)?;
    let modification_rate = parse_number("modification_rate", &options.modification_rate)?;
    let rename_count = parse_number("rename_count", &options.rename_count)?;
    scan_file(
        &model,
        &options.file,
        modification_rate,
        rename_count,
        &settings.scan,
    )
}

#[derive(Debug)]
struct CliOptions {
    file: PathBuf,
    model: Option<PathBuf>,
    modification_rate: String,
    rename_count: String,
}

fn parse_args(args: Vec<String>) -> Result<Option<CliOptions>, String> {
    let mut file: Option<PathBuf> = None;
    let mut model = None;
    let mut modification_rate = "0".to_string();
    let mut rename_count = "0".to_string();

    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Ok(None),
            "--model" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--model requires a value".to_string())?;
                model = Some(PathBuf::from(value));
            }
            "--modification-rate" => {
                idx += 1;
                modification_rate = args
                    .get(idx)
                    .ok_or_else(|| "--modification-rate requires a value".to_string())?
                    .clone();
            }
            "--rename-count" => {
                idx += 1;
                rename_count = args
                    .get(idx)
                    .ok_or_else(|| "--rename-count requires a value".to_string())?
                    .clone();
            }
            flag if flag.starts_with("--") => return Err(format!("Unknown argument: {flag}")),
            path => {
                if file.is_some() {
                    return Err(format!("Unexpected extra argument: {path}"));
                }
                file = Some(PathBuf::from(path));
            }
        }
        idx += 1;
    }

    let file = file.ok_or_else(|| "Missing file to scan".to_string())?;
    Ok(Some(CliOptions {
        file,
        model,
        modification_rate,
        rename_count,
    }))
}

fn help_text() -> String {
    [
        "ransomguard-scan",
        "",
        "Measures a file's entropy and size and classifies it with the trained model.",
        "",
        "Usage:",
        "  ransomguard-scan <file> [options]",
        "",
        "Options:",
        "  --modification-rate <f64>  Observed modifications per window (default: 0).",
        "  --rename-count <n>         Observed renames (default: 0).",
        "  --model <file>             Model path (default: RANSOMGUARD_MODEL, config, or ransomware_model.json).",
    ]
    .join("\n")
}
