/// Replay an observation file through the Kalman engine
///
/// Prints the filtered / raw / smoothed report as JSON on stdout.
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use flate2::read::GzDecoder;
use kalman_engine_rs::{process_batch, EngineConfig};
use serde::Deserialize;

#[derive(Parser, Debug)]
#[command(name = "kalman_replay")]
#[command(about = "Run a Kalman filter + RTS smoother over a JSON observation file", long_about = None)]
struct Args {
    /// Observation file (.json or .json.gz)
    #[arg(long)]
    input: PathBuf,

    /// Engine config JSON (defaults to a scalar random walk)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Pretty-print the report
    #[arg(long, default_value_t = false)]
    pretty: bool,
}

/// Accepted input layouts
#[derive(Deserialize)]
#[serde(untagged)]
enum InputFile {
    /// `{"results": [[...], ...]}`
    Wrapped { results: Vec<Vec<f64>> },
    /// `[[...], ...]`, one observation vector per entry
    Rows(Vec<Vec<f64>>),
    /// `[...]`, a scalar series
    Scalar(Vec<f64>),
}

impl InputFile {
    fn into_rows(self) -> Vec<Vec<f64>> {
        match self {
            InputFile::Wrapped { results } => results,
            InputFile::Rows(rows) => rows,
            InputFile::Scalar(values) => values.into_iter().map(|v| vec![v]).collect(),
        }
    }
}

fn read_input(path: &Path) -> Result<Vec<Vec<f64>>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut text = String::new();
    let is_gz = path.extension().map_or(false, |ext| ext == "gz");
    if is_gz {
        GzDecoder::new(BufReader::new(file))
            .read_to_string(&mut text)
            .with_context(|| format!("decompressing {}", path.display()))?;
    } else {
        BufReader::new(file)
            .read_to_string(&mut text)
            .with_context(|| format!("reading {}", path.display()))?;
    }

    let input: InputFile = serde_json::from_str(&text)
        .with_context(|| format!("parsing observations in {}", path.display()))?;
    Ok(input.into_rows())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    let engine = config.build_engine()?;

    let rows = read_input(&args.input)?;
    log::info!(
        "replaying {} observations from {}",
        rows.len(),
        args.input.display()
    );

    let report = process_batch(&engine, &rows).context("running Kalman filter")?;
    let json = if args.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{}", json);
    Ok(())
}
