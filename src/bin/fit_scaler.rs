//! Offline scaler fitting for the prediction service.
//!
//! Reads historical records from SQLite, cleans them, derives the training
//! features and writes the scaler bundle consumed at startup. When a model
//! export is found in `--model-dir`, it is also evaluated on a hold-out split.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin fit_scaler -- <db_path> [--out <scaler.json>] [--model-dir <dir>]
//! ```

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use aquacast::adapters::artifacts::{save_scaler, select_model, SCALER_FILE};
use aquacast::adapters::SqliteSampleStore;
use aquacast::application::{evaluate, TrainingPipeline};
use aquacast::ports::SampleSource;

struct Args {
    db_path: PathBuf,
    out: Option<PathBuf>,
    model_dir: Option<PathBuf>,
}

fn usage() -> String {
    "Usage: fit_scaler <db_path> [--out <scaler.json>] [--model-dir <dir>]".to_string()
}

fn parse_args() -> Result<Args> {
    let mut args = env::args().skip(1);
    let mut db_path: Option<PathBuf> = None;
    let mut out: Option<PathBuf> = None;
    let mut model_dir: Option<PathBuf> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--out" => {
                let v = args.next().with_context(usage)?;
                out = Some(PathBuf::from(v));
            }
            "--model-dir" => {
                let v = args.next().with_context(usage)?;
                model_dir = Some(PathBuf::from(v));
            }
            "-h" | "--help" => bail!(usage()),
            _ => {
                if db_path.is_none() {
                    db_path = Some(PathBuf::from(arg));
                } else {
                    bail!(usage());
                }
            }
        }
    }

    let db_path = db_path.with_context(usage)?;
    Ok(Args {
        db_path,
        out,
        model_dir,
    })
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = parse_args()?;
    if !args.db_path.exists() {
        bail!("Database not found: {:?}", args.db_path);
    }

    let store = SqliteSampleStore::new(&args.db_path)
        .with_context(|| format!("Failed to open {:?}", args.db_path))?;
    let stored = store.count_samples()?;
    if stored == 0 {
        bail!("No records in calidad_agua at {:?}", args.db_path);
    }
    tracing::info!("Found {} stored records", stored);
    let pipeline = TrainingPipeline::new(Arc::new(store));
    let dataset = pipeline.prepare()?;

    let out = args.out.unwrap_or_else(|| {
        args.model_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("models"))
            .join(SCALER_FILE)
    });
    save_scaler(&out, &dataset.scaler)?;

    println!("Records: {} in, {} kept", dataset.report.input_rows, dataset.report.output_rows);
    println!("Scaler written to {}", out.display());
    for ((column, mean), std) in dataset
        .scaler
        .column_order()
        .iter()
        .zip(dataset.scaler.mean())
        .zip(dataset.scaler.std())
    {
        println!("  {column:<16} mean={mean:>12.4} std={std:>12.4}");
    }

    if let Some(model_dir) = args.model_dir {
        match select_model(&model_dir) {
            Ok(model) => {
                let report = evaluate(&model, &dataset)?;
                println!("{report}");
            }
            Err(e) => tracing::warn!("Skipping evaluation: {}", e),
        }
    }

    Ok(())
}
