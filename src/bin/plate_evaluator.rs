//! Plate Evaluator
//!
//! Runs an ONNX text recognition model over a plate dataset produced by
//! `plate_generator` and reports detection, recognition and throughput
//! metrics. The report is printed and saved as text, optionally as JSON.
//!
//! ```sh
//! cargo run --bin plate_evaluator -- --model rec.onnx --dict dict.txt
//! ```
//!
use clap::Parser;
use plate_ocr_bench::{
    cli::EvaluatorCli,
    evaluator::Evaluator,
    init_logging,
    manifest::read_manifest,
    ocr::{OnnxConfig, OnnxTextRecognizer},
    report::{format_report, save_report, save_report_json},
};
use tracing::{info, warn};

fn main() -> anyhow::Result<()> {
    let args = EvaluatorCli::parse();
    let _guard = init_logging(args.log_level, args.log_path.clone(), "plate_evaluator.log")?;
    let config = args.to_config()?;

    let manifest_path = config.manifest_path();
    let manifest = read_manifest(&manifest_path)?;
    info!(?manifest_path, entries = manifest.len(), "Loaded ground truth");

    let onnx_config = OnnxConfig {
        intra_threads: args.intra_threads,
        ..OnnxConfig::new(args.model, args.dict)
    };
    let engine = OnnxTextRecognizer::new(&onnx_config)?;

    let mut evaluator = Evaluator::new(engine, config.clone());
    let run = evaluator.run(&manifest)?;
    if !run.skipped.is_empty() {
        warn!("{} images could not be evaluated", run.skipped.len());
    }

    let text = format_report(&run.report, chrono::Local::now());
    println!("{text}");
    save_report(&text, &config.report_path)?;
    if let Some(json_path) = &config.report_json_path {
        save_report_json(&run.report, json_path)?;
    }
    Ok(())
}
