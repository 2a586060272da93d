//! Plate Generator
//!
//! Renders synthetic license plates (`LLL-DDDD`), applies random capture
//! distortions and writes them as JPEG files together with a ground truth
//! manifest that `plate_evaluator` reads.
//!
//! ```sh
//! cargo run --bin plate_generator -- --count 100 --seed 7
//! ```
//!
use clap::Parser;
use plate_ocr_bench::{cli::GeneratorCli, create_rng, dataset::generate_dataset, init_logging};
use tracing::info;

fn main() -> anyhow::Result<()> {
    let args = GeneratorCli::parse();
    let _guard = init_logging(args.log_level, args.log_path.clone(), "plate_generator.log")?;
    let config = args.into_config()?;

    let mut rng = create_rng(config.seed);
    let summary = generate_dataset(&config, &mut rng)?;

    info!(
        "Wrote {} plates to {} in {:?}, manifest: {}",
        summary.images_written,
        summary.output_dir.display(),
        summary.elapsed,
        summary.manifest_path.display()
    );
    Ok(())
}
