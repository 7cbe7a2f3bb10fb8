/// Sphere sampling tool: loads a JSON sphere description, sets up its mod
/// pipeline and samples an equirectangular heightfield.
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use pqs_core::config::SphereConfig;

// ── CLI ──────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "pqs-sample", about = "Sample a configured PQS sphere into HeightField JSON")]
struct Args {
    /// Path to the sphere description (JSON)
    #[arg(short, long)]
    config: PathBuf,

    /// Grid columns (longitude samples)
    #[arg(long, default_value = "256")]
    width: usize,

    /// Grid rows (latitude samples)
    #[arg(long, default_value = "128")]
    height: usize,

    /// Where to write the HeightField JSON (omit to only print the summary)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

// ── Main ─────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let json = fs::read_to_string(&args.config).with_context(|| format!("reading {}", args.config.display()))?;
    let config = SphereConfig::from_json(&json).with_context(|| format!("parsing {}", args.config.display()))?;

    let mut pqs = config.into_pqs();
    let info = pqs.setup_sphere().context("setting up sphere")?;
    log::info!("pipeline: {}", pqs.pipeline_names()?.join(" -> "));

    let field = pqs.build_heightfield(args.width, args.height).context("sampling heightfield")?;

    println!("radius:      {:.3}", info.radius);
    println!("radius min:  {:.3}", info.radius_min);
    println!("radius max:  {:.3}", info.radius_max);
    println!("elevation:   {:.3} .. {:.3} (mean {:.3})", field.min_elevation(), field.max_elevation(), field.mean_elevation());

    if let Some(path) = &args.output {
        let out = serde_json::to_string(&field).context("serialising heightfield")?;
        fs::write(path, out).with_context(|| format!("writing {}", path.display()))?;
        println!("wrote {}x{} heightfield to {}", field.width, field.height, path.display());
    }

    Ok(())
}
