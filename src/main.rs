mod colour;
mod config;
mod error;
mod glitch_rect;
mod height_map;
mod mipmap;
mod normal_map;
mod packer;
mod render;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use rand::SeedableRng;
use rand::rngs::StdRng;

use colour::random_colour;
use config::{Cli, TextureJob};
use glitch_rect::{GlitchRect, GlitchRectConfig};
use mipmap::{ChainSettings, MipmapChain, PngDirectory};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let job = TextureJob::from_cli(Cli::parse())?;
    run(job)
}

/// Generate every layer of one texture and write it to the job's output directory
fn run(job: TextureJob) -> Result<()> {
    let seed = job.seed.unwrap_or_else(rand::random);
    info!(
        "Generating {}{} at {}x{} (seed {})",
        job.prefix, job.basename, job.width, job.height, seed
    );
    let mut rng = StdRng::seed_from_u64(seed);

    let (strip1, strip2) = match job.random_strips {
        Some((min_sat, brightness)) => (
            random_colour(&mut rng, min_sat, brightness),
            random_colour(&mut rng, min_sat, brightness),
        ),
        None => (job.strip1, job.strip2),
    };

    let strategy = GlitchRect::new(
        job.width,
        job.height,
        job.packer,
        GlitchRectConfig {
            strip1,
            strip2,
            layer_tint: job.layer_tint,
            mutation: job.mutation,
        },
    )?;

    let settings = ChainSettings {
        width: job.width,
        height: job.height,
        prefix: job.prefix,
        basename: job.basename,
        normal: job.normal,
        keep_height: job.keep_height,
    };

    let mut sink = PngDirectory::create(&job.out_dir)
        .with_context(|| format!("failed to create output directory {}", job.out_dir.display()))?;
    let mut chain = MipmapChain::new(settings, strategy, rng)?;
    let summary = chain
        .render_all(&mut sink)
        .context("failed to render mipmap chain")?;

    info!(
        "Done! Wrote {} files for {} layers to {} ({} block groups in the last layer)",
        summary.files,
        summary.layers,
        sink.dir().display(),
        chain.state().len()
    );
    Ok(())
}
