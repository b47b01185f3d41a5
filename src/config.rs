use std::path::PathBuf;

use anyhow::{Context, Result, ensure};
use clap::{Parser, ValueEnum};
use glam::Vec3;

use crate::colour::{Colour, parse_colour};
use crate::normal_map::{NormalLayout, NormalParams};
use crate::packer::{MutationParams, PackerParams, Recolour};

/// Command line for generating a tileable texture mipmap chain
#[derive(Debug, Parser)]
#[command(name = "glitch-mipmaps", version, about)]
pub struct Cli {
    /// Width of the largest layer in pixels
    #[arg(long, default_value_t = 1024, value_parser = clap::value_parser!(u32).range(1..))]
    pub width: u32,

    /// Height of the largest layer in pixels
    #[arg(long, default_value_t = 512, value_parser = clap::value_parser!(u32).range(1..))]
    pub height: u32,

    /// Diffuse colour of odd strips, "r,g,b[,a]"
    #[arg(long, default_value = "0.2,0.275,0.4", value_parser = parse_colour)]
    pub strip1: Colour,

    /// Diffuse colour of even strips, "r,g,b[,a]"
    #[arg(long, default_value = "0.25,0.35,0.5", value_parser = parse_colour)]
    pub strip2: Colour,

    /// Replace the strip colours with random ones, "min_saturation,brightness"
    #[arg(long, value_parser = parse_pair)]
    pub random_strips: Option<(f32, f32)>,

    /// Strip colour added per mipmap layer, "r,g,b"
    #[arg(long, default_value = "0.02,0.03,0.04", value_parser = parse_vec3)]
    pub layer_tint: Vec3,

    /// Normal map strength
    #[arg(long, default_value_t = 1.0)]
    pub amplitude: f64,

    /// Texture name, e.g. "Floor"
    #[arg(long, default_value = "Floor")]
    pub basename: String,

    /// Prefix of every output file
    #[arg(long, default_value = "Stadium")]
    pub prefix: String,

    /// Output directory [default: "pngs" next to the executable's directory]
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Seed for reproducible output
    #[arg(long)]
    pub seed: Option<u64>,

    /// Byte layout of the normal maps
    #[arg(long, value_enum, default_value_t = LayoutArg::A)]
    pub normal_layout: LayoutArg,

    /// Negate the vertical slope of the normal maps
    #[arg(long)]
    pub flip_y: bool,

    /// Also write the height map of each layer
    #[arg(long)]
    pub keep_height: bool,

    /// Pixel size of one block unit
    #[arg(long, default_value_t = 8)]
    pub base_unit: i32,

    /// Smallest block side in units
    #[arg(long, default_value_t = 3)]
    pub min_units: i32,

    /// Largest block side in units
    #[arg(long, default_value_t = 5)]
    pub max_units: i32,

    /// Padding around each block when testing for collisions
    #[arg(long, default_value_t = 4)]
    pub collision_margin: i32,

    /// Consecutive failed placements that end a fill
    #[arg(long, default_value_t = 10)]
    pub max_failures: u32,

    /// Fraction of blocks kept from one layer to the next
    #[arg(long, default_value_t = 0.75)]
    pub keep_fraction: f64,

    /// Which kept blocks get a new specular colour on each layer
    #[arg(long, value_enum, default_value_t = RecolourArg::Subset)]
    pub recolour: RecolourArg,

    /// Chance of a kept block being recoloured with `--recolour subset`
    #[arg(long, default_value_t = 0.25)]
    pub recolour_probability: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LayoutArg {
    /// RGBA [0, z, y, x], negative values wrapped past 255
    A,
    /// RGBA [x, y, z, 255], 128 offset
    B,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RecolourArg {
    None,
    Subset,
    All,
}

fn parse_floats<const N: usize>(text: &str) -> Result<[f32; N], String> {
    let values = text
        .split(',')
        .map(|part| part.trim().parse::<f32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid number in '{}': {}", text, e))?;
    values
        .try_into()
        .map_err(|_| format!("expected {} comma separated numbers, got '{}'", N, text))
}

fn parse_pair(text: &str) -> Result<(f32, f32), String> {
    parse_floats::<2>(text).map(|[a, b]| (a, b))
}

fn parse_vec3(text: &str) -> Result<Vec3, String> {
    parse_floats::<3>(text).map(Vec3::from)
}

/// Default output directory: "pngs" beside the directory holding the executable
pub fn default_output_dir() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("failed to locate the executable")?;
    let exe_dir = exe
        .parent()
        .context("executable has no parent directory")?;
    let base = exe_dir.parent().unwrap_or(exe_dir);
    Ok(base.join("pngs"))
}

/// Everything needed to generate one texture
#[derive(Debug, Clone)]
pub struct TextureJob {
    pub width: u32,
    pub height: u32,
    pub strip1: Colour,
    pub strip2: Colour,
    pub random_strips: Option<(f32, f32)>,
    pub layer_tint: Vec3,
    pub basename: String,
    pub prefix: String,
    pub out_dir: PathBuf,
    pub seed: Option<u64>,
    pub normal: NormalParams,
    pub keep_height: bool,
    pub packer: PackerParams,
    pub mutation: MutationParams,
}

impl TextureJob {
    /// Validate the command line and resolve defaults
    pub fn from_cli(cli: Cli) -> Result<Self> {
        ensure!(cli.base_unit > 0, "--base-unit must be positive");
        ensure!(
            cli.min_units > 0 && cli.min_units <= cli.max_units,
            "block units must satisfy 0 < min ({}) <= max ({})",
            cli.min_units,
            cli.max_units
        );
        ensure!(cli.collision_margin >= 0, "--collision-margin must not be negative");
        ensure!(
            (0.0..=1.0).contains(&cli.keep_fraction),
            "--keep-fraction must be within [0, 1], got {}",
            cli.keep_fraction
        );
        ensure!(
            (0.0..=1.0).contains(&cli.recolour_probability),
            "--recolour-probability must be within [0, 1], got {}",
            cli.recolour_probability
        );
        ensure!(
            cli.amplitude.is_finite() && cli.amplitude > 0.0,
            "--amplitude must be positive"
        );

        let out_dir = match cli.out_dir {
            Some(dir) => dir,
            None => default_output_dir()?,
        };
        let layout = match cli.normal_layout {
            LayoutArg::A => NormalLayout::ZeroZYX,
            LayoutArg::B => NormalLayout::SwizzledOffset,
        };
        let recolour = match cli.recolour {
            RecolourArg::None => Recolour::None,
            RecolourArg::Subset => Recolour::Subset {
                probability: cli.recolour_probability,
            },
            RecolourArg::All => Recolour::All,
        };

        Ok(TextureJob {
            width: cli.width,
            height: cli.height,
            strip1: cli.strip1,
            strip2: cli.strip2,
            random_strips: cli.random_strips,
            layer_tint: cli.layer_tint,
            basename: cli.basename,
            prefix: cli.prefix,
            out_dir,
            seed: cli.seed,
            normal: NormalParams {
                amplitude: cli.amplitude,
                flip_y: cli.flip_y,
                layout,
            },
            keep_height: cli.keep_height,
            packer: PackerParams {
                base_unit: cli.base_unit,
                min_units: cli.min_units,
                max_units: cli.max_units,
                max_unit_difference: 1,
                collision_margin: cli.collision_margin,
                max_failures: cli.max_failures,
            },
            mutation: MutationParams {
                keep_fraction: cli.keep_fraction,
                recolour,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    fn parse(args: &[&str]) -> Result<TextureJob> {
        let mut argv = vec!["glitch-mipmaps", "--out-dir", "out"];
        argv.extend_from_slice(args);
        TextureJob::from_cli(Cli::try_parse_from(argv)?)
    }

    #[test]
    fn test_defaults() {
        let job = parse(&[]).unwrap();
        assert_eq!((job.width, job.height), (1024, 512));
        assert_eq!(job.strip1, Vec4::new(0.2, 0.275, 0.4, 1.0));
        let floor = crate::glitch_rect::GlitchRectConfig::default();
        assert_eq!((job.strip1, job.strip2), (floor.strip1, floor.strip2));
        assert_eq!(job.layer_tint, floor.layer_tint);
        assert_eq!(job.basename, "Floor");
        assert_eq!(job.prefix, "Stadium");
        assert_eq!(job.out_dir, PathBuf::from("out"));
        assert_eq!(job.packer, PackerParams::default());
        assert_eq!(job.mutation, MutationParams::default());
        assert_eq!(job.normal, NormalParams::default());
        assert!(job.seed.is_none());
    }

    #[test]
    fn test_overrides() {
        let job = parse(&[
            "--width", "256", "--height", "64", "--strip1", "1,0,0,0.5", "--seed", "12",
            "--normal-layout", "b", "--flip-y", "--recolour", "all", "--keep-fraction",
            "0.6666", "--random-strips", "0.4,0.9", "--layer-tint", "0.01,0.02,0.03",
        ])
        .unwrap();
        assert_eq!((job.width, job.height), (256, 64));
        assert_eq!(job.strip1, Vec4::new(1.0, 0.0, 0.0, 0.5));
        assert_eq!(job.seed, Some(12));
        assert_eq!(job.normal.layout, NormalLayout::SwizzledOffset);
        assert!(job.normal.flip_y);
        assert_eq!(job.mutation.recolour, Recolour::All);
        assert_eq!(job.random_strips, Some((0.4, 0.9)));
        assert_eq!(job.layer_tint, Vec3::new(0.01, 0.02, 0.03));
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(parse(&["--width", "0"]).is_err());
        assert!(parse(&["--min-units", "6"]).is_err());
        assert!(parse(&["--keep-fraction", "1.5"]).is_err());
        assert!(parse(&["--amplitude", "0"]).is_err());
        assert!(parse(&["--strip2", "0.1,0.2"]).is_err());
        assert!(parse(&["--layer-tint", "0.1"]).is_err());
    }
}
