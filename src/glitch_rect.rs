//! Striped floor texture scattered with squarish blocks

use glam::Vec3;
use image::RgbaImage;
use log::info;
use rand::Rng;
use rand::rngs::StdRng;

use crate::colour::{self, Colour, grey};
use crate::error::TextureError;
use crate::mipmap::LayerStrategy;
use crate::packer::{MutationParams, Packer, PackerParams, PackerState, Paint};
use crate::render::{Area, Canvas, Channel, Renderable};

pub const NUM_STRIPS: u32 = 16;
const BACKGROUND_SPECULAR1: f32 = 0.25;
const BACKGROUND_SPECULAR2: f32 = 0.333;
const BACKGROUND_BUMPINESS: f32 = 0.2;
const FOREGROUND_SPECULAR: f32 = 0.5;
const BLOCK_ALPHA: f32 = 0.9;

/// Look of the floor texture
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlitchRectConfig {
    /// Diffuse colour of odd strips
    pub strip1: Colour,
    /// Diffuse colour of even strips
    pub strip2: Colour,
    /// Added to the strip colours once per layer
    pub layer_tint: Vec3,
    pub mutation: MutationParams,
}

impl Default for GlitchRectConfig {
    fn default() -> Self {
        GlitchRectConfig {
            strip1: Colour::new(0.2, 0.275, 0.4, 1.0),
            strip2: Colour::new(0.25, 0.35, 0.5, 1.0),
            layer_tint: Vec3::new(0.02, 0.03, 0.04),
            mutation: MutationParams::default(),
        }
    }
}

pub struct GlitchRect {
    width: u32,
    height: u32,
    packer: Packer,
    config: GlitchRectConfig,
}

impl GlitchRect {
    pub fn new(
        width: u32,
        height: u32,
        packer: PackerParams,
        config: GlitchRectConfig,
    ) -> Result<Self, TextureError> {
        Ok(GlitchRect {
            width,
            height,
            packer: Packer::new(width, height, packer)?,
            config,
        })
    }

    /// Full height background strips, tinted for `layer`
    pub fn strips(&self, layer: u32) -> Vec<Renderable> {
        let strip1 = colour::tint_for_layer(self.config.strip1, self.config.layer_tint, layer);
        let strip2 = colour::tint_for_layer(self.config.strip2, self.config.layer_tint, layer);
        let sw = self.width as f32 / NUM_STRIPS as f32;

        (0..NUM_STRIPS)
            .map(|n| {
                let paint = if n % 2 == 1 {
                    Paint {
                        diffuse: strip1,
                        specular: strip1.truncate().extend(BACKGROUND_SPECULAR1),
                        height: 0.0,
                    }
                } else {
                    Paint {
                        diffuse: strip2,
                        specular: strip2.truncate().extend(BACKGROUND_SPECULAR2),
                        height: BACKGROUND_BUMPINESS,
                    }
                };
                Renderable::Rect {
                    area: Area::new(n as f32 * sw, 0.0, sw, self.height as f32),
                    paint,
                }
            })
            .collect()
    }
}

fn block_paint(rng: &mut StdRng) -> Paint {
    let level = rng.gen_range(0.7..0.8);
    Paint {
        diffuse: grey(level, BLOCK_ALPHA),
        specular: grey(level, FOREGROUND_SPECULAR),
        height: 1.0,
    }
}

fn block_specular(rng: &mut StdRng) -> Colour {
    grey(rng.gen_range(0.7..0.8), FOREGROUND_SPECULAR)
}

impl LayerStrategy for GlitchRect {
    fn populate(&self, state: &mut PackerState, rng: &mut StdRng) {
        let placed = self.packer.fill(state, rng, block_paint);
        let wrapped = state.groups().iter().filter(|g| g.members().len() > 1).count();
        info!("Placed {} squarish blocks, {} wrapping an edge", placed, wrapped);
    }

    fn prepare_layer(&self, state: &mut PackerState, rng: &mut StdRng, layer: u32) {
        let report = self
            .packer
            .mutate(state, &self.config.mutation, rng, block_paint, block_specular);
        info!(
            "Layer {} (generation {}): kept {} blocks, recoloured {}, added {}",
            layer + 1,
            state.generation(),
            report.kept,
            report.recoloured,
            report.placed
        );
    }

    fn render_layer(
        &self,
        state: &PackerState,
        layer: u32,
        channel: Channel,
    ) -> Result<Option<RgbaImage>, TextureError> {
        let mut canvas = Canvas::new(self.width, self.height)?;
        for strip in self.strips(layer) {
            strip.render(channel, &mut canvas)?;
        }
        for block in state.blocks() {
            Renderable::from_block(&block).render(channel, &mut canvas)?;
        }
        Ok(Some(canvas.into_image()))
    }
}
