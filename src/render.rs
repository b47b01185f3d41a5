use glam::Vec4;
use image::{Rgba, RgbaImage};

use crate::colour::{self, Colour};
use crate::error::TextureError;
use crate::packer::{Block, Paint};

/// The three images rendered for every layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Diffuse,
    Specular,
    Height,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Diffuse, Channel::Specular, Channel::Height];

    pub fn name(self) -> &'static str {
        match self {
            Channel::Diffuse => "diffuse",
            Channel::Specular => "specular",
            Channel::Height => "height",
        }
    }
}

/// Rectangle with fractional pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Area {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Area {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Area { x, y, w, h }
    }
}

/// Something that can paint itself into each channel
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Renderable {
    Rect { area: Area, paint: Paint },
}

impl Renderable {
    pub fn from_block(block: &Block) -> Self {
        let r = block.rect;
        Renderable::Rect {
            area: Area::new(r.x as f32, r.y as f32, r.w as f32, r.h as f32),
            paint: block.paint,
        }
    }

    fn paint(&self) -> &Paint {
        match self {
            Renderable::Rect { paint, .. } => paint,
        }
    }

    fn fill(&self, canvas: &mut Canvas, colour: Colour, channel: Channel) -> Result<(), TextureError> {
        colour::validate(colour, channel.name())?;
        match self {
            Renderable::Rect { area, .. } => canvas.fill_area(*area, colour),
        }
        Ok(())
    }

    pub fn render_diffuse(&self, canvas: &mut Canvas) -> Result<(), TextureError> {
        self.fill(canvas, self.paint().diffuse, Channel::Diffuse)
    }

    pub fn render_specular(&self, canvas: &mut Canvas) -> Result<(), TextureError> {
        self.fill(canvas, self.paint().specular, Channel::Specular)
    }

    /// Heights are painted as opaque grey
    pub fn render_height(&self, canvas: &mut Canvas) -> Result<(), TextureError> {
        let z = self.paint().height;
        self.fill(canvas, Vec4::new(z, z, z, 1.0), Channel::Height)
    }

    pub fn render(&self, channel: Channel, canvas: &mut Canvas) -> Result<(), TextureError> {
        match channel {
            Channel::Diffuse => self.render_diffuse(canvas),
            Channel::Specular => self.render_specular(canvas),
            Channel::Height => self.render_height(canvas),
        }
    }
}

/// An RGBA pixel buffer filled with source-over compositing
pub struct Canvas {
    image: RgbaImage,
}

impl Canvas {
    /// Create a fully transparent canvas
    pub fn new(width: u32, height: u32) -> Result<Self, TextureError> {
        if width == 0 || height == 0 {
            return Err(TextureError::InvalidDimensions { width, height });
        }
        Ok(Canvas {
            image: RgbaImage::new(width, height),
        })
    }

    /// Composite `colour` over every pixel whose centre lies inside `area`
    ///
    /// The area is clipped to the canvas.
    pub fn fill_area(&mut self, area: Area, colour: Colour) {
        let (width, height) = self.image.dimensions();
        let x0 = (area.x - 0.5).ceil().max(0.0) as u32;
        let y0 = (area.y - 0.5).ceil().max(0.0) as u32;
        let x1 = ((area.x + area.w - 0.5).ceil().max(0.0) as u32).min(width);
        let y1 = ((area.y + area.h - 0.5).ceil().max(0.0) as u32).min(height);

        for y in y0..y1 {
            for x in x0..x1 {
                let pixel = self.image.get_pixel_mut(x, y);
                *pixel = composite(*pixel, colour);
            }
        }
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }
}

/// Straight-alpha "over" operator
fn composite(dst: Rgba<u8>, src: Colour) -> Rgba<u8> {
    let d = Vec4::from_array(dst.0.map(|c| c as f32 / 255.0));
    let sa = src.w;
    let da = d.w * (1.0 - sa);
    let out_a = sa + da;
    if out_a <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let rgb = (src.truncate() * sa + d.truncate() * da) / out_a;
    let out = rgb.extend(out_a) * 255.0;
    Rgba(out.to_array().map(|c| c.round().clamp(0.0, 255.0) as u8))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colour::grey;
    use crate::packer::Rect;

    fn paint() -> Paint {
        Paint {
            diffuse: Vec4::new(1.0, 0.0, 0.0, 1.0),
            specular: grey(0.8, 0.5),
            height: 0.2,
        }
    }

    #[test]
    fn test_fill_covers_pixel_centres() {
        let mut canvas = Canvas::new(8, 8).unwrap();
        canvas.fill_area(Area::new(2.0, 1.0, 3.0, 2.0), Vec4::new(0.0, 1.0, 0.0, 1.0));
        let image = canvas.into_image();

        for (x, y, pixel) in image.enumerate_pixels() {
            let inside = (2..5).contains(&x) && (1..3).contains(&y);
            let expected = if inside { [0, 255, 0, 255] } else { [0, 0, 0, 0] };
            assert_eq!(pixel.0, expected, "pixel ({}, {})", x, y);
        }
    }

    #[test]
    fn test_fill_clips_to_canvas() {
        let mut canvas = Canvas::new(4, 4).unwrap();
        canvas.fill_area(Area::new(-10.0, 2.0, 12.0, 10.0), Vec4::ONE);
        let image = canvas.into_image();
        assert_eq!(image.get_pixel(1, 3).0, [255, 255, 255, 255]);
        assert_eq!(image.get_pixel(2, 3).0, [0, 0, 0, 0]);
        assert_eq!(image.get_pixel(0, 1).0, [0, 0, 0, 0]);
    }

    #[test]
    fn test_composite_over_opaque() {
        let out = composite(Rgba([0, 0, 255, 255]), Vec4::new(1.0, 1.0, 1.0, 0.5));
        assert_eq!(out.0, [128, 128, 255, 255]);

        let out = composite(Rgba([0, 0, 0, 0]), grey(0.8, 0.5));
        assert_eq!(out.0, [204, 204, 204, 128]);
    }

    #[test]
    fn test_render_channels() {
        let block = Block {
            rect: Rect::new(0, 0, 2, 2),
            paint: paint(),
        };
        let renderable = Renderable::from_block(&block);

        let mut canvas = Canvas::new(2, 2).unwrap();
        renderable.render(Channel::Diffuse, &mut canvas).unwrap();
        assert_eq!(canvas.into_image().get_pixel(0, 0).0, [255, 0, 0, 255]);

        let mut canvas = Canvas::new(2, 2).unwrap();
        renderable.render(Channel::Height, &mut canvas).unwrap();
        assert_eq!(canvas.into_image().get_pixel(1, 1).0, [51, 51, 51, 255]);

        let mut canvas = Canvas::new(2, 2).unwrap();
        renderable.render(Channel::Specular, &mut canvas).unwrap();
        assert_eq!(canvas.into_image().get_pixel(1, 0).0, [204, 204, 204, 128]);
    }

    #[test]
    fn test_invalid_colour_fails_fast() {
        let bad = Renderable::Rect {
            area: Area::new(0.0, 0.0, 1.0, 1.0),
            paint: Paint {
                diffuse: Vec4::new(0.3, 0.4, 1.2, 1.0),
                ..paint()
            },
        };
        let mut canvas = Canvas::new(2, 2).unwrap();
        let err = bad.render_diffuse(&mut canvas).unwrap_err();
        assert!(matches!(
            err,
            TextureError::InvalidColour {
                channel: "diffuse",
                component: 2,
                ..
            }
        ));
        assert_eq!(canvas.into_image().get_pixel(0, 0).0, [0, 0, 0, 0]);
    }
}
