//! Normal map synthesis from a toroidal height field
//!
//! Each output texel holds the unit surface normal of the height field,
//! quantized to signed bytes. Two byte layouts are supported; the layout is
//! always declared by the caller and the same slot table drives both encoding
//! and decoding.

use bytemuck::{Pod, Zeroable};
use glam::DVec3;
use image::RgbaImage;

use crate::error::TextureError;
use crate::height_map::HeightMap;

/// How a signed component in [-1, 1] is stored in a byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignedEncoding {
    /// Non-negative values as `round(v * 127)`, negative ones as `255 + round(v * 127)`
    Complement,
    /// `round(v * 127) + 128`
    Offset128,
}

impl SignedEncoding {
    pub fn encode(self, v: f64) -> u8 {
        let q = (v * 127.0).round().clamp(-127.0, 127.0) as i32;
        match self {
            SignedEncoding::Complement if v < 0.0 => (255 + q) as u8,
            SignedEncoding::Complement => q as u8,
            SignedEncoding::Offset128 => (q + 128) as u8,
        }
    }

    pub fn decode(self, byte: u8) -> f64 {
        let q = match self {
            SignedEncoding::Complement if byte > 127 => byte as i32 - 255,
            SignedEncoding::Complement => byte as i32,
            SignedEncoding::Offset128 => byte as i32 - 128,
        };
        q as f64 / 127.0
    }
}

/// Byte slot (index into an RGBA texel) of each normal component
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelTable {
    pub x: usize,
    pub y: usize,
    pub z: usize,
    /// Texel contents before the components are written
    pub fill: [u8; 4],
}

/// Declared output layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NormalLayout {
    /// RGBA bytes `[0, z, y, x]` with complement encoding
    #[default]
    ZeroZYX,
    /// RGBA bytes `[x, y, z, 255]` (z, y, x in BGRA memory order) with offset encoding
    SwizzledOffset,
}

impl NormalLayout {
    pub fn table(self) -> ChannelTable {
        match self {
            NormalLayout::ZeroZYX => ChannelTable {
                x: 3,
                y: 2,
                z: 1,
                fill: [0, 0, 0, 0],
            },
            NormalLayout::SwizzledOffset => ChannelTable {
                x: 0,
                y: 1,
                z: 2,
                fill: [0, 0, 0, 255],
            },
        }
    }

    pub fn encoding(self) -> SignedEncoding {
        match self {
            NormalLayout::ZeroZYX => SignedEncoding::Complement,
            NormalLayout::SwizzledOffset => SignedEncoding::Offset128,
        }
    }
}

/// One encoded normal
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct NormalTexel(pub [u8; 4]);

impl NormalTexel {
    pub fn encode(normal: DVec3, layout: NormalLayout) -> Self {
        let table = layout.table();
        let encoding = layout.encoding();
        let mut bytes = table.fill;
        bytes[table.x] = encoding.encode(normal.x);
        bytes[table.y] = encoding.encode(normal.y);
        bytes[table.z] = encoding.encode(normal.z);
        NormalTexel(bytes)
    }

    pub fn decode(self, layout: NormalLayout) -> DVec3 {
        let table = layout.table();
        let encoding = layout.encoding();
        DVec3::new(
            encoding.decode(self.0[table.x]),
            encoding.decode(self.0[table.y]),
            encoding.decode(self.0[table.z]),
        )
    }
}

/// Parameters for normal synthesis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalParams {
    /// Multiplier for the slope ratios
    pub amplitude: f64,
    /// Negate the vertical slope when the height source's y axis points the
    /// other way from the target frame
    pub flip_y: bool,
    pub layout: NormalLayout,
}

impl Default for NormalParams {
    fn default() -> Self {
        NormalParams {
            amplitude: 1.0,
            flip_y: false,
            layout: NormalLayout::default(),
        }
    }
}

/// Height slopes (dz/dx, dz/dy) at a pixel from its four wrapped neighbours
pub fn slopes(map: &HeightMap, x: i64, y: i64, amplitude: f64, flip_y: bool) -> (f64, f64) {
    // Symmetric difference spans two pixels, hence the halved amplitude
    let amp = amplitude / 2.0;
    let left = map.sample(x - 1, y) as f64;
    let right = map.sample(x + 1, y) as f64;
    let up = map.sample(x, y - 1) as f64;
    let down = map.sample(x, y + 1) as f64;

    let dx = (right - left) * amp;
    let dy = (down - up) * amp;
    (dx, if flip_y { -dy } else { dy })
}

/// Unit surface normal for the given slopes
pub fn normal_from_slopes(dx: f64, dy: f64) -> DVec3 {
    if dx == 0.0 && dy == 0.0 {
        return DVec3::Z;
    }

    // Tangents (1, 0, dx) and (0, 1, dy) give normals (-dx, 0, 1) and (0, dy, 1).
    // Each is normalised before they are summed.
    let magx = (1.0 + dx * dx).sqrt();
    let magy = (1.0 + dy * dy).sqrt();
    let sum = DVec3::new(-dx / magx, dy / magy, 1.0 / magx + 1.0 / magy);
    sum / sum.length()
}

/// Unit surface normal at a pixel
pub fn surface_normal(map: &HeightMap, x: i64, y: i64, params: &NormalParams) -> DVec3 {
    let (dx, dy) = slopes(map, x, y, params.amplitude, params.flip_y);
    normal_from_slopes(dx, dy)
}

/// Convert a height map into an encoded normal map of the same size
///
/// # Arguments
///
/// * `map` - Height field, sampled toroidally at the edges
/// * `params` - Amplitude, vertical flip and the byte layout of the output
///
/// # Returns
///
/// An RGBA image with one encoded unit normal per height sample
pub fn synthesize(map: &HeightMap, params: &NormalParams) -> Result<RgbaImage, TextureError> {
    let (width, height) = (map.width(), map.height());
    let mut texels = Vec::with_capacity(width as usize * height as usize);

    for y in 0..height as i64 {
        for x in 0..width as i64 {
            let normal = surface_normal(map, x, y, params);
            let texel = NormalTexel::encode(normal, params.layout);
            debug_assert!(
                (texel.decode(params.layout) - normal).abs().max_element() <= 1.0 / 127.0,
                "normal {} does not survive {:?}",
                normal,
                params.layout
            );
            texels.push(texel);
        }
    }

    let bytes: Vec<u8> = bytemuck::cast_slice(texels.as_slice()).to_vec();
    let len = bytes.len();
    RgbaImage::from_raw(width, height, bytes).ok_or(TextureError::BufferSize { width, height, len })
}
