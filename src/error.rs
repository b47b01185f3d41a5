use thiserror::Error;

/// Errors raised while building texture layers
#[derive(Debug, Error)]
pub enum TextureError {
    /// A colour component reached the rasterizer outside [0, 1]
    #[error("invalid {channel} colour: component {component} is {value}")]
    InvalidColour {
        channel: &'static str,
        component: usize,
        value: f32,
    },

    #[error("invalid texture dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    /// A raw pixel buffer does not hold width * height texels
    #[error("pixel buffer of {len} bytes does not fit {width}x{height}")]
    BufferSize { width: u32, height: u32, len: usize },

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
