use image::RgbaImage;

use crate::error::TextureError;

/// A greyscale height field read with toroidal wraparound
#[derive(Debug, Clone, PartialEq)]
pub struct HeightMap {
    width: u32,
    height: u32,
    samples: Vec<f32>,
}

impl HeightMap {
    /// Create a height map from row-major samples in [0, 1]
    pub fn from_samples(width: u32, height: u32, samples: Vec<f32>) -> Result<Self, TextureError> {
        if width == 0 || height == 0 {
            return Err(TextureError::InvalidDimensions { width, height });
        }
        if samples.len() != width as usize * height as usize {
            return Err(TextureError::BufferSize {
                width,
                height,
                len: samples.len(),
            });
        }
        Ok(HeightMap {
            width,
            height,
            samples,
        })
    }

    /// Build a height map from a rendered greyscale image
    ///
    /// Only the green channel is read.
    pub fn from_image(image: &RgbaImage) -> Result<Self, TextureError> {
        let texels: &[[u8; 4]] = bytemuck::cast_slice(image.as_raw().as_slice());
        let samples = texels.iter().map(|texel| texel[1] as f32 / 255.0).collect();
        Self::from_samples(image.width(), image.height(), samples)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Sample the height at (x, y); coordinates outside the map wrap around
    pub fn sample(&self, x: i64, y: i64) -> f32 {
        let x = x.rem_euclid(self.width as i64) as usize;
        let y = y.rem_euclid(self.height as i64) as usize;
        self.samples[y * self.width as usize + x]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn gradient(width: u32, height: u32) -> HeightMap {
        let samples = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x + y * width) as f32 / (width * height) as f32))
            .collect();
        HeightMap::from_samples(width, height, samples).unwrap()
    }

    #[test]
    fn test_sample_wraps_toroidally() {
        let map = gradient(7, 5);
        for y in 0..5i64 {
            for x in 0..7i64 {
                let value = map.sample(x, y);
                assert_eq!(value, map.sample(x + 7, y));
                assert_eq!(value, map.sample(x, y + 5));
                assert_eq!(value, map.sample(x - 7, y - 5));
                assert_eq!(value, map.sample(x + 21, y - 15));
            }
        }
    }

    #[test]
    fn test_from_image_reads_green_channel() {
        let mut image = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255]));
        image.put_pixel(1, 0, Rgba([10, 255, 30, 255]));
        image.put_pixel(0, 1, Rgba([255, 51, 0, 0]));

        let map = HeightMap::from_image(&image).unwrap();
        assert_eq!(map.width(), 2);
        assert_eq!(map.height(), 2);
        assert_eq!(map.sample(0, 0), 0.0);
        assert_eq!(map.sample(1, 0), 1.0);
        assert!((map.sample(0, 1) - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_rejects_mismatched_buffer() {
        assert!(matches!(
            HeightMap::from_samples(3, 3, vec![0.0; 8]),
            Err(TextureError::BufferSize { len: 8, .. })
        ));
        assert!(matches!(
            HeightMap::from_samples(0, 3, Vec::new()),
            Err(TextureError::InvalidDimensions { .. })
        ));
    }
}
