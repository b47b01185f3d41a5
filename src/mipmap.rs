//! Mipmap chain generation
//!
//! A chain renders every layer of a texture from full resolution down to 1x1.
//! Content comes from a [`LayerStrategy`]; finished images are handed to a
//! [`TextureSink`].

use std::fs;
use std::path::{Path, PathBuf};

use image::RgbaImage;
use image::imageops::{self, FilterType};
use log::{debug, info, trace, warn};
use rand::rngs::StdRng;

use crate::error::TextureError;
use crate::height_map::HeightMap;
use crate::normal_map::{self, NormalParams};
use crate::packer::PackerState;
use crate::render::Channel;

/// Iterator over the dimensions of each mipmap layer
#[derive(Debug, Clone)]
pub struct LayerDimensions {
    next: Option<(u32, u32)>,
}

impl Iterator for LayerDimensions {
    type Item = (u32, u32);

    fn next(&mut self) -> Option<Self::Item> {
        let (w, h) = self.next?;
        self.next = if w == 1 && h == 1 {
            None
        } else {
            Some(((w / 2).max(1), (h / 2).max(1)))
        };
        Some((w, h))
    }
}

/// Layer sizes starting at `width` x `height`, halving each side until both are 1
pub fn layer_dimensions(width: u32, height: u32) -> LayerDimensions {
    LayerDimensions {
        next: (width > 0 && height > 0).then_some((width, height)),
    }
}

/// Image types written for each layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputChannel {
    Diffuse,
    Specular,
    Normal,
    /// The resized height map the normals were computed from
    Height,
}

impl OutputChannel {
    pub fn letter(self) -> char {
        match self {
            OutputChannel::Diffuse => 'D',
            OutputChannel::Specular => 'S',
            OutputChannel::Normal => 'N',
            OutputChannel::Height => 'H',
        }
    }
}

/// File name for a layer image; layers are numbered from 1
pub fn texture_file_name(prefix: &str, name: &str, channel: OutputChannel, layer: u32) -> String {
    format!("{}{}{}{:02}.png", prefix, name, channel.letter(), layer + 1)
}

/// Texture specific content for a mipmap chain
pub trait LayerStrategy {
    /// Fill the initial block set before layer 0 is rendered
    fn populate(&self, state: &mut PackerState, rng: &mut StdRng);

    /// Adjust the block set for a lower resolution layer; never called for layer 0
    fn prepare_layer(&self, state: &mut PackerState, rng: &mut StdRng, layer: u32);

    /// Render one channel at full resolution, or `None` if it has no content
    fn render_layer(
        &self,
        state: &PackerState,
        layer: u32,
        channel: Channel,
    ) -> Result<Option<RgbaImage>, TextureError>;
}

/// Destination for finished layer images
pub trait TextureSink {
    fn store(&mut self, file_name: &str, image: RgbaImage) -> Result<(), TextureError>;
}

/// Writes PNG files into a directory
#[derive(Debug, Clone)]
pub struct PngDirectory {
    dir: PathBuf,
}

impl PngDirectory {
    /// Use `dir`, creating it if needed
    pub fn create<P: AsRef<Path>>(dir: P) -> Result<Self, TextureError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(PngDirectory { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl TextureSink for PngDirectory {
    fn store(&mut self, file_name: &str, image: RgbaImage) -> Result<(), TextureError> {
        let path = self.dir.join(file_name);
        image.save(&path)?;
        debug!("Wrote {}", path.display());
        Ok(())
    }
}

/// Scale an image to `width` x `height`; images already that size are returned as is
pub fn resize(image: RgbaImage, width: u32, height: u32) -> RgbaImage {
    if image.dimensions() == (width, height) {
        trace!("Resize to {}x{} skipped", width, height);
        return image;
    }
    imageops::resize(&image, width, height, FilterType::Triangle)
}

/// Names and output options for a chain
#[derive(Debug, Clone)]
pub struct ChainSettings {
    pub width: u32,
    pub height: u32,
    /// Prefix shared by every texture of the game, e.g. "Stadium"
    pub prefix: String,
    pub basename: String,
    pub normal: NormalParams,
    /// Also write the resized height map of each layer
    pub keep_height: bool,
}

/// What a finished chain produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChainSummary {
    pub layers: u32,
    pub files: usize,
}

/// Drives a strategy through every layer of a mipmap chain
///
/// The chain owns the block set and the random source for its whole life.
pub struct MipmapChain<S> {
    settings: ChainSettings,
    strategy: S,
    state: PackerState,
    rng: StdRng,
}

impl<S: LayerStrategy> MipmapChain<S> {
    pub fn new(settings: ChainSettings, strategy: S, rng: StdRng) -> Result<Self, TextureError> {
        if settings.width == 0 || settings.height == 0 {
            return Err(TextureError::InvalidDimensions {
                width: settings.width,
                height: settings.height,
            });
        }
        Ok(MipmapChain {
            settings,
            strategy,
            state: PackerState::new(),
            rng,
        })
    }

    pub fn state(&self) -> &PackerState {
        &self.state
    }

    /// Render, resize and store every channel of every layer
    pub fn render_all<K: TextureSink>(&mut self, sink: &mut K) -> Result<ChainSummary, TextureError> {
        let mut summary = ChainSummary::default();
        self.strategy.populate(&mut self.state, &mut self.rng);
        if self.state.is_empty() {
            warn!("No blocks were placed; layers only show the background");
        }

        let dims = layer_dimensions(self.settings.width, self.settings.height);
        for (layer, (w, h)) in (0u32..).zip(dims) {
            if layer > 0 {
                self.strategy.prepare_layer(&mut self.state, &mut self.rng, layer);
            }
            info!("Layer {} at {}x{} with {} block groups", layer + 1, w, h, self.state.len());

            for channel in Channel::ALL {
                let Some(image) = self.strategy.render_layer(&self.state, layer, channel)? else {
                    debug!("No {} image for layer {}", channel.name(), layer + 1);
                    continue;
                };
                let image = resize(image, w, h);

                match channel {
                    Channel::Diffuse => self.store(sink, OutputChannel::Diffuse, layer, image)?,
                    Channel::Specular => self.store(sink, OutputChannel::Specular, layer, image)?,
                    Channel::Height => {
                        let heights = HeightMap::from_image(&image)?;
                        let normals = normal_map::synthesize(&heights, &self.settings.normal)?;
                        self.store(sink, OutputChannel::Normal, layer, normals)?;
                        if self.settings.keep_height {
                            self.store(sink, OutputChannel::Height, layer, image)?;
                        }
                    }
                }
                summary.files += 1 + usize::from(channel == Channel::Height && self.settings.keep_height);
            }
            summary.layers += 1;
        }

        Ok(summary)
    }

    fn store<K: TextureSink>(
        &self,
        sink: &mut K,
        channel: OutputChannel,
        layer: u32,
        image: RgbaImage,
    ) -> Result<(), TextureError> {
        let name = texture_file_name(&self.settings.prefix, &self.settings.basename, channel, layer);
        sink.store(&name, image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normal_map::NormalLayout;
    use image::Rgba;
    use rand::SeedableRng;
    use std::cell::RefCell;

    /// Keeps stored images in memory
    #[derive(Default)]
    struct MemorySink {
        images: Vec<(String, RgbaImage)>,
    }

    impl TextureSink for MemorySink {
        fn store(&mut self, file_name: &str, image: RgbaImage) -> Result<(), TextureError> {
            self.images.push((file_name.to_string(), image));
            Ok(())
        }
    }

    /// Solid images of the full size; specular is left out
    struct SolidStrategy {
        width: u32,
        height: u32,
        prepared: RefCell<Vec<u32>>,
    }

    impl LayerStrategy for SolidStrategy {
        fn populate(&self, _state: &mut PackerState, _rng: &mut StdRng) {}

        fn prepare_layer(&self, _state: &mut PackerState, _rng: &mut StdRng, layer: u32) {
            self.prepared.borrow_mut().push(layer);
        }

        fn render_layer(
            &self,
            _state: &PackerState,
            _layer: u32,
            channel: Channel,
        ) -> Result<Option<RgbaImage>, TextureError> {
            let pixel = match channel {
                Channel::Diffuse => Rgba([200, 10, 10, 255]),
                Channel::Specular => return Ok(None),
                Channel::Height => Rgba([90, 90, 90, 255]),
            };
            Ok(Some(RgbaImage::from_pixel(self.width, self.height, pixel)))
        }
    }

    fn settings(width: u32, height: u32, keep_height: bool) -> ChainSettings {
        ChainSettings {
            width,
            height,
            prefix: "Stadium".to_string(),
            basename: "Test".to_string(),
            normal: NormalParams {
                amplitude: 3.0,
                flip_y: false,
                layout: NormalLayout::SwizzledOffset,
            },
            keep_height,
        }
    }

    #[test]
    fn test_layer_dimensions_halve_to_one() {
        let dims: Vec<_> = layer_dimensions(1024, 512).collect();
        assert_eq!(dims.len(), 1 + 10);
        assert_eq!(dims[0], (1024, 512));
        assert_eq!(dims[1], (512, 256));
        assert_eq!(dims[9], (2, 1));
        assert_eq!(dims[10], (1, 1));
        for pair in dims.windows(2) {
            assert_eq!(pair[1], ((pair[0].0 / 2).max(1), (pair[0].1 / 2).max(1)));
        }

        assert_eq!(layer_dimensions(5, 3).collect::<Vec<_>>(), vec![(5, 3), (2, 1), (1, 1)]);
        assert_eq!(layer_dimensions(1, 1).collect::<Vec<_>>(), vec![(1, 1)]);
        assert_eq!(layer_dimensions(1, 8).count(), 4);
        assert_eq!(layer_dimensions(0, 8).count(), 0);
    }

    #[test]
    fn test_texture_file_name() {
        assert_eq!(
            texture_file_name("Stadium", "Floor", OutputChannel::Diffuse, 0),
            "StadiumFloorD01.png"
        );
        assert_eq!(
            texture_file_name("Stadium", "Floor", OutputChannel::Normal, 10),
            "StadiumFloorN11.png"
        );
    }

    #[test]
    fn test_resize_skips_matching_size() {
        let image = RgbaImage::from_pixel(4, 2, Rgba([1, 2, 3, 255]));
        let same = resize(image.clone(), 4, 2);
        assert_eq!(same, image);

        let smaller = resize(image, 2, 1);
        assert_eq!(smaller.dimensions(), (2, 1));
        assert_eq!(smaller.get_pixel(0, 0).0, [1, 2, 3, 255]);
    }

    #[test]
    fn test_chain_writes_every_layer() {
        let strategy = SolidStrategy {
            width: 8,
            height: 4,
            prepared: RefCell::new(Vec::new()),
        };
        let mut chain =
            MipmapChain::new(settings(8, 4, false), strategy, StdRng::seed_from_u64(1)).unwrap();
        let mut sink = MemorySink::default();

        let summary = chain.render_all(&mut sink).unwrap();
        assert_eq!(summary, ChainSummary { layers: 4, files: 8 });
        assert_eq!(*chain.strategy.prepared.borrow(), vec![1, 2, 3]);

        let names: Vec<_> = sink.images.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "StadiumTestD01.png",
                "StadiumTestN01.png",
                "StadiumTestD02.png",
                "StadiumTestN02.png",
                "StadiumTestD03.png",
                "StadiumTestN03.png",
                "StadiumTestD04.png",
                "StadiumTestN04.png",
            ]
        );

        let expected_dims = [(8, 4), (4, 2), (2, 1), (1, 1)];
        for (i, (_, image)) in sink.images.iter().enumerate() {
            assert_eq!(image.dimensions(), expected_dims[i / 2]);
        }
        // A constant height map gives flat normals
        for (_, image) in sink.images.iter().skip(1).step_by(2) {
            assert!(image.pixels().all(|p| p.0 == [128, 128, 255, 255]));
        }
    }

    #[test]
    fn test_chain_keeps_height_maps() {
        let strategy = SolidStrategy {
            width: 2,
            height: 2,
            prepared: RefCell::new(Vec::new()),
        };
        let mut chain =
            MipmapChain::new(settings(2, 2, true), strategy, StdRng::seed_from_u64(1)).unwrap();
        let mut sink = MemorySink::default();

        let summary = chain.render_all(&mut sink).unwrap();
        assert_eq!(summary, ChainSummary { layers: 2, files: 6 });
        assert_eq!(sink.images[2].0, "StadiumTestH01.png");
        assert_eq!(sink.images[2].1.get_pixel(0, 0).0, [90, 90, 90, 255]);
    }

    #[test]
    fn test_png_directory_writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("pngs");
        let mut sink = PngDirectory::create(&out).unwrap();
        sink.store("StadiumFloorD01.png", RgbaImage::from_pixel(3, 2, Rgba([9, 8, 7, 255])))
            .unwrap();

        let loaded = image::open(out.join("StadiumFloorD01.png")).unwrap().to_rgba8();
        assert_eq!(loaded.dimensions(), (3, 2));
        assert_eq!(loaded.get_pixel(2, 1).0, [9, 8, 7, 255]);
    }
}
