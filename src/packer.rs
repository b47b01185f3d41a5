use log::{debug, trace};
use rand::Rng;

use crate::colour::Colour;
use crate::error::TextureError;

/// An axis-aligned rectangle in pixel units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Rect { x, y, w, h }
    }

    pub fn translate(self, dx: i32, dy: i32) -> Self {
        Rect::new(self.x + dx, self.y + dy, self.w, self.h)
    }

    /// Grow the rectangle by `margin` on every side
    pub fn inflate(self, margin: i32) -> Self {
        Rect::new(
            self.x - margin,
            self.y - margin,
            self.w + 2 * margin,
            self.h + 2 * margin,
        )
    }

    /// Overlap test where shared edges count as touching
    pub fn touches(&self, other: &Rect) -> bool {
        self.x <= other.x + other.w
            && self.x + self.w >= other.x
            && self.y <= other.y + other.h
            && self.y + self.h >= other.y
    }
}

/// Paint attributes shared by every member of a block group
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Paint {
    pub diffuse: Colour,
    pub specular: Colour,
    /// Height in [0, 1]
    pub height: f32,
}

/// A painted rectangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Block {
    pub rect: Rect,
    pub paint: Paint,
}

/// One logical placement plus its copies across the wrap boundary
///
/// The first member is always the placed rectangle; the others are the same
/// rectangle shifted by minus the canvas width and/or height.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockGroup {
    members: Vec<Rect>,
    paint: Paint,
}

impl BlockGroup {
    /// Build a group for `rect` on a `width` x `height` torus
    pub fn wrapped(rect: Rect, width: i32, height: i32, paint: Paint) -> Self {
        let crosses_x = rect.x + rect.w > width;
        let crosses_y = rect.y + rect.h > height;

        let mut members = vec![rect];
        if crosses_x {
            members.push(rect.translate(-width, 0));
        }
        if crosses_y {
            members.push(rect.translate(0, -height));
            if crosses_x {
                members.push(rect.translate(-width, -height));
            }
        }
        BlockGroup { members, paint }
    }

    pub fn anchor(&self) -> Rect {
        self.members[0]
    }

    pub fn members(&self) -> &[Rect] {
        &self.members
    }

    pub fn paint(&self) -> &Paint {
        &self.paint
    }

    pub fn set_specular(&mut self, specular: Colour) {
        self.paint.specular = specular;
    }

    pub fn blocks(&self) -> impl Iterator<Item = Block> + '_ {
        let paint = *self.paint();
        self.members.iter().map(move |rect| Block { rect: *rect, paint })
    }
}

/// Every wrapped copy of `rect` that touches the `width` x `height` canvas
pub fn wrapped_copies(rect: Rect, width: i32, height: i32) -> Vec<Rect> {
    let kx_min = -(rect.x + rect.w).div_euclid(width);
    let kx_max = (width - 1 - rect.x).div_euclid(width);
    let ky_min = -(rect.y + rect.h).div_euclid(height);
    let ky_max = (height - 1 - rect.y).div_euclid(height);

    let mut copies = Vec::new();
    for ky in ky_min..=ky_max {
        for kx in kx_min..=kx_max {
            copies.push(rect.translate(kx * width, ky * height));
        }
    }
    copies
}

/// Padded collision geometry of a placement, wrapped across whichever edges it crosses
pub fn collision_footprint(rect: Rect, margin: i32, width: i32, height: i32) -> Vec<Rect> {
    wrapped_copies(rect.inflate(margin), width, height)
}

fn footprints_touch(a: &[Rect], b: &[Rect]) -> bool {
    a.iter().any(|ra| b.iter().any(|rb| ra.touches(rb)))
}

/// Parameters controlling block sizes and packing density
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PackerParams {
    /// Pixel size of one block unit
    pub base_unit: i32,
    /// Smallest block side in units
    pub min_units: i32,
    /// Largest block side in units
    pub max_units: i32,
    /// Largest difference between width and height in units
    pub max_unit_difference: i32,
    /// Padding added around every block for collision tests
    pub collision_margin: i32,
    /// Consecutive failed placements that end a fill
    pub max_failures: u32,
}

impl Default for PackerParams {
    fn default() -> Self {
        PackerParams {
            base_unit: 8,
            min_units: 3,
            max_units: 5,
            max_unit_difference: 1,
            collision_margin: 4,
            max_failures: 10,
        }
    }
}

/// Which retained groups get a new specular colour during a mutation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Recolour {
    None,
    /// Each retained group independently with this probability
    Subset { probability: f64 },
    All,
}

/// Parameters for the per-layer mutation pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MutationParams {
    /// Leading fraction of groups kept, in [0, 1]
    pub keep_fraction: f64,
    pub recolour: Recolour,
}

impl Default for MutationParams {
    fn default() -> Self {
        MutationParams {
            keep_fraction: 0.75,
            recolour: Recolour::Subset { probability: 0.25 },
        }
    }
}

/// Outcome of a mutation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MutationReport {
    pub kept: usize,
    pub recoloured: usize,
    pub placed: usize,
}

/// Ordered block groups on the torus, most recent last
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PackerState {
    groups: Vec<BlockGroup>,
    generation: u32,
}

impl PackerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn groups(&self) -> &[BlockGroup] {
        &self.groups
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Number of mutation passes applied so far
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// All blocks of all groups, in placement order
    pub fn blocks(&self) -> impl Iterator<Item = Block> + '_ {
        self.groups.iter().flat_map(|group| group.blocks())
    }
}

/// Places squarish blocks on a toroidal canvas
#[derive(Debug, Clone, Copy)]
pub struct Packer {
    width: i32,
    height: i32,
    params: PackerParams,
}

impl Packer {
    pub fn new(width: u32, height: u32, params: PackerParams) -> Result<Self, TextureError> {
        if width == 0 || height == 0 || width > i32::MAX as u32 || height > i32::MAX as u32 {
            return Err(TextureError::InvalidDimensions { width, height });
        }
        Ok(Packer {
            width: width as i32,
            height: height as i32,
            params,
        })
    }

    /// Draw a block size whose sides differ by at most `max_unit_difference` units
    pub fn squarish_size<R: Rng + ?Sized>(&self, rng: &mut R) -> (i32, i32) {
        let p = &self.params;
        let w = rng.gen_range(p.min_units..=p.max_units);
        let mut h = rng.gen_range(p.min_units..=p.max_units);
        while (w - h).abs() > p.max_unit_difference {
            h = rng.gen_range(p.min_units..=p.max_units);
        }
        (w * p.base_unit, h * p.base_unit)
    }

    fn footprint(&self, rect: Rect) -> Vec<Rect> {
        collision_footprint(rect, self.params.collision_margin, self.width, self.height)
    }

    /// Whether the padded `rect` touches any group already in `state`
    pub fn collides(&self, state: &PackerState, rect: Rect) -> bool {
        let candidate = self.footprint(rect);
        state
            .groups
            .iter()
            .any(|group| footprints_touch(&candidate, &self.footprint(group.anchor())))
    }

    /// Add block groups until `max_failures` consecutive placements collide
    ///
    /// # Arguments
    ///
    /// * `state` - Groups already on the canvas; new groups are appended
    /// * `rng` - Source for positions, sizes and paint
    /// * `paint` - Supplies the attributes of each new group
    ///
    /// # Returns
    ///
    /// The number of groups placed
    pub fn fill<R, P>(&self, state: &mut PackerState, rng: &mut R, mut paint: P) -> usize
    where
        R: Rng + ?Sized,
        P: FnMut(&mut R) -> Paint,
    {
        let mut failures = 0;
        let mut placed = 0;

        while failures < self.params.max_failures {
            let x = rng.gen_range(0..self.width);
            let y = rng.gen_range(0..self.height);
            let (w, h) = self.squarish_size(rng);
            let rect = Rect::new(x, y, w, h);

            if self.collides(state, rect) {
                failures += 1;
                trace!("Placement at ({}, {}) collided ({} in a row)", x, y, failures);
                continue;
            }

            failures = 0;
            let group = BlockGroup::wrapped(rect, self.width, self.height, paint(rng));
            state.groups.push(group);
            placed += 1;
        }

        debug!("Placed {} groups, {} in total", placed, state.len());
        placed
    }

    /// Drop the trailing groups, recolour some survivors and refill
    ///
    /// The retained prefix keeps its geometry and order.
    ///
    /// # Arguments
    ///
    /// * `state` - Groups of the previous layer, mutated in place
    /// * `mutation` - Keep fraction and recolouring mode
    /// * `rng` - Source for the recolour choices and the refill
    /// * `paint` - Attributes of groups added by the refill
    /// * `recolour` - New specular colour for a chosen survivor
    ///
    /// # Returns
    ///
    /// How many groups were kept, recoloured and newly placed
    pub fn mutate<R, P, S>(
        &self,
        state: &mut PackerState,
        mutation: &MutationParams,
        rng: &mut R,
        paint: P,
        mut recolour: S,
    ) -> MutationReport
    where
        R: Rng + ?Sized,
        P: FnMut(&mut R) -> Paint,
        S: FnMut(&mut R) -> Colour,
    {
        let fraction = mutation.keep_fraction.clamp(0.0, 1.0);
        let kept = (state.len() as f64 * fraction).floor() as usize;
        state.groups.truncate(kept);

        let mut recoloured = 0;
        for group in &mut state.groups {
            let chosen = match mutation.recolour {
                Recolour::None => false,
                Recolour::Subset { probability } => rng.gen_bool(probability.clamp(0.0, 1.0)),
                Recolour::All => true,
            };
            if chosen {
                group.set_specular(recolour(rng));
                recoloured += 1;
            }
        }
        state.generation += 1;

        let placed = self.fill(state, rng, paint);
        MutationReport {
            kept,
            recoloured,
            placed,
        }
    }
}
