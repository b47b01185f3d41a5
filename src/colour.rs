use glam::{Vec3, Vec4};
use rand::Rng;
use rand::seq::SliceRandom;

use crate::error::TextureError;

/// RGBA colour with components in [0, 1]
pub type Colour = Vec4;

/// Parse "r,g,b" or "r,g,b,a" into a colour; a missing alpha is opaque
pub fn parse_colour(text: &str) -> Result<Colour, String> {
    let parts = text
        .split(',')
        .map(|part| part.trim().parse::<f32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid colour '{}': {}", text, e))?;

    match parts.as_slice() {
        [r, g, b] => Ok(Vec4::new(*r, *g, *b, 1.0)),
        [r, g, b, a] => Ok(Vec4::new(*r, *g, *b, *a)),
        _ => Err(format!(
            "invalid colour '{}': expected 3 or 4 comma separated components",
            text
        )),
    }
}

/// Fail if any component is not a finite value in [0, 1]
pub fn validate(colour: Colour, channel: &'static str) -> Result<(), TextureError> {
    for (component, value) in colour.to_array().into_iter().enumerate() {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            return Err(TextureError::InvalidColour {
                channel,
                component,
                value,
            });
        }
    }
    Ok(())
}

/// Generate a random opaque colour
///
/// * `min_sat` - Minimum saturation, 1 means two channels are 0, 0 allows grey
/// * `brightness` - Roughly the V of HSV
///
/// The strongest channel is chosen at random.
pub fn random_colour<R: Rng + ?Sized>(rng: &mut R, min_sat: f32, brightness: f32) -> Colour {
    let min_sat = min_sat.clamp(0.0, 1.0);
    let c1 = rng.gen_range(min_sat..=1.0);
    let c2 = rng.gen_range(0.0..=c1 - min_sat);
    let c3 = rng.gen_range(0.0..=c1 - min_sat);

    let mut rgb = [c1 * brightness, c2 * brightness, c3 * brightness];
    rgb.shuffle(rng);
    Vec3::from(rgb).extend(1.0)
}

/// Brighten a colour's RGB by `step` once per mipmap layer
///
/// The result is not clamped; an out of range component is reported when the
/// colour is rendered.
pub fn tint_for_layer(colour: Colour, step: Vec3, layer: u32) -> Colour {
    (colour.truncate() + step * layer as f32).extend(colour.w)
}

/// Grey with the given alpha
pub fn grey(level: f32, alpha: f32) -> Colour {
    Vec4::new(level, level, level, alpha)
}
