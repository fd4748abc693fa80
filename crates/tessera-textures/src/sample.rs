//! Bilinear sampling of imported textures.

use tessera_ecs::prelude::*;

use crate::pixel::Pixel;
use crate::texture::Texture;

/// Sample `pixels` at normalised `(u, v)` with bilinear filtering.
///
/// `(0, 0)` is buffer index 0 (the bottom-left corner for a default import)
/// and `(1, 1)` the last pixel. Coordinates are clamped. Channels come back
/// in `0.0..=1.0`. An empty texture or a buffer shorter than its size samples
/// as transparent black.
pub fn evaluate(texture: &Texture, pixels: &[Pixel], u: f32, v: f32) -> [f32; 4] {
    let (width, height) = (texture.width as usize, texture.height as usize);
    if width == 0 || height == 0 || pixels.len() < width * height {
        return [0.0; 4];
    }

    let x = u.clamp(0.0, 1.0) * (width - 1) as f32;
    let y = v.clamp(0.0, 1.0) * (height - 1) as f32;
    let (x0, y0) = (x.floor() as usize, y.floor() as usize);
    let (x1, y1) = ((x0 + 1).min(width - 1), (y0 + 1).min(height - 1));
    let (tx, ty) = (x - x0 as f32, y - y0 as f32);

    let at = |px: usize, py: usize| pixels[py * width + px].to_f32();
    let lerp = |a: [f32; 4], b: [f32; 4], t: f32| -> [f32; 4] {
        std::array::from_fn(|i| a[i] + (b[i] - a[i]) * t)
    };

    let bottom = lerp(at(x0, y0), at(x1, y0), tx);
    let top = lerp(at(x0, y1), at(x1, y1), tx);
    lerp(bottom, top, ty)
}

/// [`evaluate`] against the texture stored on `entity`, if it has one.
pub fn evaluate_entity(world: &World, entity: EntityId, u: f32, v: f32) -> Option<[f32; 4]> {
    let texture = world.get_component::<Texture>(entity)?;
    let pixels = world.get_array::<Pixel>(entity)?;
    Some(evaluate(texture, pixels, u, v))
}
