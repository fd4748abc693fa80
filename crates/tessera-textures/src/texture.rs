//! The texture component and world helpers.

use tessera_ecs::prelude::*;

use crate::loader::DataSource;
use crate::pixel::Pixel;
use crate::request::TextureRequest;
use crate::TextureError;

/// Size and version of the pixel array stored on the same entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Texture {
    pub width: u32,
    pub height: u32,
    /// Bumped on every successful import onto this entity.
    pub version: u32,
}

impl Texture {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            version: 0,
        }
    }

    /// `width * height`.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Register every type the import pipeline reads or writes.
pub fn register_texture_types(world: &mut World) {
    world.register_component::<TextureRequest>("texture_request");
    world.register_component::<Texture>("texture");
    world.register_component::<DataSource>("data_source");
    world.register_array::<Pixel>("pixels");
}

/// Spawn an entity that asks for `request.address`.
pub fn spawn_texture_request(
    world: &mut World,
    request: TextureRequest,
) -> Result<EntityId, TextureError> {
    Ok(world.spawn_with(request)?)
}

/// Spawn a texture from pixels already in memory, in output row order.
pub fn spawn_texture(
    world: &mut World,
    width: u32,
    height: u32,
    pixels: Vec<Pixel>,
) -> Result<EntityId, TextureError> {
    let texture = Texture::new(width, height);
    if pixels.len() != texture.pixel_count() {
        return Err(TextureError::PixelCountMismatch {
            width,
            height,
            actual: pixels.len(),
        });
    }
    let entity = world.spawn_with(texture)?;
    world.create_array(entity, pixels)?;
    Ok(entity)
}
