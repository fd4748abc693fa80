//! End-to-end import scenarios driven through `TextureImportSystem::update`.

use std::io::Cursor;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use image::{ImageBuffer, ImageFormat, Rgba};
use tessera_ecs::prelude::*;
use tessera_textures::prelude::*;
use tessera_textures::sample;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// 16x9 RGBA PNG: green top-left, red top-right, yellow bottom-left, blue
/// bottom-right, cyan in the middle.
const GRADIENT_PNG: [u8; 194] = [
    137, 80, 78, 71, 13, 10, 26, 10, 0, 0, 0, 13, 73, 72, 68, 82, 0, 0, 0, 16, 0, 0, 0, 9, 8, 6, 0,
    0, 0, 59, 42, 172, 50, 0, 0, 0, 1, 115, 82, 71, 66, 0, 174, 206, 28, 233, 0, 0, 0, 4, 103, 65,
    77, 65, 0, 0, 177, 143, 11, 252, 97, 5, 0, 0, 0, 9, 112, 72, 89, 115, 0, 0, 14, 195, 0, 0, 14,
    195, 1, 199, 111, 168, 100, 0, 0, 0, 87, 73, 68, 65, 84, 40, 83, 149, 144, 81, 10, 0, 32, 8,
    67, 247, 211, 253, 239, 218, 5, 10, 173, 68, 43, 211, 6, 131, 106, 243, 17, 2, 173, 180, 229,
    180, 0, 49, 60, 0, 148, 15, 105, 0, 223, 3, 192, 11, 34, 217, 14, 9, 1, 36, 13, 16, 85, 176,
    83, 0, 155, 205, 42, 1, 130, 225, 181, 2, 62, 143, 129, 123, 245, 254, 106, 118, 72, 185, 87,
    123, 203, 2, 230, 183, 127, 69, 128, 14, 227, 84, 232, 23, 9, 124, 171, 212, 0, 0, 0, 0, 73,
    69, 78, 68, 174, 66, 96, 130,
];

const RED: [u8; 4] = [255, 0, 0, 255];
const GREEN: [u8; 4] = [0, 255, 0, 255];
const BLUE: [u8; 4] = [0, 0, 255, 255];
const YELLOW: [u8; 4] = [255, 255, 0, 255];

fn encode_png(width: u32, height: u32, pixels: &[[u8; 4]]) -> Vec<u8> {
    let img = ImageBuffer::from_fn(width, height, |x, y| Rgba(pixels[(y * width + x) as usize]));
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

/// Source rows top-down: `{red, green}` then `{blue, yellow}`.
fn quad_png() -> Vec<u8> {
    encode_png(2, 2, &[RED, GREEN, BLUE, YELLOW])
}

/// PNG codec that counts how often it is asked to decode.
#[derive(Clone, Default)]
struct CountingCodec {
    calls: Arc<AtomicUsize>,
}

impl CountingCodec {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ImageCodec for CountingCodec {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, TextureError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        PngCodec.decode(bytes)
    }
}

fn setup_world() -> World {
    let mut world = World::new();
    register_texture_types(&mut world);
    world
}

fn status(world: &World, entity: EntityId) -> RequestStatus {
    world
        .get_component::<TextureRequest>(entity)
        .unwrap()
        .status
}

fn pixels(world: &World, entity: EntityId) -> Vec<Pixel> {
    world.get_array::<Pixel>(entity).unwrap().to_vec()
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

#[test]
fn same_address_decodes_once_for_many_entities() {
    let mut world = setup_world();
    let mut loader = MemoryLoader::new();
    loader.insert("shared", quad_png());
    let codec = CountingCodec::default();
    let mut importer =
        TextureImportSystem::with_codec(loader, ImportConfig::default(), codec.clone());

    let entities: Vec<EntityId> = (0..8)
        .map(|_| spawn_texture_request(&mut world, TextureRequest::new("shared", 1.0)).unwrap())
        .collect();
    importer.update(&mut world, 0.016);

    assert_eq!(codec.calls(), 1);
    assert_eq!(importer.cache().stats().decodes, 1);
    let first = pixels(&world, entities[0]);
    for &entity in &entities {
        assert_eq!(status(&world, entity), RequestStatus::Loaded);
        assert_eq!(pixels(&world, entity), first);
    }
}

#[test]
fn loaded_request_is_left_alone() {
    let mut world = setup_world();
    let mut loader = MemoryLoader::new();
    loader.insert("tex", quad_png());
    let codec = CountingCodec::default();
    let mut importer =
        TextureImportSystem::with_codec(loader, ImportConfig::default(), codec.clone());
    let entity = spawn_texture_request(&mut world, TextureRequest::new("tex", 1.0)).unwrap();

    importer.update(&mut world, 0.016);
    let texture = *world.get_component::<Texture>(entity).unwrap();

    for _ in 0..5 {
        let report = importer.update(&mut world, 0.016);
        assert_eq!(report.groups_applied, 0);
    }
    assert_eq!(codec.calls(), 1);
    assert_eq!(importer.cache().stats().hits, 0);
    assert_eq!(world.get_component::<Texture>(entity), Some(&texture));
}

#[test]
fn bottom_row_of_source_lands_first() {
    let mut world = setup_world();
    let mut loader = MemoryLoader::new();
    loader.insert("quad", quad_png());
    let mut importer = TextureImportSystem::new(loader);
    let entity = spawn_texture_request(&mut world, TextureRequest::new("quad", 1.0)).unwrap();

    importer.update(&mut world, 0.016);
    let expected: Vec<Pixel> = [BLUE, YELLOW, RED, GREEN].map(Pixel::from).to_vec();
    assert_eq!(pixels(&world, entity), expected);
}

#[test]
fn missing_bytes_time_out_and_stay_not_found() {
    let mut world = setup_world();
    let mut importer = TextureImportSystem::new(MemoryLoader::new());
    let entity = spawn_texture_request(&mut world, TextureRequest::new("nowhere", 1.0)).unwrap();

    for _ in 0..3 {
        importer.update(&mut world, 0.25);
        assert_eq!(status(&world, entity), RequestStatus::Loading);
    }
    importer.update(&mut world, 0.25);
    assert_eq!(status(&world, entity), RequestStatus::NotFound);

    // Bytes showing up later do not revive the request.
    importer.loader_mut().insert("nowhere", quad_png());
    for _ in 0..4 {
        importer.update(&mut world, 0.25);
    }
    assert_eq!(status(&world, entity), RequestStatus::NotFound);
    assert!(!world.has_component::<Texture>(entity));
}

#[test]
fn late_bytes_load_with_only_failed_ticks_counted() {
    let mut world = setup_world();
    let mut importer = TextureImportSystem::new(MemoryLoader::new());
    let entity = spawn_texture_request(&mut world, TextureRequest::new("late", 1.0)).unwrap();

    for _ in 0..3 {
        importer.update(&mut world, 0.1);
    }
    importer.loader_mut().insert("late", quad_png());
    importer.update(&mut world, 0.1);

    let request = world.get_component::<TextureRequest>(entity).unwrap();
    assert_eq!(request.status, RequestStatus::Loaded);
    assert!((request.duration - 0.3).abs() < 1e-9);
}

#[test]
fn gradient_png_imports_bottom_up() {
    let mut world = setup_world();
    let mut loader = MemoryLoader::new();
    loader.insert("tex", GRADIENT_PNG.to_vec());
    let mut importer = TextureImportSystem::new(loader);
    let entity = spawn_texture_request(&mut world, TextureRequest::new("tex", 1.0)).unwrap();

    let mut ticks = 0;
    while status(&world, entity) != RequestStatus::Loaded {
        importer.update(&mut world, 0.016);
        ticks += 1;
        assert!(ticks < 100, "request never loaded");
    }

    let texture = *world.get_component::<Texture>(entity).unwrap();
    assert_eq!((texture.width, texture.height), (16, 9));
    assert_eq!(texture.version, 1);

    let buffer = pixels(&world, entity);
    assert_eq!(buffer.len(), 144);
    assert_eq!(buffer[0], Pixel::from(YELLOW));
    assert_eq!(buffer[15], Pixel::from(BLUE));
    assert_eq!(buffer[8 * 16], Pixel::new(0, 255, 5, 255));
    assert_eq!(buffer[143], Pixel::from(RED));

    let hue_at = |u: f32, v: f32| {
        let [r, g, b, _] = sample::evaluate_entity(&world, entity, u, v).unwrap();
        tessera_textures::pixel::hue_of([r, g, b])
    };
    assert!((hue_at(0.0, 0.0) - 1.0 / 6.0).abs() < 0.01);
    assert!((hue_at(1.0, 0.0) - 2.0 / 3.0).abs() < 0.01);
    assert!((hue_at(0.0, 1.0) - 1.0 / 3.0).abs() < 0.01);
    assert!(hue_at(1.0, 1.0).abs() < 0.01);
    assert!((hue_at(0.5, 0.5) - 0.5).abs() < 0.01);
}

// ---------------------------------------------------------------------------
// Re-imports and options
// ---------------------------------------------------------------------------

#[test]
fn resubmit_reimports_and_bumps_texture_version() {
    let mut world = setup_world();
    let mut loader = MemoryLoader::new();
    loader.insert("small", quad_png());
    loader.insert("wide", encode_png(3, 1, &[RED, RED, RED]));
    let mut importer = TextureImportSystem::new(loader);
    let entity = spawn_texture_request(&mut world, TextureRequest::new("small", 1.0)).unwrap();
    importer.update(&mut world, 0.016);

    world
        .get_component_mut::<TextureRequest>(entity)
        .unwrap()
        .resubmit("wide");
    importer.update(&mut world, 0.016);

    let request = world.get_component::<TextureRequest>(entity).unwrap();
    assert_eq!((request.status, request.version), (RequestStatus::Loaded, 1));
    let texture = world.get_component::<Texture>(entity).unwrap();
    assert_eq!((texture.width, texture.height, texture.version), (3, 1, 2));
    assert_eq!(pixels(&world, entity), vec![Pixel::from(RED); 3]);
}

#[test]
fn flip_y_and_default_share_one_decode() {
    let mut world = setup_world();
    let mut loader = MemoryLoader::new();
    loader.insert("quad", quad_png());
    let codec = CountingCodec::default();
    let mut importer =
        TextureImportSystem::with_codec(loader, ImportConfig::default(), codec.clone());

    let flipped = spawn_texture_request(&mut world, TextureRequest::new("quad", 1.0)).unwrap();
    let source_order = spawn_texture_request(
        &mut world,
        TextureRequest::new("quad", 1.0).with_flags(TextureFlags::FLIP_Y),
    )
    .unwrap();
    importer.update(&mut world, 0.016);

    assert_eq!(codec.calls(), 1);
    assert_eq!(
        pixels(&world, flipped),
        [BLUE, YELLOW, RED, GREEN].map(Pixel::from).to_vec()
    );
    assert_eq!(
        pixels(&world, source_order),
        [RED, GREEN, BLUE, YELLOW].map(Pixel::from).to_vec()
    );
}

#[test]
fn malformed_bytes_retry_until_timeout_by_default() {
    let mut world = setup_world();
    let mut loader = MemoryLoader::new();
    loader.insert("junk", b"not a png".to_vec());
    let mut importer = TextureImportSystem::new(loader);
    let entity = spawn_texture_request(&mut world, TextureRequest::new("junk", 0.5)).unwrap();

    importer.update(&mut world, 0.25);
    assert_eq!(status(&world, entity), RequestStatus::Loading);
    importer.update(&mut world, 0.25);
    assert_eq!(status(&world, entity), RequestStatus::NotFound);
    assert_eq!(importer.cache().stats().decode_failures, 2);
}

#[test]
fn world_data_sources_resolve_addresses() {
    let mut world = setup_world();
    world
        .spawn_with(DataSource::new("embedded", quad_png()))
        .unwrap();
    let mut importer = TextureImportSystem::new(WorldDataLoader);
    let entity = spawn_texture_request(&mut world, TextureRequest::new("embedded", 1.0)).unwrap();

    importer.update(&mut world, 0.016);
    assert_eq!(status(&world, entity), RequestStatus::Loaded);
}

#[test]
fn despawned_requester_does_not_break_the_tick() {
    let mut world = setup_world();
    let mut loader = MemoryLoader::new();
    loader.insert("tex", quad_png());
    let mut importer = TextureImportSystem::new(loader);
    let doomed = spawn_texture_request(&mut world, TextureRequest::new("tex", 1.0)).unwrap();
    let survivor = spawn_texture_request(&mut world, TextureRequest::new("tex", 1.0)).unwrap();

    let mut mutations = MutationBuffer::new();
    importer.run(&world, &mut mutations, 0.016);
    world.despawn(doomed).unwrap();
    let report = mutations.flush(&mut world);

    assert_eq!(report.groups_failed, 1);
    assert_eq!(report.groups_applied, 1);
    assert_eq!(status(&world, survivor), RequestStatus::Loaded);
}

// ---------------------------------------------------------------------------
// Eviction
// ---------------------------------------------------------------------------

#[test]
fn release_unreferenced_drops_images_nobody_asks_for() {
    let mut world = setup_world();
    let mut loader = MemoryLoader::new();
    loader.insert("a", quad_png());
    loader.insert("b", quad_png());
    let config = ImportConfig {
        eviction: EvictionPolicy::ReleaseUnreferenced,
        ..ImportConfig::default()
    };
    let mut importer = TextureImportSystem::with_config(loader, config);
    let a = spawn_texture_request(&mut world, TextureRequest::new("a", 1.0)).unwrap();
    spawn_texture_request(&mut world, TextureRequest::new("b", 1.0)).unwrap();

    importer.update(&mut world, 0.016);
    assert_eq!(importer.cache().len(), 2);

    world.remove_component::<TextureRequest>(a).unwrap();
    importer.update(&mut world, 0.016);
    assert!(!importer.cache().contains("a"));
    assert!(importer.cache().contains("b"));
}

#[test]
fn lru_capacity_bounds_the_cache() {
    let mut world = setup_world();
    let mut loader = MemoryLoader::new();
    for address in ["a", "b", "c"] {
        loader.insert(address, quad_png());
    }
    let config = ImportConfig {
        eviction: EvictionPolicy::Lru {
            capacity: NonZeroUsize::new(2).unwrap(),
        },
        ..ImportConfig::default()
    };
    let mut importer = TextureImportSystem::with_config(loader, config);
    for address in ["a", "b", "c"] {
        spawn_texture_request(&mut world, TextureRequest::new(address, 1.0)).unwrap();
    }

    importer.update(&mut world, 0.016);
    assert_eq!(importer.cache().len(), 2);
    assert_eq!(importer.cache().stats().evictions, 1);
}
