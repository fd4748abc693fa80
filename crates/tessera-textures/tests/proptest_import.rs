//! Property tests for the import driver.
//!
//! A tiny raw codec stands in for PNG so images of arbitrary size can be
//! generated directly as bytes.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use proptest::prelude::*;
use tessera_ecs::prelude::*;
use tessera_textures::prelude::*;

/// `[width, height, rgba...]`, counting decodes.
#[derive(Clone, Default)]
struct RawCodec {
    calls: Arc<AtomicUsize>,
}

impl ImageCodec for RawCodec {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, TextureError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let [w, h, rgba @ ..] = bytes else {
            return Err(TextureError::Malformed("missing header".to_owned()));
        };
        let image = DecodedImage {
            width: *w as u32,
            height: *h as u32,
            rgba: rgba.to_vec(),
        };
        image.validate()?;
        Ok(image)
    }
}

fn raw_image(width: u8, height: u8, seed: u8) -> Vec<u8> {
    let len = width as usize * height as usize * 4;
    let mut bytes = vec![width, height];
    bytes.extend((0..len).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)));
    bytes
}

fn setup_world() -> World {
    let mut world = World::new();
    register_texture_types(&mut world);
    world
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// However requests are spread over addresses, each address decodes once
    /// and every requester of it receives the same pixels.
    #[test]
    fn each_address_decodes_once(
        picks in prop::collection::vec(0..4usize, 1..32),
        sizes in prop::collection::vec((0..6u8, 0..6u8), 4),
    ) {
        let addresses = ["a", "b", "c", "d"];
        let mut loader = MemoryLoader::new();
        for (i, &(w, h)) in sizes.iter().enumerate() {
            loader.insert(addresses[i], raw_image(w, h, i as u8));
        }
        let codec = RawCodec::default();
        let mut importer =
            TextureImportSystem::with_codec(loader, ImportConfig::default(), codec.clone());

        let mut world = setup_world();
        let requests: Vec<(usize, EntityId)> = picks
            .iter()
            .map(|&pick| {
                let request = TextureRequest::new(addresses[pick], 1.0);
                let entity = spawn_texture_request(&mut world, request).unwrap();
                (pick, entity)
            })
            .collect();

        importer.update(&mut world, 0.016);
        importer.update(&mut world, 0.016);

        let mut distinct = picks.clone();
        distinct.sort_unstable();
        distinct.dedup();
        prop_assert_eq!(codec.calls.load(Ordering::SeqCst), distinct.len());

        for &(pick, entity) in &requests {
            let (w, h) = sizes[pick];
            let texture = world.get_component::<Texture>(entity).unwrap();
            prop_assert_eq!((texture.width, texture.height), (w as u32, h as u32));
            let pixels = world.get_array::<Pixel>(entity).unwrap();
            prop_assert_eq!(pixels.len(), w as usize * h as usize);

            let first = requests.iter().find(|(p, _)| *p == pick).unwrap().1;
            prop_assert_eq!(pixels, world.get_array::<Pixel>(first).unwrap());
        }
    }

    /// A request that never finds bytes reaches `NotFound` on exactly the
    /// tick its accumulated time crosses the timeout.
    #[test]
    fn timeout_fires_on_the_crossing_tick(
        timeout in 0.05f64..2.0,
        dt in 0.01f64..0.5,
    ) {
        let mut importer = TextureImportSystem::new(MemoryLoader::new());
        let mut world = setup_world();
        let entity =
            spawn_texture_request(&mut world, TextureRequest::new("missing", timeout)).unwrap();

        let mut elapsed = 0.0;
        let mut previous = 0.0;
        loop {
            importer.update(&mut world, dt);
            elapsed += dt;
            let request = world.get_component::<TextureRequest>(entity).unwrap();
            prop_assert!((request.duration - elapsed).abs() < 1e-9);
            if request.status == RequestStatus::NotFound {
                prop_assert!(request.duration >= timeout);
                prop_assert!(previous < timeout);
                break;
            }
            prop_assert_eq!(request.status, RequestStatus::Loading);
            previous = request.duration;
        }

        importer.update(&mut world, dt);
        let request = world.get_component::<TextureRequest>(entity).unwrap();
        prop_assert_eq!(request.status, RequestStatus::NotFound);
        prop_assert!((request.duration - elapsed).abs() < 1e-9);
    }
}
