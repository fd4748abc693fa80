//! Import a PNG through the tick loop and print what landed on the entity.
//!
//! Run with:
//!   cargo run --example import_png -p tessera-engine -- [DIR ADDRESS]
//!
//! With no arguments a generated 16x9 gradient is imported from memory.
//! Otherwise `ADDRESS` is resolved as a file under `DIR`. Set `RUST_LOG=debug`
//! to watch the request move through its states.

use std::io::Cursor;

use anyhow::{bail, Context};
use image::{ImageBuffer, ImageFormat, Rgba};
use tessera_engine::prelude::*;
use tessera_textures::prelude::*;
use tessera_textures::sample;

fn gradient_png() -> anyhow::Result<Vec<u8>> {
    let img = ImageBuffer::from_fn(16, 9, |x, y| {
        Rgba([(x * 17) as u8, (y * 31) as u8, 200, 255])
    });
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .context("encoding demo image")?;
    Ok(bytes)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (loader, address) = match args.as_slice() {
        [] => {
            let mut memory = MemoryLoader::new();
            memory.insert("demo/gradient", gradient_png()?);
            (ChainLoader::new().with(memory), "demo/gradient".to_owned())
        }
        [dir, address] => (
            ChainLoader::new().with(DirectoryLoader::new(dir)),
            address.clone(),
        ),
        _ => bail!("usage: import_png [DIR ADDRESS]"),
    };

    let mut world = World::new();
    register_texture_types(&mut world);
    let mut tick_loop = TickLoop::new(world, TickConfig::default());

    let importer = TextureImportSystem::new(loader);
    let entity = spawn_texture_request(tick_loop.world_mut(), importer.request(address.as_str()))?;
    tick_loop.add_system("texture_import", importer);

    loop {
        tick_loop.tick();
        let request = tick_loop
            .world()
            .get_component::<TextureRequest>(entity)
            .context("request component vanished")?;
        match request.status {
            RequestStatus::Loaded => break,
            RequestStatus::NotFound => bail!(
                "'{address}' was not found within {}s",
                request.timeout
            ),
            RequestStatus::Submitted | RequestStatus::Loading => {}
        }
    }

    let world = tick_loop.world();
    let texture = world
        .get_component::<Texture>(entity)
        .context("texture missing after load")?;
    println!(
        "{address}: {}x{} (version {}) after {} ticks",
        texture.width,
        texture.height,
        texture.version,
        tick_loop.tick_count()
    );
    for (label, u, v) in [
        ("bottom-left", 0.0, 0.0),
        ("bottom-right", 1.0, 0.0),
        ("top-left", 0.0, 1.0),
        ("top-right", 1.0, 1.0),
        ("centre", 0.5, 0.5),
    ] {
        let [r, g, b, a] = sample::evaluate_entity(world, entity, u, v)
            .context("pixels missing after load")?;
        println!("  {label:>12}: rgba({r:.2}, {g:.2}, {b:.2}, {a:.2})");
    }
    Ok(())
}
