//! Ark Engine Runtime
//!
//! Boots logging and settings, builds the demo scene and drives it at a
//! fixed tick rate.
//!
//! Usage: `ark [settings.json]`

mod demo;

use anyhow::{Context, Result};
use ark_core::ecs::Scene;
use ark_core::glam::Vec2;
use ark_core::time::FrameClock;
use ark_metrics::FrameTimer;
use ark_services::{JsonDirector, RuntimeSettings};
use demo::{
    Emitter, EmitterSystem, LifetimeSystem, MovementSystem, Position, RuntimeEvent, StatsOverlay,
    Velocity,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let settings = match std::env::args().nth(1) {
        Some(path) => RuntimeSettings::load(&path)
            .with_context(|| format!("loading settings from {path}"))?,
        None => RuntimeSettings::default(),
    };

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.logging.filter))
        .context("invalid log filter")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("Ark Engine v{}", ark_core::VERSION);
    tracing::debug!(?settings, "runtime settings");

    let mut scene = build_scene(&settings)?;
    run(&mut scene, &settings)?;

    let emitter = scene.system::<EmitterSystem>();
    tracing::info!(
        frames = scene.clock().frame(),
        entities = scene.world().len(),
        emitted = emitter.map_or(0, EmitterSystem::emitted),
        expired = emitter.map_or(0, EmitterSystem::expired),
        "runtime finished"
    );
    Ok(())
}

fn build_scene(settings: &RuntimeSettings) -> Result<Scene> {
    let mut scene = Scene::with_clock(FrameClock::new(settings.frame.tick_rate_hz));

    {
        let mut world = scene.world_mut();
        JsonDirector::register::<Position>(&mut world)?;
        JsonDirector::register::<Velocity>(&mut world)?;
        JsonDirector::register::<Emitter>(&mut world)?;
        world
            .describe::<Emitter>()?
            .field::<u32>("every")
            .field::<u32>("burst")
            .field::<u32>("particle_life");
    }

    scene.add_system(EmitterSystem::default());
    scene.add_system(MovementSystem);
    scene.add_system(LifetimeSystem);
    scene.add_system(StatsOverlay::default());

    for (origin, every) in [(Vec2::ZERO, 30), (Vec2::new(20.0, 0.0), 45)] {
        let emitter = scene.spawn();
        scene.insert(emitter, Position(origin))?;
        scene.insert(
            emitter,
            Emitter {
                every,
                burst: 8,
                particle_life: 90,
            },
        )?;
    }

    Ok(scene)
}

fn run(scene: &mut Scene, settings: &RuntimeSettings) -> Result<()> {
    let mut timer = FrameTimer::new(120);
    let mut overlay = String::new();
    let report_every = settings.metrics.report_every;

    loop {
        let frame = scene.clock().frame();
        if settings.frame.max_frames.is_some_and(|max| frame >= max) || scene.world().is_empty() {
            break;
        }

        timer.begin();
        if frame > 0 && frame % 240 == 0 {
            scene.handle_event(&RuntimeEvent::Gust(Vec2::new(0.0, 1.5)));
        }
        scene.frame();
        scene.render(&mut overlay);
        timer.end();

        tracing::trace!(frame, "{overlay}");
        if report_every > 0 && frame % report_every == 0 {
            report(scene, &timer, &overlay)?;
        }
    }
    Ok(())
}

fn report(scene: &Scene, timer: &FrameTimer, overlay: &str) -> Result<()> {
    tracing::info!(
        fps = format_args!("{:.1}", timer.fps()),
        frame_ms = format_args!("{:.3}", timer.frame_time_ms()),
        peak_ms = format_args!("{:.3}", timer.peak_frame_time_ms()),
        "{overlay}"
    );

    for (name, value) in scene.world().counters().iter() {
        tracing::debug!(counter = name, value, "structural changes");
    }
    for (name, stats) in scene.systems().profiler().iter() {
        tracing::debug!(
            system = name,
            calls = stats.calls,
            average = ?stats.average(),
            last = ?stats.last,
            "dispatch"
        );
    }

    if let Some(&first) = scene.world().entities().first() {
        let snapshot = JsonDirector::serialize_entity(scene.world(), first)?;
        tracing::debug!(entity = %first, %snapshot, "snapshot");
    }
    Ok(())
}
