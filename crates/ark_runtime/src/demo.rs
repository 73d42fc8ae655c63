//! Demo content driven by the runtime: emitters spawn short-lived particles
//! that drift until their lifetime runs out.

use ark_core::glam::Vec2;
use ark_core::prelude::*;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position(pub Vec2);

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity(pub Vec2);

/// Frames left before the entity is despawned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Lifetime(pub u32);

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Emitter {
    pub every: u32,
    pub burst: u32,
    pub particle_life: u32,
}

component!(Position, Velocity, Lifetime, Emitter);

/// Posted when a particle expires; payload is the expired entity.
pub const PARTICLE_EXPIRED: MessageId = MessageId(1);

/// Immediate events fed by the host.
#[derive(Debug, Clone, Copy)]
pub enum RuntimeEvent {
    Gust(Vec2),
}

pub struct MovementSystem;

impl System for MovementSystem {
    fn init(&mut self, setup: &mut SystemSetup<'_>) {
        setup.require_set::<(Position, Velocity)>();
    }

    fn update(&mut self, ctx: &mut SystemContext<'_>) {
        let dt = ctx.clock().delta_secs();
        ctx.for_each(|world, entity| {
            let Some(&Velocity(velocity)) = world.get::<Velocity>(entity) else {
                return;
            };
            if let Some(Position(position)) = world.get_mut::<Position>(entity) {
                *position += velocity * dt;
            }
        });
    }

    fn handle_event(&mut self, ctx: &mut SystemContext<'_>, event: &dyn Any) {
        let Some(RuntimeEvent::Gust(push)) = event.downcast_ref::<RuntimeEvent>() else {
            return;
        };
        ctx.for_each(|world, entity| {
            if let Some(Velocity(velocity)) = world.get_mut::<Velocity>(entity) {
                *velocity += *push;
            }
        });
    }
}

pub struct LifetimeSystem;

impl System for LifetimeSystem {
    fn init(&mut self, setup: &mut SystemSetup<'_>) {
        setup.require::<Lifetime>();
    }

    fn update(&mut self, ctx: &mut SystemContext<'_>) {
        let mut expired = Vec::new();
        ctx.for_each(|world, entity| {
            let done = match world.get_mut::<Lifetime>(entity) {
                Some(Lifetime(left)) => {
                    *left = left.saturating_sub(1);
                    *left == 0
                }
                None => false,
            };
            if done {
                world.despawn(entity);
                expired.push(entity);
            }
        });
        for entity in expired {
            ctx.post_message(PARTICLE_EXPIRED, entity);
        }
    }
}

#[derive(Default)]
pub struct EmitterSystem {
    emitted: u64,
    expired: u64,
}

impl EmitterSystem {
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    pub fn expired(&self) -> u64 {
        self.expired
    }
}

impl System for EmitterSystem {
    fn init(&mut self, setup: &mut SystemSetup<'_>) {
        setup.require::<Emitter>().require::<Position>();
    }

    fn update(&mut self, ctx: &mut SystemContext<'_>) {
        let frame = ctx.clock().frame();
        let mut emitted = 0;
        ctx.for_each(|world, entity| {
            let (Some(&emitter), Some(&Position(origin))) =
                (world.get::<Emitter>(entity), world.get::<Position>(entity))
            else {
                return;
            };
            if emitter.every == 0 || frame % u64::from(emitter.every) != 0 {
                return;
            }
            for i in 0..emitter.burst {
                let spread = i as f32 * std::f32::consts::TAU / emitter.burst as f32;
                let angle = frame as f32 * 0.37 + spread;
                let particle = world.spawn();
                let inserted = world
                    .insert(particle, Position(origin))
                    .and_then(|_| world.insert(particle, Velocity(Vec2::from_angle(angle) * 4.0)))
                    .and_then(|_| world.insert(particle, Lifetime(emitter.particle_life)));
                match inserted {
                    Ok(()) => emitted += 1,
                    Err(err) => tracing::warn!(%err, "failed to build particle"),
                }
            }
        });
        self.emitted += emitted;
    }

    fn handle_message(&mut self, _ctx: &mut SystemContext<'_>, message: &Message) {
        if message.id() == PARTICLE_EXPIRED && message.data::<Entity>().is_some() {
            self.expired += 1;
        }
    }
}

/// Text "surface" renderer: writes one line per frame describing the scene.
#[derive(Default)]
pub struct StatsOverlay {
    tracked: usize,
}

impl System for StatsOverlay {
    fn init(&mut self, setup: &mut SystemSetup<'_>) {
        setup.require::<Position>();
    }

    fn on_entity_added(&mut self, _world: &World, _entity: Entity) {
        self.tracked += 1;
    }

    fn on_entity_removed(&mut self, _world: &World, _entity: Entity) {
        self.tracked = self.tracked.saturating_sub(1);
    }

    fn renderer(&mut self) -> Option<&mut dyn Renderer> {
        Some(self)
    }
}

impl Renderer for StatsOverlay {
    fn render(&mut self, world: &World, target: &mut dyn Any) {
        let Some(surface) = target.downcast_mut::<String>() else {
            return;
        };
        surface.clear();
        let _ = write!(
            surface,
            "entities={} positioned={} component_types={}",
            world.len(),
            self.tracked,
            world.registry().len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene() -> Scene {
        let mut scene = Scene::new();
        scene.add_system(EmitterSystem::default());
        scene.add_system(MovementSystem);
        scene.add_system(LifetimeSystem);
        scene.add_system(StatsOverlay::default());
        scene
    }

    #[test]
    fn particles_are_emitted_and_expire() {
        let mut scene = scene();
        let emitter = scene.spawn();
        scene.insert(emitter, Position(Vec2::ZERO)).unwrap();
        scene
            .insert(
                emitter,
                Emitter {
                    every: 10,
                    burst: 3,
                    particle_life: 2,
                },
            )
            .unwrap();

        scene.frame();
        assert_eq!(scene.world().len(), 4);
        assert_eq!(scene.system::<EmitterSystem>().unwrap().emitted(), 3);

        for _ in 0..4 {
            scene.frame();
        }
        assert_eq!(scene.world().len(), 1);
        assert_eq!(scene.system::<EmitterSystem>().unwrap().expired(), 3);
    }

    #[test]
    fn gust_changes_velocity() {
        let mut scene = scene();
        let particle = scene.spawn();
        scene.insert(particle, Position(Vec2::ZERO)).unwrap();
        scene.insert(particle, Velocity(Vec2::X)).unwrap();

        scene.handle_event(&RuntimeEvent::Gust(Vec2::Y));
        assert_eq!(
            scene.world().get::<Velocity>(particle),
            Some(&Velocity(Vec2::new(1.0, 1.0)))
        );
    }

    #[test]
    fn overlay_renders_into_a_string_surface() {
        let mut scene = scene();
        let entity = scene.spawn();
        scene.insert(entity, Position(Vec2::ONE)).unwrap();

        let mut surface = String::new();
        scene.render(&mut surface);
        assert!(surface.contains("positioned=1"));
    }
}
