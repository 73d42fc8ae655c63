//! JSON snapshots of entities through the component capability table
//!
//! Component types opt in with [`JsonDirector::register`], which attaches a
//! serialize and a deserialize service to their metadata. The director then
//! works purely by component name and never names a Rust type:
//!
//! ```ignore
//! JsonDirector::register::<Position>(&mut scene.world_mut())?;
//! let doc = JsonDirector::serialize_entity(scene.world(), ship)?;
//! // {"Position": {"x": 1.0, "y": 2.0}}
//! ```
//!
//! No file layout is defined here; callers decide where documents live.

use ark_core::ecs::{Component, ComponentId, Entity, RegistryError, World, WorldError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::any::Any;
use thiserror::Error;

pub const SERIALIZE: &str = "json.serialize";
pub const DESERIALIZE: &str = "json.deserialize";

pub type SerializeFn = fn(&dyn Any) -> Result<Value, SnapshotError>;
/// Decodes a JSON value into a write that is applied later, so a document
/// is fully validated before any component changes.
pub type DeserializeFn = fn(&Value) -> Result<StagedWrite, SnapshotError>;
pub type StagedWrite = Box<dyn FnOnce(&mut dyn Any) -> Result<(), SnapshotError>>;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("entity {entity} is not alive")]
    StaleEntity { entity: Entity },

    #[error("component '{name}' is not registered")]
    UnknownComponent { name: String },

    #[error("component '{name}' has no JSON services")]
    NotSerializable { name: String },

    #[error("component '{name}' has no default constructor")]
    NotConstructible { name: String },

    #[error("world is inside a pass; restore after it ends")]
    Deferred,

    #[error("stored value is not a '{expected}'")]
    TypeMismatch { expected: &'static str },

    #[error("expected a JSON {expected}")]
    Malformed { expected: &'static str },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    World(#[from] WorldError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Stateless serializer driven by component metadata.
pub struct JsonDirector;

impl JsonDirector {
    /// Attach JSON services and a default constructor to `T`.
    pub fn register<T>(world: &mut World) -> Result<ComponentId, RegistryError>
    where
        T: Component + Serialize + DeserializeOwned + Default,
    {
        let builder = world
            .describe::<T>()?
            .constructible()
            .service(SERIALIZE, serialize::<T> as SerializeFn)
            .service(DESERIALIZE, deserialize::<T> as DeserializeFn);
        Ok(builder.id())
    }

    /// Object of `name -> value` for every component of `entity` that has
    /// JSON services. Others are skipped.
    pub fn serialize_entity(world: &World, entity: Entity) -> Result<Value, SnapshotError> {
        if !world.is_alive(entity) {
            return Err(SnapshotError::StaleEntity { entity });
        }

        let mut object = Map::new();
        let mut failure = None;
        world.for_each_component(entity, |component| {
            if failure.is_some() {
                return;
            }
            let Some(serialize) = component.meta().service::<SerializeFn>(SERIALIZE) else {
                tracing::trace!(component = component.name(), "skipped; no JSON services");
                return;
            };
            match serialize(component.value()) {
                Ok(value) => {
                    object.insert(component.name().to_string(), value);
                }
                Err(err) => failure = Some(err),
            }
        });

        match failure {
            Some(err) => Err(err),
            None => Ok(Value::Object(object)),
        }
    }

    /// Apply a document produced by [`JsonDirector::serialize_entity`].
    ///
    /// Every key is resolved and decoded before the entity is touched, so an
    /// error leaves it unchanged. Missing components are then
    /// default-constructed by name, so system membership updates through
    /// the normal insert path. Returns the number of components written.
    pub fn deserialize_into(
        world: &mut World,
        entity: Entity,
        document: &Value,
    ) -> Result<usize, SnapshotError> {
        let object = document
            .as_object()
            .ok_or(SnapshotError::Malformed { expected: "object" })?;
        if !world.is_alive(entity) {
            return Err(SnapshotError::StaleEntity { entity });
        }
        if world.is_deferring() {
            return Err(SnapshotError::Deferred);
        }

        let mut staged = Vec::with_capacity(object.len());
        for (name, value) in object {
            let meta = world
                .registry()
                .meta_by_name(name)
                .ok_or_else(|| SnapshotError::UnknownComponent { name: name.clone() })?;
            let deserialize = meta
                .service::<DeserializeFn>(DESERIALIZE)
                .ok_or_else(|| SnapshotError::NotSerializable { name: name.clone() })?;
            let id = meta.id();
            if !world.has_id(entity, id) && !meta.is_constructible() {
                return Err(SnapshotError::NotConstructible { name: name.clone() });
            }
            staged.push((name, id, deserialize(value)?));
        }

        for (name, id, write) in staged {
            if !world.has_id(entity, id) {
                world.insert_default_by_name(entity, name)?;
            }
            let target = world
                .get_any_mut(entity, id)
                .ok_or(SnapshotError::StaleEntity { entity })?;
            write(target)?;
        }
        Ok(object.len())
    }

    /// Every live entity in creation order as `[{"entity": bits, "components": {..}}]`.
    pub fn snapshot_world(world: &World) -> Result<Value, SnapshotError> {
        let entries = world
            .entities()
            .iter()
            .map(|&entity| {
                let components = Self::serialize_entity(world, entity)?;
                let mut entry = Map::new();
                entry.insert("entity".to_string(), Value::from(entity.to_bits()));
                entry.insert("components".to_string(), components);
                Ok(Value::Object(entry))
            })
            .collect::<Result<Vec<_>, SnapshotError>>()?;
        Ok(Value::Array(entries))
    }

    /// Spawn one fresh entity per entry of a [`JsonDirector::snapshot_world`]
    /// document. Saved handles are not reused. On error every entity spawned
    /// so far is despawned again.
    pub fn restore_world(world: &mut World, document: &Value) -> Result<Vec<Entity>, SnapshotError> {
        let entries = document
            .as_array()
            .ok_or(SnapshotError::Malformed { expected: "array" })?;
        if world.is_deferring() {
            return Err(SnapshotError::Deferred);
        }

        let mut spawned = Vec::with_capacity(entries.len());
        for entry in entries {
            if let Err(err) = Self::restore_entry(world, entry, &mut spawned) {
                for entity in spawned {
                    world.despawn(entity);
                }
                tracing::warn!(%err, "snapshot restore rolled back");
                return Err(err);
            }
        }
        tracing::debug!(count = spawned.len(), "world restored from snapshot");
        Ok(spawned)
    }

    fn restore_entry(
        world: &mut World,
        entry: &Value,
        spawned: &mut Vec<Entity>,
    ) -> Result<(), SnapshotError> {
        let components = entry
            .get("components")
            .ok_or(SnapshotError::Malformed { expected: "components object" })?;
        let entity = world.spawn();
        spawned.push(entity);
        Self::deserialize_into(world, entity, components)?;
        Ok(())
    }
}

fn serialize<T: Component + Serialize>(value: &dyn Any) -> Result<Value, SnapshotError> {
    let value = value
        .downcast_ref::<T>()
        .ok_or(SnapshotError::TypeMismatch { expected: T::name() })?;
    Ok(serde_json::to_value(value)?)
}

fn deserialize<T: Component + DeserializeOwned>(value: &Value) -> Result<StagedWrite, SnapshotError> {
    let decoded: T = serde_json::from_value(value.clone())?;
    Ok(Box::new(move |target: &mut dyn Any| {
        let target = target
            .downcast_mut::<T>()
            .ok_or(SnapshotError::TypeMismatch { expected: T::name() })?;
        *target = decoded;
        Ok(())
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Position {
        x: f32,
        y: f32,
    }

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Health(i32);

    struct Opaque;

    ark_core::component!(Position, Health, Opaque);

    fn world() -> World {
        let mut world = World::new();
        JsonDirector::register::<Position>(&mut world).unwrap();
        JsonDirector::register::<Health>(&mut world).unwrap();
        world
    }

    #[test]
    fn serializes_only_components_with_services() {
        let mut world = world();
        let entity = world.spawn();
        world.insert(entity, Position { x: 1.0, y: 2.0 }).unwrap();
        world.insert(entity, Opaque).unwrap();

        let doc = JsonDirector::serialize_entity(&world, entity).unwrap();
        assert_eq!(doc, json!({ "Position": { "x": 1.0, "y": 2.0 } }));
    }

    #[test]
    fn deserialize_creates_missing_components() {
        let mut world = world();
        let entity = world.spawn();
        world.insert(entity, Health(3)).unwrap();

        let doc = json!({ "Position": { "x": 4.0, "y": 5.0 }, "Health": 9 });
        let written = JsonDirector::deserialize_into(&mut world, entity, &doc).unwrap();

        assert_eq!(written, 2);
        assert_eq!(world.get::<Position>(entity), Some(&Position { x: 4.0, y: 5.0 }));
        assert_eq!(world.get::<Health>(entity), Some(&Health(9)));
    }

    #[test]
    fn unknown_and_opaque_components_are_errors() {
        let mut world = world();
        world.register::<Opaque>().unwrap();
        let entity = world.spawn();

        let unknown = JsonDirector::deserialize_into(&mut world, entity, &json!({ "Mana": 1 }));
        assert!(matches!(unknown, Err(SnapshotError::UnknownComponent { .. })));

        let opaque = JsonDirector::deserialize_into(&mut world, entity, &json!({ "Opaque": null }));
        assert!(matches!(opaque, Err(SnapshotError::NotSerializable { .. })));
    }

    #[test]
    fn failed_document_leaves_the_entity_untouched() {
        let mut world = world();
        let entity = world.spawn();
        world.insert(entity, Position { x: 1.0, y: 1.0 }).unwrap();

        let unknown = json!({ "Health": 9, "Mana": 1 });
        assert!(JsonDirector::deserialize_into(&mut world, entity, &unknown).is_err());
        assert!(!world.has::<Health>(entity));

        let bad_value = json!({ "Health": 9, "Position": { "x": "left" } });
        assert!(matches!(
            JsonDirector::deserialize_into(&mut world, entity, &bad_value),
            Err(SnapshotError::Json(_))
        ));
        assert!(!world.has::<Health>(entity));
        assert_eq!(world.get::<Position>(entity), Some(&Position { x: 1.0, y: 1.0 }));
    }

    #[test]
    fn deserializing_inside_a_pass_is_rejected() {
        let mut world = world();
        let entity = world.spawn();
        world.insert(entity, Health(1)).unwrap();
        let everyone = world.query(ark_core::ecs::ComponentMask::EMPTY);

        let mut outcome = None;
        everyone.for_each_mut(&mut world, |world, entity| {
            outcome = Some(JsonDirector::deserialize_into(world, entity, &json!({ "Health": 5 })));
        });

        assert!(matches!(outcome, Some(Err(SnapshotError::Deferred))));
        assert_eq!(world.get::<Health>(entity), Some(&Health(1)));
    }

    #[test]
    fn failed_restore_despawns_what_it_spawned() {
        let mut world = world();
        world.spawn();
        let doc = json!([
            { "entity": 0, "components": { "Health": 2 } },
            { "entity": 1, "components": { "Mana": 3 } },
        ]);

        let restored = JsonDirector::restore_world(&mut world, &doc);
        assert!(matches!(restored, Err(SnapshotError::UnknownComponent { .. })));
        assert_eq!(world.len(), 1);
    }

    #[test]
    fn world_snapshot_restores_into_fresh_entities() {
        let mut source = world();
        let a = source.spawn();
        source.insert(a, Position { x: 1.0, y: 1.0 }).unwrap();
        let b = source.spawn();
        source.insert(b, Health(7)).unwrap();

        let doc = JsonDirector::snapshot_world(&source).unwrap();

        let mut target = world();
        let restored = JsonDirector::restore_world(&mut target, &doc).unwrap();
        assert_eq!(restored.len(), 2);
        assert_eq!(
            target.get::<Position>(restored[0]),
            Some(&Position { x: 1.0, y: 1.0 })
        );
        assert_eq!(target.get::<Health>(restored[1]), Some(&Health(7)));
        assert!(!target.has::<Health>(restored[0]));
    }
}
