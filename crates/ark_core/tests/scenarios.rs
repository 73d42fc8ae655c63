use ark_core::ecs::{Entity, RegistryError, Scene, System, SystemContext, SystemSetup, World};
use ark_core::component;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Position {
    x: f32,
    y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Velocity {
    dx: f32,
    dy: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Health(i32);

component!(Position, Velocity, Health);

#[derive(Default)]
struct Movement {
    visits: usize,
}

impl System for Movement {
    fn init(&mut self, setup: &mut SystemSetup<'_>) {
        setup.require::<Position>().require::<Velocity>();
    }

    fn update(&mut self, ctx: &mut SystemContext<'_>) {
        ctx.for_each(|world, entity| {
            let Some(&velocity) = world.get::<Velocity>(entity) else {
                return;
            };
            if let Some(position) = world.get_mut::<Position>(entity) {
                position.x += velocity.dx;
                position.y += velocity.dy;
            }
        });
        self.visits += ctx.entities().len();
    }
}

#[test]
fn movement_only_touches_matching_entities() {
    let mut scene = Scene::new();
    scene.add_system(Movement::default());

    let mover = scene.spawn();
    scene.insert(mover, Position { x: 0.0, y: 0.0 }).unwrap();
    scene.insert(mover, Velocity { dx: 1.0, dy: 2.0 }).unwrap();

    let statue = scene.spawn();
    scene.insert(statue, Position { x: 5.0, y: 5.0 }).unwrap();

    scene.frame();

    assert_eq!(
        scene.world().get::<Position>(mover),
        Some(&Position { x: 1.0, y: 2.0 })
    );
    assert_eq!(
        scene.world().get::<Position>(statue),
        Some(&Position { x: 5.0, y: 5.0 })
    );
    assert_eq!(scene.system::<Movement>().unwrap().visits, 1);

    scene.remove::<Velocity>(mover).unwrap();
    scene.frame();
    assert_eq!(
        scene.world().get::<Position>(mover),
        Some(&Position { x: 1.0, y: 2.0 })
    );
    assert_eq!(scene.system::<Movement>().unwrap().visits, 1);
}

#[test]
fn health_query_fires_one_removal_per_observer() {
    let mut world = World::new();
    let entities: Vec<Entity> = (0..3).map(|_| world.spawn()).collect();
    for &entity in &entities {
        world.insert(entity, Health(100)).unwrap();
    }

    let query = world.query_for::<(Health,)>().unwrap();
    let removed = Rc::new(RefCell::new(Vec::new()));
    for observer in 0..2 {
        let removed = removed.clone();
        query.on_remove(move |entity| removed.borrow_mut().push((observer, entity)));
    }

    world.despawn(entities[1]);

    assert_eq!(query.entities(), vec![entities[0], entities[2]]);
    assert_eq!(
        *removed.borrow(),
        vec![(0, entities[1]), (1, entities[1])]
    );
}

#[test]
fn membership_matches_mask_after_every_change() {
    let mut scene = Scene::new();
    scene.add_system(Movement::default());
    let entity = scene.spawn();

    let steps: [fn(&mut Scene, Entity); 5] = [
        |s, e| s.insert(e, Position { x: 0.0, y: 0.0 }).map(drop).unwrap(),
        |s, e| s.insert(e, Velocity { dx: 0.0, dy: 0.0 }).map(drop).unwrap(),
        |s, e| s.insert(e, Health(1)).map(drop).unwrap(),
        |s, e| s.remove::<Position>(e).map(drop).unwrap(),
        |s, e| s.insert(e, Position { x: 1.0, y: 1.0 }).map(drop).unwrap(),
    ];

    for step in steps {
        step(&mut scene, entity);
        let required = scene.systems().mask_of::<Movement>().unwrap();
        let expected = scene
            .world()
            .mask_of(entity)
            .is_some_and(|mask| mask.contains_all(required));
        let listed = scene.systems().entities_of::<Movement>().contains(&entity);
        assert_eq!(listed, expected);
    }
}

#[test]
fn stale_handles_are_rejected_after_recycling() {
    let mut world = World::new();
    let first = world.spawn();
    world.despawn(first);
    let second = world.spawn();

    assert_eq!(first.index(), second.index());
    assert!(world.get::<Health>(first).is_none());
    assert!(world.insert(first, Health(1)).is_err());
    assert!(world.insert(second, Health(1)).is_ok());
    assert!(Entity::from_bits(second.to_bits()) == second);
}

#[test]
fn query_built_before_registration_stays_consistent() {
    let mut world = World::new();
    let query = world.query_for::<(Position, Velocity)>().unwrap();
    assert!(query.is_empty());

    let entity = world.spawn();
    world.insert(entity, Velocity { dx: 0.0, dy: 1.0 }).unwrap();
    world.insert(entity, Position { x: 0.0, y: 0.0 }).unwrap();
    assert_eq!(query.entities(), vec![entity]);
}

#[test]
fn registry_errors_are_typed() {
    let mut world = World::new();
    let id = world.register::<Health>().unwrap();
    let missing = world.registry().get::<Health>(id, 4);
    assert!(matches!(missing, Err(RegistryError::SlotOutOfRange { slot: 4, .. })));
}
