use std::any::Any;
use std::fmt::Debug;

use thiserror::Error;
use tracing::{debug, warn};

use crate::message::{opcode, Message};
use crate::surface::DrawSurface;
use crate::world::{EntityId, EntityWorld};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FlowError {
    #[error("module {module} finished with result {result}, which has no transition")]
    UnhandledResult { module: String, result: u32 },
}

/// Base module fields: the single active child and its exit result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Module {
    pub child: Option<EntityId>,
    pub module_result: u32,
    pub done: bool,
}

pub trait ModuleClass: Any + Sized {
    fn module(&self) -> &Module;
    fn module_mut(&mut self) -> &mut Module;

    /// Bound as the update handler; usually `update_child` plus the
    /// module's transition rules.
    fn update(world: &mut EntityWorld, id: EntityId);

    /// Messages not consumed by the base module and not forwarded.
    fn handle_message(_world: &mut EntityWorld, _id: EntityId, _message: &Message) -> u32 {
        0
    }
}

pub fn module_ref<C: ModuleClass>(world: &EntityWorld, id: EntityId) -> Option<&Module> {
    world.data::<C>(id).map(C::module)
}

pub fn module_mut<C: ModuleClass>(world: &mut EntityWorld, id: EntityId) -> Option<&mut Module> {
    world.data_mut::<C>(id).map(C::module_mut)
}

pub fn spawn_module<C: ModuleClass>(world: &mut EntityWorld, parent: Option<EntityId>, data: C) -> EntityId {
    let id = world.spawn(parent, data);
    world.set_update_handler(id, Some(C::update));
    world.set_message_handler(id, Some(module_message::<C>));
    world.set_draw_handler(id, Some(module_draw::<C>));
    id
}

pub fn module_message<C: ModuleClass>(world: &mut EntityWorld, id: EntityId, message: &Message) -> u32 {
    match message.num {
        opcode::LEAVE_MODULE => {
            if let Some(module) = module_mut::<C>(world, id) {
                module.module_result = message.param.as_integer();
                module.done = true;
            }
            0
        }
        opcode::PRELOAD_HINT | opcode::PRELOAD_RELEASE | opcode::PRELOAD_SCENE => 0,
        _ => {
            let child = module_ref::<C>(world, id).and_then(|module| module.child);
            match child {
                Some(child) if world.parent(id) == Some(message.sender) => {
                    world.send_message(message.sender, child, message.num, message.param)
                }
                _ => C::handle_message(world, id, message),
            }
        }
    }
}

pub fn module_draw<C: ModuleClass>(world: &EntityWorld, id: EntityId, surface: &mut dyn DrawSurface) {
    if let Some(child) = module_ref::<C>(world, id).and_then(|module| module.child) {
        world.draw_entity(child, surface);
    }
}

/// Replaces the active child with the one `build` spawns under `id`, then
/// ticks it once so it is fully set up before the next frame.
pub fn create_child<C: ModuleClass>(
    world: &mut EntityWorld,
    id: EntityId,
    build: impl FnOnce(&mut EntityWorld, EntityId) -> EntityId,
) -> EntityId {
    if let Some(old) = module_mut::<C>(world, id).and_then(|module| module.child.take()) {
        world.destroy(old);
    }
    let child = build(world, id);
    if let Some(module) = module_mut::<C>(world, id) {
        module.child = Some(child);
        module.done = false;
    }
    world.update_entity(child);
    child
}

/// Ticks the active child. Returns false exactly once after the child has
/// left, by which point it is destroyed and `module_result` holds its exit.
pub fn update_child<C: ModuleClass>(world: &mut EntityWorld, id: EntityId) -> bool {
    let Some(child) = module_ref::<C>(world, id).and_then(|module| module.child) else {
        return true;
    };
    world.update_entity(child);

    let finished = match module_mut::<C>(world, id) {
        Some(module) if module.done => {
            module.done = false;
            module.child = None;
            Some(module.module_result)
        }
        _ => None,
    };
    match finished {
        Some(result) => {
            world.destroy(child);
            debug!(module = %id, child = %child, result, "child_finished");
            false
        }
        None => true,
    }
}

/// Reports `result` to the parent module.
pub fn leave_module(world: &mut EntityWorld, id: EntityId, result: u32) {
    match world.parent(id) {
        Some(parent) => {
            world.send_message(id, parent, opcode::LEAVE_MODULE, result);
        }
        None => warn!(module = %id, result, "leave_without_parent"),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildSpec<K> {
    pub module: K,
    pub which: i32,
}

/// One row of a transition table; `result: None` matches any result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionArm<K> {
    pub from: K,
    pub result: Option<u32>,
    pub to: ChildSpec<K>,
}

/// Table-driven replacement for per-module result switches. Arms are
/// tried in order.
#[derive(Debug, Clone, Copy)]
pub struct ModuleTable<K: 'static> {
    arms: &'static [TransitionArm<K>],
}

impl<K: Copy + PartialEq + Debug + 'static> ModuleTable<K> {
    pub const fn new(arms: &'static [TransitionArm<K>]) -> Self {
        Self { arms }
    }

    pub fn arms(&self) -> &'static [TransitionArm<K>] {
        self.arms
    }

    pub fn next(&self, from: K, result: u32) -> Result<ChildSpec<K>, FlowError> {
        self.arms
            .iter()
            .find(|arm| arm.from == from && arm.result.map_or(true, |expected| expected == result))
            .map(|arm| arm.to)
            .ok_or_else(|| FlowError::UnhandledResult {
                module: format!("{from:?}"),
                result,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::tests::test_world;

    struct Holder {
        module: Module,
        ticks: u32,
    }

    impl ModuleClass for Holder {
        fn module(&self) -> &Module {
            &self.module
        }

        fn module_mut(&mut self) -> &mut Module {
            &mut self.module
        }

        fn update(world: &mut EntityWorld, id: EntityId) {
            if let Some(holder) = world.data_mut::<Holder>(id) {
                holder.ticks += 1;
            }
            update_child::<Holder>(world, id);
        }
    }

    struct Child {
        ticks: u32,
        received: Vec<u32>,
        leave_on_tick: Option<u32>,
    }

    fn child_update(world: &mut EntityWorld, id: EntityId) {
        let leave = match world.data_mut::<Child>(id) {
            Some(child) => {
                child.ticks += 1;
                child.leave_on_tick.filter(|tick| *tick == child.ticks)
            }
            None => None,
        };
        if leave.is_some() {
            leave_module(world, id, 3);
        }
    }

    fn child_message(world: &mut EntityWorld, id: EntityId, message: &Message) -> u32 {
        if let Some(child) = world.data_mut::<Child>(id) {
            child.received.push(message.num);
        }
        9
    }

    fn build_child(leave_on_tick: Option<u32>) -> impl FnOnce(&mut EntityWorld, EntityId) -> EntityId {
        move |world, parent| {
            let id = world.spawn(
                Some(parent),
                Child {
                    ticks: 0,
                    received: Vec::new(),
                    leave_on_tick,
                },
            );
            world.set_update_handler(id, Some(child_update));
            world.set_message_handler(id, Some(child_message));
            id
        }
    }

    fn holder(world: &mut EntityWorld, parent: Option<EntityId>) -> EntityId {
        spawn_module(
            world,
            parent,
            Holder {
                module: Module::default(),
                ticks: 0,
            },
        )
    }

    #[test]
    fn create_child_ticks_it_once_and_replaces_the_old_one() {
        let mut world = test_world();
        let module = holder(&mut world, None);
        let first = create_child::<Holder>(&mut world, module, build_child(None));
        assert_eq!(world.data::<Child>(first).map(|c| c.ticks), Some(1));

        let second = create_child::<Holder>(&mut world, module, build_child(None));
        assert!(!world.is_alive(first));
        assert_eq!(module_ref::<Holder>(&world, module).and_then(|m| m.child), Some(second));
    }

    #[test]
    fn update_child_reports_a_finished_child_once() {
        let mut world = test_world();
        let module = holder(&mut world, None);
        let child = create_child::<Holder>(&mut world, module, build_child(Some(2)));

        assert!(!update_child::<Holder>(&mut world, module));
        assert!(!world.is_alive(child));
        let state = module_ref::<Holder>(&world, module).expect("module");
        assert_eq!(state.module_result, 3);
        assert!(!state.done);
        assert!(state.child.is_none());
        assert!(update_child::<Holder>(&mut world, module));
    }

    #[test]
    fn preload_hints_are_swallowed_and_parent_traffic_is_forwarded() {
        let mut world = test_world();
        let root = holder(&mut world, None);
        let inner = holder(&mut world, Some(root));
        let child = create_child::<Holder>(&mut world, inner, build_child(None));

        assert_eq!(world.send_message(child, inner, opcode::PRELOAD_HINT, 1u32), 0);
        assert_eq!(world.send_message(root, inner, opcode::MOUSE_CLICK, 0u32), 9);
        assert_eq!(world.send_message(child, inner, opcode::MOUSE_CLICK, 0u32), 0);
        assert_eq!(
            world.data::<Child>(child).map(|c| c.received.clone()),
            Some(vec![opcode::MOUSE_CLICK])
        );
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Room {
        Hall,
        Intro,
    }

    const ARMS: &[TransitionArm<Room>] = &[
        TransitionArm {
            from: Room::Hall,
            result: Some(1),
            to: ChildSpec {
                module: Room::Intro,
                which: 0,
            },
        },
        TransitionArm {
            from: Room::Intro,
            result: None,
            to: ChildSpec {
                module: Room::Hall,
                which: 2,
            },
        },
    ];
    const TABLE: ModuleTable<Room> = ModuleTable::new(ARMS);

    #[test]
    fn table_matches_exact_and_default_arms() {
        assert_eq!(TABLE.next(Room::Hall, 1).map(|to| to.module), Ok(Room::Intro));
        assert_eq!(TABLE.next(Room::Intro, 42).map(|to| to.which), Ok(2));
        assert_eq!(
            TABLE.next(Room::Hall, 7),
            Err(FlowError::UnhandledResult {
                module: "Hall".to_string(),
                result: 7
            })
        );
    }
}
