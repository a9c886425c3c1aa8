use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::fmt;

use tracing::{error, warn};

use crate::hash::format_hash;
use crate::message::{Message, MessageParam, Point};
use crate::random::RandomSource;
use crate::resource::ResourceFacade;
use crate::surface::DrawSurface;
use crate::vars::VariableStore;

/// Synchronous delivery deeper than this is refused.
pub const MAX_MESSAGE_DEPTH: u32 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

pub type UpdateHandler = fn(&mut EntityWorld, EntityId);
pub type MessageHandler = fn(&mut EntityWorld, EntityId, &Message) -> u32;
pub type DrawHandler = fn(&EntityWorld, EntityId, &mut dyn DrawSurface);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GameState {
    pub scene_num: i32,
}

/// Engine-wide collaborators handed to every handler through the world.
pub struct Services {
    pub vars: VariableStore,
    pub resources: Box<dyn ResourceFacade>,
    pub rng: Box<dyn RandomSource>,
    pub game_state: GameState,
    reported_missing: HashSet<u32>,
}

impl Services {
    pub fn new(resources: Box<dyn ResourceFacade>, rng: Box<dyn RandomSource>) -> Self {
        Self {
            vars: VariableStore::new(),
            resources,
            rng,
            game_state: GameState::default(),
            reported_missing: HashSet::new(),
        }
    }

    pub fn random_number(&mut self, max_inclusive: u32) -> u32 {
        self.rng.random_number(max_inclusive)
    }

    /// Logs a missing resource the first time its hash is seen.
    pub fn report_missing_resource(&mut self, hash: u32, what: &'static str) {
        if self.reported_missing.insert(hash) {
            warn!(hash = %format_hash(hash), kind = what, "resource_missing");
        }
    }
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services")
            .field("vars", &self.vars.len())
            .field("game_state", &self.game_state)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
struct EntityIdAllocator {
    next: u64,
}

impl EntityIdAllocator {
    fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }
}

struct EntityRecord {
    parent: Option<EntityId>,
    children: Vec<EntityId>,
    update: Option<UpdateHandler>,
    handler: Option<MessageHandler>,
    draw: Option<DrawHandler>,
    alive: bool,
    data: Box<dyn Any>,
}

/// Arena of every live entity plus the injected services.
///
/// Handlers receive the whole world, so synchronous cascades can reach any
/// entity. Typed data is borrowed in short scopes through [`data_mut`]
/// and must be released before sending further messages.
///
/// [`data_mut`]: EntityWorld::data_mut
pub struct EntityWorld {
    allocator: EntityIdAllocator,
    records: HashMap<EntityId, EntityRecord>,
    pending_reclaim: Vec<EntityId>,
    depth: u32,
    pub services: Services,
}

impl EntityWorld {
    pub fn new(services: Services) -> Self {
        Self {
            allocator: EntityIdAllocator::default(),
            records: HashMap::new(),
            pending_reclaim: Vec::new(),
            depth: 0,
            services,
        }
    }

    /// Creates an entity owned by `parent`, appended after its siblings.
    pub fn spawn<T: Any>(&mut self, parent: Option<EntityId>, data: T) -> EntityId {
        let id = self.allocator.allocate();
        self.records.insert(
            id,
            EntityRecord {
                parent,
                children: Vec::new(),
                update: None,
                handler: None,
                draw: None,
                alive: true,
                data: Box::new(data),
            },
        );
        if let Some(parent_id) = parent {
            if let Some(parent_record) = self.records.get_mut(&parent_id) {
                parent_record.children.push(id);
            }
        }
        id
    }

    /// Tears down `id` and its descendants right away.
    ///
    /// Handlers are unbound and the subtree stops receiving ticks and
    /// messages; records stay readable until [`reclaim_destroyed`].
    ///
    /// [`reclaim_destroyed`]: EntityWorld::reclaim_destroyed
    pub fn destroy(&mut self, id: EntityId) {
        let Some(record) = self.records.get(&id) else {
            return;
        };
        if !record.alive {
            return;
        }
        let parent = record.parent;

        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(record) = self.records.get_mut(&current) {
                if !record.alive {
                    continue;
                }
                record.alive = false;
                record.update = None;
                record.handler = None;
                record.draw = None;
                stack.extend(record.children.iter().copied());
                self.pending_reclaim.push(current);
            }
        }

        if let Some(parent_id) = parent {
            if let Some(parent_record) = self.records.get_mut(&parent_id) {
                parent_record.children.retain(|child| *child != id);
            }
        }
    }

    /// Frees storage of entities destroyed since the last call.
    pub fn reclaim_destroyed(&mut self) -> usize {
        let reclaimed = self.pending_reclaim.len();
        for id in self.pending_reclaim.drain(..) {
            self.records.remove(&id);
        }
        reclaimed
    }

    pub fn is_alive(&self, id: EntityId) -> bool {
        self.records.get(&id).is_some_and(|record| record.alive)
    }

    pub fn entity_count(&self) -> usize {
        self.records.values().filter(|record| record.alive).count()
    }

    pub fn parent(&self, id: EntityId) -> Option<EntityId> {
        self.records.get(&id).and_then(|record| record.parent)
    }

    pub fn children(&self, id: EntityId) -> &[EntityId] {
        self.records
            .get(&id)
            .map(|record| record.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn data<T: Any>(&self, id: EntityId) -> Option<&T> {
        self.records.get(&id)?.data.downcast_ref::<T>()
    }

    pub fn data_mut<T: Any>(&mut self, id: EntityId) -> Option<&mut T> {
        self.records.get_mut(&id)?.data.downcast_mut::<T>()
    }

    pub fn set_update_handler(&mut self, id: EntityId, handler: Option<UpdateHandler>) {
        if let Some(record) = self.live_record_mut(id) {
            record.update = handler;
        }
    }

    pub fn set_message_handler(&mut self, id: EntityId, handler: Option<MessageHandler>) {
        if let Some(record) = self.live_record_mut(id) {
            record.handler = handler;
        }
    }

    pub fn set_draw_handler(&mut self, id: EntityId, handler: Option<DrawHandler>) {
        if let Some(record) = self.live_record_mut(id) {
            record.draw = handler;
        }
    }

    pub fn has_message_handler(&self, id: EntityId) -> bool {
        self.records
            .get(&id)
            .is_some_and(|record| record.alive && record.handler.is_some())
    }

    /// Delivers a message synchronously and returns the handler's result.
    ///
    /// Missing, destroyed or handler-less targets yield 0.
    pub fn send_message(
        &mut self,
        sender: EntityId,
        target: EntityId,
        num: u32,
        param: impl Into<MessageParam>,
    ) -> u32 {
        let Some(handler) = self
            .records
            .get(&target)
            .filter(|record| record.alive)
            .and_then(|record| record.handler)
        else {
            return 0;
        };
        if self.depth >= MAX_MESSAGE_DEPTH {
            error!(
                sender = %sender,
                target = %target,
                num = %format_hash(num),
                depth = self.depth,
                "message_depth_exceeded"
            );
            return 0;
        }

        let message = Message {
            num,
            param: param.into(),
            sender,
        };
        self.depth += 1;
        let result = handler(self, target, &message);
        self.depth -= 1;
        result
    }

    pub fn send_point_message(
        &mut self,
        sender: EntityId,
        target: EntityId,
        num: u32,
        point: Point,
    ) -> u32 {
        self.send_message(sender, target, num, MessageParam::Point(point))
    }

    pub fn send_entity_message(
        &mut self,
        sender: EntityId,
        target: EntityId,
        num: u32,
        entity: EntityId,
    ) -> u32 {
        self.send_message(sender, target, num, MessageParam::Entity(entity))
    }

    /// Runs the bound update handler once, if any.
    pub fn update_entity(&mut self, id: EntityId) {
        let handler = self
            .records
            .get(&id)
            .filter(|record| record.alive)
            .and_then(|record| record.update);
        if let Some(handler) = handler {
            handler(self, id);
        }
    }

    pub fn draw_entity(&self, id: EntityId, surface: &mut dyn DrawSurface) {
        let handler = self
            .records
            .get(&id)
            .filter(|record| record.alive)
            .and_then(|record| record.draw);
        if let Some(handler) = handler {
            handler(self, id, surface);
        }
    }

    pub fn message_depth(&self) -> u32 {
        self.depth
    }

    fn live_record_mut(&mut self, id: EntityId) -> Option<&mut EntityRecord> {
        self.records.get_mut(&id).filter(|record| record.alive)
    }
}

impl fmt::Debug for EntityWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityWorld")
            .field("entities", &self.entity_count())
            .field("pending_reclaim", &self.pending_reclaim.len())
            .field("services", &self.services)
            .finish()
    }
}
