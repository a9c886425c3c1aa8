use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::collision::{HitRect, HitRectList, Rect};
use crate::content::{MessageListEntry, SceneData, TriggerAction};
use crate::hash::format_hash;
use crate::message::{opcode, Message, MessageParam, Point};
use crate::sprite::{spawn_sprite, SpriteClass};
use crate::surface::DrawSurface;
use crate::world::{EntityId, EntityWorld};

pub type PlayerPositionFn = fn(&EntityWorld, EntityId) -> Option<Point>;

/// Gate consulted by [`set_message_list2`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListStatus {
    /// Any list may start.
    Free,
    /// A list runs; a different one may replace it.
    Running,
    /// The running list may not be replaced by clicks.
    Locked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DrawEntry {
    id: EntityId,
    priority: i32,
    order: u64,
}

#[derive(Debug, Clone, Copy)]
struct Hotspot {
    id: EntityId,
    rect: Rect,
}

/// Base scene fields shared by every concrete scene.
#[derive(Debug)]
pub struct Scene {
    pub player: Option<EntityId>,
    player_position: Option<PlayerPositionFn>,
    data: Arc<SceneData>,
    pub hit_rects: Arc<HitRectList>,
    rect_list: Option<u32>,
    hotspots: Vec<Hotspot>,
    draw_list: Vec<DrawEntry>,
    next_draw_order: u64,

    message_list: Option<Arc<[MessageListEntry]>>,
    message_list_id: Option<u32>,
    message_list2: Option<u32>,
    list_index: usize,
    list_status: ListStatus,
    player_busy: bool,
    processing: bool,

    pub can_accept_input: bool,
    /// Preload hint recorded from `PRELOAD_HINT` entries; -1 when unset.
    pub message_value: i32,
    mouse_clicked: bool,
    mouse_click_pos: Point,
    pub mouse_pos: Point,
    pub locals: BTreeMap<u32, u32>,
}

impl Scene {
    pub fn new(data: Arc<SceneData>) -> Self {
        let hit_rects = Arc::clone(&data.hit_rects);
        Self {
            player: None,
            player_position: None,
            data,
            hit_rects,
            rect_list: None,
            hotspots: Vec::new(),
            draw_list: Vec::new(),
            next_draw_order: 0,
            message_list: None,
            message_list_id: None,
            message_list2: None,
            list_index: 0,
            list_status: ListStatus::Free,
            player_busy: false,
            processing: false,
            can_accept_input: true,
            message_value: -1,
            mouse_clicked: false,
            mouse_click_pos: Point::default(),
            mouse_pos: Point::default(),
            locals: BTreeMap::new(),
        }
    }

    pub fn data(&self) -> &Arc<SceneData> {
        &self.data
    }

    pub fn local(&self, key: u32) -> u32 {
        self.locals.get(&key).copied().unwrap_or(0)
    }

    pub fn set_local(&mut self, key: u32, value: u32) {
        self.locals.insert(key, value);
    }

    pub fn list_status(&self) -> ListStatus {
        self.list_status
    }

    pub fn message_list_id(&self) -> Option<u32> {
        self.message_list.as_ref().and(self.message_list_id)
    }

    pub fn list_index(&self) -> usize {
        self.list_index
    }

    pub fn is_player_busy(&self) -> bool {
        self.player_busy
    }

    pub fn rect_list(&self) -> Option<u32> {
        self.rect_list
    }

    pub fn set_rect_list(&mut self, id: Option<u32>) {
        self.rect_list = id;
    }

    pub fn is_mouse_click_pending(&self) -> bool {
        self.mouse_clicked
    }

    pub fn last_click(&self) -> Point {
        self.mouse_click_pos
    }

    fn list_complete(&self) -> bool {
        match self.message_list.as_ref() {
            Some(list) => self.list_index >= list.len(),
            None => true,
        }
    }

    fn priority_of(&self, id: EntityId) -> Option<i32> {
        self.draw_list
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| entry.priority)
    }
}

/// A concrete scene: its data type plus optional hooks around the base
/// scene behaviour.
pub trait SceneClass: Any + Sized {
    fn scene(&self) -> &Scene;
    fn scene_mut(&mut self) -> &mut Scene;

    /// Scene-specific handling, run after the base opcodes and triggers.
    fn handle_message(_world: &mut EntityWorld, _id: EntityId, _message: &Message) -> u32 {
        0
    }

    /// Runs at the start of every tick, before click resolution.
    fn before_update(_world: &mut EntityWorld, _id: EntityId) {}
}

pub fn scene_ref<C: SceneClass>(world: &EntityWorld, id: EntityId) -> Option<&Scene> {
    world.data::<C>(id).map(C::scene)
}

pub fn scene_mut<C: SceneClass>(world: &mut EntityWorld, id: EntityId) -> Option<&mut Scene> {
    world.data_mut::<C>(id).map(C::scene_mut)
}

pub fn spawn_scene<C: SceneClass>(world: &mut EntityWorld, parent: Option<EntityId>, data: C) -> EntityId {
    let id = world.spawn(parent, data);
    world.set_update_handler(id, Some(scene_update::<C>));
    world.set_message_handler(id, Some(scene_message::<C>));
    world.set_draw_handler(id, Some(scene_draw::<C>));
    debug!(scene = %id, parent = ?parent, "scene_created");
    id
}

/// Registers an existing child for drawing at `priority`.
pub fn insert_entity<C: SceneClass>(world: &mut EntityWorld, scene: EntityId, id: EntityId, priority: i32) {
    if let Some(state) = scene_mut::<C>(world, scene) {
        let order = state.next_draw_order;
        state.next_draw_order += 1;
        state.draw_list.push(DrawEntry { id, priority, order });
    }
}

/// Spawns a sprite owned by the scene and adds it to the draw list.
pub fn insert_sprite<C: SceneClass, S: SpriteClass>(
    world: &mut EntityWorld,
    scene: EntityId,
    data: S,
    initial: S::State,
    priority: i32,
) -> EntityId {
    let id = spawn_sprite(world, Some(scene), data, initial);
    insert_entity::<C>(world, scene, id, priority);
    id
}

/// Like [`insert_sprite`], and makes the sprite the scene's player.
pub fn insert_player<C: SceneClass, S: SpriteClass>(
    world: &mut EntityWorld,
    scene: EntityId,
    data: S,
    initial: S::State,
    priority: i32,
) -> EntityId {
    let id = insert_sprite::<C, S>(world, scene, data, initial, priority);
    set_player::<C>(world, scene, id, sprite_position::<S>);
    id
}

pub fn set_player<C: SceneClass>(
    world: &mut EntityWorld,
    scene: EntityId,
    player: EntityId,
    position: PlayerPositionFn,
) {
    if let Some(state) = scene_mut::<C>(world, scene) {
        state.player = Some(player);
        state.player_position = Some(position);
    }
}

fn sprite_position<S: SpriteClass>(world: &EntityWorld, id: EntityId) -> Option<Point> {
    world
        .data::<S>(id)
        .map(|data| Point::new(data.sprite().x, data.sprite().y))
}

pub fn player_position<C: SceneClass>(world: &EntityWorld, scene: EntityId) -> Option<Point> {
    let state = scene_ref::<C>(world, scene)?;
    let player = state.player?;
    (state.player_position?)(world, player)
}

/// Makes `id` clickable inside `rect`; clicks are offered to it with
/// `HOTSPOT_CLICK` before the rect list is consulted.
pub fn add_hotspot<C: SceneClass>(world: &mut EntityWorld, scene: EntityId, id: EntityId, rect: Rect) {
    if let Some(state) = scene_mut::<C>(world, scene) {
        state.hotspots.push(Hotspot { id, rect });
    }
}

pub fn set_priority<C: SceneClass>(world: &mut EntityWorld, scene: EntityId, id: EntityId, priority: i32) {
    if let Some(entry) = scene_mut::<C>(world, scene)
        .and_then(|state| state.draw_list.iter_mut().find(|entry| entry.id == id))
    {
        entry.priority = priority;
    }
}

pub fn priority_of<C: SceneClass>(world: &EntityWorld, scene: EntityId, id: EntityId) -> Option<i32> {
    scene_ref::<C>(world, scene).and_then(|state| state.priority_of(id))
}

pub fn find_hit_rect_at_pos<C: SceneClass>(world: &EntityWorld, scene: EntityId, x: i32, y: i32) -> HitRect {
    scene_ref::<C>(world, scene)
        .map(|state| state.hit_rects.find_hit_rect_at_pos(x, y))
        .unwrap_or(HitRect::NONE)
}

/// Starts message list `list_id` from its first entry. Unknown ids log a
/// warning and leave the running list alone.
pub fn set_message_list<C: SceneClass>(world: &mut EntityWorld, scene: EntityId, list_id: u32) -> bool {
    let Some(state) = scene_mut::<C>(world, scene) else {
        return false;
    };
    let Some(list) = state.data.message_list(list_id) else {
        warn!(scene = %scene, list = %format_hash(list_id), "message_list_missing");
        return false;
    };
    state.message_list = Some(list);
    state.message_list_id = Some(list_id);
    state.list_index = 0;
    state.player_busy = false;
    state.can_accept_input = true;
    state.list_status = ListStatus::Running;
    let player = state.player;
    debug!(scene = %scene, list = %format_hash(list_id), "message_list_started");

    if let Some(player) = player {
        world.send_message(scene, player, opcode::LIST_STARTED, 0u32);
    }
    true
}

/// Conditional switch used for click-driven lists. A free scene always
/// switches, a running scene only to a different list, a locked scene
/// never.
pub fn set_message_list2<C: SceneClass>(world: &mut EntityWorld, scene: EntityId, list_id: u32) -> bool {
    let Some(state) = scene_mut::<C>(world, scene) else {
        return false;
    };
    let preload_release = match state.list_status {
        ListStatus::Locked => return false,
        ListStatus::Running if state.message_list2 == Some(list_id) => return false,
        ListStatus::Running if state.message_value >= 0 => {
            let value = state.message_value as u32;
            state.message_value = -1;
            Some(value)
        }
        ListStatus::Running | ListStatus::Free => None,
    };
    state.message_list2 = Some(list_id);

    if let (Some(value), Some(parent)) = (preload_release, world.parent(scene)) {
        world.send_message(scene, parent, opcode::PRELOAD_RELEASE, value);
    }
    set_message_list::<C>(world, scene, list_id)
}

pub fn cancel_message_list<C: SceneClass>(world: &mut EntityWorld, scene: EntityId) {
    let Some(state) = scene_mut::<C>(world, scene) else {
        return;
    };
    state.message_list = None;
    state.message_list_id = None;
    state.message_list2 = None;
    state.list_index = 0;
    state.player_busy = false;
    state.can_accept_input = true;
    state.list_status = ListStatus::Free;
    let player = state.player;
    debug!(scene = %scene, "message_list_cancelled");

    if let Some(player) = player {
        world.send_message(scene, player, opcode::GOTO_IDLE, 0u32);
    }
}

enum Route {
    Parent,
    Scene,
    Player,
    PlayerAtClick(Point),
    Skip,
}

/// Runs list entries until the player is busy or the list is exhausted.
/// Re-entrant calls from inside an entry's delivery return immediately;
/// the outer loop picks up any list switch they caused.
pub fn process_message_list<C: SceneClass>(world: &mut EntityWorld, scene: EntityId) {
    match scene_mut::<C>(world, scene) {
        Some(state) if !state.processing && state.message_list.is_some() => state.processing = true,
        _ => return,
    }

    loop {
        let Some(state) = scene_mut::<C>(world, scene) else {
            return;
        };
        if state.player_busy {
            break;
        }
        let Some(entry) = state
            .message_list
            .as_ref()
            .and_then(|list| list.get(state.list_index).copied())
        else {
            break;
        };
        state.list_index += 1;
        let is_last = state.message_list.as_ref().is_some_and(|list| state.list_index == list.len());
        let player = state.player;
        let click = state.mouse_click_pos;

        let route = match entry.num {
            opcode::LEAVE_MODULE | opcode::PRELOAD_SCENE => Route::Parent,
            opcode::PRELOAD_HINT => {
                state.message_value = entry.param.as_integer() as i32;
                Route::Parent
            }
            opcode::WALK_TO_CLICK => {
                state.player_busy = true;
                Route::PlayerAtClick(click)
            }
            opcode::FRAME_EVENT => Route::Scene,
            opcode::LIST_STATUS_FREE => {
                state.list_status = ListStatus::Free;
                Route::Skip
            }
            opcode::LIST_STATUS_LOCKED => {
                state.list_status = ListStatus::Locked;
                Route::Skip
            }
            opcode::DISABLE_INPUT => {
                state.can_accept_input = false;
                Route::Skip
            }
            opcode::LIST_NO_OP => Route::Skip,
            opcode::SCENE_LOCAL_FIRST..=opcode::SCENE_LOCAL_LAST => Route::Scene,
            _ => {
                state.player_busy = true;
                Route::Player
            }
        };

        if is_last {
            if let Some(player) = player {
                world.send_message(scene, player, opcode::LIST_LAST_ENTRY, 0u32);
            }
        }

        match route {
            Route::Parent => {
                if let Some(parent) = world.parent(scene) {
                    world.send_message(scene, parent, entry.num, entry.param);
                }
            }
            Route::Scene => {
                let reply = world.send_message(scene, scene, entry.num, entry.param);
                if reply != 0 && entry.num != opcode::FRAME_EVENT {
                    break;
                }
            }
            Route::PlayerAtClick(point) => {
                if let Some(player) = player {
                    world.send_point_message(scene, player, entry.num, point);
                }
            }
            Route::Player => {
                let reply = match player {
                    Some(player) => world.send_message(scene, player, entry.num, entry.param),
                    None => 1,
                };
                if reply == 1 {
                    if let Some(state) = scene_mut::<C>(world, scene) {
                        state.player_busy = false;
                    }
                }
            }
            Route::Skip => {}
        }
    }

    if let Some(state) = scene_mut::<C>(world, scene) {
        if state.message_list.is_some() && state.list_complete() && !state.player_busy {
            state.message_list = None;
            state.can_accept_input = true;
            state.list_status = ListStatus::Free;
            debug!(scene = %scene, list = ?state.message_list_id.map(format_hash), "message_list_finished");
        }
        state.processing = false;
    }
}

/// Update handler bound for every scene class.
pub fn scene_update<C: SceneClass>(world: &mut EntityWorld, scene: EntityId) {
    C::before_update(world, scene);
    resolve_click::<C>(world, scene);
    process_message_list::<C>(world, scene);

    // Children may destroy siblings while ticking.
    let children: Vec<EntityId> = world.children(scene).to_vec();
    for child in children {
        if world.is_alive(child) {
            world.update_entity(child);
        }
    }

    let dead: Vec<EntityId> = match scene_ref::<C>(world, scene) {
        Some(state) => state
            .draw_list
            .iter()
            .map(|entry| entry.id)
            .chain(state.hotspots.iter().map(|hotspot| hotspot.id))
            .filter(|id| !world.is_alive(*id))
            .collect(),
        None => return,
    };
    if !dead.is_empty() {
        if let Some(state) = scene_mut::<C>(world, scene) {
            state.draw_list.retain(|entry| !dead.contains(&entry.id));
            state.hotspots.retain(|hotspot| !dead.contains(&hotspot.id));
        }
    }
}

fn resolve_click<C: SceneClass>(world: &mut EntityWorld, scene: EntityId) {
    let (player, click, hotspots, can_accept_input) = match scene_ref::<C>(world, scene) {
        Some(state) if state.mouse_clicked => (
            state.player,
            state.mouse_click_pos,
            state.hotspots.clone(),
            state.can_accept_input,
        ),
        _ => return,
    };

    let consumed = match player {
        Some(player) => {
            let ready = can_accept_input
                && world.has_message_handler(player)
                && world.send_message(scene, player, opcode::QUERY_INTERRUPTIBLE, 0u32) != 0;
            if !ready {
                false
            } else if offer_to_hotspots(world, scene, &hotspots, click) {
                true
            } else {
                resolve_rect_list::<C>(world, scene, click)
            }
        }
        None => offer_to_hotspots(world, scene, &hotspots, click),
    };

    if consumed {
        if let Some(state) = scene_mut::<C>(world, scene) {
            state.mouse_clicked = false;
        }
    }
}

fn offer_to_hotspots(world: &mut EntityWorld, scene: EntityId, hotspots: &[Hotspot], click: Point) -> bool {
    hotspots.iter().any(|hotspot| {
        world.is_alive(hotspot.id)
            && hotspot.rect.contains(click.x, click.y)
            && world.send_point_message(scene, hotspot.id, opcode::HOTSPOT_CLICK, click) != 0
    })
}

/// Returns whether the click was consumed. A click outside every rect is
/// dropped; a click whose list was refused stays latched.
fn resolve_rect_list<C: SceneClass>(world: &mut EntityWorld, scene: EntityId, click: Point) -> bool {
    let list_id = {
        let Some(state) = scene_ref::<C>(world, scene) else {
            return true;
        };
        let Some(rect_list) = state.rect_list.and_then(|id| state.data.rect_list(id)) else {
            return true;
        };
        let Some(player_pos) = player_position::<C>(world, scene) else {
            return true;
        };
        rect_list.message_list_at(player_pos, click)
    };
    match list_id {
        Some(list_id) => set_message_list2::<C>(world, scene, list_id),
        None => true,
    }
}

/// Message handler bound for every scene class.
pub fn scene_message<C: SceneClass>(world: &mut EntityWorld, scene: EntityId, message: &Message) -> u32 {
    match message.num {
        opcode::MOUSE_MOVE => {
            if let Some(state) = scene_mut::<C>(world, scene) {
                state.mouse_pos = message.param.as_point();
            }
        }
        opcode::MOUSE_CLICK => {
            if let Some(state) = scene_mut::<C>(world, scene) {
                state.mouse_clicked = true;
                state.mouse_click_pos = message.param.as_point();
            }
        }
        opcode::SPRITE_FINISHED => on_player_finished::<C>(world, scene),
        opcode::SET_PRIORITY => {
            set_priority::<C>(world, scene, message.sender, message.param.as_integer() as i32)
        }
        _ => {}
    }

    run_triggers::<C>(world, scene, message);
    C::handle_message(world, scene, message)
}

fn on_player_finished<C: SceneClass>(world: &mut EntityWorld, scene: EntityId) {
    let (player, complete) = match scene_mut::<C>(world, scene) {
        Some(state) if state.player_busy => {
            state.player_busy = false;
            (state.player, state.list_complete())
        }
        _ => return,
    };
    if complete {
        if let Some(player) = player {
            world.send_message(scene, player, opcode::GOTO_IDLE, 0u32);
        }
    } else {
        process_message_list::<C>(world, scene);
    }
}

fn run_triggers<C: SceneClass>(world: &mut EntityWorld, scene: EntityId, message: &Message) {
    let action = {
        let Some(state) = scene_ref::<C>(world, scene) else {
            return;
        };
        state
            .data
            .triggers
            .iter()
            .find(|rule| rule.matches(message.num, &message.param, &world.services.vars, &state.locals))
            .map(|rule| rule.action)
    };
    match action {
        Some(TriggerAction::SetMessageList(list_id)) => {
            set_message_list::<C>(world, scene, list_id);
        }
        Some(TriggerAction::CancelMessageList) => cancel_message_list::<C>(world, scene),
        None => {}
    }
}

/// Draw handler: children in ascending priority, ties in insertion order.
pub fn scene_draw<C: SceneClass>(world: &EntityWorld, scene: EntityId, surface: &mut dyn DrawSurface) {
    let Some(state) = scene_ref::<C>(world, scene) else {
        return;
    };
    let mut order = state.draw_list.clone();
    order.sort_by_key(|entry| (entry.priority, entry.order));
    for entry in order {
        world.draw_entity(entry.id, surface);
    }
}

/// Sends `num` with an integer param to the scene from itself.
pub fn send_to_self(world: &mut EntityWorld, scene: EntityId, num: u32, param: u32) -> u32 {
    world.send_message(scene, scene, num, MessageParam::Integer(param))
}
