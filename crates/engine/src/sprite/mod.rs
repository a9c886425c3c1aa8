mod idle;
mod transitions;

use std::any::Any;
use std::fmt::Debug;
use std::sync::Arc;

use tracing::trace;

use crate::collision::{step_along_floor, HitRectList, Rect};
use crate::message::{opcode, Message};
use crate::surface::{DrawSurface, FramePlacement};
use crate::world::{EntityId, EntityWorld};

pub use idle::{pick_weighted, FidgetTimer, IdleEntry, IdleTable};
pub use transitions::{CleanupFn, TransitionQueue, TransitionRequest};

/// What happens when the animation cursor passes its last frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationEnd<S> {
    /// Wrap to the first frame.
    Loop,
    /// Stay on the last frame.
    Hold,
    /// Finish the state (Cleanup, then Next, else notify the parent).
    Finish,
    Goto(S),
}

pub type BeforeEnterFn<S> = fn(&EntityWorld, EntityId) -> Option<S>;
pub type StateHook = fn(&mut EntityWorld, EntityId);
pub type StateMessageFn = fn(&mut EntityWorld, EntityId, &Message) -> u32;

/// Per-state row of a sprite class dispatch table.
#[derive(Debug, Clone, Copy)]
pub struct StateBehavior<S> {
    pub animation: Option<u32>,
    pub end: AnimationEnd<S>,
    pub interruptible: bool,
    /// Returns a prerequisite state to enter first; the requested one is
    /// then queued as Next.
    pub before_enter: Option<BeforeEnterFn<S>>,
    pub on_enter: Option<StateHook>,
    pub on_tick: Option<StateHook>,
    pub on_message: Option<StateMessageFn>,
}

impl<S> Default for StateBehavior<S> {
    fn default() -> Self {
        Self {
            animation: None,
            end: AnimationEnd::Loop,
            interruptible: true,
            before_enter: None,
            on_enter: None,
            on_tick: None,
            on_message: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnimationCursor {
    pub file_hash: u32,
    pub frame_index: usize,
    pub frame_count: usize,
    pub first_frame: usize,
    pub last_frame: usize,
    /// Delta of the frame just shown; consumed by movement hooks.
    pub delta_x: i32,
    pub delta_y: i32,
    pub frame_hash: u32,
    pub stopped: bool,
    pub placeholder: bool,
    started: bool,
    generation: u32,
}

impl AnimationCursor {
    pub fn is_at_last_frame(&self) -> bool {
        self.frame_index >= self.last_frame
    }
}

/// Shared runtime fields of every animated entity.
#[derive(Debug, Clone)]
pub struct AnimatedSprite<S> {
    pub x: i32,
    pub y: i32,
    pub dest_x: i32,
    /// Faces left; frame deltas are mirrored.
    pub do_delta_x: bool,
    pub visible: bool,
    pub clip_rect: Option<Rect>,
    pub interruptible: bool,
    pub floor: Option<Arc<HitRectList>>,
    pub cursor: AnimationCursor,
    pub state: S,
    pub transitions: TransitionQueue<S>,
    pub busy: bool,
}

impl<S: Copy> AnimatedSprite<S> {
    pub fn new(x: i32, y: i32, state: S) -> Self {
        Self {
            x,
            y,
            dest_x: x,
            do_delta_x: false,
            visible: true,
            clip_rect: None,
            interruptible: true,
            floor: None,
            cursor: AnimationCursor::default(),
            state,
            transitions: TransitionQueue::new(),
            busy: false,
        }
    }

    pub fn with_floor(mut self, floor: Arc<HitRectList>) -> Self {
        self.floor = Some(floor);
        self
    }
}

/// A concrete animated entity: its data type plus its state table.
pub trait SpriteClass: Any + Sized {
    type State: Copy + PartialEq + Debug + 'static;

    fn sprite(&self) -> &AnimatedSprite<Self::State>;
    fn sprite_mut(&mut self) -> &mut AnimatedSprite<Self::State>;
    fn behavior(state: Self::State) -> StateBehavior<Self::State>;

    /// Entered when a state finishes with no Next queued and the parent
    /// requested nothing in response.
    fn rest_state() -> Option<Self::State> {
        None
    }
}

pub fn sprite_ref<C: SpriteClass>(world: &EntityWorld, id: EntityId) -> Option<&AnimatedSprite<C::State>> {
    world.data::<C>(id).map(C::sprite)
}

pub fn sprite_mut<C: SpriteClass>(
    world: &mut EntityWorld,
    id: EntityId,
) -> Option<&mut AnimatedSprite<C::State>> {
    world.data_mut::<C>(id).map(C::sprite_mut)
}

pub fn current_state<C: SpriteClass>(world: &EntityWorld, id: EntityId) -> Option<C::State> {
    sprite_ref::<C>(world, id).map(|sprite| sprite.state)
}

/// Spawns `data` under `parent`, binds the sprite handlers and enters
/// `initial`.
pub fn spawn_sprite<C: SpriteClass>(
    world: &mut EntityWorld,
    parent: Option<EntityId>,
    data: C,
    initial: C::State,
) -> EntityId {
    let id = world.spawn(parent, data);
    world.set_update_handler(id, Some(sprite_update::<C>));
    world.set_message_handler(id, Some(sprite_message::<C>));
    world.set_draw_handler(id, Some(sprite_draw::<C>));
    goto_state::<C>(world, id, initial);
    id
}

/// Requests a switch to `state`. While another transition is executing
/// the request is parked in the Deferred slot and runs once it completes.
pub fn goto_state<C: SpriteClass>(world: &mut EntityWorld, id: EntityId, state: C::State) {
    request_transition::<C>(world, id, TransitionRequest::Enter(state));
}

/// Finishes the current state: Cleanup, then Next, else tells the parent.
pub fn finish_state<C: SpriteClass>(world: &mut EntityWorld, id: EntityId) {
    request_transition::<C>(world, id, TransitionRequest::Finish);
}

/// Leaves the current state without entering Next or notifying anyone.
pub fn abandon_state<C: SpriteClass>(world: &mut EntityWorld, id: EntityId) {
    let cleanup = match sprite_mut::<C>(world, id) {
        Some(sprite) => {
            sprite.transitions.set_next(None);
            sprite.transitions.take_cleanup()
        }
        None => return,
    };
    if let Some(cleanup) = cleanup {
        cleanup(world, id);
    }
}

pub fn set_next_state<C: SpriteClass>(world: &mut EntityWorld, id: EntityId, next: Option<C::State>) {
    if let Some(sprite) = sprite_mut::<C>(world, id) {
        sprite.transitions.set_next(next);
    }
}

pub fn set_cleanup<C: SpriteClass>(world: &mut EntityWorld, id: EntityId, cleanup: Option<CleanupFn>) {
    if let Some(sprite) = sprite_mut::<C>(world, id) {
        sprite.transitions.set_cleanup(cleanup);
    }
}

fn request_transition<C: SpriteClass>(
    world: &mut EntityWorld,
    id: EntityId,
    request: TransitionRequest<C::State>,
) {
    match sprite_mut::<C>(world, id) {
        Some(sprite) if sprite.busy => {
            if sprite.transitions.defer(request) {
                trace!(entity = %id, "transition_superseded");
            }
            return;
        }
        Some(sprite) => sprite.busy = true,
        None => return,
    }

    let mut pending = Some(request);
    while let Some(request) = pending {
        match request {
            TransitionRequest::Enter(state) => enter_state::<C>(world, id, state),
            TransitionRequest::Finish => finish_now::<C>(world, id),
        }
        pending = match sprite_mut::<C>(world, id) {
            Some(sprite) => sprite.transitions.take_deferred(),
            None => None,
        };
    }

    if let Some(sprite) = sprite_mut::<C>(world, id) {
        sprite.busy = false;
    }
}

fn enter_state<C: SpriteClass>(world: &mut EntityWorld, id: EntityId, requested: C::State) {
    let cleanup = match sprite_mut::<C>(world, id) {
        Some(sprite) => sprite.transitions.take_cleanup(),
        None => return,
    };
    if let Some(cleanup) = cleanup {
        cleanup(world, id);
    }

    let mut state = requested;
    let mut behavior = C::behavior(requested);
    let prerequisite = behavior.before_enter.and_then(|check| check(world, id));
    let Some(sprite) = sprite_mut::<C>(world, id) else {
        return;
    };
    sprite.transitions.set_next(None);
    if let Some(prerequisite) = prerequisite {
        sprite.transitions.set_next(Some(requested));
        state = prerequisite;
        behavior = C::behavior(prerequisite);
    }
    sprite.state = state;
    sprite.interruptible = behavior.interruptible;
    trace!(entity = %id, state = ?state, "state_entered");

    if let Some(hash) = behavior.animation {
        start_animation::<C>(world, id, hash);
    }
    if let Some(on_enter) = behavior.on_enter {
        on_enter(world, id);
    }
}

fn finish_now<C: SpriteClass>(world: &mut EntityWorld, id: EntityId) {
    let cleanup = match sprite_mut::<C>(world, id) {
        Some(sprite) => sprite.transitions.take_cleanup(),
        None => return,
    };
    if let Some(cleanup) = cleanup {
        cleanup(world, id);
    }

    let next = sprite_mut::<C>(world, id).and_then(|sprite| sprite.transitions.take_next());
    match next {
        Some(state) => enter_state::<C>(world, id, state),
        None => {
            if let Some(parent) = world.parent(id) {
                world.send_message(id, parent, opcode::SPRITE_FINISHED, 0u32);
            }
            let settle = sprite_ref::<C>(world, id).and_then(|sprite| {
                C::rest_state().filter(|rest| {
                    sprite.transitions.deferred().is_none() && sprite.state != *rest
                })
            });
            if let Some(rest) = settle {
                enter_state::<C>(world, id, rest);
            }
        }
    }
}

pub fn start_animation<C: SpriteClass>(world: &mut EntityWorld, id: EntityId, file_hash: u32) {
    start_animation_range::<C>(world, id, file_hash, 0, None);
}

/// Starts `file_hash` on frames `first..=last` (`None` means the last
/// frame of the animation).
pub fn start_animation_range<C: SpriteClass>(
    world: &mut EntityWorld,
    id: EntityId,
    file_hash: u32,
    first: usize,
    last: Option<usize>,
) {
    let info = world.services.resources.animation(file_hash);
    let (frame_count, placeholder) = match info.as_ref() {
        Some(info) if info.frame_count() > 0 => (info.frame_count(), false),
        _ => {
            world.services.report_missing_resource(file_hash, "animation");
            (1, true)
        }
    };
    let last_frame = last.unwrap_or(frame_count - 1).min(frame_count - 1);
    let first_frame = first.min(last_frame);
    let frame = info
        .as_ref()
        .and_then(|info| info.frame(first_frame).copied())
        .unwrap_or_default();

    if let Some(sprite) = sprite_mut::<C>(world, id) {
        let generation = sprite.cursor.generation.wrapping_add(1);
        sprite.cursor = AnimationCursor {
            file_hash,
            frame_index: first_frame,
            frame_count,
            first_frame,
            last_frame,
            delta_x: frame.delta_x,
            delta_y: frame.delta_y,
            frame_hash: frame.frame_hash,
            stopped: false,
            placeholder,
            started: false,
            generation,
        };
    }
}

pub fn stop_animation<C: SpriteClass>(world: &mut EntityWorld, id: EntityId) {
    if let Some(sprite) = sprite_mut::<C>(world, id) {
        sprite.cursor.stopped = true;
    }
}

/// Per-tick driver bound as the entity's update handler.
pub fn sprite_update<C: SpriteClass>(world: &mut EntityWorld, id: EntityId) {
    advance_frame::<C>(world, id);

    if let Some(on_tick) = current_state::<C>(world, id).and_then(|state| C::behavior(state).on_tick) {
        on_tick(world, id);
    }
}

fn advance_frame<C: SpriteClass>(world: &mut EntityWorld, id: EntityId) {
    let Some(sprite) = sprite_mut::<C>(world, id) else {
        return;
    };
    let cursor = sprite.cursor;
    if cursor.stopped {
        return;
    }
    if !cursor.started {
        sprite.cursor.started = true;
        emit_frame_event(world, id, cursor.frame_hash);
        return;
    }
    if !cursor.is_at_last_frame() {
        set_frame::<C>(world, id, cursor.frame_index + 1);
        return;
    }

    world.send_message(id, id, opcode::ANIMATION_STOP, 0u32);
    let same_animation = sprite_ref::<C>(world, id)
        .is_some_and(|sprite| sprite.cursor.generation == cursor.generation && !sprite.cursor.stopped);
    if same_animation {
        set_frame::<C>(world, id, cursor.first_frame);
    }
}

fn set_frame<C: SpriteClass>(world: &mut EntityWorld, id: EntityId, index: usize) {
    let hash = match sprite_ref::<C>(world, id) {
        Some(sprite) => sprite.cursor.file_hash,
        None => return,
    };
    let frame = world
        .services
        .resources
        .animation(hash)
        .and_then(|info| info.frame(index).copied())
        .unwrap_or_default();
    if let Some(sprite) = sprite_mut::<C>(world, id) {
        sprite.cursor.frame_index = index;
        sprite.cursor.delta_x = frame.delta_x;
        sprite.cursor.delta_y = frame.delta_y;
        sprite.cursor.frame_hash = frame.frame_hash;
    }
    emit_frame_event(world, id, frame.frame_hash);
}

fn emit_frame_event(world: &mut EntityWorld, id: EntityId, frame_hash: u32) {
    if frame_hash != 0 {
        world.send_message(id, id, opcode::FRAME_EVENT, frame_hash);
    }
}

/// Message handler bound for every sprite class. The state's own handler
/// sees the message first; `ANIMATION_STOP` then applies the state's end
/// policy unless the handler already moved on.
pub fn sprite_message<C: SpriteClass>(world: &mut EntityWorld, id: EntityId, message: &Message) -> u32 {
    let Some(before) = sprite_ref::<C>(world, id).map(|sprite| (sprite.state, sprite.cursor.generation)) else {
        return 0;
    };
    let behavior = C::behavior(before.0);
    let result = match behavior.on_message {
        Some(handler) => handler(world, id, message),
        None => 0,
    };

    if message.num == opcode::ANIMATION_STOP {
        let unchanged = sprite_ref::<C>(world, id)
            .is_some_and(|sprite| (sprite.state, sprite.cursor.generation) == before);
        if unchanged {
            match behavior.end {
                AnimationEnd::Loop => {}
                AnimationEnd::Hold => stop_animation::<C>(world, id),
                AnimationEnd::Finish => {
                    stop_animation::<C>(world, id);
                    finish_state::<C>(world, id);
                }
                AnimationEnd::Goto(next) => goto_state::<C>(world, id, next),
            }
        }
    }
    result
}

pub fn sprite_draw<C: SpriteClass>(world: &EntityWorld, id: EntityId, surface: &mut dyn DrawSurface) {
    let Some(sprite) = sprite_ref::<C>(world, id) else {
        return;
    };
    surface.set_visible(sprite.visible);
    if !sprite.visible || sprite.cursor.placeholder {
        return;
    }
    surface.set_clip_rect(sprite.clip_rect);
    let cursor = sprite.cursor;
    let image = world
        .services
        .resources
        .frame_image(cursor.file_hash, cursor.frame_index);
    surface.draw_animation_frame(
        image,
        FramePlacement {
            animation_hash: cursor.file_hash,
            x: sprite.x,
            y: sprite.y,
            frame_index: cursor.frame_index,
            flip_x: sprite.do_delta_x,
            flip_y: false,
        },
    );
}

/// Applies the current frame delta, mirrored by facing, and follows the
/// floor when the sprite has one. The delta is consumed.
pub fn move_by_frame_delta<C: SpriteClass>(world: &mut EntityWorld, id: EntityId) {
    if let Some(sprite) = sprite_mut::<C>(world, id) {
        let dx = if sprite.do_delta_x {
            -sprite.cursor.delta_x
        } else {
            sprite.cursor.delta_x
        };
        move_horizontally(sprite, dx);
        sprite.y += sprite.cursor.delta_y;
        sprite.cursor.delta_x = 0;
        sprite.cursor.delta_y = 0;
    }
}

/// Moves by `dx`, re-seating y on the floor rects if present.
pub fn move_horizontally<S>(sprite: &mut AnimatedSprite<S>, dx: i32) {
    match sprite.floor.as_deref() {
        Some(floor) => {
            let (x, y) = step_along_floor(floor, sprite.x, sprite.y, dx);
            sprite.x = x;
            sprite.y = y;
        }
        None => sprite.x += dx,
    }
}
