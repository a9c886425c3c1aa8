const KLAYMAN_IDLE: u32 = 0x5420E254;
const KLAYMAN_BLINK: u32 = 0x5900C41E;
const KLAYMAN_STAND_UP: u32 = 0x9A7020B8;
const KLAYMAN_CROUCH: u32 = 0x5C7080D4;
const KLAYMAN_STEP: u32 = 0x5C48C506;
const KLAYMAN_WALK_START: u32 = 0x242C0198;
const KLAYMAN_WALK_LOOP: u32 = 0x1A249001;
const KLAYMAN_STOP_FAR_STANDING: u32 = 0xF234EE31;
const KLAYMAN_STOP_FAR_CROUCHED: u32 = 0xF135CC21;
const KLAYMAN_STOP_NEAR_STANDING: u32 = 0x8604A152;
const KLAYMAN_STOP_NEAR_CROUCHED: u32 = 0xA246A132;
const KLAYMAN_PRESS_HIGH: u32 = 0x1C02B03D;
const KLAYMAN_PRESS_LOW: u32 = 0x1C16B033;
const KLAYMAN_STEP_ON_BUTTON: u32 = 0x1CD89029;
const KLAYMAN_PICK_UP: u32 = 0x1C28C178;
const KLAYMAN_HIT_BY_DOOR: u32 = 0x35AA8059;

const FRAME_PRESS_BUTTON: u32 = 0x0D01B294;
const FRAME_PICK_UP: u32 = 0xC1380080;

/// Player opcodes outside the engine table.
const MSG_SELECT_IDLE_TABLE: u32 = 0x2000;
const MSG_HIT_BY_DOOR: u32 = 0x4811;

const IDLE_TABLE_STANDARD: u32 = 1;
const IDLE_TABLE_REDUCED: u32 = 2;
const IDLE_TABLE_NONE: u32 = 3;

/// Stop stances set through `SET_STOP_STANCE`.
const STANCE_STANDING: u32 = 0;
const STANCE_CROUCHED: u32 = 1;
const STANCE_NO_STOP: u32 = 2;
const STANCE_RUN: u32 = 3;

const SNAP_DISTANCE: i32 = 36;
const STEP_DISTANCE: i32 = 42;
const STOP_NEAR_DISTANCE: i32 = 10;
const RUN_STOP_DISTANCE: i32 = 30;
const RUN_STOP_LATE_DISTANCE: i32 = 150;
const CROUCH_APPROACH_PX: i32 = 6;
const STOP_STEER_FRAME: usize = 9;
const STOP_STEER_SLACK: i32 = 26;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Fidget {
    Stretch,
    Yawn,
    Whistle,
    LookAround,
    Scratch,
}

impl Fidget {
    fn animation(self) -> u32 {
        match self {
            Self::Stretch => 0x5B20C814,
            Self::Yawn => 0xD122C137,
            Self::Whistle => 0x543CD054,
            Self::LookAround => 0x40A0C034,
            Self::Scratch => 0x5120E137,
        }
    }
}

const STANDARD_IDLE: IdleTable<Fidget> = &[
    IdleEntry { weight: 1, target: Fidget::Stretch },
    IdleEntry { weight: 1, target: Fidget::Yawn },
    IdleEntry { weight: 1, target: Fidget::Whistle },
    IdleEntry { weight: 1, target: Fidget::LookAround },
    IdleEntry { weight: 1, target: Fidget::Scratch },
];

const REDUCED_IDLE: IdleTable<Fidget> = &[
    IdleEntry { weight: 1, target: Fidget::Stretch },
    IdleEntry { weight: 1, target: Fidget::Yawn },
    IdleEntry { weight: 1, target: Fidget::LookAround },
    IdleEntry { weight: 1, target: Fidget::Scratch },
];

const NO_IDLE: IdleTable<Fidget> = &[];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Posture {
    Walking,
    Standing,
    Crouching,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ButtonHeight {
    High,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KlaymanState {
    Idle,
    Blink,
    FidgetPreload(Fidget),
    Fidget(Fidget),
    StandUp,
    Crouch,
    Step,
    WalkStart,
    WalkLoop,
    WalkStop,
    PressButton(ButtonHeight),
    StepOnButton,
    PickUp,
    HitByDoor,
}

/// The playable character.
pub(crate) struct Klayman {
    sprite: AnimatedSprite<KlaymanState>,
    scene_data: Arc<SceneData>,
    posture: Posture,
    stop_stance: u32,
    stance_overridden: bool,
    walking: bool,
    stepping: bool,
    /// The first walk-loop tick repeats the walk-start pose.
    loop_warmup: bool,
    attached: Option<EntityId>,
    idle_table: IdleTable<Fidget>,
    fidget_timer: FidgetTimer,
    preload: Option<ResourceHandle>,
}

impl Klayman {
    pub(crate) fn new(x: i32, y: i32, scene_data: Arc<SceneData>) -> Self {
        let floor = Arc::clone(&scene_data.hit_rects);
        Self {
            sprite: AnimatedSprite::new(x, y, KlaymanState::Idle).with_floor(floor),
            scene_data,
            posture: Posture::Walking,
            stop_stance: STANCE_CROUCHED,
            stance_overridden: false,
            walking: false,
            stepping: false,
            loop_warmup: false,
            attached: None,
            idle_table: STANDARD_IDLE,
            fidget_timer: FidgetTimer::default(),
            preload: None,
        }
    }

    pub(crate) fn with_clip_rect(mut self, rect: Rect) -> Self {
        self.sprite.clip_rect = Some(rect);
        self
    }
}

impl SpriteClass for Klayman {
    type State = KlaymanState;

    fn sprite(&self) -> &AnimatedSprite<KlaymanState> {
        &self.sprite
    }

    fn sprite_mut(&mut self) -> &mut AnimatedSprite<KlaymanState> {
        &mut self.sprite
    }

    fn rest_state() -> Option<KlaymanState> {
        Some(KlaymanState::Idle)
    }

    fn behavior(state: KlaymanState) -> StateBehavior<KlaymanState> {
        let base = StateBehavior {
            on_message: Some(klayman_message),
            ..StateBehavior::default()
        };
        match state {
            KlaymanState::Idle => StateBehavior {
                animation: Some(KLAYMAN_IDLE),
                before_enter: Some(stand_up_first),
                on_enter: Some(enter_idle),
                on_tick: Some(idle_tick),
                ..base
            },
            KlaymanState::Blink => StateBehavior {
                animation: Some(KLAYMAN_BLINK),
                end: AnimationEnd::Finish,
                on_enter: Some(enter_blink),
                ..base
            },
            KlaymanState::FidgetPreload(_) => StateBehavior {
                on_enter: Some(enter_fidget_preload),
                on_tick: Some(fidget_preload_tick),
                ..base
            },
            KlaymanState::Fidget(kind) => StateBehavior {
                animation: Some(kind.animation()),
                end: AnimationEnd::Finish,
                on_enter: Some(enter_fidget),
                ..base
            },
            KlaymanState::StandUp => StateBehavior {
                animation: Some(KLAYMAN_STAND_UP),
                end: AnimationEnd::Finish,
                interruptible: false,
                on_enter: Some(enter_stand_up),
                ..base
            },
            KlaymanState::Crouch => StateBehavior {
                animation: Some(KLAYMAN_CROUCH),
                end: AnimationEnd::Finish,
                interruptible: false,
                on_enter: Some(enter_crouch),
                on_tick: Some(crouch_tick),
                ..base
            },
            KlaymanState::Step => StateBehavior {
                animation: Some(KLAYMAN_STEP),
                end: AnimationEnd::Finish,
                on_enter: Some(enter_step),
                on_tick: Some(stop_tick),
                ..base
            },
            KlaymanState::WalkStart => StateBehavior {
                animation: Some(KLAYMAN_WALK_START),
                end: AnimationEnd::Finish,
                before_enter: Some(stand_up_first),
                on_enter: Some(enter_walk_start),
                on_tick: Some(walk_tick),
                ..base
            },
            KlaymanState::WalkLoop => StateBehavior {
                animation: Some(KLAYMAN_WALK_LOOP),
                end: AnimationEnd::Loop,
                on_enter: Some(enter_walk_loop),
                on_tick: Some(walk_loop_tick),
                ..base
            },
            // The stop animation depends on where in the loop the walk ended.
            KlaymanState::WalkStop => StateBehavior {
                end: AnimationEnd::Finish,
                on_enter: Some(enter_walk_stop),
                on_tick: Some(stop_tick),
                ..base
            },
            KlaymanState::PressButton(height) => StateBehavior {
                animation: Some(match height {
                    ButtonHeight::High => KLAYMAN_PRESS_HIGH,
                    ButtonHeight::Low => KLAYMAN_PRESS_LOW,
                }),
                end: AnimationEnd::Finish,
                before_enter: Some(crouch_first),
                on_enter: Some(enter_press_button),
                ..base
            },
            KlaymanState::StepOnButton => StateBehavior {
                animation: Some(KLAYMAN_STEP_ON_BUTTON),
                end: AnimationEnd::Finish,
                before_enter: Some(stand_up_first),
                on_enter: Some(enter_stand_up),
                on_tick: Some(crouch_tick),
                ..base
            },
            KlaymanState::PickUp => StateBehavior {
                animation: Some(KLAYMAN_PICK_UP),
                end: AnimationEnd::Finish,
                interruptible: false,
                before_enter: Some(crouch_first),
                on_enter: Some(enter_pick_up),
                ..base
            },
            KlaymanState::HitByDoor => StateBehavior {
                animation: Some(KLAYMAN_HIT_BY_DOOR),
                end: AnimationEnd::Finish,
                interruptible: false,
                on_enter: Some(enter_stand_up),
                ..base
            },
        }
    }
}

fn stand_up_first(world: &EntityWorld, id: EntityId) -> Option<KlaymanState> {
    world
        .data::<Klayman>(id)
        .filter(|klayman| klayman.posture == Posture::Crouching)
        .map(|_| KlaymanState::StandUp)
}

fn crouch_first(world: &EntityWorld, id: EntityId) -> Option<KlaymanState> {
    world
        .data::<Klayman>(id)
        .filter(|klayman| klayman.posture == Posture::Standing)
        .map(|_| KlaymanState::Crouch)
}

fn set_posture(world: &mut EntityWorld, id: EntityId, posture: Posture) {
    if let Some(klayman) = world.data_mut::<Klayman>(id) {
        klayman.posture = posture;
    }
}

fn snap_to_target(world: &mut EntityWorld, id: EntityId) {
    if let Some(sprite) = sprite_mut::<Klayman>(world, id) {
        sprite.x = sprite.dest_x;
    }
}

fn enter_idle(world: &mut EntityWorld, id: EntityId) {
    let timer = FidgetTimer::seeded(world.services.rng.as_mut());
    if let Some(klayman) = world.data_mut::<Klayman>(id) {
        klayman.posture = Posture::Standing;
        klayman.fidget_timer = timer;
    }
}

fn idle_tick(world: &mut EntityWorld, id: EntityId) {
    let table = {
        let Some(klayman) = world.data_mut::<Klayman>(id) else {
            return;
        };
        if !klayman.fidget_timer.tick() {
            return;
        }
        klayman.idle_table
    };

    // Scenes that silence fidgets still get a blink.
    match pick_weighted(table, world.services.rng.as_mut()) {
        Some(kind) => goto_state::<Klayman>(world, id, KlaymanState::FidgetPreload(kind)),
        None => goto_state::<Klayman>(world, id, KlaymanState::Blink),
    }
}

fn enter_blink(world: &mut EntityWorld, id: EntityId) {
    if let Some(klayman) = world.data_mut::<Klayman>(id) {
        klayman.posture = Posture::Standing;
    }
    set_next_state::<Klayman>(world, id, Some(KlaymanState::Idle));
}

fn enter_fidget_preload(world: &mut EntityWorld, id: EntityId) {
    let Some(KlaymanState::FidgetPreload(kind)) = current_state::<Klayman>(world, id) else {
        return;
    };
    let Some(handle) = world.services.resources.use_resource(kind.animation()) else {
        debug!(fidget = ?kind, "fidget_unavailable");
        goto_state::<Klayman>(world, id, KlaymanState::Idle);
        return;
    };
    // Requests residency; readiness is polled per tick.
    if world.services.resources.load_resource(handle).is_none() {
        warn!(fidget = ?kind, hash = %format_hash(kind.animation()), "fidget_load_failed");
        world.services.resources.unuse_resource(handle);
        goto_state::<Klayman>(world, id, KlaymanState::Idle);
        return;
    }
    if let Some(klayman) = world.data_mut::<Klayman>(id) {
        klayman.preload = Some(handle);
    }
    set_cleanup::<Klayman>(world, id, Some(release_preload));
}

fn fidget_preload_tick(world: &mut EntityWorld, id: EntityId) {
    let ready = match (
        current_state::<Klayman>(world, id),
        world.data::<Klayman>(id).and_then(|klayman| klayman.preload),
    ) {
        (Some(KlaymanState::FidgetPreload(kind)), Some(handle))
            if world.services.resources.is_resource_data_valid(handle) =>
        {
            Some(kind)
        }
        _ => None,
    };
    if let Some(kind) = ready {
        goto_state::<Klayman>(world, id, KlaymanState::Fidget(kind));
    }
}

fn release_preload(world: &mut EntityWorld, id: EntityId) {
    let handle = world
        .data_mut::<Klayman>(id)
        .and_then(|klayman| klayman.preload.take());
    if let Some(handle) = handle {
        world.services.resources.unuse_resource(handle);
    }
}

fn enter_fidget(world: &mut EntityWorld, id: EntityId) {
    set_posture(world, id, Posture::Standing);
    set_next_state::<Klayman>(world, id, Some(KlaymanState::Idle));
}

fn enter_stand_up(world: &mut EntityWorld, id: EntityId) {
    set_posture(world, id, Posture::Standing);
}

fn enter_crouch(world: &mut EntityWorld, id: EntityId) {
    set_posture(world, id, Posture::Crouching);
}

fn enter_press_button(world: &mut EntityWorld, id: EntityId) {
    snap_to_target(world, id);
    set_posture(world, id, Posture::Crouching);
}

fn enter_pick_up(world: &mut EntityWorld, id: EntityId) {
    snap_to_target(world, id);
    set_posture(world, id, Posture::Standing);
}

fn enter_step(world: &mut EntityWorld, id: EntityId) {
    if let Some(klayman) = world.data_mut::<Klayman>(id) {
        klayman.posture = Posture::Standing;
        klayman.stepping = true;
        klayman.sprite.do_delta_x = klayman.sprite.dest_x < klayman.sprite.x;
    }
    set_cleanup::<Klayman>(world, id, Some(stop_stepping));
}

fn stop_stepping(world: &mut EntityWorld, id: EntityId) {
    if let Some(klayman) = world.data_mut::<Klayman>(id) {
        klayman.stepping = false;
    }
}

fn enter_walk_start(world: &mut EntityWorld, id: EntityId) {
    if let Some(klayman) = world.data_mut::<Klayman>(id) {
        klayman.posture = Posture::Walking;
        klayman.walking = true;
        klayman.sprite.do_delta_x = klayman.sprite.dest_x < klayman.sprite.x;
    }
    set_cleanup::<Klayman>(world, id, Some(stop_walking));
    set_next_state::<Klayman>(world, id, Some(KlaymanState::WalkLoop));
}

fn enter_walk_loop(world: &mut EntityWorld, id: EntityId) {
    if let Some(klayman) = world.data_mut::<Klayman>(id) {
        klayman.posture = Posture::Walking;
        klayman.walking = true;
        klayman.loop_warmup = true;
    }
    set_cleanup::<Klayman>(world, id, Some(stop_walking));
    set_next_state::<Klayman>(world, id, Some(KlaymanState::WalkStop));
}

fn stop_walking(world: &mut EntityWorld, id: EntityId) {
    if let Some(klayman) = world.data_mut::<Klayman>(id) {
        klayman.walking = false;
    }
}

fn walk_loop_tick(world: &mut EntityWorld, id: EntityId) {
    if let Some(klayman) = world.data_mut::<Klayman>(id) {
        if std::mem::take(&mut klayman.loop_warmup) {
            klayman.sprite.cursor.delta_x = 0;
            return;
        }
    }
    walk_tick(world, id);
}

/// Advances toward `dest_x` by at most the frame delta and asks for the
/// stop once the remaining gap fits the current stride phase.
fn walk_tick(world: &mut EntityWorld, id: EntityId) {
    let arrived = {
        let Some(klayman) = world.data_mut::<Klayman>(id) else {
            return;
        };
        let stance = klayman.stop_stance;
        let sprite = &mut klayman.sprite;
        let gap = sprite.dest_x - sprite.x;
        let distance = gap.abs();
        let reach = sprite.cursor.delta_x;
        let step = if gap > reach {
            reach
        } else if gap < -reach {
            -reach
        } else {
            gap
        };
        sprite.cursor.delta_x = 0;

        let frame = sprite.cursor.frame_index;
        let stops = stance != STANCE_NO_STOP && stance != STANCE_RUN;
        let arrived = distance == 0
            || (stops && distance <= STEP_DISTANCE && (5..=11).contains(&frame))
            || (stops && distance <= STOP_NEAR_DISTANCE && (frame >= 12 || frame <= 4))
            || (stance == STANCE_RUN && distance < RUN_STOP_DISTANCE)
            || (stance == STANCE_RUN && distance < RUN_STOP_LATE_DISTANCE && frame >= 6);
        if !arrived {
            move_horizontally(sprite, step);
        }
        arrived
    };
    if arrived {
        world.send_message(id, id, opcode::FINISH_STATE, 0u32);
    }
}

fn enter_walk_stop(world: &mut EntityWorld, id: EntityId) {
    let animation = {
        let Some(klayman) = world.data_mut::<Klayman>(id) else {
            return;
        };
        let stance = klayman.stop_stance;
        if stance == STANCE_NO_STOP || stance == STANCE_RUN {
            None
        } else {
            let distance = (klayman.sprite.dest_x - klayman.sprite.x).abs();
            let frame = klayman.sprite.cursor.frame_index;
            let mid_stride = distance <= STEP_DISTANCE && (5..=11).contains(&frame);
            let standing = stance == STANCE_STANDING;
            klayman.stepping = true;
            klayman.posture = if standing {
                Posture::Standing
            } else {
                Posture::Crouching
            };
            Some(match (mid_stride, standing) {
                (true, true) => KLAYMAN_STOP_FAR_STANDING,
                (true, false) => KLAYMAN_STOP_FAR_CROUCHED,
                (false, true) => KLAYMAN_STOP_NEAR_STANDING,
                (false, false) => KLAYMAN_STOP_NEAR_CROUCHED,
            })
        }
    };

    match animation {
        Some(hash) => {
            start_animation::<Klayman>(world, id, hash);
            set_cleanup::<Klayman>(world, id, Some(stop_stepping));
        }
        None => {
            stop_animation::<Klayman>(world, id);
            finish_state::<Klayman>(world, id);
        }
    }
}

/// Sprite callback of the step and stop animations: closes the remaining
/// gap, steering harder on the stop's plant frame.
fn stop_tick(world: &mut EntityWorld, id: EntityId) {
    let Some(sprite) = sprite_mut::<Klayman>(world, id) else {
        return;
    };
    let mut gap = sprite.dest_x - sprite.x;
    let mut reach = sprite.cursor.delta_x;
    if sprite.cursor.frame_index == STOP_STEER_FRAME {
        if gap > STOP_STEER_SLACK {
            reach += gap - STOP_STEER_SLACK;
        } else if gap < -STOP_STEER_SLACK {
            reach -= gap + STOP_STEER_SLACK;
        }
    }
    if gap > reach {
        gap = reach;
    } else if gap < -reach {
        gap = -reach;
    }
    sprite.cursor.delta_x = 0;
    if sprite.dest_x != sprite.x {
        move_horizontally(sprite, gap);
    }
}

fn crouch_tick(world: &mut EntityWorld, id: EntityId) {
    move_by_frame_delta::<Klayman>(world, id);
    if let Some(sprite) = sprite_mut::<Klayman>(world, id) {
        let gap = sprite.dest_x - sprite.x;
        if gap > CROUCH_APPROACH_PX {
            sprite.x += CROUCH_APPROACH_PX;
        } else if gap < -CROUCH_APPROACH_PX {
            sprite.x -= CROUCH_APPROACH_PX;
        } else {
            sprite.x = sprite.dest_x;
        }
    }
}

enum WalkPlan {
    Finish,
    Retarget,
    Step,
    Walk,
}

/// Moves toward `x`, choosing between finishing in place, a short step and
/// a full walk.
fn walk_to(world: &mut EntityWorld, id: EntityId, x: i32) {
    let plan = {
        let Some(klayman) = world.data_mut::<Klayman>(id) else {
            return;
        };
        let walking = klayman.walking;
        let stepping = klayman.stepping;
        let stance = klayman.stop_stance;
        let moving = walking || stepping;
        let sprite = &mut klayman.sprite;
        let dx = x - sprite.x;
        let distance = dx.abs();
        let toward = (!sprite.do_delta_x && dx > 0) || (sprite.do_delta_x && dx < 0);
        let previous_gap = (sprite.dest_x - sprite.x).abs();
        sprite.dest_x = x;

        if dx == 0 {
            if moving {
                WalkPlan::Retarget
            } else {
                WalkPlan::Finish
            }
        } else if distance <= SNAP_DISTANCE && !moving {
            WalkPlan::Finish
        } else if distance <= STEP_DISTANCE && stance != STANCE_RUN {
            if stepping && toward && previous_gap > distance {
                WalkPlan::Retarget
            } else {
                WalkPlan::Step
            }
        } else if walking && toward {
            WalkPlan::Retarget
        } else {
            WalkPlan::Walk
        }
    };

    match plan {
        WalkPlan::Finish => {
            if let Some(sprite) = sprite_mut::<Klayman>(world, id) {
                sprite.transitions.take_deferred();
            }
            finish_state::<Klayman>(world, id);
        }
        WalkPlan::Retarget => {}
        WalkPlan::Step => goto_state::<Klayman>(world, id, KlaymanState::Step),
        WalkPlan::Walk => goto_state::<Klayman>(world, id, KlaymanState::WalkStart),
    }
}

fn start_pick_up(world: &mut EntityWorld, id: EntityId) {
    let item_x = world
        .data::<Klayman>(id)
        .and_then(|klayman| klayman.attached)
        .and_then(|item| prop_position(world, item))
        .map(|point| point.x);
    if let (Some(item_x), Some(sprite)) = (item_x, sprite_mut::<Klayman>(world, id)) {
        sprite.do_delta_x = item_x < sprite.x;
    }
    goto_state::<Klayman>(world, id, KlaymanState::PickUp);
}

fn select_idle_table(world: &mut EntityWorld, id: EntityId, selector: u32) {
    let table = match selector {
        IDLE_TABLE_STANDARD => STANDARD_IDLE,
        IDLE_TABLE_REDUCED => REDUCED_IDLE,
        IDLE_TABLE_NONE => NO_IDLE,
        _ => return,
    };
    if let Some(klayman) = world.data_mut::<Klayman>(id) {
        klayman.idle_table = table;
    }
}

fn on_frame_event(world: &mut EntityWorld, id: EntityId, frame_hash: u32) {
    let Some((state, attached)) = world
        .data::<Klayman>(id)
        .map(|klayman| (klayman.sprite.state, klayman.attached))
    else {
        return;
    };
    let notify = match (state, frame_hash) {
        (KlaymanState::PressButton(_) | KlaymanState::StepOnButton, FRAME_PRESS_BUTTON) => {
            Some(opcode::BUTTON_PRESSED)
        }
        (KlaymanState::PickUp, FRAME_PICK_UP) => Some(opcode::PICKED_UP),
        _ => None,
    };
    if let (Some(num), Some(target)) = (notify, attached) {
        world.send_message(id, target, num, 0u32);
    }
}

fn klayman_message(world: &mut EntityWorld, id: EntityId, message: &Message) -> u32 {
    let param = message.param.as_integer();
    match message.num {
        opcode::QUERY_INTERRUPTIBLE => {
            return sprite_ref::<Klayman>(world, id).map_or(0, |sprite| u32::from(sprite.interruptible));
        }
        opcode::ATTACH_SPRITE => {
            if let Some(klayman) = world.data_mut::<Klayman>(id) {
                klayman.attached = message.param.as_entity();
            }
        }
        opcode::FINISH_STATE => finish_state::<Klayman>(world, id),
        opcode::LIST_STARTED => {
            if let Some(klayman) = world.data_mut::<Klayman>(id) {
                klayman.stance_overridden = false;
                klayman.stop_stance = STANCE_CROUCHED;
            }
        }
        opcode::LIST_LAST_ENTRY => {
            if let Some(klayman) = world.data_mut::<Klayman>(id) {
                if klayman.stance_overridden {
                    klayman.stop_stance = STANCE_STANDING;
                }
            }
        }
        opcode::SET_STOP_STANCE => {
            if let Some(klayman) = world.data_mut::<Klayman>(id) {
                klayman.stop_stance = param;
                klayman.stance_overridden = true;
            }
            return 1;
        }
        opcode::WALK_TO_CLICK | opcode::WALK_TO => walk_to(world, id, message.param.as_point().x),
        opcode::WALK_TO_POINT => {
            let target = world
                .data::<Klayman>(id)
                .and_then(|klayman| klayman.scene_data.point(param));
            match target {
                Some(point) => walk_to(world, id, point.x),
                None => warn!(point = %format_hash(param), "walk_target_missing"),
            }
        }
        opcode::GOTO_IDLE => goto_state::<Klayman>(world, id, KlaymanState::Idle),
        opcode::PICK_UP => start_pick_up(world, id),
        opcode::PRESS_BUTTON => {
            let state = match param {
                1 => KlaymanState::PressButton(ButtonHeight::High),
                2 => KlaymanState::PressButton(ButtonHeight::Low),
                _ => KlaymanState::StepOnButton,
            };
            goto_state::<Klayman>(world, id, state);
        }
        opcode::SET_FACING => {
            if let Some(sprite) = sprite_mut::<Klayman>(world, id) {
                sprite.do_delta_x = param != 0;
            }
            finish_state::<Klayman>(world, id);
        }
        opcode::FACE_TOWARD => {
            if let Some(sprite) = sprite_mut::<Klayman>(world, id) {
                sprite.do_delta_x = sprite.x > param as i32;
            }
            finish_state::<Klayman>(world, id);
        }
        MSG_HIT_BY_DOOR => goto_state::<Klayman>(world, id, KlaymanState::HitByDoor),
        MSG_SELECT_IDLE_TABLE => select_idle_table(world, id, param),
        opcode::FRAME_EVENT => on_frame_event(world, id, param),
        opcode::ANIMATION_STOP => {
            if matches!(
                current_state::<Klayman>(world, id),
                Some(KlaymanState::Step | KlaymanState::WalkStop)
            ) {
                snap_to_target(world, id);
            }
        }
        _ => {}
    }
    0
}
