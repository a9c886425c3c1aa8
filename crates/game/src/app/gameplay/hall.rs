const HALL_FOREGROUND: u32 = 0x00502330;
const HALL_DOOR_FRAME: u32 = 0x78492010;
const DOOR_OPEN: u32 = 0x0C202B9C;
const DOOR_CLOSE: u32 = 0xC222A8D4;
const BUTTON_UP: u32 = 0x72427010;
const BUTTON_DOWN: u32 = 0x32423010;
const TAPE_ANIMATION: u32 = 0x9148A011;
const DOOR_HIT_EFFECT: u32 = 0x0422255A;

/// Sub-var table of collected tapes, keyed by tape number.
const V_TAPES_TAKEN: u32 = 0x02038314;

const LIST_ENTER_RESTORED: u32 = 0x004B8E48;
const LIST_ENTER_FROM_PASSAGE: u32 = 0x004B8E50;
const LIST_ENTER_LEFT: u32 = 0x004B8EA0;
const LIST_ENTER_LEFT_TAPES: u32 = 0x004B8EB0;
const LIST_ENTER_LEFT_CORNER: u32 = 0x004B8F58;
const LIST_HIT_BY_DOOR: u32 = 0x004B8F48;
const LIST_LEAVE_THROUGH_DOOR: u32 = 0x004B8F50;
const LIST_APPROACH_TAPES: u32 = 0x004B8F00;
const LIST_PICK_UP_TAPE: u32 = 0x004B8F78;

const RECT_LIST_HALL: u32 = 0x004B8FF8;
const RECT_LIST_HALL_RESTRICTED: u32 = 0x004B9008;

const FRAME_ATTACH_BUTTON: u32 = 0x02144CB1;

/// Scene-local opcodes.
const MSG_SELECT_AREA: u32 = 0x2000;
const MSG_PLAY_HIT_EFFECT: u32 = 0x2001;

const DOOR_OPENED_BY_BUTTON: u32 = 0;
const DOOR_CLOSED: u32 = 1;
const DOOR_OPEN_ON_ENTRY: u32 = 2;

const DOOR_BUTTON_TICKS: u32 = 90;
const DOOR_ENTRY_TICKS: u32 = 48;
const BUTTON_RESET_TICKS: u32 = 16;

const PRIORITY_DOOR: i32 = 100;
const PRIORITY_PLAYER: i32 = 1000;
const PRIORITY_BUTTON_PRESSED: i32 = 990;
const PRIORITY_BUTTON: i32 = 1010;
const PRIORITY_FOREGROUND: i32 = 1100;
const PRIORITY_HIT_EFFECT: i32 = 1200;

const HALL_FLOOR_Y: i32 = 438;
const HIT_EFFECT_RAISE: i32 = 132;
const CLIP_RIGHT_DEFAULT: i32 = 639;
const TAPE_ENTRY_MIN_X: i32 = 228;
const TAPE_ENTRY_MAX_X: i32 = 500;
const DOOR_LEAVE_MIN_X: i32 = 470;
const DOOR_SLAM_MIN_X: i32 = 480;
const DOOR_SLAM_MAX_X: i32 = 575;

const FLOOR_BUTTON_DEFAULT: Point = Point::new(276, 438);

struct TapeSpec {
    number: u32,
    position: Point,
    hotspot: Rect,
}

const HALL_TAPES: [TapeSpec; 2] = [
    TapeSpec {
        number: 18,
        position: Point::new(412, 443),
        hotspot: Rect::new(397, 433, 427, 453),
    },
    TapeSpec {
        number: 11,
        position: Point::new(441, 443),
        hotspot: Rect::new(426, 433, 456, 453),
    },
];

fn door_status_key() -> u32 {
    name_hash("doorStatus")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct StillImage(u32);

/// A fixed image drawn over the room.
pub(crate) struct Backdrop {
    sprite: AnimatedSprite<StillImage>,
}

impl Backdrop {
    fn new(hash: u32) -> Self {
        Self {
            sprite: AnimatedSprite::new(320, 480, StillImage(hash)),
        }
    }
}

impl SpriteClass for Backdrop {
    type State = StillImage;

    fn sprite(&self) -> &AnimatedSprite<StillImage> {
        &self.sprite
    }

    fn sprite_mut(&mut self) -> &mut AnimatedSprite<StillImage> {
        &mut self.sprite
    }

    fn behavior(state: StillImage) -> StateBehavior<StillImage> {
        StateBehavior {
            animation: Some(state.0),
            end: AnimationEnd::Hold,
            ..StateBehavior::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DoorState {
    Hidden,
    /// Already open when the scene starts.
    Open,
    Opening,
    Closing,
}

pub(crate) struct Door {
    sprite: AnimatedSprite<DoorState>,
}

impl Door {
    fn new() -> Self {
        Self {
            sprite: AnimatedSprite::new(320, 240, DoorState::Hidden),
        }
    }
}

impl SpriteClass for Door {
    type State = DoorState;

    fn sprite(&self) -> &AnimatedSprite<DoorState> {
        &self.sprite
    }

    fn sprite_mut(&mut self) -> &mut AnimatedSprite<DoorState> {
        &mut self.sprite
    }

    fn behavior(state: DoorState) -> StateBehavior<DoorState> {
        let base = StateBehavior {
            on_message: Some(door_message),
            ..StateBehavior::default()
        };
        match state {
            DoorState::Hidden => StateBehavior {
                on_enter: Some(hide_door),
                ..base
            },
            DoorState::Open => StateBehavior {
                end: AnimationEnd::Hold,
                on_enter: Some(show_door_opened),
                ..base
            },
            DoorState::Opening => StateBehavior {
                animation: Some(DOOR_OPEN),
                end: AnimationEnd::Hold,
                on_enter: Some(show_door),
                ..base
            },
            DoorState::Closing => StateBehavior {
                animation: Some(DOOR_CLOSE),
                end: AnimationEnd::Finish,
                on_enter: Some(enter_door_closing),
                ..base
            },
        }
    }
}

fn hide_door(world: &mut EntityWorld, id: EntityId) {
    stop_animation::<Door>(world, id);
    if let Some(sprite) = sprite_mut::<Door>(world, id) {
        sprite.visible = false;
    }
}

fn show_door(world: &mut EntityWorld, id: EntityId) {
    if let Some(sprite) = sprite_mut::<Door>(world, id) {
        sprite.visible = true;
    }
}

fn show_door_opened(world: &mut EntityWorld, id: EntityId) {
    show_door(world, id);
    start_animation_range::<Door>(world, id, DOOR_OPEN, usize::MAX, None);
}

fn enter_door_closing(world: &mut EntityWorld, id: EntityId) {
    show_door(world, id);
    set_next_state::<Door>(world, id, Some(DoorState::Hidden));
}

fn door_message(world: &mut EntityWorld, id: EntityId, message: &Message) -> u32 {
    match message.num {
        opcode::OPEN_DOOR => goto_state::<Door>(world, id, DoorState::Opening),
        opcode::CLOSE_DOOR => goto_state::<Door>(world, id, DoorState::Closing),
        _ => {}
    }
    0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ButtonState {
    Up,
    Down,
}

/// Floor switch that opens the door.
pub(crate) struct FloorButton {
    sprite: AnimatedSprite<ButtonState>,
    countdown: u32,
}

impl FloorButton {
    fn new(at: Point) -> Self {
        Self {
            sprite: AnimatedSprite::new(at.x, at.y, ButtonState::Up),
            countdown: 0,
        }
    }
}

impl SpriteClass for FloorButton {
    type State = ButtonState;

    fn sprite(&self) -> &AnimatedSprite<ButtonState> {
        &self.sprite
    }

    fn sprite_mut(&mut self) -> &mut AnimatedSprite<ButtonState> {
        &mut self.sprite
    }

    fn behavior(state: ButtonState) -> StateBehavior<ButtonState> {
        let base = StateBehavior {
            end: AnimationEnd::Hold,
            on_message: Some(button_message),
            ..StateBehavior::default()
        };
        match state {
            ButtonState::Up => StateBehavior {
                animation: Some(BUTTON_UP),
                ..base
            },
            ButtonState::Down => StateBehavior {
                animation: Some(BUTTON_DOWN),
                on_enter: Some(enter_button_down),
                on_tick: Some(button_down_tick),
                ..base
            },
        }
    }
}

fn enter_button_down(world: &mut EntityWorld, id: EntityId) {
    if let Some(button) = world.data_mut::<FloorButton>(id) {
        button.countdown = BUTTON_RESET_TICKS;
    }
}

fn button_down_tick(world: &mut EntityWorld, id: EntityId) {
    let released = match world.data_mut::<FloorButton>(id) {
        Some(button) if button.countdown > 0 => {
            button.countdown -= 1;
            button.countdown == 0
        }
        _ => false,
    };
    if !released {
        return;
    }
    if let Some(scene) = world.parent(id) {
        world.send_message(id, scene, opcode::SET_PRIORITY, PRIORITY_BUTTON as u32);
    }
    goto_state::<FloorButton>(world, id, ButtonState::Up);
}

fn button_message(world: &mut EntityWorld, id: EntityId, message: &Message) -> u32 {
    if message.num != opcode::BUTTON_PRESSED {
        return 0;
    }
    if let Some(scene) = world.parent(id) {
        world.send_message(id, scene, opcode::BUTTON_PRESSED, 0u32);
        world.send_message(id, scene, opcode::SET_PRIORITY, PRIORITY_BUTTON_PRESSED as u32);
    }
    goto_state::<FloorButton>(world, id, ButtonState::Down);
    0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TapeState {
    Lying,
    Taken,
}

pub(crate) struct Tape {
    sprite: AnimatedSprite<TapeState>,
    number: u32,
}

impl SpriteClass for Tape {
    type State = TapeState;

    fn sprite(&self) -> &AnimatedSprite<TapeState> {
        &self.sprite
    }

    fn sprite_mut(&mut self) -> &mut AnimatedSprite<TapeState> {
        &mut self.sprite
    }

    fn behavior(state: TapeState) -> StateBehavior<TapeState> {
        match state {
            TapeState::Lying => StateBehavior {
                animation: Some(TAPE_ANIMATION),
                end: AnimationEnd::Hold,
                on_message: Some(tape_message),
                ..StateBehavior::default()
            },
            TapeState::Taken => StateBehavior {
                on_enter: Some(hide_tape),
                ..StateBehavior::default()
            },
        }
    }
}

fn hide_tape(world: &mut EntityWorld, id: EntityId) {
    stop_animation::<Tape>(world, id);
    if let Some(sprite) = sprite_mut::<Tape>(world, id) {
        sprite.visible = false;
    }
    world.set_message_handler(id, None);
}

fn tape_message(world: &mut EntityWorld, id: EntityId, message: &Message) -> u32 {
    match message.num {
        opcode::HOTSPOT_CLICK => {
            if let Some(scene) = world.parent(id) {
                world.send_message(id, scene, opcode::ITEM_CLICKED, 0u32);
            }
            1
        }
        opcode::PICKED_UP => {
            if let Some(number) = world.data::<Tape>(id).map(|tape| tape.number) {
                world.services.vars.set_sub_var(V_TAPES_TAKEN, number, 1);
                info!(tape = number, "tape_taken");
            }
            goto_state::<Tape>(world, id, TapeState::Taken);
            0
        }
        _ => 0,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HitEffectState {
    Hidden,
    Playing,
}

/// Flash shown over the player when the door slams on them.
pub(crate) struct HitEffect {
    sprite: AnimatedSprite<HitEffectState>,
    player: EntityId,
}

impl SpriteClass for HitEffect {
    type State = HitEffectState;

    fn sprite(&self) -> &AnimatedSprite<HitEffectState> {
        &self.sprite
    }

    fn sprite_mut(&mut self) -> &mut AnimatedSprite<HitEffectState> {
        &mut self.sprite
    }

    fn behavior(state: HitEffectState) -> StateBehavior<HitEffectState> {
        let base = StateBehavior {
            on_message: Some(hit_effect_message),
            ..StateBehavior::default()
        };
        match state {
            HitEffectState::Hidden => StateBehavior {
                on_enter: Some(hide_hit_effect),
                ..base
            },
            HitEffectState::Playing => StateBehavior {
                animation: Some(DOOR_HIT_EFFECT),
                end: AnimationEnd::Goto(HitEffectState::Hidden),
                on_enter: Some(show_hit_effect),
                ..base
            },
        }
    }
}

fn hide_hit_effect(world: &mut EntityWorld, id: EntityId) {
    stop_animation::<HitEffect>(world, id);
    if let Some(sprite) = sprite_mut::<HitEffect>(world, id) {
        sprite.visible = false;
    }
}

fn show_hit_effect(world: &mut EntityWorld, id: EntityId) {
    let Some(player) = world.data::<HitEffect>(id).map(|effect| effect.player) else {
        return;
    };
    let at = sprite_ref::<Klayman>(world, player).map(|sprite| Point::new(sprite.x, sprite.y));
    if let Some(sprite) = sprite_mut::<HitEffect>(world, id) {
        if let Some(at) = at {
            sprite.x = at.x;
            sprite.y = at.y - HIT_EFFECT_RAISE;
        }
        sprite.visible = true;
    }
}

fn hit_effect_message(world: &mut EntityWorld, id: EntityId, message: &Message) -> u32 {
    if message.num == MSG_PLAY_HIT_EFFECT {
        goto_state::<HitEffect>(world, id, HitEffectState::Playing);
    }
    0
}

/// Where the player should stand to reach a hall prop.
pub(crate) fn prop_position(world: &EntityWorld, id: EntityId) -> Option<Point> {
    let at = |x: i32, y: i32| Point::new(x, y);
    sprite_ref::<Tape>(world, id)
        .map(|sprite| at(sprite.x, sprite.y))
        .or_else(|| sprite_ref::<FloorButton>(world, id).map(|sprite| at(sprite.x, sprite.y)))
        .or_else(|| sprite_ref::<Door>(world, id).map(|sprite| at(sprite.x, sprite.y)))
}

#[derive(Debug, Clone, Copy)]
struct HallProps {
    door: EntityId,
    button: EntityId,
    tapes: [EntityId; 2],
    hit_effect: EntityId,
}

/// How the hall is set up for each way of entering it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HallEntry {
    player_x: i32,
    message_list: u32,
    restricted: bool,
    door: DoorState,
    door_status: u32,
    countdown: u32,
}

fn hall_entry(which: i32) -> HallEntry {
    let from_left = |message_list| HallEntry {
        player_x: 115,
        message_list,
        restricted: true,
        door: DoorState::Hidden,
        door_status: DOOR_CLOSED,
        countdown: 0,
    };
    match which {
        which if which < 0 => HallEntry {
            player_x: 380,
            message_list: LIST_ENTER_RESTORED,
            restricted: false,
            door: DoorState::Hidden,
            door_status: DOOR_CLOSED,
            countdown: 0,
        },
        1 => HallEntry {
            player_x: 640,
            message_list: LIST_ENTER_FROM_PASSAGE,
            restricted: false,
            door: DoorState::Open,
            door_status: DOOR_OPEN_ON_ENTRY,
            countdown: DOOR_ENTRY_TICKS,
        },
        2 => from_left(LIST_ENTER_LEFT_CORNER),
        3 => from_left(LIST_ENTER_LEFT_TAPES),
        _ => from_left(LIST_ENTER_LEFT),
    }
}

/// The hall with the door, its floor button and two tapes.
pub(crate) struct HallScene {
    scene: Scene,
    props: Option<HallProps>,
    door_countdown: u32,
}

impl SceneClass for HallScene {
    fn scene(&self) -> &Scene {
        &self.scene
    }

    fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    fn handle_message(world: &mut EntityWorld, id: EntityId, message: &Message) -> u32 {
        hall_message(world, id, message)
    }

    fn before_update(world: &mut EntityWorld, id: EntityId) {
        hall_tick(world, id);
    }
}

pub(crate) fn spawn_hall_scene(
    world: &mut EntityWorld,
    parent: EntityId,
    data: Arc<SceneData>,
    which: i32,
) -> EntityId {
    let entry = hall_entry(which);
    let scene = spawn_scene(
        world,
        Some(parent),
        HallScene {
            scene: Scene::new(Arc::clone(&data)),
            props: None,
            door_countdown: 0,
        },
    );

    insert_sprite::<HallScene, Backdrop>(
        world,
        scene,
        Backdrop::new(HALL_FOREGROUND),
        StillImage(HALL_FOREGROUND),
        PRIORITY_FOREGROUND,
    );
    insert_sprite::<HallScene, Backdrop>(
        world,
        scene,
        Backdrop::new(HALL_DOOR_FRAME),
        StillImage(HALL_DOOR_FRAME),
        PRIORITY_FOREGROUND,
    );

    let button_at = data
        .point(name_hash("floorButton"))
        .unwrap_or(FLOOR_BUTTON_DEFAULT);
    let button = insert_sprite::<HallScene, FloorButton>(
        world,
        scene,
        FloorButton::new(button_at),
        ButtonState::Up,
        PRIORITY_BUTTON,
    );

    let tapes = HALL_TAPES.map(|spec| spawn_tape(world, scene, &spec));

    let clip_right = data
        .point(name_hash("klaymanClip"))
        .map_or(CLIP_RIGHT_DEFAULT, |point| point.x);
    let player = insert_player::<HallScene, Klayman>(
        world,
        scene,
        Klayman::new(entry.player_x, HALL_FLOOR_Y, Arc::clone(&data))
            .with_clip_rect(Rect::new(0, 0, clip_right, 480)),
        KlaymanState::Idle,
        PRIORITY_PLAYER,
    );
    if entry.restricted {
        world.send_message(scene, player, MSG_SELECT_IDLE_TABLE, IDLE_TABLE_STANDARD);
    }

    set_message_list::<HallScene>(world, scene, entry.message_list);
    send_to_self(world, scene, MSG_SELECT_AREA, u32::from(entry.restricted));

    let door = insert_sprite::<HallScene, Door>(world, scene, Door::new(), entry.door, PRIORITY_DOOR);
    let hit_effect = insert_sprite::<HallScene, HitEffect>(
        world,
        scene,
        HitEffect {
            sprite: AnimatedSprite::new(0, 0, HitEffectState::Hidden),
            player,
        },
        HitEffectState::Hidden,
        PRIORITY_HIT_EFFECT,
    );

    if let Some(hall) = world.data_mut::<HallScene>(scene) {
        hall.props = Some(HallProps {
            door,
            button,
            tapes,
            hit_effect,
        });
        hall.door_countdown = entry.countdown;
        hall.scene.set_local(door_status_key(), entry.door_status);
    }
    info!(scene = %scene, which, "hall_scene_created");
    scene
}

fn spawn_tape(world: &mut EntityWorld, scene: EntityId, spec: &TapeSpec) -> EntityId {
    let taken = world.services.vars.sub_var(V_TAPES_TAKEN, spec.number) != 0;
    let initial = if taken { TapeState::Taken } else { TapeState::Lying };
    let tape = insert_sprite::<HallScene, Tape>(
        world,
        scene,
        Tape {
            sprite: AnimatedSprite::new(spec.position.x, spec.position.y, initial),
            number: spec.number,
        },
        initial,
        PRIORITY_FOREGROUND,
    );
    if !taken {
        add_hotspot::<HallScene>(world, scene, tape, spec.hotspot);
    }
    tape
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DoorAction {
    Close,
    /// Close on the player while they stand in the doorway.
    Slam,
    Leave,
}

fn hall_tick(world: &mut EntityWorld, id: EntityId) {
    let Some(player_at) = player_position::<HallScene>(world, id) else {
        return;
    };
    let key = door_status_key();
    let (action, props, player) = {
        let Some(hall) = world.data_mut::<HallScene>(id) else {
            return;
        };
        let Some(props) = hall.props else {
            return;
        };
        let status = hall.scene.local(key);
        let action = if hall.door_countdown != 0 {
            if status != DOOR_OPEN_ON_ENTRY && player_at.x > DOOR_SLAM_MAX_X {
                hall.scene.can_accept_input = false;
            }
            hall.door_countdown -= 1;
            match hall.door_countdown {
                0 if status == DOOR_OPEN_ON_ENTRY || player_at.x < DOOR_SLAM_MIN_X => {
                    Some(DoorAction::Close)
                }
                // Past the doorway the door stays open for the way through.
                0 if player_at.x <= DOOR_SLAM_MAX_X => Some(DoorAction::Slam),
                _ => None,
            }
        } else if status == DOOR_CLOSED
            && hall.scene.message_value >= 0
            && player_at.x > DOOR_LEAVE_MIN_X
        {
            Some(DoorAction::Leave)
        } else {
            None
        };
        if matches!(action, Some(DoorAction::Close | DoorAction::Slam)) {
            hall.scene.set_local(key, DOOR_CLOSED);
        }
        (action, props, hall.scene.player)
    };

    match action {
        Some(DoorAction::Close) => {
            world.send_message(id, props.door, opcode::CLOSE_DOOR, 0u32);
            debug!(scene = %id, "hall_door_closed");
        }
        Some(DoorAction::Slam) => {
            if let Some(sprite) = player.and_then(|player| sprite_mut::<Klayman>(world, player)) {
                sprite.do_delta_x = false;
            }
            set_message_list2::<HallScene>(world, id, LIST_HIT_BY_DOOR);
            world.send_message(id, props.door, opcode::CLOSE_DOOR, 0u32);
            world.send_message(id, props.hit_effect, MSG_PLAY_HIT_EFFECT, 0u32);
            info!(scene = %id, x = player_at.x, "hall_door_slammed");
        }
        Some(DoorAction::Leave) => {
            set_message_list2::<HallScene>(world, id, LIST_LEAVE_THROUGH_DOOR);
        }
        None => {}
    }
}

fn hall_message(world: &mut EntityWorld, id: EntityId, message: &Message) -> u32 {
    let Some((props, player)) = world
        .data::<HallScene>(id)
        .and_then(|hall| hall.props.map(|props| (props, hall.scene.player)))
    else {
        return handle_area_message(world, id, message);
    };

    match message.num {
        opcode::FRAME_EVENT if message.param.as_integer() == FRAME_ATTACH_BUTTON => {
            if let Some(player) = player {
                world.send_entity_message(id, player, opcode::ATTACH_SPRITE, props.button);
            }
        }
        opcode::BUTTON_PRESSED if message.sender == props.button => {
            let key = door_status_key();
            let opened = match world.data_mut::<HallScene>(id) {
                Some(hall) if hall.scene.local(key) == DOOR_CLOSED => {
                    hall.scene.set_local(key, DOOR_OPENED_BY_BUTTON);
                    hall.door_countdown = DOOR_BUTTON_TICKS;
                    true
                }
                _ => false,
            };
            if opened {
                world.send_message(id, props.door, opcode::OPEN_DOOR, 0u32);
                info!(scene = %id, "hall_door_opened");
            }
        }
        opcode::ITEM_CLICKED if props.tapes.contains(&message.sender) => {
            let Some(player_x) = player_position::<HallScene>(world, id).map(|at| at.x) else {
                return 0;
            };
            if (TAPE_ENTRY_MIN_X..=TAPE_ENTRY_MAX_X).contains(&player_x) {
                if let Some(player) = player {
                    world.send_entity_message(id, player, opcode::ATTACH_SPRITE, message.sender);
                }
                set_message_list::<HallScene>(world, id, LIST_PICK_UP_TAPE);
            } else if player_x < TAPE_ENTRY_MIN_X {
                set_message_list2::<HallScene>(world, id, LIST_APPROACH_TAPES);
            }
        }
        _ => return handle_area_message(world, id, message),
    }
    0
}

/// Switches the clickable areas and the player's fidgets between the open
/// hall and the restricted corner.
fn handle_area_message(world: &mut EntityWorld, id: EntityId, message: &Message) -> u32 {
    if message.num != MSG_SELECT_AREA {
        return 0;
    }
    let (rect_list, idle_table) = if message.param.as_integer() != 0 {
        (RECT_LIST_HALL_RESTRICTED, IDLE_TABLE_NONE)
    } else {
        (RECT_LIST_HALL, IDLE_TABLE_STANDARD)
    };
    let player = scene_mut::<HallScene>(world, id).and_then(|scene| {
        scene.set_rect_list(Some(rect_list));
        scene.player
    });
    if let Some(player) = player {
        world.send_message(id, player, MSG_SELECT_IDLE_TABLE, idle_table);
    }
    0
}
