use serde::{Deserialize, Serialize};

use crate::world::EntityId;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Payload of a message. Which variant an opcode carries is a per-opcode
/// contract; mismatched reads fall back to a neutral value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageParam {
    Integer(u32),
    Point(Point),
    Entity(EntityId),
}

impl Default for MessageParam {
    fn default() -> Self {
        Self::Integer(0)
    }
}

impl MessageParam {
    pub fn as_integer(&self) -> u32 {
        match self {
            Self::Integer(value) => *value,
            _ => 0,
        }
    }

    pub fn as_point(&self) -> Point {
        match self {
            Self::Point(point) => *point,
            _ => Point::default(),
        }
    }

    pub fn as_entity(&self) -> Option<EntityId> {
        match self {
            Self::Entity(id) => Some(*id),
            _ => None,
        }
    }
}

impl From<u32> for MessageParam {
    fn from(value: u32) -> Self {
        Self::Integer(value)
    }
}

impl From<Point> for MessageParam {
    fn from(value: Point) -> Self {
        Self::Point(value)
    }
}

impl From<EntityId> for MessageParam {
    fn from(value: EntityId) -> Self {
        Self::Entity(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Message {
    pub num: u32,
    pub param: MessageParam,
    pub sender: EntityId,
}

/// Opcodes interpreted by the runtime core and the shipped content.
///
/// The space is open: any other value is a valid opcode that handlers may
/// simply ignore.
pub mod opcode {
    pub const MOUSE_MOVE: u32 = 0x0000;
    pub const MOUSE_CLICK: u32 = 0x0001;
    pub const SPRITE_FINISHED: u32 = 0x1006;
    pub const QUERY_INTERRUPTIBLE: u32 = 0x1008;
    pub const LEAVE_MODULE: u32 = 0x1009;
    pub const PRELOAD_HINT: u32 = 0x100A;
    pub const FRAME_EVENT: u32 = 0x100D;
    pub const HOTSPOT_CLICK: u32 = 0x1011;
    pub const ATTACH_SPRITE: u32 = 0x1014;
    pub const FINISH_STATE: u32 = 0x1019;
    pub const LIST_STATUS_FREE: u32 = 0x101A;
    pub const LIST_STATUS_LOCKED: u32 = 0x101B;
    pub const LIST_STARTED: u32 = 0x101C;
    pub const DISABLE_INPUT: u32 = 0x1020;
    pub const LIST_LAST_ENTRY: u32 = 0x1021;
    pub const SET_PRIORITY: u32 = 0x1022;
    pub const PRELOAD_RELEASE: u32 = 0x1023;
    pub const PRELOAD_SCENE: u32 = 0x1024;
    pub const SCENE_LOCAL_FIRST: u32 = 0x2000;
    pub const SCENE_LOCAL_LAST: u32 = 0x2FFF;
    pub const ANIMATION_STOP: u32 = 0x3002;
    pub const WALK_TO_CLICK: u32 = 0x4001;
    pub const LIST_NO_OP: u32 = 0x4003;
    pub const GOTO_IDLE: u32 = 0x4004;
    pub const WALK_TO: u32 = 0x4800;
    pub const PICKED_UP: u32 = 0x4806;
    pub const OPEN_DOOR: u32 = 0x4808;
    pub const CLOSE_DOOR: u32 = 0x4809;
    pub const BUTTON_PRESSED: u32 = 0x480B;
    pub const PICK_UP: u32 = 0x4812;
    pub const PRESS_BUTTON: u32 = 0x4816;
    pub const SET_FACING: u32 = 0x4817;
    pub const WALK_TO_POINT: u32 = 0x4818;
    pub const SET_STOP_STANCE: u32 = 0x481C;
    pub const ITEM_CLICKED: u32 = 0x4826;
    pub const FACE_TOWARD: u32 = 0x482D;
}
