use crate::message::Point;

/// Axis-aligned rectangle with inclusive bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rect {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl Rect {
    pub const fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x1 && x <= self.x2 && y >= self.y1 && y <= self.y2
    }

    pub fn is_well_formed(&self) -> bool {
        self.x1 <= self.x2 && self.y1 <= self.y2
    }
}

pub const HIT_RECT_NONE: u16 = 0;
pub const FLOOR: u16 = 0x5001;
pub const SLOPE_UP: u16 = 0x5002;
pub const SLOPE_DOWN: u16 = 0x5003;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HitRect {
    pub rect: Rect,
    pub kind: u16,
}

impl HitRect {
    pub const NONE: HitRect = HitRect {
        rect: Rect::new(0, 0, 0, 0),
        kind: HIT_RECT_NONE,
    };

    pub fn is_slope(&self) -> bool {
        self.kind == SLOPE_UP || self.kind == SLOPE_DOWN
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HitRectList {
    rects: Vec<HitRect>,
}

impl HitRectList {
    pub fn new(rects: Vec<HitRect>) -> Self {
        Self { rects }
    }

    pub fn rects(&self) -> &[HitRect] {
        &self.rects
    }

    /// First rect in authoring order containing the point, else [`HitRect::NONE`].
    pub fn find_hit_rect_at_pos(&self, x: i32, y: i32) -> HitRect {
        self.rects
            .iter()
            .find(|hit| hit.rect.contains(x, y))
            .copied()
            .unwrap_or(HitRect::NONE)
    }
}

/// Floor-following y after a horizontal move of `moved_dx` that landed on `x`.
///
/// `prev` is the rect under the position before the move and `next` the rect
/// under the new position at the old y.
pub fn clamp_to_floor(prev: HitRect, next: HitRect, x: i32, y: i32, moved_dx: i32) -> i32 {
    match next.kind {
        SLOPE_UP => (next.rect.y2 - (next.rect.x2 - x) / 2).max(next.rect.y1),
        SLOPE_DOWN => (next.rect.y2 - (x - next.rect.x1) / 2).max(next.rect.y1),
        _ => match prev.kind {
            SLOPE_UP if moved_dx > 0 => prev.rect.y2,
            SLOPE_UP => prev.rect.y1,
            SLOPE_DOWN if moved_dx < 0 => prev.rect.y2,
            SLOPE_DOWN => prev.rect.y1,
            _ => y,
        },
    }
}

/// Moves horizontally by `dx` and re-seats y on the floor described by `rects`.
pub fn step_along_floor(rects: &HitRectList, x: i32, y: i32, dx: i32) -> (i32, i32) {
    let prev = rects.find_hit_rect_at_pos(x, y);
    let next_x = x + dx;
    let next = rects.find_hit_rect_at_pos(next_x, y);
    (next_x, clamp_to_floor(prev, next, next_x, y, dx))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubRect {
    pub rect: Rect,
    pub message_list: u32,
}

/// Player-position rect with the mouse regions that apply while the player
/// stands inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RectListItem {
    pub rect: Rect,
    pub sub_rects: Vec<SubRect>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RectList {
    pub items: Vec<RectListItem>,
}

impl RectList {
    pub fn message_list_at(&self, player: Point, mouse: Point) -> Option<u32> {
        self.items
            .iter()
            .filter(|item| item.rect.contains(player.x, player.y))
            .flat_map(|item| item.sub_rects.iter())
            .find(|sub| sub.rect.contains(mouse.x, mouse.y))
            .map(|sub| sub.message_list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(x1: i32, y1: i32, x2: i32, y2: i32, kind: u16) -> HitRect {
        HitRect {
            rect: Rect::new(x1, y1, x2, y2),
            kind,
        }
    }

    #[test]
    fn lookup_prefers_first_rect_at_shared_boundary() {
        let rects = HitRectList::new(vec![
            hit(0, 400, 100, 480, FLOOR),
            hit(100, 400, 200, 480, SLOPE_UP),
        ]);
        assert_eq!(rects.find_hit_rect_at_pos(100, 440).kind, FLOOR);
        assert_eq!(rects.find_hit_rect_at_pos(101, 440).kind, SLOPE_UP);
        assert_eq!(rects.find_hit_rect_at_pos(500, 440), HitRect::NONE);
    }

    #[test]
    fn slope_up_rises_toward_right_edge() {
        let slope = hit(100, 400, 200, 480, SLOPE_UP);
        assert_eq!(clamp_to_floor(HitRect::NONE, slope, 200, 0, 1), 480);
        assert_eq!(clamp_to_floor(HitRect::NONE, slope, 160, 0, 1), 460);
        // Clamped by y1 far from the right edge.
        let steep = hit(0, 470, 200, 480, SLOPE_UP);
        assert_eq!(clamp_to_floor(HitRect::NONE, steep, 0, 0, 1), 470);
    }

    #[test]
    fn slope_down_falls_from_left_edge() {
        let slope = hit(100, 400, 200, 480, SLOPE_DOWN);
        assert_eq!(clamp_to_floor(HitRect::NONE, slope, 100, 0, -1), 480);
        assert_eq!(clamp_to_floor(HitRect::NONE, slope, 140, 0, -1), 460);
    }

    #[test]
    fn leaving_a_slope_snaps_by_direction() {
        let up = hit(100, 400, 200, 480, SLOPE_UP);
        let floor = hit(201, 400, 300, 480, FLOOR);
        assert_eq!(clamp_to_floor(up, floor, 205, 470, 5), 480);
        assert_eq!(clamp_to_floor(up, floor, 95, 470, -5), 400);
        let down = hit(100, 400, 200, 480, SLOPE_DOWN);
        assert_eq!(clamp_to_floor(down, floor, 95, 470, -5), 480);
        assert_eq!(clamp_to_floor(down, floor, 205, 470, 5), 400);
    }

    #[test]
    fn flat_floor_keeps_y() {
        let floor = hit(0, 400, 640, 480, FLOOR);
        assert_eq!(clamp_to_floor(floor, floor, 50, 438, 8), 438);
    }

    #[test]
    fn step_along_floor_follows_slope() {
        let rects = HitRectList::new(vec![hit(0, 300, 100, 480, FLOOR), hit(101, 300, 200, 480, SLOPE_DOWN)]);
        let (x, y) = step_along_floor(&rects, 96, 470, 9);
        assert_eq!(x, 105);
        assert_eq!(y, 478);
    }

    #[test]
    fn rect_list_matches_player_then_mouse() {
        let list = RectList {
            items: vec![RectListItem {
                rect: Rect::new(0, 0, 320, 480),
                sub_rects: vec![
                    SubRect {
                        rect: Rect::new(0, 0, 100, 100),
                        message_list: 0xA,
                    },
                    SubRect {
                        rect: Rect::new(0, 0, 640, 480),
                        message_list: 0xB,
                    },
                ],
            }],
        };
        assert_eq!(list.message_list_at(Point::new(10, 10), Point::new(50, 50)), Some(0xA));
        assert_eq!(list.message_list_at(Point::new(10, 10), Point::new(500, 50)), Some(0xB));
        assert_eq!(list.message_list_at(Point::new(400, 10), Point::new(50, 50)), None);
    }
}
