use winit::event::{ElementState, MouseButton};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::message::Point;

/// Input seen by one simulation tick. Presses are edge-triggered: a held
/// button or key reports exactly one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputSnapshot {
    quit_requested: bool,
    cursor: Option<Point>,
    click: Option<Point>,
    save_pressed: bool,
    load_pressed: bool,
}

impl InputSnapshot {
    pub fn new(
        quit_requested: bool,
        cursor: Option<Point>,
        click: Option<Point>,
        save_pressed: bool,
        load_pressed: bool,
    ) -> Self {
        Self {
            quit_requested,
            cursor,
            click,
            save_pressed,
            load_pressed,
        }
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    /// Cursor in framebuffer pixels, if inside the window.
    pub fn cursor(&self) -> Option<Point> {
        self.cursor
    }

    /// Framebuffer position of a left click pressed since the last tick.
    pub fn click(&self) -> Option<Point> {
        self.click
    }

    pub fn save_pressed(&self) -> bool {
        self.save_pressed
    }

    pub fn load_pressed(&self) -> bool {
        self.load_pressed
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct EdgeKey {
    is_down: bool,
    pressed: bool,
}

impl EdgeKey {
    fn apply(&mut self, state: ElementState) {
        match state {
            ElementState::Pressed => {
                if !self.is_down {
                    self.pressed = true;
                }
                self.is_down = true;
            }
            ElementState::Released => self.is_down = false,
        }
    }

    fn take(&mut self) -> bool {
        std::mem::take(&mut self.pressed)
    }
}

/// Accumulates window events between ticks.
#[derive(Debug, Default)]
pub(crate) struct InputCollector {
    pub(crate) quit_requested: bool,
    save_key: EdgeKey,
    load_key: EdgeKey,
    left_button: EdgeKey,
    cursor_px: Option<(f64, f64)>,
    click_px: Option<(f64, f64)>,
    window_width: u32,
    window_height: u32,
    framebuffer_width: u32,
    framebuffer_height: u32,
}

impl InputCollector {
    pub(crate) fn new(window: (u32, u32), framebuffer: (u32, u32)) -> Self {
        Self {
            window_width: window.0,
            window_height: window.1,
            framebuffer_width: framebuffer.0,
            framebuffer_height: framebuffer.1,
            ..Self::default()
        }
    }

    pub(crate) fn mark_quit_requested(&mut self) {
        self.quit_requested = true;
    }

    pub(crate) fn set_window_size(&mut self, width: u32, height: u32) {
        self.window_width = width;
        self.window_height = height;
    }

    pub(crate) fn set_cursor_position_px(&mut self, x: f64, y: f64) {
        self.cursor_px = Some((x, y));
    }

    pub(crate) fn clear_cursor_position(&mut self) {
        self.cursor_px = None;
    }

    pub(crate) fn handle_key(&mut self, key: PhysicalKey, state: ElementState) {
        match key {
            PhysicalKey::Code(KeyCode::F5) => self.save_key.apply(state),
            PhysicalKey::Code(KeyCode::F9) => self.load_key.apply(state),
            PhysicalKey::Code(KeyCode::Escape) if state == ElementState::Pressed => {
                self.mark_quit_requested();
            }
            _ => {}
        }
    }

    pub(crate) fn handle_mouse_input(&mut self, button: MouseButton, state: ElementState) {
        if button != MouseButton::Left {
            return;
        }
        let was_pressed = self.left_button.pressed;
        self.left_button.apply(state);
        if self.left_button.pressed && !was_pressed {
            self.click_px = self.cursor_px;
        }
    }

    pub(crate) fn snapshot_for_tick(&mut self) -> InputSnapshot {
        let clicked = self.left_button.take();
        let click = self.click_px.take().filter(|_| clicked);
        InputSnapshot {
            quit_requested: self.quit_requested,
            cursor: self.cursor_px.map(|px| self.to_framebuffer(px)),
            click: click.map(|px| self.to_framebuffer(px)),
            save_pressed: self.save_key.take(),
            load_pressed: self.load_key.take(),
        }
    }

    fn to_framebuffer(&self, (x, y): (f64, f64)) -> Point {
        let scale_x = self.framebuffer_width.max(1) as f64 / self.window_width.max(1) as f64;
        let scale_y = self.framebuffer_height.max(1) as f64 / self.window_height.max(1) as f64;
        let fx = (x * scale_x).floor() as i32;
        let fy = (y * scale_y).floor() as i32;
        Point::new(
            fx.clamp(0, self.framebuffer_width.saturating_sub(1) as i32),
            fy.clamp(0, self.framebuffer_height.saturating_sub(1) as i32),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn click_is_edge_triggered_and_carries_cursor() {
        let mut input = InputCollector::new((640, 480), (640, 480));
        input.set_cursor_position_px(100.0, 200.0);
        input.handle_mouse_input(MouseButton::Left, ElementState::Pressed);
        let first = input.snapshot_for_tick();
        input.handle_mouse_input(MouseButton::Left, ElementState::Pressed);
        let second = input.snapshot_for_tick();
        assert_eq!(first.click(), Some(Point::new(100, 200)));
        assert_eq!(second.click(), None);
        assert_eq!(second.cursor(), Some(Point::new(100, 200)));
    }

    #[test]
    fn cursor_is_scaled_into_the_framebuffer() {
        let mut input = InputCollector::new((1280, 960), (640, 480));
        input.set_cursor_position_px(1279.0, 481.0);
        assert_eq!(input.snapshot_for_tick().cursor(), Some(Point::new(639, 240)));
        input.clear_cursor_position();
        assert_eq!(input.snapshot_for_tick().cursor(), None);
    }

    #[test]
    fn held_save_key_reports_once() {
        let mut input = InputCollector::default();
        input.handle_key(PhysicalKey::Code(KeyCode::F5), ElementState::Pressed);
        let first = input.snapshot_for_tick();
        input.handle_key(PhysicalKey::Code(KeyCode::F5), ElementState::Pressed);
        let second = input.snapshot_for_tick();
        input.handle_key(PhysicalKey::Code(KeyCode::F5), ElementState::Released);
        input.handle_key(PhysicalKey::Code(KeyCode::F9), ElementState::Pressed);
        let third = input.snapshot_for_tick();
        assert!(first.save_pressed());
        assert!(!second.save_pressed());
        assert!(!third.save_pressed());
        assert!(third.load_pressed());
    }

    #[test]
    fn escape_requests_quit() {
        let mut input = InputCollector::default();
        input.handle_key(PhysicalKey::Code(KeyCode::Escape), ElementState::Pressed);
        assert!(input.snapshot_for_tick().quit_requested());
    }
}
