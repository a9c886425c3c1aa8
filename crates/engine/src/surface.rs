use crate::collision::Rect;
use crate::resource::FrameImage;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FramePlacement {
    pub animation_hash: u32,
    pub x: i32,
    pub y: i32,
    pub frame_index: usize,
    pub flip_x: bool,
    pub flip_y: bool,
}

/// Output target for entity draw steps.
///
/// `image` is `None` when the frame has no decoded pixels; implementations
/// decide whether to draw a stand-in or skip.
pub trait DrawSurface {
    fn set_visible(&mut self, visible: bool);
    fn set_clip_rect(&mut self, rect: Option<Rect>);
    fn draw_animation_frame(&mut self, image: Option<&FrameImage>, placement: FramePlacement);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawCall {
    Visible(bool),
    ClipRect(Option<Rect>),
    Frame {
        placement: FramePlacement,
        has_image: bool,
    },
}

#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub calls: Vec<DrawCall>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> Vec<FramePlacement> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                DrawCall::Frame { placement, .. } => Some(*placement),
                _ => None,
            })
            .collect()
    }
}

impl DrawSurface for RecordingSurface {
    fn set_visible(&mut self, visible: bool) {
        self.calls.push(DrawCall::Visible(visible));
    }

    fn set_clip_rect(&mut self, rect: Option<Rect>) {
        self.calls.push(DrawCall::ClipRect(rect));
    }

    fn draw_animation_frame(&mut self, image: Option<&FrameImage>, placement: FramePlacement) {
        self.calls.push(DrawCall::Frame {
            placement,
            has_image: image.is_some(),
        });
    }
}
