use std::sync::Arc;

use pixels::{Error, Pixels, SurfaceTexture};
use winit::window::Window;

use crate::collision::Rect;
use crate::resource::FrameImage;
use crate::surface::{DrawSurface, FramePlacement};

use super::{PLACEHOLDER_HALF_HEIGHT_PX, PLACEHOLDER_HALF_WIDTH_PX};

const CLEAR_COLOR: [u8; 4] = [0, 0, 0, 255];
const PLACEHOLDER_COLOR: [u8; 4] = [220, 60, 200, 255];

/// Fixed-size framebuffer presented through `pixels`; the surface scales it
/// to the window.
pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    width: u32,
    height: u32,
    visible: bool,
    clip: Option<Rect>,
}

impl Renderer {
    pub fn new(window: Arc<Window>, width: u32, height: u32) -> Result<Self, Error> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(Arc::clone(&window), (size.width, size.height), (width, height))?;
        Ok(Self {
            window,
            pixels,
            width,
            height,
            visible: true,
            clip: None,
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(
            Arc::clone(&self.window),
            (width, height),
            (self.width, self.height),
        )?;
        Ok(())
    }

    fn build_pixels(
        window: Arc<Window>,
        surface: (u32, u32),
        buffer: (u32, u32),
    ) -> Result<Pixels<'static>, Error> {
        let texture = SurfaceTexture::new(surface.0.max(1), surface.1.max(1), window);
        Pixels::new(buffer.0, buffer.1, texture)
    }

    pub fn begin_frame(&mut self) {
        self.visible = true;
        self.clip = None;
        for pixel in self.pixels.frame_mut().chunks_exact_mut(4) {
            pixel.copy_from_slice(&CLEAR_COLOR);
        }
    }

    pub fn present(&self) -> Result<(), Error> {
        self.pixels.render()
    }

    fn bounds(&self) -> Rect {
        let full = Rect::new(0, 0, self.width as i32 - 1, self.height as i32 - 1);
        match self.clip {
            Some(clip) => Rect::new(
                clip.x1.max(full.x1),
                clip.y1.max(full.y1),
                clip.x2.min(full.x2),
                clip.y2.min(full.y2),
            ),
            None => full,
        }
    }
}

impl DrawSurface for Renderer {
    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    fn set_clip_rect(&mut self, rect: Option<Rect>) {
        self.clip = rect;
    }

    fn draw_animation_frame(&mut self, image: Option<&FrameImage>, placement: FramePlacement) {
        if !self.visible {
            return;
        }
        let bounds = self.bounds();
        let width = self.width as usize;
        let frame = self.pixels.frame_mut();
        match image {
            Some(image) => blit_frame(frame, width, bounds, image, placement),
            None => draw_placeholder(frame, width, bounds, placement.x, placement.y),
        }
    }
}

/// Top-left corner for an image whose origin is its bottom centre.
fn frame_origin(image: &FrameImage, placement: FramePlacement) -> (i32, i32) {
    (
        placement.x - image.width as i32 / 2,
        placement.y - image.height as i32,
    )
}

fn blit_frame(frame: &mut [u8], width: usize, bounds: Rect, image: &FrameImage, placement: FramePlacement) {
    let (left, top) = frame_origin(image, placement);
    let (w, h) = (image.width as i32, image.height as i32);
    for sy in 0..h {
        let src_y = if placement.flip_y { h - 1 - sy } else { sy };
        for sx in 0..w {
            let src_x = if placement.flip_x { w - 1 - sx } else { sx };
            let src = ((src_y * w + src_x) * 4) as usize;
            let Some(rgba) = image.rgba.get(src..src + 4) else {
                continue;
            };
            if rgba[3] == 0 {
                continue;
            }
            let (dx, dy) = (left + sx, top + sy);
            if bounds.contains(dx, dy) {
                write_pixel_rgba_clipped(frame, width, dx, dy, [rgba[0], rgba[1], rgba[2], rgba[3]]);
            }
        }
    }
}

fn draw_placeholder(frame: &mut [u8], width: usize, bounds: Rect, x: i32, y: i32) {
    let top = y - 2 * PLACEHOLDER_HALF_HEIGHT_PX;
    for py in top..=y {
        for px in (x - PLACEHOLDER_HALF_WIDTH_PX)..=(x + PLACEHOLDER_HALF_WIDTH_PX) {
            let edge = py == top
                || py == y
                || px == x - PLACEHOLDER_HALF_WIDTH_PX
                || px == x + PLACEHOLDER_HALF_WIDTH_PX;
            if edge && bounds.contains(px, py) {
                write_pixel_rgba_clipped(frame, width, px, py, PLACEHOLDER_COLOR);
            }
        }
    }
}

fn write_pixel_rgba_clipped(frame: &mut [u8], width: usize, x: i32, y: i32, color: [u8; 4]) {
    if x < 0 || y < 0 || x as usize >= width {
        return;
    }
    let Some(offset) = (y as usize)
        .checked_mul(width)
        .and_then(|row| row.checked_add(x as usize))
        .and_then(|pixel| pixel.checked_mul(4))
    else {
        return;
    };
    if let Some(dst) = frame.get_mut(offset..offset + 4) {
        dst.copy_from_slice(&color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const W: usize = 8;
    const H: usize = 6;

    fn blank() -> Vec<u8> {
        vec![0; W * H * 4]
    }

    fn pixel(frame: &[u8], x: usize, y: usize) -> [u8; 4] {
        let offset = (y * W + x) * 4;
        [frame[offset], frame[offset + 1], frame[offset + 2], frame[offset + 3]]
    }

    fn full() -> Rect {
        Rect::new(0, 0, W as i32 - 1, H as i32 - 1)
    }

    /// 2x1 image: red then green.
    fn two_pixels() -> FrameImage {
        FrameImage {
            width: 2,
            height: 1,
            rgba: vec![255, 0, 0, 255, 0, 255, 0, 255],
        }
    }

    #[test]
    fn image_is_anchored_at_bottom_centre() {
        let mut frame = blank();
        let placement = FramePlacement {
            x: 4,
            y: 3,
            ..FramePlacement::default()
        };
        blit_frame(&mut frame, W, full(), &two_pixels(), placement);
        assert_eq!(pixel(&frame, 3, 2), [255, 0, 0, 255]);
        assert_eq!(pixel(&frame, 4, 2), [0, 255, 0, 255]);
    }

    #[test]
    fn flip_x_mirrors_columns() {
        let mut frame = blank();
        let placement = FramePlacement {
            x: 4,
            y: 3,
            flip_x: true,
            ..FramePlacement::default()
        };
        blit_frame(&mut frame, W, full(), &two_pixels(), placement);
        assert_eq!(pixel(&frame, 3, 2), [0, 255, 0, 255]);
        assert_eq!(pixel(&frame, 4, 2), [255, 0, 0, 255]);
    }

    #[test]
    fn clip_rect_and_transparency_are_respected() {
        let mut frame = blank();
        let image = FrameImage {
            width: 2,
            height: 1,
            rgba: vec![255, 0, 0, 0, 0, 255, 0, 255],
        };
        let placement = FramePlacement {
            x: 4,
            y: 3,
            ..FramePlacement::default()
        };
        blit_frame(&mut frame, W, Rect::new(0, 0, 3, 5), &image, placement);
        assert_eq!(pixel(&frame, 3, 2), [0, 0, 0, 0]);
        assert_eq!(pixel(&frame, 4, 2), [0, 0, 0, 0]);
    }

    #[test]
    fn off_screen_writes_are_ignored() {
        let mut frame = blank();
        write_pixel_rgba_clipped(&mut frame, W, -1, 0, [1, 1, 1, 1]);
        write_pixel_rgba_clipped(&mut frame, W, W as i32, 0, [1, 1, 1, 1]);
        write_pixel_rgba_clipped(&mut frame, W, 0, H as i32, [1, 1, 1, 1]);
        assert!(frame.iter().all(|byte| *byte == 0));
    }

    #[test]
    fn placeholder_outlines_a_box_above_the_origin() {
        let mut frame = vec![0; 64 * 64 * 4];
        let bounds = Rect::new(0, 0, 63, 63);
        draw_placeholder(&mut frame, 64, bounds, 30, 40);
        let at = |x: usize, y: usize| frame[(y * 64 + x) * 4];
        assert_eq!(at(30, 40), PLACEHOLDER_COLOR[0]);
        assert_eq!(at(30, 40 - 2 * PLACEHOLDER_HALF_HEIGHT_PX as usize), PLACEHOLDER_COLOR[0]);
        assert_eq!(at(30, 35), 0);
    }
}
