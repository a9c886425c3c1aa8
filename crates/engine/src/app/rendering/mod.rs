mod renderer;

pub use renderer::Renderer;

pub const PLACEHOLDER_HALF_WIDTH_PX: i32 = 6;
pub const PLACEHOLDER_HALF_HEIGHT_PX: i32 = 10;
