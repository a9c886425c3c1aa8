mod input;
mod loop_runner;
mod metrics;
mod rendering;
mod session;

pub use input::InputSnapshot;
pub use loop_runner::{run_app, run_app_with_metrics, AppError, LoopConfig, DEFAULT_TARGET_TPS};
pub use metrics::{LoopMetricsSnapshot, MetricsHandle};
pub use rendering::{Renderer, PLACEHOLDER_HALF_HEIGHT_PX, PLACEHOLDER_HALF_WIDTH_PX};
pub use session::Session;
