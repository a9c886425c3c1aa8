use std::process::ExitCode;

use hood_engine::{run_app_with_metrics, LoopMetricsSnapshot, MetricsHandle};
use tracing::{error, info, warn};

use super::bootstrap::AppWiring;

/// Share of the target tick rate below which animation timing visibly drags.
const SLOW_TICK_RATIO: f32 = 0.9;

pub(crate) fn run(app: AppWiring) -> ExitCode {
    let metrics = MetricsHandle::default();
    let target_tps = app.config.target_tps;
    let result = run_app_with_metrics(app.config, app.session, metrics.clone());

    let last = metrics.snapshot();
    info!(
        fps = last.fps,
        tps = last.tps,
        dropped_ticks = last.dropped_ticks,
        "loop_finished"
    );
    if runs_slow(&last, target_tps) {
        warn!(tps = last.tps, target_tps, "tick_rate_below_target");
    }

    if let Err(err) = result {
        error!(error = %err, "run_failed");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

/// An interval that never completed (all zero) is not reported.
fn runs_slow(snapshot: &LoopMetricsSnapshot, target_tps: u32) -> bool {
    snapshot.tps > 0.0 && snapshot.tps < target_tps as f32 * SLOW_TICK_RATIO
}
