use std::process::ExitCode;

use farmsim_engine::run_headless;
use tracing::{error, info};

use super::bootstrap::AppWiring;

pub(crate) fn run(app: AppWiring) -> ExitCode {
    let AppWiring {
        config,
        scene,
        mut input,
    } = app;

    match run_headless(config, scene, input.as_mut()) {
        Ok(summary) => {
            info!(
                ticks = summary.ticks,
                idle_ticks = summary.idle_ticks,
                resets = summary.resets,
                simulated_seconds = summary.simulated_seconds,
                quit_requested = summary.quit_requested,
                "run_complete"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "run_failed");
            ExitCode::FAILURE
        }
    }
}
