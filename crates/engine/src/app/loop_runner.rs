use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{info, warn};

use crate::StartupError;

use super::input::{InputSource, InputSourceError};
use super::metrics::MetricsRecorder;
use super::scene::{Scene, SceneCommand, SceneRuntime};

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub metrics_log_interval: Duration,
    /// Stop after this many ticks even if input remains.
    pub max_ticks: Option<u64>,
    /// Pace ticks against the wall clock instead of running back-to-back.
    pub realtime: bool,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            metrics_log_interval: Duration::from_secs(1),
            max_ticks: None,
            realtime: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error("input source failed: {0}")]
    Input(#[source] InputSourceError),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    pub ticks: u64,
    /// Ticks fed an input snapshot with nothing in it.
    pub idle_ticks: u64,
    pub resets: u32,
    pub simulated_seconds: f32,
    pub quit_requested: bool,
}

pub fn run_headless(
    config: LoopConfig,
    scene: Box<dyn Scene>,
    input: &mut dyn InputSource,
) -> Result<RunSummary, AppError> {
    let target_tps = config.target_tps.max(1);
    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(1));
    let fixed_dt = Duration::from_secs_f64(1.0 / target_tps as f64);
    let fixed_dt_seconds = fixed_dt.as_secs_f32();

    let mut runtime = SceneRuntime::new(scene);
    runtime.load();
    info!(title = ?runtime.debug_title(), "scene_loaded");
    info!(
        target_tps,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_ticks_per_frame,
        metrics_log_interval_ms = metrics_log_interval.as_millis() as u64,
        max_ticks = ?config.max_ticks,
        realtime = config.realtime,
        "loop_config"
    );

    let mut accumulator = Duration::ZERO;
    let mut last_frame_instant = Instant::now();
    let mut metrics = MetricsRecorder::new(metrics_log_interval, last_frame_instant);
    let mut quit_requested = false;

    'frames: loop {
        let now = Instant::now();
        let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
        last_frame_instant = now;

        let ticks_to_run = if config.realtime {
            accumulator = accumulator.saturating_add(clamp_frame_delta(raw_frame_dt, max_frame_delta));
            let step_plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
            accumulator = step_plan.remaining_accumulator;
            if step_plan.dropped_backlog > Duration::ZERO {
                warn!(
                    dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                    max_ticks_per_frame, "sim_clamp_triggered"
                );
            }
            if step_plan.ticks_to_run == 0 {
                thread::sleep(fixed_dt.saturating_sub(accumulator));
                continue;
            }
            step_plan.ticks_to_run
        } else {
            1
        };

        for _ in 0..ticks_to_run {
            if let Some(limit) = config.max_ticks {
                if metrics.totals().ticks >= limit {
                    info!(limit, "tick_limit_reached");
                    break 'frames;
                }
            }
            let Some(snapshot) = input.next_snapshot().map_err(AppError::Input)? else {
                info!("input_exhausted");
                break 'frames;
            };
            if snapshot.quit_requested() {
                info!(reason = "input_quit", "shutdown_requested");
                quit_requested = true;
                break 'frames;
            }

            let command = runtime.update(fixed_dt_seconds, &snapshot);
            metrics.record_tick(snapshot.is_idle());
            match command {
                SceneCommand::None => {}
                SceneCommand::Reset => {
                    runtime.reset();
                    metrics.record_reset();
                }
                SceneCommand::Quit => {
                    info!(reason = "scene_quit", "shutdown_requested");
                    quit_requested = true;
                    break 'frames;
                }
            }
        }

        runtime.render();
        if let Some(window) = metrics.poll_window(Instant::now()) {
            info!(
                ticks = window.ticks,
                tps = window.ticks_per_second,
                total_ticks = metrics.totals().ticks,
                "loop_metrics"
            );
        }
    }

    runtime.shutdown();
    let totals = metrics.totals();
    let summary = RunSummary {
        ticks: totals.ticks,
        idle_ticks: totals.idle_ticks,
        resets: totals.resets,
        simulated_seconds: totals.ticks as f32 * fixed_dt_seconds,
        quit_requested,
    };
    info!(
        ticks = summary.ticks,
        idle_ticks = summary.idle_ticks,
        resets = summary.resets,
        simulated_seconds = summary.simulated_seconds,
        "shutdown"
    );
    Ok(summary)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepPlan {
    pub ticks_to_run: u32,
    pub remaining_accumulator: Duration,
    pub dropped_backlog: Duration,
}

pub fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;

    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    if accumulator >= fixed_dt {
        let dropped_backlog = accumulator;
        StepPlan {
            ticks_to_run,
            remaining_accumulator: Duration::ZERO,
            dropped_backlog,
        }
    } else {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: accumulator,
            dropped_backlog: Duration::ZERO,
        }
    }
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::app::input::{InputSnapshot, QueuedInput};

    struct RecordingScene {
        dts: Rc<RefCell<Vec<f32>>>,
        resets: Rc<RefCell<u32>>,
        quit_after: Option<usize>,
    }

    impl Scene for RecordingScene {
        fn load(&mut self) {}

        fn update(&mut self, fixed_dt_seconds: f32, input: &InputSnapshot) -> SceneCommand {
            self.dts.borrow_mut().push(fixed_dt_seconds);
            if input.reset_pressed() {
                return SceneCommand::Reset;
            }
            if self.quit_after == Some(self.dts.borrow().len()) {
                return SceneCommand::Quit;
            }
            SceneCommand::None
        }

        fn unload(&mut self) {}

        fn reset(&mut self) {
            *self.resets.borrow_mut() += 1;
        }
    }

    fn recording_scene(quit_after: Option<usize>) -> (RecordingScene, Rc<RefCell<Vec<f32>>>, Rc<RefCell<u32>>) {
        let dts = Rc::new(RefCell::new(Vec::new()));
        let resets = Rc::new(RefCell::new(0));
        (
            RecordingScene {
                dts: dts.clone(),
                resets: resets.clone(),
                quit_after,
            },
            dts,
            resets,
        )
    }

    #[test]
    fn clamp_frame_delta_caps_large_frame() {
        let max_frame_delta = Duration::from_millis(250);
        let raw_frame_dt = Duration::from_millis(600);

        assert_eq!(
            clamp_frame_delta(raw_frame_dt, max_frame_delta),
            max_frame_delta
        );
    }

    #[test]
    fn plan_sim_steps_runs_expected_ticks_without_drop() {
        let fixed_dt = Duration::from_millis(16);
        let result = plan_sim_steps(Duration::from_millis(48), fixed_dt, 5);

        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::ZERO);
        assert_eq!(result.dropped_backlog, Duration::ZERO);
    }

    #[test]
    fn plan_sim_steps_drops_backlog_when_tick_cap_hit() {
        let fixed_dt = Duration::from_millis(16);
        let result = plan_sim_steps(Duration::from_millis(120), fixed_dt, 3);

        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::ZERO);
        assert_eq!(result.dropped_backlog, Duration::from_millis(72));
    }

    #[test]
    fn headless_run_consumes_every_snapshot_at_fixed_dt() {
        let (scene, dts, _) = recording_scene(None);
        let mut input = QueuedInput::default();
        input.push_idle_ticks(4);
        let config = LoopConfig {
            target_tps: 20,
            ..LoopConfig::default()
        };

        let summary = run_headless(config, Box::new(scene), &mut input).expect("run");

        assert_eq!(summary.ticks, 4);
        assert_eq!(summary.idle_ticks, 4);
        assert!(!summary.quit_requested);
        assert!((summary.simulated_seconds - 0.2).abs() < 1e-4);
        assert!(dts.borrow().iter().all(|dt| (dt - 0.05).abs() < 1e-6));
    }

    #[test]
    fn headless_run_honours_tick_limit() {
        let (scene, dts, _) = recording_scene(None);
        let mut input = QueuedInput::default();
        input.push_idle_ticks(10);
        let config = LoopConfig {
            max_ticks: Some(3),
            ..LoopConfig::default()
        };

        let summary = run_headless(config, Box::new(scene), &mut input).expect("run");

        assert_eq!(summary.ticks, 3);
        assert_eq!(dts.borrow().len(), 3);
        assert_eq!(input.remaining(), 7);
    }

    #[test]
    fn quit_snapshot_stops_before_update() {
        let (scene, dts, _) = recording_scene(None);
        let mut input = QueuedInput::new([
            InputSnapshot::empty(),
            InputSnapshot::quit(),
            InputSnapshot::empty(),
        ]);

        let summary = run_headless(LoopConfig::default(), Box::new(scene), &mut input).expect("run");

        assert!(summary.quit_requested);
        assert_eq!(summary.ticks, 1);
        assert_eq!(dts.borrow().len(), 1);
    }

    #[test]
    fn scene_commands_reset_and_quit_are_applied() {
        let (scene, dts, resets) = recording_scene(Some(3));
        let mut input = QueuedInput::new([
            InputSnapshot::empty().with_reset_pressed(true),
            InputSnapshot::empty(),
            InputSnapshot::empty(),
            InputSnapshot::empty(),
        ]);

        let summary = run_headless(LoopConfig::default(), Box::new(scene), &mut input).expect("run");

        assert_eq!(*resets.borrow(), 1);
        assert_eq!(summary.resets, 1);
        assert_eq!(summary.ticks, 3);
        assert_eq!(summary.idle_ticks, 2);
        assert!(summary.quit_requested);
        assert_eq!(dts.borrow().len(), 3);
        assert_eq!(input.remaining(), 1);
    }

    struct FailingInput;

    impl InputSource for FailingInput {
        fn next_snapshot(&mut self) -> Result<Option<InputSnapshot>, InputSourceError> {
            Err("script stream closed".into())
        }
    }

    #[test]
    fn input_failure_surfaces_as_app_error() {
        let (scene, _, _) = recording_scene(None);
        let error = run_headless(LoopConfig::default(), Box::new(scene), &mut FailingInput)
            .unwrap_err();
        assert!(matches!(error, AppError::Input(_)));
        assert!(error.to_string().contains("script stream closed"));
    }
}
