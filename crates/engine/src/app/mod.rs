mod input;
mod loop_runner;
mod metrics;
mod scene;

pub use input::{InputSnapshot, InputSource, InputSourceError, QueuedInput};
pub use loop_runner::{plan_sim_steps, run_headless, AppError, LoopConfig, RunSummary, StepPlan};
pub use scene::{
    BoolGrid, GridSize, MaskError, Scene, SceneCommand, SceneRuntime, TerrainMasks, TilePos,
    TileRect, Vec2,
};
