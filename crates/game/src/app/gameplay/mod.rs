mod agent;
mod buttons;
mod interaction;
mod placement;
mod scene_def;
mod scene_impl;
mod types;
mod view;
mod world_object;

use farmsim_engine::Scene;

pub(crate) use buttons::ButtonCallback;
pub(crate) use scene_def::{SceneDef, SceneDefError};

use buttons::LoggingButtonPresenter;
use scene_impl::FarmScene;

const TILE_SIZE_PX: f32 = 16.0;
const DRAG_ACTIVATION_DELAY_SECONDS: f32 = 0.1;
const SELECTION_PULSE_CYCLE_SECONDS: f32 = 1.0;
const SELECTION_PULSE_MAX_OFFSET_PX: f32 = 3.0;
const TREE_DEFAULT_HEALTH: u32 = 3;
const ROCK_DEFAULT_HEALTH: u32 = 2;

pub(crate) fn build_farm_scene(def: &SceneDef, seed: u64) -> Result<Box<dyn Scene>, SceneDefError> {
    let scene = FarmScene::new(def, seed, Box::new(LoggingButtonPresenter::default()))?;
    Ok(Box::new(scene))
}
