use std::fs;
use std::path::{Path, PathBuf};

use farmsim_engine::{BoolGrid, GridSize, MaskError, TerrainMasks, TilePos, TileRect};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use super::agent::{AgentController, AgentTuning};
use super::interaction::InteractionController;
use super::types::ObjectKind;

#[derive(Debug, Error)]
pub(crate) enum SceneDefError {
    #[error("failed to read scene definition {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse scene json at {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("scene must be at least 1x1, got {width}x{height}")]
    EmptyScene { width: u32, height: u32 },
    #[error("{name} mask is invalid: {source}")]
    Mask {
        name: &'static str,
        #[source]
        source: MaskError,
    },
    #[error("object '{name}' has an empty footprint")]
    EmptyFootprint { name: String },
    #[error("object '{name}' footprint {width}x{height} exceeds the tile coordinate range")]
    OversizedFootprint {
        name: String,
        width: u32,
        height: u32,
    },
    #[error("object '{name}' at ({x}, {y}) lies outside the {width}x{height} scene")]
    ObjectOutOfBounds {
        name: String,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    },
    #[error("object '{name}' overlaps '{other}'")]
    OverlappingObjects { name: String, other: String },
    #[error("object name '{name}' is used more than once")]
    DuplicateName { name: String },
    #[error("health override on '{name}' must be positive")]
    InvalidHealth { name: String },
    #[error("agent spawn ({x}, {y}) lies outside the scene")]
    SpawnOutOfBounds { x: i32, y: i32 },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ObjectDef {
    pub(crate) name: String,
    pub(crate) kind: ObjectKind,
    pub(crate) x: i32,
    pub(crate) y: i32,
    pub(crate) width: u32,
    pub(crate) height: u32,
    #[serde(default)]
    pub(crate) health: Option<u32>,
}

impl ObjectDef {
    fn rect(&self) -> TileRect {
        TileRect::new(
            TilePos::new(self.x, self.y),
            GridSize::new(self.width, self.height),
        )
    }
}

/// On-disk description of a farm scene.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct SceneDef {
    pub(crate) name: String,
    pub(crate) width: u32,
    pub(crate) height: u32,
    #[serde(default)]
    pub(crate) water: Option<Vec<String>>,
    #[serde(default)]
    pub(crate) blocking: Option<Vec<String>>,
    pub(crate) agent_spawn: TilePos,
    #[serde(default)]
    pub(crate) objects: Vec<ObjectDef>,
    #[serde(default)]
    pub(crate) tuning: AgentTuning,
}

impl SceneDef {
    pub(crate) fn load_from_path(path: &Path) -> Result<Self, SceneDefError> {
        let raw = fs::read_to_string(path).map_err(|source| SceneDefError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let def = Self::parse_json(&raw)?;
        info!(
            scene = %def.name,
            path = %path.display(),
            objects = def.objects.len(),
            "scene_def_loaded"
        );
        Ok(def)
    }

    pub(crate) fn parse_json(raw: &str) -> Result<Self, SceneDefError> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        let def: Self = match serde_path_to_error::deserialize(&mut deserializer) {
            Ok(def) => def,
            Err(error) => {
                let path = error.path().to_string();
                let source = error.into_inner();
                return Err(SceneDefError::Parse { path, source });
            }
        };
        def.validate()?;
        Ok(def)
    }

    pub(crate) fn bounds(&self) -> GridSize {
        GridSize::new(self.width, self.height)
    }

    pub(crate) fn masks(&self) -> Result<TerrainMasks, SceneDefError> {
        let bounds = self.bounds();
        let water = mask_from_rows("water", bounds, self.water.as_deref())?;
        let blocking = mask_from_rows("blocking", bounds, self.blocking.as_deref())?;
        TerrainMasks::new(bounds, water, blocking).map_err(|source| SceneDefError::Mask {
            name: "terrain",
            source,
        })
    }

    fn validate(&self) -> Result<(), SceneDefError> {
        if self.width == 0 || self.height == 0 {
            return Err(SceneDefError::EmptyScene {
                width: self.width,
                height: self.height,
            });
        }
        let bounds = self.bounds();
        if !bounds.contains(self.agent_spawn) {
            return Err(SceneDefError::SpawnOutOfBounds {
                x: self.agent_spawn.x,
                y: self.agent_spawn.y,
            });
        }

        let mut seen = std::collections::HashSet::new();
        for object in &self.objects {
            if object.width == 0 || object.height == 0 {
                return Err(SceneDefError::EmptyFootprint {
                    name: object.name.clone(),
                });
            }
            if i32::try_from(object.width).is_err() || i32::try_from(object.height).is_err() {
                return Err(SceneDefError::OversizedFootprint {
                    name: object.name.clone(),
                    width: object.width,
                    height: object.height,
                });
            }
            if !object.rect().is_within(bounds) {
                return Err(SceneDefError::ObjectOutOfBounds {
                    name: object.name.clone(),
                    x: object.x,
                    y: object.y,
                    width: self.width,
                    height: self.height,
                });
            }
            if object.health == Some(0) {
                return Err(SceneDefError::InvalidHealth {
                    name: object.name.clone(),
                });
            }
            if !seen.insert(object.name.as_str()) {
                return Err(SceneDefError::DuplicateName {
                    name: object.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Spawns every object in file order so ids follow declaration order.
    pub(crate) fn build(
        &self,
        seed: u64,
    ) -> Result<(InteractionController, AgentController), SceneDefError> {
        let mut controller = InteractionController::new(self.bounds(), self.masks()?);
        for object in &self.objects {
            let position = TilePos::new(object.x, object.y);
            let id = controller.spawn_object(
                object.name.clone(),
                object.kind,
                position,
                GridSize::new(object.width, object.height),
                object.health,
            );
            if let Some(other) = controller.check_object_intersection(id, position) {
                return Err(SceneDefError::OverlappingObjects {
                    name: object.name.clone(),
                    other: controller
                        .object(other)
                        .map(|hit| hit.name().to_string())
                        .unwrap_or_default(),
                });
            }
        }
        let agent = AgentController::new(self.agent_spawn, seed, self.tuning);
        Ok((controller, agent))
    }
}

fn mask_from_rows(
    name: &'static str,
    bounds: GridSize,
    rows: Option<&[String]>,
) -> Result<BoolGrid, SceneDefError> {
    match rows {
        Some(rows) => {
            BoolGrid::from_rows(bounds, rows).map_err(|source| SceneDefError::Mask { name, source })
        }
        None => Ok(BoolGrid::empty(bounds)),
    }
}
