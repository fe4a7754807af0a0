use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use farmsim_engine::{resolve_app_paths, InputSource, LoopConfig, Scene, StartupError};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::gameplay::{self, SceneDef, SceneDefError};
use super::script::ScriptInput;

const SCENE_ENV_VAR: &str = "FARMSIM_SCENE";
const SCRIPT_ENV_VAR: &str = "FARMSIM_SCRIPT";
const SEED_ENV_VAR: &str = "FARMSIM_SEED";
const REALTIME_ENV_VAR: &str = "FARMSIM_REALTIME";
const DEFAULT_SCENE_FILE: &str = "farm.json";
const DEFAULT_WANDER_SEED: u64 = 0x5EED;

#[derive(Debug, Error)]
pub(crate) enum BootstrapError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    SceneDef(#[from] SceneDefError),
    #[error("failed to open command script {}: {source}", .path.display())]
    Script {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{var} must be {expected}, got '{value}'")]
    InvalidEnv {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
}

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) scene: Box<dyn Scene>,
    pub(crate) input: Box<dyn InputSource>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct EnvSettings {
    scene: Option<String>,
    script: Option<String>,
    seed: u64,
    realtime: bool,
}

impl EnvSettings {
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, BootstrapError> {
        let non_empty = |var: &str| {
            lookup(var)
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty())
        };
        let seed = match non_empty(SEED_ENV_VAR) {
            Some(raw) => raw.parse::<u64>().map_err(|_| BootstrapError::InvalidEnv {
                var: SEED_ENV_VAR,
                expected: "an unsigned 64-bit integer",
                value: raw.clone(),
            })?,
            None => DEFAULT_WANDER_SEED,
        };
        let realtime = match non_empty(REALTIME_ENV_VAR) {
            Some(raw) => parse_flag(&raw).ok_or_else(|| BootstrapError::InvalidEnv {
                var: REALTIME_ENV_VAR,
                expected: "one of 1|0|true|false|yes|no",
                value: raw.clone(),
            })?,
            None => false,
        };
        Ok(Self {
            scene: non_empty(SCENE_ENV_VAR),
            script: non_empty(SCRIPT_ENV_VAR),
            seed,
            realtime,
        })
    }
}

pub(crate) fn build_app() -> Result<AppWiring, BootstrapError> {
    init_tracing();
    info!("=== Farmsim Startup ===");

    let settings = EnvSettings::from_lookup(|var| std::env::var(var).ok())?;
    let paths = resolve_app_paths()?;
    let scene_path = resolve_asset_path(
        &paths.scenes_dir,
        settings.scene.as_deref().unwrap_or(DEFAULT_SCENE_FILE),
    );
    let def = SceneDef::load_from_path(&scene_path)?;
    let scene = gameplay::build_farm_scene(&def, settings.seed)?;

    let input: Box<dyn InputSource> = match settings.script.as_deref() {
        Some(raw) => {
            let path = resolve_asset_path(&paths.scripts_dir, raw);
            let file = File::open(&path).map_err(|source| BootstrapError::Script {
                path: path.clone(),
                source,
            })?;
            info!(path = %path.display(), "script_source");
            Box::new(ScriptInput::new(BufReader::new(file)))
        }
        None => {
            info!("script_source_stdin");
            Box::new(ScriptInput::new(io::stdin().lock()))
        }
    };

    info!(
        root = %paths.root.display(),
        scene = %scene_path.display(),
        seed = settings.seed,
        realtime = settings.realtime,
        "bootstrap_complete"
    );

    Ok(AppWiring {
        config: LoopConfig {
            realtime: settings.realtime,
            ..LoopConfig::default()
        },
        scene,
        input,
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

/// Bare names resolve inside `dir`; paths that exist as given are kept.
fn resolve_asset_path(dir: &Path, raw: &str) -> PathBuf {
    let candidate = PathBuf::from(raw);
    if candidate.is_absolute() || candidate.exists() {
        candidate
    } else {
        dir.join(candidate)
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
