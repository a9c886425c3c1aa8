use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod app;
pub mod collision;
pub mod content;
pub mod hash;
pub mod message;
pub mod module;
pub mod random;
pub mod resource;
pub mod scene;
pub mod sprite;
pub mod surface;
pub mod vars;
pub mod world;

pub use app::{
    run_app, run_app_with_metrics, AppError, InputSnapshot, LoopConfig, LoopMetricsSnapshot,
    MetricsHandle, Renderer, Session,
};
pub use collision::{HitRect, HitRectList, Rect, RectList};
pub use content::{ContentError, ContentErrorCode, ResourceError, SceneData, SourceLocation};
pub use hash::{format_hash, name_hash};
pub use message::{opcode, Message, MessageParam, Point};
pub use module::{ChildSpec, FlowError, Module, ModuleClass, ModuleTable, TransitionArm};
pub use random::{RandomSource, ScriptedRandom, SeededRandom};
pub use resource::{MemoryResources, ResourceFacade};
pub use scene::{ListStatus, Scene, SceneClass};
pub use sprite::{AnimatedSprite, AnimationEnd, SpriteClass, StateBehavior};
pub use surface::{DrawSurface, FramePlacement, RecordingSurface};
pub use vars::{SavedSubVar, SavedVar, VariableStore};
pub use world::{EntityId, EntityWorld, GameState, Services};

pub const ROOT_ENV_VAR: &str = "HOOD_ROOT";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub assets_dir: PathBuf,
    /// Not created until the first save.
    pub saves_dir: PathBuf,
}

impl AppPaths {
    pub fn from_root(root: PathBuf) -> Self {
        Self {
            assets_dir: root.join("assets"),
            saves_dir: root.join("saves"),
            root,
        }
    }

    pub fn resources_manifest(&self) -> PathBuf {
        self.assets_dir.join("resources").join("resources.xml")
    }

    pub fn scene_file(&self, name: &str) -> PathBuf {
        self.assets_dir.join("scenes").join(format!("{name}.xml"))
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("current executable path has no parent directory: {0}")]
    ExeHasNoParent(PathBuf),
    #[error(
        "HOOD_ROOT is set but does not point to a valid project root: {path}\n\
A valid root must contain Cargo.toml and either crates/ or assets/."
    )]
    InvalidEnvRoot { path: PathBuf },
    #[error(
        "Could not detect project root by walking upward from executable directory: {start_dir}\n\
Expected a directory containing Cargo.toml and either crates/ or assets/.\n\
Set {env_var} explicitly, for example:\n\
Bash/zsh: export {env_var}=\"/path/to/hood\""
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
}

pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    resolve_root().map(AppPaths::from_root)
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => {
            let normalized = normalize_path(Path::new(&value));
            if is_repo_marker(&normalized) {
                Ok(normalized)
            } else {
                Err(StartupError::InvalidEnvRoot { path: normalized })
            }
        }
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            let exe_dir = exe
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| StartupError::ExeHasNoParent(exe.clone()))?;
            find_root_above(&exe_dir).ok_or_else(|| StartupError::RootNotFound {
                start_dir: normalize_path(&exe_dir),
                env_var: ROOT_ENV_VAR,
            })
        }
        Err(source) => Err(StartupError::EnvVar {
            var: ROOT_ENV_VAR,
            source,
        }),
    }
}

fn find_root_above(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|candidate| is_repo_marker(candidate))
        .map(normalize_path)
}

fn is_repo_marker(path: &Path) -> bool {
    let cargo_toml = path.join("Cargo.toml").is_file();
    let has_crates = path.join("crates").is_dir();
    let has_assets = path.join("assets").is_dir();

    cargo_toml && (has_crates || has_assets)
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
