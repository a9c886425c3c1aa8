use std::env;
use std::sync::Arc;

use hood_engine::content::{load_resource_manifest, load_scene_data};
use hood_engine::{
    resolve_app_paths, ContentError, LoopConfig, RandomSource, ResourceError, SeededRandom,
    Session, StartupError,
};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::gameplay::{self, GameContent, ModuleId};
use super::session::GameSession;

const RNG_SEED_ENV_VAR: &str = "HOOD_RNG_SEED";
const START_MODULE_ENV_VAR: &str = "HOOD_START_MODULE";
const HALL_SCENE_FILE: &str = "hall";

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) session: Box<dyn Session>,
}

#[derive(Debug, Error)]
pub(crate) enum BootstrapError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    Resources(#[from] ResourceError),
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error("invalid value for {var}: '{value}'")]
    InvalidEnv { var: &'static str, value: String },
}

pub(crate) fn build_app() -> Result<AppWiring, BootstrapError> {
    init_tracing();
    info!("=== Hood Startup ===");

    let paths = resolve_app_paths()?;
    let seed = parse_env(RNG_SEED_ENV_VAR, |raw| raw.trim().parse::<u64>().ok())?;
    let start = parse_env(START_MODULE_ENV_VAR, ModuleId::parse_start)?.unwrap_or(ModuleId::Intro);

    let resources = load_resource_manifest(&paths.resources_manifest())?;
    let hall = load_scene_data(&paths.scene_file(HALL_SCENE_FILE))?;
    let rng: Box<dyn RandomSource> = match seed {
        Some(seed) => Box::new(SeededRandom::from_seed(seed)),
        None => Box::new(SeededRandom::from_entropy()),
    };
    info!(
        root = %paths.root.display(),
        seed = ?seed,
        start = ?start,
        "bootstrap_ready"
    );

    let content = GameContent {
        hall: Arc::new(hall),
    };
    let (world, root) = gameplay::build_world(Box::new(resources), rng, content, start);
    let session = GameSession::new(world, root, gameplay::save_path(&paths.saves_dir));

    Ok(AppWiring {
        config: LoopConfig::default(),
        session: Box::new(session),
    })
}

pub(crate) fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // Keeps an already installed subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .try_init();
}

/// Unset or empty reads as `None`; anything `parse` rejects is an error.
fn parse_env<T>(
    var: &'static str,
    parse: impl FnOnce(&str) -> Option<T>,
) -> Result<Option<T>, BootstrapError> {
    match env::var(var) {
        Ok(raw) if raw.trim().is_empty() => Ok(None),
        Ok(raw) => parse(&raw)
            .map(Some)
            .ok_or(BootstrapError::InvalidEnv { var, value: raw }),
        Err(_) => Ok(None),
    }
}
