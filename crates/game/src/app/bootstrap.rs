use std::env;

use engine::{LoopConfig, Scene};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use super::scenes::{MenuScene, SaveSelectScene, DEFAULT_LEVEL};

const LEVEL_ENV_VAR: &str = "FORLORN_LEVEL";

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) menu: Box<dyn Scene>,
    pub(crate) save_select: Box<dyn Scene>,
}

pub(crate) fn build_app() -> AppWiring {
    init_tracing();
    info!(version = env!("CARGO_PKG_VERSION"), "=== Forlorn Startup ===");

    let level = resolve_level_name(env::var(LEVEL_ENV_VAR).ok());
    info!(level = %level, "level_selected");

    AppWiring {
        config: LoopConfig::default(),
        menu: Box::new(MenuScene::new(level)),
        save_select: Box::new(SaveSelectScene::new()),
    }
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

fn resolve_level_name(raw: Option<String>) -> String {
    match raw.as_deref().map(str::trim) {
        None => DEFAULT_LEVEL.to_string(),
        Some("") => {
            warn!(env_var = LEVEL_ENV_VAR, "level_env_empty_using_default");
            DEFAULT_LEVEL.to_string()
        }
        Some(level) => level.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_name_defaults_to_cave_level() {
        assert_eq!(resolve_level_name(None), "LevelCave.json");
        assert_eq!(resolve_level_name(Some("   ".to_string())), "LevelCave.json");
        assert_eq!(
            resolve_level_name(Some(" levels/Other.json ".to_string())),
            "levels/Other.json"
        );
    }
}
