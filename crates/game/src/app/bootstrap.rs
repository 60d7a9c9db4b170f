//! Startup wiring: tracing, environment configuration, and the game loop.

use std::env;
use std::path::PathBuf;

use engine::{
    BackendError, DirtyTracking, DrawingStrategy, Everyone, Game, GameError, LoopConfig,
};
use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use super::backend::PixelsBackend;
use super::layout::{self, LayoutError};

const FULLSCREEN_ENV_VAR: &str = "STARHOP_FULLSCREEN";
const STRATEGY_ENV_VAR: &str = "STARHOP_STRATEGY";
const ASSETS_ENV_VAR: &str = "STARHOP_ASSETS";

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to build the level: {0}")]
    Layout(#[from] LayoutError),
    #[error("failed to initialize the backend: {0}")]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Game(#[from] GameError),
}

pub(crate) fn run() -> Result<(), AppError> {
    init_tracing();
    info!("=== Starhop Startup ===");

    let level = layout::demo_level()?;
    let (width, height) = level.stage().size();
    let backend = PixelsBackend::new(
        "Starhop",
        width as u32,
        height as u32,
        fullscreen_from_env(),
        assets_root_from_env(),
    )?;

    let strategy_kind = parse_strategy(env::var(STRATEGY_ENV_VAR).ok().as_deref());
    info!(strategy = strategy_kind.name(), "strategy_selected");
    let strategy: Box<dyn DrawingStrategy> = match strategy_kind {
        StrategyKind::Dirty => Box::new(DirtyTracking::new()),
        StrategyKind::Everyone => Box::new(Everyone),
    };

    let mut game = Game::new(Box::new(backend), strategy, level, LoopConfig::default());
    game.run()?;
    Ok(())
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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StrategyKind {
    Dirty,
    Everyone,
}

impl StrategyKind {
    fn name(self) -> &'static str {
        match self {
            StrategyKind::Dirty => "dirty",
            StrategyKind::Everyone => "everyone",
        }
    }
}

fn parse_strategy(value: Option<&str>) -> StrategyKind {
    match value {
        None => StrategyKind::Dirty,
        Some("dirty") => StrategyKind::Dirty,
        Some("everyone") => StrategyKind::Everyone,
        Some(other) => {
            warn!(
                env_var = STRATEGY_ENV_VAR,
                value = other,
                "unknown strategy name; using dirty tracking"
            );
            StrategyKind::Dirty
        }
    }
}

fn parse_flag(value: Option<&str>) -> bool {
    matches!(value, Some("1") | Some("true") | Some("yes"))
}

fn fullscreen_from_env() -> bool {
    parse_flag(env::var(FULLSCREEN_ENV_VAR).ok().as_deref())
}

fn assets_root_from_env() -> PathBuf {
    env::var_os(ASSETS_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("assets"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_defaults_to_dirty_tracking() {
        assert_eq!(parse_strategy(None), StrategyKind::Dirty);
        assert_eq!(parse_strategy(Some("gibberish")), StrategyKind::Dirty);
    }

    #[test]
    fn strategy_names_are_recognized() {
        assert_eq!(parse_strategy(Some("dirty")), StrategyKind::Dirty);
        assert_eq!(parse_strategy(Some("everyone")), StrategyKind::Everyone);
    }

    #[test]
    fn fullscreen_flag_accepts_common_truthy_values() {
        assert!(parse_flag(Some("1")));
        assert!(parse_flag(Some("true")));
        assert!(parse_flag(Some("yes")));
        assert!(!parse_flag(Some("0")));
        assert!(!parse_flag(None));
    }
}
