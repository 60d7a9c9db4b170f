//! Level layouts as JSON documents.
//!
//! A layout names the stage (size, layers) and a list of object archetypes.
//! The embedded demo level is compiled in; `STARHOP_LEVEL` points at an
//! alternative document on disk.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use engine::{Level, Object, ObjectId, Rect, Stage, StageError, Vec2};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use super::behaviors::{DoNothing, GetCollected, JumpAndRun, MoveOverPath};
use super::director::DemoDirector;

pub(crate) const LEVEL_ENV_VAR: &str = "STARHOP_LEVEL";
const EMBEDDED_LEVEL: &str = include_str!("demo_level.json");

const STAR_SIZE: (f32, f32) = (60.0, 60.0);
const PLAYER_SIZE: (f32, f32) = (40.0, 50.0);
const PATROLLER_SIZE: (f32, f32) = (30.0, 30.0);

#[derive(Debug, Error)]
pub(crate) enum LayoutError {
    #[error("failed to read level file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid level document at {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Stage(#[from] StageError),
}

#[derive(Debug, Deserialize)]
pub(crate) struct LevelDoc {
    stage: StageDoc,
    objects: Vec<ObjectDoc>,
}

#[derive(Debug, Deserialize)]
struct StageDoc {
    width: f32,
    height: f32,
    layers: Vec<String>,
    default_layer: String,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "archetype", rename_all = "snake_case")]
enum ObjectDoc {
    Scenery {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        sprite: String,
        #[serde(default)]
        solid: bool,
        #[serde(default)]
        layer: Option<String>,
    },
    Star {
        x: f32,
        y: f32,
    },
    Player {
        x: f32,
        y: f32,
    },
    Patroller {
        x: f32,
        y: f32,
        speed: f32,
        path: Vec<[f32; 2]>,
        #[serde(default)]
        die_after: Option<u32>,
    },
}

pub(crate) fn parse_level(text: &str) -> Result<LevelDoc, LayoutError> {
    let mut deserializer = serde_json::Deserializer::from_str(text);
    serde_path_to_error::deserialize(&mut deserializer).map_err(|error| LayoutError::Parse {
        path: error.path().to_string(),
        source: error.into_inner(),
    })
}

pub(crate) fn build_level(doc: &LevelDoc) -> Result<Level, LayoutError> {
    let mut stage = Stage::new(
        (doc.stage.width, doc.stage.height),
        doc.stage.layers.clone(),
        &doc.stage.default_layer,
    )?;

    let mut star: Option<ObjectId> = None;
    for object_doc in &doc.objects {
        match object_doc {
            ObjectDoc::Scenery {
                x,
                y,
                w,
                h,
                sprite,
                solid,
                layer,
            } => {
                let object = Object::new(
                    "scenery",
                    Vec2::new(*x, *y),
                    (*w, *h),
                    (*w, *h),
                    sprite,
                    Box::new(DoNothing),
                )
                .with_solid(*solid);
                stage.add_spawn(object, layer.as_deref())?;
            }
            ObjectDoc::Star { x, y } => {
                let object = Object::new(
                    "star",
                    Vec2::new(*x, *y),
                    STAR_SIZE,
                    STAR_SIZE,
                    "star",
                    Box::new(GetCollected {
                        collector_label: "player",
                    }),
                );
                star = Some(stage.add_spawn(object, None)?);
            }
            ObjectDoc::Player { x, y } => {
                let object = Object::new(
                    "player",
                    Vec2::new(*x, *y),
                    PLAYER_SIZE,
                    PLAYER_SIZE,
                    "player_idle",
                    Box::new(JumpAndRun::default()),
                );
                stage.add_spawn(object, None)?;
            }
            ObjectDoc::Patroller {
                x,
                y,
                speed,
                path,
                die_after,
            } => {
                let points = path.iter().map(|[px, py]| Vec2::new(*px, *py)).collect();
                let object = Object::new(
                    "patroller",
                    Vec2::new(*x, *y),
                    PATROLLER_SIZE,
                    PATROLLER_SIZE,
                    "walker",
                    Box::new(MoveOverPath::new(*speed, points, *die_after)),
                );
                stage.add_spawn(object, None)?;
            }
        }
    }
    stage.spawn();

    info!(
        objects = stage.object_count(),
        width = doc.stage.width,
        height = doc.stage.height,
        "level_built"
    );

    let (width, height) = stage.size();
    let viewport = Rect::new(0.0, 0.0, width, height);
    Ok(Level::new(Box::new(DemoDirector::new(viewport, star)), stage))
}

pub(crate) fn level_from_path(path: &Path) -> Result<Level, LayoutError> {
    let text = fs::read_to_string(path).map_err(|source| LayoutError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    build_level(&parse_level(&text)?)
}

/// The level the game boots into: `STARHOP_LEVEL` when set, otherwise the
/// embedded demo layout.
pub(crate) fn demo_level() -> Result<Level, LayoutError> {
    match env::var_os(LEVEL_ENV_VAR) {
        Some(path) => level_from_path(Path::new(&path)),
        None => build_level(&parse_level(EMBEDDED_LEVEL)?),
    }
}
