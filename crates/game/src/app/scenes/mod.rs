use engine::{
    InputSnapshot, KeyCode, KeyEvent, ListenerId, NodeDesc, NodeId, Scene, SceneCommand, SceneKey,
    SceneWorld, Vec2,
};
use tracing::{debug, info, warn};

use super::level::{
    CameraController, DirectionState, LevelLoader, LoadReport, LoadedLevel, SkippedRecord,
};

pub(crate) const DEFAULT_LEVEL: &str = "LevelCave.json";
const PLAY_LISTENER_PRIORITY: i32 = 11;
const PLACEHOLDER_TEXT: &str = "Loading";
const MENU_BACKDROP: &str = "cave_bg_01.png";
const MENU_BACKDROP_Y: f32 = 545.0;
const MENU_BACKDROP_SCALE: f32 = 2.5;

include!("play_layer.rs");
include!("menu.rs");
include!("save_select.rs");

#[cfg(test)]
mod tests {
    include!("tests.rs");
}
