use std::collections::{BTreeMap, BTreeSet};

use engine::{
    Animation, AnimationPlayback, AssetError, KeyCode, KeyEvent, NodeDesc, NodeId, SceneWorld,
    SpriteFrameCache, Vec2,
};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

pub(crate) const CAMERA_STEP_PER_TICK: f32 = 7.0;
pub(crate) const SPAWN_ZOOM_FACTOR: f32 = 0.5;
pub(crate) const BLOCK_LABEL_SCALE: f32 = 0.2;
pub(crate) const BLOCK_LABEL_Z_ORDER: i32 = 9999;
const PARALLAX_BASE: Vec2 = Vec2::new(-465.0, -430.0);
const PARALLAX_FACTOR: f32 = 0.25;
const BACKGROUND_BASE: Vec2 = Vec2::new(-465.0, 430.0);
const BACKGROUND_FACTOR: f32 = 0.75;
const FIRST_AUTO_UID: u32 = 1;

include!("point.rs");
include!("document.rs");
include!("block.rs");
include!("animated_sprite.rs");
include!("camera.rs");
include!("loader.rs");
