mod animation;
mod assets;
mod events;
mod input;
mod loop_runner;
mod metrics;
mod rendering;
mod scene;
mod sprite_frames;
mod tools;

pub use animation::{Animation, AnimationPlayback};
pub use assets::{AssetError, Assets, TextureInfo};
pub use events::{EventDispatcher, ListenerId};
pub use input::{InputAction, KeyCode, KeyEvent, KeyState};
pub use loop_runner::{run_app, run_app_with_metrics, AppError, LoopConfig, SLOW_FRAME_ENV_VAR};
pub use metrics::{LoopMetricsSnapshot, MetricsHandle};
pub use rendering::{
    screen_to_world_px, world_to_screen_px, Renderer, Viewport, PLACEHOLDER_HALF_SIZE_PX,
};
pub use scene::{
    Camera2D, DrawItem, InputSnapshot, LabelDesc, Node, NodeDesc, NodeId, NodeKind,
    ParallaxChild, Scene, SceneCommand, SceneKey, SceneWorld, SpriteSource, Vec2, WorldTransform,
    CAMERA_ZOOM_DEFAULT, DEFAULT_VISIBLE_SIZE,
};
pub use sprite_frames::{FrameRect, SpriteFrame, SpriteFrameCache, SpriteSheetError};
pub(crate) use tools::OverlayData;
