use std::env;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use pixels::Error as PixelsError;
use thiserror::Error;
use tracing::{debug, info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{ElementState, Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{KeyCode as WinitKeyCode, PhysicalKey};
use winit::window::WindowBuilder;

use crate::{resolve_app_paths, StartupError};

use super::input::ActionStates;
use super::metrics::MetricsAccumulator;
use super::scene::SceneMachine;
use super::{
    Assets, InputAction, InputSnapshot, KeyCode, KeyEvent, KeyState, MetricsHandle, OverlayData,
    Renderer, Scene, SceneCommand, SceneKey, Vec2,
};

pub const SLOW_FRAME_ENV_VAR: &str = "FORLORN_SLOW_FRAME_MS";

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub metrics_log_interval: Duration,
    pub simulated_slow_frame_ms: u64,
    pub max_render_fps: Option<u32>,
    pub initial_scene: SceneKey,
    pub overlay_visible: bool,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "Forlorn".to_string(),
            window_width: 1280,
            window_height: 720,
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            metrics_log_interval: Duration::from_secs(1),
            simulated_slow_frame_ms: 0,
            max_render_fps: None,
            initial_scene: SceneKey::Menu,
            overlay_visible: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize renderer: {0}")]
    CreateRenderer(#[source] PixelsError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

pub fn run_app(
    config: LoopConfig,
    menu: Box<dyn Scene>,
    save_select: Box<dyn Scene>,
) -> Result<(), AppError> {
    let metrics_handle = MetricsHandle::default();
    run_app_with_metrics(config, menu, save_select, metrics_handle)
}

pub fn run_app_with_metrics(
    config: LoopConfig,
    menu: Box<dyn Scene>,
    save_select: Box<dyn Scene>,
    metrics_handle: MetricsHandle,
) -> Result<(), AppError> {
    let mut scenes = SceneMachine::new(menu, save_select, config.initial_scene);
    let app_paths = resolve_app_paths()?;
    info!(
        root = %app_paths.root.display(),
        asset_dir = %app_paths.asset_dir.display(),
        "startup"
    );

    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.window_title.clone())
            .with_inner_size(LogicalSize::new(
                config.window_width as f64,
                config.window_height as f64,
            ))
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    );
    let mut renderer = Renderer::new(Arc::clone(&window)).map_err(AppError::CreateRenderer)?;

    event_loop.set_control_flow(ControlFlow::Poll);

    let target_tps = config.target_tps.max(1);
    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(1));
    let fixed_dt = Duration::from_secs_f64(1.0 / target_tps as f64);
    let fixed_dt_seconds = fixed_dt.as_secs_f32();
    let slow_frame_delay = resolve_slow_frame_delay(config.simulated_slow_frame_ms);
    let effective_render_cap = normalize_render_fps_cap(config.max_render_fps);
    let render_frame_target = target_frame_duration(effective_render_cap);
    let mut input_collector = InputCollector::new(config.window_width, config.window_height);

    scenes.set_assets_for_all(Assets::new(app_paths.asset_dir.clone()));
    scenes.set_visible_size_for_all(Vec2::new(
        config.window_width as f32,
        config.window_height as f32,
    ));
    scenes.load_active();
    info!(
        scene = ?scenes.active_scene(),
        node_count = scenes.active_world().node_count(),
        "scene_loaded"
    );

    info!(
        target_tps,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_ticks_per_frame,
        metrics_log_interval_ms = metrics_log_interval.as_millis() as u64,
        slow_frame_delay_ms = slow_frame_delay.as_millis() as u64,
        render_fps_cap = %format_render_cap(effective_render_cap),
        "loop_config"
    );

    let mut accumulator = Duration::ZERO;
    let mut last_frame_instant = Instant::now();
    let mut last_present_instant = Instant::now();
    let mut metrics_accumulator = MetricsAccumulator::new(metrics_log_interval, Instant::now());
    let mut last_applied_title: Option<String> = None;
    let mut overlay_visible = config.overlay_visible;

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => {
                    input_collector.mark_quit_requested();
                    info!(reason = "window_close", "shutdown_requested");
                    window_target.exit();
                }
                WindowEvent::Resized(new_size) => {
                    input_collector.set_window_size(new_size.width, new_size.height);
                    if let Err(error) = renderer.resize(new_size.width, new_size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::ScaleFactorChanged { .. } => {
                    let size = window.inner_size();
                    input_collector.set_window_size(size.width, size.height);
                    if let Err(error) = renderer.resize(size.width, size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    let key_event =
                        input_collector.handle_key(event.physical_key, event.state, event.repeat);
                    if let Some(key_event) = key_event {
                        let deliveries = scenes.dispatch_key_event_active(key_event);
                        debug!(key = ?key_event.key, state = ?key_event.state, deliveries, "key_event_dispatched");
                    }
                    if input_collector.quit_requested {
                        info!(reason = "escape_key", "shutdown_requested");
                        window_target.exit();
                    }
                }
                WindowEvent::RedrawRequested => {
                    if input_collector.take_overlay_toggle_pressed() {
                        overlay_visible = !overlay_visible;
                        info!(overlay_visible, "overlay_toggled");
                    }

                    if slow_frame_delay > Duration::ZERO {
                        thread::sleep(slow_frame_delay);
                    }

                    let now = Instant::now();
                    let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
                    last_frame_instant = now;

                    let clamped_frame_dt = clamp_frame_delta(raw_frame_dt, max_frame_delta);
                    accumulator = accumulator.saturating_add(clamped_frame_dt);

                    let step_plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
                    for _ in 0..step_plan.ticks_to_run {
                        let input_snapshot = input_collector.snapshot_for_tick();
                        let command = scenes.update_active(fixed_dt_seconds, &input_snapshot);
                        let switched = match command {
                            SceneCommand::SwitchTo(next_scene) => scenes.switch_to(next_scene),
                            SceneCommand::None => false,
                        };
                        if switched {
                            info!(
                                scene = ?scenes.active_scene(),
                                node_count = scenes.active_world().node_count(),
                                "scene_switched"
                            );
                        }
                    }
                    accumulator = step_plan.remaining_accumulator;
                    metrics_accumulator.record_ticks(step_plan.ticks_to_run, step_plan.dropped_ticks);

                    if step_plan.dropped_ticks > 0 {
                        warn!(
                            dropped_ticks = step_plan.dropped_ticks,
                            max_ticks_per_frame, "sim_clamp_triggered"
                        );
                    }

                    let elapsed_since_last_present =
                        Instant::now().saturating_duration_since(last_present_instant);
                    let cap_sleep =
                        compute_cap_sleep(elapsed_since_last_present, render_frame_target);
                    if cap_sleep > Duration::ZERO {
                        thread::sleep(cap_sleep);
                    }

                    scenes.render_active();
                    let overlay = overlay_visible.then(|| OverlayData {
                        metrics: metrics_handle.snapshot(),
                        slow_frame_delay_ms: slow_frame_delay.as_millis() as u64,
                        scene_title: scenes.debug_title_active(),
                        scene_lines: scenes.debug_overlay_lines_active().unwrap_or_default(),
                    });
                    if let Err(error) = renderer.render_world(scenes.active_world(), overlay.as_ref())
                    {
                        warn!(error = %error, "renderer_draw_failed");
                        window_target.exit();
                    }
                    last_present_instant = Instant::now();

                    let next_title = scenes.debug_title_active();
                    if next_title != last_applied_title {
                        match &next_title {
                            Some(title) => {
                                window.set_title(&format!("{} - {title}", config.window_title))
                            }
                            None => window.set_title(&config.window_title),
                        }
                        last_applied_title = next_title;
                    }

                    let world = scenes.active_world();
                    metrics_accumulator.record_scene(world.node_count(), world.animation_count());
                    metrics_accumulator.record_frame(raw_frame_dt);
                    if let Some(snapshot) = metrics_accumulator.maybe_snapshot(now) {
                        metrics_handle.publish(snapshot);
                        info!(
                            fps = snapshot.fps,
                            tps = snapshot.tps,
                            frame_time_ms = snapshot.frame_time_ms,
                            node_count = snapshot.node_count,
                            scene = ?scenes.active_scene(),
                            "loop_metrics"
                        );
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                window.request_redraw();
            }
            Event::LoopExiting => {
                scenes.shutdown_all();
                info!("shutdown");
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)
}

/// Press edge of a key that must be released before it fires again.
#[derive(Debug, Default, Clone, Copy)]
struct EdgeKey {
    is_down: bool,
    pressed_edge: bool,
}

impl EdgeKey {
    fn handle(&mut self, state: ElementState) {
        match state {
            ElementState::Pressed => {
                if !self.is_down {
                    self.pressed_edge = true;
                }
                self.is_down = true;
            }
            ElementState::Released => self.is_down = false,
        }
    }

    fn take(&mut self) -> bool {
        std::mem::take(&mut self.pressed_edge)
    }
}

#[derive(Debug, Default)]
struct InputCollector {
    quit_requested: bool,
    switch_scene: EdgeKey,
    overlay_toggle: EdgeKey,
    action_states: ActionStates,
    window_width: u32,
    window_height: u32,
}

impl InputCollector {
    fn new(window_width: u32, window_height: u32) -> Self {
        Self {
            window_width,
            window_height,
            ..Self::default()
        }
    }

    fn mark_quit_requested(&mut self) {
        self.quit_requested = true;
    }

    /// Updates held actions and edge keys, then returns the event for scene
    /// listeners when the key is one they understand.
    fn handle_key(
        &mut self,
        physical_key: PhysicalKey,
        state: ElementState,
        repeat: bool,
    ) -> Option<KeyEvent> {
        let key = map_physical_key(physical_key)?;
        let is_pressed = state == ElementState::Pressed;
        if let Some(action) = InputAction::from_key(key) {
            self.action_states.set(action, is_pressed);
            if action == InputAction::Quit && is_pressed {
                self.mark_quit_requested();
            }
        }
        match key {
            KeyCode::Tab => self.switch_scene.handle(state),
            KeyCode::F3 => self.overlay_toggle.handle(state),
            _ => {}
        }
        Some(KeyEvent {
            key,
            state: if is_pressed {
                KeyState::Pressed
            } else {
                KeyState::Released
            },
            repeat,
        })
    }

    fn snapshot_for_tick(&mut self) -> InputSnapshot {
        InputSnapshot::new(
            self.quit_requested,
            self.switch_scene.take(),
            self.action_states,
            self.window_width,
            self.window_height,
        )
    }

    fn take_overlay_toggle_pressed(&mut self) -> bool {
        self.overlay_toggle.take()
    }

    fn set_window_size(&mut self, width: u32, height: u32) {
        self.window_width = width;
        self.window_height = height;
    }
}

fn map_physical_key(physical_key: PhysicalKey) -> Option<KeyCode> {
    let PhysicalKey::Code(code) = physical_key else {
        return None;
    };
    let key = match code {
        WinitKeyCode::KeyW => KeyCode::W,
        WinitKeyCode::KeyA => KeyCode::A,
        WinitKeyCode::KeyS => KeyCode::S,
        WinitKeyCode::KeyD => KeyCode::D,
        WinitKeyCode::ArrowUp => KeyCode::ArrowUp,
        WinitKeyCode::ArrowDown => KeyCode::ArrowDown,
        WinitKeyCode::ArrowLeft => KeyCode::ArrowLeft,
        WinitKeyCode::ArrowRight => KeyCode::ArrowRight,
        WinitKeyCode::Tab => KeyCode::Tab,
        WinitKeyCode::Escape => KeyCode::Escape,
        WinitKeyCode::F1 => KeyCode::F1,
        WinitKeyCode::F2 => KeyCode::F2,
        WinitKeyCode::F3 => KeyCode::F3,
        _ => return None,
    };
    Some(key)
}

#[derive(Debug, Clone, Copy)]
struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_ticks: u32,
}

fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;
    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    let mut dropped_ticks = 0u32;
    if accumulator >= fixed_dt {
        let whole = accumulator.as_nanos() / fixed_dt.as_nanos().max(1);
        dropped_ticks = u32::try_from(whole).unwrap_or(u32::MAX);
        accumulator = Duration::ZERO;
    }
    StepPlan {
        ticks_to_run,
        remaining_accumulator: accumulator,
        dropped_ticks,
    }
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

fn normalize_render_fps_cap(cap: Option<u32>) -> Option<u32> {
    cap.filter(|value| *value > 0)
}

fn target_frame_duration(max_render_fps: Option<u32>) -> Option<Duration> {
    max_render_fps.map(|fps| Duration::from_secs_f64(1.0 / fps as f64))
}

fn compute_cap_sleep(elapsed: Duration, target: Option<Duration>) -> Duration {
    match target {
        Some(frame_target) if elapsed < frame_target => frame_target - elapsed,
        _ => Duration::ZERO,
    }
}

fn format_render_cap(cap: Option<u32>) -> String {
    match cap {
        Some(value) => value.to_string(),
        None => "off".to_string(),
    }
}

fn resolve_slow_frame_delay(config_slow_frame_ms: u64) -> Duration {
    parse_slow_frame_delay(env::var(SLOW_FRAME_ENV_VAR), config_slow_frame_ms)
}

fn parse_slow_frame_delay(
    value: Result<String, env::VarError>,
    config_slow_frame_ms: u64,
) -> Duration {
    match value {
        Ok(value) => match value.trim().parse::<u64>() {
            Ok(ms) => Duration::from_millis(ms),
            Err(_) => {
                warn!(
                    env_var = SLOW_FRAME_ENV_VAR,
                    value = value.as_str(),
                    "slow_frame_env_invalid_using_config"
                );
                Duration::from_millis(config_slow_frame_ms)
            }
        },
        Err(env::VarError::NotPresent) => Duration::from_millis(config_slow_frame_ms),
        Err(err) => {
            warn!(
                env_var = SLOW_FRAME_ENV_VAR,
                error = %err,
                "slow_frame_env_unreadable_using_config"
            );
            Duration::from_millis(config_slow_frame_ms)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(input: &mut InputCollector, code: WinitKeyCode) -> Option<KeyEvent> {
        input.handle_key(PhysicalKey::Code(code), ElementState::Pressed, false)
    }

    fn release(input: &mut InputCollector, code: WinitKeyCode) -> Option<KeyEvent> {
        input.handle_key(PhysicalKey::Code(code), ElementState::Released, false)
    }

    #[test]
    fn clamp_frame_delta_caps_large_frame() {
        let max_frame_delta = Duration::from_millis(250);
        assert_eq!(
            clamp_frame_delta(Duration::from_millis(600), max_frame_delta),
            max_frame_delta
        );
    }

    #[test]
    fn plan_sim_steps_runs_expected_ticks_without_drop() {
        let result = plan_sim_steps(Duration::from_millis(50), Duration::from_millis(16), 5);
        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::from_millis(2));
        assert_eq!(result.dropped_ticks, 0);
    }

    #[test]
    fn plan_sim_steps_drops_whole_backlog_when_tick_cap_hit() {
        let result = plan_sim_steps(Duration::from_millis(120), Duration::from_millis(16), 3);
        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::ZERO);
        // 72ms of backlog holds four whole 16ms ticks.
        assert_eq!(result.dropped_ticks, 4);
    }

    #[test]
    fn tab_press_is_edge_triggered_for_single_tick() {
        let mut input = InputCollector::new(1280, 720);
        press(&mut input, WinitKeyCode::Tab);
        assert!(input.snapshot_for_tick().switch_scene_pressed());
        assert!(!input.snapshot_for_tick().switch_scene_pressed());

        press(&mut input, WinitKeyCode::Tab);
        assert!(!input.snapshot_for_tick().switch_scene_pressed());
        release(&mut input, WinitKeyCode::Tab);
        press(&mut input, WinitKeyCode::Tab);
        assert!(input.snapshot_for_tick().switch_scene_pressed());
    }

    #[test]
    fn wasd_keys_hold_actions_until_released() {
        let mut input = InputCollector::default();
        press(&mut input, WinitKeyCode::KeyW);
        press(&mut input, WinitKeyCode::ArrowLeft);
        let snapshot = input.snapshot_for_tick();
        assert!(snapshot.is_down(InputAction::MoveUp));
        assert!(snapshot.is_down(InputAction::MoveLeft));

        release(&mut input, WinitKeyCode::KeyW);
        let snapshot = input.snapshot_for_tick();
        assert!(!snapshot.is_down(InputAction::MoveUp));
        assert!(snapshot.is_down(InputAction::MoveLeft));
    }

    #[test]
    fn known_keys_become_listener_events() {
        let mut input = InputCollector::default();
        assert_eq!(
            press(&mut input, WinitKeyCode::KeyD),
            Some(KeyEvent::pressed(KeyCode::D))
        );
        assert_eq!(
            release(&mut input, WinitKeyCode::F1),
            Some(KeyEvent::released(KeyCode::F1))
        );
        let repeated = input.handle_key(
            PhysicalKey::Code(WinitKeyCode::KeyA),
            ElementState::Pressed,
            true,
        );
        assert!(repeated.is_some_and(|event| event.repeat));
        assert_eq!(press(&mut input, WinitKeyCode::KeyQ), None);
    }

    #[test]
    fn escape_requests_quit() {
        let mut input = InputCollector::default();
        press(&mut input, WinitKeyCode::Escape);
        assert!(input.quit_requested);
        assert!(input.snapshot_for_tick().quit_requested());
    }

    #[test]
    fn f3_toggle_is_edge_triggered() {
        let mut input = InputCollector::default();
        press(&mut input, WinitKeyCode::F3);
        assert!(input.take_overlay_toggle_pressed());
        press(&mut input, WinitKeyCode::F3);
        assert!(!input.take_overlay_toggle_pressed());
        release(&mut input, WinitKeyCode::F3);
        press(&mut input, WinitKeyCode::F3);
        assert!(input.take_overlay_toggle_pressed());
    }

    #[test]
    fn snapshot_carries_window_size() {
        let mut input = InputCollector::new(1280, 720);
        input.set_window_size(640, 360);
        assert_eq!(input.snapshot_for_tick().window_size(), (640, 360));
    }

    #[test]
    fn render_cap_helpers() {
        assert_eq!(target_frame_duration(None), None);
        let target = target_frame_duration(Some(60)).expect("duration");
        assert!((target.as_secs_f64() - (1.0 / 60.0)).abs() < 0.000_001);
        assert_eq!(
            compute_cap_sleep(Duration::from_millis(20), Some(target)),
            Duration::ZERO
        );
        assert!(compute_cap_sleep(Duration::from_millis(5), Some(target)) > Duration::ZERO);
        assert_eq!(normalize_render_fps_cap(Some(0)), None);
    }

    #[test]
    fn slow_frame_env_value_overrides_config_when_valid() {
        assert_eq!(
            parse_slow_frame_delay(Ok(" 40 ".to_string()), 5),
            Duration::from_millis(40)
        );
        assert_eq!(
            parse_slow_frame_delay(Ok("slow".to_string()), 5),
            Duration::from_millis(5)
        );
        assert_eq!(
            parse_slow_frame_delay(Err(env::VarError::NotPresent), 0),
            Duration::ZERO
        );
    }
}
