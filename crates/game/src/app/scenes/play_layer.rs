const MAX_OVERLAY_ERRORS: usize = 3;
const MAX_OVERLAY_SKIPPED: usize = 3;
const MAX_OVERLAY_BLOCKS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PlayPhase {
    /// The "Loading" label is on screen; the level loads on the next tick.
    ShowingPlaceholder,
    Loading,
    Ready,
}

/// Play area for one level file. Loads the level one tick after it is
/// attached, then pans the camera from W/A/S/D.
pub(crate) struct PlayLayer {
    level: String,
    phase: PlayPhase,
    root: Option<NodeId>,
    placeholder: Option<NodeId>,
    listener: Option<ListenerId>,
    directions: DirectionState,
    camera: CameraController,
    loaded: LoadedLevel,
    report: Option<LoadReport>,
    show_block_labels: bool,
    show_parallax: bool,
}

impl PlayLayer {
    pub(crate) fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            phase: PlayPhase::ShowingPlaceholder,
            root: None,
            placeholder: None,
            listener: None,
            directions: DirectionState::default(),
            camera: CameraController::default(),
            loaded: LoadedLevel::default(),
            report: None,
            show_block_labels: true,
            show_parallax: true,
        }
    }

    #[cfg(test)]
    pub(crate) fn phase(&self) -> PlayPhase {
        self.phase
    }

    #[cfg(test)]
    pub(crate) fn loaded(&self) -> &LoadedLevel {
        &self.loaded
    }

    #[cfg(test)]
    pub(crate) fn report(&self) -> Option<&LoadReport> {
        self.report.as_ref()
    }

    fn finish_loading(&mut self, world: &mut SceneWorld) {
        let Some(root) = self.root else {
            return;
        };
        let (loaded, report) = LevelLoader::load(&self.level, world, root);
        self.loaded = loaded;
        if !report.success() {
            warn!(
                level = %self.level,
                errors = report.errors.len(),
                "play_layer_load_incomplete"
            );
        }
        self.report = Some(report);

        if let Some(placeholder) = self.placeholder {
            world.set_visible(placeholder, false);
        }
        self.listener = Some(
            world
                .events_mut()
                .add_keyboard_listener(PLAY_LISTENER_PRIORITY),
        );
        self.phase = PlayPhase::Ready;
        info!(
            level = %self.level,
            blocks = self.loaded.blocks.len(),
            node_count = world.node_count(),
            "play_layer_ready"
        );
    }

    fn set_block_labels_visible(&mut self, visible: bool, world: &mut SceneWorld) {
        self.show_block_labels = visible;
        for label in &self.loaded.labels {
            world.set_visible(*label, visible);
        }
    }

    fn set_parallax_visible(&mut self, visible: bool, world: &mut SceneWorld) {
        self.show_parallax = visible;
        if let Some(parallax) = self.loaded.parallax {
            world.set_visible(parallax, visible);
        }
    }
}

impl Scene for PlayLayer {
    fn load(&mut self, world: &mut SceneWorld) {
        let center = world.camera().position;
        let root = world.add_child(NodeDesc::empty(), 0);
        let placeholder =
            world.add_child_to(root, NodeDesc::label(PLACEHOLDER_TEXT).at(center), 0);
        self.root = Some(root);
        self.placeholder = placeholder;
        self.phase = PlayPhase::ShowingPlaceholder;
        debug!(level = %self.level, "play_layer_attached");
    }

    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        _input: &InputSnapshot,
        world: &mut SceneWorld,
    ) -> SceneCommand {
        match self.phase {
            PlayPhase::ShowingPlaceholder => self.phase = PlayPhase::Loading,
            PlayPhase::Loading => self.finish_loading(world),
            PlayPhase::Ready => self.camera.tick(
                fixed_dt_seconds,
                self.directions,
                world,
                self.loaded.layer_handles(),
            ),
        }
        SceneCommand::None
    }

    fn render(&mut self, _world: &SceneWorld) {}

    fn unload(&mut self, world: &mut SceneWorld) {
        if let Some(listener) = self.listener.take() {
            world.events_mut().remove_listener(listener);
        }
        if let Some(root) = self.root.take() {
            world.remove_node(root);
        }
        self.placeholder = None;
        self.directions = DirectionState::default();
        self.loaded = LoadedLevel::default();
        self.report = None;
        self.phase = PlayPhase::ShowingPlaceholder;
    }

    fn suspend(&mut self, _world: &mut SceneWorld) {
        self.directions = DirectionState::default();
    }

    fn on_key_event(&mut self, listener: ListenerId, event: KeyEvent, world: &mut SceneWorld) {
        if self.listener != Some(listener) || self.directions.apply_key(event) {
            return;
        }
        if !event.is_pressed() || event.repeat {
            return;
        }
        match event.key {
            KeyCode::F1 => self.set_block_labels_visible(!self.show_block_labels, world),
            KeyCode::F2 => self.set_parallax_visible(!self.show_parallax, world),
            _ => {}
        }
    }

    fn debug_title(&self, _world: &SceneWorld) -> Option<String> {
        Some(format!("Play {}", self.level))
    }

    fn debug_overlay_lines(&self, world: &SceneWorld) -> Option<Vec<String>> {
        if self.phase != PlayPhase::Ready {
            return None;
        }
        let camera = world.camera();
        let mut lines = vec![
            "PlayScene Debug".to_string(),
            format!("Block ID Labels: {} (F1)", on_off(self.show_block_labels)),
            format!("Show parallax node: {} (F2)", on_off(self.show_parallax)),
            format!(
                "Camera: {:.0}, {:.0} zoom {:.2}{}",
                camera.position.x,
                camera.position.y,
                camera.zoom,
                if self.directions.any() { " moving" } else { "" }
            ),
            format!(
                "Blocks: {}  Background: {}",
                self.loaded.blocks.len(),
                self.loaded.background_blocks.len()
            ),
        ];
        lines.extend(
            self.loaded
                .background_blocks
                .iter()
                .chain(&self.loaded.blocks)
                .take(MAX_OVERLAY_BLOCKS)
                .map(|block| block.describe(world)),
        );
        if let Some(report) = &self.report {
            lines.push(format!(
                "Skipped: {}  Errors: {}",
                report.skipped.len(),
                report.errors.len()
            ));
            lines.extend(
                report
                    .errors
                    .iter()
                    .take(MAX_OVERLAY_ERRORS)
                    .map(|error| error.to_string()),
            );
            lines.extend(
                report
                    .skipped
                    .iter()
                    .take(MAX_OVERLAY_SKIPPED)
                    .map(SkippedRecord::describe),
            );
        }
        Some(lines)
    }
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}
