/// Title scene: the cave backdrop with a live play layer on top.
pub(crate) struct MenuScene {
    backdrop: Option<NodeId>,
    play_layer: PlayLayer,
}

impl MenuScene {
    pub(crate) fn new(level: impl Into<String>) -> Self {
        Self {
            backdrop: None,
            play_layer: PlayLayer::new(level),
        }
    }
}

impl Scene for MenuScene {
    fn load(&mut self, world: &mut SceneWorld) {
        let size = world.visible_size();
        let center = Vec2::new(size.x * 0.5, size.y * 0.5);
        world.camera_mut().position = center;

        if let Err(error) = world.assets_mut().load_texture(MENU_BACKDROP) {
            warn!(texture = MENU_BACKDROP, error = %error, "menu_backdrop_missing");
        }
        self.backdrop = Some(world.add_child(
            NodeDesc::texture(MENU_BACKDROP)
                .at(Vec2::new(center.x, MENU_BACKDROP_Y))
                .scaled(MENU_BACKDROP_SCALE),
            0,
        ));
        self.play_layer.load(world);
        info!(node_count = world.node_count(), "menu_loaded");
    }

    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        world: &mut SceneWorld,
    ) -> SceneCommand {
        if input.switch_scene_pressed() {
            return SceneCommand::SwitchTo(SceneKey::SaveSelect);
        }
        self.play_layer.update(fixed_dt_seconds, input, world)
    }

    fn render(&mut self, world: &SceneWorld) {
        self.play_layer.render(world);
    }

    fn unload(&mut self, world: &mut SceneWorld) {
        self.play_layer.unload(world);
        if let Some(backdrop) = self.backdrop.take() {
            world.remove_node(backdrop);
        }
    }

    fn suspend(&mut self, world: &mut SceneWorld) {
        self.play_layer.suspend(world);
    }

    fn on_key_event(&mut self, listener: ListenerId, event: KeyEvent, world: &mut SceneWorld) {
        self.play_layer.on_key_event(listener, event, world);
    }

    fn debug_title(&self, _world: &SceneWorld) -> Option<String> {
        Some("Menu".to_string())
    }

    fn debug_overlay_lines(&self, world: &SceneWorld) -> Option<Vec<String>> {
        self.play_layer.debug_overlay_lines(world)
    }
}
