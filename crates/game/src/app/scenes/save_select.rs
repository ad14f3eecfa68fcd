const SAVE_SELECT_TITLE: &str = "Select Save";
const SAVE_SELECT_HINT: &str = "Tab: back";
const TITLE_OFFSET_Y: f32 = 200.0;

pub(crate) struct SaveSelectScene {
    title: Option<NodeId>,
    hint: Option<NodeId>,
}

impl SaveSelectScene {
    pub(crate) fn new() -> Self {
        Self {
            title: None,
            hint: None,
        }
    }
}

impl Scene for SaveSelectScene {
    fn load(&mut self, world: &mut SceneWorld) {
        let size = world.visible_size();
        let center = Vec2::new(size.x * 0.5, size.y * 0.5);
        world.camera_mut().position = center;
        self.title = Some(world.add_child(
            NodeDesc::label(SAVE_SELECT_TITLE).at(Vec2::new(center.x, center.y + TITLE_OFFSET_Y)),
            0,
        ));
        self.hint = Some(world.add_child(
            NodeDesc::label(SAVE_SELECT_HINT)
                .at(Vec2::new(center.x, center.y - TITLE_OFFSET_Y))
                .scaled(0.6),
            0,
        ));
        info!(node_count = world.node_count(), "save_select_loaded");
    }

    fn update(
        &mut self,
        _fixed_dt_seconds: f32,
        input: &InputSnapshot,
        _world: &mut SceneWorld,
    ) -> SceneCommand {
        if input.switch_scene_pressed() {
            return SceneCommand::SwitchTo(SceneKey::Menu);
        }
        SceneCommand::None
    }

    fn render(&mut self, _world: &SceneWorld) {}

    fn unload(&mut self, world: &mut SceneWorld) {
        for node in [self.title.take(), self.hint.take()].into_iter().flatten() {
            world.remove_node(node);
        }
    }

    fn debug_title(&self, _world: &SceneWorld) -> Option<String> {
        Some("Save Select".to_string())
    }
}
