/// Held W/A/S/D directions. Opposite directions may be held together.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct DirectionState {
    pub(crate) up: bool,
    pub(crate) down: bool,
    pub(crate) left: bool,
    pub(crate) right: bool,
}

impl DirectionState {
    /// Returns false for keys that are not directions.
    pub(crate) fn apply_key(&mut self, event: KeyEvent) -> bool {
        let held = event.is_pressed();
        let flag = match event.key {
            KeyCode::W => &mut self.up,
            KeyCode::S => &mut self.down,
            KeyCode::A => &mut self.left,
            KeyCode::D => &mut self.right,
            _ => return false,
        };
        *flag = held;
        true
    }

    pub(crate) fn any(&self) -> bool {
        self.up || self.down || self.left || self.right
    }
}

/// Nodes repositioned from the camera each tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct LayerHandles {
    pub(crate) background: Option<NodeId>,
    pub(crate) parallax: Option<NodeId>,
}

pub(crate) fn parallax_position(camera: Vec2) -> Vec2 {
    Vec2::new(
        PARALLAX_BASE.x + camera.x * PARALLAX_FACTOR,
        PARALLAX_BASE.y + camera.y * PARALLAX_FACTOR,
    )
}

pub(crate) fn background_position(camera: Vec2) -> Vec2 {
    Vec2::new(
        BACKGROUND_BASE.x + camera.x * BACKGROUND_FACTOR,
        BACKGROUND_BASE.y + camera.y * BACKGROUND_FACTOR,
    )
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct CameraController {
    step: f32,
}

impl Default for CameraController {
    fn default() -> Self {
        Self {
            step: CAMERA_STEP_PER_TICK,
        }
    }
}

impl CameraController {
    /// Moves the camera a fixed step per active axis regardless of `dt`, then
    /// derives the background layer positions from it.
    pub(crate) fn tick(
        &self,
        _dt: f32,
        directions: DirectionState,
        world: &mut SceneWorld,
        layers: LayerHandles,
    ) {
        let camera = world.camera_mut();
        if directions.up {
            camera.position.y += self.step;
        }
        if directions.down {
            camera.position.y -= self.step;
        }
        if directions.left {
            camera.position.x -= self.step;
        }
        if directions.right {
            camera.position.x += self.step;
        }

        let camera_position = camera.position;
        if let Some(parallax) = layers.parallax {
            world.set_position(parallax, parallax_position(camera_position));
        }
        if let Some(background) = layers.background {
            world.set_position(background, background_position(camera_position));
        }
    }
}
