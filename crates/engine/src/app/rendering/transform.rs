use crate::app::{Camera2D, Vec2};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Screen pixels per world unit at the camera's zoom.
pub(crate) fn camera_pixels_per_world(camera: &Camera2D) -> f32 {
    camera.effective_zoom().recip()
}

/// World is y-up with the camera position at the viewport center; screen is
/// y-down from the top-left corner.
pub fn world_to_screen_px(world: Vec2, camera: &Camera2D, viewport: Viewport) -> (i32, i32) {
    let pixels_per_world = camera_pixels_per_world(camera);
    let x = (world.x - camera.position.x) * pixels_per_world + viewport.width as f32 * 0.5;
    let y = viewport.height as f32 * 0.5 - (world.y - camera.position.y) * pixels_per_world;
    (x.round() as i32, y.round() as i32)
}

pub fn screen_to_world_px(screen: (f32, f32), camera: &Camera2D, viewport: Viewport) -> Vec2 {
    let world_per_pixel = camera.effective_zoom();
    Vec2 {
        x: camera.position.x + (screen.0 - viewport.width as f32 * 0.5) * world_per_pixel,
        y: camera.position.y + (viewport.height as f32 * 0.5 - screen.1) * world_per_pixel,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEWPORT: Viewport = Viewport {
        width: 800,
        height: 600,
    };

    #[test]
    fn camera_position_maps_to_viewport_center() {
        let camera = Camera2D {
            position: Vec2 { x: 40.0, y: -12.0 },
            ..Camera2D::default()
        };
        assert_eq!(world_to_screen_px(camera.position, &camera, VIEWPORT), (400, 300));
    }

    #[test]
    fn world_y_points_up_on_screen() {
        let camera = Camera2D::default();
        let (x, y) = world_to_screen_px(Vec2 { x: 10.0, y: 20.0 }, &camera, VIEWPORT);
        assert_eq!((x, y), (410, 280));
    }

    #[test]
    fn half_zoom_doubles_pixels_per_world_unit() {
        let camera = Camera2D {
            position: Vec2::default(),
            zoom: 0.5,
        };
        let (x, y) = world_to_screen_px(Vec2 { x: 10.0, y: -5.0 }, &camera, VIEWPORT);
        assert_eq!((x, y), (420, 310));
    }

    #[test]
    fn screen_to_world_inverts_world_to_screen() {
        let camera = Camera2D {
            position: Vec2 { x: 100.0, y: 200.0 },
            zoom: 0.5,
        };
        let world = screen_to_world_px((420.0, 310.0), &camera, VIEWPORT);
        assert_eq!(world, Vec2 { x: 110.0, y: 195.0 });
    }
}
