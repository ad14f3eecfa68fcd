use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use image::ImageReader;
use pixels::{Error, Pixels, SurfaceTexture};
use tracing::warn;
use winit::window::Window;

use crate::app::{
    tools::{draw_overlay, OverlayData},
    Assets, FrameRect, NodeKind, SceneWorld, SpriteSource,
};

use super::text::{draw_text_clipped, fill_rect_clipped, text_height_px, text_width_px};
use super::transform::camera_pixels_per_world;
use super::{world_to_screen_px, Viewport, PLACEHOLDER_HALF_SIZE_PX};

const CLEAR_COLOR: [u8; 4] = [14, 12, 20, 255];
const PLACEHOLDER_COLOR: [u8; 4] = [220, 90, 200, 255];
/// Screen pixels per glyph pixel for a label of scale 1.0 at zoom 1.0.
const LABEL_GLYPH_PIXELS: f32 = 5.0;

struct LoadedTexture {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

/// Sub-rectangle of a texture to draw. A rotated region stores the image
/// turned 90 degrees clockwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SourceRegion {
    rect: FrameRect,
    rotated: bool,
}

impl SourceRegion {
    fn whole(texture: &LoadedTexture) -> Self {
        Self {
            rect: FrameRect {
                x: 0,
                y: 0,
                width: texture.width,
                height: texture.height,
            },
            rotated: false,
        }
    }

    fn display_size(&self) -> (u32, u32) {
        if self.rotated {
            (self.rect.height, self.rect.width)
        } else {
            (self.rect.width, self.rect.height)
        }
    }

    /// Texture pixel shown at display coordinate (`u`, `v`).
    fn source_pixel(&self, u: u32, v: u32) -> (u32, u32) {
        if self.rotated {
            (self.rect.x + (self.rect.width - 1 - v), self.rect.y + u)
        } else {
            (self.rect.x + u, self.rect.y + v)
        }
    }
}

pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    viewport: Viewport,
    texture_cache: HashMap<String, Option<LoadedTexture>>,
    warned_missing: HashSet<String>,
}

impl Renderer {
    pub fn new(window: Arc<Window>) -> Result<Self, Error> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(Arc::clone(&window), size.width, size.height)?;
        Ok(Self {
            window,
            pixels,
            viewport: Viewport {
                width: size.width,
                height: size.height,
            },
            texture_cache: HashMap::new(),
            warned_missing: HashSet::new(),
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(Arc::clone(&self.window), width, height)?;
        self.viewport = Viewport { width, height };
        Ok(())
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn build_pixels(
        window: Arc<Window>,
        width: u32,
        height: u32,
    ) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(width, height, window);
        Pixels::new(width, height, surface)
    }

    pub(crate) fn render_world(
        &mut self,
        world: &SceneWorld,
        overlay_data: Option<&OverlayData>,
    ) -> Result<(), Error> {
        let Viewport { width, height } = self.viewport;
        if width == 0 || height == 0 {
            return Ok(());
        }

        let texture_cache = &mut self.texture_cache;
        let warned_missing = &mut self.warned_missing;
        let frame = self.pixels.frame_mut();
        for chunk in frame.chunks_exact_mut(4) {
            chunk.copy_from_slice(&CLEAR_COLOR);
        }

        let camera = world.camera();
        let pixels_per_world = camera_pixels_per_world(camera);
        let assets = world.assets();
        for item in world.draw_list() {
            let (cx, cy) = world_to_screen_px(item.transform.position, camera, self.viewport);
            let scale = item.transform.scale * pixels_per_world;
            match &item.node.kind {
                NodeKind::Sprite(SpriteSource::Texture(name)) => {
                    match resolve_cached_texture(texture_cache, warned_missing, assets, name) {
                        Some(texture) => draw_region_centered_scaled(
                            frame,
                            width,
                            height,
                            cx,
                            cy,
                            texture,
                            SourceRegion::whole(texture),
                            scale,
                        ),
                        None => draw_placeholder(frame, width, height, cx, cy),
                    }
                }
                NodeKind::Sprite(SpriteSource::Frame(name)) => {
                    let Some(sprite_frame) = assets.sprite_frames().frame(name) else {
                        warn_load_once(warned_missing, name, "frame_not_in_cache");
                        draw_placeholder(frame, width, height, cx, cy);
                        continue;
                    };
                    let Some(texture) = resolve_cached_texture(
                        texture_cache,
                        warned_missing,
                        assets,
                        &sprite_frame.texture,
                    ) else {
                        draw_placeholder(frame, width, height, cx, cy);
                        continue;
                    };
                    let offset_x = (sprite_frame.offset.x * scale).round() as i32;
                    let offset_y = (sprite_frame.offset.y * scale).round() as i32;
                    draw_region_centered_scaled(
                        frame,
                        width,
                        height,
                        cx + offset_x,
                        cy - offset_y,
                        texture,
                        SourceRegion {
                            rect: sprite_frame.rect,
                            rotated: sprite_frame.rotated,
                        },
                        scale,
                    );
                }
                NodeKind::Label(label) => {
                    draw_label_centered(frame, width, height, cx, cy, &label.text, label.color, scale);
                }
                NodeKind::Empty | NodeKind::Parallax => {}
            }
        }

        if let Some(data) = overlay_data {
            draw_overlay(frame, width, height, data);
        }

        self.pixels.render()
    }
}

fn resolve_cached_texture<'a>(
    cache: &'a mut HashMap<String, Option<LoadedTexture>>,
    warned_missing: &mut HashSet<String>,
    assets: &Assets,
    name: &str,
) -> Option<&'a LoadedTexture> {
    if !cache.contains_key(name) {
        let loaded = assets
            .resolve(name)
            .map_err(|error| format!("invalid_name:{error}"))
            .and_then(|path| load_texture_rgba(&path));
        let texture = match loaded {
            Ok(texture) => Some(texture),
            Err(reason) => {
                warn_load_once(warned_missing, name, &reason);
                None
            }
        };
        cache.insert(name.to_string(), texture);
    }
    cache.get(name).and_then(Option::as_ref)
}

fn load_texture_rgba(path: &Path) -> Result<LoadedTexture, String> {
    let reader = ImageReader::open(path).map_err(|error| format!("file_open_failed:{error}"))?;
    let decoded = reader
        .decode()
        .map_err(|error| format!("decode_failed:{error}"))?;
    let image = decoded.to_rgba8();
    Ok(LoadedTexture {
        width: image.width(),
        height: image.height(),
        rgba: image.into_raw(),
    })
}

fn warn_load_once(warned: &mut HashSet<String>, name: &str, reason: &str) {
    if !warned.insert(name.to_string()) {
        return;
    }
    warn!(
        asset = name,
        reason = reason,
        "renderer_asset_missing_using_placeholder"
    );
}

fn draw_placeholder(frame: &mut [u8], width: u32, height: u32, cx: i32, cy: i32) {
    let size = PLACEHOLDER_HALF_SIZE_PX * 2 + 1;
    fill_rect_clipped(
        frame,
        width,
        height,
        cx - PLACEHOLDER_HALF_SIZE_PX,
        cy - PLACEHOLDER_HALF_SIZE_PX,
        size,
        size,
        PLACEHOLDER_COLOR,
    );
}

fn label_pixel_scale(scale: f32) -> i32 {
    if !scale.is_finite() {
        return 1;
    }
    ((scale * LABEL_GLYPH_PIXELS).round() as i32).max(1)
}

#[allow(clippy::too_many_arguments)]
fn draw_label_centered(
    frame: &mut [u8],
    width: u32,
    height: u32,
    cx: i32,
    cy: i32,
    text: &str,
    color: [u8; 4],
    scale: f32,
) {
    let pixel_scale = label_pixel_scale(scale);
    let left = cx - text_width_px(text, pixel_scale) / 2;
    let top = cy - text_height_px(pixel_scale) / 2;
    draw_text_clipped(frame, width, height, left, top, text, color, pixel_scale);
}

fn normalized_scale(scale: f32) -> f32 {
    if scale.is_finite() && scale > 0.0 {
        scale
    } else {
        1.0
    }
}

fn scaled_dimensions(region: SourceRegion, scale: f32) -> (u32, u32) {
    let scale = normalized_scale(scale);
    let (display_w, display_h) = region.display_size();
    let width = (display_w as f32 * scale).round().max(1.0) as u32;
    let height = (display_h as f32 * scale).round().max(1.0) as u32;
    (width, height)
}

#[allow(clippy::too_many_arguments)]
fn draw_region_centered_scaled(
    frame: &mut [u8],
    width: u32,
    height: u32,
    center_x: i32,
    center_y: i32,
    texture: &LoadedTexture,
    region: SourceRegion,
    scale: f32,
) {
    let (display_w, display_h) = region.display_size();
    if display_w == 0 || display_h == 0 || width == 0 || height == 0 {
        return;
    }
    let expected_rgba_len = texture.width as usize * texture.height as usize * 4;
    if texture.rgba.len() < expected_rgba_len {
        return;
    }

    let scale = normalized_scale(scale);
    let inv_scale = scale.recip();
    let (scaled_w, scaled_h) = scaled_dimensions(region, scale);
    let left = center_x - (scaled_w as i32 / 2);
    let top = center_y - (scaled_h as i32 / 2);
    let right = left + scaled_w as i32;
    let bottom = top + scaled_h as i32;

    let draw_left = left.max(0);
    let draw_top = top.max(0);
    let draw_right = right.min(width as i32);
    let draw_bottom = bottom.min(height as i32);
    if draw_left >= draw_right || draw_top >= draw_bottom {
        return;
    }

    let frame_width = width as usize;
    let texture_width = texture.width as usize;
    for out_y in draw_top..draw_bottom {
        let v = (((out_y - top) as f32) * inv_scale).floor() as u32;
        let v = v.min(display_h - 1);
        let dst_row_offset = out_y as usize * frame_width * 4;
        for out_x in draw_left..draw_right {
            let u = (((out_x - left) as f32) * inv_scale).floor() as u32;
            let u = u.min(display_w - 1);
            let (src_x, src_y) = region.source_pixel(u, v);
            if src_x >= texture.width || src_y >= texture.height {
                continue;
            }
            let src_offset = (src_y as usize * texture_width + src_x as usize) * 4;
            let alpha = texture.rgba[src_offset + 3];
            if alpha == 0 {
                continue;
            }
            let dst_offset = dst_row_offset + out_x as usize * 4;
            frame[dst_offset..dst_offset + 3]
                .copy_from_slice(&texture.rgba[src_offset..src_offset + 3]);
            frame[dst_offset + 3] = alpha;
        }
    }
}
