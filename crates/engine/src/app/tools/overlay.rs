use crate::app::rendering::text::{
    draw_text_clipped, fill_rect_clipped, glyph_advance, line_advance,
};
use crate::app::LoopMetricsSnapshot;

const TEXT_SCALE: i32 = 3;
const OVERLAY_PADDING: i32 = 6 * TEXT_SCALE;
const OVERLAY_PANEL_INSET_X: i32 = 4 * TEXT_SCALE;
const OVERLAY_PANEL_INSET_Y: i32 = 3 * TEXT_SCALE;
const OVERLAY_TEXT_PRIMARY_COLOR: [u8; 4] = [244, 248, 252, 255];
const OVERLAY_TEXT_DIM_COLOR: [u8; 4] = [176, 198, 220, 255];
const OVERLAY_PANEL_BG_COLOR: [u8; 4] = [10, 12, 16, 210];
const OVERLAY_PANEL_BORDER_COLOR: [u8; 4] = [92, 106, 126, 255];
const PERF_SECTION_LABEL: &str = "Perf";

#[derive(Debug, Clone, Default)]
pub(crate) struct OverlayData {
    pub metrics: LoopMetricsSnapshot,
    pub slow_frame_delay_ms: u64,
    pub scene_title: Option<String>,
    /// Lines supplied by the active scene; the first one is drawn as a heading.
    pub scene_lines: Vec<String>,
}

pub(crate) fn draw_overlay(frame: &mut [u8], width: u32, height: u32, data: &OverlayData) {
    if width == 0 || height == 0 {
        return;
    }

    let lines = build_overlay_lines(data);
    let longest_line_chars = lines
        .iter()
        .map(|(line, _)| line.chars().count() as i32)
        .max()
        .unwrap_or(0);
    let panel_width = longest_line_chars * glyph_advance(TEXT_SCALE) + OVERLAY_PANEL_INSET_X * 2;
    let panel_height = lines.len() as i32 * line_advance(TEXT_SCALE) + OVERLAY_PANEL_INSET_Y * 2;
    let panel_left = OVERLAY_PADDING - OVERLAY_PANEL_INSET_X;
    let panel_top = OVERLAY_PADDING - OVERLAY_PANEL_INSET_Y;
    fill_rect_clipped(
        frame,
        width,
        height,
        panel_left,
        panel_top,
        panel_width,
        panel_height,
        OVERLAY_PANEL_BG_COLOR,
    );
    draw_rect_outline(
        frame,
        width,
        height,
        panel_left,
        panel_top,
        panel_width,
        panel_height,
        OVERLAY_PANEL_BORDER_COLOR,
    );

    let mut y = OVERLAY_PADDING;
    for (line, color) in lines {
        draw_text_clipped(frame, width, height, OVERLAY_PADDING, y, &line, color, TEXT_SCALE);
        y += line_advance(TEXT_SCALE);
    }
}

fn build_overlay_lines(data: &OverlayData) -> Vec<(String, [u8; 4])> {
    let primary = |line: String| (line, OVERLAY_TEXT_PRIMARY_COLOR);
    let mut lines = vec![
        (PERF_SECTION_LABEL.to_string(), OVERLAY_TEXT_DIM_COLOR),
        primary(format_fps_line(data.metrics.fps, data.slow_frame_delay_ms)),
        primary(format!("TPS: {:.1}", data.metrics.tps)),
        primary(format!("Frame: {:.2} ms", data.metrics.frame_time_ms)),
        primary(format!(
            "Nodes: {}  Anims: {}",
            data.metrics.node_count, data.metrics.animation_count
        )),
    ];
    if data.metrics.dropped_ticks > 0 {
        lines.push(primary(format!("Dropped ticks: {}", data.metrics.dropped_ticks)));
    }
    if let Some(title) = data.scene_title.as_ref() {
        lines.push(primary(format!("Scene: {title}")));
    }

    if !data.scene_lines.is_empty() {
        lines.push(primary(String::new()));
        for (index, line) in data.scene_lines.iter().enumerate() {
            let color = if index == 0 {
                OVERLAY_TEXT_DIM_COLOR
            } else {
                OVERLAY_TEXT_PRIMARY_COLOR
            };
            lines.push((line.clone(), color));
        }
    }
    lines
}

fn format_fps_line(current_fps: f32, slow_frame_delay_ms: u64) -> String {
    if slow_frame_delay_ms == 0 {
        format!("FPS: {current_fps:.0}")
    } else {
        format!("FPS: {current_fps:.0} dbg+{slow_frame_delay_ms}ms")
    }
}

#[allow(clippy::too_many_arguments)]
fn draw_rect_outline(
    frame: &mut [u8],
    width: u32,
    height: u32,
    x: i32,
    y: i32,
    rect_width: i32,
    rect_height: i32,
    color: [u8; 4],
) {
    if rect_width <= 1 || rect_height <= 1 {
        return;
    }
    fill_rect_clipped(frame, width, height, x, y, rect_width, 1, color);
    fill_rect_clipped(frame, width, height, x, y + rect_height - 1, rect_width, 1, color);
    fill_rect_clipped(frame, width, height, x, y, 1, rect_height, color);
    fill_rect_clipped(frame, width, height, x + rect_width - 1, y, 1, rect_height, color);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(data: &OverlayData) -> Vec<String> {
        build_overlay_lines(data)
            .into_iter()
            .map(|(line, _)| line)
            .collect()
    }

    #[test]
    fn scene_lines_follow_perf_section_with_heading_dimmed() {
        let data = OverlayData {
            scene_title: Some("Menu".to_string()),
            scene_lines: vec![
                "PlayScene Debug".to_string(),
                "Block ID Labels: on".to_string(),
            ],
            ..OverlayData::default()
        };
        let lines = build_overlay_lines(&data);
        let heading = lines
            .iter()
            .find(|(line, _)| line == "PlayScene Debug")
            .expect("heading");
        assert_eq!(heading.1, OVERLAY_TEXT_DIM_COLOR);
        assert_eq!(
            texts(&data).last().map(String::as_str),
            Some("Block ID Labels: on")
        );
        assert!(texts(&data).contains(&"Scene: Menu".to_string()));
    }

    #[test]
    fn dropped_ticks_line_only_appears_when_nonzero() {
        let mut data = OverlayData::default();
        assert!(!texts(&data).iter().any(|line| line.starts_with("Dropped")));
        data.metrics.dropped_ticks = 4;
        assert!(texts(&data).contains(&"Dropped ticks: 4".to_string()));
    }

    #[test]
    fn fps_line_mentions_debug_delay_only_when_set() {
        assert_eq!(format_fps_line(59.6, 0), "FPS: 60");
        assert_eq!(format_fps_line(12.2, 200), "FPS: 12 dbg+200ms");
    }

    #[test]
    fn draw_overlay_writes_backing_plate_pixels() {
        let mut frame = vec![0u8; 320 * 180 * 4];
        draw_overlay(&mut frame, 320, 180, &OverlayData::default());
        assert!(frame
            .chunks_exact(4)
            .any(|px| px == OVERLAY_PANEL_BG_COLOR));
    }

    #[test]
    fn tiny_viewports_never_panic() {
        let mut empty = vec![];
        draw_overlay(&mut empty, 0, 0, &OverlayData::default());
        let mut single = vec![0u8; 4];
        draw_overlay(&mut single, 1, 1, &OverlayData::default());
    }
}
