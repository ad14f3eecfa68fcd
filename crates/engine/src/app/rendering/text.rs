//! 3x5 bitmap font shared by world labels and the debug overlay.

pub(crate) const GLYPH_WIDTH: i32 = 3;
pub(crate) const GLYPH_HEIGHT: i32 = 5;

const FIRST_GLYPH: u32 = 0x20;

/// Rows of each printable ASCII glyph, top to bottom; bit 2 is the left column.
const GLYPHS: [[u8; GLYPH_HEIGHT as usize]; 95] = [
    // ASCII 0x20, space and punctuation
    [0b000, 0b000, 0b000, 0b000, 0b000],
    [0b010, 0b010, 0b010, 0b000, 0b010],
    [0b101, 0b101, 0b000, 0b000, 0b000],
    [0b101, 0b111, 0b101, 0b111, 0b101],
    [0b111, 0b110, 0b111, 0b011, 0b111],
    [0b101, 0b001, 0b010, 0b100, 0b101],
    [0b010, 0b101, 0b010, 0b101, 0b011],
    [0b010, 0b010, 0b000, 0b000, 0b000],
    [0b001, 0b010, 0b010, 0b010, 0b001],
    [0b100, 0b010, 0b010, 0b010, 0b100],
    [0b000, 0b101, 0b010, 0b101, 0b000],
    [0b000, 0b010, 0b111, 0b010, 0b000],
    [0b000, 0b000, 0b000, 0b010, 0b100],
    [0b000, 0b000, 0b111, 0b000, 0b000],
    [0b000, 0b000, 0b000, 0b000, 0b010],
    [0b001, 0b001, 0b010, 0b100, 0b100],
    // digits
    [0b111, 0b101, 0b101, 0b101, 0b111],
    [0b010, 0b110, 0b010, 0b010, 0b111],
    [0b111, 0b001, 0b111, 0b100, 0b111],
    [0b111, 0b001, 0b111, 0b001, 0b111],
    [0b101, 0b101, 0b111, 0b001, 0b001],
    [0b111, 0b100, 0b111, 0b001, 0b111],
    [0b111, 0b100, 0b111, 0b101, 0b111],
    [0b111, 0b001, 0b010, 0b010, 0b010],
    [0b111, 0b101, 0b111, 0b101, 0b111],
    [0b111, 0b101, 0b111, 0b001, 0b111],
    [0b000, 0b010, 0b000, 0b010, 0b000],
    [0b000, 0b010, 0b000, 0b010, 0b100],
    [0b001, 0b010, 0b100, 0b010, 0b001],
    [0b000, 0b111, 0b000, 0b111, 0b000],
    [0b100, 0b010, 0b001, 0b010, 0b100],
    [0b111, 0b001, 0b011, 0b000, 0b010],
    [0b111, 0b101, 0b111, 0b100, 0b111],
    // upper case
    [0b010, 0b101, 0b111, 0b101, 0b101],
    [0b110, 0b101, 0b110, 0b101, 0b110],
    [0b111, 0b100, 0b100, 0b100, 0b111],
    [0b110, 0b101, 0b101, 0b101, 0b110],
    [0b111, 0b100, 0b110, 0b100, 0b111],
    [0b111, 0b100, 0b110, 0b100, 0b100],
    [0b111, 0b100, 0b101, 0b101, 0b111],
    [0b101, 0b101, 0b111, 0b101, 0b101],
    [0b111, 0b010, 0b010, 0b010, 0b111],
    [0b111, 0b001, 0b001, 0b101, 0b111],
    [0b101, 0b101, 0b110, 0b101, 0b101],
    [0b100, 0b100, 0b100, 0b100, 0b111],
    [0b101, 0b111, 0b111, 0b101, 0b101],
    [0b101, 0b111, 0b111, 0b111, 0b101],
    [0b111, 0b101, 0b101, 0b101, 0b111],
    [0b110, 0b101, 0b110, 0b100, 0b100],
    [0b111, 0b101, 0b101, 0b111, 0b001],
    [0b110, 0b101, 0b110, 0b101, 0b101],
    [0b111, 0b100, 0b111, 0b001, 0b111],
    [0b111, 0b010, 0b010, 0b010, 0b010],
    [0b101, 0b101, 0b101, 0b101, 0b111],
    [0b101, 0b101, 0b101, 0b101, 0b010],
    [0b101, 0b101, 0b111, 0b111, 0b101],
    [0b101, 0b101, 0b010, 0b101, 0b101],
    [0b101, 0b101, 0b010, 0b010, 0b010],
    [0b111, 0b001, 0b010, 0b100, 0b111],
    [0b110, 0b100, 0b100, 0b100, 0b110],
    [0b100, 0b100, 0b010, 0b001, 0b001],
    [0b011, 0b001, 0b001, 0b001, 0b011],
    [0b010, 0b101, 0b000, 0b000, 0b000],
    [0b000, 0b000, 0b000, 0b000, 0b111],
    [0b100, 0b010, 0b000, 0b000, 0b000],
    // lower case
    [0b000, 0b111, 0b001, 0b111, 0b111],
    [0b100, 0b100, 0b110, 0b101, 0b110],
    [0b000, 0b111, 0b100, 0b100, 0b111],
    [0b001, 0b001, 0b111, 0b101, 0b111],
    [0b000, 0b111, 0b110, 0b100, 0b111],
    [0b011, 0b100, 0b110, 0b100, 0b100],
    [0b000, 0b111, 0b101, 0b111, 0b001],
    [0b100, 0b100, 0b110, 0b101, 0b101],
    [0b010, 0b000, 0b010, 0b010, 0b010],
    [0b001, 0b000, 0b001, 0b101, 0b010],
    [0b100, 0b101, 0b110, 0b101, 0b101],
    [0b100, 0b100, 0b100, 0b100, 0b111],
    [0b000, 0b110, 0b111, 0b101, 0b101],
    [0b000, 0b110, 0b101, 0b101, 0b101],
    [0b000, 0b111, 0b101, 0b101, 0b111],
    [0b000, 0b110, 0b101, 0b110, 0b100],
    [0b000, 0b111, 0b101, 0b111, 0b001],
    [0b000, 0b110, 0b101, 0b100, 0b100],
    [0b000, 0b111, 0b110, 0b001, 0b111],
    [0b010, 0b111, 0b010, 0b010, 0b011],
    [0b000, 0b101, 0b101, 0b101, 0b111],
    [0b000, 0b101, 0b101, 0b101, 0b010],
    [0b000, 0b101, 0b101, 0b111, 0b010],
    [0b000, 0b101, 0b010, 0b010, 0b101],
    [0b000, 0b101, 0b101, 0b111, 0b001],
    [0b000, 0b111, 0b001, 0b010, 0b111],
    [0b011, 0b010, 0b110, 0b010, 0b011],
    [0b010, 0b010, 0b010, 0b010, 0b010],
    [0b110, 0b010, 0b011, 0b010, 0b110],
    [0b000, 0b011, 0b110, 0b000, 0b000],
];

fn glyph_rows(ch: char) -> [u8; GLYPH_HEIGHT as usize] {
    let index = (ch as u32).wrapping_sub(FIRST_GLYPH) as usize;
    GLYPHS.get(index).copied().unwrap_or(GLYPHS[0])
}

pub(crate) fn glyph_advance(pixel_scale: i32) -> i32 {
    (GLYPH_WIDTH + 1) * pixel_scale.max(1)
}

pub(crate) fn line_advance(pixel_scale: i32) -> i32 {
    (GLYPH_HEIGHT + 2) * pixel_scale.max(1)
}

/// Width in pixels of `text` on a single line.
pub(crate) fn text_width_px(text: &str, pixel_scale: i32) -> i32 {
    let count = text.chars().count() as i32;
    if count == 0 {
        return 0;
    }
    count * glyph_advance(pixel_scale) - pixel_scale.max(1)
}

pub(crate) fn text_height_px(pixel_scale: i32) -> i32 {
    GLYPH_HEIGHT * pixel_scale.max(1)
}

/// Draws `text` with its top-left corner at (`x`, `y`). Pixels outside the
/// frame are dropped; characters outside printable ASCII draw as blanks.
#[allow(clippy::too_many_arguments)]
pub(crate) fn draw_text_clipped(
    frame: &mut [u8],
    width: u32,
    height: u32,
    mut x: i32,
    y: i32,
    text: &str,
    color: [u8; 4],
    pixel_scale: i32,
) {
    if width == 0 || height == 0 {
        return;
    }
    let pixel_scale = pixel_scale.max(1);
    for ch in text.chars() {
        draw_glyph_clipped(frame, width, height, x, y, glyph_rows(ch), color, pixel_scale);
        x += glyph_advance(pixel_scale);
    }
}

#[allow(clippy::too_many_arguments)]
fn draw_glyph_clipped(
    frame: &mut [u8],
    width: u32,
    height: u32,
    x: i32,
    y: i32,
    rows: [u8; GLYPH_HEIGHT as usize],
    color: [u8; 4],
    pixel_scale: i32,
) {
    for (row_index, row_bits) in rows.iter().enumerate() {
        let glyph_y = y + row_index as i32 * pixel_scale;
        for col in 0..GLYPH_WIDTH {
            if (row_bits & (1 << (GLYPH_WIDTH - 1 - col))) == 0 {
                continue;
            }
            let glyph_x = x + col * pixel_scale;
            fill_rect_clipped(
                frame,
                width,
                height,
                glyph_x,
                glyph_y,
                pixel_scale,
                pixel_scale,
                color,
            );
        }
    }
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn fill_rect_clipped(
    frame: &mut [u8],
    width: u32,
    height: u32,
    x: i32,
    y: i32,
    rect_width: i32,
    rect_height: i32,
    color: [u8; 4],
) {
    let start_x = x.max(0);
    let start_y = y.max(0);
    let end_x = x.saturating_add(rect_width).min(width as i32);
    let end_y = y.saturating_add(rect_height).min(height as i32);
    if end_x <= start_x || end_y <= start_y {
        return;
    }
    for py in start_y..end_y {
        for px in start_x..end_x {
            write_pixel_rgba(frame, width as usize, px as usize, py as usize, color);
        }
    }
}

pub(crate) fn write_pixel_rgba(frame: &mut [u8], width: usize, x: usize, y: usize, color: [u8; 4]) {
    let Some(pixel_offset) = y.checked_mul(width).and_then(|row| row.checked_add(x)) else {
        return;
    };
    let Some(byte_offset) = pixel_offset.checked_mul(4) else {
        return;
    };
    let Some(end) = byte_offset.checked_add(4) else {
        return;
    };
    if end > frame.len() {
        return;
    }
    frame[byte_offset..end].copy_from_slice(&color);
}
