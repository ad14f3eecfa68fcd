use std::collections::HashMap;

use roxmltree::{Document, Node, ParsingOptions};
use thiserror::Error;

use super::scene::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// A named sub-region of an atlas texture.
///
/// `rect` is the region as stored in the atlas. When `rotated` is set the
/// region holds the frame turned 90 degrees clockwise, so its stored width is
/// the frame's height.
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteFrame {
    pub texture: String,
    pub rect: FrameRect,
    pub rotated: bool,
    pub offset: Vec2,
}

impl SpriteFrame {
    pub fn display_size(&self) -> (u32, u32) {
        if self.rotated {
            (self.rect.height, self.rect.width)
        } else {
            (self.rect.width, self.rect.height)
        }
    }
}

#[derive(Debug, Error)]
pub enum SpriteSheetError {
    #[error("malformed sprite sheet XML at line {line}, column {column}: {message}")]
    Xml {
        message: String,
        line: u32,
        column: u32,
    },
    #[error("sprite sheet root must be <plist> containing a <dict>")]
    InvalidRoot,
    #[error("sprite sheet has no 'frames' dictionary")]
    MissingFrames,
    #[error("sprite frame '{name}' is invalid: {message}")]
    InvalidFrame { name: String, message: String },
}

#[derive(Debug, Default, Clone)]
pub struct SpriteFrameCache {
    frames: HashMap<String, SpriteFrame>,
}

impl SpriteFrameCache {
    pub fn frame(&self, name: &str) -> Option<&SpriteFrame> {
        self.frames.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.frames.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn insert(&mut self, name: impl Into<String>, frame: SpriteFrame) {
        self.frames.insert(name.into(), frame);
    }

    /// Parses a property-list atlas and adds its frames, replacing same-named
    /// frames. Texture names are joined onto `texture_dir` when given.
    /// Returns the number of frames added.
    pub fn add_frames_from_plist(
        &mut self,
        raw: &str,
        texture_dir: Option<&str>,
        default_texture: &str,
    ) -> Result<usize, SpriteSheetError> {
        let parsed = parse_plist_sheet(raw, texture_dir, default_texture)?;
        let count = parsed.len();
        for (name, frame) in parsed {
            self.frames.insert(name, frame);
        }
        Ok(count)
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

fn parse_plist_sheet(
    raw: &str,
    texture_dir: Option<&str>,
    default_texture: &str,
) -> Result<Vec<(String, SpriteFrame)>, SpriteSheetError> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let doc = Document::parse_with_options(raw, options).map_err(|error| SpriteSheetError::Xml {
        message: error.to_string(),
        line: error.pos().row,
        column: error.pos().col,
    })?;

    let root = doc.root_element();
    if root.tag_name().name() != "plist" {
        return Err(SpriteSheetError::InvalidRoot);
    }
    let top = root
        .children()
        .find(|node| node.is_element())
        .filter(|node| node.tag_name().name() == "dict")
        .ok_or(SpriteSheetError::InvalidRoot)?;
    let top_entries = dict_entries(top);

    let texture = top_entries
        .iter()
        .find(|(key, _)| key == "metadata")
        .and_then(|(_, metadata)| {
            let entries = dict_entries(*metadata);
            ["textureFileName", "realTextureFileName"]
                .iter()
                .find_map(|wanted| {
                    entries
                        .iter()
                        .find(|(key, _)| key == wanted)
                        .and_then(|(_, value)| value.text())
                        .map(str::trim)
                        .filter(|text| !text.is_empty())
                        .map(ToString::to_string)
                })
        })
        .unwrap_or_else(|| default_texture.to_string());
    let texture = match texture_dir {
        Some(dir) if !dir.is_empty() => format!("{dir}/{texture}"),
        _ => texture,
    };

    let frames_dict = top_entries
        .iter()
        .find(|(key, _)| key == "frames")
        .map(|(_, node)| *node)
        .filter(|node| node.tag_name().name() == "dict")
        .ok_or(SpriteSheetError::MissingFrames)?;

    let mut frames = Vec::new();
    for (name, frame_node) in dict_entries(frames_dict) {
        let frame = parse_frame(&name, frame_node, &texture)?;
        frames.push((name, frame));
    }
    Ok(frames)
}

fn parse_frame(
    name: &str,
    node: Node<'_, '_>,
    texture: &str,
) -> Result<SpriteFrame, SpriteSheetError> {
    let invalid = |message: &str| SpriteSheetError::InvalidFrame {
        name: name.to_string(),
        message: message.to_string(),
    };
    if node.tag_name().name() != "dict" {
        return Err(invalid("frame entry must be a <dict>"));
    }
    let entries = dict_entries(node);
    let lookup = |key: &str| {
        entries
            .iter()
            .find(|(entry_key, _)| entry_key == key)
            .map(|(_, value)| *value)
    };

    let rect = match lookup("frame").or_else(|| lookup("textureRect")) {
        Some(value) => {
            let numbers = parse_brace_numbers(value.text().unwrap_or_default())
                .filter(|numbers| numbers.len() == 4)
                .ok_or_else(|| invalid("rect must look like {{x,y},{w,h}}"))?;
            rect_from_numbers(&numbers).ok_or_else(|| invalid("rect values must be >= 0"))?
        }
        None => {
            // Format 0/1 atlases store the rect as separate integer keys.
            let mut numbers = Vec::with_capacity(4);
            for key in ["x", "y", "width", "height"] {
                let value = lookup(key)
                    .and_then(|value| value.text())
                    .and_then(|text| text.trim().parse::<f32>().ok())
                    .ok_or_else(|| invalid("missing frame rect"))?;
                numbers.push(value);
            }
            rect_from_numbers(&numbers).ok_or_else(|| invalid("rect values must be >= 0"))?
        }
    };

    let rotated = lookup("rotated")
        .or_else(|| lookup("textureRotated"))
        .is_some_and(|value| value.tag_name().name() == "true");

    let offset = lookup("offset")
        .or_else(|| lookup("spriteOffset"))
        .and_then(|value| parse_brace_numbers(value.text().unwrap_or_default()))
        .filter(|numbers| numbers.len() == 2)
        .map(|numbers| Vec2 {
            x: numbers[0],
            y: numbers[1],
        })
        .unwrap_or_default();

    Ok(SpriteFrame {
        texture: texture.to_string(),
        rect,
        rotated,
        offset,
    })
}

/// Pairs each `<key>` with the element that follows it.
fn dict_entries<'a, 'input>(dict: Node<'a, 'input>) -> Vec<(String, Node<'a, 'input>)> {
    let mut entries = Vec::new();
    let mut pending_key: Option<String> = None;
    for child in dict.children().filter(|node| node.is_element()) {
        if child.tag_name().name() == "key" {
            pending_key = Some(child.text().unwrap_or_default().trim().to_string());
        } else if let Some(key) = pending_key.take() {
            entries.push((key, child));
        }
    }
    entries
}

fn parse_brace_numbers(text: &str) -> Option<Vec<f32>> {
    let cleaned: String = text
        .chars()
        .filter(|ch| !matches!(ch, '{' | '}') && !ch.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned
        .split(',')
        .map(|part| part.parse::<f32>().ok().filter(|value| value.is_finite()))
        .collect()
}

fn rect_from_numbers(numbers: &[f32]) -> Option<FrameRect> {
    if numbers.iter().any(|value| *value < 0.0) {
        return None;
    }
    Some(FrameRect {
        x: numbers[0].round() as u32,
        y: numbers[1].round() as u32,
        width: numbers[2].round() as u32,
        height: numbers[3].round() as u32,
    })
}
