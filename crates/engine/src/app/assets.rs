use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::asset_names::{validate_asset_name, AssetNameError};

use super::sprite_frames::{SpriteFrameCache, SpriteSheetError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureInfo {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("invalid asset name '{name}': {source}")]
    InvalidName {
        name: String,
        #[source]
        source: AssetNameError,
    },
    #[error("failed to read asset {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode texture {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to load sprite sheet {name}: {source}")]
    SpriteSheet {
        name: String,
        #[source]
        source: SpriteSheetError,
    },
}

/// File access for a scene: text files, texture metadata and the
/// sprite-frame cache, all addressed by names relative to the asset root.
#[derive(Debug, Default, Clone)]
pub struct Assets {
    root: PathBuf,
    textures: HashMap<String, TextureInfo>,
    loaded_sheets: HashSet<String>,
    sprite_frames: SpriteFrameCache,
}

impl Assets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolve(&self, name: &str) -> Result<PathBuf, AssetError> {
        validate_asset_name(name).map_err(|source| AssetError::InvalidName {
            name: name.to_string(),
            source,
        })?;
        Ok(self.root.join(name))
    }

    pub fn read_text(&self, name: &str) -> Result<String, AssetError> {
        let path = self.resolve(name)?;
        fs::read_to_string(&path).map_err(|source| AssetError::Read { path, source })
    }

    pub fn load_texture(&mut self, name: &str) -> Result<TextureInfo, AssetError> {
        if let Some(info) = self.textures.get(name) {
            return Ok(*info);
        }
        let path = self.resolve(name)?;
        let (width, height) = image::image_dimensions(&path).map_err(|source| match source {
            image::ImageError::IoError(source) => AssetError::Read {
                path: path.clone(),
                source,
            },
            source => AssetError::Decode {
                path: path.clone(),
                source,
            },
        })?;
        let info = TextureInfo { width, height };
        self.textures.insert(name.to_string(), info);
        debug!(texture = name, width, height, "texture_loaded");
        Ok(info)
    }

    pub fn texture_info(&self, name: &str) -> Option<TextureInfo> {
        self.textures.get(name).copied()
    }

    /// Loads a `.plist` atlas into the frame cache. Loading the same sheet
    /// twice is a no-op that reports zero new frames.
    pub fn load_sprite_sheet(&mut self, name: &str) -> Result<usize, AssetError> {
        if self.loaded_sheets.contains(name) {
            return Ok(0);
        }
        let raw = self.read_text(name)?;
        let default_texture = default_sheet_texture(name);
        let directory = name.rsplit_once('/').map(|(dir, _)| dir);
        let added = self
            .sprite_frames
            .add_frames_from_plist(&raw, directory, &default_texture)
            .map_err(|source| AssetError::SpriteSheet {
                name: name.to_string(),
                source,
            })?;
        self.loaded_sheets.insert(name.to_string());
        info!(sheet = name, frames = added, "sprite_sheet_loaded");
        Ok(added)
    }

    pub fn sprite_frames(&self) -> &SpriteFrameCache {
        &self.sprite_frames
    }

    pub fn sprite_frames_mut(&mut self) -> &mut SpriteFrameCache {
        &mut self.sprite_frames
    }
}

fn default_sheet_texture(sheet_name: &str) -> String {
    let file_name = sheet_name.rsplit('/').next().unwrap_or(sheet_name);
    match file_name.rsplit_once('.') {
        Some((stem, _)) => format!("{stem}.png"),
        None => format!("{file_name}.png"),
    }
}
