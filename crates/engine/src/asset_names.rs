use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssetNameError {
    #[error("asset name must not be empty")]
    Empty,
    #[error("asset name must not start with '/'")]
    LeadingSlash,
    #[error("asset name must not contain '\\\\'")]
    Backslash,
    #[error("asset name must not contain '..'")]
    ParentTraversal,
    #[error("asset name contains invalid character '{character}'")]
    InvalidCharacter { character: char },
}

/// Asset names are relative to the asset root and use `/` as separator.
pub(crate) fn validate_asset_name(name: &str) -> Result<(), AssetNameError> {
    if name.is_empty() {
        return Err(AssetNameError::Empty);
    }
    if name.starts_with('/') {
        return Err(AssetNameError::LeadingSlash);
    }
    if name.contains('\\') {
        return Err(AssetNameError::Backslash);
    }
    if name.contains("..") {
        return Err(AssetNameError::ParentTraversal);
    }
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() || matches!(ch, '_' | '/' | '-' | '.') {
            continue;
        }
        return Err(AssetNameError::InvalidCharacter { character: ch });
    }
    Ok(())
}
