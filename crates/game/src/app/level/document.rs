/// A parsed level file. Missing containers deserialize as empty and iterate
/// in key order.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LevelDocument {
    #[serde(default, deserialize_with = "string_or_none")]
    pub(crate) player_spawn: Option<String>,
    #[serde(default)]
    pub(crate) sheet_container: BTreeMap<String, SheetRecord>,
    #[serde(default)]
    pub(crate) settings: LevelSettings,
    #[serde(default)]
    pub(crate) bg_container: BTreeMap<String, Value>,
    #[serde(default)]
    pub(crate) block_container: BTreeMap<String, Value>,
}

/// Any JSON value is accepted; entries that are not objects carry no texture.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(from = "Value")]
pub(crate) struct SheetRecord {
    pub(crate) texture: Option<String>,
}

impl From<Value> for SheetRecord {
    fn from(value: Value) -> Self {
        Self {
            texture: value
                .get("texture")
                .and_then(Value::as_str)
                .map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct LevelSettings {
    #[serde(rename = "bgImage", default, deserialize_with = "string_or_none")]
    pub(crate) bg_image: Option<String>,
}

impl LevelDocument {
    pub(crate) fn parse(raw: &str) -> Result<Self, LevelParseError> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        let document = serde_path_to_error::deserialize::<_, LevelDocument>(&mut deserializer)
            .map_err(|error| {
                let path = error.path().to_string();
                LevelParseError {
                    path: if path.is_empty() { ".".to_string() } else { path },
                    message: error.into_inner().to_string(),
                }
            })?;
        deserializer.end().map_err(|error| LevelParseError {
            path: ".".to_string(),
            message: error.to_string(),
        })?;
        Ok(document)
    }

    pub(crate) fn spawn_point(&self) -> Option<Vec2> {
        self.player_spawn.as_deref().and_then(parse_point)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LevelParseError {
    pub(crate) path: String,
    pub(crate) message: String,
}

/// Non-string values read as absent, the same as a missing key.
fn string_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(text)) => Some(text),
        _ => None,
    })
}
