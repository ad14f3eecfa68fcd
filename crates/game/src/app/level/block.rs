const RECORD_FIELDS: [&str; 7] = ["position", "x", "y", "frame", "uID", "scale", "animation"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BlockMode {
    /// Parallax decoration that ignores interaction.
    Background,
    Foreground,
}

impl BlockMode {
    fn is_interactive(self) -> bool {
        self == Self::Foreground
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AnimationSpec {
    pub(crate) name: String,
    pub(crate) fps: f32,
    pub(crate) looping: bool,
}

/// A validated record, ready to be placed in the scene graph.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BlockSpawn {
    pub(crate) key: String,
    pub(crate) uid: u32,
    pub(crate) position: Vec2,
    pub(crate) frame: String,
    pub(crate) scale: f32,
    pub(crate) mode: BlockMode,
    pub(crate) animation: Option<AnimationSpec>,
    pub(crate) extra: Map<String, Value>,
}

impl BlockSpawn {
    pub(crate) fn node_desc(&self) -> NodeDesc {
        NodeDesc::frame(self.frame.clone())
            .at(self.position)
            .scaled(self.scale)
            .interactive(self.mode.is_interactive())
    }

    pub(crate) fn z_order(&self) -> i32 {
        i32::try_from(self.uid).unwrap_or(i32::MAX)
    }

    pub(crate) fn into_block(self, node: NodeId) -> Block {
        Block {
            uid: self.uid,
            key: self.key,
            position: self.position,
            background: self.mode == BlockMode::Background,
            frame: self.frame,
            node,
            extra: self.extra,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Block {
    pub(crate) uid: u32,
    pub(crate) key: String,
    pub(crate) position: Vec2,
    pub(crate) background: bool,
    pub(crate) frame: String,
    pub(crate) node: NodeId,
    /// Record fields the loader does not interpret.
    pub(crate) extra: Map<String, Value>,
}

impl Block {
    /// One overlay line: where the record placed the block and where its node
    /// currently is after parallax.
    pub(crate) fn describe(&self, world: &SceneWorld) -> String {
        let container = if self.background {
            BG_CONTAINER
        } else {
            BLOCK_CONTAINER
        };
        let mut line = format!(
            "{container}/{} #{} {} at {:.0},{:.0}",
            self.key, self.uid, self.frame, self.position.x, self.position.y
        );
        if let Some(current) = world.world_position(self.node) {
            if current != self.position {
                line.push_str(&format!(" now {:.0},{:.0}", current.x, current.y));
            }
        }
        if !self.extra.is_empty() {
            line.push_str(&format!(" +{} fields", self.extra.len()));
        }
        line
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SkipReason {
    InvalidEntityRecord,
    MissingField(&'static str),
    UnknownFrame(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SkippedRecord {
    pub(crate) container: &'static str,
    pub(crate) key: String,
    pub(crate) reason: SkipReason,
}

impl SkippedRecord {
    pub(crate) fn describe(&self) -> String {
        let reason = match &self.reason {
            SkipReason::InvalidEntityRecord => "not an object".to_string(),
            SkipReason::MissingField(field) => format!("missing {field}"),
            SkipReason::UnknownFrame(frame) => format!("unknown frame {frame}"),
        };
        format!("{}/{}: {reason}", self.container, self.key)
    }
}

/// Turns entity records of one container into block spawns. Uids handed out
/// by one factory never repeat.
#[derive(Debug)]
pub(crate) struct BlockFactory {
    mode: BlockMode,
    used_uids: BTreeSet<u32>,
    next_uid: u32,
}

impl BlockFactory {
    pub(crate) fn new(mode: BlockMode) -> Self {
        Self {
            mode,
            used_uids: BTreeSet::new(),
            next_uid: FIRST_AUTO_UID,
        }
    }

    pub(crate) fn mode(&self) -> BlockMode {
        self.mode
    }

    pub(crate) fn create(
        &mut self,
        key: &str,
        record: &Value,
        frames: &SpriteFrameCache,
    ) -> Result<BlockSpawn, SkipReason> {
        let record = record.as_object().ok_or(SkipReason::InvalidEntityRecord)?;
        let position = record_position(record).ok_or(SkipReason::MissingField("position"))?;
        let frame = record
            .get("frame")
            .and_then(Value::as_str)
            .filter(|frame| !frame.is_empty())
            .ok_or(SkipReason::MissingField("frame"))?;
        if !frames.contains(frame) {
            return Err(SkipReason::UnknownFrame(frame.to_string()));
        }

        let scale = record
            .get("scale")
            .and_then(Value::as_f64)
            .map(|scale| scale as f32)
            .filter(|scale| scale.is_finite() && *scale > 0.0)
            .unwrap_or(1.0);
        let preferred_uid = record
            .get("uID")
            .and_then(Value::as_u64)
            .filter(|uid| *uid <= i32::MAX as u64)
            .map(|uid| uid as u32);
        let extra = record
            .iter()
            .filter(|(field, _)| !RECORD_FIELDS.contains(&field.as_str()))
            .map(|(field, value)| (field.clone(), value.clone()))
            .collect();

        Ok(BlockSpawn {
            key: key.to_string(),
            uid: self.assign_uid(preferred_uid),
            position,
            frame: frame.to_string(),
            scale,
            mode: self.mode,
            animation: record.get("animation").and_then(parse_animation_spec),
            extra,
        })
    }

    fn assign_uid(&mut self, preferred: Option<u32>) -> u32 {
        let uid = match preferred {
            Some(uid) if !self.used_uids.contains(&uid) => uid,
            _ => {
                while self.used_uids.contains(&self.next_uid) {
                    self.next_uid = self.next_uid.saturating_add(1);
                }
                self.next_uid
            }
        };
        self.used_uids.insert(uid);
        uid
    }
}

fn parse_animation_spec(value: &Value) -> Option<AnimationSpec> {
    let object = value.as_object()?;
    let name = object
        .get("name")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())?;
    let fps = object
        .get("fps")
        .and_then(Value::as_f64)
        .map(|fps| fps as f32)
        .filter(|fps| fps.is_finite() && *fps > 0.0)?;
    let looping = object.get("loop").and_then(Value::as_bool).unwrap_or(false);
    Some(AnimationSpec {
        name: name.to_string(),
        fps,
        looping,
    })
}
