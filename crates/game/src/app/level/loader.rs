const BG_CONTAINER: &str = "bgContainer";
const BLOCK_CONTAINER: &str = "blockContainer";

#[derive(Debug, Error)]
pub(crate) enum LoadError {
    #[error("failed to read level {level}: {source}")]
    Io {
        level: String,
        #[source]
        source: AssetError,
    },
    #[error("failed to parse level {level} at {path}: {message}")]
    Parse {
        level: String,
        path: String,
        message: String,
    },
    #[error("failed to load sprite sheet {sheet}: {source}")]
    SpriteSheet {
        sheet: String,
        #[source]
        source: AssetError,
    },
    #[error("failed to load background texture {texture}: {source}")]
    Texture {
        texture: String,
        #[source]
        source: AssetError,
    },
}

#[derive(Debug, Default)]
pub(crate) struct LoadReport {
    pub(crate) errors: Vec<LoadError>,
    pub(crate) skipped: Vec<SkippedRecord>,
}

impl LoadReport {
    pub(crate) fn success(&self) -> bool {
        self.errors.is_empty()
    }

    fn record_error(&mut self, error: LoadError) {
        warn!(error = %error, "level_load_error");
        self.errors.push(error);
    }
}

/// Handles to everything one load placed in the scene graph.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct LoadedLevel {
    pub(crate) background: Option<NodeId>,
    pub(crate) parallax: Option<NodeId>,
    pub(crate) blocks: Vec<Block>,
    pub(crate) background_blocks: Vec<Block>,
    pub(crate) labels: Vec<NodeId>,
}

impl LoadedLevel {
    pub(crate) fn layer_handles(&self) -> LayerHandles {
        LayerHandles {
            background: self.background,
            parallax: self.parallax,
        }
    }
}

pub(crate) struct LevelLoader;

impl LevelLoader {
    /// Reads `level` from the asset store and instantiates it under `layer`.
    /// Failures are collected in the report; whatever was placed before a
    /// failure stays in the scene.
    pub(crate) fn load(
        level: &str,
        world: &mut SceneWorld,
        layer: NodeId,
    ) -> (LoadedLevel, LoadReport) {
        let mut loaded = LoadedLevel::default();
        let mut report = LoadReport::default();
        if world.node(layer).is_none() {
            warn!(level, layer = layer.0, "level_layer_missing");
            return (loaded, report);
        }

        let raw = match world.assets().read_text(level) {
            Ok(raw) => raw,
            Err(source) => {
                report.record_error(LoadError::Io {
                    level: level.to_string(),
                    source,
                });
                return (loaded, report);
            }
        };
        let document = match LevelDocument::parse(&raw) {
            Ok(document) => document,
            Err(error) => {
                report.record_error(LoadError::Parse {
                    level: level.to_string(),
                    path: error.path,
                    message: error.message,
                });
                return (loaded, report);
            }
        };

        apply_spawn(&document, world);
        load_sheets(&document, world, &mut report);
        loaded.background = create_background(&document, world, layer, &mut report);
        create_parallax(&document, world, layer, &mut loaded, &mut report);
        create_blocks(&document, world, layer, &mut loaded, &mut report);

        info!(
            level,
            blocks = loaded.blocks.len(),
            background_blocks = loaded.background_blocks.len(),
            skipped = report.skipped.len(),
            errors = report.errors.len(),
            "level_loaded"
        );
        (loaded, report)
    }
}

fn apply_spawn(document: &LevelDocument, world: &mut SceneWorld) {
    let Some(spawn) = document.spawn_point() else {
        return;
    };
    let camera = world.camera_mut();
    camera.position = spawn;
    camera.zoom *= SPAWN_ZOOM_FACTOR;
    debug!(x = spawn.x, y = spawn.y, zoom = camera.zoom, "level_spawn_applied");
}

fn load_sheets(document: &LevelDocument, world: &mut SceneWorld, report: &mut LoadReport) {
    for record in document.sheet_container.values() {
        let Some(texture) = record.texture.as_deref() else {
            continue;
        };
        let sheet = format!("{texture}.plist");
        if let Err(source) = world.assets_mut().load_sprite_sheet(&sheet) {
            report.record_error(LoadError::SpriteSheet { sheet, source });
        }
    }
}

fn create_background(
    document: &LevelDocument,
    world: &mut SceneWorld,
    layer: NodeId,
    report: &mut LoadReport,
) -> Option<NodeId> {
    let texture = format!("{}.png", document.settings.bg_image.as_deref()?);
    if let Err(source) = world.assets_mut().load_texture(&texture) {
        report.record_error(LoadError::Texture { texture, source });
        return None;
    }
    let position = world.camera().position;
    world.add_child_to(layer, NodeDesc::texture(texture).at(position), 0)
}

fn create_parallax(
    document: &LevelDocument,
    world: &mut SceneWorld,
    layer: NodeId,
    loaded: &mut LoadedLevel,
    report: &mut LoadReport,
) {
    let Some(parallax) = world.add_child_to(layer, NodeDesc::parallax(), 0) else {
        return;
    };
    loaded.parallax = Some(parallax);

    let mut factory = BlockFactory::new(BlockMode::Background);
    for (key, record) in &document.bg_container {
        let Some(spawn) = spawn_block(&mut factory, key, record, world, report) else {
            continue;
        };
        let placed = world.add_parallax_child(
            parallax,
            spawn.node_desc(),
            spawn.z_order(),
            Vec2::new(1.0, 1.0),
            spawn.position,
        );
        if let Some(node) = placed {
            start_block_animation(&spawn, world, node);
            loaded.background_blocks.push(spawn.into_block(node));
        }
    }
}

fn create_blocks(
    document: &LevelDocument,
    world: &mut SceneWorld,
    layer: NodeId,
    loaded: &mut LoadedLevel,
    report: &mut LoadReport,
) {
    let mut factory = BlockFactory::new(BlockMode::Foreground);
    for (key, record) in &document.block_container {
        let Some(spawn) = spawn_block(&mut factory, key, record, world, report) else {
            continue;
        };
        let label = NodeDesc::label(key.clone())
            .at(spawn.position)
            .scaled(BLOCK_LABEL_SCALE);
        if let Some(label) = world.add_child_to(layer, label, BLOCK_LABEL_Z_ORDER) {
            loaded.labels.push(label);
        }
        if let Some(node) = world.add_child_to(layer, spawn.node_desc(), spawn.z_order()) {
            start_block_animation(&spawn, world, node);
            loaded.blocks.push(spawn.into_block(node));
        }
    }
}

fn spawn_block(
    factory: &mut BlockFactory,
    key: &str,
    record: &Value,
    world: &SceneWorld,
    report: &mut LoadReport,
) -> Option<BlockSpawn> {
    match factory.create(key, record, world.assets().sprite_frames()) {
        Ok(spawn) => Some(spawn),
        Err(reason) => {
            let container = match factory.mode() {
                BlockMode::Background => BG_CONTAINER,
                BlockMode::Foreground => BLOCK_CONTAINER,
            };
            report.skipped.push(SkippedRecord {
                container,
                key: key.to_string(),
                reason,
            });
            None
        }
    }
}

fn start_block_animation(spawn: &BlockSpawn, world: &mut SceneWorld, node: NodeId) {
    if let Some(animation) = &spawn.animation {
        run_animation(world, node, &animation.name, animation.fps, animation.looping);
    }
}
