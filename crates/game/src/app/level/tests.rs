    use std::fs;

    use super::*;
    use engine::{Assets, FrameRect, LabelDesc, NodeKind, SpriteFrame, CAMERA_ZOOM_DEFAULT};
    use serde_json::json;
    use tempfile::TempDir;

    const LEVEL: &str = "level.json";

    fn sheet_plist(frames: &[&str]) -> String {
        let entries: String = frames
            .iter()
            .enumerate()
            .map(|(index, name)| {
                format!(
                    "<key>{name}</key><dict><key>textureRect</key>\
                     <string>{{{{{x},0}},{{8,8}}}}</string>\
                     <key>textureRotated</key><false/></dict>",
                    x = index * 8
                )
            })
            .collect();
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?><plist version=\"1.0\"><dict>\
             <key>frames</key><dict>{entries}</dict>\
             <key>metadata</key><dict><key>format</key><integer>3</integer>\
             <key>textureFileName</key><string>blocks.png</string></dict></dict></plist>"
        )
    }

    fn test_frame() -> SpriteFrame {
        SpriteFrame {
            texture: "blocks.png".to_string(),
            rect: FrameRect {
                x: 0,
                y: 0,
                width: 8,
                height: 8,
            },
            rotated: false,
            offset: Vec2::default(),
        }
    }

    fn cache_with(names: &[&str]) -> SpriteFrameCache {
        let mut cache = SpriteFrameCache::default();
        for name in names {
            cache.insert(*name, test_frame());
        }
        cache
    }

    struct Fixture {
        temp: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let temp = TempDir::new().expect("temp");
            fs::create_dir_all(temp.path().join("sheets")).expect("mkdir");
            fs::write(
                temp.path().join("sheets/blocks.plist"),
                sheet_plist(&[
                    "block_001.png",
                    "spike_001.png",
                    "torch_01.png",
                    "torch_02.png",
                    "torch_03.png",
                ]),
            )
            .expect("write sheet");
            image::RgbaImage::new(4, 4)
                .save(temp.path().join("cave_bg.png"))
                .expect("write png");
            Self { temp }
        }

        fn write_level(&self, level: &Value) {
            fs::write(self.temp.path().join(LEVEL), level.to_string()).expect("write level");
        }

        fn world(&self) -> (SceneWorld, NodeId) {
            let mut world = SceneWorld::default();
            world.set_assets(Assets::new(self.temp.path()));
            let layer = world.add_child(NodeDesc::empty(), 0);
            (world, layer)
        }

        fn load(&self, level: Value) -> (SceneWorld, LoadedLevel, LoadReport) {
            self.write_level(&level);
            let (mut world, layer) = self.world();
            let (loaded, report) = LevelLoader::load(LEVEL, &mut world, layer);
            (world, loaded, report)
        }
    }

    fn cave_level() -> Value {
        json!({
            "playerSpawn": "{100, 200}",
            "sheetContainer": {
                "main": { "texture": "sheets/blocks" },
                "broken": { "name": "no texture key" }
            },
            "settings": { "bgImage": "cave_bg", "song": 3 },
            "bgContainer": {
                "a": { "position": "10,20", "frame": "spike_001.png", "uID": 4 },
                "b": { "position": "-5,7", "frame": "spike_001.png", "uID": 4 }
            },
            "blockContainer": {
                "k1": { "position": "0,0", "frame": "block_001.png", "uID": 7 },
                "k2": { "position": "{32, 0}", "frame": "block_001.png", "uID": 7 },
                "k3": { "x": 64, "y": 16, "frame": "block_001.png" },
                "k4": { "position": "64", "frame": "block_001.png" },
                "k5": { "position": "1,1", "frame": "" },
                "k6": "not a record",
                "k7": { "position": "1,1", "frame": "missing_001.png" }
            }
        })
    }

    fn label_text(world: &SceneWorld, id: NodeId) -> Option<String> {
        match &world.node(id)?.kind {
            NodeKind::Label(LabelDesc { text, .. }) => Some(text.clone()),
            _ => None,
        }
    }

    #[test]
    fn parse_point_accepts_plain_braced_and_spaced_forms() {
        assert_eq!(parse_point("100,200"), Some(Vec2::new(100.0, 200.0)));
        assert_eq!(parse_point("{12, -4}"), Some(Vec2::new(12.0, -4.0)));
        assert_eq!(parse_point("  3.5 ,  -0.25 "), Some(Vec2::new(3.5, -0.25)));
    }

    #[test]
    fn parse_point_rejects_malformed_values() {
        for raw in ["", "12", "1;2", "1,2,3", "{1,}", "x,y", "inf,0"] {
            assert_eq!(parse_point(raw), None, "{raw}");
        }
    }

    #[test]
    fn document_treats_missing_containers_as_empty() {
        let document = LevelDocument::parse("{}").expect("parse");
        assert!(document.sheet_container.is_empty());
        assert!(document.bg_container.is_empty());
        assert!(document.block_container.is_empty());
        assert_eq!(document.settings.bg_image, None);
        assert_eq!(document.spawn_point(), None);
    }

    #[test]
    fn document_reads_non_string_fields_as_absent() {
        let document = LevelDocument::parse(
            r#"{"playerSpawn": 5, "sheetContainer": {"s": {"texture": 9}},
               "settings": {"bgImage": false, "gravity": 1.5}}"#,
        )
        .expect("parse");
        assert_eq!(document.player_spawn, None);
        assert_eq!(document.sheet_container["s"].texture, None);
        assert_eq!(document.settings.bg_image, None);
    }

    #[test]
    fn document_sheet_entries_that_are_not_objects_have_no_texture() {
        let document = LevelDocument::parse(
            r#"{"sheetContainer": {"legacy": "sheets/blocks", "list": [1], "main": {"texture": "a"}}}"#,
        )
        .expect("parse");
        assert_eq!(document.sheet_container["legacy"].texture, None);
        assert_eq!(document.sheet_container["list"].texture, None);
        assert_eq!(document.sheet_container["main"].texture.as_deref(), Some("a"));
    }

    #[test]
    fn loader_skips_non_object_sheet_entries_silently() {
        let fixture = Fixture::new();
        let mut level = cave_level();
        level["sheetContainer"]["legacy"] = json!("sheets/blocks");
        let (_world, loaded, report) = fixture.load(level);
        assert!(report.success(), "{:?}", report.errors);
        assert_eq!(loaded.blocks.len(), 3);
    }

    #[test]
    fn document_parse_error_reports_json_path() {
        let error = LevelDocument::parse(r#"{"blockContainer": []}"#).expect_err("must fail");
        assert_eq!(error.path, "blockContainer");

        let error = LevelDocument::parse("{} trailing").expect_err("must fail");
        assert_eq!(error.path, ".");
    }

    #[test]
    fn factory_prefers_record_uid_and_falls_back_to_counter() {
        let frames = cache_with(&["block_001.png"]);
        let mut factory = BlockFactory::new(BlockMode::Foreground);
        let record = |uid: Value| json!({ "position": "0,0", "frame": "block_001.png", "uID": uid });

        let uids: Vec<u32> = [json!(2), json!(2), json!(1), json!(-3), json!(3)]
            .into_iter()
            .map(|uid| factory.create("k", &record(uid), &frames).expect("spawn").uid)
            .collect();
        // Duplicate 2 takes the first free counter value, 1; then 1 is taken,
        // so the explicit 1 and the negative uid move on to 3 and 4.
        assert_eq!(uids, vec![2, 1, 3, 4, 5]);
    }

    #[test]
    fn factory_rejects_invalid_records_without_consuming_uids() {
        let frames = cache_with(&["block_001.png"]);
        let mut factory = BlockFactory::new(BlockMode::Foreground);

        let cases = [
            (json!("text"), SkipReason::InvalidEntityRecord),
            (json!({ "frame": "block_001.png" }), SkipReason::MissingField("position")),
            (json!({ "position": "1,2" }), SkipReason::MissingField("frame")),
            (
                json!({ "position": "1,2", "frame": "" }),
                SkipReason::MissingField("frame"),
            ),
            (
                json!({ "position": "1,2", "frame": "other.png" }),
                SkipReason::UnknownFrame("other.png".to_string()),
            ),
        ];
        for (record, reason) in cases {
            assert_eq!(factory.create("k", &record, &frames), Err(reason));
        }

        let spawn = factory
            .create("k", &json!({ "position": "1,2", "frame": "block_001.png" }), &frames)
            .expect("spawn");
        assert_eq!(spawn.uid, FIRST_AUTO_UID);
    }

    #[test]
    fn factory_carries_scale_animation_and_opaque_fields() {
        let frames = cache_with(&["torch_01.png"]);
        let mut factory = BlockFactory::new(BlockMode::Background);
        let spawn = factory
            .create(
                "torch",
                &json!({
                    "x": 4, "y": -8,
                    "frame": "torch_01.png",
                    "scale": 2.0,
                    "animation": { "name": "torch_01.png", "fps": 12, "loop": true },
                    "flipX": true,
                    "tag": "light"
                }),
                &frames,
            )
            .expect("spawn");

        assert_eq!(spawn.position, Vec2::new(4.0, -8.0));
        assert_eq!(spawn.scale, 2.0);
        assert_eq!(
            spawn.animation,
            Some(AnimationSpec {
                name: "torch_01.png".to_string(),
                fps: 12.0,
                looping: true,
            })
        );
        assert_eq!(spawn.extra.len(), 2);
        assert_eq!(spawn.extra["tag"], json!("light"));
        assert!(!spawn.node_desc().interactive);

        let block = spawn.into_block(NodeId(9));
        assert!(block.background);
        assert_eq!(block.node, NodeId(9));
    }

    #[test]
    fn loader_spawns_one_block_per_valid_record_with_labels() {
        let fixture = Fixture::new();
        let (world, loaded, report) = fixture.load(cave_level());

        let keys: Vec<&str> = loaded.blocks.iter().map(|block| block.key.as_str()).collect();
        assert_eq!(keys, vec!["k1", "k2", "k3"]);
        let mut uids: Vec<u32> = loaded.blocks.iter().map(|block| block.uid).collect();
        uids.sort_unstable();
        uids.dedup();
        assert_eq!(uids.len(), 3);

        for block in &loaded.blocks {
            let node = world.node(block.node).expect("block node");
            assert_eq!(node.z_order, block.uid as i32);
            assert!(node.interactive);
        }

        let labels: Vec<String> = loaded
            .labels
            .iter()
            .filter_map(|id| label_text(&world, *id))
            .collect();
        assert_eq!(labels, vec!["k1", "k2", "k3"]);
        let label = world.node(loaded.labels[1]).expect("label");
        assert_eq!(label.z_order, BLOCK_LABEL_Z_ORDER);
        assert_eq!(label.scale, BLOCK_LABEL_SCALE);
        assert_eq!(label.position, Vec2::new(32.0, 0.0));

        assert!(report.success());
        let skipped: Vec<&str> = report
            .skipped
            .iter()
            .map(|record| record.key.as_str())
            .collect();
        assert_eq!(skipped, vec!["k4", "k5", "k6", "k7"]);
        assert!(report
            .skipped
            .iter()
            .all(|record| record.container == "blockContainer"));
    }

    #[test]
    fn loader_places_parallax_children_at_their_own_position() {
        let fixture = Fixture::new();
        let (world, loaded, _report) = fixture.load(cave_level());

        let parallax = loaded.parallax.expect("parallax");
        assert_eq!(world.node(parallax).expect("node").kind, NodeKind::Parallax);
        assert_eq!(loaded.background_blocks.len(), 2);
        assert_ne!(loaded.background_blocks[0].uid, loaded.background_blocks[1].uid);

        let first = &loaded.background_blocks[0];
        let node = world.node(first.node).expect("child");
        assert_eq!(node.parent, Some(parallax));
        let placement = node.parallax.expect("placement");
        assert_eq!(placement.ratio, Vec2::new(1.0, 1.0));
        assert_eq!(placement.offset, Vec2::new(10.0, 20.0));
        assert_eq!(node.z_order, first.uid as i32);
        assert!(!node.interactive);
    }

    #[test]
    fn player_spawn_moves_camera_and_halves_zoom() {
        let fixture = Fixture::new();
        let (world, loaded, _report) = fixture.load(cave_level());
        assert_eq!(world.camera().position, Vec2::new(100.0, 200.0));
        assert_eq!(world.camera().zoom, CAMERA_ZOOM_DEFAULT * 0.5);

        let background = world.node(loaded.background.expect("background")).expect("node");
        assert_eq!(background.position, Vec2::new(100.0, 200.0));
    }

    #[test]
    fn missing_or_unparsable_spawn_leaves_camera_unchanged() {
        let fixture = Fixture::new();
        for level in [json!({}), json!({ "playerSpawn": "nowhere" })] {
            fixture.write_level(&level);
            let (mut world, layer) = fixture.world();
            world.camera_mut().position = Vec2::new(3.0, 4.0);
            let (_loaded, report) = LevelLoader::load(LEVEL, &mut world, layer);
            assert!(report.success());
            assert_eq!(world.camera().position, Vec2::new(3.0, 4.0));
            assert_eq!(world.camera().zoom, CAMERA_ZOOM_DEFAULT);
        }
    }

    #[test]
    fn malformed_document_reports_parse_error_and_spawns_nothing() {
        let fixture = Fixture::new();
        fs::write(fixture.temp.path().join(LEVEL), "{ \"blockContainer\": ").expect("write");
        let (mut world, layer) = fixture.world();

        let (loaded, report) = LevelLoader::load(LEVEL, &mut world, layer);
        assert_eq!(loaded, LoadedLevel::default());
        assert_eq!(world.node_count(), 1);
        assert!(matches!(report.errors.as_slice(), [LoadError::Parse { .. }]));
        assert!(!report.success());
    }

    #[test]
    fn unreadable_level_reports_io_error() {
        let fixture = Fixture::new();
        let (mut world, layer) = fixture.world();
        let (loaded, report) = LevelLoader::load("absent.json", &mut world, layer);
        assert_eq!(loaded, LoadedLevel::default());
        assert!(matches!(report.errors.as_slice(), [LoadError::Io { .. }]));
    }

    #[test]
    fn missing_sheet_and_background_are_reported_and_loading_continues() {
        let fixture = Fixture::new();
        let (world, loaded, report) = fixture.load(json!({
            "sheetContainer": { "gone": { "texture": "sheets/gone" } },
            "settings": { "bgImage": "no_such_bg" },
            "blockContainer": {
                "k": { "position": "0,0", "frame": "block_001.png" }
            }
        }));

        assert!(matches!(
            report.errors.as_slice(),
            [LoadError::SpriteSheet { sheet, .. }, LoadError::Texture { texture, .. }]
                if sheet == "sheets/gone.plist" && texture == "no_such_bg.png"
        ));
        assert_eq!(loaded.background, None);
        assert!(loaded.parallax.is_some());
        assert!(loaded.blocks.is_empty());
        assert_eq!(
            report.skipped[0].reason,
            SkipReason::UnknownFrame("block_001.png".to_string())
        );
        assert!(world.node_count() >= 2);
    }

    #[test]
    fn absent_bg_image_creates_no_background_silently() {
        let fixture = Fixture::new();
        let (_world, loaded, report) = fixture.load(json!({ "settings": {} }));
        assert_eq!(loaded.background, None);
        assert!(report.success());
    }

    #[test]
    fn missing_layer_loads_nothing() {
        let fixture = Fixture::new();
        fixture.write_level(&cave_level());
        let (mut world, _layer) = fixture.world();
        let (loaded, report) = LevelLoader::load(LEVEL, &mut world, NodeId(404));
        assert_eq!(loaded, LoadedLevel::default());
        assert!(report.success());
        assert_eq!(world.node_count(), 1);
    }

    #[test]
    fn camera_moves_seven_units_per_tick_per_axis() {
        let mut world = SceneWorld::default();
        let controller = CameraController::default();
        let up = DirectionState {
            up: true,
            ..DirectionState::default()
        };
        for _ in 0..10 {
            controller.tick(1.0 / 60.0, up, &mut world, LayerHandles::default());
        }
        assert_eq!(world.camera().position, Vec2::new(0.0, 70.0));

        let diagonal = DirectionState {
            down: true,
            right: true,
            ..DirectionState::default()
        };
        controller.tick(5.0, diagonal, &mut world, LayerHandles::default());
        assert_eq!(world.camera().position, Vec2::new(7.0, 63.0));

        let opposed = DirectionState {
            left: true,
            right: true,
            ..DirectionState::default()
        };
        controller.tick(0.0, opposed, &mut world, LayerHandles::default());
        assert_eq!(world.camera().position, Vec2::new(7.0, 63.0));
    }

    #[test]
    fn camera_tick_repositions_background_layers() {
        let mut world = SceneWorld::default();
        let background = world.add_child(NodeDesc::empty(), 0);
        let parallax = world.add_child(NodeDesc::parallax(), 0);
        world.camera_mut().position = Vec2::new(100.0, 200.0);

        CameraController::default().tick(
            0.016,
            DirectionState::default(),
            &mut world,
            LayerHandles {
                background: Some(background),
                parallax: Some(parallax),
            },
        );
        assert_eq!(
            world.node(parallax).expect("parallax").position,
            Vec2::new(-440.0, -380.0)
        );
        assert_eq!(
            world.node(background).expect("background").position,
            Vec2::new(-390.0, 580.0)
        );
    }

    #[test]
    fn direction_state_follows_press_and_release() {
        let mut directions = DirectionState::default();
        assert!(directions.apply_key(KeyEvent::pressed(KeyCode::W)));
        assert!(directions.apply_key(KeyEvent::pressed(KeyCode::A)));
        assert!(directions.up && directions.left);
        assert!(directions.apply_key(KeyEvent::released(KeyCode::W)));
        assert!(!directions.up && directions.left);
        assert!(!directions.apply_key(KeyEvent::pressed(KeyCode::F1)));
        assert!(directions.any());
    }

    #[test]
    fn frame_pattern_substitutes_two_and_three_digit_counters() {
        let two = FramePattern::from_first_frame("torch_01.png").expect("pattern");
        assert_eq!(two.frame_name(7), "torch_07.png");
        let three = FramePattern::from_first_frame("walk_001.png").expect("pattern");
        assert_eq!(three.frame_name(12), "walk_012.png");
        assert_eq!(FramePattern::from_first_frame("static.png"), None);
        assert_eq!(
            looped_variant("walk_001.png").as_deref(),
            Some("walk_001_looped_001.png")
        );
    }

    #[test]
    fn frames_are_collected_until_the_first_gap() {
        let frames = cache_with(&["walk_001.png", "walk_002.png", "walk_004.png"]);
        assert_eq!(
            resolve_animation_frames("walk_001.png", &frames),
            vec!["walk_001.png", "walk_002.png"]
        );
        assert!(resolve_animation_frames("run_001.png", &frames).is_empty());
    }

    #[test]
    fn looped_variant_is_used_when_its_first_frame_exists() {
        let frames = cache_with(&[
            "idle_001.png",
            "idle_002.png",
            "idle_001_looped_001.png",
            "idle_001_looped_002.png",
            "idle_001_looped_003.png",
        ]);
        assert_eq!(
            resolve_animation_frames("idle_001.png", &frames),
            vec![
                "idle_001_looped_001.png",
                "idle_001_looped_002.png",
                "idle_001_looped_003.png"
            ]
        );
    }

    #[test]
    fn plain_pattern_is_used_when_first_looped_frame_is_missing() {
        let frames = cache_with(&["idle_001.png", "idle_002.png", "idle_001_looped_002.png"]);
        assert_eq!(
            resolve_animation_frames("idle_001.png", &frames),
            vec!["idle_001.png", "idle_002.png"]
        );
    }

    #[test]
    fn run_animation_replaces_current_animation_with_fps_delay() {
        let mut world = SceneWorld::default();
        world
            .assets_mut()
            .sprite_frames_mut()
            .insert("torch_01.png", test_frame());
        world
            .assets_mut()
            .sprite_frames_mut()
            .insert("torch_02.png", test_frame());
        let node = world.add_child(NodeDesc::frame("torch_01.png"), 0);

        assert_eq!(run_animation(&mut world, node, "torch_01.png", 4.0, true), 2);
        let playback = world.animation(node).expect("running");
        assert!(playback.is_looping());
        assert_eq!(playback.animation().delay_per_frame(), 0.25);

        assert_eq!(run_animation(&mut world, node, "gone_01.png", 4.0, false), 0);
        assert!(world.animation(node).is_none());
    }

    #[test]
    fn loader_starts_record_animations() {
        let fixture = Fixture::new();
        let (world, loaded, _report) = fixture.load(json!({
            "sheetContainer": { "main": { "texture": "sheets/blocks" } },
            "blockContainer": {
                "torch": {
                    "position": "0,0",
                    "frame": "torch_01.png",
                    "animation": { "name": "torch_01.png", "fps": 10 }
                }
            }
        }));
        let torch = loaded.blocks.first().expect("torch");
        let playback = world.animation(torch.node).expect("animation");
        assert_eq!(playback.animation().frames().len(), 3);
        assert!(!playback.is_looping());
    }
