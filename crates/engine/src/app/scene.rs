use std::collections::{BTreeMap, HashMap};

use super::animation::AnimationPlayback;
use super::assets::Assets;
use super::events::{EventDispatcher, ListenerId};
use super::input::{ActionStates, InputAction, KeyEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SceneKey {
    Menu,
    SaveSelect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneCommand {
    None,
    SwitchTo(SceneKey),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InputSnapshot {
    quit_requested: bool,
    switch_scene_pressed: bool,
    actions: ActionStates,
    window_width: u32,
    window_height: u32,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn new(
        quit_requested: bool,
        switch_scene_pressed: bool,
        actions: ActionStates,
        window_width: u32,
        window_height: u32,
    ) -> Self {
        Self {
            quit_requested,
            switch_scene_pressed,
            actions,
            window_width,
            window_height,
        }
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn switch_scene_pressed(&self) -> bool {
        self.switch_scene_pressed
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.actions.is_down(action)
    }

    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        self.actions.set(action, is_down);
        self
    }

    pub fn with_switch_scene_pressed(mut self, pressed: bool) -> Self {
        self.switch_scene_pressed = pressed;
        self
    }

    pub fn with_window_size(mut self, window_size: (u32, u32)) -> Self {
        self.window_width = window_size.0;
        self.window_height = window_size.1;
        self
    }

    pub fn window_size(&self) -> (u32, u32) {
        (self.window_width, self.window_height)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

pub const CAMERA_ZOOM_DEFAULT: f32 = 1.0;

/// Scene camera. `position` is the world point shown at the center of the
/// view; zoom is world units per screen pixel, so 0.5 magnifies two times.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera2D {
    pub position: Vec2,
    pub zoom: f32,
}

impl Default for Camera2D {
    fn default() -> Self {
        Self {
            position: Vec2::default(),
            zoom: CAMERA_ZOOM_DEFAULT,
        }
    }
}

impl Camera2D {
    /// Zoom used for rendering. Non-finite or non-positive zoom renders at
    /// the default.
    pub fn effective_zoom(&self) -> f32 {
        if self.zoom.is_finite() && self.zoom > 0.0 {
            self.zoom
        } else {
            CAMERA_ZOOM_DEFAULT
        }
    }
}

pub const DEFAULT_VISIBLE_SIZE: Vec2 = Vec2::new(1280.0, 720.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpriteSource {
    Texture(String),
    Frame(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelDesc {
    pub text: String,
    pub color: [u8; 4],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Empty,
    Sprite(SpriteSource),
    Label(LabelDesc),
    Parallax,
}

/// Placement of a child inside a parallax container: the child sits at
/// `container.position * ratio + offset` in the container's parent space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParallaxChild {
    pub ratio: Vec2,
    pub offset: Vec2,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub kind: NodeKind,
    pub position: Vec2,
    pub scale: f32,
    pub z_order: i32,
    pub visible: bool,
    pub interactive: bool,
    pub parallax: Option<ParallaxChild>,
    arrival_order: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeDesc {
    pub kind: NodeKind,
    pub position: Vec2,
    pub scale: f32,
    pub interactive: bool,
}

impl NodeDesc {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            position: Vec2::default(),
            scale: 1.0,
            interactive: false,
        }
    }

    pub fn empty() -> Self {
        Self::new(NodeKind::Empty)
    }

    pub fn texture(name: impl Into<String>) -> Self {
        Self::new(NodeKind::Sprite(SpriteSource::Texture(name.into())))
    }

    pub fn frame(name: impl Into<String>) -> Self {
        Self::new(NodeKind::Sprite(SpriteSource::Frame(name.into())))
    }

    pub fn label(text: impl Into<String>) -> Self {
        Self::new(NodeKind::Label(LabelDesc {
            text: text.into(),
            color: [255, 255, 255, 255],
        }))
    }

    pub fn parallax() -> Self {
        Self::new(NodeKind::Parallax)
    }

    pub fn at(mut self, position: Vec2) -> Self {
        self.position = position;
        self
    }

    pub fn scaled(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldTransform {
    pub position: Vec2,
    pub scale: f32,
}

impl WorldTransform {
    pub const IDENTITY: Self = Self {
        position: Vec2::new(0.0, 0.0),
        scale: 1.0,
    };

    fn apply(&self, local: Vec2) -> Vec2 {
        Vec2 {
            x: self.position.x + local.x * self.scale,
            y: self.position.y + local.y * self.scale,
        }
    }

    fn child(&self, node: &Node) -> Self {
        Self {
            position: self.apply(node.position),
            scale: self.scale * node.scale,
        }
    }
}

/// Child transform given its parent, the parent's transform and the
/// transform of the parent's own parent.
fn compose(
    grandparent: WorldTransform,
    parent: &Node,
    parent_transform: WorldTransform,
    child: &Node,
) -> WorldTransform {
    match (&parent.kind, child.parallax) {
        (NodeKind::Parallax, Some(placement)) => {
            let local = Vec2 {
                x: parent.position.x * placement.ratio.x + placement.offset.x,
                y: parent.position.y * placement.ratio.y + placement.offset.y,
            };
            WorldTransform {
                position: grandparent.apply(local),
                scale: grandparent.scale * parent.scale * child.scale,
            }
        }
        _ => parent_transform.child(child),
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DrawItem<'a> {
    pub node: &'a Node,
    pub transform: WorldTransform,
}

#[derive(Debug)]
pub struct SceneWorld {
    nodes: BTreeMap<NodeId, Node>,
    next_node_id: u64,
    next_arrival_order: u64,
    camera: Camera2D,
    visible_size: Vec2,
    assets: Assets,
    events: EventDispatcher,
    animations: HashMap<NodeId, AnimationPlayback>,
}

impl Default for SceneWorld {
    fn default() -> Self {
        Self {
            nodes: BTreeMap::new(),
            next_node_id: 0,
            next_arrival_order: 0,
            camera: Camera2D::default(),
            visible_size: DEFAULT_VISIBLE_SIZE,
            assets: Assets::default(),
            events: EventDispatcher::default(),
            animations: HashMap::new(),
        }
    }
}

impl SceneWorld {
    /// Adds a root node.
    pub fn add_child(&mut self, desc: NodeDesc, z_order: i32) -> NodeId {
        self.insert_node(None, desc, z_order, None)
    }

    /// Adds `desc` under `parent`. Returns `None` when the parent is gone.
    pub fn add_child_to(&mut self, parent: NodeId, desc: NodeDesc, z_order: i32) -> Option<NodeId> {
        if !self.nodes.contains_key(&parent) {
            return None;
        }
        Some(self.insert_node(Some(parent), desc, z_order, None))
    }

    /// Adds `desc` under a parallax container. Returns `None` when `parallax`
    /// is missing or is not a parallax node.
    pub fn add_parallax_child(
        &mut self,
        parallax: NodeId,
        desc: NodeDesc,
        z_order: i32,
        ratio: Vec2,
        offset: Vec2,
    ) -> Option<NodeId> {
        match self.nodes.get(&parallax) {
            Some(node) if node.kind == NodeKind::Parallax => {}
            _ => return None,
        }
        Some(self.insert_node(
            Some(parallax),
            desc,
            z_order,
            Some(ParallaxChild { ratio, offset }),
        ))
    }

    fn insert_node(
        &mut self,
        parent: Option<NodeId>,
        desc: NodeDesc,
        z_order: i32,
        parallax: Option<ParallaxChild>,
    ) -> NodeId {
        let id = NodeId(self.next_node_id);
        self.next_node_id = self.next_node_id.saturating_add(1);
        let arrival_order = self.next_arrival_order;
        self.next_arrival_order = self.next_arrival_order.saturating_add(1);
        self.nodes.insert(
            id,
            Node {
                id,
                parent,
                kind: desc.kind,
                position: desc.position,
                scale: desc.scale,
                z_order,
                visible: true,
                interactive: desc.interactive,
                parallax,
                arrival_order,
            },
        );
        id
    }

    /// Removes a node together with its subtree and any animation running on
    /// it. Returns false when the node does not exist.
    pub fn remove_node(&mut self, id: NodeId) -> bool {
        if !self.nodes.contains_key(&id) {
            return false;
        }
        let mut doomed = vec![id];
        let mut cursor = 0;
        while cursor < doomed.len() {
            let current = doomed[cursor];
            doomed.extend(
                self.nodes
                    .values()
                    .filter(|node| node.parent == Some(current))
                    .map(|node| node.id),
            );
            cursor += 1;
        }
        for id in doomed {
            self.nodes.remove(&id);
            self.animations.remove(&id);
        }
        true
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Direct children of `parent` in draw order.
    pub fn children(&self, parent: NodeId) -> Vec<NodeId> {
        let mut children: Vec<&Node> = self
            .nodes
            .values()
            .filter(|node| node.parent == Some(parent))
            .collect();
        children.sort_by_key(|node| (node.z_order, node.arrival_order));
        children.into_iter().map(|node| node.id).collect()
    }

    pub fn set_position(&mut self, id: NodeId, position: Vec2) -> bool {
        match self.nodes.get_mut(&id) {
            Some(node) => {
                node.position = position;
                true
            }
            None => false,
        }
    }

    pub fn set_visible(&mut self, id: NodeId, visible: bool) -> bool {
        match self.nodes.get_mut(&id) {
            Some(node) => {
                node.visible = visible;
                true
            }
            None => false,
        }
    }

    pub fn world_transform(&self, id: NodeId) -> Option<WorldTransform> {
        let mut chain = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let node = self.nodes.get(&current)?;
            chain.push(node);
            cursor = node.parent;
        }
        chain.reverse();

        let mut grandparent = WorldTransform::IDENTITY;
        let mut current = WorldTransform::IDENTITY;
        let mut parent: Option<&Node> = None;
        for node in chain {
            let next = match parent {
                Some(parent) => compose(grandparent, parent, current, node),
                None => WorldTransform::IDENTITY.child(node),
            };
            grandparent = current;
            current = next;
            parent = Some(node);
        }
        Some(current)
    }

    pub fn world_position(&self, id: NodeId) -> Option<Vec2> {
        self.world_transform(id).map(|transform| transform.position)
    }

    /// Visible nodes back to front. Siblings are ordered by z-order, then by
    /// insertion; a hidden node hides its whole subtree.
    pub fn draw_list(&self) -> Vec<DrawItem<'_>> {
        let mut children_of: HashMap<Option<NodeId>, Vec<&Node>> = HashMap::new();
        for node in self.nodes.values() {
            children_of.entry(node.parent).or_default().push(node);
        }
        for siblings in children_of.values_mut() {
            siblings.sort_by_key(|node| (node.z_order, node.arrival_order));
        }

        let mut items = Vec::new();
        if let Some(roots) = children_of.get(&None) {
            for root in roots {
                collect_visible(
                    &children_of,
                    root,
                    WorldTransform::IDENTITY,
                    WorldTransform::IDENTITY.child(root),
                    &mut items,
                );
            }
        }
        items
    }

    pub fn camera(&self) -> &Camera2D {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera2D {
        &mut self.camera
    }

    pub fn visible_size(&self) -> Vec2 {
        self.visible_size
    }

    pub fn set_visible_size(&mut self, size: Vec2) {
        self.visible_size = size;
    }

    pub fn assets(&self) -> &Assets {
        &self.assets
    }

    pub fn assets_mut(&mut self) -> &mut Assets {
        &mut self.assets
    }

    pub fn set_assets(&mut self, assets: Assets) {
        self.assets = assets;
    }

    pub fn events(&self) -> &EventDispatcher {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventDispatcher {
        &mut self.events
    }

    /// Starts `playback` on a sprite node, replacing any running animation.
    /// The node shows the first frame immediately.
    pub fn run_animation(&mut self, id: NodeId, playback: AnimationPlayback) -> bool {
        let Some(node) = self.nodes.get_mut(&id) else {
            return false;
        };
        if !matches!(node.kind, NodeKind::Sprite(_)) {
            return false;
        }
        if let Some(frame) = playback.current_frame() {
            node.kind = NodeKind::Sprite(SpriteSource::Frame(frame.to_string()));
        }
        self.animations.insert(id, playback);
        true
    }

    pub fn stop_animation(&mut self, id: NodeId) -> bool {
        self.animations.remove(&id).is_some()
    }

    pub fn animation(&self, id: NodeId) -> Option<&AnimationPlayback> {
        self.animations.get(&id)
    }

    pub fn animation_count(&self) -> usize {
        self.animations.len()
    }

    pub fn tick_animations(&mut self, dt_seconds: f32) {
        let nodes = &mut self.nodes;
        self.animations.retain(|id, playback| {
            let Some(node) = nodes.get_mut(id) else {
                return false;
            };
            if let Some(frame) = playback.advance(dt_seconds) {
                node.kind = NodeKind::Sprite(SpriteSource::Frame(frame.to_string()));
            }
            true
        });
    }

    /// Drops the scene graph, listeners and animations and resets the camera.
    /// Assets and the visible size survive.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.next_arrival_order = 0;
        self.camera = Camera2D::default();
        self.events.clear();
        self.animations.clear();
    }
}

fn collect_visible<'a>(
    children_of: &HashMap<Option<NodeId>, Vec<&'a Node>>,
    node: &'a Node,
    parent_transform: WorldTransform,
    transform: WorldTransform,
    items: &mut Vec<DrawItem<'a>>,
) {
    if !node.visible {
        return;
    }
    items.push(DrawItem { node, transform });
    if let Some(children) = children_of.get(&Some(node.id)) {
        for child in children {
            let child_transform = compose(parent_transform, node, transform, child);
            collect_visible(children_of, child, transform, child_transform, items);
        }
    }
}

pub trait Scene {
    fn load(&mut self, world: &mut SceneWorld);
    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        world: &mut SceneWorld,
    ) -> SceneCommand;
    fn render(&mut self, world: &SceneWorld);
    fn unload(&mut self, world: &mut SceneWorld);
    /// Called on the outgoing scene when another scene becomes active. Its
    /// world is kept, but key events stop arriving until it is active again.
    fn suspend(&mut self, _world: &mut SceneWorld) {}
    /// Called once per registered keyboard listener, in dispatch order.
    fn on_key_event(&mut self, _listener: ListenerId, _event: KeyEvent, _world: &mut SceneWorld) {}
    fn debug_title(&self, _world: &SceneWorld) -> Option<String> {
        None
    }
    /// Extra lines for the debug overlay, queried every rendered frame.
    fn debug_overlay_lines(&self, _world: &SceneWorld) -> Option<Vec<String>> {
        None
    }
}

struct SceneRuntime {
    scene: Box<dyn Scene>,
    world: SceneWorld,
    is_loaded: bool,
}

pub(crate) struct SceneMachine {
    menu: SceneRuntime,
    save_select: SceneRuntime,
    active_scene: SceneKey,
}

impl SceneMachine {
    pub(crate) fn new(
        menu: Box<dyn Scene>,
        save_select: Box<dyn Scene>,
        active_scene: SceneKey,
    ) -> Self {
        Self {
            menu: SceneRuntime {
                scene: menu,
                world: SceneWorld::default(),
                is_loaded: false,
            },
            save_select: SceneRuntime {
                scene: save_select,
                world: SceneWorld::default(),
                is_loaded: false,
            },
            active_scene,
        }
    }

    pub(crate) fn active_scene(&self) -> SceneKey {
        self.active_scene
    }

    pub(crate) fn set_assets_for_all(&mut self, assets: Assets) {
        self.menu.world.set_assets(assets.clone());
        self.save_select.world.set_assets(assets);
    }

    pub(crate) fn set_visible_size_for_all(&mut self, size: Vec2) {
        self.menu.world.set_visible_size(size);
        self.save_select.world.set_visible_size(size);
    }

    pub(crate) fn load_active(&mut self) {
        let key = self.active_scene;
        self.load_scene_if_needed(key);
    }

    /// Runs one fixed tick of the active scene, then advances its animations.
    pub(crate) fn update_active(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
    ) -> SceneCommand {
        let runtime = self.active_runtime_mut();
        let (scene, world) = (&mut runtime.scene, &mut runtime.world);
        let command = scene.update(fixed_dt_seconds, input, world);
        world.tick_animations(fixed_dt_seconds);
        command
    }

    /// Delivers `event` to the active scene once for each of its keyboard
    /// listeners. Returns the number of deliveries.
    pub(crate) fn dispatch_key_event_active(&mut self, event: KeyEvent) -> usize {
        let runtime = self.active_runtime_mut();
        let listeners = runtime.world.events().keyboard_listeners();
        for listener in &listeners {
            let (scene, world) = (&mut runtime.scene, &mut runtime.world);
            scene.on_key_event(*listener, event, world);
        }
        listeners.len()
    }

    pub(crate) fn render_active(&mut self) {
        let runtime = self.active_runtime_mut();
        runtime.scene.render(&runtime.world);
    }

    pub(crate) fn active_world(&self) -> &SceneWorld {
        &self.active_runtime_ref().world
    }

    #[cfg(test)]
    pub(crate) fn active_world_mut(&mut self) -> &mut SceneWorld {
        &mut self.active_runtime_mut().world
    }

    pub(crate) fn debug_title_active(&self) -> Option<String> {
        let runtime = self.active_runtime_ref();
        runtime.scene.debug_title(&runtime.world)
    }

    pub(crate) fn debug_overlay_lines_active(&self) -> Option<Vec<String>> {
        let runtime = self.active_runtime_ref();
        runtime.scene.debug_overlay_lines(&runtime.world)
    }

    pub(crate) fn switch_to(&mut self, next_scene: SceneKey) -> bool {
        if self.active_scene == next_scene {
            return false;
        }

        let outgoing = self.active_runtime_mut();
        if outgoing.is_loaded {
            let (scene, world) = (&mut outgoing.scene, &mut outgoing.world);
            scene.suspend(world);
        }
        self.load_scene_if_needed(next_scene);
        self.active_scene = next_scene;
        true
    }

    pub(crate) fn shutdown_all(&mut self) {
        for runtime in [&mut self.menu, &mut self.save_select] {
            if runtime.is_loaded {
                let (scene, world) = (&mut runtime.scene, &mut runtime.world);
                scene.unload(world);
                runtime.world.clear();
                runtime.is_loaded = false;
            }
        }
    }

    fn load_scene_if_needed(&mut self, key: SceneKey) {
        let runtime = self.runtime_mut(key);
        if runtime.is_loaded {
            return;
        }
        let (scene, world) = (&mut runtime.scene, &mut runtime.world);
        scene.load(world);
        runtime.is_loaded = true;
    }

    fn active_runtime_mut(&mut self) -> &mut SceneRuntime {
        self.runtime_mut(self.active_scene)
    }

    fn active_runtime_ref(&self) -> &SceneRuntime {
        self.runtime_ref(self.active_scene)
    }

    fn runtime_mut(&mut self, key: SceneKey) -> &mut SceneRuntime {
        match key {
            SceneKey::Menu => &mut self.menu,
            SceneKey::SaveSelect => &mut self.save_select,
        }
    }

    fn runtime_ref(&self, key: SceneKey) -> &SceneRuntime {
        match key {
            SceneKey::Menu => &self.menu,
            SceneKey::SaveSelect => &self.save_select,
        }
    }
}
