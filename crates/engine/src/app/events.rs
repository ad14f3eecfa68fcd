#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

#[derive(Debug, Clone, Copy)]
struct KeyboardListener {
    id: ListenerId,
    priority: i32,
    registration_order: u64,
}

/// Keyboard listener registry owned by a scene world.
///
/// Listeners are dispatched in ascending priority; equal priorities keep
/// registration order. Clearing the world drops every listener.
#[derive(Debug, Default)]
pub struct EventDispatcher {
    listeners: Vec<KeyboardListener>,
    next_id: u64,
}

impl EventDispatcher {
    pub fn add_keyboard_listener(&mut self, priority: i32) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        let listener = KeyboardListener {
            id,
            priority,
            registration_order: id.0,
        };
        let insert_at = self
            .listeners
            .iter()
            .position(|existing| {
                (existing.priority, existing.registration_order)
                    > (listener.priority, listener.registration_order)
            })
            .unwrap_or(self.listeners.len());
        self.listeners.insert(insert_at, listener);
        id
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|listener| listener.id != id);
        self.listeners.len() != before
    }

    pub fn has_keyboard_listeners(&self) -> bool {
        !self.listeners.is_empty()
    }

    pub fn keyboard_listeners(&self) -> Vec<ListenerId> {
        self.listeners.iter().map(|listener| listener.id).collect()
    }

    pub fn clear(&mut self) {
        self.listeners.clear();
    }
}
