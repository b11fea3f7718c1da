//! Keyboard extension point.
//!
//! The host queues key events as they arrive; the render loop drains them
//! once per tick through whatever handlers have been registered. No handlers
//! are registered by default.

use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    Pressed,
    Released,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyInput {
    /// Logical key as text (`"a"`, `"Space"`, `"ArrowLeft"`, ...).
    pub key: String,
    pub state: KeyState,
}

impl KeyInput {
    pub fn pressed(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            state: KeyState::Pressed,
        }
    }

    pub fn released(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            state: KeyState::Released,
        }
    }
}

type KeyHandler = Box<dyn FnMut(&KeyInput)>;

#[derive(Default)]
pub struct KeyHandlers {
    pending: VecDeque<KeyInput>,
    on_press: Vec<KeyHandler>,
    on_release: Vec<KeyHandler>,
}

impl KeyHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_press(&mut self, handler: impl FnMut(&KeyInput) + 'static) {
        self.on_press.push(Box::new(handler));
    }

    pub fn on_release(&mut self, handler: impl FnMut(&KeyInput) + 'static) {
        self.on_release.push(Box::new(handler));
    }

    pub fn queue(&mut self, input: KeyInput) {
        self.pending.push_back(input);
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Dispatches every queued event. Returns how many were processed.
    pub fn process(&mut self) -> usize {
        let mut processed = 0;
        while let Some(input) = self.pending.pop_front() {
            let handlers = match input.state {
                KeyState::Pressed => &mut self.on_press,
                KeyState::Released => &mut self.on_release,
            };
            for handler in handlers.iter_mut() {
                handler(&input);
            }
            processed += 1;
        }
        processed
    }
}

impl std::fmt::Debug for KeyHandlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyHandlers")
            .field("pending", &self.pending.len())
            .field("on_press", &self.on_press.len())
            .field("on_release", &self.on_release.len())
            .finish()
    }
}
