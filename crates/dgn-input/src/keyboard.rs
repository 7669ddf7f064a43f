//! Frame-coherent keyboard state.
//!
//! Keys are tracked by physical [`KeyCode`] so movement bindings sit in the
//! same place on every layout. Events for unidentified keys are dropped.

use std::collections::HashSet;

use winit::event::{ElementState, KeyEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Key event reduced to what the tracker needs; constructible in tests.
#[derive(Debug, Clone, Copy)]
pub struct RawKeyEvent {
    pub key: PhysicalKey,
    pub state: ElementState,
    pub repeat: bool,
}

/// Held keys plus the transitions seen since the last
/// [`end_frame`](Self::end_frame).
#[derive(Debug, Clone, Default)]
pub struct KeyboardState {
    held: HashSet<KeyCode>,
    pressed: HashSet<KeyCode>,
    released: HashSet<KeyCode>,
}

impl KeyboardState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process_event(&mut self, event: &KeyEvent) {
        self.process_raw(RawKeyEvent {
            key: event.physical_key,
            state: event.state,
            repeat: event.repeat,
        });
    }

    /// OS key repeats are ignored; a held key reports one press.
    pub fn process_raw(&mut self, event: RawKeyEvent) {
        let PhysicalKey::Code(code) = event.key else {
            return;
        };
        if event.repeat {
            return;
        }
        match event.state {
            ElementState::Pressed => {
                if self.held.insert(code) {
                    self.pressed.insert(code);
                }
            }
            ElementState::Released => {
                if self.held.remove(&code) {
                    self.released.insert(code);
                }
            }
        }
    }

    #[must_use]
    pub fn is_held(&self, key: KeyCode) -> bool {
        self.held.contains(&key)
    }

    /// Pressed since the last frame boundary.
    #[must_use]
    pub fn just_pressed(&self, key: KeyCode) -> bool {
        self.pressed.contains(&key)
    }

    /// Released since the last frame boundary.
    #[must_use]
    pub fn just_released(&self, key: KeyCode) -> bool {
        self.released.contains(&key)
    }

    /// -1, 0 or 1 from a pair of opposing keys; both held cancel out.
    #[must_use]
    pub fn axis(&self, negative: KeyCode, positive: KeyCode) -> f32 {
        f32::from(u8::from(self.is_held(positive))) - f32::from(u8::from(self.is_held(negative)))
    }

    /// Release everything, e.g. when the window loses focus and release
    /// events will never arrive.
    pub fn release_all(&mut self) {
        self.released.extend(self.held.drain());
    }

    /// Forget this frame's transitions. Held keys stay held.
    pub fn end_frame(&mut self) {
        self.pressed.clear();
        self.released.clear();
    }
}
