//! Keyboard input for the demo's fly camera.

mod keyboard;

pub use keyboard::{KeyboardState, RawKeyEvent};
