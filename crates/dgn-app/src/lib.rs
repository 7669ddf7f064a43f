//! DGN Engine application framework.
//!
//! Window and event handling, the fixed-timestep loop, the fly camera and
//! the bouncing-ball demo scene lit by a cascaded-shadow sun.

pub mod error;
pub mod fly_camera;
pub mod game_loop;
pub mod scene;
pub mod window;

pub use error::AppError;
pub use fly_camera::FlyCamera;
pub use game_loop::{FIXED_DT, GameLoop, MAX_FRAME_TIME};
pub use scene::{BouncingBall, DemoScene, SceneMesh, SceneObject};
pub use window::{AppState, run};
