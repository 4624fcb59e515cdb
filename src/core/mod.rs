//! Core engine module
//!
//! Window and event loop, configuration, the render loop and its clock

mod config;
mod debug;
mod engine;
mod render_loop;
mod time;

pub use config::{CameraSettings, ConfigError, PortalConfig, SceneVariant};
pub use debug::FrameStats;
pub use engine::{Engine, EngineConfig, EngineContext, EngineError, Game};
pub use render_loop::{FramePolicy, FramePresenter, LoopState, NextTick, RenderLoop, RenderPath};
pub use time::{Clock, FrameClock, ManualClock};
