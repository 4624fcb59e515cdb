//! Debug UI
//!
//! Panel bindings for tunable parameters, color string handling and the
//! egui overlay that draws them.

mod color;
mod panel;
mod tweaks;

pub use color::{ColorParseError, parse_hex_color, to_hex_color, to_srgb_bytes};
pub use panel::{DebugOverlay, OverlayFrame};
pub use tweaks::{Preset, PresetValue, Tweak, TweakError, TweakKind, TweakPanel, folders};
