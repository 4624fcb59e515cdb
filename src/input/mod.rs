//! Input handling module
//!
//! Raw keyboard and mouse state feeding the orbit controls.

mod state;

pub use state::Input;
