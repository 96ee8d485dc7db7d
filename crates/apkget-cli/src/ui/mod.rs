//! Terminal UI: live split table, menus, themed output.

pub mod actor;
pub mod engine;
pub mod menu;
pub mod output;
pub mod progress;
pub mod table;
pub mod theme;

pub use apkget_core::reporter::Reporter;
pub use output::Output;
pub use theme::Theme;
