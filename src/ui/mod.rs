//! Terminal front-end.
//!
//! - **canvas**: off-screen cell grid, flushed row by row
//! - **renderer**: draws the virtual desktop, its windows and the status bar
//! - **keymapper**: keyboard and mouse input to tab manager commands
//!
//! The desktop occupies every terminal row but the last, which holds the
//! status bar. One desktop unit is one terminal cell.

pub mod canvas;
pub mod keymapper;
pub mod renderer;

pub use keymapper::{AddressInput, Command, KeyMapper};
pub use renderer::DesktopRenderer;
