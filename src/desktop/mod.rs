//! Collaborators that run inside the process.
//!
//! - **virtual_desktop**: window service over a z-ordered stack of rectangles
//! - **page**: content engine with history and synthetic frames

pub mod page;
pub mod virtual_desktop;

pub use page::{PageFactory, PageSurface};
pub use virtual_desktop::{DesktopWindow, VirtualDesktop};
