//! Window Manager - tab host windows with cross-window drag.
//!
//! This module provides the tab management core:
//!
//! - **item**: `TabContentItem`, the content moved between windows
//! - **strip**: strip entries, their layout and fade animation
//! - **host**: `TabHostWindow` and the `TabHost` capability
//! - **registry**: `TabRegistry`, the id index and window lifecycle
//! - **drag**: `DragCoordinator`, the drag-out state machine
//! - **snapshot**: drag preview bitmaps
//! - **context**: `TabContext`, the process-wide owner of all of the above
//!
//! # Module Hierarchy
//!
//! ```text
//! wm/
//! ├── mod.rs       - Module exports
//! ├── context.rs   - TabContext (top-level coordinator)
//! ├── registry.rs  - TabRegistry (tabs and windows)
//! ├── drag.rs      - DragCoordinator
//! ├── host.rs      - TabHostWindow
//! ├── strip.rs     - Strip entries and layout
//! ├── item.rs      - TabContentItem
//! ├── snapshot.rs  - Preview capture
//! └── services.rs  - Platform, surfaces and config bundle
//! ```

pub mod context;
pub mod drag;
pub mod host;
pub mod item;
pub mod registry;
pub mod services;
pub mod snapshot;
pub mod strip;

#[cfg(test)]
pub(crate) mod testing;

pub use context::{ContextHandle, ContextState, TabContext};
pub use drag::{DragOutcome, DragPhase};
pub use host::{TabHost, TabHostWindow};
pub use registry::TabRegistry;
