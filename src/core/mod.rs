//! Core building blocks shared by the tab manager and its collaborators.
//!
//! - **geometry**: points, sizes and rectangles in screen space
//! - **ids**: tab, window and item identifiers
//! - **bitmap**: RGBA bitmaps for icons and drag previews
//! - **error**: `TabError` and the invariant-violation helper
//! - **dispatch**: posting tasks to the UI thread
//! - **platform**: the native window service interface
//! - **surface**: the content surface interface
//!
//! # Architecture
//!
//! ```text
//! TabContext (UI thread)
//! ├── PlatformWindowService   (windows, cursor, hit testing)
//! ├── SurfaceFactory          (content surfaces per tab)
//! └── UiDispatcher            (tasks + surface events from any thread)
//! ```

pub mod bitmap;
pub mod dispatch;
pub mod error;
pub mod geometry;
pub mod ids;
pub mod platform;
pub mod surface;

pub use bitmap::Bitmap;
pub use error::{Result, TabError};
pub use geometry::{Point, Rect, Size};
pub use ids::{HostId, ItemKey, TabId, WindowHandle};
