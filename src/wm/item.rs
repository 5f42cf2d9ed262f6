//! TabContentItem - one piece of tabbed content
//!
//! An item owns its content surface. It is never copied: detaching a tab
//! moves the item value out of its window and attaching moves it into the
//! next one. The item only remembers which window holds it by id.

use std::fmt;

use crate::core::bitmap;
use crate::core::surface::{ContentSurface, SurfaceEvent};
use crate::core::{Bitmap, HostId, ItemKey, TabId};

/// Title shown before a surface reports one
const UNTITLED: &str = "New Tab";

/// A movable tab: content surface plus display metadata
pub struct TabContentItem {
    id: TabId,
    key: ItemKey,
    title: String,
    url: String,
    icon: Option<Bitmap>,
    loading: bool,
    can_go_back: bool,
    can_go_forward: bool,
    surface: Box<dyn ContentSurface>,
    /// Window currently holding this item (non-owning)
    owner: Option<HostId>,
}

impl TabContentItem {
    /// Wrap a fresh surface and start loading `hint`
    pub fn new(id: TabId, key: ItemKey, mut surface: Box<dyn ContentSurface>, hint: &str) -> Self {
        if !hint.is_empty() {
            surface.navigate(hint);
        }
        Self {
            id,
            key,
            title: String::new(),
            url: hint.to_string(),
            icon: None,
            loading: !hint.is_empty(),
            can_go_back: false,
            can_go_forward: false,
            surface,
            owner: None,
        }
    }

    pub fn id(&self) -> &TabId {
        &self.id
    }

    pub fn key(&self) -> ItemKey {
        self.key
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn icon(&self) -> Option<&Bitmap> {
        self.icon.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn can_go_back(&self) -> bool {
        self.can_go_back
    }

    pub fn can_go_forward(&self) -> bool {
        self.can_go_forward
    }

    /// Text for the strip entry: title, else url, else a placeholder
    pub fn display_title(&self) -> &str {
        if !self.title.is_empty() {
            &self.title
        } else if !self.url.is_empty() {
            &self.url
        } else {
            UNTITLED
        }
    }

    pub fn owner(&self) -> Option<HostId> {
        self.owner
    }

    pub(crate) fn set_owner(&mut self, host: HostId) {
        self.owner = Some(host);
    }

    pub(crate) fn clear_owner(&mut self) {
        self.owner = None;
    }

    pub fn surface(&self) -> &dyn ContentSurface {
        self.surface.as_ref()
    }

    pub fn surface_mut(&mut self) -> &mut dyn ContentSurface {
        self.surface.as_mut()
    }

    /// Apply a surface event. Returns true when the strip label changed.
    pub fn apply_event(&mut self, event: SurfaceEvent) -> bool {
        match event {
            SurfaceEvent::TitleChanged(title) => {
                let changed = self.title != title;
                self.title = title;
                changed
            }
            SurfaceEvent::UrlChanged(url) => {
                let label_follows_url = self.title.is_empty();
                let changed = self.url != url;
                self.url = url;
                changed && label_follows_url
            }
            SurfaceEvent::LoadingStateChanged {
                is_loading,
                can_go_back,
                can_go_forward,
            } => {
                self.loading = is_loading;
                self.can_go_back = can_go_back;
                self.can_go_forward = can_go_forward;
                false
            }
            SurfaceEvent::FaviconReady { width, height, pixels } => {
                match bitmap::from_rgba(width, height, pixels) {
                    Some(icon) => self.icon = Some(icon),
                    None => tracing::warn!(tab = %self.id, width, height, "Ignoring malformed favicon"),
                }
                false
            }
        }
    }

    /// Uninitialize the surface and drop the item
    pub fn shutdown(mut self) {
        self.surface.shutdown();
        tracing::debug!(tab = %self.id, "Content surface shut down");
    }
}

impl fmt::Debug for TabContentItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TabContentItem")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("title", &self.title)
            .field("url", &self.url)
            .field("owner", &self.owner)
            .finish_non_exhaustive()
    }
}
