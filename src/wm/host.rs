//! TabHostWindow - a top-level window with a tab strip and a content area
//!
//! The strip holds one [`StripEntry`] per tab in display order; the content
//! area owns the [`TabContentItem`]s. Every public operation leaves both with
//! the same set of tabs. A window whose strip becomes empty closes itself.
//!
//! During a drag the dragged entry stays in the strip but is hidden; if no
//! visible entry remains the whole window is hidden, never closed, so a
//! cancelled drag can bring it back.

use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, info};

use super::item::TabContentItem;
use super::strip::{self, StripEntry};
use crate::config::{Config, StripConfig};
use crate::core::dispatch::{Liveness, LivenessToken};
use crate::core::error::violation;
use crate::core::platform::{PlatformWindowService, ShowMode, WindowParams};
use crate::core::surface::{ContentSurface, SurfaceEvent};
use crate::core::{HostId, ItemKey, Point, Rect, Result, TabError, TabId, WindowHandle};

/// Why a host window closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The user closed the window
    User,
    /// Its last tab was closed
    LastTabClosed,
    /// Its last tab was moved to another window
    LastTabDetached,
}

/// Address bar and navigation button state for the active tab
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavState {
    pub url: String,
    pub can_go_back: bool,
    pub can_go_forward: bool,
    pub loading: bool,
}

/// Transient pointer state while a strip entry is pressed or dragged
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PointerTrack {
    pub button_down: bool,
    pub dragging: bool,
    pub last_point: Point,
}

/// An attach that failed; the item goes back to the caller untouched
#[derive(Debug)]
pub struct AttachError {
    pub error: TabError,
    pub item: TabContentItem,
}

/// Capability of any window that can host tabs.
///
/// The drag coordinator finds drop targets through this trait rather than
/// by knowing the concrete window type.
pub trait TabHost {
    fn host_id(&self) -> HostId;

    fn window(&self) -> WindowHandle;

    /// Whether `tab` could be attached right now
    fn accepts_tab(&self, tab: &TabId) -> bool;

    fn attach_tab(
        &mut self,
        item: TabContentItem,
        platform: &mut dyn PlatformWindowService,
    ) -> std::result::Result<(), AttachError>;

    /// Highlight as the window a dragged tab would merge into
    fn set_merge_target(&mut self, on: bool);
}

/// A window presenting a tab strip and one content area
pub struct TabHostWindow {
    id: HostId,
    handle: WindowHandle,
    strip: Vec<StripEntry>,
    content: HashMap<TabId, TabContentItem>,
    active: Option<TabId>,
    nav: NavState,
    pointer: PointerTrack,
    /// Platform visibility
    visible: bool,
    merge_target: bool,
    closed: Option<CloseReason>,
    liveness: Liveness,
    strip_config: StripConfig,
    fade_duration: Duration,
}

impl TabHostWindow {
    /// Create the native window (hidden) for a new host
    pub fn open(
        id: HostId,
        rect: Rect,
        config: &Config,
        platform: &mut dyn PlatformWindowService,
    ) -> Result<Self> {
        let params = WindowParams::host("New Tab", rect);
        let handle = platform
            .create_window(&params)
            .ok_or_else(|| TabError::WindowCreation(format!("host window at {:?}", rect)))?;
        info!(host = %id, window = %handle, "Opened host window");
        Ok(Self {
            id,
            handle,
            strip: Vec::new(),
            content: HashMap::new(),
            active: None,
            nav: NavState::default(),
            pointer: PointerTrack::default(),
            visible: false,
            merge_target: false,
            closed: None,
            liveness: Liveness::new(),
            strip_config: config.strip.clone(),
            fade_duration: config.drag.fade_duration(),
        })
    }

    pub fn id(&self) -> HostId {
        self.id
    }

    pub fn handle(&self) -> WindowHandle {
        self.handle
    }

    pub fn liveness(&self) -> LivenessToken {
        self.liveness.token()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_some()
    }

    pub fn close_reason(&self) -> Option<CloseReason> {
        self.closed
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_merge_target(&self) -> bool {
        self.merge_target
    }

    pub fn active_tab(&self) -> Option<&TabId> {
        self.active.as_ref()
    }

    pub fn nav(&self) -> &NavState {
        &self.nav
    }

    pub fn pointer(&self) -> PointerTrack {
        self.pointer
    }

    pub fn entries(&self) -> &[StripEntry] {
        &self.strip
    }

    pub fn tab_count(&self) -> usize {
        self.strip.len()
    }

    pub fn visible_tab_count(&self) -> usize {
        self.strip.iter().filter(|entry| !entry.hidden).count()
    }

    /// Tab ids in display order
    pub fn tab_ids(&self) -> Vec<TabId> {
        self.strip.iter().map(|entry| entry.tab.clone()).collect()
    }

    pub fn contains(&self, tab: &TabId) -> bool {
        self.content.contains_key(tab)
    }

    pub fn item(&self, tab: &TabId) -> Option<&TabContentItem> {
        self.content.get(tab)
    }

    pub fn item_mut(&mut self, tab: &TabId) -> Option<&mut TabContentItem> {
        self.content.get_mut(tab)
    }

    pub fn active_item(&self) -> Option<&TabContentItem> {
        self.active.as_ref().and_then(|tab| self.content.get(tab))
    }

    /// True when strip and content area agree. Only a window whose tabs are
    /// all dragged out may lack an active tab.
    pub fn is_consistent(&self) -> bool {
        self.strip.len() == self.content.len()
            && self.strip.iter().all(|entry| self.content.contains_key(&entry.tab))
            && self
                .active
                .as_ref()
                .map_or(self.visible_tab_count() == 0, |tab| self.content.contains_key(tab))
    }

    fn index_of(&self, tab: &TabId) -> Option<usize> {
        self.strip.iter().position(|entry| &entry.tab == tab)
    }

    fn ensure_open(&self) -> Result<()> {
        match self.closed {
            Some(_) => Err(TabError::HostClosed(self.id)),
            None => Ok(()),
        }
    }

    /// Show (and activate) the window
    pub fn show(&mut self, platform: &mut dyn PlatformWindowService) {
        if self.is_closed() {
            return;
        }
        platform.show_window(self.handle, ShowMode::Show);
        self.visible = true;
    }

    /// Append a new tab built around `surface`; it becomes active if it is the first
    pub fn create_tab(
        &mut self,
        tab: TabId,
        key: ItemKey,
        hint: &str,
        surface: Box<dyn ContentSurface>,
        platform: &mut dyn PlatformWindowService,
    ) -> Result<()> {
        self.ensure_open()?;
        if self.contains(&tab) {
            return Err(violation(TabError::DuplicateTab(tab)));
        }
        let mut item = TabContentItem::new(tab.clone(), key, surface, hint);
        if !item.surface_mut().reparent(self.handle) {
            item.shutdown();
            return Err(TabError::Reparent(tab));
        }
        item.surface_mut().set_visible(false);
        self.insert_item(item, self.strip.len());
        debug!(host = %self.id, tab = %tab, "Created tab");
        if self.active.is_none() {
            self.change_active_tab(&tab, platform)?;
        }
        Ok(())
    }

    /// Remove and uninitialize a tab. Returns the closed item's key.
    ///
    /// Activation falls to the previous entry, or the next one when the
    /// closed entry was first. The window closes when the strip empties.
    pub fn close_tab(&mut self, tab: &TabId, platform: &mut dyn PlatformWindowService) -> Result<ItemKey> {
        let item = self.take_tab(tab, platform)?;
        let key = item.key();
        item.shutdown();
        info!(host = %self.id, tab = %tab, remaining = self.strip.len(), "Closed tab");
        if self.strip.is_empty() {
            self.close(CloseReason::LastTabClosed, platform);
        }
        Ok(key)
    }

    /// Take a tab out without destroying it; the caller owns the item.
    /// The window closes when the strip empties.
    pub fn detach_tab(
        &mut self,
        tab: &TabId,
        platform: &mut dyn PlatformWindowService,
    ) -> Result<TabContentItem> {
        let item = self.take_tab(tab, platform)?;
        self.close_if_empty(platform);
        Ok(item)
    }

    /// Remove a tab from strip and content without closing an emptied window.
    ///
    /// Used where a move may still have to be rolled back; the caller finishes
    /// with [`Self::close_if_empty`].
    pub(crate) fn take_tab(
        &mut self,
        tab: &TabId,
        platform: &mut dyn PlatformWindowService,
    ) -> Result<TabContentItem> {
        let index = match self.index_of(tab) {
            Some(index) => index,
            None => {
                return Err(violation(TabError::TabNotInHost {
                    tab: tab.clone(),
                    host: self.id,
                }))
            }
        };
        let was_active = self.active.as_ref() == Some(tab);
        self.strip.remove(index);
        let mut item = match self.content.remove(tab) {
            Some(item) => item,
            None => {
                return Err(violation(TabError::TabNotInHost {
                    tab: tab.clone(),
                    host: self.id,
                }))
            }
        };
        item.surface_mut().set_visible(false);
        item.clear_owner();

        if was_active {
            self.active = None;
            if let Some(next) = self.neighbor_of(index, false) {
                self.activate(&next, platform);
            } else {
                self.nav = NavState::default();
            }
        }
        Ok(item)
    }

    /// Put back an item taken by [`Self::take_tab`] at its old position
    pub(crate) fn restore_tab(
        &mut self,
        mut item: TabContentItem,
        index: usize,
        platform: &mut dyn PlatformWindowService,
    ) {
        let tab = item.id().clone();
        // Reparenting back into the window the surface just left cannot fail
        // on any real platform; log rather than lose the tab.
        if !item.surface_mut().reparent(self.handle) {
            tracing::warn!(host = %self.id, tab = %tab, "Surface refused to return to its window");
        }
        self.insert_item(item, index.min(self.strip.len()));
        if self.active.is_none() {
            self.activate(&tab, platform);
        }
    }

    /// Close the window if its strip is empty
    pub fn close_if_empty(&mut self, platform: &mut dyn PlatformWindowService) {
        if self.strip.is_empty() && !self.is_closed() {
            self.close(CloseReason::LastTabDetached, platform);
        }
    }

    /// Position of a tab in the strip
    pub fn position_of(&self, tab: &TabId) -> Option<usize> {
        self.index_of(tab)
    }

    /// Make `tab` the visible content and refresh navigation state
    pub fn change_active_tab(&mut self, tab: &TabId, platform: &mut dyn PlatformWindowService) -> Result<()> {
        self.ensure_open()?;
        if !self.contains(tab) {
            return Err(violation(TabError::TabNotInHost {
                tab: tab.clone(),
                host: self.id,
            }));
        }
        if self.index_of(tab).is_some_and(|index| self.strip[index].hidden) {
            return Err(TabError::TabDragged(tab.clone()));
        }
        self.activate(tab, platform);
        Ok(())
    }

    fn activate(&mut self, tab: &TabId, platform: &mut dyn PlatformWindowService) {
        if let Some(previous) = self.active.take() {
            if &previous != tab {
                if let Some(item) = self.content.get_mut(&previous) {
                    item.surface_mut().set_visible(false);
                }
            }
        }
        if let Some(item) = self.content.get_mut(tab) {
            item.surface_mut().set_visible(true);
            self.active = Some(tab.clone());
        }
        self.refresh_nav(platform);
    }

    /// Pick a visible entry next to `index`, previous first, then next.
    /// `still_present` says whether the entry at `index` is still in the strip.
    fn neighbor_of(&self, index: usize, still_present: bool) -> Option<TabId> {
        let visible = |i: usize| self.strip.get(i).filter(|entry| !entry.hidden);
        let after = if still_present { index + 1 } else { index };
        let before = (0..index).rev().find_map(|i| visible(i).map(|e| e.tab.clone()));
        before.or_else(|| (after..self.strip.len()).find_map(|i| visible(i).map(|e| e.tab.clone())))
    }

    fn refresh_nav(&mut self, platform: &mut dyn PlatformWindowService) {
        let (nav, title) = match self.active_item() {
            Some(item) => (
                NavState {
                    url: item.url().to_string(),
                    can_go_back: item.can_go_back(),
                    can_go_forward: item.can_go_forward(),
                    loading: item.is_loading(),
                },
                item.display_title().to_string(),
            ),
            None => (NavState::default(), String::new()),
        };
        self.nav = nav;
        if !self.is_closed() {
            platform.set_title(self.handle, &title);
        }
    }

    fn insert_item(&mut self, mut item: TabContentItem, index: usize) {
        let tab = item.id().clone();
        item.set_owner(self.id);
        let entry = StripEntry::new(tab.clone(), item.display_title(), &self.strip_config);
        self.strip.insert(index, entry);
        self.content.insert(tab, item);
    }

    /// Apply a content-surface callback to one of this window's tabs
    pub fn apply_surface_event(
        &mut self,
        tab: &TabId,
        event: SurfaceEvent,
        platform: &mut dyn PlatformWindowService,
    ) -> bool {
        let Some(item) = self.content.get_mut(tab) else {
            return false;
        };
        if item.apply_event(event) {
            let label = item.display_title().to_string();
            if let Some(index) = self.index_of(tab) {
                self.strip[index].set_label(&label, &self.strip_config);
            }
        }
        if self.active.as_ref() == Some(tab) {
            self.refresh_nav(platform);
        }
        true
    }

    /// Run `action` on the active tab's surface, then refresh navigation state
    pub fn with_active_surface(
        &mut self,
        platform: &mut dyn PlatformWindowService,
        action: impl FnOnce(&mut dyn ContentSurface),
    ) -> bool {
        let Some(tab) = self.active.clone() else {
            return false;
        };
        let Some(item) = self.content.get_mut(&tab) else {
            return false;
        };
        action(item.surface_mut());
        self.refresh_nav(platform);
        true
    }

    /// Screen rectangles of the visible strip entries
    pub fn strip_layout(&self, window_rect: Rect) -> Vec<(TabId, Rect)> {
        strip::layout(window_rect, &self.strip, &self.strip_config)
    }

    /// The visible entry under `point`, with its rectangle
    pub fn tab_at(&self, point: Point, window_rect: Rect) -> Option<(TabId, Rect)> {
        self.strip_layout(window_rect)
            .into_iter()
            .find(|(_, rect)| rect.contains(point))
    }

    /// Record a primary-button press on the strip
    pub fn press(&mut self, point: Point) {
        self.pointer = PointerTrack {
            button_down: true,
            dragging: false,
            last_point: point,
        };
    }

    pub fn track_pointer(&mut self, point: Point) {
        self.pointer.last_point = point;
    }

    pub fn reset_pointer(&mut self) {
        self.pointer = PointerTrack::default();
    }

    /// Hide a tab that is being dragged out. Activation moves to a visible
    /// neighbour; with no visible tab left the window is hidden.
    pub fn begin_drag_out(&mut self, tab: &TabId, platform: &mut dyn PlatformWindowService) -> Result<()> {
        self.ensure_open()?;
        let Some(index) = self.index_of(tab) else {
            return Err(violation(TabError::TabNotInHost {
                tab: tab.clone(),
                host: self.id,
            }));
        };
        self.pointer.dragging = true;
        let entry = &mut self.strip[index];
        entry.hidden = true;
        entry.fade.fade_out();
        if let Some(item) = self.content.get_mut(tab) {
            item.surface_mut().set_visible(false);
        }
        if self.active.as_ref() == Some(tab) {
            self.active = None;
            match self.neighbor_of(index, true) {
                Some(next) => self.activate(&next, platform),
                None => self.refresh_nav(platform),
            }
        }
        if self.visible_tab_count() == 0 {
            platform.show_window(self.handle, ShowMode::Hide);
            self.visible = false;
            debug!(host = %self.id, "Hid window with no visible tabs");
        }
        Ok(())
    }

    /// Bring a dragged-out tab back: fade it in, select it, re-show the window
    pub fn cancel_drag_out(&mut self, tab: &TabId, platform: &mut dyn PlatformWindowService) {
        if let Some(index) = self.index_of(tab) {
            let entry = &mut self.strip[index];
            entry.hidden = false;
            entry.fade.fade_in();
            self.activate(tab, platform);
        }
        if !self.visible && !self.is_closed() {
            platform.show_window(self.handle, ShowMode::Show);
            self.visible = true;
        }
        self.reset_pointer();
    }

    /// A tab dragged out of this window landed elsewhere
    ///
    /// A window hidden for the drag that still holds tabs comes back.
    pub fn on_drag_succeeded(&mut self, platform: &mut dyn PlatformWindowService) {
        self.reset_pointer();
        self.close_if_empty(platform);
        if self.is_closed() || self.visible || self.visible_tab_count() == 0 {
            return;
        }
        if self.active.is_none() {
            if let Some(next) = self.neighbor_of(0, false) {
                self.activate(&next, platform);
            }
        }
        self.show(platform);
    }

    /// Advance entry fades. Returns true while any is running.
    pub fn tick(&mut self, dt: Duration) -> bool {
        let duration = self.fade_duration;
        self.strip
            .iter_mut()
            .fold(false, |running, entry| entry.fade.advance(dt, duration) || running)
    }

    /// User close: every tab is shut down. Returns the closed tabs.
    pub fn close_by_user(&mut self, platform: &mut dyn PlatformWindowService) -> Vec<(TabId, ItemKey)> {
        let closed: Vec<(TabId, ItemKey)> = self
            .strip
            .drain(..)
            .filter_map(|entry| self.content.remove(&entry.tab))
            .map(|item| {
                let closed = (item.id().clone(), item.key());
                item.shutdown();
                closed
            })
            .collect();
        self.active = None;
        self.close(CloseReason::User, platform);
        closed
    }

    fn close(&mut self, reason: CloseReason, platform: &mut dyn PlatformWindowService) {
        if self.is_closed() {
            return;
        }
        platform.destroy_window(self.handle);
        self.closed = Some(reason);
        self.visible = false;
        self.merge_target = false;
        self.nav = NavState::default();
        self.reset_pointer();
        // Kill liveness so queued tasks for this window are dropped
        self.liveness = Liveness::new();
        info!(host = %self.id, ?reason, "Closed host window");
    }
}

impl TabHost for TabHostWindow {
    fn host_id(&self) -> HostId {
        self.id
    }

    fn window(&self) -> WindowHandle {
        self.handle
    }

    fn accepts_tab(&self, tab: &TabId) -> bool {
        !self.is_closed() && !self.contains(tab)
    }

    /// Insert an item created by another window. Favicons are requested again
    /// since one may have been delivered while the item was in flight.
    fn attach_tab(
        &mut self,
        mut item: TabContentItem,
        platform: &mut dyn PlatformWindowService,
    ) -> std::result::Result<(), AttachError> {
        if let Err(error) = self.ensure_open() {
            return Err(AttachError { error, item });
        }
        if self.contains(item.id()) {
            let error = violation(TabError::DuplicateTab(item.id().clone()));
            return Err(AttachError { error, item });
        }
        if !item.surface_mut().reparent(self.handle) {
            let error = TabError::Reparent(item.id().clone());
            return Err(AttachError { error, item });
        }
        let tab = item.id().clone();
        item.surface_mut().request_favicon();
        self.insert_item(item, self.strip.len());
        self.activate(&tab, platform);
        debug!(host = %self.id, tab = %tab, "Attached tab");
        Ok(())
    }

    fn set_merge_target(&mut self, on: bool) {
        self.merge_target = on && !self.is_closed();
    }
}
