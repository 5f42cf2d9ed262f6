//! TabRegistry - process-wide index of tabs and owner of host windows
//!
//! The registry maps every live tab id to the item instance and the window
//! holding it. It opens host windows on demand, closes them once they are
//! empty, and performs the bulk moves behind merge mode.
//!
//! # Merge and split
//!
//! ```text
//! merge:  [A] [B,C] [D]   ->  [A,B,C,D]
//! split:  [A,B,C,D]       ->  [A] [B] [C] [D]    (new windows cascade
//!                                                 from the screen centre)
//! ```
//!
//! A tab that cannot be moved (window creation or attach failure) stays
//! where it was; the rest of the batch carries on.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, info, warn};

use super::host::{TabHost, TabHostWindow};
use super::services::Services;
use crate::core::error::violation;
use crate::core::{HostId, ItemKey, Point, Rect, Result, TabError, TabId, WindowHandle};

/// Where a registered tab lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryEntry {
    pub key: ItemKey,
    pub host: HostId,
}

/// Whether anything is left after a removal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryStatus {
    Live,
    /// The last tab is gone; the process should quit
    Empty,
}

/// Result of a merge or split
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkReport {
    pub moved: usize,
    pub skipped: usize,
    pub windows_created: usize,
}

/// Id→item index plus the live host windows
#[derive(Default)]
pub struct TabRegistry {
    entries: HashMap<TabId, RegistryEntry>,
    hosts: BTreeMap<HostId, TabHostWindow>,
    merge_mode: bool,
    next_host: u64,
    next_key: u64,
    last_placement: Option<Rect>,
}

impl TabRegistry {
    pub fn new(merge_mode: bool) -> Self {
        Self {
            merge_mode,
            ..Self::default()
        }
    }

    pub fn merge_mode(&self) -> bool {
        self.merge_mode
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, tab: &TabId) -> Option<RegistryEntry> {
        self.entries.get(tab).copied()
    }

    /// Window currently holding `tab`
    pub fn locate(&self, tab: &TabId) -> Option<HostId> {
        self.entries.get(tab).map(|entry| entry.host)
    }

    pub fn host(&self, id: HostId) -> Option<&TabHostWindow> {
        self.hosts.get(&id)
    }

    pub fn host_mut(&mut self, id: HostId) -> Option<&mut TabHostWindow> {
        self.hosts.get_mut(&id)
    }

    /// Live windows in creation order
    pub fn hosts(&self) -> impl Iterator<Item = &TabHostWindow> {
        self.hosts.values()
    }

    pub fn host_ids(&self) -> Vec<HostId> {
        self.hosts.keys().copied().collect()
    }

    pub fn window_count(&self) -> usize {
        self.hosts.len()
    }

    /// First window found, the target of a merge
    pub fn first_host(&self) -> Option<HostId> {
        self.hosts.values().find(|host| !host.is_closed()).map(|host| host.id())
    }

    pub fn host_by_window(&self, window: WindowHandle) -> Option<HostId> {
        self.hosts
            .values()
            .find(|host| host.handle() == window)
            .map(|host| host.id())
    }

    /// The tab-host capability of a platform window, if it has one
    pub fn tab_host_mut(&mut self, window: WindowHandle) -> Option<&mut dyn TabHost> {
        self.hosts
            .values_mut()
            .find(|host| host.handle() == window && !host.is_closed())
            .map(|host| host as &mut dyn TabHost)
    }

    pub(crate) fn allocate_key(&mut self) -> ItemKey {
        self.next_key += 1;
        ItemKey(self.next_key)
    }

    /// Open a hidden host window at `rect`
    pub fn open_host(&mut self, rect: Rect, services: &mut Services) -> Result<HostId> {
        self.next_host += 1;
        let id = HostId(self.next_host);
        let host = TabHostWindow::open(id, rect, &services.config, services.platform.as_mut())?;
        self.hosts.insert(id, host);
        Ok(id)
    }

    /// Destroy a window that never received a tab
    pub fn discard_host(&mut self, id: HostId, services: &mut Services) {
        if let Some(host) = self.hosts.get(&id) {
            if host.tab_count() == 0 {
                services.platform.destroy_window(host.handle());
                self.hosts.remove(&id);
                debug!(host = %id, "Discarded empty host window");
            }
        }
    }

    /// Drop windows that closed themselves
    pub fn prune_closed(&mut self) {
        self.hosts.retain(|_, host| !host.is_closed());
    }

    /// Where the next stand-alone window goes: centred first, then cascading
    fn next_placement(&mut self, services: &Services) -> Rect {
        let rect = cascade(self.last_placement, services);
        self.last_placement = Some(rect);
        rect
    }

    /// Create a tab in `host`, or in a new window when `host` is `None`.
    /// Returns the window holding the new tab.
    pub fn create_box(
        &mut self,
        host: Option<HostId>,
        tab: TabId,
        hint: &str,
        services: &mut Services,
    ) -> Result<HostId> {
        if tab.is_empty() {
            return Err(TabError::EmptyTabId);
        }
        if self.entries.contains_key(&tab) {
            return Err(violation(TabError::DuplicateTab(tab)));
        }
        let (host_id, created) = match host {
            Some(id) => match self.hosts.get(&id) {
                Some(existing) if !existing.is_closed() => (id, false),
                Some(_) => return Err(TabError::HostClosed(id)),
                None => return Err(TabError::UnknownHost(id)),
            },
            None => {
                let rect = self.next_placement(services);
                (self.open_host(rect, services)?, true)
            }
        };

        let sink = services.sink_for(&tab);
        let surface = match services.surfaces.create(&tab, sink) {
            Ok(surface) => surface,
            Err(e) => {
                if created {
                    self.discard_host(host_id, services);
                }
                return Err(e);
            }
        };

        let key = self.allocate_key();
        let window = self.hosts.get_mut(&host_id).ok_or(TabError::UnknownHost(host_id))?;
        if let Err(e) = window.create_tab(tab.clone(), key, hint, surface, services.platform.as_mut()) {
            if created {
                self.discard_host(host_id, services);
            }
            return Err(e);
        }
        if created {
            window.show(services.platform.as_mut());
        }

        self.entries.insert(tab.clone(), RegistryEntry { key, host: host_id });
        info!(tab = %tab, host = %host_id, total = self.entries.len(), "Registered tab");
        Ok(host_id)
    }

    /// Unregister a tab whose surface has been shut down. With `expected`,
    /// the registered instance must be that item.
    pub fn remove_box(&mut self, tab: &TabId, expected: Option<ItemKey>) -> Result<RegistryStatus> {
        let Some(entry) = self.entries.get(tab) else {
            return Err(violation(TabError::UnknownTab(tab.clone())));
        };
        if let Some(key) = expected {
            if entry.key != key {
                return Err(violation(TabError::RegistryMismatch(tab.clone())));
            }
        }
        self.entries.remove(tab);
        debug!(tab = %tab, remaining = self.entries.len(), "Unregistered tab");
        if self.entries.is_empty() {
            info!("Registry empty");
            Ok(RegistryStatus::Empty)
        } else {
            Ok(RegistryStatus::Live)
        }
    }

    /// Close a tab wherever it lives
    pub fn close_tab(&mut self, tab: &TabId, services: &mut Services) -> Result<RegistryStatus> {
        let host_id = self
            .locate(tab)
            .ok_or_else(|| violation(TabError::UnknownTab(tab.clone())))?;
        let host = self
            .hosts
            .get_mut(&host_id)
            .ok_or_else(|| violation(TabError::RegistryMismatch(tab.clone())))?;
        let key = host.close_tab(tab, services.platform.as_mut())?;
        self.prune_closed();
        self.remove_box(tab, Some(key))
    }

    /// User close of a whole window
    pub fn close_window(&mut self, host: HostId, services: &mut Services) -> Result<RegistryStatus> {
        let window = self.hosts.get_mut(&host).ok_or(TabError::UnknownHost(host))?;
        let closed = window.close_by_user(services.platform.as_mut());
        self.prune_closed();
        let mut status = if self.entries.is_empty() {
            RegistryStatus::Empty
        } else {
            RegistryStatus::Live
        };
        for (tab, key) in closed {
            status = self.remove_box(&tab, Some(key))?;
        }
        Ok(status)
    }

    /// Move a tab into another window (Detach + Attach). On failure the tab
    /// stays in its window at its old position.
    pub fn move_tab(&mut self, tab: &TabId, target: HostId, services: &mut Services) -> Result<()> {
        let origin = self
            .locate(tab)
            .ok_or_else(|| violation(TabError::UnknownTab(tab.clone())))?;
        if origin == target {
            return Ok(());
        }
        match self.hosts.get(&target) {
            Some(window) if window.accepts_tab(tab) => {}
            Some(window) if window.is_closed() => return Err(TabError::HostClosed(target)),
            Some(_) => return Err(violation(TabError::DuplicateTab(tab.clone()))),
            None => return Err(TabError::UnknownHost(target)),
        }

        let platform = services.platform.as_mut();
        let origin_window = self
            .hosts
            .get_mut(&origin)
            .ok_or_else(|| violation(TabError::RegistryMismatch(tab.clone())))?;
        let index = origin_window.position_of(tab).unwrap_or(0);
        let item = origin_window.take_tab(tab, platform)?;

        let target_window = self.hosts.get_mut(&target).ok_or(TabError::UnknownHost(target))?;
        let result = match target_window.attach_tab(item, platform) {
            Ok(()) => Ok(()),
            Err(failed) => {
                warn!(tab = %tab, from = %origin, to = %target, error = %failed.error, "Attach failed, tab stays");
                if let Some(origin_window) = self.hosts.get_mut(&origin) {
                    origin_window.restore_tab(failed.item, index, platform);
                }
                Err(failed.error)
            }
        };

        if let Some(origin_window) = self.hosts.get_mut(&origin) {
            origin_window.close_if_empty(platform);
        }
        self.prune_closed();
        if result.is_ok() {
            if let Some(entry) = self.entries.get_mut(tab) {
                entry.host = target;
            }
            debug!(tab = %tab, from = %origin, to = %target, "Moved tab");
        }
        result
    }

    /// Switch merge mode, merging every tab into the first window or
    /// splitting every window into one window per tab
    pub fn set_merge_mode(&mut self, enabled: bool, services: &mut Services) -> BulkReport {
        if self.merge_mode == enabled {
            return BulkReport::default();
        }
        self.merge_mode = enabled;
        let report = if enabled {
            self.merge_all(services)
        } else {
            self.split_all(services)
        };
        info!(enabled, ?report, windows = self.hosts.len(), "Merge mode changed");
        report
    }

    fn merge_all(&mut self, services: &mut Services) -> BulkReport {
        let mut report = BulkReport::default();
        let Some(target) = self.first_host() else {
            return report;
        };
        for host_id in self.host_ids() {
            if host_id == target {
                continue;
            }
            let tabs = match self.hosts.get(&host_id) {
                Some(host) => host.tab_ids(),
                None => continue,
            };
            for tab in tabs {
                match self.move_tab(&tab, target, services) {
                    Ok(()) => report.moved += 1,
                    Err(_) => report.skipped += 1,
                }
            }
        }
        report
    }

    fn split_all(&mut self, services: &mut Services) -> BulkReport {
        let mut report = BulkReport::default();
        let mut previous: Option<Rect> = None;
        for host_id in self.host_ids() {
            let tabs = match self.hosts.get(&host_id) {
                Some(host) if host.tab_count() > 1 => host.tab_ids(),
                _ => continue,
            };
            for tab in tabs.into_iter().skip(1) {
                let rect = cascade(previous, services);
                let new_host = match self.open_host(rect, services) {
                    Ok(id) => id,
                    Err(e) => {
                        warn!(tab = %tab, error = %e, "Split skipped a tab");
                        report.skipped += 1;
                        continue;
                    }
                };
                previous = Some(rect);
                if self.move_tab(&tab, new_host, services).is_err() {
                    self.discard_host(new_host, services);
                    report.skipped += 1;
                    continue;
                }
                if let Some(window) = self.hosts.get_mut(&new_host) {
                    window.show(services.platform.as_mut());
                }
                report.moved += 1;
                report.windows_created += 1;
            }
        }
        if previous.is_some() {
            self.last_placement = previous;
        }
        report
    }

    /// Check both registry invariants; used by tests and debug assertions
    pub fn is_consistent(&self) -> bool {
        let hosted: usize = self.hosts.values().map(|host| host.tab_count()).sum();
        hosted == self.entries.len()
            && self.hosts.values().all(|host| host.is_consistent())
            && self.entries.iter().all(|(tab, entry)| {
                self.hosts
                    .get(&entry.host)
                    .and_then(|host| host.item(tab))
                    .map_or(false, |item| item.key() == entry.key && item.owner() == Some(entry.host))
            })
    }
}

/// Next rectangle in a cascade: centred on screen first, then stepping
/// diagonally, wrapping to the centre when it would leave the screen
pub(crate) fn cascade(previous: Option<Rect>, services: &Services) -> Rect {
    let screen = services.platform.screen_size();
    let screen_rect = Rect::new(0, 0, screen.width, screen.height);
    let centred = screen_rect.centered(services.config.window.size());
    match previous {
        None => centred,
        Some(prev) => {
            let window = &services.config.window;
            let next = prev.moved_to(Point::new(prev.x + window.cascade_x, prev.y + window.cascade_y));
            if next.right() > screen_rect.right() || next.bottom() > screen_rect.bottom() {
                centred
            } else {
                next
            }
        }
    }
}
