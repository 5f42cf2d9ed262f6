//! TabContext - the process-wide tab manager
//!
//! One context is constructed explicitly at startup and lives on the UI
//! thread. It initialises itself when the first tab is created and asks the
//! platform to quit once the last tab is gone. It is deliberately not `Send`;
//! other threads reach it with a [`ContextHandle`].

use std::time::Duration;

use tracing::{debug, info, warn};

use super::drag::{DragCoordinator, DragOutcome};
use super::registry::{BulkReport, RegistryStatus, TabRegistry};
use super::services::{Services, SinkFactory};
use crate::config::Config;
use crate::core::dispatch::{LivenessToken, UiDispatcher, UiHandle, UiTask};
use crate::core::platform::PlatformWindowService;
use crate::core::surface::{ContentSurface, SurfaceEvent, SurfaceEventSink, SurfaceFactory};
use crate::core::{HostId, Point, Result, TabError, TabId};

/// Lifecycle of the context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    /// No tab has been created yet
    Uninitialized,
    Running,
    /// The last tab closed and quit was requested
    Finished,
}

/// Owner of every window, tab and the drag session
pub struct TabContext {
    services: Services,
    registry: TabRegistry,
    drag: DragCoordinator,
    dispatcher: UiDispatcher<TabContext>,
    state: ContextState,
    next_tab: u64,
}

impl TabContext {
    /// Build a context bound to the calling thread
    pub fn new(
        platform: Box<dyn PlatformWindowService>,
        surfaces: Box<dyn SurfaceFactory>,
        config: Config,
    ) -> Self {
        let merge_mode = config.merge_mode;
        let dispatcher = UiDispatcher::new();
        let mut services = Services::new(platform, surfaces, config);
        services.sinks = event_sinks(dispatcher.handle());
        Self {
            services,
            registry: TabRegistry::new(merge_mode),
            drag: DragCoordinator::new(),
            dispatcher,
            state: ContextState::Uninitialized,
            next_tab: 0,
        }
    }

    pub fn state(&self) -> ContextState {
        self.state
    }

    pub fn registry(&self) -> &TabRegistry {
        &self.registry
    }

    pub fn drag(&self) -> &DragCoordinator {
        &self.drag
    }

    pub fn config(&self) -> &Config {
        &self.services.config
    }

    pub fn platform(&self) -> &dyn PlatformWindowService {
        self.services.platform.as_ref()
    }

    pub fn merge_mode(&self) -> bool {
        self.registry.merge_mode()
    }

    pub fn handle(&self) -> ContextHandle {
        ContextHandle {
            ui: self.dispatcher.handle(),
        }
    }

    /// `Send` reference to a window for tasks posted from other threads
    pub fn host_ref(&self, host: HostId) -> Option<HostRef> {
        self.registry.host(host).map(|window| HostRef {
            id: host,
            token: window.liveness(),
        })
    }

    /// Sink that delivers events for `tab` to this context, for engines
    /// created outside the surface factory
    pub fn event_sink(&self, tab: &TabId) -> SurfaceEventSink {
        self.services.sink_for(tab)
    }

    /// Run every task posted so far. Returns how many actually ran.
    pub fn run_pending(&mut self) -> usize {
        let tasks = self.dispatcher.take_pending();
        let mut ran = 0;
        for task in tasks {
            if task.run(self) {
                ran += 1;
            }
        }
        ran
    }

    fn next_tab_id(&mut self) -> TabId {
        loop {
            self.next_tab += 1;
            let id = TabId::new(format!("tab-{}", self.next_tab));
            if self.registry.entry(&id).is_none() {
                return id;
            }
        }
    }

    /// Open a tab on `url` (the home page when empty). With merge mode on
    /// it joins the first window, otherwise it gets a window of its own.
    pub fn open_tab(&mut self, url: &str) -> Result<TabId> {
        let tab = self.next_tab_id();
        let url = if url.is_empty() {
            self.services.config.home_url.clone()
        } else {
            url.to_string()
        };
        let host = if self.registry.merge_mode() {
            self.registry.first_host()
        } else {
            None
        };
        self.create_box(host, tab.clone(), &url)?;
        Ok(tab)
    }

    /// Create a tab with an explicit id, in `host` or in a new window
    pub fn create_box(&mut self, host: Option<HostId>, tab: TabId, hint: &str) -> Result<HostId> {
        self.cancel_drag();
        let host = self.registry.create_box(host, tab, hint, &mut self.services)?;
        if self.state == ContextState::Uninitialized {
            self.state = ContextState::Running;
            info!("Tab manager initialised");
        }
        Ok(host)
    }

    pub fn close_tab(&mut self, tab: &TabId) -> Result<()> {
        self.cancel_drag();
        let status = self.registry.close_tab(tab, &mut self.services)?;
        self.after_removal(status);
        Ok(())
    }

    /// Close a whole window with every tab in it
    pub fn close_window(&mut self, host: HostId) -> Result<()> {
        self.cancel_drag();
        let status = self.registry.close_window(host, &mut self.services)?;
        self.after_removal(status);
        Ok(())
    }

    fn after_removal(&mut self, status: RegistryStatus) {
        if status == RegistryStatus::Empty && self.state != ContextState::Finished {
            self.state = ContextState::Finished;
            info!("Last tab closed, quitting");
            self.services.platform.request_quit();
        }
    }

    pub fn change_active_tab(&mut self, tab: &TabId) -> Result<()> {
        self.cancel_drag();
        let host = self
            .registry
            .locate(tab)
            .ok_or_else(|| TabError::UnknownTab(tab.clone()))?;
        let window = self.registry.host_mut(host).ok_or(TabError::UnknownHost(host))?;
        window.change_active_tab(tab, self.services.platform.as_mut())
    }

    pub fn move_tab(&mut self, tab: &TabId, target: HostId) -> Result<()> {
        self.cancel_drag();
        self.registry.move_tab(tab, target, &mut self.services)?;
        if let Some(window) = self.registry.host_mut(target) {
            window.show(self.services.platform.as_mut());
        }
        Ok(())
    }

    /// Switch merge mode; a drag in progress is cancelled first
    pub fn set_merge_mode(&mut self, enabled: bool) -> BulkReport {
        self.cancel_drag();
        let report = self.registry.set_merge_mode(enabled, &mut self.services);
        debug_assert!(self.registry.is_consistent());
        report
    }

    pub fn pointer_down(&mut self, point: Point) -> DragOutcome {
        self.drag.pointer_down(point, &mut self.registry, &mut self.services)
    }

    pub fn pointer_move(&mut self, point: Point) -> DragOutcome {
        self.drag.pointer_move(point, &mut self.registry, &mut self.services)
    }

    pub fn pointer_up(&mut self, point: Point) -> DragOutcome {
        let outcome = self.drag.pointer_up(point, &mut self.registry, &mut self.services);
        debug_assert!(self.registry.is_consistent());
        outcome
    }

    pub fn cancel_drag(&mut self) -> DragOutcome {
        self.drag.cancel(&mut self.registry, &mut self.services)
    }

    /// The platform took pointer capture away mid-gesture
    pub fn capture_lost(&mut self) -> DragOutcome {
        debug!(phase = ?self.drag.phase(), "Pointer capture lost");
        self.cancel_drag()
    }

    /// Apply an event reported by a tab's surface. Events for tabs that are
    /// gone are dropped.
    pub fn apply_surface_event(&mut self, tab: &TabId, event: SurfaceEvent) -> bool {
        let Some(host) = self.registry.locate(tab) else {
            debug!(tab = %tab, "Dropping event for a closed tab");
            return false;
        };
        match self.registry.host_mut(host) {
            Some(window) => window.apply_surface_event(tab, event, self.services.platform.as_mut()),
            None => false,
        }
    }

    pub fn navigate(&mut self, host: HostId, url: &str) -> bool {
        let url = url.to_string();
        self.on_active_surface(host, move |surface| surface.navigate(&url))
    }

    pub fn go_back(&mut self, host: HostId) -> bool {
        self.on_active_surface(host, |surface| surface.go_back())
    }

    pub fn go_forward(&mut self, host: HostId) -> bool {
        self.on_active_surface(host, |surface| surface.go_forward())
    }

    pub fn refresh(&mut self, host: HostId) -> bool {
        self.on_active_surface(host, |surface| surface.refresh())
    }

    pub fn stop(&mut self, host: HostId) -> bool {
        self.on_active_surface(host, |surface| surface.stop())
    }

    fn on_active_surface(&mut self, host: HostId, action: impl FnOnce(&mut dyn ContentSurface)) -> bool {
        match self.registry.host_mut(host) {
            Some(window) => window.with_active_surface(self.services.platform.as_mut(), action),
            None => {
                warn!(host = %host, "Navigation on a missing window");
                false
            }
        }
    }

    /// Advance strip fades. Returns true while an animation is running.
    pub fn tick(&mut self, dt: Duration) -> bool {
        self.registry
            .host_ids()
            .into_iter()
            .filter_map(|id| self.registry.host_mut(id).map(|window| window.tick(dt)))
            .fold(false, |running, ticked| running || ticked)
    }
}

/// Event sinks that post each surface event to the UI thread
fn event_sinks(ui: UiHandle<TabContext>) -> SinkFactory {
    Box::new(move |tab| {
        let ui = ui.clone();
        SurfaceEventSink::new(tab, move |tab, event| {
            ui.post(UiTask::new("surface-event", move |ctx: &mut TabContext| {
                ctx.apply_surface_event(&tab, event);
            }));
        })
    })
}

/// A window reference that can cross threads
#[derive(Debug, Clone)]
pub struct HostRef {
    pub id: HostId,
    token: LivenessToken,
}

impl HostRef {
    pub fn is_alive(&self) -> bool {
        self.token.is_alive()
    }
}

/// `Send` access to the context from any thread. Requests run in the order
/// one handle posted them, the next time the UI thread drains its queue.
#[derive(Clone)]
pub struct ContextHandle {
    ui: UiHandle<TabContext>,
}

impl ContextHandle {
    /// Run an arbitrary closure on the UI thread
    pub fn run(&self, label: &'static str, f: impl FnOnce(&mut TabContext) + Send + 'static) -> bool {
        self.ui.post(UiTask::new(label, f))
    }

    /// Run a closure against a window, skipped if the window has closed
    pub fn run_on(
        &self,
        host: &HostRef,
        label: &'static str,
        f: impl FnOnce(&mut TabContext, HostId) + Send + 'static,
    ) -> bool {
        let id = host.id;
        self.ui
            .post(UiTask::guarded(label, host.token.clone(), move |ctx: &mut TabContext| f(ctx, id)))
    }

    pub fn open_tab(&self, url: impl Into<String>) -> bool {
        let url = url.into();
        self.run("open-tab", move |ctx| {
            if let Err(e) = ctx.open_tab(&url) {
                warn!(url = %url, error = %e, "Queued tab open failed");
            }
        })
    }

    pub fn close_tab(&self, tab: TabId) -> bool {
        self.run("close-tab", move |ctx| {
            if ctx.registry().entry(&tab).is_none() {
                debug!(tab = %tab, "Queued close for a tab already gone");
                return;
            }
            if let Err(e) = ctx.close_tab(&tab) {
                warn!(tab = %tab, error = %e, "Queued tab close failed");
            }
        })
    }

    pub fn activate_tab(&self, tab: TabId) -> bool {
        self.run("activate-tab", move |ctx| {
            if let Err(e) = ctx.change_active_tab(&tab) {
                debug!(tab = %tab, error = %e, "Queued activation skipped");
            }
        })
    }

    pub fn set_merge_mode(&self, enabled: bool) -> bool {
        self.run("merge-mode", move |ctx| {
            ctx.set_merge_mode(enabled);
        })
    }

    pub fn navigate(&self, host: &HostRef, url: impl Into<String>) -> bool {
        let url = url.into();
        self.run_on(host, "navigate", move |ctx, id| {
            ctx.navigate(id, &url);
        })
    }
}
