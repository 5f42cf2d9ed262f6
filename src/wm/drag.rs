//! DragCoordinator - dragging tabs out of their window
//!
//! ```text
//!            press on entry            moved past entry extent
//!   Idle ───────────────────▶ ButtonDown ───────────────────▶ Dragging
//!    ▲                            │ release/cancel                │
//!    │                            ▼                               │ release
//!    └──────────────────────── (click)          Dropped ◀─────────┤
//!    ▲                                            │               │ cancel /
//!    └────────────────────────────────────────────┴── Cancelled ◀─┘ capture lost
//! ```
//!
//! On drop the tab lands in the host window under the pointer, or in a new
//! window when the pointer is over empty desktop. A tab that was alone in its
//! window cannot be dropped on empty desktop; that drop counts as a cancel and
//! the hidden window comes back.

use tracing::{debug, info, warn};

use super::host::TabHost;
use super::registry::TabRegistry;
use super::services::Services;
use super::snapshot::SnapshotGenerator;
use crate::config::Config;
use crate::core::error::violation;
use crate::core::platform::{PositionFlags, ShowMode, WindowParams};
use crate::core::{HostId, Point, Rect, Size, TabId, WindowHandle};

/// A press on a strip entry that may turn into a drag
#[derive(Debug, Clone)]
struct Press {
    host: HostId,
    tab: TabId,
    origin: Point,
    entry: Rect,
}

/// State of a drag in progress
#[derive(Debug, Clone)]
pub struct DragSession {
    pub tab: TabId,
    pub origin: HostId,
    pub origin_window: WindowHandle,
    /// Floating preview; missing when the platform could not create it
    pub preview: Option<WindowHandle>,
    /// Host window currently highlighted under the pointer
    pub hover_target: Option<HostId>,
    /// Set once the drop has been resolved onto a window
    pub drop_target: Option<HostId>,
    /// Tabs in the origin window when the drag started
    pub origin_tab_count: usize,
}

#[derive(Debug, Clone, Default)]
enum DragState {
    #[default]
    Idle,
    ButtonDown(Press),
    Dragging(DragSession),
}

/// Public view of the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragPhase {
    Idle,
    ButtonDown,
    Dragging,
}

/// What a pointer event did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragOutcome {
    /// Nothing to do for this event
    Ignored,
    /// A strip entry was pressed and selected
    Pressed { host: HostId, tab: TabId },
    /// Pointer moved without changing state
    Tracking,
    DragStarted { host: HostId, tab: TabId },
    /// Released before the drag threshold
    Clicked { host: HostId, tab: TabId },
    /// Dropped onto another host window
    Moved { tab: TabId, from: HostId, to: HostId },
    /// Dropped on empty desktop; a new window took the tab
    Spawned { tab: TabId, from: HostId, to: HostId },
    /// The tab went back where it came from
    Cancelled { tab: TabId, host: HostId },
}

/// Owns the single drag session of the process
#[derive(Debug, Default)]
pub struct DragCoordinator {
    state: DragState,
}

impl DragCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> DragPhase {
        match self.state {
            DragState::Idle => DragPhase::Idle,
            DragState::ButtonDown(_) => DragPhase::ButtonDown,
            DragState::Dragging(_) => DragPhase::Dragging,
        }
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging(_))
    }

    pub fn session(&self) -> Option<&DragSession> {
        match &self.state {
            DragState::Dragging(session) => Some(session),
            _ => None,
        }
    }

    /// Primary button pressed. Only a press on a strip entry while idle
    /// starts tracking.
    pub fn pointer_down(&mut self, point: Point, registry: &mut TabRegistry, services: &mut Services) -> DragOutcome {
        if !matches!(self.state, DragState::Idle) {
            return DragOutcome::Ignored;
        }
        let platform = services.platform.as_mut();
        let Some(window) = platform.window_under_point(point, &[]) else {
            return DragOutcome::Ignored;
        };
        let Some(host_id) = registry.host_by_window(window) else {
            return DragOutcome::Ignored;
        };
        let Some(rect) = platform.window_rect(window) else {
            return DragOutcome::Ignored;
        };
        let Some(host) = registry.host_mut(host_id) else {
            return DragOutcome::Ignored;
        };
        let Some((tab, entry)) = host.tab_at(point, rect) else {
            return DragOutcome::Ignored;
        };

        host.press(point);
        if host.change_active_tab(&tab, platform).is_err() {
            host.reset_pointer();
            return DragOutcome::Ignored;
        }
        debug!(host = %host_id, tab = %tab, ?point, "Strip entry pressed");
        self.state = DragState::ButtonDown(Press {
            host: host_id,
            tab: tab.clone(),
            origin: point,
            entry,
        });
        DragOutcome::Pressed { host: host_id, tab }
    }

    pub fn pointer_move(&mut self, point: Point, registry: &mut TabRegistry, services: &mut Services) -> DragOutcome {
        match std::mem::take(&mut self.state) {
            DragState::Idle => DragOutcome::Ignored,
            DragState::ButtonDown(press) => {
                if let Some(host) = registry.host_mut(press.host) {
                    host.track_pointer(point);
                }
                // Tearing off takes a move across the strip larger than the entry itself
                let displacement = (point.y - press.origin.y).unsigned_abs();
                if displacement > press.entry.height {
                    self.start_drag(press, point, registry, services)
                } else {
                    self.state = DragState::ButtonDown(press);
                    DragOutcome::Tracking
                }
            }
            DragState::Dragging(mut session) => {
                Self::track_drag(&mut session, point, registry, services);
                self.state = DragState::Dragging(session);
                DragOutcome::Tracking
            }
        }
    }

    pub fn pointer_up(&mut self, point: Point, registry: &mut TabRegistry, services: &mut Services) -> DragOutcome {
        match std::mem::take(&mut self.state) {
            DragState::Idle => DragOutcome::Ignored,
            DragState::ButtonDown(press) => {
                if let Some(host) = registry.host_mut(press.host) {
                    host.reset_pointer();
                }
                DragOutcome::Clicked {
                    host: press.host,
                    tab: press.tab,
                }
            }
            DragState::Dragging(session) => Self::drop_session(session, point, registry, services),
        }
    }

    /// Explicit cancel or loss of pointer capture
    pub fn cancel(&mut self, registry: &mut TabRegistry, services: &mut Services) -> DragOutcome {
        match std::mem::take(&mut self.state) {
            DragState::Idle => DragOutcome::Ignored,
            DragState::ButtonDown(press) => {
                if let Some(host) = registry.host_mut(press.host) {
                    host.reset_pointer();
                }
                DragOutcome::Ignored
            }
            DragState::Dragging(session) => {
                info!(tab = %session.tab, "Drag cancelled");
                Self::clear_hover(&session, registry);
                Self::destroy_preview(&session, services);
                Self::restore_origin(&session, registry, services)
            }
        }
    }

    fn start_drag(
        &mut self,
        press: Press,
        point: Point,
        registry: &mut TabRegistry,
        services: &mut Services,
    ) -> DragOutcome {
        let generator = SnapshotGenerator::new(services.config.drag.preview_size());
        let Some(host) = registry.host_mut(press.host) else {
            return DragOutcome::Ignored;
        };
        let preview_image = host
            .item_mut(&press.tab)
            .and_then(|item| generator.capture(item.surface_mut()));
        let origin_tab_count = host.tab_count();
        let origin_window = host.handle();
        if let Err(e) = host.begin_drag_out(&press.tab, services.platform.as_mut()) {
            warn!(tab = %press.tab, error = %e, "Could not start drag");
            host.reset_pointer();
            return DragOutcome::Ignored;
        }

        let platform = services.platform.as_mut();
        let preview_rect = preview_rect(point, services.config.drag.preview_window_size(), &services.config);
        let preview = platform.create_window(&WindowParams::preview(preview_rect));
        match preview {
            Some(handle) => {
                platform.set_preview_image(handle, preview_image);
                platform.show_window(handle, ShowMode::ShowNoActivate);
            }
            None => warn!(tab = %press.tab, "Dragging without a preview window"),
        }

        info!(tab = %press.tab, host = %press.host, "Drag started");
        self.state = DragState::Dragging(DragSession {
            tab: press.tab.clone(),
            origin: press.host,
            origin_window,
            preview,
            hover_target: None,
            drop_target: None,
            origin_tab_count,
        });
        DragOutcome::DragStarted {
            host: press.host,
            tab: press.tab,
        }
    }

    fn track_drag(session: &mut DragSession, point: Point, registry: &mut TabRegistry, services: &mut Services) {
        let platform = services.platform.as_mut();
        if let Some(preview) = session.preview {
            let rect = preview_rect(point, services.config.drag.preview_window_size(), &services.config);
            platform.set_window_position(preview, rect, PositionFlags::NO_SIZE | PositionFlags::NO_ACTIVATE);
        }
        if let Some(origin) = registry.host_mut(session.origin) {
            origin.track_pointer(point);
        }

        let hovered = Self::host_under(session, point, registry, services);
        if hovered == session.hover_target {
            return;
        }
        Self::clear_hover(session, registry);
        if let Some(target) = hovered {
            if let Some(host) = registry.host_mut(target) {
                let window = host.handle();
                host.set_merge_target(true);
                let rect = services.platform.window_rect(window).unwrap_or_default();
                services.platform.set_window_position(
                    window,
                    rect,
                    PositionFlags::NO_MOVE | PositionFlags::NO_SIZE | PositionFlags::NO_ACTIVATE | PositionFlags::BRING_FORWARD,
                );
                debug!(tab = %session.tab, target = %target, "Merge target under pointer");
            }
        }
        session.hover_target = hovered;
    }

    /// Tab host under the pointer, never the origin or the preview
    fn host_under(
        session: &DragSession,
        point: Point,
        registry: &mut TabRegistry,
        services: &Services,
    ) -> Option<HostId> {
        let mut excluding = vec![session.origin_window];
        excluding.extend(session.preview);
        let window = services.platform.window_under_point(point, &excluding)?;
        let host = registry.tab_host_mut(window)?;
        host.accepts_tab(&session.tab).then(|| host.host_id())
    }

    fn drop_session(
        mut session: DragSession,
        point: Point,
        registry: &mut TabRegistry,
        services: &mut Services,
    ) -> DragOutcome {
        Self::clear_hover(&session, registry);
        session.drop_target = Self::host_under(&session, point, registry, services);
        Self::destroy_preview(&session, services);

        if let Some(target) = session.drop_target {
            return match registry.move_tab(&session.tab, target, services) {
                Ok(()) => {
                    if let Some(origin) = registry.host_mut(session.origin) {
                        origin.on_drag_succeeded(services.platform.as_mut());
                    }
                    registry.prune_closed();
                    info!(tab = %session.tab, from = %session.origin, to = %target, "Tab dropped on window");
                    DragOutcome::Moved {
                        tab: session.tab,
                        from: session.origin,
                        to: target,
                    }
                }
                Err(e) => {
                    violation(e);
                    Self::restore_origin(&session, registry, services)
                }
            };
        }

        if session.origin_tab_count <= 1 {
            debug!(tab = %session.tab, "Lone tab dropped on desktop");
            return Self::restore_origin(&session, registry, services);
        }

        let window = &services.config.window;
        let rect = Rect::from_origin(point.offset(window.spawn_offset_x, window.spawn_offset_y), window.size());
        let spawned = match registry.open_host(rect, services) {
            Ok(id) => id,
            Err(e) => {
                warn!(tab = %session.tab, error = %e, "Could not open a window for the dropped tab");
                return Self::restore_origin(&session, registry, services);
            }
        };
        if let Err(e) = registry.move_tab(&session.tab, spawned, services) {
            violation(e);
            registry.discard_host(spawned, services);
            return Self::restore_origin(&session, registry, services);
        }
        if let Some(host) = registry.host_mut(spawned) {
            host.show(services.platform.as_mut());
        }
        if let Some(origin) = registry.host_mut(session.origin) {
            origin.on_drag_succeeded(services.platform.as_mut());
        }
        info!(tab = %session.tab, from = %session.origin, to = %spawned, "Tab dropped on desktop");
        DragOutcome::Spawned {
            tab: session.tab,
            from: session.origin,
            to: spawned,
        }
    }

    fn clear_hover(session: &DragSession, registry: &mut TabRegistry) {
        if let Some(previous) = session.hover_target {
            if let Some(host) = registry.host_mut(previous) {
                host.set_merge_target(false);
            }
        }
    }

    fn destroy_preview(session: &DragSession, services: &mut Services) {
        if let Some(preview) = session.preview {
            services.platform.destroy_window(preview);
        }
    }

    fn restore_origin(session: &DragSession, registry: &mut TabRegistry, services: &mut Services) -> DragOutcome {
        match registry.host_mut(session.origin) {
            Some(origin) => origin.cancel_drag_out(&session.tab, services.platform.as_mut()),
            None => warn!(tab = %session.tab, host = %session.origin, "Origin window vanished during drag"),
        }
        DragOutcome::Cancelled {
            tab: session.tab.clone(),
            host: session.origin,
        }
    }
}

/// Where the preview window sits for a pointer position
fn preview_rect(point: Point, size: Size, config: &Config) -> Rect {
    let origin = point.offset(config.drag.preview_offset_x, config.drag.preview_offset_y);
    Rect::from_origin(origin, size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::platform::{PlatformWindowService, WindowStyle};
    use crate::wm::testing::{fixture, Fixture};

    /// Two windows side by side: [a, b] at the origin and [c] to the right
    fn two_windows() -> (Fixture, HostId, HostId) {
        let mut fx = fixture();
        let left = fx.ctx.create_box(None, "a".into(), "").unwrap();
        fx.ctx.create_box(Some(left), "b".into(), "").unwrap();
        let right = fx.ctx.create_box(None, "c".into(), "").unwrap();
        fx.place(left, 0, 0);
        fx.place(right, 80, 20);
        (fx, left, right)
    }

    fn tabs(fx: &Fixture, host: HostId) -> Vec<String> {
        fx.ctx
            .registry()
            .host(host)
            .unwrap()
            .tab_ids()
            .iter()
            .map(|tab| tab.to_string())
            .collect()
    }

    fn active(fx: &Fixture, host: HostId) -> Option<TabId> {
        fx.ctx.registry().host(host).unwrap().active_tab().cloned()
    }

    /// Press on `tab` and pull it down far enough to tear it off
    fn start(fx: &mut Fixture, tab: &str) -> Point {
        let press = fx.entry_point(tab);
        assert!(matches!(fx.ctx.pointer_down(press), DragOutcome::Pressed { .. }));
        let pulled = press.offset(0, 3);
        assert!(matches!(fx.ctx.pointer_move(pulled), DragOutcome::DragStarted { .. }));
        pulled
    }

    #[test]
    fn test_click_selects_without_dragging() {
        let (mut fx, left, _) = two_windows();
        let press = fx.entry_point("b");

        assert_eq!(
            fx.ctx.pointer_down(press),
            DragOutcome::Pressed {
                host: left,
                tab: "b".into()
            }
        );
        assert_eq!(active(&fx, left), Some("b".into()));
        assert!(fx.ctx.registry().host(left).unwrap().pointer().button_down);

        // Sideways and small moves stay below the threshold
        assert_eq!(fx.ctx.pointer_move(press.offset(5, 1)), DragOutcome::Tracking);
        assert_eq!(fx.ctx.drag().phase(), DragPhase::ButtonDown);
        assert_eq!(
            fx.ctx.pointer_up(press),
            DragOutcome::Clicked {
                host: left,
                tab: "b".into()
            }
        );
        assert_eq!(fx.ctx.drag().phase(), DragPhase::Idle);
        assert!(!fx.ctx.registry().host(left).unwrap().pointer().button_down);
    }

    #[test]
    fn test_press_outside_strip_is_ignored() {
        let (mut fx, _, _) = two_windows();
        assert_eq!(fx.ctx.pointer_down(Point::new(10, 8)), DragOutcome::Ignored);
        assert_eq!(fx.ctx.pointer_down(Point::new(150, 2)), DragOutcome::Ignored);
        assert_eq!(fx.ctx.pointer_up(Point::new(150, 2)), DragOutcome::Ignored);
    }

    #[test]
    fn test_drag_start_hides_entry_and_shows_preview() {
        let (mut fx, left, _) = two_windows();
        start(&mut fx, "b");

        let session = fx.ctx.drag().session().unwrap().clone();
        assert_eq!(session.tab, TabId::from("b"));
        assert_eq!(session.origin_tab_count, 2);
        assert_eq!(active(&fx, left), Some("a".into()));

        let window = fx.ctx.registry().host(left).unwrap();
        assert_eq!(window.visible_tab_count(), 1);
        assert!(window.is_visible());
        assert!(!fx.probe("b").borrow().visible);

        let preview = fx.desktop.window(session.preview.unwrap()).unwrap();
        assert!(preview.visible);
        assert!(preview.style.contains(WindowStyle::TOPMOST | WindowStyle::INPUT_TRANSPARENT));
        let image = preview.preview.unwrap();
        assert_eq!(image.dimensions(), (400, 300));

        // Only one session at a time
        let other = fx.entry_point("a");
        assert_eq!(fx.ctx.pointer_down(other), DragOutcome::Ignored);
    }

    #[test]
    fn test_drop_on_other_window_moves_tab() {
        // Scenario C
        let (mut fx, left, right) = two_windows();
        start(&mut fx, "a");

        let over_right = Point::new(100, 25);
        fx.ctx.pointer_move(over_right);
        assert!(fx.ctx.registry().host(right).unwrap().is_merge_target());
        assert_eq!(fx.ctx.drag().session().unwrap().hover_target, Some(right));

        assert_eq!(
            fx.ctx.pointer_up(over_right),
            DragOutcome::Moved {
                tab: "a".into(),
                from: left,
                to: right
            }
        );
        assert_eq!(tabs(&fx, left), vec!["b"]);
        assert_eq!(tabs(&fx, right), vec!["c", "a"]);
        assert_eq!(active(&fx, right), Some("a".into()));
        assert_eq!(fx.ctx.registry().locate(&"a".into()), Some(right));
        assert!(!fx.ctx.registry().host(right).unwrap().is_merge_target());
        // Both host windows remain, the preview is gone
        assert_eq!(fx.desktop.window_count(), 2);
        assert_eq!(fx.ctx.drag().phase(), DragPhase::Idle);
        assert!(fx.ctx.registry().is_consistent());
    }

    #[test]
    fn test_drop_lone_tab_on_other_window_closes_origin() {
        let (mut fx, left, right) = two_windows();
        start(&mut fx, "c");
        // The origin had one tab, so it is hidden, not closed
        assert!(!fx.ctx.registry().host(right).unwrap().is_visible());
        assert!(fx.ctx.registry().host(right).unwrap().is_consistent());

        let over_left = Point::new(20, 8);
        fx.ctx.pointer_move(over_left);
        assert_eq!(
            fx.ctx.pointer_up(over_left),
            DragOutcome::Moved {
                tab: "c".into(),
                from: right,
                to: left
            }
        );
        assert!(fx.ctx.registry().host(right).is_none());
        assert_eq!(tabs(&fx, left), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_drop_lone_tab_on_desktop_cancels() {
        // Scenario D
        let (mut fx, _, right) = two_windows();
        start(&mut fx, "c");

        let empty = Point::new(150, 45);
        fx.ctx.pointer_move(empty);
        assert_eq!(
            fx.ctx.pointer_up(empty),
            DragOutcome::Cancelled {
                tab: "c".into(),
                host: right
            }
        );
        let window = fx.ctx.registry().host(right).unwrap();
        assert!(window.is_visible());
        assert!(fx.desktop.window(window.handle()).unwrap().visible);
        assert_eq!(window.visible_tab_count(), 1);
        assert_eq!(active(&fx, right), Some("c".into()));
        assert_eq!(fx.ctx.registry().window_count(), 2);
        assert_eq!(fx.desktop.window_count(), 2);
    }

    #[test]
    fn test_drop_one_of_two_on_desktop_spawns_window() {
        // Scenario E
        let (mut fx, left, _) = two_windows();
        start(&mut fx, "b");

        let empty = Point::new(150, 45);
        let outcome = fx.ctx.pointer_up(empty);
        let DragOutcome::Spawned { tab, from, to } = outcome.clone() else {
            panic!("expected a spawn, got {:?}", outcome);
        };
        assert_eq!((tab.as_str(), from), ("b", left));
        assert_eq!(tabs(&fx, left), vec!["a"]);
        assert_eq!(tabs(&fx, to), vec!["b"]);

        let config = fx.ctx.config().window.clone();
        let window = fx.desktop.window(fx.window_of(to)).unwrap();
        assert!(window.visible);
        assert_eq!(
            window.rect.origin(),
            empty.offset(config.spawn_offset_x, config.spawn_offset_y)
        );
        assert_eq!(fx.desktop.active_window(), Some(window.handle));
        assert_eq!(fx.ctx.registry().window_count(), 3);
        assert!(fx.ctx.registry().is_consistent());
    }

    #[test]
    fn test_spawn_failure_restores_tab() {
        let (mut fx, left, _) = two_windows();
        start(&mut fx, "b");

        fx.desktop.refuse_creations(1);
        assert_eq!(
            fx.ctx.pointer_up(Point::new(150, 45)),
            DragOutcome::Cancelled {
                tab: "b".into(),
                host: left
            }
        );
        assert_eq!(tabs(&fx, left), vec!["a", "b"]);
        assert_eq!(active(&fx, left), Some("b".into()));
        assert_eq!(fx.ctx.registry().window_count(), 2);
    }

    #[test]
    fn test_drag_without_preview_window() {
        let (mut fx, left, right) = two_windows();
        let press = fx.entry_point("a");
        fx.ctx.pointer_down(press);
        fx.desktop.refuse_creations(1);
        fx.ctx.pointer_move(press.offset(0, 4));
        assert!(fx.ctx.drag().session().unwrap().preview.is_none());

        let outcome = fx.ctx.pointer_up(Point::new(100, 25));
        assert_eq!(
            outcome,
            DragOutcome::Moved {
                tab: "a".into(),
                from: left,
                to: right
            }
        );
    }

    #[test]
    fn test_cancel_restores_pre_drag_state() {
        let (mut fx, left, right) = two_windows();
        fx.ctx.create_box(Some(left), "d".into(), "").unwrap();
        fx.ctx.change_active_tab(&"b".into()).unwrap();
        let order = tabs(&fx, left);
        let windows = fx.desktop.window_count();

        start(&mut fx, "b");
        for point in [Point::new(100, 25), Point::new(150, 45), Point::new(20, 8), Point::new(110, 30)] {
            fx.ctx.pointer_move(point);
        }
        assert!(fx.ctx.registry().host(right).unwrap().is_merge_target());

        assert_eq!(
            fx.ctx.cancel_drag(),
            DragOutcome::Cancelled {
                tab: "b".into(),
                host: left
            }
        );
        assert_eq!(tabs(&fx, left), order);
        assert_eq!(active(&fx, left), Some("b".into()));
        assert!(fx.probe("b").borrow().visible);
        assert!(fx.ctx.registry().host(left).unwrap().is_visible());
        assert!(!fx.ctx.registry().host(right).unwrap().is_merge_target());
        assert_eq!(fx.desktop.window_count(), windows);
        assert_eq!(fx.ctx.registry().host(left).unwrap().pointer(), Default::default());
    }

    #[test]
    fn test_capture_lost_on_lone_tab_reshows_window() {
        let (mut fx, _, right) = two_windows();
        start(&mut fx, "c");
        assert!(!fx.desktop.window(fx.window_of(right)).unwrap().visible);

        assert!(matches!(fx.ctx.capture_lost(), DragOutcome::Cancelled { .. }));
        assert!(fx.desktop.window(fx.window_of(right)).unwrap().visible);
        assert_eq!(active(&fx, right), Some("c".into()));

        // Nothing left to cancel
        assert_eq!(fx.ctx.cancel_drag(), DragOutcome::Ignored);
    }

    #[test]
    fn test_merge_mode_change_cancels_drag() {
        let (mut fx, left, _) = two_windows();
        start(&mut fx, "b");

        fx.ctx.set_merge_mode(true);
        assert_eq!(fx.ctx.drag().phase(), DragPhase::Idle);
        assert_eq!(fx.ctx.registry().window_count(), 1);
        assert_eq!(tabs(&fx, left), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_open_tab_in_merge_mode_cancels_drag() {
        let mut fx = fixture();
        fx.ctx.set_merge_mode(true);
        let first = fx.ctx.create_box(None, "a".into(), "").unwrap();
        let second = fx.ctx.create_box(None, "b".into(), "").unwrap();
        fx.place(first, 0, 0);
        fx.place(second, 80, 20);

        start(&mut fx, "a");
        assert!(!fx.ctx.registry().host(first).unwrap().is_visible());

        // The new tab lands in the first window, which is the drag origin
        let opened = fx.ctx.open_tab("https://n.test/").unwrap();
        assert_eq!(fx.ctx.drag().phase(), DragPhase::Idle);
        assert_eq!(tabs(&fx, first), vec!["a".to_string(), opened.to_string()]);
        assert!(fx.ctx.registry().host(first).unwrap().is_visible());
        assert!(fx.desktop.window(fx.window_of(first)).unwrap().visible);

        assert_eq!(fx.ctx.pointer_up(Point::new(100, 25)), DragOutcome::Ignored);
        assert_eq!(tabs(&fx, second), vec!["b"]);
        assert!(fx.ctx.registry().is_consistent());
    }

    #[test]
    fn test_create_box_in_origin_cancels_drag() {
        let (mut fx, left, right) = two_windows();
        start(&mut fx, "c");

        fx.ctx.create_box(Some(right), "d".into(), "").unwrap();
        assert_eq!(fx.ctx.drag().phase(), DragPhase::Idle);
        assert_eq!(tabs(&fx, right), vec!["c", "d"]);
        assert!(fx.ctx.registry().host(right).unwrap().is_visible());
        assert!(fx.desktop.window(fx.window_of(right)).unwrap().visible);

        fx.ctx.pointer_move(Point::new(20, 8));
        assert_eq!(fx.ctx.pointer_up(Point::new(20, 8)), DragOutcome::Ignored);
        assert_eq!(tabs(&fx, left), vec!["a", "b"]);
        assert!(fx.ctx.registry().is_consistent());
    }

    #[test]
    fn test_activating_dragged_tab_cancels_drag() {
        let (mut fx, left, _) = two_windows();
        start(&mut fx, "b");
        assert_eq!(active(&fx, left), Some("a".into()));

        fx.ctx.change_active_tab(&"b".into()).unwrap();
        assert_eq!(fx.ctx.drag().phase(), DragPhase::Idle);
        assert_eq!(active(&fx, left), Some("b".into()));
        let window = fx.ctx.registry().host(left).unwrap();
        assert_eq!(window.visible_tab_count(), 2);
        assert!(window.is_consistent());
    }

    #[test]
    fn test_fade_runs_on_tick() {
        let (mut fx, left, _) = two_windows();
        start(&mut fx, "b");
        assert!(fx.ctx.tick(std::time::Duration::from_millis(10)));
        assert!(!fx.ctx.tick(std::time::Duration::from_secs(1)));

        let window = fx.ctx.registry().host(left).unwrap();
        let entry = window.entries().iter().find(|e| e.tab.as_str() == "b").unwrap();
        assert_eq!(entry.fade.opacity(), 0.0);
    }

    #[test]
    #[cfg_attr(debug_assertions, should_panic)]
    fn test_attach_failure_on_drop_restores_origin() {
        let (mut fx, left, _) = two_windows();
        start(&mut fx, "b");
        fx.probe("b").borrow_mut().refuse_reparent = true;

        let outcome = fx.ctx.pointer_up(Point::new(100, 25));
        assert_eq!(
            outcome,
            DragOutcome::Cancelled {
                tab: "b".into(),
                host: left
            }
        );
        assert_eq!(tabs(&fx, left), vec!["a", "b"]);
    }
}
