//! Collaborators the tab manager drives

use crate::config::Config;
use crate::core::platform::PlatformWindowService;
use crate::core::surface::{SurfaceEventSink, SurfaceFactory};
use crate::core::TabId;

/// Builds the event sink handed to each new surface
pub type SinkFactory = Box<dyn Fn(TabId) -> SurfaceEventSink>;

/// Platform, content engine and configuration, borrowed by every operation
pub struct Services {
    pub platform: Box<dyn PlatformWindowService>,
    pub surfaces: Box<dyn SurfaceFactory>,
    pub config: Config,
    pub(crate) sinks: SinkFactory,
}

impl Services {
    pub fn new(
        platform: Box<dyn PlatformWindowService>,
        surfaces: Box<dyn SurfaceFactory>,
        config: Config,
    ) -> Self {
        Self {
            platform,
            surfaces,
            config,
            sinks: Box::new(SurfaceEventSink::discard),
        }
    }

    pub(crate) fn sink_for(&self, tab: &TabId) -> SurfaceEventSink {
        (self.sinks)(tab.clone())
    }
}
