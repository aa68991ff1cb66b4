use glam::Vec2;
use physview_common::Viewport;
use physview_input::InputState;

use crate::clock::{FpsCounter, FrameClock};

/// Per-frame state shared between the window layer and the orchestrator.
///
/// Created once at startup. Event handlers write input and size into it;
/// each tick reads them and leaves behind work for the window layer.
#[derive(Debug, Clone)]
pub struct FrameContext {
    pub clock: FrameClock,
    pub fps: FpsCounter,
    pub input: InputState,
    pub viewport: Viewport,
    /// Ticks that actually ran.
    pub tick: u64,
    /// Where the window layer should warp the pointer after this tick.
    pub pointer_recenter: Option<Vec2>,
}

impl FrameContext {
    pub fn new(max_dt: f32, viewport: Viewport) -> Self {
        Self {
            clock: FrameClock::new(max_dt),
            fps: FpsCounter::new(),
            input: InputState::new(),
            viewport,
            tick: 0,
            pointer_recenter: None,
        }
    }

    /// Record a new window size. Zero extents become 1.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = Viewport::new(width, height);
    }

    pub fn take_pointer_recenter(&mut self) -> Option<Vec2> {
        self.pointer_recenter.take()
    }
}
