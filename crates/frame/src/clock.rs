use std::time::Duration;

/// Clamp a measured frame time. `None` means the tick should be skipped.
pub fn clamp_dt(raw: f32, max_dt: f32) -> Option<f32> {
    if !raw.is_finite() || raw <= 0.0 {
        return None;
    }
    Some(raw.min(max_dt))
}

/// Turns monotonic timestamps into clamped per-tick deltas.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Option<Duration>,
    max_dt: f32,
}

impl FrameClock {
    pub fn new(max_dt: f32) -> Self {
        Self { last: None, max_dt }
    }

    pub fn max_dt(&self) -> f32 {
        self.max_dt
    }

    /// Feed the time since startup. The first sample only primes the clock.
    pub fn advance(&mut self, now: Duration) -> Option<f32> {
        let last = self.last.replace(now)?;
        let raw = now.checked_sub(last).unwrap_or_default().as_secs_f32();
        clamp_dt(raw, self.max_dt)
    }
}

/// Counts frames and reports once a second of simulated time has passed.
#[derive(Debug, Clone, Default)]
pub struct FpsCounter {
    frames: u32,
    seconds: f32,
    last: Option<u32>,
}

impl FpsCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one frame of length `dt`; returns the rate when a report is due.
    pub fn record(&mut self, dt: f32) -> Option<u32> {
        self.frames += 1;
        self.seconds += dt;
        if self.seconds < 1.0 {
            return None;
        }
        let fps = self.frames;
        self.frames = 0;
        self.seconds = 0.0;
        self.last = Some(fps);
        Some(fps)
    }

    /// Most recent report.
    pub fn last(&self) -> Option<u32> {
        self.last
    }
}
