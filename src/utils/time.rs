use std::time::{Duration, Instant};

/// Frame timing owned by the draw loop.
///
/// [`tick`](Self::tick) samples the wall clock; [`advance`](Self::advance)
/// steps by a fixed delta for offscreen renders and tests. Both feed the
/// once-per-second frame rate average.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last_update: Instant,
    /// Time since last tick
    pub delta: Duration,
    /// Total elapsed time since creation
    pub elapsed: Duration,
    /// Total number of ticks
    pub frame_count: u64,
    window_frames: u32,
    window_time: Duration,
    fps: Option<f32>,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            last_update: Instant::now(),
            delta: Duration::ZERO,
            elapsed: Duration::ZERO,
            frame_count: 0,
            window_frames: 0,
            window_time: Duration::ZERO,
            fps: None,
        }
    }

    /// Starts a new frame, measuring the delta from the previous one.
    pub fn tick(&mut self) {
        let now = Instant::now();
        let delta = now - self.last_update;
        self.last_update = now;
        self.advance(delta);
    }

    /// Starts a new frame `delta` after the previous one.
    pub fn advance(&mut self, delta: Duration) {
        self.delta = delta;
        self.elapsed += delta;
        self.frame_count += 1;

        self.window_frames += 1;
        self.window_time += delta;
        if self.window_time >= Duration::from_secs(1) {
            self.fps = Some(self.window_frames as f32 / self.window_time.as_secs_f32());
            self.window_frames = 0;
            self.window_time = Duration::ZERO;
        }
    }

    #[must_use]
    pub fn dt_seconds(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    /// Average frame rate over the last full second, once one has passed.
    #[must_use]
    pub fn fps(&self) -> Option<f32> {
        self.fps
    }
}
