use std::time::{Duration, Instant};

/// Aggregated timings for one reporting window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatsReport {
    pub fps: f32,
    pub mean_frame_ms: f32,
    pub frames: u32,
}

/// Frame timing counter. Measures how long each tick takes between
/// [`FrameStats::begin`] and [`FrameStats::end`] and logs a summary once per
/// reporting interval.
#[derive(Debug, Clone)]
pub struct FrameStats {
    interval: Duration,
    window_start: Option<Instant>,
    frame_start: Option<Instant>,
    frames: u32,
    busy: Duration,
    last_report: Option<StatsReport>,
}

impl FrameStats {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
            window_start: None,
            frame_start: None,
            frames: 0,
            busy: Duration::ZERO,
            last_report: None,
        }
    }

    pub fn begin(&mut self) {
        self.begin_at(Instant::now());
    }

    pub fn end(&mut self, frame: u64) {
        if let Some(report) = self.end_at(Instant::now()) {
            tracing::debug!(
                fps = report.fps.round(),
                mean_frame_ms = report.mean_frame_ms,
                frame,
                "render stats"
            );
        }
    }

    pub fn last_report(&self) -> Option<StatsReport> {
        self.last_report
    }

    fn begin_at(&mut self, now: Instant) {
        self.window_start.get_or_insert(now);
        self.frame_start = Some(now);
    }

    fn end_at(&mut self, now: Instant) -> Option<StatsReport> {
        let start = self.frame_start.take()?;
        self.busy += now.saturating_duration_since(start);
        self.frames += 1;

        let window_start = *self.window_start.get_or_insert(start);
        let elapsed = now.saturating_duration_since(window_start);
        if elapsed < self.interval {
            return None;
        }

        let report = StatsReport {
            fps: self.frames as f32 / elapsed.as_secs_f32(),
            mean_frame_ms: self.busy.as_secs_f32() * 1000.0 / self.frames as f32,
            frames: self.frames,
        };
        self.window_start = Some(now);
        self.frames = 0;
        self.busy = Duration::ZERO;
        self.last_report = Some(report);
        Some(report)
    }
}

impl Default for FrameStats {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}
