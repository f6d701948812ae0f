use tokio::time::Instant;

/// Extrapolates the playback position between player polls.
///
/// The anchor is the last observed position; while playing, elapsed monotonic
/// time since the anchor is added on top.
#[derive(Debug, PartialEq, Default)]
pub struct PlaybackTimer {
    /// Anchor position in milliseconds, never negative.
    anchor_ms: i64,
    /// Monotonic instant corresponding to `anchor_ms`; `None` while paused.
    anchor_instant: Option<Instant>,
}

impl PlaybackTimer {
    /// Move the anchor without starting the clock.
    pub fn reset(&mut self, position_ms: i64) {
        self.anchor_ms = sanitize_position(position_ms);
        self.anchor_instant = None;
    }

    /// Record an observed position and restart the monotonic anchor from now,
    /// so estimates written back here are not counted twice.
    pub fn set_position(&mut self, position_ms: i64) {
        self.anchor_ms = sanitize_position(position_ms);
        self.anchor_instant = Some(Instant::now());
    }

    pub fn mark_playing(&mut self) {
        if self.anchor_instant.is_none() {
            self.anchor_instant = Some(Instant::now());
        }
    }

    /// Freeze the estimate at the current point.
    pub fn mark_paused(&mut self) {
        self.anchor_ms = self.estimate();
        self.anchor_instant = None;
    }

    pub fn is_running(&self) -> bool {
        self.anchor_instant.is_some()
    }

    pub fn estimate(&self) -> i64 {
        match self.anchor_instant {
            Some(inst) => {
                let elapsed = i64::try_from(inst.elapsed().as_millis()).unwrap_or(i64::MAX);
                self.anchor_ms.saturating_add(elapsed)
            }
            None => self.anchor_ms,
        }
    }
}

pub fn sanitize_position(p: i64) -> i64 {
    p.max(0)
}
