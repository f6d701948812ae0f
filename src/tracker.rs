//! Active line tracking against a live playback position.

use crate::lyrics::LyricLine;

/// Index of the line whose `[timestamp, end_timestamp)` interval contains
/// `position_ms`, or `None` before the first line, past the last line's end
/// or on a gap no line covers.
///
/// `lines` must be sorted by timestamp, which the parser guarantees.
pub fn current_line_index(position_ms: i64, lines: &[LyricLine]) -> Option<usize> {
    let after = lines.partition_point(|l| l.timestamp <= position_ms);
    let idx = after.checked_sub(1)?;
    (position_ms < lines[idx].end_timestamp).then_some(idx)
}

/// How far into `line` the instant is, in percent (0..=100).
pub fn position_percent(line: &LyricLine, position_ms: i64) -> f64 {
    let duration = line.duration_ms();
    if duration <= 0 {
        return if position_ms >= line.timestamp { 100.0 } else { 0.0 };
    }
    let pct = (position_ms - line.timestamp) as f64 * 100.0 / duration as f64;
    pct.clamp(0.0, 100.0)
}

/// Playback instant at `pct` percent of `line`.
pub fn percent_to_ms(line: &LyricLine, pct: f64) -> i64 {
    let pct = if pct.is_nan() { 0.0 } else { pct.clamp(0.0, 100.0) };
    line.timestamp + (line.duration_ms() as f64 * pct / 100.0).round() as i64
}

/// Remembers the last active line and any line the user asked to seek to.
///
/// The pending seek is shown as highlighted until the live position reports
/// the same line or moves past its end, at which point it clears itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineTracker {
    current: Option<usize>,
    pending_seek: Option<usize>,
}

impl LineTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute from a new position. Returns true when the highlighted line
    /// changed.
    pub fn update(&mut self, position_ms: i64, lines: &[LyricLine]) -> bool {
        let before = self.highlighted();
        self.current = current_line_index(position_ms, lines);
        if let Some(target) = self.pending_seek {
            if self.current == Some(target) {
                tracing::debug!(line = target, "Seek confirmed by playback position");
                self.pending_seek = None;
            } else if lines
                .get(target)
                .is_none_or(|l| position_ms >= l.end_timestamp)
            {
                // Short lines can be skipped entirely between polls.
                tracing::debug!(line = target, position_ms, "Seek target passed");
                self.pending_seek = None;
            }
        }
        before != self.highlighted()
    }

    pub fn request_seek(&mut self, line_index: usize) {
        self.pending_seek = Some(line_index);
    }

    pub fn clear_seek(&mut self) {
        self.pending_seek = None;
    }

    /// Line derived from playback only.
    pub fn current(&self) -> Option<usize> {
        self.current
    }

    pub fn pending_seek(&self) -> Option<usize> {
        self.pending_seek
    }

    /// Line to display: a pending seek wins over the live line.
    pub fn highlighted(&self) -> Option<usize> {
        self.pending_seek.or(self.current)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lyrics::parse_lrc;

    fn lines() -> Vec<LyricLine> {
        parse_lrc("[00:12.50]Hello there\n[00:16.80]Friend of mine").lines
    }

    #[test]
    fn finds_containing_line() {
        let lines = lines();
        assert_eq!(current_line_index(15000, &lines), Some(0));
        assert_eq!(current_line_index(20000, &lines), None);
        assert_eq!(current_line_index(12500, &lines), Some(0));
        assert_eq!(current_line_index(16799, &lines), Some(0));
        assert_eq!(current_line_index(16800, &lines), Some(1));
        assert_eq!(current_line_index(19799, &lines), Some(1));
        assert_eq!(current_line_index(19800, &lines), None);
        assert_eq!(current_line_index(0, &lines), None);
        assert_eq!(current_line_index(-5, &lines), None);
        assert_eq!(current_line_index(100, &[]), None);
    }

    #[test]
    fn agrees_with_linear_scan() {
        let lines = parse_lrc(
            "[00:01.00]a\n[00:02.50]b\n[00:02.60]\n[00:07.00]c\n[00:07.01]d\n[01:00.00]e",
        )
        .lines;
        for ms in (-100..70_000).step_by(7) {
            let linear = lines
                .iter()
                .position(|l| l.timestamp <= ms && ms < l.end_timestamp);
            assert_eq!(current_line_index(ms, &lines), linear, "at {ms}ms");
        }
    }

    #[test]
    fn percent_mapping_is_clamped() {
        let line = &lines()[0];
        assert_eq!(position_percent(line, 12500), 0.0);
        assert_eq!(position_percent(line, 14650), 50.0);
        assert_eq!(position_percent(line, 1_000_000), 100.0);
        assert_eq!(position_percent(line, 0), 0.0);
        assert_eq!(percent_to_ms(line, 50.0), 14650);
        assert_eq!(percent_to_ms(line, 250.0), 16800);
    }

    #[test]
    fn seek_intent_clears_when_playback_arrives() {
        let lines = lines();
        let mut t = LineTracker::new();
        assert!(t.update(13000, &lines));
        assert_eq!(t.highlighted(), Some(0));

        t.request_seek(1);
        assert_eq!(t.highlighted(), Some(1));
        // Player has not caught up yet.
        assert!(!t.update(14000, &lines));
        assert_eq!(t.pending_seek(), Some(1));
        assert_eq!(t.current(), Some(0));

        assert!(!t.update(17000, &lines));
        assert_eq!(t.pending_seek(), None);
        assert_eq!(t.highlighted(), Some(1));
    }

    #[test]
    fn update_reports_changes_only() {
        let lines = lines();
        let mut t = LineTracker::new();
        assert!(!t.update(1000, &lines));
        assert!(t.update(13000, &lines));
        assert!(!t.update(13500, &lines));
        assert!(t.update(30000, &lines));
        assert_eq!(t.highlighted(), None);
    }

    #[test]
    fn pending_seek_clears_once_target_is_passed() {
        let lines = parse_lrc("[00:01.00]short\n[00:01.20]next\n[00:05.00]last").lines;
        let mut tracker = LineTracker::new();
        tracker.request_seek(0);
        // Stale position before the target keeps the request.
        tracker.update(200, &lines);
        assert_eq!(tracker.highlighted(), Some(0));

        // The 200ms line is skipped between polls.
        assert!(tracker.update(1300, &lines));
        assert_eq!(tracker.pending_seek(), None);
        assert_eq!(tracker.highlighted(), Some(1));

        tracker.request_seek(0);
        tracker.update(60_000, &lines);
        assert_eq!(tracker.pending_seek(), None);
        assert_eq!(tracker.highlighted(), None);

        tracker.request_seek(9);
        tracker.update(2_000, &lines);
        assert_eq!(tracker.highlighted(), Some(1));
    }
}
