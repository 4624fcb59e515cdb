//! Frame statistics
//!
//! Mirrors a stats overlay: `begin`/`end` bracket the work of one tick, the
//! interval between successive `begin` calls gives the frame rate.

use std::collections::VecDeque;

const MAX_SAMPLES: usize = 120;

/// Frame statistics tracker
#[derive(Debug)]
pub struct FrameStats {
    /// Seconds between successive frame starts
    frame_intervals: VecDeque<f32>,
    /// Seconds spent between `begin` and `end`
    work_times: VecDeque<f32>,
    /// Start of the frame currently being measured
    frame_begin: Option<f32>,
    /// Start of the previous frame
    last_begin: Option<f32>,
    fps: f32,
    avg_frame_time_ms: f32,
    avg_work_time_ms: f32,
    min_frame_time_ms: f32,
    max_frame_time_ms: f32,
    total_frames: u64,
}

impl FrameStats {
    /// Create a new frame stats tracker
    pub fn new() -> Self {
        Self {
            frame_intervals: VecDeque::with_capacity(MAX_SAMPLES),
            work_times: VecDeque::with_capacity(MAX_SAMPLES),
            frame_begin: None,
            last_begin: None,
            fps: 0.0,
            avg_frame_time_ms: 0.0,
            avg_work_time_ms: 0.0,
            min_frame_time_ms: 0.0,
            max_frame_time_ms: 0.0,
            total_frames: 0,
        }
    }

    /// Mark the start of a frame at `now` seconds
    pub fn begin(&mut self, now: f32) {
        if let Some(previous) = self.last_begin {
            push_sample(&mut self.frame_intervals, (now - previous).max(0.0));
        }
        self.last_begin = Some(now);
        self.frame_begin = Some(now);
    }

    /// Mark the end of the frame started by the last `begin`
    pub fn end(&mut self, now: f32) {
        let Some(start) = self.frame_begin.take() else {
            return;
        };
        self.total_frames += 1;
        push_sample(&mut self.work_times, (now - start).max(0.0));
        self.update_stats();
    }

    fn update_stats(&mut self) {
        if !self.work_times.is_empty() {
            let total: f32 = self.work_times.iter().sum();
            self.avg_work_time_ms = total / self.work_times.len() as f32 * 1000.0;
        }

        if self.frame_intervals.is_empty() {
            return;
        }

        let mut total = 0.0;
        let mut min = f32::MAX;
        let mut max = 0.0_f32;
        for &dt in &self.frame_intervals {
            total += dt;
            min = min.min(dt);
            max = max.max(dt);
        }

        let count = self.frame_intervals.len() as f32;

        // Guard against division by zero
        if total > 0.0 {
            self.avg_frame_time_ms = (total / count) * 1000.0;
            self.fps = count / total;
        } else {
            self.avg_frame_time_ms = 0.0;
            self.fps = 0.0;
        }

        self.min_frame_time_ms = min * 1000.0;
        self.max_frame_time_ms = max * 1000.0;
    }

    /// Get current FPS
    pub fn fps(&self) -> f32 {
        self.fps
    }

    /// Get average time between frames in milliseconds
    pub fn avg_frame_time_ms(&self) -> f32 {
        self.avg_frame_time_ms
    }

    /// Get average time spent inside a tick in milliseconds
    pub fn avg_work_time_ms(&self) -> f32 {
        self.avg_work_time_ms
    }

    pub fn min_frame_time_ms(&self) -> f32 {
        self.min_frame_time_ms
    }

    pub fn max_frame_time_ms(&self) -> f32 {
        self.max_frame_time_ms
    }

    /// Get total frames completed
    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// Get a formatted stats string
    pub fn format_stats(&self) -> String {
        format!(
            "FPS: {:.1} | Frame: {:.2}ms (min: {:.2}, max: {:.2}) | Work: {:.2}ms",
            self.fps,
            self.avg_frame_time_ms,
            self.min_frame_time_ms,
            self.max_frame_time_ms,
            self.avg_work_time_ms
        )
    }
}

impl Default for FrameStats {
    fn default() -> Self {
        Self::new()
    }
}

fn push_sample(samples: &mut VecDeque<f32>, value: f32) {
    if samples.len() >= MAX_SAMPLES {
        samples.pop_front();
    }
    samples.push_back(value);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fps_from_frame_intervals() {
        let mut stats = FrameStats::new();
        for i in 0..11 {
            let t = i as f32 * 0.02;
            stats.begin(t);
            stats.end(t + 0.005);
        }

        assert_eq!(stats.total_frames(), 11);
        assert!((stats.fps() - 50.0).abs() < 0.5);
        assert!((stats.avg_frame_time_ms() - 20.0).abs() < 0.1);
        assert!((stats.avg_work_time_ms() - 5.0).abs() < 0.1);
    }

    #[test]
    fn test_end_without_begin_is_ignored() {
        let mut stats = FrameStats::new();
        stats.end(1.0);
        assert_eq!(stats.total_frames(), 0);
        assert_eq!(stats.fps(), 0.0);
    }
}
