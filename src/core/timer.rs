//! 计时与帧统计
//!
//! `GameTimer` 提供每帧的 delta，`FrameStats` 每秒刷新一次帧率，
//! 用于更新窗口标题。

use std::time::{Duration, Instant};

/// 游戏计时器
#[derive(Debug)]
pub struct GameTimer {
    last_tick: Instant,
    delta: Duration,
}

impl GameTimer {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            last_tick: now,
            delta: Duration::ZERO,
        }
    }

    /// 每帧调用一次
    pub fn tick(&mut self) {
        let now = Instant::now();
        self.delta = now.duration_since(self.last_tick);
        self.last_tick = now;
    }

    /// 上一帧耗时
    pub fn delta(&self) -> Duration {
        self.delta
    }
}

impl Default for GameTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// 帧统计（帧率、帧时间）
#[derive(Debug, Default)]
pub struct FrameStats {
    frame_count: u32,
    elapsed: Duration,
    fps: f32,
    frame_time_ms: f32,
}

impl FrameStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一帧，统计窗口满一秒时返回 true
    pub fn record_frame(&mut self, delta: Duration) -> bool {
        self.frame_count += 1;
        self.elapsed += delta;

        if self.elapsed >= Duration::from_secs(1) {
            self.fps = self.frame_count as f32 / self.elapsed.as_secs_f32();
            self.frame_time_ms = 1000.0 / self.fps;
            self.frame_count = 0;
            self.elapsed = Duration::ZERO;
            true
        } else {
            false
        }
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }

    pub fn frame_time_ms(&self) -> f32 {
        self.frame_time_ms
    }

    /// 窗口标题
    pub fn title(&self, base: &str) -> String {
        format!("{}    fps: {:.0}   mspf: {:.3}", base, self.fps, self.frame_time_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_stats_updates_once_per_second() {
        let mut stats = FrameStats::new();
        for _ in 0..59 {
            assert!(!stats.record_frame(Duration::from_millis(16)));
        }
        // 60 * 16ms = 960ms，仍未满一秒
        assert!(!stats.record_frame(Duration::from_millis(16)));
        assert!(stats.record_frame(Duration::from_millis(40)));
        assert!((stats.fps() - 61.0).abs() < 0.01);
        assert!(stats.title("Shapes").starts_with("Shapes    fps: 61"));
    }
}
