//! 无窗口运行
//!
//! 在模拟 GPU 上以固定帧时间跑完若干帧，不需要窗口和 Direct3D 12。
//! 用于 `--headless`、非 Windows 平台和集成测试。

use std::time::Duration;

use tracing::{info, warn};

use crate::app::{Application, DemoApp};
use crate::core::config::Config;
use crate::core::error::Result;
use crate::renderer::host::{HostGpu, HostPresenter};
use crate::renderer::shaders::DemoShaders;
use crate::renderer::GpuContext;
use crate::scene::DemoAssets;

/// 无窗口运行的固定帧时间（约 60 FPS）
pub const HEADLESS_FRAME_TIME: Duration = Duration::from_millis(16);

/// 运行结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadlessReport {
    pub frames: u32,
    /// CPU 等待帧槽位的次数
    pub slot_stalls: u64,
    pub fence_completed: u64,
    pub fence_signaled: u64,
    pub gif_dispatches: u64,
}

/// 按配置在模拟 GPU 上运行 `frames` 帧
///
/// 资源文件或着色器缺失时退回到占位资源，只记录警告。
pub fn run_headless(config: &Config, frames: u32) -> Result<HeadlessReport> {
    let kind = config.demo.kind;
    let gpu = HostGpu::new(config.graphics.frame_count);
    let presenter = HostPresenter::create(
        &gpu,
        config.graphics.frame_count,
        config.window.width,
        config.window.height,
    )?;
    let context = GpuContext::host(&gpu, kind.uses_compute(), presenter)?;

    let assets = DemoAssets::load(config).unwrap_or_else(|e| {
        warn!(error = %e, "Falling back to placeholder assets");
        DemoAssets::placeholder(kind)
    });
    let shaders = DemoShaders::load(config).unwrap_or_else(|e| {
        warn!(error = %e, "Falling back to empty shaders");
        DemoShaders::default()
    });

    let mut app = DemoApp::new(config.clone(), context, assets, shaders);
    run_frames(&mut app, config.window.width, config.window.height, frames, HEADLESS_FRAME_TIME)?;
    app.shutdown()?;

    let report = HeadlessReport {
        frames,
        slot_stalls: app.slot_stalls(),
        fence_completed: gpu.completed_value(),
        fence_signaled: gpu.last_signaled(),
        gif_dispatches: app.gif_dispatches(),
    };
    info!(
        demo = kind.name(),
        frames = report.frames,
        stalls = report.slot_stalls,
        fence = report.fence_completed,
        gif_dispatches = report.gif_dispatches,
        "Headless run finished"
    );
    Ok(report)
}

/// 初始化应用并以固定帧时间运行 `frames` 帧
pub fn run_frames<A: Application>(app: &mut A, width: u32, height: u32, frames: u32, frame_time: Duration) -> Result<()> {
    app.initialize()?;
    app.on_resize(width, height)?;
    for _ in 0..frames {
        app.update(frame_time)?;
        app.draw()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::DemoKind;

    #[test]
    fn test_headless_cube() {
        let mut config = Config::default();
        config.demo.kind = DemoKind::Cube;
        config.graphics.frame_count = 3;

        let report = run_headless(&config, 10).unwrap();
        assert_eq!(report.frames, 10);
        // 关闭时刷新过队列
        assert_eq!(report.fence_completed, report.fence_signaled);
        assert_eq!(report.gif_dispatches, 0);
    }

    #[test]
    fn test_headless_gif_falls_back_to_placeholder() {
        let mut config = Config::default();
        config.demo.kind = DemoKind::Gif;
        config.demo.gif = "no_such_file.gif".to_string();

        let report = run_headless(&config, 4).unwrap();
        assert!(report.gif_dispatches >= 1);
    }
}
