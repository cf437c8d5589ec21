//! d3d12_demos - Direct3D 12 帧流水线演示
//!
//! # 使用方法
//!
//! ```bash
//! # 使用配置文件（config.toml）
//! cargo run
//!
//! # 选择演示并覆盖配置
//! cargo run -- --demo gif --frames 2 --no-vsync
//!
//! # 不创建窗口，用模拟 GPU 跑 300 帧
//! cargo run -- --demo shapes --headless 300
//! ```
//!
//! # 架构概览
//!
//! ```text
//! ┌─────────────┐
//! │   main.rs   │  配置、日志、事件循环
//! └──────┬──────┘
//!        │ Application trait
//! ┌──────▼──────┐
//! │   DemoApp   │  quad / cube / shapes / gif
//! └──────┬──────┘
//!        │ GpuDevice trait
//!   ┌────┴────┐
//!   │         │
//! ┌─▼──┐   ┌──▼──┐
//! │DX12│   │Host │  Direct3D 12 / 进程内模拟
//! └────┘   └─────┘
//! ```

use anyhow::{Context, Result};
use d3d12_demos::app::run_headless;
use d3d12_demos::core::{log, Config};
use d3d12_demos::{app_error, app_info};

/// 非 Windows 平台没有窗口后端时模拟的帧数
#[cfg(not(target_os = "windows"))]
const FALLBACK_HEADLESS_FRAMES: u32 = 120;

/// 应用程序入口点
///
/// 所有错误都汇集到这里：记录日志后以状态码 1 退出。
fn main() {
    if let Err(e) = run() {
        app_error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

/// # 初始化流程
///
/// 1. 加载配置文件（config.toml）
/// 2. 应用命令行参数覆盖
/// 3. 验证配置
/// 4. 初始化日志系统
/// 5. 无窗口运行，或创建窗口进入事件循环
fn run() -> Result<()> {
    let mut config = Config::from_file_or_default("config.toml");
    config.apply_args(std::env::args()).context("Invalid command line")?;
    config.validate().context("Invalid configuration")?;

    let log_file = config
        .logging
        .file_output
        .then(|| config.logging.log_file.as_str());
    log::init_logger(config.logging.level, config.logging.file_output, log_file)
        .context("Failed to initialize logging")?;

    app_info!(version = env!("CARGO_PKG_VERSION"), "d3d12_demos starting");
    app_info!(
        demo = config.demo.kind.name(),
        width = config.window.width,
        height = config.window.height,
        frames_in_flight = config.graphics.frame_count,
        vsync = config.graphics.vsync,
        "Configuration loaded"
    );

    match config.graphics.headless_frames {
        Some(frames) => headless(&config, frames),
        None => windowed::run(config),
    }
}

fn headless(config: &Config, frames: u32) -> Result<()> {
    let report = run_headless(config, frames).context("Headless run failed")?;
    app_info!(
        frames = report.frames,
        stalls = report.slot_stalls,
        fence_signaled = report.fence_signaled,
        fence_completed = report.fence_completed,
        gif_dispatches = report.gif_dispatches,
        "Done"
    );
    Ok(())
}

#[cfg(target_os = "windows")]
mod windowed {
    use anyhow::{Context, Result};
    use d3d12_demos::app::{Application, DemoApp};
    use d3d12_demos::core::{Config, DemoError, GameTimer};
    use d3d12_demos::gfx::dx12;
    use d3d12_demos::renderer::shaders::DemoShaders;
    use d3d12_demos::scene::DemoAssets;
    use d3d12_demos::{app_info, app_warn};
    use winit::dpi::LogicalSize;
    use winit::event::{ElementState, Event, KeyEvent, WindowEvent};
    use winit::event_loop::EventLoop;
    use winit::keyboard::{KeyCode, PhysicalKey};
    use winit::window::WindowBuilder;

    /// 创建窗口和 Direct3D 12 上下文，运行事件循环直到窗口关闭
    ///
    /// # 事件处理
    ///
    /// - `CloseRequested` / Esc：退出
    /// - `Resized`：刷新 GPU 后重建交换链缓冲，最小化时暂停绘制
    /// - `RedrawRequested`：update + draw 一帧，并刷新窗口标题中的帧率
    pub fn run(config: Config) -> Result<()> {
        let event_loop = EventLoop::new().context("Failed to create event loop")?;
        let window = WindowBuilder::new()
            .with_title(&config.window.title)
            .with_inner_size(LogicalSize::new(config.window.width, config.window.height))
            .with_resizable(config.window.resizable)
            .build(&event_loop)
            .context("Failed to create window")?;

        let gpu = dx12::create_context(&window, &config).context("Failed to initialize Direct3D 12")?;
        let assets = DemoAssets::load(&config).context("Failed to load demo assets")?;
        let shaders = DemoShaders::load(&config).context("Failed to load shader bytecode")?;

        let mut app = DemoApp::new(config, gpu, assets, shaders);
        app.initialize()?;
        let size = window.inner_size();
        app.on_resize(size.width, size.height)?;
        app_info!("Entering main loop...");

        let mut failure: Option<DemoError> = None;
        let mut timer = GameTimer::new();
        let mut cursor = (0.0, 0.0);
        let mut minimized = false;

        event_loop.run(|event, elwt| match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => {
                    app_info!("Close requested, shutting down...");
                    elwt.exit();
                }
                WindowEvent::Resized(size) => {
                    minimized = size.width == 0 || size.height == 0;
                    if let Err(e) = app.on_resize(size.width, size.height) {
                        failure = Some(e);
                        elwt.exit();
                    }
                }
                WindowEvent::CursorMoved { position, .. } => {
                    cursor = (position.x, position.y);
                    app.on_mouse_move(position.x, position.y);
                }
                WindowEvent::MouseInput { state, button, .. } => match state {
                    ElementState::Pressed => app.on_mouse_down(button, cursor.0, cursor.1),
                    ElementState::Released => app.on_mouse_up(button, cursor.0, cursor.1),
                },
                WindowEvent::KeyboardInput {
                    event:
                        KeyEvent {
                            physical_key: PhysicalKey::Code(key),
                            state,
                            repeat: false,
                            ..
                        },
                    ..
                } => match state {
                    ElementState::Pressed if key == KeyCode::Escape => elwt.exit(),
                    ElementState::Pressed => app.on_key_down(key),
                    ElementState::Released => app.on_key_up(key),
                },
                WindowEvent::RedrawRequested => {
                    if minimized {
                        return;
                    }
                    timer.tick();
                    if let Err(e) = app.update(timer.delta()).and_then(|_| app.draw()) {
                        failure = Some(e);
                        elwt.exit();
                        return;
                    }
                    if let Some(title) = app.take_title() {
                        window.set_title(&title);
                    }
                }
                _ => {}
            },
            Event::AboutToWait => window.request_redraw(),
            Event::LoopExiting => {
                if let Err(e) = app.shutdown() {
                    app_warn!(error = %e, "GPU flush on exit failed");
                }
            }
            _ => {}
        })?;

        match failure {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }
}

#[cfg(not(target_os = "windows"))]
mod windowed {
    use anyhow::Result;
    use d3d12_demos::app_warn;
    use d3d12_demos::core::Config;

    /// Direct3D 12 只在 Windows 上可用，其他平台退回无窗口模式
    pub fn run(config: Config) -> Result<()> {
        app_warn!(
            frames = super::FALLBACK_HEADLESS_FRAMES,
            "Direct3D 12 is only available on Windows, running headless instead"
        );
        super::headless(&config, super::FALLBACK_HEADLESS_FRAMES)
    }
}
