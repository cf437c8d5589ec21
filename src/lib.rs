//! d3d12_demos - Direct3D 12 帧流水线演示
//!
//! 五个演示（贴图四边形、旋转立方体、多物体场景、计算着色器 GIF 播放、山丘与水面）
//! 共用同一条帧流水线：帧资源环、Fence 背压、描述符布局和命令录制状态机。
//!
//! # 模块结构
//!
//! - `core`: 日志、配置、错误处理、输入和计时
//! - `math`: 矩阵与相机变换
//! - `geometry`: 顶点格式与网格生成
//! - `renderer`: 与图形 API 无关的帧流水线，以及进程内模拟 GPU
//! - `gfx`: Direct3D 12 后端（仅 Windows）
//! - `scene`: 相机、渲染项、纹理和 GIF 动画
//! - `app`: `Application` trait、演示实现和无窗口运行
//!
//! # 使用示例
//!
//! ```no_run
//! use d3d12_demos::app::run_headless;
//! use d3d12_demos::core::{Config, DemoKind};
//!
//! let mut config = Config::default();
//! config.demo.kind = DemoKind::Cube;
//! let report = run_headless(&config, 10).unwrap();
//! assert!(report.fence_completed <= report.fence_signaled);
//! ```

pub mod core;
pub mod math;
pub mod geometry;
pub mod renderer;
pub mod gfx;
pub mod scene;
pub mod app;
