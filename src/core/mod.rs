//! 核心功能模块
//!
//! 与具体图形 API 无关的基础设施：日志、配置、错误处理、输入状态和计时。
//!
//! # 模块组织
//!
//! - `log`：日志系统，基于 tracing 的结构化日志
//! - `config`：配置管理，支持从 TOML 文件加载并用命令行覆盖
//! - `error`：错误处理，定义统一的错误类型
//! - `input`：鼠标和键盘状态
//! - `timer`：帧计时和帧率统计

pub mod log;
pub mod config;
pub mod error;
pub mod input;
pub mod timer;

// 重新导出常用类型，方便使用
pub use config::{Config, DemoKind};
pub use error::{DemoError, Result};
pub use input::{InputSystem, MouseDrag};
pub use timer::{FrameStats, GameTimer};
