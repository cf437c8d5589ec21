//! 日志系统模块
//!
//! 基于 `tracing` 提供结构化的日志记录功能。
//!
//! # 特性
//!
//! - 结构化日志：支持键值对
//! - 灵活输出：支持控制台和文件输出（按天滚动）
//! - 日志级别：trace, debug, info, warn, error
//!
//! 帧循环里的事件（帧资源等待、Fence Signal、GIF 帧解码）使用 trace/debug 级别，
//! 生命周期事件使用 info 级别。
//!
//! # 使用示例
//!
//! ```no_run
//! use d3d12_demos::core::log;
//! use d3d12_demos::core::config::LogLevel;
//!
//! log::init_logger(LogLevel::Info, false, None).unwrap();
//! tracing::info!(width = 800, height = 600, "Window created");
//! ```

use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

use super::config::LogLevel;
use super::error::{DemoError, Result};

/// 初始化日志系统
///
/// 必须在程序开始时调用一次，`RUST_LOG` 环境变量优先于配置中的级别。
///
/// # 参数
///
/// * `level` - 日志级别
/// * `file_output` - 是否输出到文件
/// * `log_file_path` - 日志文件路径（可选，默认为 "d3d12_demos.log"）
pub fn init_logger(level: LogLevel, file_output: bool, log_file_path: Option<&str>) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_directive(level)).map_err(|e| DemoError::Log(e.to_string()))?,
    };

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_ansi(true);

    let result = if file_output {
        let log_path = log_file_path.unwrap_or("d3d12_demos.log");
        let path = Path::new(log_path);
        let directory = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let filename = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("d3d12_demos.log");

        // 每天滚动
        let file_appender = RollingFileAppender::new(Rotation::DAILY, directory, filename);

        let file_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(filter)
            .with(console_layer)
            .with(file_layer)
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(console_layer.with_span_events(FmtSpan::CLOSE))
            .try_init()
    };

    result.map_err(|e| DemoError::Log(e.to_string()))
}

/// 引擎核心日志 - Info 级别
#[macro_export]
macro_rules! engine_info {
    ($($arg:tt)*) => {
        tracing::info!(target: "d3d12_demos::engine", $($arg)*)
    };
}

/// 引擎核心日志 - Warn 级别
#[macro_export]
macro_rules! engine_warn {
    ($($arg:tt)*) => {
        tracing::warn!(target: "d3d12_demos::engine", $($arg)*)
    };
}

/// 引擎核心日志 - Error 级别
#[macro_export]
macro_rules! engine_error {
    ($($arg:tt)*) => {
        tracing::error!(target: "d3d12_demos::engine", $($arg)*)
    };
}

/// 应用层日志 - Info 级别
#[macro_export]
macro_rules! app_info {
    ($($arg:tt)*) => {
        tracing::info!(target: "d3d12_demos::app", $($arg)*)
    };
}

/// 应用层日志 - Warn 级别
#[macro_export]
macro_rules! app_warn {
    ($($arg:tt)*) => {
        tracing::warn!(target: "d3d12_demos::app", $($arg)*)
    };
}

/// 应用层日志 - Error 级别
#[macro_export]
macro_rules! app_error {
    ($($arg:tt)*) => {
        tracing::error!(target: "d3d12_demos::app", $($arg)*)
    };
}

/// 性能追踪 span
///
/// ```no_run
/// let _span = d3d12_demos::span_trace!("record_frame").entered();
/// ```
#[macro_export]
macro_rules! span_trace {
    ($name:expr) => {
        tracing::span!(tracing::Level::TRACE, $name)
    };
}

/// 默认过滤指令
///
/// 窗口系统的日志只保留警告以上，避免每帧的事件刷屏。
fn default_directive(level: LogLevel) -> String {
    let level = match level {
        LogLevel::Trace => "trace",
        LogLevel::Debug => "debug",
        LogLevel::Info => "info",
        LogLevel::Warn => "warn",
        LogLevel::Error => "error",
    };
    format!("{level},winit=warn,calloop=warn")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directive_quiets_window_system() {
        assert_eq!(default_directive(LogLevel::Debug), "debug,winit=warn,calloop=warn");
        assert!(default_directive(LogLevel::Error).starts_with("error,"));
    }

    #[test]
    fn test_directive_parses_as_filter() {
        assert!(EnvFilter::try_new(default_directive(LogLevel::Trace)).is_ok());
    }
}
