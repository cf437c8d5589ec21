//! 错误处理模块
//!
//! 定义了演示程序中使用的统一错误类型，使用 `thiserror` 提供友好的错误消息。
//!
//! # 错误分类
//!
//! - 初始化失败（设备、交换链、堆、着色器字节码、纹理）：致命，直接退出
//! - 每帧失败（命令列表重置/关闭、提交、呈现、Signal）：同样致命
//! - 逻辑错误（描述符越界、上传缓冲区越界、Fence 配对错误、命令状态非法）：
//!   原本会静默破坏 GPU 状态，这里全部转换为显式错误

use thiserror::Error;

/// 统一的 Result 类型
pub type Result<T> = std::result::Result<T, DemoError>;

/// 演示程序的错误类型
#[derive(Debug, Error)]
pub enum DemoError {
    /// 配置错误
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// 图形 API 错误
    #[error("Graphics error: {0}")]
    Graphics(#[from] GraphicsError),

    /// 同步错误
    #[error("Synchronization error: {0}")]
    Sync(#[from] SyncError),

    /// 图像解码错误
    #[error("Image decode error: {0}")]
    Image(#[from] image::ImageError),

    /// IO 错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 日志系统错误
    #[error("Log error: {0}")]
    Log(String),

    /// 初始化错误
    #[error("Initialization error: {0}")]
    Initialization(String),
}

/// 配置相关的错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 配置文件未找到
    #[error("Config file not found: {0}")]
    FileNotFound(String),

    /// 配置文件解析失败
    #[error("Failed to parse config: {0}")]
    ParseError(String),

    /// 配置值无效
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 图形 API 相关的错误
#[derive(Debug, Error)]
pub enum GraphicsError {
    /// 图形 API 调用失败，携带 HRESULT 和调用处上下文
    #[error("{context} failed (HRESULT 0x{code:08X})")]
    Api { code: u32, context: String },

    /// 设备创建失败
    #[error("Device creation failed: {0}")]
    DeviceCreation(String),

    /// 交换链错误
    #[error("Swapchain error: {0}")]
    Swapchain(String),

    /// 着色器字节码读取失败
    #[error("Failed to load shader bytecode '{path}': {reason}")]
    ShaderLoad { path: String, reason: String },

    /// 资源创建失败
    #[error("Resource creation failed: {0}")]
    ResourceCreation(String),

    /// 索引越界（描述符堆、上传缓冲区等）
    #[error("{what} index {index} out of range (limit {limit})")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        limit: usize,
    },

    /// 命令录制顺序非法
    #[error("Command '{command}' is not allowed in state {state}")]
    InvalidCommandState {
        command: &'static str,
        state: &'static str,
    },
}

/// 同步相关的错误
#[derive(Debug, Error)]
pub enum SyncError {
    /// Fence 值必须严格递增
    #[error("Fence value {value} is not greater than last signaled value {last}")]
    NonMonotonic { value: u64, last: u64 },

    /// 令牌来自另一条时间线
    #[error("Fence token from timeline {token} used on timeline {timeline}")]
    ForeignToken { token: u32, timeline: u32 },

    /// 在发出 Signal 的同一队列上等待
    #[error("Queue {queue} cannot wait on a value it signaled itself")]
    SameQueueWait { queue: &'static str },

    /// 等待一个从未被 Signal 的值
    #[error("Waiting for fence value {value} which was never signaled (last signaled {last_signaled})")]
    Deadlock { value: u64, last_signaled: u64 },
}

impl GraphicsError {
    /// 构造越界错误
    pub fn out_of_range(what: &'static str, index: usize, limit: usize) -> Self {
        GraphicsError::IndexOutOfRange { what, index, limit }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_message() {
        let err: DemoError = GraphicsError::Api {
            code: 0x887A0005,
            context: "Present".to_string(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Graphics error: Present failed (HRESULT 0x887A0005)"
        );
    }

    #[test]
    fn test_sync_error_conversion() {
        let err: DemoError = SyncError::SameQueueWait { queue: "graphics" }.into();
        assert!(matches!(err, DemoError::Sync(SyncError::SameQueueWait { .. })));
    }
}
