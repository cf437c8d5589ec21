//! 交换链接口
//!
//! 后台缓冲索引只有在 `present` 返回之后才可信，调用者不能自行推算。

use crate::core::config::{MAX_FRAME_COUNT, MIN_FRAME_COUNT};
use crate::core::error::{ConfigError, Result};

/// 交换链
pub trait Presenter {
    /// 后台缓冲数量
    fn buffer_count(&self) -> usize;

    /// 当前后台缓冲索引
    fn current_back_buffer(&self) -> usize;

    /// 呈现当前后台缓冲，返回新的后台缓冲索引
    fn present(&mut self, sync_interval: u32) -> Result<usize>;

    /// 调整缓冲大小并重建 RTV/DSV，调用前 GPU 必须空闲
    fn resize(&mut self, width: u32, height: u32) -> Result<()>;

    /// 当前缓冲尺寸
    fn extent(&self) -> (u32, u32);
}

/// 检查后台缓冲数量在 2..=3 之间
pub fn validate_buffer_count(count: usize) -> Result<()> {
    if !(MIN_FRAME_COUNT..=MAX_FRAME_COUNT).contains(&count) {
        return Err(ConfigError::InvalidValue {
            field: "graphics.frame_count".to_string(),
            reason: format!("swapchain needs {}..={} buffers, got {}", MIN_FRAME_COUNT, MAX_FRAME_COUNT, count),
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_count_bounds() {
        assert!(validate_buffer_count(1).is_err());
        assert!(validate_buffer_count(2).is_ok());
        assert!(validate_buffer_count(3).is_ok());
        assert!(validate_buffer_count(4).is_err());
    }
}
