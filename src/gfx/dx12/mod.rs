//! DirectX 12 后端
//!
//! 实现 [`GpuDevice`](crate::renderer::GpuDevice) 等 trait：
//!
//! - `context`：调试层、DXGI 工厂、设备、队列和交换链的创建
//! - `device`：资源表与 [`Dx12Device`]
//! - `command`：命令分配器和图形/计算命令列表
//! - `sync`：Fence 与命令队列
//! - `pipeline`：根签名与流水线状态对象
//! - `descriptor`：描述符堆
//! - `resource`：上传堆内存、纹理和网格缓冲
//!
//! 设备、命令列表和交换链共享一张资源表，命令里的句柄在录制时解析成 COM 对象。

use crate::core::error::{GraphicsError, Result};

pub mod command;
pub mod context;
pub mod descriptor;
pub mod device;
pub mod pipeline;
pub mod resource;
pub mod sync;

pub use context::{create_context, Dx12Presenter};
pub use device::Dx12Device;

/// 带上下文地转换 windows-rs 的错误
pub(crate) trait ApiResultExt<T> {
    fn context(self, what: &str) -> Result<T>;
}

impl<T> ApiResultExt<T> for windows::core::Result<T> {
    fn context(self, what: &str) -> Result<T> {
        self.map_err(|e| {
            GraphicsError::Api {
                code: e.code().0 as u32,
                context: what.to_string(),
            }
            .into()
        })
    }
}

/// 设置调试名称
pub(crate) fn set_name(object: &windows::Win32::Graphics::Direct3D12::ID3D12Object, name: &str) {
    let wide_name: Vec<u16> = name.encode_utf16().chain(Some(0)).collect();
    unsafe {
        let _ = object.SetName(windows::core::PCWSTR(wide_name.as_ptr()));
    }
}
