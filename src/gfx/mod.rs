//! 图形后端模块
//!
//! 目前只有 Direct3D 12 一个真实后端，仅在 Windows 上编译。
//! 其他平台只能使用 [`renderer::host`](crate::renderer::host) 的无窗口模式。

#[cfg(target_os = "windows")]
pub mod dx12;
