//! 应用程序层
//!
//! 事件循环只认识 [`Application`] trait，不持有任何全局单例：
//! 应用实例由事件循环的闭包拥有，窗口和输入事件经由 trait 方法转发。

use std::time::Duration;

use winit::event::MouseButton;
use winit::keyboard::KeyCode;

use crate::core::error::Result;

pub mod demo;
pub mod headless;

pub use demo::DemoApp;
pub use headless::{run_frames, run_headless, HeadlessReport};

/// 应用程序接口
///
/// # 调用顺序
///
/// ```text
/// initialize → on_resize → { update → draw }* → shutdown
/// ```
///
/// 输入回调可以在任意两帧之间到达。
pub trait Application {
    /// 创建所有 GPU 资源
    fn initialize(&mut self) -> Result<()>;

    /// 窗口尺寸变化
    fn on_resize(&mut self, width: u32, height: u32) -> Result<()>;

    /// 推进一帧的 CPU 状态并写入当前帧槽位的常量
    fn update(&mut self, delta: Duration) -> Result<()>;

    /// 录制、提交并呈现一帧
    fn draw(&mut self) -> Result<()>;

    fn on_mouse_down(&mut self, _button: MouseButton, _x: f64, _y: f64) {}

    fn on_mouse_up(&mut self, _button: MouseButton, _x: f64, _y: f64) {}

    fn on_mouse_move(&mut self, _x: f64, _y: f64) {}

    fn on_key_down(&mut self, _key: KeyCode) {}

    fn on_key_up(&mut self, _key: KeyCode) {}

    /// 新的窗口标题（帧率统计每秒更新一次）
    fn take_title(&mut self) -> Option<String> {
        None
    }

    /// 退出前等待 GPU 空闲
    fn shutdown(&mut self) -> Result<()> {
        Ok(())
    }
}
