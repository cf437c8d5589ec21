//! GIF 动画
//!
//! 文件在启动时一次性解码为帧序列，播放时由 [`GifPlayback`] 按每帧延时决定
//! 何时把下一帧交给计算队列合成。

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, ImageDecoder};
use tracing::{debug, info};

use crate::core::error::{GraphicsError, Result};
use crate::scene::texture::ImageData;

/// 延时为 0 的帧按 100ms 播放
pub const DEFAULT_DELAY_MS: u32 = 100;

/// 帧处理方式（GIF 图形控制扩展中的 disposal method）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum Disposal {
    #[default]
    Unspecified = 0,
    /// 保留
    None = 1,
    /// 恢复为背景色
    Background = 2,
    /// 恢复为上一帧
    Previous = 3,
}

/// 一帧 GIF
#[derive(Debug, Clone)]
pub struct GifFrame {
    pub image: ImageData,
    /// 子矩形在画布上的位置
    pub left: u32,
    pub top: u32,
    pub delay_ms: u32,
    pub disposal: Disposal,
}

impl GifFrame {
    /// 子矩形尺寸，也是计算着色器的分派尺寸
    pub fn size(&self) -> [u32; 2] {
        [self.image.width, self.image.height]
    }
}

/// 解码后的 GIF
#[derive(Debug, Clone)]
pub struct GifAnimation {
    pub width: u32,
    pub height: u32,
    pub frames: Vec<GifFrame>,
}

impl GifAnimation {
    pub fn new(width: u32, height: u32, frames: Vec<GifFrame>) -> Result<Self> {
        if frames.is_empty() {
            return Err(GraphicsError::ResourceCreation("GIF has no frames".to_string()).into());
        }
        if let Some(frame) = frames
            .iter()
            .find(|f| f.left + f.image.width > width || f.top + f.image.height > height)
        {
            return Err(GraphicsError::ResourceCreation(format!(
                "GIF frame {}x{} at ({}, {}) exceeds {}x{} canvas",
                frame.image.width, frame.image.height, frame.left, frame.top, width, height
            ))
            .into());
        }
        Ok(Self { width, height, frames })
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn frame(&self, index: usize) -> Result<&GifFrame> {
        self.frames
            .get(index)
            .ok_or_else(|| GraphicsError::out_of_range("GIF frame", index, self.frames.len()).into())
    }
}

/// 把 `numer/denom` 毫秒转成整数毫秒，0 视为默认延时
pub fn delay_to_ms(numer: u32, denom: u32) -> u32 {
    let ms = if denom == 0 { 0 } else { (numer + denom / 2) / denom };
    if ms == 0 {
        DEFAULT_DELAY_MS
    } else {
        ms
    }
}

/// 加载 GIF 并解码所有帧
///
/// 解码器输出的每一帧都已合成到整张画布上，因此子矩形覆盖整张画布，
/// 处理方式记为 [`Disposal::None`]。
pub fn load_gif<P: AsRef<Path>>(path: P) -> Result<GifAnimation> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let decoder = GifDecoder::new(reader)?;
    let (width, height) = decoder.dimensions();

    let frames = decoder
        .into_frames()
        .collect_frames()?
        .into_iter()
        .map(|frame| {
            let (numer, denom) = frame.delay().numer_denom_ms();
            GifFrame {
                left: frame.left(),
                top: frame.top(),
                delay_ms: delay_to_ms(numer, denom),
                disposal: Disposal::None,
                image: frame.into_buffer().into(),
            }
        })
        .collect();

    let animation = GifAnimation::new(width, height, frames)?;
    info!(
        path = %path.display(),
        width,
        height,
        frames = animation.frame_count(),
        "GIF loaded"
    );
    Ok(animation)
}

/// 播放器每帧的决定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackAction {
    /// 当前帧还没到时间，不做计算也不同步
    Idle,
    /// 解码并上传第 `frame` 帧
    DecodeFrame { frame: usize },
}

/// GIF 播放计时器
///
/// 状态为"等待下一帧，剩余 `remaining_ms`"。每次 tick 扣除实际帧时间（最小到 0）。
#[derive(Debug, Clone)]
pub struct GifPlayback {
    frame_count: usize,
    next_frame: usize,
    remaining_ms: u32,
    started: bool,
}

impl GifPlayback {
    pub fn new(frame_count: usize) -> Self {
        Self {
            frame_count: frame_count.max(1),
            next_frame: 0,
            remaining_ms: 0,
            started: false,
        }
    }

    /// 推进 `elapsed_ms`
    pub fn tick(&mut self, elapsed_ms: u32) -> PlaybackAction {
        if !self.started || elapsed_ms >= self.remaining_ms {
            return PlaybackAction::DecodeFrame { frame: self.next_frame };
        }
        self.remaining_ms = self.remaining_ms.saturating_sub(elapsed_ms);
        PlaybackAction::Idle
    }

    /// 帧上传完成，开始计时该帧的延时
    pub fn frame_uploaded(&mut self, delay_ms: u32) {
        debug!(frame = self.next_frame, delay_ms, "GIF frame uploaded");
        self.remaining_ms = delay_ms;
        self.started = true;
        self.next_frame = (self.next_frame + 1) % self.frame_count;
    }

    /// 剩余等待时间
    pub fn remaining_ms(&self) -> u32 {
        self.remaining_ms
    }

    /// 下一帧的序号
    pub fn next_frame(&self) -> usize {
        self.next_frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(delay_ms: u32) -> GifFrame {
        GifFrame {
            image: ImageData::solid(2, 2, [255, 0, 0, 255]),
            left: 0,
            top: 0,
            delay_ms,
            disposal: Disposal::None,
        }
    }

    #[test]
    fn test_first_tick_decodes() {
        let mut playback = GifPlayback::new(3);
        assert_eq!(playback.tick(0), PlaybackAction::DecodeFrame { frame: 0 });
    }

    #[test]
    fn test_timer_boundary() {
        let mut playback = GifPlayback::new(3);
        playback.tick(0);
        playback.frame_uploaded(20);

        assert_eq!(playback.tick(15), PlaybackAction::Idle);
        assert_eq!(playback.remaining_ms(), 5);

        assert_eq!(playback.tick(8), PlaybackAction::DecodeFrame { frame: 1 });
        playback.frame_uploaded(70);
        assert_eq!(playback.remaining_ms(), 70);
        assert_eq!(playback.next_frame(), 2);
    }

    #[test]
    fn test_wraps_around() {
        let mut playback = GifPlayback::new(2);
        for expected in [0, 1, 0, 1] {
            assert_eq!(playback.tick(50), PlaybackAction::DecodeFrame { frame: expected });
            playback.frame_uploaded(10);
        }
    }

    #[test]
    fn test_delay_conversion() {
        assert_eq!(delay_to_ms(0, 1), DEFAULT_DELAY_MS);
        assert_eq!(delay_to_ms(70, 1), 70);
        assert_eq!(delay_to_ms(100, 3), 33);
        assert_eq!(delay_to_ms(5, 0), DEFAULT_DELAY_MS);
    }

    #[test]
    fn test_animation_validates_frames() {
        assert!(GifAnimation::new(2, 2, vec![]).is_err());
        assert!(GifAnimation::new(1, 1, vec![frame(10)]).is_err());

        let animation = GifAnimation::new(4, 4, vec![frame(10), frame(20)]).unwrap();
        assert_eq!(animation.frame(1).unwrap().delay_ms, 20);
        assert!(animation.frame(2).is_err());
    }
}
