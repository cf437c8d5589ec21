//! 图片加载
//!
//! 解码交给 `image`，这里只负责转成 RGBA8。

use std::path::Path;

use tracing::info;

use crate::core::error::{GraphicsError, Result};
use crate::renderer::resource::texture_row_pitch;

/// RGBA8 像素数据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    /// 紧密排列的 RGBA8 像素，行距 `width * 4`
    pub pixels: Vec<u8>,
}

impl ImageData {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 || pixels.len() != expected {
            return Err(GraphicsError::ResourceCreation(format!(
                "{}x{} RGBA8 image needs {} bytes, got {}",
                width,
                height,
                expected,
                pixels.len()
            ))
            .into());
        }
        Ok(Self { width, height, pixels })
    }

    /// 纯色图片
    pub fn solid(width: u32, height: u32, color: [u8; 4]) -> Self {
        let pixels = color.repeat(width as usize * height as usize);
        Self { width, height, pixels }
    }

    /// 上传缓冲中的对齐行距
    pub fn row_pitch(&self) -> u64 {
        texture_row_pitch(self.width)
    }

    /// 上传整张图片所需的字节数
    pub fn upload_size(&self) -> u64 {
        self.row_pitch() * self.height as u64
    }
}

impl From<image::RgbaImage> for ImageData {
    fn from(image: image::RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            pixels: image.into_raw(),
        }
    }
}

/// 从文件加载图片
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<ImageData> {
    let path = path.as_ref();
    let image = image::open(path)?.to_rgba8();
    info!(path = %path.display(), width = image.width(), height = image.height(), "Texture loaded");
    Ok(image.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_size_checked() {
        assert!(ImageData::new(2, 2, vec![0; 16]).is_ok());
        assert!(ImageData::new(2, 2, vec![0; 15]).is_err());
        assert!(ImageData::new(0, 2, vec![]).is_err());
    }

    #[test]
    fn test_solid_and_pitch() {
        let image = ImageData::solid(65, 2, [1, 2, 3, 4]);
        assert_eq!(image.pixels.len(), 65 * 2 * 4);
        assert_eq!(&image.pixels[4..8], &[1, 2, 3, 4]);
        assert_eq!(image.row_pitch(), 512);
        assert_eq!(image.upload_size(), 1024);
    }

    #[test]
    fn test_load_missing_file() {
        assert!(load_image("does/not/exist.png").is_err());
    }
}
