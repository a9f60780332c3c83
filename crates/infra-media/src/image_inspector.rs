// ImageInspector backed by the image crate (header-only reads)

use contentforge_core::error::{AppError, Result};
use contentforge_core::port::ImageInspector;
use std::path::Path;

#[derive(Debug, Default, Clone, Copy)]
pub struct FileImageInspector;

impl ImageInspector for FileImageInspector {
    fn dimensions(&self, path: &Path) -> Result<(u32, u32)> {
        image::image_dimensions(path).map_err(|e| AppError::Execution(e.to_string()))
    }
}
