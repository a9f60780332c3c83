// Image Inspector Port (used by the reviewer)

use crate::error::Result;
use std::path::Path;

pub trait ImageInspector: Send + Sync {
    /// (width, height) in pixels, read from the file header
    fn dimensions(&self, path: &Path) -> Result<(u32, u32)>;
}

pub mod mocks {
    use super::*;
    use std::collections::HashMap;

    /// Fixed size for every image, with per-file-name overrides
    pub struct FixedImageInspector {
        default: (u32, u32),
        overrides: HashMap<String, (u32, u32)>,
    }

    impl FixedImageInspector {
        pub fn new(default: (u32, u32)) -> Self {
            Self {
                default,
                overrides: HashMap::new(),
            }
        }

        pub fn with_override(mut self, file_name: &str, size: (u32, u32)) -> Self {
            self.overrides.insert(file_name.to_string(), size);
            self
        }
    }

    impl ImageInspector for FixedImageInspector {
        fn dimensions(&self, path: &Path) -> Result<(u32, u32)> {
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default();
            Ok(self.overrides.get(name).copied().unwrap_or(self.default))
        }
    }
}
