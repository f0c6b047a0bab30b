//! `[images]` section configuration.
//!
//! ```toml
//! [images]
//! jpeg_quality = 82
//! ```

use serde::{Deserialize, Serialize};

use crate::config::ConfigDiagnostics;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImagesConfig {
    /// JPEG re-encode quality, 1-100.
    pub jpeg_quality: u8,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self { jpeg_quality: 82 }
    }
}

impl ImagesConfig {
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if !(1..=100).contains(&self.jpeg_quality) {
            diag.error(
                "images.jpeg_quality",
                format!("quality {} is outside 1-100", self.jpeg_quality),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::test_parse_config;

    #[test]
    fn test_images_config() {
        assert_eq!(test_parse_config("").images.jpeg_quality, 82);
        let config = test_parse_config("[images]\njpeg_quality = 60");
        assert_eq!(config.images.jpeg_quality, 60);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_images_config_quality_range() {
        let config = test_parse_config("[images]\njpeg_quality = 0");
        assert!(config.validate().is_err());
    }
}
