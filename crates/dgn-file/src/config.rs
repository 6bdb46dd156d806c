//! 驱动配置

use crate::error::Result;
use dgn_core::Dimension;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 驱动配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Zstd 压缩级别（1-22）
    pub compression_level: i32,
    /// 未指定 `DIM` 时新图层的维度
    pub default_dimension: Dimension,
    /// 新建容器中默认模型的名称
    pub default_model_name: String,
    /// 新建容器的第一次建层是否接管空的默认模型
    pub adopt_default_model: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            compression_level: 3,
            default_dimension: Dimension::Two,
            default_model_name: "Default".to_string(),
            adopt_default_model: true,
        }
    }
}

impl DriverConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json() {
        let config = DriverConfig::from_json_str(r#"{ "compression_level": 9 }"#).unwrap();
        assert_eq!(config.compression_level, 9);
        assert_eq!(config.default_model_name, "Default");
        assert!(config.adopt_default_model);
    }

    #[test]
    fn test_dimension_json() {
        let config = DriverConfig::from_json_str(r#"{ "default_dimension": "Three" }"#).unwrap();
        assert_eq!(config.default_dimension, Dimension::Three);
        assert!(DriverConfig::from_json_str("not json").is_err());
    }
}
