//! 创建选项解析
//!
//! 选项以 `KEY=VALUE` 字符串列表给出，键不区分大小写。
//! 未识别的键、缺少 `=` 的项以及重复的键都会被拒绝。

use crate::error::{DgnError, Result};
use crate::metadata::{DgnMetadata, MetadataKey};
use dgn_core::Dimension;
use std::collections::HashSet;
use std::path::PathBuf;

/// 解析 `KEY=VALUE` 列表，键统一转为大写
pub fn parse_key_values<S: AsRef<str>>(options: &[S]) -> Result<Vec<(String, String)>> {
    let mut seen = HashSet::new();
    let mut pairs = Vec::with_capacity(options.len());

    for option in options {
        let option = option.as_ref();
        let (key, value) = option.split_once('=').ok_or_else(|| {
            DgnError::InvalidOption(format!("'{}' is not in KEY=VALUE form", option))
        })?;

        let key = key.trim().to_ascii_uppercase();
        if key.is_empty() {
            return Err(DgnError::InvalidOption(format!("'{}' has an empty key", option)));
        }
        if !seen.insert(key.clone()) {
            return Err(DgnError::InvalidOption(format!("{} given more than once", key)));
        }

        pairs.push((key, value.to_string()));
    }

    Ok(pairs)
}

/// 容器创建选项
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateOptions {
    /// 种子文件
    pub seed: Option<PathBuf>,
    /// 元数据覆盖集
    pub metadata: DgnMetadata,
}

impl CreateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse<S: AsRef<str>>(options: &[S]) -> Result<Self> {
        let mut parsed = Self::default();

        for (key, value) in parse_key_values(options)? {
            if key == "SEED" {
                if value.trim().is_empty() {
                    return Err(DgnError::InvalidOption("SEED requires a path".to_string()));
                }
                parsed.seed = Some(PathBuf::from(value));
            } else if let Some(md_key) = MetadataKey::from_name(&key) {
                parsed.metadata.set(md_key, value);
            } else {
                return Err(DgnError::InvalidOption(format!(
                    "unrecognized creation option {}",
                    key
                )));
            }
        }

        Ok(parsed)
    }

    pub fn with_seed(mut self, seed: impl Into<PathBuf>) -> Self {
        self.seed = Some(seed.into());
        self
    }

    pub fn with_metadata(mut self, key: MetadataKey, value: impl Into<String>) -> Self {
        self.metadata.set(key, value);
        self
    }
}

/// 图层创建选项
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerOptions {
    pub description: Option<String>,
    /// 未指定时使用驱动配置的默认维度
    pub dimension: Option<Dimension>,
}

impl LayerOptions {
    pub fn parse<S: AsRef<str>>(options: &[S]) -> Result<Self> {
        let mut parsed = Self::default();

        for (key, value) in parse_key_values(options)? {
            match key.as_str() {
                "DESCRIPTION" => parsed.description = Some(value),
                "DIM" => {
                    let dimension = Dimension::from_option(&value).ok_or_else(|| {
                        DgnError::InvalidOption(format!("DIM must be 2 or 3, got '{}'", value))
                    })?;
                    parsed.dimension = Some(dimension);
                }
                _ => {
                    return Err(DgnError::InvalidOption(format!(
                        "unrecognized layer option {}",
                        key
                    )))
                }
            }
        }

        Ok(parsed)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_dimension(mut self, dimension: Dimension) -> Self {
        self.dimension = Some(dimension);
        self
    }
}
