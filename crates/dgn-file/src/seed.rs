//! 种子模板
//!
//! 从已有容器复制结构（模型定义、颜色表、层表、单位、元数据），不复制图元。

use crate::catalog::ModelDefinition;
use crate::error::{DgnError, Result};
use crate::native::{self, FileInfo, Structure};
use std::path::{Path, PathBuf};

/// 已加载的种子结构，只能被消费一次
#[derive(Debug, Clone)]
pub(crate) struct SeedTemplate {
    path: PathBuf,
    structure: Structure,
}

impl SeedTemplate {
    /// 读取种子的结构段，任何失败都归为 `SeedUnavailable`
    pub fn load(path: &Path) -> Result<Self> {
        let structure = native::read_structure(path).map_err(|e| DgnError::SeedUnavailable {
            path: path.to_path_buf(),
            source: Box::new(e),
        })?;

        tracing::debug!(
            "Loaded seed {} with {} models",
            path.display(),
            structure.models.len()
        );

        Ok(Self {
            path: path.to_path_buf(),
            structure,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn models(&self) -> &[ModelDefinition] {
        &self.structure.models
    }

    /// 转为新容器的结构：新的 GUID 与时间戳，图元计数器重置，保留默认模型序号
    pub fn into_structure(self) -> Structure {
        let default_model = self.structure.info.default_model;
        Structure {
            info: FileInfo {
                default_model,
                ..FileInfo::fresh()
            },
            ..self.structure
        }
    }
}
