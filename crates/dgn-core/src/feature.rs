//! 抽象要素

use crate::geometry::Geometry;
use serde::{Deserialize, Serialize};

/// 要素 ID（等于图元 ID）
pub type FeatureId = u64;

/// 默认层号
pub const DEFAULT_LEVEL: u32 = 64;

/// 要素：几何 + 样式描述 + 原生属性
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub fid: Option<FeatureId>,
    pub geometry: Option<Geometry>,
    /// 样式描述字符串，例如 `PEN(id:"ogr-pen-0",c:#ff0000,w:2px)`
    pub style: Option<String>,
    pub level: u32,
    pub graphic_group: u32,
}

impl Feature {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            fid: None,
            geometry: Some(geometry),
            style: None,
            level: DEFAULT_LEVEL,
            graphic_group: 0,
        }
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    pub fn with_level(mut self, level: u32) -> Self {
        self.level = level;
        self
    }

    pub fn with_graphic_group(mut self, graphic_group: u32) -> Self {
        self.graphic_group = graphic_group;
        self
    }

    pub fn with_fid(mut self, fid: FeatureId) -> Self {
        self.fid = Some(fid);
        self
    }
}
