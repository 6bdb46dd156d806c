//! DGN 核心模型
//!
//! 提供容器内部的原生图元与抽象要素两套模型，以及二者之间的编解码。
//!
//! # 架构设计
//!
//! - `Element`: 原生图元（点、线、面、单元）+ 符号学（颜色、线宽、线型）
//! - `Feature`: 抽象要素（几何 + 样式描述字符串）
//! - `FeatureCodec`: 两者之间的无损双向转换
//!
//! # 示例
//!
//! ```rust
//! use dgn_core::prelude::*;
//!
//! let colors = ColorTable::default();
//! let codec = FeatureCodec::new(&colors, Dimension::Two);
//!
//! let feature = Feature::new(Geometry::Point(Coord::xy(0.0, 1.0)));
//! let element = codec.encode(&feature).unwrap();
//! let decoded = codec.decode(&element);
//!
//! assert_eq!(decoded.geometry.unwrap().to_wkt(), "POINT (0 1)");
//! ```

pub mod codec;
pub mod element;
pub mod feature;
pub mod geometry;
pub mod math;
pub mod properties;
pub mod style;
pub mod wkt;

pub use codec::{CodecError, FeatureCodec};
pub use element::{Element, ElementId, ElementKind};
pub use feature::{Feature, FeatureId, DEFAULT_LEVEL};
pub use geometry::{Coord, Dimension, Geometry};
pub use properties::{ColorTable, ElementColor, LineStyle, Rgb, Symbology};
pub use style::StyleError;
pub use wkt::WktError;

pub mod prelude {
    //! 常用类型的便捷导入
    pub use crate::codec::{CodecError, FeatureCodec};
    pub use crate::element::{Element, ElementId, ElementKind};
    pub use crate::feature::{Feature, FeatureId, DEFAULT_LEVEL};
    pub use crate::geometry::{Coord, Dimension, Geometry};
    pub use crate::math::{BoundingBox3, Point3, EPSILON};
    pub use crate::properties::{ColorTable, ElementColor, LineStyle, Rgb, Symbology};
}
