//! DGN 容器文件驱动
//!
//! 读写层次化的二进制 CAD 容器：模型作为图层暴露，图元经 `FeatureCodec`
//! 转换为要素，文件属性作为 `"DGN"` 域的元数据暴露。
//!
//! # 示例
//!
//! ```rust,no_run
//! use dgn_file::{DgnDriver, OpenMode};
//! use dgn_core::{Coord, Feature, Geometry};
//!
//! let driver = DgnDriver::new();
//! let mut container = driver.create("drawing.dgn", &["TITLE=my title"])?;
//!
//! let mut layer = container.create_layer("walls", &["DIM=2"])?;
//! let mut feature = Feature::new(Geometry::Point(Coord::xy(2.0, 3.0)));
//! layer.create_feature(&mut feature)?;
//! container.close()?;
//!
//! let container = driver.open("drawing.dgn", OpenMode::ReadOnly)?;
//! assert_eq!(container.layer(0)?.name(), "walls");
//! # Ok::<(), dgn_file::DgnError>(())
//! ```

pub mod catalog;
pub mod config;
pub mod container;
pub mod error;
pub mod metadata;
mod native;
pub mod options;
pub mod rows;
mod seed;

pub use catalog::{
    Layer, LayerMut, LayerRef, LevelDefinition, LevelTable, Model, ModelCatalog, ModelDefinition,
    Units,
};
pub use config::DriverConfig;
pub use container::{Container, DgnDriver, OpenMode};
pub use error::{DgnError, Result};
pub use metadata::{apply_overrides, DgnMetadata, MetadataKey, METADATA_DOMAIN};
pub use options::{CreateOptions, LayerOptions};
pub use rows::{FieldDefn, FieldType, FieldValue, Row, RowSource, LAYER_FIELDS, STYLE_FIELD};
