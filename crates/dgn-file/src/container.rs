//! 容器管理
//!
//! `DgnDriver` 负责打开和创建容器，`Container` 持有整个文件的内存表示，
//! 在 flush/close/drop 时整体原子重写。

use crate::catalog::{
    Layer, LayerMut, LayerRef, LevelTable, Model, ModelCatalog, ModelDefinition, Units,
};
use crate::config::DriverConfig;
use crate::error::{DgnError, Result};
use crate::metadata::{apply_overrides, DgnMetadata, MetadataKey, METADATA_DOMAIN};
use crate::native::{self, ContainerImage, FileInfo, Structure};
use crate::options::{CreateOptions, LayerOptions};
use crate::seed::SeedTemplate;
use chrono::{DateTime, Utc};
use dgn_core::{ColorTable, Dimension};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// 打开模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenMode {
    #[default]
    ReadOnly,
    Update,
}

/// 容器驱动
#[derive(Debug, Clone, Default)]
pub struct DgnDriver {
    config: DriverConfig,
}

impl DgnDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: DriverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// 打开已有容器
    pub fn open(&self, path: impl AsRef<Path>, mode: OpenMode) -> Result<Container> {
        let path = path.as_ref();
        let (structure, elements) = native::read(path)?;

        let models = structure
            .models
            .iter()
            .cloned()
            .zip(elements)
            .map(|(definition, elements)| Model::with_elements(definition, elements))
            .collect();

        Ok(Container::assemble(
            path,
            mode,
            structure,
            ModelCatalog::from_models(models),
            false,
            self.config.clone(),
        ))
    }

    /// 以 `KEY=VALUE` 选项列表创建容器
    pub fn create<S: AsRef<str>>(&self, path: impl AsRef<Path>, options: &[S]) -> Result<Container> {
        let options = CreateOptions::parse(options)?;
        self.create_with(path, options)
    }

    /// 创建容器并立即写出合法的初始文件
    ///
    /// 有种子时复制种子结构（不含图元），再逐键应用元数据覆盖。
    pub fn create_with(&self, path: impl AsRef<Path>, options: CreateOptions) -> Result<Container> {
        let path = path.as_ref();
        // 提前失败；真正的不覆盖保证在 write_new 的最后一步
        if path.exists() {
            return Err(DgnError::AlreadyExists(path.to_path_buf()));
        }

        let mut structure = match &options.seed {
            Some(seed) => {
                let template = SeedTemplate::load(seed)?;
                tracing::debug!(
                    "Copying {} models from seed {}",
                    template.models().len(),
                    template.path().display()
                );
                template.into_structure()
            }
            None => self.skeleton(),
        };
        structure.metadata = apply_overrides(&structure.metadata, &options.metadata);

        let catalog = ModelCatalog::from_models(
            structure.models.iter().cloned().map(Model::new).collect(),
        );

        native::write_new(
            path,
            &ContainerImage {
                structure: &structure,
                elements: catalog.models().iter().map(Model::elements).collect(),
            },
            self.config.compression_level,
        )?;

        tracing::info!(
            "Created {} with {} models",
            path.display(),
            catalog.len()
        );

        Ok(Container::assemble(
            path,
            OpenMode::Update,
            structure,
            catalog,
            self.config.adopt_default_model,
            self.config.clone(),
        ))
    }

    /// 无种子时的最小结构：一个默认模型
    fn skeleton(&self) -> Structure {
        Structure {
            info: FileInfo::fresh(),
            metadata: DgnMetadata::default(),
            units: Units::default(),
            colors: ColorTable::default(),
            levels: LevelTable::default(),
            models: vec![ModelDefinition::new(
                self.config.default_model_name.clone(),
                self.config.default_dimension,
            )],
        }
    }
}

/// 已打开的容器
#[derive(Debug)]
pub struct Container {
    path: PathBuf,
    description: String,
    mode: OpenMode,
    info: FileInfo,
    metadata: DgnMetadata,
    units: Units,
    colors: ColorTable,
    levels: LevelTable,
    catalog: ModelCatalog,
    /// 本会话新建的容器，默认模型仍可被第一次建层接管
    adoptable_default: bool,
    dirty: bool,
    closed: bool,
    config: DriverConfig,
}

impl Container {
    fn assemble(
        path: &Path,
        mode: OpenMode,
        structure: Structure,
        catalog: ModelCatalog,
        adoptable_default: bool,
        config: DriverConfig,
    ) -> Self {
        Self {
            path: path.to_path_buf(),
            description: path.display().to_string(),
            mode,
            info: structure.info,
            metadata: structure.metadata,
            units: structure.units,
            colors: structure.colors,
            levels: structure.levels,
            catalog,
            adoptable_default,
            dirty: false,
            closed: false,
            config,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 打开或创建时使用的路径
    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    pub fn guid(&self) -> Uuid {
        self.info.guid
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.info.created_at
    }

    pub fn saved_at(&self) -> DateTime<Utc> {
        self.info.saved_at
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn metadata(&self) -> &DgnMetadata {
        &self.metadata
    }

    /// 读取元数据项，只有 `"DGN"` 域有内容
    pub fn metadata_item(&self, key: &str, domain: &str) -> Option<&str> {
        if domain != METADATA_DOMAIN {
            return None;
        }
        MetadataKey::from_name(key).and_then(|k| self.metadata.get(k))
    }

    /// 以 `KEY=value` 列出元数据
    pub fn metadata_list(&self, domain: &str) -> Vec<String> {
        if domain != METADATA_DOMAIN {
            return Vec::new();
        }
        self.metadata.list()
    }

    pub fn metadata_domains(&self) -> Vec<&'static str> {
        vec![METADATA_DOMAIN]
    }

    pub fn units(&self) -> &Units {
        &self.units
    }

    pub fn color_table(&self) -> &ColorTable {
        &self.colors
    }

    pub fn level_table(&self) -> &LevelTable {
        &self.levels
    }

    pub fn layer_count(&self) -> usize {
        self.catalog.len()
    }

    pub fn layer(&self, index: usize) -> Result<Layer<'_>> {
        let index = self.catalog.resolve(LayerRef::Index(index))?;
        Ok(self.layer_at(index))
    }

    /// 按名称查找图层（不区分大小写）
    pub fn layer_by_name(&self, name: &str) -> Result<Layer<'_>> {
        let index = self.catalog.resolve(LayerRef::Name(name))?;
        Ok(self.layer_at(index))
    }

    /// 按插入顺序枚举图层
    pub fn layers(&self) -> impl Iterator<Item = Layer<'_>> {
        (0..self.catalog.len()).map(move |index| self.layer_at(index))
    }

    fn layer_at(&self, index: usize) -> Layer<'_> {
        Layer::new(
            index,
            &self.catalog.models()[index],
            &self.colors,
            &self.description,
        )
    }

    pub fn layer_mut(&mut self, index: usize) -> Result<LayerMut<'_>> {
        self.ensure_writable()?;
        let index = self.catalog.resolve(LayerRef::Index(index))?;
        self.layer_mut_at(index)
    }

    pub fn layer_mut_by_name(&mut self, name: &str) -> Result<LayerMut<'_>> {
        self.ensure_writable()?;
        let index = self.catalog.resolve(LayerRef::Name(name))?;
        self.layer_mut_at(index)
    }

    /// 创建图层（模型），选项 `DESCRIPTION=`、`DIM=2|3`
    pub fn create_layer<S: AsRef<str>>(&mut self, name: &str, options: &[S]) -> Result<LayerMut<'_>> {
        let options = LayerOptions::parse(options)?;
        self.create_layer_with(name, options)
    }

    pub fn create_layer_with(&mut self, name: &str, options: LayerOptions) -> Result<LayerMut<'_>> {
        self.ensure_writable()?;

        let dimension = options.dimension.unwrap_or(self.config.default_dimension);
        let description = options.description.unwrap_or_default();

        let index = match self.adoptable_model(dimension) {
            Some(index) => {
                self.catalog.rename(index, name, &description)?;
                self.adoptable_default = false;
                tracing::debug!("Layer {} took over the default model", name);
                index
            }
            None => {
                let mut definition = ModelDefinition::new(name, dimension);
                definition.description = description;
                self.catalog.push(definition)?
            }
        };
        self.dirty = true;

        self.layer_mut_at(index)
    }

    /// 默认模型仍为空且维度一致时可被接管
    fn adoptable_model(&self, dimension: Dimension) -> Option<usize> {
        if !self.adoptable_default {
            return None;
        }
        let index = self.info.default_model as usize;
        self.catalog
            .get(index)
            .filter(|m| m.feature_count() == 0 && m.dimension() == dimension)
            .map(|_| index)
    }

    fn layer_mut_at(&mut self, index: usize) -> Result<LayerMut<'_>> {
        let Container {
            catalog,
            colors,
            levels,
            info,
            dirty,
            description,
            ..
        } = self;

        let model = catalog
            .model_mut(index)
            .ok_or_else(|| DgnError::NotFound(format!("layer index {}", index)))?;

        Ok(LayerMut {
            index,
            model,
            colors: &*colors,
            levels,
            next_id: &mut info.next_element_id,
            dirty,
            dataset: description.as_str(),
        })
    }

    fn ensure_writable(&self) -> Result<()> {
        match self.mode {
            OpenMode::Update => Ok(()),
            OpenMode::ReadOnly => Err(DgnError::ReadOnly(self.description.clone())),
        }
    }

    /// 写出未保存的修改
    pub fn flush(&mut self) -> Result<()> {
        if self.mode == OpenMode::ReadOnly || !self.dirty {
            return Ok(());
        }

        let mut info = self.info.clone();
        info.saved_at = Utc::now();

        let structure = Structure {
            info,
            metadata: self.metadata.normalized(),
            units: self.units.clone(),
            colors: self.colors.clone(),
            levels: self.levels.clone(),
            models: self.catalog.definitions(),
        };
        let image = ContainerImage {
            structure: &structure,
            elements: self.catalog.models().iter().map(Model::elements).collect(),
        };
        native::write(&self.path, &image, self.config.compression_level)?;

        self.info = structure.info;
        self.dirty = false;
        Ok(())
    }

    /// 写出修改并关闭容器
    pub fn close(mut self) -> Result<()> {
        let result = self.flush();
        self.closed = true;
        result
    }
}

impl Drop for Container {
    fn drop(&mut self) {
        if self.closed || !self.dirty {
            return;
        }
        if let Err(e) = self.flush() {
            tracing::error!("Failed to flush {} on drop: {}", self.description, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dgn_core::{Coord, Feature, Geometry};

    #[test]
    fn test_create_writes_initial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fresh.dgn");

        let container = DgnDriver::new().create(&path, &["TITLE=title"]).unwrap();
        assert!(path.exists());
        assert_eq!(container.layer_count(), 1);
        assert_eq!(container.layer(0).unwrap().name(), "Default");
        assert_eq!(container.metadata_item("title", "DGN"), Some("title"));
        assert_eq!(container.metadata_item("TITLE", "OTHER"), None);
        assert!(container.metadata_list("").is_empty());
        drop(container);

        let reopened = DgnDriver::new().open(&path, OpenMode::ReadOnly).unwrap();
        assert_eq!(reopened.metadata_list("DGN"), vec!["TITLE=title"]);
    }

    #[test]
    fn test_adopt_default_model_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("adopt.dgn");
        let mut container = DgnDriver::new().create_with(&path, CreateOptions::new()).unwrap();

        container.create_layer("solid", &["DIM=3"]).unwrap();
        container.create_layer("first", &["DESCRIPTION=d"]).unwrap();
        container.create_layer_with("second", LayerOptions::default()).unwrap();

        let names: Vec<_> = container.layers().map(|l| l.name()).collect();
        assert_eq!(names, vec!["first", "solid", "second"]);
        assert_eq!(container.layer_by_name("FIRST").unwrap().description(), "d");
        assert_eq!(container.layer(1).unwrap().dimension(), Dimension::Three);
    }

    #[test]
    fn test_no_adoption_when_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.dgn");
        let config = DriverConfig {
            adopt_default_model: false,
            ..DriverConfig::default()
        };
        let mut container = DgnDriver::with_config(config)
            .create_with(&path, CreateOptions::new())
            .unwrap();
        container.create_layer_with("a", LayerOptions::default()).unwrap();

        let names: Vec<_> = container.layers().map(|l| l.name()).collect();
        assert_eq!(names, vec!["Default", "a"]);
    }

    #[test]
    fn test_flush_then_drop_is_clean() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flush.dgn");
        let mut container = DgnDriver::new().create_with(&path, CreateOptions::new()).unwrap();

        let mut layer = container.layer_mut(0).unwrap();
        let mut feature = Feature::new(Geometry::Point(Coord::xy(1.0, 2.0)));
        layer.create_feature(&mut feature).unwrap();
        assert!(container.is_dirty());

        let created = container.created_at();
        container.flush().unwrap();
        assert!(!container.is_dirty());
        assert!(container.saved_at() >= created);
        drop(container);

        let reopened = DgnDriver::new().open(&path, OpenMode::ReadOnly).unwrap();
        assert_eq!(reopened.layer(0).unwrap().feature_count(), 1);
    }

    #[test]
    fn test_read_only_rejects_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ro.dgn");
        DgnDriver::new()
            .create_with(&path, CreateOptions::new())
            .unwrap()
            .close()
            .unwrap();

        let mut container = DgnDriver::new().open(&path, OpenMode::ReadOnly).unwrap();
        assert!(matches!(container.layer_mut(0), Err(DgnError::ReadOnly(_))));
        assert!(matches!(
            container.create_layer_with("x", LayerOptions::default()),
            Err(DgnError::ReadOnly(_))
        ));
    }
}
