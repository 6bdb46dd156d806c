//! 模型/图层目录
//!
//! 容器中的每个模型对外表现为一个图层。除模型外，这里还有随模型一起
//! 被种子复制的结构性表：层表 (LevelTable) 和单位 (Units)。

use crate::error::{DgnError, Result};
use dgn_core::math::BoundingBox3;
use dgn_core::{
    ColorTable, Dimension, Element, ElementId, Feature, FeatureCodec, FeatureId, DEFAULT_LEVEL,
};
use serde::{Deserialize, Serialize};

/// 层定义
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelDefinition {
    pub number: u32,
    pub name: String,
}

/// 层表
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelTable {
    levels: Vec<LevelDefinition>,
}

impl Default for LevelTable {
    fn default() -> Self {
        Self {
            levels: vec![LevelDefinition {
                number: DEFAULT_LEVEL,
                name: "Default".to_string(),
            }],
        }
    }
}

impl LevelTable {
    pub fn levels(&self) -> &[LevelDefinition] {
        &self.levels
    }

    pub fn get(&self, number: u32) -> Option<&LevelDefinition> {
        self.levels.iter().find(|l| l.number == number)
    }

    /// 确保层号存在，不存在时以 `Level N` 命名登记，返回是否新增
    pub fn ensure(&mut self, number: u32) -> bool {
        if self.get(number).is_some() {
            return false;
        }
        self.levels.push(LevelDefinition {
            number,
            name: format!("Level {}", number),
        });
        true
    }
}

/// 工作单位
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Units {
    pub master_unit: String,
    pub sub_unit: String,
    /// 每主单位包含的子单位数
    pub sub_per_master: f64,
    /// 每子单位包含的分辨率单位数
    pub uor_per_sub: f64,
    pub global_origin: [f64; 3],
}

impl Default for Units {
    fn default() -> Self {
        Self {
            master_unit: "m".to_string(),
            sub_unit: "mm".to_string(),
            sub_per_master: 1000.0,
            uor_per_sub: 1.0,
            global_origin: [0.0; 3],
        }
    }
}

/// 模型定义（不含图元）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDefinition {
    pub name: String,
    pub description: String,
    pub dimension: Dimension,
}

impl ModelDefinition {
    pub fn new(name: impl Into<String>, dimension: Dimension) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            dimension,
        }
    }
}

/// 模型：定义 + 图元序列
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    definition: ModelDefinition,
    elements: Vec<Element>,
}

impl Model {
    pub fn new(definition: ModelDefinition) -> Self {
        Self {
            definition,
            elements: Vec::new(),
        }
    }

    pub(crate) fn with_elements(definition: ModelDefinition, elements: Vec<Element>) -> Self {
        Self {
            definition,
            elements,
        }
    }

    pub fn definition(&self) -> &ModelDefinition {
        &self.definition
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn description(&self) -> &str {
        &self.definition.description
    }

    pub fn dimension(&self) -> Dimension {
        self.definition.dimension
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn feature_count(&self) -> u64 {
        self.elements.len() as u64
    }

    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.elements.iter().find(|e| e.id == id)
    }

    pub fn extent(&self) -> Option<BoundingBox3> {
        self.elements
            .iter()
            .filter_map(Element::range)
            .reduce(|a, b| a.union(&b))
    }
}

/// 图层引用：按序号或名称
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerRef<'a> {
    Index(usize),
    Name(&'a str),
}

impl From<usize> for LayerRef<'_> {
    fn from(index: usize) -> Self {
        LayerRef::Index(index)
    }
}

impl<'a> From<&'a str> for LayerRef<'a> {
    fn from(name: &'a str) -> Self {
        LayerRef::Name(name)
    }
}

impl<'a> From<&'a String> for LayerRef<'a> {
    fn from(name: &'a String) -> Self {
        LayerRef::Name(name)
    }
}

/// 模型目录，按创建顺序保存
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelCatalog {
    models: Vec<Model>,
}

impl ModelCatalog {
    pub(crate) fn from_models(models: Vec<Model>) -> Self {
        Self { models }
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn models(&self) -> &[Model] {
        &self.models
    }

    pub fn get(&self, index: usize) -> Option<&Model> {
        self.models.get(index)
    }

    /// 名称查找不区分大小写
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.models
            .iter()
            .position(|m| m.name() == name)
            .or_else(|| {
                self.models
                    .iter()
                    .position(|m| m.name().eq_ignore_ascii_case(name))
            })
    }

    pub fn resolve(&self, layer: LayerRef<'_>) -> Result<usize> {
        match layer {
            LayerRef::Index(index) if index < self.models.len() => Ok(index),
            LayerRef::Index(index) => Err(DgnError::NotFound(format!("layer index {}", index))),
            LayerRef::Name(name) => self
                .index_of(name)
                .ok_or_else(|| DgnError::NotFound(format!("layer '{}'", name))),
        }
    }

    pub(crate) fn push(&mut self, definition: ModelDefinition) -> Result<usize> {
        if self.index_of(&definition.name).is_some() {
            return Err(DgnError::DuplicateName(definition.name));
        }
        self.models.push(Model::new(definition));
        Ok(self.models.len() - 1)
    }

    /// 在原位置改写模型的名称和描述（接管默认模型）
    pub(crate) fn rename(&mut self, index: usize, name: &str, description: &str) -> Result<()> {
        if let Some(existing) = self.index_of(name) {
            if existing != index {
                return Err(DgnError::DuplicateName(name.to_string()));
            }
        }
        let model = self
            .models
            .get_mut(index)
            .ok_or_else(|| DgnError::NotFound(format!("layer index {}", index)))?;
        model.definition.name = name.to_string();
        model.definition.description = description.to_string();
        Ok(())
    }

    pub(crate) fn model_mut(&mut self, index: usize) -> Option<&mut Model> {
        self.models.get_mut(index)
    }

    pub(crate) fn definitions(&self) -> Vec<ModelDefinition> {
        self.models.iter().map(|m| m.definition.clone()).collect()
    }
}

/// 只读图层视图
#[derive(Debug, Clone, Copy)]
pub struct Layer<'a> {
    index: usize,
    model: &'a Model,
    colors: &'a ColorTable,
    dataset: &'a str,
}

impl<'a> Layer<'a> {
    pub(crate) fn new(index: usize, model: &'a Model, colors: &'a ColorTable, dataset: &'a str) -> Self {
        Self {
            index,
            model,
            colors,
            dataset,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &'a str {
        self.model.name()
    }

    pub fn description(&self) -> &'a str {
        self.model.description()
    }

    pub fn dimension(&self) -> Dimension {
        self.model.dimension()
    }

    /// 所属容器的描述（即容器路径）
    pub fn dataset_description(&self) -> &'a str {
        self.dataset
    }

    pub fn model(&self) -> &'a Model {
        self.model
    }

    pub fn feature_count(&self) -> u64 {
        self.model.feature_count()
    }

    pub fn codec(&self) -> FeatureCodec<'a> {
        FeatureCodec::new(self.colors, self.model.dimension())
    }

    /// 按顺序惰性解码要素
    pub fn features(&self) -> impl Iterator<Item = Feature> + 'a {
        let codec = self.codec();
        self.model.elements.iter().map(move |e| codec.decode(e))
    }

    pub fn feature(&self, fid: FeatureId) -> Option<Feature> {
        self.model.element(fid).map(|e| self.codec().decode(e))
    }

    pub fn extent(&self) -> Option<BoundingBox3> {
        self.model.extent()
    }
}

/// 可写图层视图（仅更新模式）
#[derive(Debug)]
pub struct LayerMut<'a> {
    pub(crate) index: usize,
    pub(crate) model: &'a mut Model,
    pub(crate) colors: &'a ColorTable,
    pub(crate) levels: &'a mut LevelTable,
    pub(crate) next_id: &'a mut ElementId,
    pub(crate) dirty: &'a mut bool,
    pub(crate) dataset: &'a str,
}

impl LayerMut<'_> {
    pub fn as_layer(&self) -> Layer<'_> {
        Layer::new(self.index, &*self.model, self.colors, self.dataset)
    }

    pub fn name(&self) -> &str {
        self.model.name()
    }

    pub fn feature_count(&self) -> u64 {
        self.model.feature_count()
    }

    fn encode(&mut self, feature: &Feature) -> Result<Element> {
        let codec = FeatureCodec::new(self.colors, self.model.dimension());
        let element = codec.encode(feature)?;
        if self.levels.ensure(element.level) {
            tracing::debug!("Registered level {} in level table", element.level);
        }
        Ok(element)
    }

    /// 写入新要素，分配 FID 并回填到要素
    pub fn create_feature(&mut self, feature: &mut Feature) -> Result<FeatureId> {
        let id = *self.next_id;
        let next = id.checked_add(1).ok_or(DgnError::IdExhausted)?;

        let mut element = self.encode(feature)?;
        *self.next_id = next;
        element.id = id;

        self.model.elements.push(element);
        feature.fid = Some(id);
        *self.dirty = true;

        Ok(id)
    }

    /// 按 FID 替换已有要素
    pub fn set_feature(&mut self, feature: &Feature) -> Result<()> {
        let fid = feature
            .fid
            .ok_or_else(|| DgnError::NotFound("feature has no fid".to_string()))?;
        let position = self
            .model
            .elements
            .iter()
            .position(|e| e.id == fid)
            .ok_or_else(|| DgnError::NotFound(format!("feature {}", fid)))?;

        let mut element = self.encode(feature)?;
        element.id = fid;
        self.model.elements[position] = element;
        *self.dirty = true;

        Ok(())
    }

    pub fn delete_feature(&mut self, fid: FeatureId) -> Result<()> {
        let position = self
            .model
            .elements
            .iter()
            .position(|e| e.id == fid)
            .ok_or_else(|| DgnError::NotFound(format!("feature {}", fid)))?;
        self.model.elements.remove(position);
        *self.dirty = true;
        Ok(())
    }
}
