//! 通用行查询接口
//!
//! 图层以固定字段模式输出行，供外部的查询或导出工具消费：
//! `EntityType, Type, Level, GraphicGroup, ColorIndex, Weight, Style`，
//! 另附几何和合成的 `OGR_STYLE` 样式字符串。

use crate::catalog::Layer;
use dgn_core::{ElementColor, FeatureId, Geometry};

/// 样式属性名
pub const STYLE_FIELD: &str = "OGR_STYLE";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Integer,
    String,
}

/// 字段定义
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDefn {
    pub name: &'static str,
    pub field_type: FieldType,
}

impl FieldDefn {
    const fn new(name: &'static str, field_type: FieldType) -> Self {
        Self { name, field_type }
    }
}

/// 图层字段模式
pub const LAYER_FIELDS: [FieldDefn; 7] = [
    FieldDefn::new("EntityType", FieldType::String),
    FieldDefn::new("Type", FieldType::Integer),
    FieldDefn::new("Level", FieldType::Integer),
    FieldDefn::new("GraphicGroup", FieldType::Integer),
    FieldDefn::new("ColorIndex", FieldType::Integer),
    FieldDefn::new("Weight", FieldType::Integer),
    FieldDefn::new("Style", FieldType::Integer),
];

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Integer(i64),
    String(String),
    Null,
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Integer(v) => write!(f, "{}", v),
            FieldValue::String(v) => f.write_str(v),
            FieldValue::Null => Ok(()),
        }
    }
}

/// 一行数据，`values` 与 `LAYER_FIELDS` 一一对应
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub fid: FeatureId,
    pub geometry: Option<Geometry>,
    pub style: Option<String>,
    pub values: Vec<FieldValue>,
}

impl Row {
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        LAYER_FIELDS
            .iter()
            .position(|f| f.name.eq_ignore_ascii_case(name))
            .and_then(|i| self.values.get(i))
    }
}

/// 行数据源
pub trait RowSource {
    fn name(&self) -> &str;

    fn fields(&self) -> &[FieldDefn];

    fn rows(&self) -> Box<dyn Iterator<Item = Row> + '_>;

    fn row_count(&self) -> u64;
}

impl RowSource for Layer<'_> {
    fn name(&self) -> &str {
        Layer::name(self)
    }

    fn fields(&self) -> &[FieldDefn] {
        &LAYER_FIELDS
    }

    fn rows(&self) -> Box<dyn Iterator<Item = Row> + '_> {
        let codec = self.codec();
        let dimension = self.dimension();

        Box::new(self.model().elements().iter().map(move |element| {
            let feature = codec.decode(element);
            let color_index = match element.symbology.color {
                ElementColor::Index(index) => FieldValue::Integer(index as i64),
                ElementColor::True(_) => FieldValue::Null,
            };

            Row {
                fid: element.id,
                geometry: feature.geometry,
                style: feature.style,
                values: vec![
                    FieldValue::String(element.entity_type(dimension)),
                    FieldValue::Integer(element.type_code() as i64),
                    FieldValue::Integer(element.level as i64),
                    FieldValue::Integer(element.graphic_group as i64),
                    color_index,
                    FieldValue::Integer(element.symbology.weight as i64),
                    FieldValue::Integer(element.symbology.line_style.code() as i64),
                ],
            }
        }))
    }

    fn row_count(&self) -> u64 {
        self.feature_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Model, ModelDefinition};
    use dgn_core::math::Point3;
    use dgn_core::{ColorTable, Dimension, Element, ElementKind, Rgb, Symbology};

    #[test]
    fn test_point_row() {
        let colors = ColorTable::default();
        let mut element = Element::new(7, ElementKind::Point(Point3::new(0.0, 1.0, 0.0)));
        element.symbology = Symbology::with_color(ElementColor::True(Rgb::new(1, 2, 3)));
        let model = Model::with_elements(
            ModelDefinition::new("points", Dimension::Two),
            vec![element],
        );
        let layer = Layer::new(0, &model, &colors, "memory.dgn");

        let rows: Vec<Row> = layer.rows().collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(layer.row_count(), 1);

        let row = &rows[0];
        assert_eq!(row.fid, 7);
        assert_eq!(row.get("EntityType"), Some(&FieldValue::String("Line2d".into())));
        assert_eq!(row.get("type"), Some(&FieldValue::Integer(3)));
        assert_eq!(row.get("Level"), Some(&FieldValue::Integer(64)));
        assert_eq!(row.get("ColorIndex"), Some(&FieldValue::Null));
        assert_eq!(row.get("Missing"), None);
        assert_eq!(
            row.style.as_deref(),
            Some(r#"PEN(id:"ogr-pen-0",c:#010203)"#)
        );
    }
}
