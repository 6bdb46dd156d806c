//! 原生图元
//!
//! 容器磁盘上的基本单元。图元种类是封闭集合 {点, 线, 面, 单元}，
//! 单元 (Cell) 是图元的分组，可嵌套。

use crate::geometry::Dimension;
use crate::math::{BoundingBox3, Point3};
use crate::properties::Symbology;
use serde::{Deserialize, Serialize};

/// 图元 ID（容器内唯一，同时作为要素 FID）
pub type ElementId = u64;

/// 原生图元类型代码
pub mod type_code {
    pub const CELL_HEADER: u8 = 2;
    pub const LINE: u8 = 3;
    pub const LINE_STRING: u8 = 4;
    pub const SHAPE: u8 = 6;
}

/// 图元种类
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ElementKind {
    /// 点（磁盘上是零长度线）
    Point(Point3),
    /// 线 / 线串
    Line(Vec<Point3>),
    /// 面：第一个环为外环，其余为洞
    Shape(Vec<Vec<Point3>>),
    /// 单元：子图元分组
    Cell(Vec<Element>),
}

/// 原生图元
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: ElementId,
    pub level: u32,
    pub graphic_group: u32,
    pub symbology: Symbology,
    pub kind: ElementKind,
}

impl Element {
    pub fn new(id: ElementId, kind: ElementKind) -> Self {
        Self {
            id,
            level: crate::feature::DEFAULT_LEVEL,
            graphic_group: 0,
            symbology: Symbology::default(),
            kind,
        }
    }

    /// 原生类型代码
    pub fn type_code(&self) -> u8 {
        match &self.kind {
            ElementKind::Point(_) => type_code::LINE,
            ElementKind::Line(points) if points.len() == 2 => type_code::LINE,
            ElementKind::Line(_) => type_code::LINE_STRING,
            ElementKind::Shape(_) => type_code::SHAPE,
            ElementKind::Cell(_) => type_code::CELL_HEADER,
        }
    }

    /// 原生实体类型名称，例如 `Line2d`、`CellHeader3d`
    pub fn entity_type(&self, dimension: Dimension) -> String {
        let base = match &self.kind {
            ElementKind::Point(_) => "Line",
            ElementKind::Line(points) if points.len() == 2 => "Line",
            ElementKind::Line(_) => "LineString",
            ElementKind::Shape(rings) if rings.len() > 1 => "ComplexShape",
            ElementKind::Shape(_) => "Shape",
            ElementKind::Cell(_) => "CellHeader",
        };
        format!("{}{}d", base, dimension.as_u8())
    }

    /// 图元范围
    pub fn range(&self) -> Option<BoundingBox3> {
        match &self.kind {
            ElementKind::Point(p) => Some(BoundingBox3::new(*p, *p)),
            ElementKind::Line(points) => BoundingBox3::from_points(points.iter().copied()),
            ElementKind::Shape(rings) => {
                BoundingBox3::from_points(rings.iter().flatten().copied())
            }
            ElementKind::Cell(children) => children
                .iter()
                .filter_map(Element::range)
                .reduce(|a, b| a.union(&b)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_codes() {
        let point = Element::new(1, ElementKind::Point(Point3::new(0.0, 1.0, 0.0)));
        let line = Element::new(
            2,
            ElementKind::Line(vec![Point3::origin(), Point3::new(1.0, 1.0, 0.0)]),
        );
        let cell = Element::new(3, ElementKind::Cell(vec![point.clone(), line.clone()]));

        assert_eq!(point.type_code(), type_code::LINE);
        assert_eq!(line.entity_type(Dimension::Two), "Line2d");
        assert_eq!(cell.type_code(), type_code::CELL_HEADER);
        assert_eq!(cell.entity_type(Dimension::Three), "CellHeader3d");
    }

    #[test]
    fn test_cell_range() {
        let cell = Element::new(
            1,
            ElementKind::Cell(vec![
                Element::new(2, ElementKind::Point(Point3::new(-1.0, 0.0, 0.0))),
                Element::new(3, ElementKind::Point(Point3::new(5.0, 2.0, 0.0))),
            ]),
        );
        let range = cell.range().unwrap();
        assert_eq!(range.width(), 6.0);
        assert_eq!(range.height(), 2.0);
    }
}
