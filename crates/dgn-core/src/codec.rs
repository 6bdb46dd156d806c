//! 要素编解码
//!
//! 原生图元 ⇄ 抽象要素的双向转换：
//!
//! | 图元    | 几何                 |
//! |---------|----------------------|
//! | Point   | Point                |
//! | Line    | LineString           |
//! | Shape   | Polygon              |
//! | Cell    | GeometryCollection   |
//!
//! 对支持的子集，`decode(encode(f)) == f`。无法表示的几何或符号学在编码时
//! 直接报错，不做强制转换。

use crate::element::{Element, ElementKind};
use crate::feature::Feature;
use crate::geometry::{Coord, Dimension, Geometry};
use crate::math::Point3;
use crate::properties::{ColorTable, Symbology};
use crate::style::{self, StyleError};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodecError {
    #[error("Unsupported geometry: {0}")]
    UnsupportedGeometry(String),

    #[error("Unsupported symbology: {0}")]
    UnsupportedSymbology(String),
}

impl From<StyleError> for CodecError {
    fn from(error: StyleError) -> Self {
        CodecError::UnsupportedSymbology(error.to_string())
    }
}

/// 要素编解码器
///
/// 绑定容器的颜色表和模型维度。
#[derive(Debug, Clone, Copy)]
pub struct FeatureCodec<'a> {
    colors: &'a ColorTable,
    dimension: Dimension,
}

impl<'a> FeatureCodec<'a> {
    pub fn new(colors: &'a ColorTable, dimension: Dimension) -> Self {
        Self { colors, dimension }
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    /// 图元 → 要素
    pub fn decode(&self, element: &Element) -> Feature {
        Feature {
            fid: Some(element.id),
            geometry: Some(self.decode_geometry(&element.kind)),
            style: Some(style::format_style(&element.symbology, self.colors)),
            level: element.level,
            graphic_group: element.graphic_group,
        }
    }

    fn decode_geometry(&self, kind: &ElementKind) -> Geometry {
        let coord = |p: &Point3| Coord::from_point3(p, self.dimension);
        match kind {
            ElementKind::Point(p) => Geometry::Point(coord(p)),
            ElementKind::Line(points) => Geometry::LineString(points.iter().map(coord).collect()),
            ElementKind::Shape(rings) => Geometry::Polygon(
                rings
                    .iter()
                    .map(|ring| ring.iter().map(coord).collect())
                    .collect(),
            ),
            ElementKind::Cell(children) => Geometry::GeometryCollection(
                children
                    .iter()
                    .map(|child| self.decode_geometry(&child.kind))
                    .collect(),
            ),
        }
    }

    /// 要素 → 图元
    ///
    /// 图元 ID 取要素 FID（没有时为 0，由调用方分配）。
    pub fn encode(&self, feature: &Feature) -> Result<Element, CodecError> {
        let geometry = feature.geometry.as_ref().ok_or_else(|| {
            CodecError::UnsupportedGeometry("feature has no geometry".to_string())
        })?;

        if self.dimension == Dimension::Two && geometry.is_3d() {
            return Err(CodecError::UnsupportedGeometry(format!(
                "{} with Z values cannot be written to a 2D model",
                geometry.type_name()
            )));
        }

        let symbology = match feature.style.as_deref() {
            Some(text) => style::parse_symbology(text, self.colors)?,
            None => Symbology::default(),
        };

        let mut kind = self.encode_geometry(geometry)?;

        if symbology.fill.is_some() && !supports_fill(&kind) {
            return Err(CodecError::UnsupportedSymbology(format!(
                "fill is not supported on {} geometry",
                geometry.type_name()
            )));
        }

        propagate(&mut kind, &symbology, feature.level, feature.graphic_group);

        Ok(Element {
            id: feature.fid.unwrap_or(0),
            level: feature.level,
            graphic_group: feature.graphic_group,
            symbology,
            kind,
        })
    }

    fn encode_geometry(&self, geometry: &Geometry) -> Result<ElementKind, CodecError> {
        match geometry {
            Geometry::Point(c) => Ok(ElementKind::Point(point(c)?)),

            Geometry::LineString(cs) => {
                if cs.len() < 2 {
                    return Err(CodecError::UnsupportedGeometry(format!(
                        "LINESTRING needs at least 2 vertices, got {}",
                        cs.len()
                    )));
                }
                Ok(ElementKind::Line(points(cs)?))
            }

            Geometry::Polygon(rings) => {
                if rings.is_empty() {
                    return Err(CodecError::UnsupportedGeometry(
                        "empty POLYGON".to_string(),
                    ));
                }
                let mut native = Vec::with_capacity(rings.len());
                for ring in rings {
                    if ring.len() < 4 || ring.first() != ring.last() {
                        return Err(CodecError::UnsupportedGeometry(
                            "POLYGON rings must be closed and have at least 4 vertices"
                                .to_string(),
                        ));
                    }
                    native.push(points(ring)?);
                }
                Ok(ElementKind::Shape(native))
            }

            Geometry::GeometryCollection(parts) => {
                if parts.is_empty() {
                    return Err(CodecError::UnsupportedGeometry(
                        "empty GEOMETRYCOLLECTION".to_string(),
                    ));
                }
                let children = parts
                    .iter()
                    .map(|part| Ok(Element::new(0, self.encode_geometry(part)?)))
                    .collect::<Result<Vec<_>, CodecError>>()?;
                Ok(ElementKind::Cell(children))
            }

            Geometry::MultiPoint(_) | Geometry::MultiLineString(_) | Geometry::MultiPolygon(_) => {
                Err(CodecError::UnsupportedGeometry(format!(
                    "{} has no native representation",
                    geometry.type_name()
                )))
            }
        }
    }
}

fn point(c: &Coord) -> Result<Point3, CodecError> {
    if !c.is_finite() {
        return Err(CodecError::UnsupportedGeometry(
            "non-finite coordinate".to_string(),
        ));
    }
    Ok(c.to_point3())
}

fn points(cs: &[Coord]) -> Result<Vec<Point3>, CodecError> {
    cs.iter().map(point).collect()
}

fn supports_fill(kind: &ElementKind) -> bool {
    match kind {
        ElementKind::Shape(_) => true,
        ElementKind::Cell(children) => children.iter().any(|c| supports_fill(&c.kind)),
        ElementKind::Point(_) | ElementKind::Line(_) => false,
    }
}

/// 单元的子图元继承单元头的符号学（填充只给面）
fn propagate(kind: &mut ElementKind, symbology: &Symbology, level: u32, graphic_group: u32) {
    if let ElementKind::Cell(children) = kind {
        for child in children {
            child.level = level;
            child.graphic_group = graphic_group;
            child.symbology = Symbology {
                fill: if supports_fill(&child.kind) {
                    symbology.fill
                } else {
                    None
                },
                ..*symbology
            };
            propagate(&mut child.kind, symbology, level, graphic_group);
        }
    }
}
