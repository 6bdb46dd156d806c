//! 要素几何
//!
//! 抽象层使用的几何类型，与 WKT 一一对应：
//! - 点 (Point)
//! - 线串 (LineString)
//! - 多边形 (Polygon)
//! - 多点/多线/多面 (Multi*)
//! - 几何集合 (GeometryCollection)
//!
//! 其中多点/多线/多面在原生图元中没有对应表示，编码时会被拒绝。

use crate::math::{BoundingBox3, Point3};
use serde::{Deserialize, Serialize};

/// 模型坐标维度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Dimension {
    #[default]
    Two,
    Three,
}

impl Dimension {
    /// 从 `DIM` 选项值解析（仅接受 "2" / "3"）
    pub fn from_option(value: &str) -> Option<Self> {
        match value.trim() {
            "2" => Some(Dimension::Two),
            "3" => Some(Dimension::Three),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Dimension::Two => 2,
            Dimension::Three => 3,
        }
    }

    pub fn is_3d(self) -> bool {
        self == Dimension::Three
    }
}

/// 坐标（z 为空表示二维坐标）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coord {
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,
}

impl Coord {
    pub fn xy(x: f64, y: f64) -> Self {
        Self { x, y, z: None }
    }

    pub fn xyz(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z: Some(z) }
    }

    /// 由原生点构造，按维度决定是否保留 z
    pub fn from_point3(p: &Point3, dimension: Dimension) -> Self {
        match dimension {
            Dimension::Two => Self::xy(p.x, p.y),
            Dimension::Three => Self::xyz(p.x, p.y, p.z),
        }
    }

    /// 转换为原生点，缺失的 z 取 0
    pub fn to_point3(&self) -> Point3 {
        Point3::new(self.x, self.y, self.z.unwrap_or(0.0))
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.map_or(true, f64::is_finite)
    }

    fn approx_eq(&self, other: &Coord, tolerance: f64) -> bool {
        let z_eq = match (self.z, other.z) {
            (None, None) => true,
            (Some(a), Some(b)) => (a - b).abs() <= tolerance,
            _ => false,
        };
        (self.x - other.x).abs() <= tolerance && (self.y - other.y).abs() <= tolerance && z_eq
    }
}

/// 几何类型枚举
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Geometry {
    Point(Coord),
    LineString(Vec<Coord>),
    /// 第一个环为外环，其余为内环（洞）
    Polygon(Vec<Vec<Coord>>),
    MultiPoint(Vec<Coord>),
    MultiLineString(Vec<Vec<Coord>>),
    MultiPolygon(Vec<Vec<Vec<Coord>>>),
    GeometryCollection(Vec<Geometry>),
}

impl Geometry {
    /// 获取几何的类型名称（WKT 关键字）
    pub fn type_name(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "POINT",
            Geometry::LineString(_) => "LINESTRING",
            Geometry::Polygon(_) => "POLYGON",
            Geometry::MultiPoint(_) => "MULTIPOINT",
            Geometry::MultiLineString(_) => "MULTILINESTRING",
            Geometry::MultiPolygon(_) => "MULTIPOLYGON",
            Geometry::GeometryCollection(_) => "GEOMETRYCOLLECTION",
        }
    }

    /// 遍历全部坐标
    pub fn for_each_coord<F: FnMut(&Coord)>(&self, f: &mut F) {
        match self {
            Geometry::Point(c) => f(c),
            Geometry::LineString(cs) | Geometry::MultiPoint(cs) => cs.iter().for_each(|c| f(c)),
            Geometry::Polygon(rings) | Geometry::MultiLineString(rings) => {
                rings.iter().flatten().for_each(|c| f(c))
            }
            Geometry::MultiPolygon(polygons) => {
                polygons.iter().flatten().flatten().for_each(|c| f(c))
            }
            Geometry::GeometryCollection(parts) => {
                for part in parts {
                    part.for_each_coord(f);
                }
            }
        }
    }

    /// 是否含有 z 值
    pub fn is_3d(&self) -> bool {
        let mut has_z = false;
        self.for_each_coord(&mut |c| has_z |= c.z.is_some());
        has_z
    }

    /// 是否没有任何坐标
    pub fn is_empty(&self) -> bool {
        let mut count = 0usize;
        self.for_each_coord(&mut |_| count += 1);
        count == 0
    }

    pub fn bounding_box(&self) -> Option<BoundingBox3> {
        let mut points = Vec::new();
        self.for_each_coord(&mut |c| points.push(c.to_point3()));
        BoundingBox3::from_points(points)
    }

    /// 带容差的几何相等（结构相同且坐标在容差内）
    pub fn equals_approx(&self, other: &Geometry, tolerance: f64) -> bool {
        fn seq_eq(a: &[Coord], b: &[Coord], tol: f64) -> bool {
            a.len() == b.len() && a.iter().zip(b).all(|(p, q)| p.approx_eq(q, tol))
        }
        fn rings_eq(a: &[Vec<Coord>], b: &[Vec<Coord>], tol: f64) -> bool {
            a.len() == b.len() && a.iter().zip(b).all(|(p, q)| seq_eq(p, q, tol))
        }

        match (self, other) {
            (Geometry::Point(a), Geometry::Point(b)) => a.approx_eq(b, tolerance),
            (Geometry::LineString(a), Geometry::LineString(b))
            | (Geometry::MultiPoint(a), Geometry::MultiPoint(b)) => seq_eq(a, b, tolerance),
            (Geometry::Polygon(a), Geometry::Polygon(b))
            | (Geometry::MultiLineString(a), Geometry::MultiLineString(b)) => {
                rings_eq(a, b, tolerance)
            }
            (Geometry::MultiPolygon(a), Geometry::MultiPolygon(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(p, q)| rings_eq(p, q, tolerance))
            }
            (Geometry::GeometryCollection(a), Geometry::GeometryCollection(b)) => {
                a.len() == b.len()
                    && a.iter().zip(b).all(|(p, q)| p.equals_approx(q, tolerance))
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_option() {
        assert_eq!(Dimension::from_option("2"), Some(Dimension::Two));
        assert_eq!(Dimension::from_option(" 3 "), Some(Dimension::Three));
        assert_eq!(Dimension::from_option("4"), None);
        assert_eq!(Dimension::Three.as_u8(), 3);
    }

    #[test]
    fn test_is_3d() {
        let flat = Geometry::LineString(vec![Coord::xy(0.0, 0.0), Coord::xy(1.0, 1.0)]);
        let raised = Geometry::GeometryCollection(vec![
            flat.clone(),
            Geometry::Point(Coord::xyz(1.0, 2.0, 3.0)),
        ]);
        assert!(!flat.is_3d());
        assert!(raised.is_3d());
    }

    #[test]
    fn test_equals_approx() {
        let a = Geometry::Point(Coord::xy(0.0, 1.0));
        let b = Geometry::Point(Coord::xy(0.0, 1.0 + 1e-12));
        let c = Geometry::Point(Coord::xyz(0.0, 1.0, 0.0));
        assert!(a.equals_approx(&b, 1e-9));
        assert!(!a.equals_approx(&c, 1e-9));
        assert!(!a.equals_approx(&Geometry::MultiPoint(vec![Coord::xy(0.0, 1.0)]), 1e-9));
    }

    #[test]
    fn test_bounding_box() {
        let polygon = Geometry::Polygon(vec![vec![
            Coord::xy(0.0, 0.0),
            Coord::xy(4.0, 0.0),
            Coord::xy(4.0, 2.0),
            Coord::xy(0.0, 0.0),
        ]]);
        let bbox = polygon.bounding_box().unwrap();
        assert_eq!(bbox.width(), 4.0);
        assert_eq!(bbox.height(), 2.0);
        assert!(Geometry::LineString(Vec::new()).bounding_box().is_none());
    }
}
