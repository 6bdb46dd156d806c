//! 数学基础类型

use serde::{Deserialize, Serialize};

/// 原生图元使用的三维点（2D 模型中 z 恒为 0）
pub type Point3 = nalgebra::Point3<f64>;

/// 几何比较容差
pub const EPSILON: f64 = 1e-9;

/// 三维包围盒（对应 DGN 图元的 range）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox3 {
    pub min: Point3,
    pub max: Point3,
}

impl BoundingBox3 {
    pub fn new(min: Point3, max: Point3) -> Self {
        Self { min, max }
    }

    /// 由点集计算包围盒，空点集返回 `None`
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Point3>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bbox = Self::new(first, first);
        for p in iter {
            bbox.expand_to(&p);
        }
        Some(bbox)
    }

    /// 扩展以包含指定点
    pub fn expand_to(&mut self, p: &Point3) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    /// 合并两个包围盒
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn contains(&self, p: &Point3) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_from_points() {
        let bbox = BoundingBox3::from_points([
            Point3::new(1.0, 5.0, 0.0),
            Point3::new(-2.0, 3.0, 1.0),
            Point3::new(4.0, 0.0, -1.0),
        ])
        .unwrap();

        assert_eq!(bbox.min, Point3::new(-2.0, 0.0, -1.0));
        assert_eq!(bbox.max, Point3::new(4.0, 5.0, 1.0));
        assert_eq!(bbox.width(), 6.0);
        assert!(bbox.contains(&Point3::new(0.0, 1.0, 0.0)));
    }

    #[test]
    fn test_bbox_empty() {
        assert!(BoundingBox3::from_points(Vec::new()).is_none());
    }
}
