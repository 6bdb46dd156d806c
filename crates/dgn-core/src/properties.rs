//! 图元符号学：颜色、线宽、线型
//!
//! DGN 图元的颜色通常是 256 色颜色表中的索引，也可以是真彩色。
//! 线宽取值 0-31，线型为 0-7 的标准线型代码。

use serde::{Deserialize, Serialize};

/// 最大线宽
pub const MAX_WEIGHT: u8 = 31;

/// 颜色表条目数
pub const COLOR_TABLE_SIZE: usize = 256;

/// RGB 颜色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    /// 输出为 `#rrggbb`（小写）
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// 解析不透明颜色 `#rrggbb` 或 `#rrggbbff`
    pub fn from_hex(text: &str) -> Option<Self> {
        match Self::from_hex_rgba(text)? {
            (rgb, 0xff) => Some(rgb),
            _ => None,
        }
    }

    /// 解析 `#rrggbb` 或 `#rrggbbaa`，同时返回透明度（缺省为 0xff）
    pub fn from_hex_rgba(text: &str) -> Option<(Self, u8)> {
        let hex = text.trim().strip_prefix('#')?;
        if !(hex.len() == 6 || hex.len() == 8) || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        let alpha = if hex.len() == 8 { channel(6)? } else { 0xff };
        Some((Self::new(channel(0)?, channel(2)?, channel(4)?), alpha))
    }
}

/// 图元颜色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElementColor {
    /// 颜色表索引
    Index(u8),
    /// 真彩色
    True(Rgb),
}

impl Default for ElementColor {
    fn default() -> Self {
        ElementColor::Index(0)
    }
}

/// 256 色颜色表
///
/// 与容器一起持久化，种子复制时原样拷贝。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorTable {
    entries: Vec<Rgb>,
}

impl Default for ColorTable {
    /// 默认颜色表：前 16 色为标准色，其后为 6x6x6 色立方与灰度渐变
    fn default() -> Self {
        let mut entries = vec![
            Rgb::new(255, 255, 255), // 0 白
            Rgb::new(0, 0, 255),     // 1 蓝
            Rgb::new(0, 255, 0),     // 2 绿
            Rgb::new(255, 0, 0),     // 3 红
            Rgb::new(255, 255, 0),   // 4 黄
            Rgb::new(255, 0, 255),   // 5 紫
            Rgb::new(255, 127, 0),   // 6 橙
            Rgb::new(0, 255, 255),   // 7 青
            Rgb::new(64, 64, 64),    // 8 深灰
            Rgb::new(192, 192, 192), // 9 浅灰
            Rgb::new(127, 0, 0),
            Rgb::new(0, 127, 0),
            Rgb::new(0, 0, 127),
            Rgb::new(127, 127, 0),
            Rgb::new(127, 0, 127),
            Rgb::new(0, 127, 127),
        ];

        const LEVELS: [u8; 6] = [0, 51, 102, 153, 204, 255];
        for r in LEVELS {
            for g in LEVELS {
                for b in LEVELS {
                    entries.push(Rgb::new(r, g, b));
                }
            }
        }

        while entries.len() < COLOR_TABLE_SIZE {
            let step = (entries.len() - 232) as u8;
            let v = step.saturating_mul(10).saturating_add(8);
            entries.push(Rgb::new(v, v, v));
        }

        Self { entries }
    }
}

impl ColorTable {
    /// 从条目构造，长度必须为 256
    pub fn from_entries(entries: Vec<Rgb>) -> Option<Self> {
        (entries.len() == COLOR_TABLE_SIZE).then_some(Self { entries })
    }

    pub fn entries(&self) -> &[Rgb] {
        &self.entries
    }

    pub fn get(&self, index: u8) -> Rgb {
        self.entries
            .get(index as usize)
            .copied()
            .unwrap_or(Rgb::WHITE)
    }

    /// 查找完全匹配的颜色索引（取第一个）
    pub fn find(&self, rgb: Rgb) -> Option<u8> {
        self.entries
            .iter()
            .position(|e| *e == rgb)
            .and_then(|i| u8::try_from(i).ok())
    }

    /// 解析图元颜色为 RGB
    pub fn resolve(&self, color: ElementColor) -> Rgb {
        match color {
            ElementColor::Index(i) => self.get(i),
            ElementColor::True(rgb) => rgb,
        }
    }

    /// RGB 转图元颜色：能精确匹配颜色表时使用索引，否则使用真彩色
    pub fn match_rgb(&self, rgb: Rgb) -> ElementColor {
        match self.find(rgb) {
            Some(i) => ElementColor::Index(i),
            None => ElementColor::True(rgb),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.entries.len() == COLOR_TABLE_SIZE
    }
}

/// 标准线型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LineStyle {
    #[default]
    Solid,
    Dotted,
    MediumDash,
    LongDash,
    DotDash,
    ShortDash,
    DashDoubleDot,
    LongDashShortDash,
}

impl LineStyle {
    pub const ALL: [LineStyle; 8] = [
        LineStyle::Solid,
        LineStyle::Dotted,
        LineStyle::MediumDash,
        LineStyle::LongDash,
        LineStyle::DotDash,
        LineStyle::ShortDash,
        LineStyle::DashDoubleDot,
        LineStyle::LongDashShortDash,
    ];

    pub fn code(self) -> u8 {
        match self {
            LineStyle::Solid => 0,
            LineStyle::Dotted => 1,
            LineStyle::MediumDash => 2,
            LineStyle::LongDash => 3,
            LineStyle::DotDash => 4,
            LineStyle::ShortDash => 5,
            LineStyle::DashDoubleDot => 6,
            LineStyle::LongDashShortDash => 7,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }
}

/// 图元符号学
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Symbology {
    pub color: ElementColor,
    /// 线宽 0-31
    pub weight: u8,
    pub line_style: LineStyle,
    /// 填充色（仅面和单元）
    pub fill: Option<ElementColor>,
}

impl Symbology {
    pub fn with_color(color: ElementColor) -> Self {
        Self {
            color,
            ..Default::default()
        }
    }
}
