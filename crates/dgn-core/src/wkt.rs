//! WKT (Well-Known Text) 读写
//!
//! 输出格式与常见 GIS 工具一致，例如 `POINT (2 3)`、`LINESTRING (0 0,1 1)`、
//! `POINT Z (1 2 3)`。解析时同时接受紧凑写法 `POINT(2 3)`，以及
//! `MULTIPOINT ((0 0),(1 1))` 与 `MULTIPOINT (0 0,1 1)` 两种多点写法。

use crate::geometry::{Coord, Geometry};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WktError {
    #[error("Unexpected end of WKT input")]
    UnexpectedEnd,

    #[error("Unexpected token '{found}' at position {position}, expected {expected}")]
    Unexpected {
        found: String,
        expected: &'static str,
        position: usize,
    },

    #[error("Unknown geometry type: {0}")]
    UnknownType(String),

    #[error("Invalid number: {0}")]
    InvalidNumber(String),

    #[error("Empty {0} cannot be represented")]
    EmptyNotSupported(&'static str),

    #[error("Trailing input after geometry")]
    Trailing,

    #[error("Geometry nesting exceeds {0} levels")]
    TooDeep(usize),
}

/// 几何集合的最大嵌套层数
pub const MAX_NESTING: usize = 64;

impl Geometry {
    /// 导出为 WKT
    pub fn to_wkt(&self) -> String {
        let mut out = String::new();
        write_geometry(self, &mut out);
        out
    }

    /// 从 WKT 解析
    pub fn from_wkt(input: &str) -> Result<Geometry, WktError> {
        let tokens = tokenize(input)?;
        let mut parser = WktParser {
            tokens,
            position: 0,
            depth: 0,
        };
        let geometry = parser.geometry()?;
        if parser.current().is_some() {
            return Err(WktError::Trailing);
        }
        Ok(geometry)
    }
}

fn write_geometry(geometry: &Geometry, out: &mut String) {
    let has_z = geometry.is_3d();
    out.push_str(geometry.type_name());
    if has_z {
        out.push_str(" Z");
    }

    if geometry.is_empty() {
        out.push_str(" EMPTY");
        return;
    }

    out.push(' ');
    match geometry {
        Geometry::Point(c) => {
            out.push('(');
            write_coord(c, has_z, out);
            out.push(')');
        }
        Geometry::LineString(cs) | Geometry::MultiPoint(cs) => write_coords(cs, has_z, out),
        Geometry::Polygon(rings) | Geometry::MultiLineString(rings) => {
            write_rings(rings, has_z, out)
        }
        Geometry::MultiPolygon(polygons) => {
            out.push('(');
            for (i, rings) in polygons.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_rings(rings, has_z, out);
            }
            out.push(')');
        }
        Geometry::GeometryCollection(parts) => {
            out.push('(');
            for (i, part) in parts.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_geometry(part, out);
            }
            out.push(')');
        }
    }
}

fn write_coord(c: &Coord, has_z: bool, out: &mut String) {
    out.push_str(&format_number(c.x));
    out.push(' ');
    out.push_str(&format_number(c.y));
    if has_z {
        out.push(' ');
        out.push_str(&format_number(c.z.unwrap_or(0.0)));
    }
}

fn write_coords(cs: &[Coord], has_z: bool, out: &mut String) {
    out.push('(');
    for (i, c) in cs.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_coord(c, has_z, out);
    }
    out.push(')');
}

fn write_rings(rings: &[Vec<Coord>], has_z: bool, out: &mut String) {
    out.push('(');
    for (i, ring) in rings.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_coords(ring, has_z, out);
    }
    out.push(')');
}

/// 最短往返表示，`2.0` 输出为 `2`
fn format_number(v: f64) -> String {
    if v == 0.0 {
        // 避免输出 "-0"
        return "0".to_string();
    }
    format!("{}", v)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Number(f64),
    LParen,
    RParen,
    Comma,
}

fn tokenize(input: &str) -> Result<Vec<(usize, Token)>, WktError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        match ch {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push((i, Token::LParen));
                i += 1;
            }
            ')' => {
                tokens.push((i, Token::RParen));
                i += 1;
            }
            ',' => {
                tokens.push((i, Token::Comma));
                i += 1;
            }
            c if c.is_ascii_alphabetic() => {
                let start = i;
                while i < chars.len() && chars[i].is_ascii_alphabetic() {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                tokens.push((start, Token::Word(word.to_ascii_uppercase())));
            }
            c if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_ascii_digit() || matches!(chars[i], '-' | '+' | '.' | 'e' | 'E'))
                {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let value = text
                    .parse::<f64>()
                    .map_err(|_| WktError::InvalidNumber(text.clone()))?;
                tokens.push((start, Token::Number(value)));
            }
            other => {
                return Err(WktError::Unexpected {
                    found: other.to_string(),
                    expected: "WKT token",
                    position: i,
                })
            }
        }
    }

    Ok(tokens)
}

struct WktParser {
    tokens: Vec<(usize, Token)>,
    position: usize,
    /// 当前几何嵌套层数
    depth: usize,
}

impl WktParser {
    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.position).map(|(_, t)| t)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).map(|(_, t)| t.clone());
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    fn unexpected(&self, expected: &'static str) -> WktError {
        match self.tokens.get(self.position) {
            Some((position, token)) => WktError::Unexpected {
                found: format!("{:?}", token),
                expected,
                position: *position,
            },
            None => WktError::UnexpectedEnd,
        }
    }

    fn expect(&mut self, token: Token, expected: &'static str) -> Result<(), WktError> {
        if self.current() == Some(&token) {
            self.position += 1;
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    /// 读取逗号分隔的列表，`item` 负责解析单项
    fn list<T>(
        &mut self,
        mut item: impl FnMut(&mut Self) -> Result<T, WktError>,
    ) -> Result<Vec<T>, WktError> {
        self.expect(Token::LParen, "'('")?;
        let mut items = vec![item(self)?];
        loop {
            match self.advance() {
                Some(Token::Comma) => items.push(item(self)?),
                Some(Token::RParen) => return Ok(items),
                Some(_) => {
                    self.position -= 1;
                    return Err(self.unexpected("',' or ')'"));
                }
                None => return Err(WktError::UnexpectedEnd),
            }
        }
    }

    fn geometry(&mut self) -> Result<Geometry, WktError> {
        if self.depth >= MAX_NESTING {
            return Err(WktError::TooDeep(MAX_NESTING));
        }
        self.depth += 1;
        let geometry = self.tagged_geometry();
        self.depth -= 1;
        geometry
    }

    fn tagged_geometry(&mut self) -> Result<Geometry, WktError> {
        let type_name = match self.advance() {
            Some(Token::Word(word)) => word,
            Some(_) => {
                self.position -= 1;
                return Err(self.unexpected("geometry type"));
            }
            None => return Err(WktError::UnexpectedEnd),
        };

        // 可选的维度标记
        let tag = match self.current() {
            Some(Token::Word(word)) => Some(word.clone()),
            _ => None,
        };
        match tag.as_deref() {
            Some("Z") => self.position += 1,
            Some(tag @ ("M" | "ZM")) => {
                return Err(WktError::UnknownType(format!("{} {}", type_name, tag)))
            }
            _ => {}
        }

        let empty = matches!(self.current(), Some(Token::Word(w)) if w == "EMPTY");
        if empty {
            self.position += 1;
        }

        let geometry = match type_name.as_str() {
            "POINT" => {
                if empty {
                    return Err(WktError::EmptyNotSupported("POINT"));
                }
                self.expect(Token::LParen, "'('")?;
                let c = self.coord()?;
                self.expect(Token::RParen, "')'")?;
                Geometry::Point(c)
            }
            "LINESTRING" if empty => Geometry::LineString(Vec::new()),
            "LINESTRING" => Geometry::LineString(self.coords()?),
            "POLYGON" if empty => Geometry::Polygon(Vec::new()),
            "POLYGON" => Geometry::Polygon(self.list(Self::coords)?),
            "MULTIPOINT" if empty => Geometry::MultiPoint(Vec::new()),
            "MULTIPOINT" => Geometry::MultiPoint(self.list(Self::multipoint_member)?),
            "MULTILINESTRING" if empty => Geometry::MultiLineString(Vec::new()),
            "MULTILINESTRING" => Geometry::MultiLineString(self.list(Self::coords)?),
            "MULTIPOLYGON" if empty => Geometry::MultiPolygon(Vec::new()),
            "MULTIPOLYGON" => {
                Geometry::MultiPolygon(self.list(|p: &mut Self| p.list(Self::coords))?)
            }
            "GEOMETRYCOLLECTION" if empty => Geometry::GeometryCollection(Vec::new()),
            "GEOMETRYCOLLECTION" => Geometry::GeometryCollection(self.list(Self::geometry)?),
            other => return Err(WktError::UnknownType(other.to_string())),
        };

        Ok(geometry)
    }

    fn coords(&mut self) -> Result<Vec<Coord>, WktError> {
        self.list(Self::coord)
    }

    /// 多点成员：`(x y)` 或 `x y`
    fn multipoint_member(&mut self) -> Result<Coord, WktError> {
        if self.current() == Some(&Token::LParen) {
            self.position += 1;
            let c = self.coord()?;
            self.expect(Token::RParen, "')'")?;
            Ok(c)
        } else {
            self.coord()
        }
    }

    fn coord(&mut self) -> Result<Coord, WktError> {
        let mut values = Vec::with_capacity(3);
        while let Some(Token::Number(v)) = self.current() {
            values.push(*v);
            self.position += 1;
        }
        match values.as_slice() {
            [x, y] => Ok(Coord::xy(*x, *y)),
            [x, y, z] => Ok(Coord::xyz(*x, *y, *z)),
            _ => Err(self.unexpected("2 or 3 ordinates")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_format() {
        assert_eq!(Geometry::Point(Coord::xy(2.0, 3.0)).to_wkt(), "POINT (2 3)");
        assert_eq!(
            Geometry::Point(Coord::xyz(2.5, -3.0, 1.0)).to_wkt(),
            "POINT Z (2.5 -3 1)"
        );
    }

    #[test]
    fn test_compact_point_parse() {
        let g = Geometry::from_wkt("POINT(2 3)").unwrap();
        assert_eq!(g, Geometry::Point(Coord::xy(2.0, 3.0)));
        assert_eq!(g.to_wkt(), "POINT (2 3)");
    }

    #[test]
    fn test_polygon_and_collection() {
        let text = "GEOMETRYCOLLECTION (POLYGON ((0 0,1 0,1 1,0 0)),LINESTRING (0 0,2 2))";
        let g = Geometry::from_wkt(text).unwrap();
        match &g {
            Geometry::GeometryCollection(parts) => {
                assert_eq!(parts.len(), 2);
                assert!(matches!(&parts[0], Geometry::Polygon(rings) if rings[0].len() == 4));
            }
            _ => panic!("Expected GeometryCollection"),
        }
        assert_eq!(g.to_wkt(), text);
    }

    #[test]
    fn test_multipoint_forms() {
        let a = Geometry::from_wkt("MULTIPOINT ((0 0),(1 1))").unwrap();
        let b = Geometry::from_wkt("multipoint (0 0, 1 1)").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_wkt(), "MULTIPOINT (0 0,1 1)");
    }

    #[test]
    fn test_empty() {
        assert_eq!(
            Geometry::from_wkt("LINESTRING EMPTY").unwrap().to_wkt(),
            "LINESTRING EMPTY"
        );
        assert_eq!(
            Geometry::from_wkt("POINT EMPTY"),
            Err(WktError::EmptyNotSupported("POINT"))
        );
    }

    #[test]
    fn test_nesting_limit() {
        let deep = "GEOMETRYCOLLECTION (".repeat(200_000);
        assert_eq!(
            Geometry::from_wkt(&deep),
            Err(WktError::TooDeep(MAX_NESTING))
        );

        let nested = |levels: usize| {
            format!(
                "{}POINT (1 2){}",
                "GEOMETRYCOLLECTION (".repeat(levels),
                ")".repeat(levels)
            )
        };
        assert!(Geometry::from_wkt(&nested(MAX_NESTING - 1)).is_ok());
        assert_eq!(
            Geometry::from_wkt(&nested(MAX_NESTING)),
            Err(WktError::TooDeep(MAX_NESTING))
        );
    }

    #[test]
    fn test_invalid_input() {
        assert!(matches!(
            Geometry::from_wkt("CIRCLE (0 0)"),
            Err(WktError::UnknownType(_))
        ));
        assert_eq!(Geometry::from_wkt("POINT (1"), Err(WktError::UnexpectedEnd));
        assert_eq!(Geometry::from_wkt("POINT (1 2) x"), Err(WktError::Trailing));
        assert!(Geometry::from_wkt("POINT (1 2 3 4)").is_err());
    }
}
