//! 样式描述字符串
//!
//! # 语法
//!
//! ```text
//! style := tool (';' tool)*
//! tool  := NAME '(' param (',' param)* ')'
//! param := key ':' value          value 可以用双引号包裹
//! ```
//!
//! 规范输出（同一符号学总是得到逐字节相同的文本）：
//!
//! ```text
//! [BRUSH(fc:#rrggbb,id:"ogr-brush-0");]PEN(<线型>,c:#rrggbb[,w:Npx])
//! ```
//!
//! 格式错误的片段和值回退到默认符号学（颜色索引 0、线宽 0、实线、无填充）
//! 并记录警告。语法正确但无法表示的内容返回错误：线宽超过 31、非不透明颜色、
//! 非实心画刷、`PEN`/`BRUSH` 以外的工具及其未知参数。

use crate::properties::{ColorTable, LineStyle, Rgb, Symbology, MAX_WEIGHT};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StyleError {
    #[error("Line weight {0} exceeds the maximum of 31")]
    WeightOutOfRange(u32),

    #[error("Color {0} is not opaque")]
    TranslucentColor(String),

    #[error("Brush {0} is not a solid fill")]
    UnsupportedBrush(String),

    #[error("Pen pattern {0} has no native line style")]
    UnsupportedPen(String),

    #[error("Style tool {0} is not supported")]
    UnsupportedTool(String),

    #[error("Parameter '{param}' is not supported in {tool}")]
    UnsupportedParam { tool: String, param: String },
}

const PEN_PARAMS: [&str; 4] = ["c", "w", "id", "p"];
const BRUSH_PARAMS: [&str; 2] = ["fc", "id"];
const SOLID_BRUSH_ID: &str = "ogr-brush-0";

/// 长划短划线型的图案
const LONG_DASH_SHORT_DASH_PATTERN: &str = "10px 5px 4px 5px";

/// 样式工具，例如 `PEN(...)`
#[derive(Debug, Clone, PartialEq)]
pub struct StyleTool {
    pub name: String,
    pub params: Vec<(String, String)>,
}

impl StyleTool {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}

/// 解析结果
#[derive(Debug, Clone, Default)]
pub struct ParsedStyle {
    pub tools: Vec<StyleTool>,
    /// 是否跳过了格式错误的片段
    pub malformed: bool,
}

impl ParsedStyle {
    pub fn tool(&self, name: &str) -> Option<&StyleTool> {
        self.tools.iter().find(|t| t.name.eq_ignore_ascii_case(name))
    }
}

/// 拆分样式字符串为工具列表
pub fn parse_tools(text: &str) -> ParsedStyle {
    let mut parsed = ParsedStyle::default();

    for fragment in split_outside_quotes(text, ';') {
        let fragment = fragment.trim();
        if fragment.is_empty() {
            continue;
        }

        let (Some(open), true) = (fragment.find('('), fragment.ends_with(')')) else {
            parsed.malformed = true;
            continue;
        };

        let name = fragment[..open].trim();
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            parsed.malformed = true;
            continue;
        }

        let body = &fragment[open + 1..fragment.len() - 1];
        let mut params = Vec::new();
        for param in split_outside_quotes(body, ',') {
            let param = param.trim();
            if param.is_empty() {
                continue;
            }
            match param.split_once(':') {
                Some((key, value)) if !key.trim().is_empty() => {
                    params.push((key.trim().to_string(), unquote(value.trim())));
                }
                _ => parsed.malformed = true,
            }
        }

        parsed.tools.push(StyleTool {
            name: name.to_ascii_uppercase(),
            params,
        });
    }

    parsed
}

fn split_outside_quotes(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;
    for (i, ch) in text.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            c if c == separator && !in_quotes => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

fn unquote(value: &str) -> String {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
        .to_string()
}

/// 生成规范样式字符串
pub fn format_style(symbology: &Symbology, colors: &ColorTable) -> String {
    let mut out = String::new();

    if let Some(fill) = symbology.fill {
        out.push_str(&format!(
            "BRUSH(fc:{},id:\"{}\");",
            colors.resolve(fill).to_hex(),
            SOLID_BRUSH_ID
        ));
    }

    out.push_str("PEN(");
    out.push_str(pen_pattern(symbology.line_style));
    out.push_str(",c:");
    out.push_str(&colors.resolve(symbology.color).to_hex());
    if symbology.weight > 0 {
        out.push_str(&format!(",w:{}px", symbology.weight));
    }
    out.push(')');

    out
}

fn pen_pattern(style: LineStyle) -> &'static str {
    match style {
        LineStyle::Solid => "id:\"ogr-pen-0\"",
        LineStyle::Dotted => "id:\"ogr-pen-5\"",
        LineStyle::MediumDash => "id:\"ogr-pen-2\"",
        LineStyle::LongDash => "id:\"ogr-pen-4\"",
        LineStyle::DotDash => "id:\"ogr-pen-6\"",
        LineStyle::ShortDash => "id:\"ogr-pen-3\"",
        LineStyle::DashDoubleDot => "id:\"ogr-pen-7\"",
        LineStyle::LongDashShortDash => "p:\"10px 5px 4px 5px\"",
    }
}

fn line_style_from_pen_id(id: &str) -> Option<LineStyle> {
    match id.trim() {
        "ogr-pen-0" => Some(LineStyle::Solid),
        "ogr-pen-5" => Some(LineStyle::Dotted),
        "ogr-pen-2" => Some(LineStyle::MediumDash),
        "ogr-pen-4" => Some(LineStyle::LongDash),
        "ogr-pen-6" => Some(LineStyle::DotDash),
        "ogr-pen-3" => Some(LineStyle::ShortDash),
        "ogr-pen-7" => Some(LineStyle::DashDoubleDot),
        _ => None,
    }
}

/// 解析样式字符串为符号学
pub fn parse_symbology(text: &str, colors: &ColorTable) -> Result<Symbology, StyleError> {
    let parsed = parse_tools(text);
    let mut symbology = Symbology::default();
    let mut recovered = parsed.malformed;

    for tool in &parsed.tools {
        let known: &[&str] = match tool.name.as_str() {
            "PEN" => &PEN_PARAMS,
            "BRUSH" => &BRUSH_PARAMS,
            other => return Err(StyleError::UnsupportedTool(other.to_string())),
        };
        if let Some((key, _)) = tool
            .params
            .iter()
            .find(|(k, _)| !known.iter().any(|p| p.eq_ignore_ascii_case(k)))
        {
            return Err(StyleError::UnsupportedParam {
                tool: tool.name.clone(),
                param: key.clone(),
            });
        }
    }

    if let Some(pen) = parsed.tool("PEN") {
        if let Some(c) = pen.param("c") {
            match parse_color(c)? {
                Some(rgb) => symbology.color = colors.match_rgb(rgb),
                None => recovered = true,
            }
        }

        if let Some(w) = pen.param("w") {
            match parse_weight(w) {
                Some(weight) if weight > MAX_WEIGHT as u32 => {
                    return Err(StyleError::WeightOutOfRange(weight))
                }
                Some(weight) => symbology.weight = weight as u8,
                None => recovered = true,
            }
        }

        if let Some(ids) = pen.param("id") {
            // id 可以是逗号分隔的多个名称，取第一个可识别的
            match ids.split(',').find_map(line_style_from_pen_id) {
                Some(style) => symbology.line_style = style,
                None => match ids.split(',').map(str::trim).find(|id| id.starts_with("ogr-pen-")) {
                    Some(id) => return Err(StyleError::UnsupportedPen(id.to_string())),
                    None => recovered = true,
                },
            }
        } else if let Some(pattern) = pen.param("p") {
            let parts: Vec<&str> = pattern.split_whitespace().collect();
            if parts.join(" ") == LONG_DASH_SHORT_DASH_PATTERN {
                symbology.line_style = LineStyle::LongDashShortDash;
            } else if !parts.is_empty() && parts.iter().all(|p| parse_weight(p).is_some()) {
                return Err(StyleError::UnsupportedPen(format!("p:\"{}\"", pattern)));
            } else {
                recovered = true;
            }
        }
    }

    if let Some(brush) = parsed.tool("BRUSH") {
        if let Some(ids) = brush.param("id") {
            if !ids.split(',').any(|id| id.trim() == SOLID_BRUSH_ID) {
                return Err(StyleError::UnsupportedBrush(ids.to_string()));
            }
        }
        match brush.param("fc").map(parse_color).transpose()?.flatten() {
            Some(rgb) => symbology.fill = Some(colors.match_rgb(rgb)),
            None => recovered = true,
        }
    }

    if recovered {
        tracing::warn!("Malformed style string '{}', using default symbology for unparsed parts", text);
    }

    Ok(symbology)
}

/// 解析颜色：格式错误返回 `None`，非不透明颜色无法表示
fn parse_color(text: &str) -> Result<Option<Rgb>, StyleError> {
    match Rgb::from_hex_rgba(text) {
        Some((rgb, 0xff)) => Ok(Some(rgb)),
        Some(_) => Err(StyleError::TranslucentColor(text.trim().to_string())),
        None => Ok(None),
    }
}

/// 解析线宽，接受 `3`、`3px`，小数四舍五入
fn parse_weight(text: &str) -> Option<u32> {
    let text = text.trim();
    let number = text
        .strip_suffix("px")
        .or_else(|| text.strip_suffix("PX"))
        .unwrap_or(text)
        .trim();
    let value = number.parse::<f64>().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Some(value.round().min(u32::MAX as f64) as u32)
}
