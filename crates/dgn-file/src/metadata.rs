//! 文件属性元数据
//!
//! 固定的 12 个键，顺序固定：
//! APPLICATION, TITLE, SUBJECT, AUTHOR, KEYWORDS, TEMPLATE, COMMENTS,
//! LAST_SAVED_BY, REVISION_NUMBER, CATEGORY, MANAGER, COMPANY
//!
//! 读取时空值视为不存在，`list()` 省略不存在的键。

use serde::{Deserialize, Serialize};

/// 元数据域名称
pub const METADATA_DOMAIN: &str = "DGN";

/// 元数据键
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MetadataKey {
    Application,
    Title,
    Subject,
    Author,
    Keywords,
    Template,
    Comments,
    LastSavedBy,
    RevisionNumber,
    Category,
    Manager,
    Company,
}

impl MetadataKey {
    /// 所有键（固定顺序）
    pub const ALL: [MetadataKey; 12] = [
        MetadataKey::Application,
        MetadataKey::Title,
        MetadataKey::Subject,
        MetadataKey::Author,
        MetadataKey::Keywords,
        MetadataKey::Template,
        MetadataKey::Comments,
        MetadataKey::LastSavedBy,
        MetadataKey::RevisionNumber,
        MetadataKey::Category,
        MetadataKey::Manager,
        MetadataKey::Company,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MetadataKey::Application => "APPLICATION",
            MetadataKey::Title => "TITLE",
            MetadataKey::Subject => "SUBJECT",
            MetadataKey::Author => "AUTHOR",
            MetadataKey::Keywords => "KEYWORDS",
            MetadataKey::Template => "TEMPLATE",
            MetadataKey::Comments => "COMMENTS",
            MetadataKey::LastSavedBy => "LAST_SAVED_BY",
            MetadataKey::RevisionNumber => "REVISION_NUMBER",
            MetadataKey::Category => "CATEGORY",
            MetadataKey::Manager => "MANAGER",
            MetadataKey::Company => "COMPANY",
        }
    }

    /// 按名称查找（不区分大小写）
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(name))
    }
}

impl std::fmt::Display for MetadataKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 元数据属性包
///
/// 作为覆盖集使用时，`Some("")` 表示“显式清空”，`None` 表示“不覆盖”。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DgnMetadata {
    pub application: Option<String>,
    pub title: Option<String>,
    pub subject: Option<String>,
    pub author: Option<String>,
    pub keywords: Option<String>,
    pub template: Option<String>,
    pub comments: Option<String>,
    pub last_saved_by: Option<String>,
    pub revision_number: Option<String>,
    pub category: Option<String>,
    pub manager: Option<String>,
    pub company: Option<String>,
}

impl DgnMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: MetadataKey) -> &Option<String> {
        match key {
            MetadataKey::Application => &self.application,
            MetadataKey::Title => &self.title,
            MetadataKey::Subject => &self.subject,
            MetadataKey::Author => &self.author,
            MetadataKey::Keywords => &self.keywords,
            MetadataKey::Template => &self.template,
            MetadataKey::Comments => &self.comments,
            MetadataKey::LastSavedBy => &self.last_saved_by,
            MetadataKey::RevisionNumber => &self.revision_number,
            MetadataKey::Category => &self.category,
            MetadataKey::Manager => &self.manager,
            MetadataKey::Company => &self.company,
        }
    }

    fn slot_mut(&mut self, key: MetadataKey) -> &mut Option<String> {
        match key {
            MetadataKey::Application => &mut self.application,
            MetadataKey::Title => &mut self.title,
            MetadataKey::Subject => &mut self.subject,
            MetadataKey::Author => &mut self.author,
            MetadataKey::Keywords => &mut self.keywords,
            MetadataKey::Template => &mut self.template,
            MetadataKey::Comments => &mut self.comments,
            MetadataKey::LastSavedBy => &mut self.last_saved_by,
            MetadataKey::RevisionNumber => &mut self.revision_number,
            MetadataKey::Category => &mut self.category,
            MetadataKey::Manager => &mut self.manager,
            MetadataKey::Company => &mut self.company,
        }
    }

    /// 读取值，空值视为不存在
    pub fn get(&self, key: MetadataKey) -> Option<&str> {
        self.slot(key).as_deref().filter(|v| !v.is_empty())
    }

    pub fn set(&mut self, key: MetadataKey, value: impl Into<String>) {
        *self.slot_mut(key) = Some(value.into());
    }

    pub fn remove(&mut self, key: MetadataKey) {
        *self.slot_mut(key) = None;
    }

    /// 是否显式提供了该键（包括空值）
    pub fn contains(&self, key: MetadataKey) -> bool {
        self.slot(key).is_some()
    }

    /// 按固定顺序列出存在的键值
    pub fn items(&self) -> Vec<(MetadataKey, &str)> {
        MetadataKey::ALL
            .into_iter()
            .filter_map(|k| self.get(k).map(|v| (k, v)))
            .collect()
    }

    /// 按固定顺序列出 `KEY=value`
    pub fn list(&self) -> Vec<String> {
        self.items()
            .into_iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }

    /// 去掉空值，用于持久化
    pub fn normalized(&self) -> Self {
        let mut out = Self::default();
        for (key, value) in self.items() {
            out.set(key, value);
        }
        out
    }
}

/// 逐键覆盖：覆盖集中出现的键（即使为空）无条件替换基础值
pub fn apply_overrides(base: &DgnMetadata, overrides: &DgnMetadata) -> DgnMetadata {
    let mut merged = base.clone();
    for key in MetadataKey::ALL {
        if let Some(value) = overrides.slot(key) {
            merged.set(key, value.clone());
        }
    }
    merged.normalized()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_names() {
        assert_eq!(MetadataKey::from_name("last_saved_by"), Some(MetadataKey::LastSavedBy));
        assert_eq!(MetadataKey::from_name("TITLE"), Some(MetadataKey::Title));
        assert_eq!(MetadataKey::from_name("SEED"), None);
        assert_eq!(MetadataKey::ALL.len(), 12);
    }

    #[test]
    fn test_list_order() {
        let mut md = DgnMetadata::new();
        md.set(MetadataKey::Company, "company");
        md.set(MetadataKey::Application, "application");
        md.set(MetadataKey::Title, "");

        assert_eq!(md.list(), vec!["APPLICATION=application", "COMPANY=company"]);
        assert_eq!(md.get(MetadataKey::Title), None);
        assert!(md.contains(MetadataKey::Title));
    }

    #[test]
    fn test_apply_overrides() {
        let mut base = DgnMetadata::new();
        base.set(MetadataKey::Title, "title");
        base.set(MetadataKey::Application, "application");
        base.set(MetadataKey::Author, "author");

        let mut overrides = DgnMetadata::new();
        overrides.set(MetadataKey::Title, "another_title");
        overrides.set(MetadataKey::Author, "");

        let merged = apply_overrides(&base, &overrides);
        assert_eq!(merged.get(MetadataKey::Title), Some("another_title"));
        assert_eq!(merged.get(MetadataKey::Application), Some("application"));
        assert_eq!(merged.author, None);
        // 基础值不变
        assert_eq!(base.get(MetadataKey::Title), Some("title"));
    }
}
