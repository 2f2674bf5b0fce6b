use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ModelError;

/// Coarse grouping of data types, used for stats and selective export/import.
///
/// Variants are declared in the lexical order of their serialized names so
/// that ordering by category matches ordering by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    /// Conversation histories, personas, active-chat pointers.
    Chat,
    /// Crawled web pages cached from the server.
    CrawlCache,
    /// Markers placed on the drawing canvas.
    DrawingMarker,
    /// OCR results cached from the server.
    OcrCache,
    /// Patent search results cached from the server.
    PatentCache,
    /// Prompt templates.
    Prompt,
    /// User preferences and UI settings.
    Settings,
}

impl Category {
    /// Every category, in order.
    pub const ALL: [Category; 7] = [
        Category::Chat,
        Category::CrawlCache,
        Category::DrawingMarker,
        Category::OcrCache,
        Category::PatentCache,
        Category::Prompt,
        Category::Settings,
    ];

    /// The serialized name of the category.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Category::Chat => "chat",
            Category::CrawlCache => "crawl-cache",
            Category::DrawingMarker => "drawing-marker",
            Category::OcrCache => "ocr-cache",
            Category::PatentCache => "patent-cache",
            Category::Prompt => "prompt",
            Category::Settings => "settings",
        }
    }

    /// Caches derived from server responses. They can be re-fetched, so
    /// "config-only" exports leave them out.
    #[must_use]
    pub const fn is_server_cache(&self) -> bool {
        matches!(self, Category::CrawlCache | Category::OcrCache | Category::PatentCache)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ModelError::UnknownCategory(s.to_string()))
    }
}

/// Structural shape of the records a data type stores.
///
/// Structured shapes get item-level reconciliation on import; everything
/// else is merged as one opaque value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordShape {
    /// A list of conversations, each `{id, lastUpdate, messages, ..}`.
    ConversationList,
    /// A map of persona id → persona, with user-created ones flagged `isCustom`.
    PersonaMap,
    /// A list of prompt templates, each `{id, name, ..}`.
    TemplateList,
    /// Anything else.
    #[default]
    Generic,
}

/// Declares one logical data type held in per-user storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataTypeDescriptor {
    /// Storage key, or key prefix when `is_prefix` is set.
    pub key: String,
    pub display_name: String,
    pub category: Category,
    /// Non-exportable types are never collected, exported or overwritten by import.
    pub exportable: bool,
    /// Whether records of this type carry an extractable modification time.
    pub has_timestamp: bool,
    /// True for prefix families (many keys sharing `key` as a prefix).
    pub is_prefix: bool,
    #[serde(default)]
    pub shape: RecordShape,
}

impl DataTypeDescriptor {
    /// A single-key data type.
    pub fn single(key: &str, display_name: &str, category: Category) -> Self {
        Self {
            key: key.into(),
            display_name: display_name.into(),
            category,
            exportable: true,
            has_timestamp: false,
            is_prefix: false,
            shape: RecordShape::Generic,
        }
    }

    /// A prefix-family data type.
    pub fn family(prefix: &str, display_name: &str, category: Category) -> Self {
        Self {
            is_prefix: true,
            ..Self::single(prefix, display_name, category)
        }
    }

    /// Marks the records as timestamped.
    #[must_use]
    pub fn timestamped(mut self) -> Self {
        self.has_timestamp = true;
        self
    }

    /// Sets the record shape.
    #[must_use]
    pub fn with_shape(mut self, shape: RecordShape) -> Self {
        self.shape = shape;
        self
    }

    /// Excludes the type from export and import.
    #[must_use]
    pub fn private(mut self) -> Self {
        self.exportable = false;
        self
    }

    /// Returns true if a storage key belongs to this type.
    #[must_use]
    pub fn matches(&self, storage_key: &str) -> bool {
        if self.is_prefix {
            storage_key.starts_with(&self.key)
        } else {
            storage_key == self.key
        }
    }
}

/// How an overlapping key is resolved when importing.
///
/// Strategies other than `Smart` are deliberately not commutative:
/// `merge(a, b)` and `merge(b, a)` keep different values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    /// Newer timestamp wins; on a tie with differing content the imported value wins.
    #[default]
    Smart,
    /// Local wins on overlap; import-only keys are still added.
    KeepLocal,
    /// Imported wins on overlap; local-only keys are preserved.
    KeepImport,
    /// Only import-only keys are added; overlaps are left untouched.
    AddNew,
}

impl MergeStrategy {
    pub const ALL: [MergeStrategy; 4] = [
        MergeStrategy::Smart,
        MergeStrategy::KeepLocal,
        MergeStrategy::KeepImport,
        MergeStrategy::AddNew,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            MergeStrategy::Smart => "smart",
            MergeStrategy::KeepLocal => "keep_local",
            MergeStrategy::KeepImport => "keep_import",
            MergeStrategy::AddNew => "add_new",
        }
    }
}

impl fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MergeStrategy {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        MergeStrategy::ALL
            .into_iter()
            .find(|m| m.as_str() == normalized)
            .ok_or_else(|| ModelError::UnknownStrategy(s.to_string()))
    }
}
