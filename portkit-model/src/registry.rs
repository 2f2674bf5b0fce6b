//! The data type registry.
//!
//! A static catalog built once per session. Collection, export and import
//! only ever see keys that resolve to a registered, exportable descriptor;
//! everything else in the namespace (auth tokens, scratch state) stays private.

use crate::{Category, DataTypeDescriptor, ModelError, ModelResult, RecordShape};

/// Read-only catalog of data type descriptors.
#[derive(Debug, Clone)]
pub struct DataTypeRegistry {
    descriptors: Vec<DataTypeDescriptor>,
}

impl DataTypeRegistry {
    /// Builds a registry, rejecting duplicate keys and keys that a prefix
    /// family would also claim.
    pub fn new(descriptors: Vec<DataTypeDescriptor>) -> ModelResult<Self> {
        for (i, d) in descriptors.iter().enumerate() {
            for other in &descriptors[i + 1..] {
                if d.key == other.key {
                    return Err(ModelError::DuplicateKey(d.key.clone()));
                }
            }
            for other in &descriptors {
                if std::ptr::eq(d, other) || !other.is_prefix {
                    continue;
                }
                if d.key.starts_with(&other.key) {
                    return Err(ModelError::Shadowed {
                        key: d.key.clone(),
                        prefix: other.key.clone(),
                    });
                }
            }
        }
        Ok(Self { descriptors })
    }

    /// The catalog of data types the workbench persists.
    pub fn builtin() -> Self {
        use Category::*;
        let descriptors = vec![
            DataTypeDescriptor::single("chat_conversations", "Chat conversations", Chat)
                .timestamped()
                .with_shape(RecordShape::ConversationList),
            DataTypeDescriptor::single("chat_current_conversation_id", "Active conversation", Chat),
            DataTypeDescriptor::single("chat_personas", "Chat personas", Chat)
                .timestamped()
                .with_shape(RecordShape::PersonaMap),
            DataTypeDescriptor::single("chat_model_settings", "Chat model settings", Settings),
            DataTypeDescriptor::single("prompt_templates", "Prompt templates", Prompt)
                .timestamped()
                .with_shape(RecordShape::TemplateList),
            DataTypeDescriptor::single("prompt_favorites", "Favorite prompts", Prompt),
            DataTypeDescriptor::single("user_preferences", "User preferences", Settings),
            DataTypeDescriptor::single("ui_theme", "Interface theme", Settings),
            DataTypeDescriptor::family("patent_cache_", "Patent search cache", PatentCache)
                .timestamped(),
            DataTypeDescriptor::single("patent_search_history", "Patent search history", PatentCache)
                .timestamped(),
            DataTypeDescriptor::family("ocr_cache_", "OCR result cache", OcrCache).timestamped(),
            DataTypeDescriptor::family("crawl_cache_", "Web crawl cache", CrawlCache).timestamped(),
            DataTypeDescriptor::family("drawing_marker_", "Drawing markers", DrawingMarker)
                .timestamped(),
            DataTypeDescriptor::single("auth_session", "Authentication session", Settings).private(),
        ];
        // The builtin table is validated by the registry tests.
        Self { descriptors }
    }

    /// All descriptors, in declaration order.
    pub fn descriptors(&self) -> &[DataTypeDescriptor] {
        &self.descriptors
    }

    /// Exportable descriptors, in declaration order.
    pub fn exportable(&self) -> impl Iterator<Item = &DataTypeDescriptor> {
        self.descriptors.iter().filter(|d| d.exportable)
    }

    /// Looks up a descriptor by its type key.
    pub fn get(&self, type_key: &str) -> Option<&DataTypeDescriptor> {
        self.descriptors.iter().find(|d| d.key == type_key)
    }

    /// Looks up a descriptor by its type key, failing if unregistered.
    pub fn require(&self, type_key: &str) -> ModelResult<&DataTypeDescriptor> {
        self.get(type_key)
            .ok_or_else(|| ModelError::UnknownType(type_key.to_string()))
    }

    /// Resolves a storage key to the descriptor that owns it.
    ///
    /// Exact single-key matches win; otherwise the longest matching prefix.
    pub fn descriptor_for_key(&self, storage_key: &str) -> Option<&DataTypeDescriptor> {
        if let Some(d) = self
            .descriptors
            .iter()
            .find(|d| !d.is_prefix && d.key == storage_key)
        {
            return Some(d);
        }
        self.descriptors
            .iter()
            .filter(|d| d.is_prefix && storage_key.starts_with(&d.key))
            .max_by_key(|d| d.key.len())
    }

    /// Returns the category a storage key belongs to, if registered.
    pub fn category_of(&self, storage_key: &str) -> Option<Category> {
        self.descriptor_for_key(storage_key).map(|d| d.category)
    }

    /// Type keys of every exportable descriptor in the given categories.
    pub fn type_keys_in(&self, categories: &[Category]) -> Vec<String> {
        self.exportable()
            .filter(|d| categories.contains(&d.category))
            .map(|d| d.key.clone())
            .collect()
    }

    /// Categories that have at least one exportable descriptor.
    pub fn categories(&self) -> Vec<Category> {
        let mut cats: Vec<Category> = self.exportable().map(|d| d.category).collect();
        cats.sort();
        cats.dedup();
        cats
    }
}

impl Default for DataTypeRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
