//! Media catalog types
//!
//! The catalog is static per session. The `id` field is the only stable
//! cross-client reference: catalogs on different clients may be ordered
//! differently, so commands carry ids and index is display-only.

use serde::{Deserialize, Serialize};

/// Kind of catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Image,
}

/// One entry in a session's media catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    /// Unique within a catalog; the only stable cross-client reference
    pub id: String,
    pub name: String,
    pub kind: MediaKind,
    pub source_url: String,
    /// Known only for video items with loaded metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
}

/// An ordered, id-keyed media catalog
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    items: Vec<MediaItem>,
}

impl Catalog {
    pub fn new(items: Vec<MediaItem>) -> Self {
        Self { items }
    }

    /// Look up an item by id
    pub fn get(&self, id: &str) -> Option<&MediaItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Display position of an item within this catalog's ordering
    pub fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }

    /// Item at a display position
    pub fn at(&self, index: usize) -> Option<&MediaItem> {
        self.items.get(index)
    }

    pub fn first(&self) -> Option<&MediaItem> {
        self.items.first()
    }

    pub fn items(&self) -> &[MediaItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::new(vec![
            MediaItem {
                id: "1".to_string(),
                name: "Welcome Video".to_string(),
                kind: MediaKind::Video,
                source_url: "https://example.com/welcome.mp4".to_string(),
                duration_seconds: Some(60.0),
            },
            MediaItem {
                id: "2".to_string(),
                name: "Product Demo".to_string(),
                kind: MediaKind::Video,
                source_url: "https://example.com/demo.mp4".to_string(),
                duration_seconds: Some(120.0),
            },
            MediaItem {
                id: "3".to_string(),
                name: "Company Logo".to_string(),
                kind: MediaKind::Image,
                source_url: "https://example.com/logo.png".to_string(),
                duration_seconds: None,
            },
        ])
    }

    #[test]
    fn test_lookup_by_id() {
        let cat = catalog();
        assert_eq!(cat.get("2").unwrap().name, "Product Demo");
        assert!(cat.get("99").is_none());
    }

    #[test]
    fn test_position_is_display_only() {
        let cat = catalog();
        assert_eq!(cat.position("1"), Some(0));
        assert_eq!(cat.position("3"), Some(2));
        assert_eq!(cat.position("99"), None);
    }
}
