use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationPhoto {
    pub id: String,
    pub src: String,
    #[serde(default)]
    pub alt: String,
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
}

/// One visit to a location.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub story: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub visit_date: String,
    #[serde(default)]
    pub photos: Vec<LocationPhoto>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub weather: Option<String>,
    pub equipment: Option<Vec<String>>,
}

impl Trip {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            story: String::new(),
            visit_date: String::new(),
            photos: Vec::new(),
            tags: Vec::new(),
            weather: None,
            equipment: None,
        }
    }

    /// Tags behave as a set; the first occurrence keeps its position.
    pub fn dedup_tags(&mut self) {
        let mut seen = std::collections::HashSet::new();
        self.tags.retain(|tag| seen.insert(tag.clone()));
    }
}
