use std::fmt;

use serde::{Deserialize, Serialize};

use super::pin::PinCategory;

/// Display buckets of the public gallery. `All` doubles as the no-filter sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GalleryCategory {
    #[serde(rename = "All")]
    All,
    #[serde(rename = "Dry Deserts")]
    DryDeserts,
    #[serde(rename = "The High Alpine")]
    HighAlpine,
    #[serde(rename = "Coastal Shoreline")]
    CoastalShoreline,
    #[serde(rename = "Luscious Rainforests")]
    LusciousRainforests,
    #[serde(rename = "Star Gazing")]
    StarGazing,
}

impl GalleryCategory {
    pub const ALL: [GalleryCategory; 6] = [
        GalleryCategory::All,
        GalleryCategory::DryDeserts,
        GalleryCategory::HighAlpine,
        GalleryCategory::CoastalShoreline,
        GalleryCategory::LusciousRainforests,
        GalleryCategory::StarGazing,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            GalleryCategory::All => "All",
            GalleryCategory::DryDeserts => "Dry Deserts",
            GalleryCategory::HighAlpine => "The High Alpine",
            GalleryCategory::CoastalShoreline => "Coastal Shoreline",
            GalleryCategory::LusciousRainforests => "Luscious Rainforests",
            GalleryCategory::StarGazing => "Star Gazing",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|category| category.label() == label)
    }
}

impl From<PinCategory> for GalleryCategory {
    fn from(category: PinCategory) -> Self {
        match category {
            PinCategory::Desert => GalleryCategory::DryDeserts,
            PinCategory::Mountains => GalleryCategory::HighAlpine,
            PinCategory::Coastal => GalleryCategory::CoastalShoreline,
            PinCategory::Forest => GalleryCategory::LusciousRainforests,
            PinCategory::Urban => GalleryCategory::StarGazing,
            PinCategory::Home | PinCategory::Other => GalleryCategory::All,
        }
    }
}

impl fmt::Display for GalleryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GalleryImage {
    pub id: String,
    pub url: String,
    pub alt: String,
    pub title: String,
    pub description: String,
    pub category: GalleryCategory,
    pub pin_id: String,
}
