use std::{collections::HashSet, fmt};

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use super::trip::{LocationPhoto, Trip};

pub const PLACEHOLDER_PREFIX: &str = "pin_";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PinCategory {
    Desert,
    Mountains,
    Coastal,
    Forest,
    Urban,
    Home,
    #[default]
    #[serde(other)]
    Other,
}

impl PinCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            PinCategory::Desert => "desert",
            PinCategory::Mountains => "mountains",
            PinCategory::Coastal => "coastal",
            PinCategory::Forest => "forest",
            PinCategory::Urban => "urban",
            PinCategory::Home => "home",
            PinCategory::Other => "other",
        }
    }
}

impl fmt::Display for PinCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A pin in its canonical shape: trips are always the source of truth, legacy
/// single-visit fields are folded into the first trip on load.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "PinRecord")]
pub struct LocationPin {
    pub id: String,
    pub title: String,
    pub description: String,
    pub coordinates: Coordinates,
    pub featured: bool,
    pub category: PinCategory,
    pub trips: Vec<Trip>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl LocationPin {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        coordinates: Coordinates,
        category: PinCategory,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            coordinates,
            featured: false,
            category,
            trips: Vec::new(),
            created_at: None,
            updated_at: None,
        }
    }

    pub fn primary_trip(&self) -> Option<&Trip> {
        self.trips.first()
    }

    /// Story shown for the pin. The first trip wins; the pin description is the
    /// fallback for pins without any trip.
    pub fn display_story(&self) -> &str {
        self.primary_trip()
            .map(|trip| trip.story.as_str())
            .filter(|story| !story.is_empty())
            .unwrap_or(&self.description)
    }

    pub fn all_photos(&self) -> impl Iterator<Item = &LocationPhoto> {
        self.trips.iter().flat_map(|trip| trip.photos.iter())
    }

    pub fn photo_count(&self) -> usize {
        self.trips.iter().map(|trip| trip.photos.len()).sum()
    }
}

/// Client-side ids look like `pin_<millis>_<suffix>` and can never parse as the
/// UUIDs the server hands out.
pub fn is_placeholder_id(id: &str) -> bool {
    id.starts_with(PLACEHOLDER_PREFIX) && uuid::Uuid::parse_str(id).is_err()
}

/// The two shapes pins arrive in over the wire and from the local cache.
#[derive(Debug, Clone, PartialEq)]
pub enum PinSchema {
    MultiTrip(Vec<Trip>),
    LegacySingleTrip(LegacyVisit),
    /// Neither trips nor legacy fields were supplied.
    Bare,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LegacyVisit {
    pub story: Option<String>,
    pub visit_date: Option<String>,
    pub photos: Vec<LocationPhoto>,
    pub tags: Vec<String>,
}

/// Raw record as it is stored or transmitted. Only used at the data-access
/// boundary; everything past it works with [`LocationPin`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PinRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub coordinates: Coordinates,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub category: PinCategory,
    pub trips: Option<Vec<Trip>>,
    pub story: Option<String>,
    pub visit_date: Option<String>,
    pub photos: Option<Vec<LocationPhoto>>,
    pub tags: Option<Vec<String>>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl PinRecord {
    /// Splits the record into its common fields and the schema it was written in.
    /// A non-empty `trips` list takes precedence over any legacy fields.
    pub fn into_parts(self) -> (LocationPin, PinSchema) {
        let schema = match self.trips {
            Some(trips) if !trips.is_empty() => PinSchema::MultiTrip(trips),
            _ if self.story.is_some()
                || self.visit_date.is_some()
                || self.photos.as_ref().is_some_and(|p| !p.is_empty())
                || self.tags.as_ref().is_some_and(|t| !t.is_empty()) =>
            {
                PinSchema::LegacySingleTrip(LegacyVisit {
                    story: self.story,
                    visit_date: self.visit_date,
                    photos: self.photos.unwrap_or_default(),
                    tags: self.tags.unwrap_or_default(),
                })
            }
            _ => PinSchema::Bare,
        };
        let pin = LocationPin {
            id: self.id,
            title: self.title,
            description: self.description,
            coordinates: self.coordinates,
            featured: self.featured,
            category: self.category,
            trips: Vec::new(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        };
        (pin, schema)
    }
}

impl From<PinRecord> for LocationPin {
    fn from(record: PinRecord) -> Self {
        let (mut pin, schema) = record.into_parts();
        pin.trips = match schema {
            PinSchema::MultiTrip(trips) => trips,
            PinSchema::LegacySingleTrip(visit) => vec![legacy_trip(&pin, visit)],
            PinSchema::Bare => Vec::new(),
        };
        for trip in &mut pin.trips {
            trip.dedup_tags();
            dedup_photos(&mut trip.photos);
        }
        pin
    }
}

fn legacy_trip(pin: &LocationPin, visit: LegacyVisit) -> Trip {
    let mut trip = Trip::new(format!("{}-trip-1", pin.id), pin.title.clone());
    trip.story = visit.story.unwrap_or_else(|| pin.description.clone());
    trip.visit_date = visit.visit_date.unwrap_or_default();
    trip.photos = visit.photos;
    trip.tags = visit.tags;
    trip
}

fn dedup_photos(photos: &mut Vec<LocationPhoto>) {
    let mut seen = HashSet::new();
    photos.retain(|photo| seen.insert(photo.id.clone()));
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn legacy_pin_without_visit_date_stays_undated() {
        let raw = json!({
            "id": "joshua-tree",
            "title": "Joshua Tree",
            "description": "Boulders",
            "coordinates": { "latitude": 33.87, "longitude": -115.9 },
            "photos": [{ "id": "jt-1", "src": "/jt.jpg", "alt": "jt", "title": "Boulders" }]
        });
        let first: LocationPin = serde_json::from_value(raw.clone()).unwrap();
        let second: LocationPin = serde_json::from_value(raw).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.trips.len(), 1);
        assert!(first.trips[0].visit_date.is_empty());

        let written = serde_json::to_value(&first).unwrap();
        assert!(written["trips"][0].get("visitDate").is_none());
    }

    fn legacy_json() -> serde_json::Value {
        json!({
            "id": "death-valley-1",
            "title": "Death Valley National Park",
            "description": "The hottest, driest place",
            "story": "Three days of extremes.",
            "coordinates": { "latitude": 36.5323, "longitude": -117.0794 },
            "photos": [
                { "id": "dv-1", "src": "/a.jpg", "alt": "a", "title": "Desert Dawn", "category": "desert" },
                { "id": "dv-1", "src": "/dup.jpg", "alt": "dup", "title": "Dup" }
            ],
            "visitDate": "2023-07-15",
            "tags": ["desert", "camping", "desert"],
            "featured": true,
            "category": "desert"
        })
    }

    #[test]
    fn legacy_pin_becomes_single_trip() {
        let pin: LocationPin = serde_json::from_value(legacy_json()).unwrap();
        assert_eq!(pin.trips.len(), 1);
        let trip = &pin.trips[0];
        assert_eq!(trip.id, "death-valley-1-trip-1");
        assert_eq!(trip.title, "Death Valley National Park");
        assert_eq!(trip.story, "Three days of extremes.");
        assert_eq!(trip.visit_date, "2023-07-15");
        assert_eq!(trip.tags, vec!["desert", "camping"]);
        assert_eq!(trip.photos.len(), 1);
        assert_eq!(trip.photos[0].src, "/a.jpg");
    }

    #[test]
    fn trips_take_precedence_over_legacy_fields() {
        let mut raw = legacy_json();
        raw["trips"] = json!([{
            "id": "t1",
            "title": "Spring visit",
            "story": "Wildflowers.",
            "visitDate": "2024-03-02",
            "photos": [],
            "tags": []
        }]);
        let pin: LocationPin = serde_json::from_value(raw).unwrap();
        assert_eq!(pin.trips.len(), 1);
        assert_eq!(pin.trips[0].id, "t1");
        assert_eq!(pin.display_story(), "Wildflowers.");
        assert_eq!(pin.title, "Death Valley National Park");
    }

    #[test]
    fn serialized_pin_has_no_legacy_fields() {
        let pin: LocationPin = serde_json::from_value(legacy_json()).unwrap();
        let value = serde_json::to_value(&pin).unwrap();
        assert!(value.get("story").is_none());
        assert!(value.get("photos").is_none());
        assert!(value.get("createdAt").is_none());
        assert_eq!(value["trips"][0]["visitDate"], "2023-07-15");

        let again: LocationPin = serde_json::from_value(value).unwrap();
        assert_eq!(again, pin);
    }

    #[test]
    fn unknown_category_reads_as_other() {
        let pin: LocationPin = serde_json::from_value(json!({
            "id": "x",
            "title": "X",
            "description": "",
            "coordinates": { "latitude": 0.0, "longitude": 0.0 },
            "featured": false,
            "category": "volcanic"
        }))
        .unwrap();
        assert_eq!(pin.category, PinCategory::Other);
        assert!(pin.trips.is_empty());
        assert_eq!(pin.display_story(), "");
    }

    #[test]
    fn placeholder_ids_never_look_like_uuids() {
        assert!(is_placeholder_id("pin_1700000000000_abc123xyz"));
        assert!(!is_placeholder_id("3f1c2a9e-5a4b-4c1d-9e8f-0a1b2c3d4e5f"));
        assert!(!is_placeholder_id("death-valley-1"));
    }
}
