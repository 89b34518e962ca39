//! Venue domain types and their tabular layout.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::sports::{format_sports_cell, parse_sports_cell};
use crate::tabular::Row;

/// Column order of every venue export and import file.
pub const VENUE_COLUMNS: &[&str] = &[
    "id",
    "name",
    "address",
    "city",
    "booking_url",
    "sports",
    "latitude",
    "longitude",
    "notes",
    "is_public",
    "place_id",
];

/// Structured address fields from the geographic source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddressParts {
    pub house_number: Option<String>,
    pub street: Option<String>,
    pub suburb: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postcode: Option<String>,
}

/// An unconfirmed point of interest pulled from the geographic source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueCandidate {
    pub name: String,
    pub raw_tags: BTreeMap<String, String>,
    pub latitude: f64,
    pub longitude: f64,
    pub address: AddressParts,
    /// `osm:<type>/<id>` reference to the source element.
    pub place_id: Option<String>,
}

impl VenueCandidate {
    /// The venue's own website, if tagged.
    ///
    /// Bare host names get an `https://` prefix.
    #[must_use]
    pub fn website(&self) -> Option<String> {
        ["website", "contact:website", "url"]
            .iter()
            .filter_map(|key| self.raw_tags.get(*key))
            .map(|value| value.trim())
            .find(|value| !value.is_empty())
            .map(|value| {
                if value.starts_with("http://") || value.starts_with("https://") {
                    value.to_string()
                } else {
                    format!("https://{}", value.trim_start_matches("//"))
                }
            })
    }

    /// Sports named by the `sport` tag, normalized.
    #[must_use]
    pub fn sports(&self) -> BTreeSet<String> {
        self.raw_tags
            .get("sport")
            .map(|tag| parse_sports_cell(tag))
            .unwrap_or_default()
    }

    /// Street address line: `"<number> <street>"`, or the street alone.
    #[must_use]
    pub fn address_line(&self) -> Option<String> {
        let street = self.address.street.as_deref().map(str::trim)?;
        if street.is_empty() {
            return None;
        }
        match self.address.house_number.as_deref().map(str::trim) {
            Some(number) if !number.is_empty() => Some(format!("{number} {street}")),
            _ => Some(street.to_string()),
        }
    }

    /// Locality: the tagged city, else the suburb, else `fallback`.
    #[must_use]
    pub fn locality(&self, fallback: &str) -> String {
        self.address
            .city
            .as_deref()
            .or(self.address.suburb.as_deref())
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(fallback)
            .to_string()
    }

    /// Whether the venue is open to the public.
    ///
    /// Anything not explicitly private is treated as public.
    #[must_use]
    pub fn is_public(&self) -> bool {
        let access = self
            .raw_tags
            .get("access")
            .map(|a| a.trim().to_lowercase())
            .unwrap_or_default();
        !matches!(access.as_str(), "private" | "customers" | "members" | "no")
    }

    /// Convert into a record using a discovered booking URL.
    ///
    /// `fallback_city` fills the city when the element carries no locality
    /// tags. Returns `None` when the record would be missing a name, address
    /// or booking URL.
    #[must_use]
    pub fn into_record(self, booking_url: &str, fallback_city: &str) -> Option<VenueRecord> {
        let address = self.address_line().unwrap_or_default();
        let city = self.locality(fallback_city);
        let sports = self.sports();
        let is_public = self.is_public();
        let notes = self
            .raw_tags
            .get("opening_hours")
            .map(|hours| format!("Hours: {hours}"));

        let record = VenueRecord {
            name: self.name.trim().to_string(),
            address,
            city,
            booking_url: booking_url.trim().to_string(),
            sports,
            latitude: Some(self.latitude),
            longitude: Some(self.longitude),
            notes,
            is_public,
            place_id: self.place_id,
        };

        if let Some(missing) = record.missing_required_field() {
            tracing::debug!(name = %record.name, missing, "dropping incomplete venue candidate");
            return None;
        }
        Some(record)
    }
}

/// The unit persisted to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueRecord {
    pub name: String,
    pub address: String,
    pub city: String,
    pub booking_url: String,
    #[serde(default)]
    pub sports: BTreeSet<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default = "default_is_public")]
    pub is_public: bool,
    #[serde(default)]
    pub place_id: Option<String>,
}

fn default_is_public() -> bool {
    true
}

impl VenueRecord {
    /// First required field that is blank, if any.
    #[must_use]
    pub fn missing_required_field(&self) -> Option<&'static str> {
        if self.name.trim().is_empty() {
            Some("name")
        } else if self.address.trim().is_empty() {
            Some("address")
        } else if self.booking_url.trim().is_empty() {
            Some("booking_url")
        } else {
            None
        }
    }

    #[must_use]
    pub fn is_insertable(&self) -> bool {
        self.missing_required_field().is_none()
    }

    #[must_use]
    pub fn has_coordinates(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }

    /// Build a record from a tabular row laid out per [`VENUE_COLUMNS`].
    ///
    /// Unparseable coordinates are treated as absent.
    #[must_use]
    pub fn from_row(row: &Row) -> Self {
        let cell = |name: &str| row.get(name).map_or("", |v| v.trim());
        let optional = |name: &str| {
            let value = cell(name);
            (!value.is_empty()).then(|| value.to_string())
        };

        Self {
            name: cell("name").to_string(),
            address: cell("address").to_string(),
            city: cell("city").to_string(),
            booking_url: cell("booking_url").to_string(),
            sports: parse_sports_cell(cell("sports")),
            latitude: cell("latitude").parse().ok(),
            longitude: cell("longitude").parse().ok(),
            notes: optional("notes"),
            is_public: parse_bool_cell(cell("is_public")).unwrap_or(true),
            place_id: optional("place_id"),
        }
    }

    /// Render as a tabular row; `id` is left blank for unsaved records.
    #[must_use]
    pub fn to_row(&self, id: Option<i64>) -> Row {
        let mut row = Row::new();
        row.insert("id".into(), id.map(|i| i.to_string()).unwrap_or_default());
        row.insert("name".into(), self.name.clone());
        row.insert("address".into(), self.address.clone());
        row.insert("city".into(), self.city.clone());
        row.insert("booking_url".into(), self.booking_url.clone());
        row.insert("sports".into(), format_sports_cell(&self.sports));
        row.insert(
            "latitude".into(),
            self.latitude.map(|v| v.to_string()).unwrap_or_default(),
        );
        row.insert(
            "longitude".into(),
            self.longitude.map(|v| v.to_string()).unwrap_or_default(),
        );
        row.insert("notes".into(), self.notes.clone().unwrap_or_default());
        row.insert("is_public".into(), self.is_public.to_string());
        row.insert("place_id".into(), self.place_id.clone().unwrap_or_default());
        row
    }
}

fn parse_bool_cell(cell: &str) -> Option<bool> {
    match cell.trim().to_lowercase().as_str() {
        "true" | "t" | "1" | "yes" | "y" => Some(true),
        "false" | "f" | "0" | "no" | "n" => Some(false),
        _ => None,
    }
}

/// A catalog row: a record plus its store id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredVenue {
    pub id: i64,
    #[serde(flatten)]
    pub venue: VenueRecord,
}

impl StoredVenue {
    /// Parse a tabular row carrying an `id` column.
    ///
    /// Returns `None` when the id is missing or not numeric.
    #[must_use]
    pub fn from_row(row: &Row) -> Option<Self> {
        let id = row.get("id")?.trim().parse().ok()?;
        Some(Self {
            id,
            venue: VenueRecord::from_row(row),
        })
    }

    #[must_use]
    pub fn to_row(&self) -> Row {
        self.venue.to_row(Some(self.id))
    }
}
