use serde::{Deserialize, Serialize};

use courtdb_core::sports::normalize_sports;
use courtdb_core::{StoredVenue, VenueRecord};

/// Columns selected for every venue read.
pub(crate) const VENUE_SELECT: &str =
    "id,name,address,city,booking_url,sports,latitude,longitude,notes,is_public,place_id";

/// A `venues` row as returned by the store, where most columns are nullable.
#[derive(Debug, Clone, Deserialize)]
pub struct VenueRow {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub booking_url: Option<String>,
    #[serde(default)]
    pub sports: Option<Vec<String>>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub is_public: Option<bool>,
    #[serde(default)]
    pub place_id: Option<String>,
}

impl From<VenueRow> for StoredVenue {
    fn from(row: VenueRow) -> Self {
        let raw_sports = row.sports.unwrap_or_default();
        let sports = raw_sports.iter().map(String::as_str);
        StoredVenue {
            id: row.id,
            venue: VenueRecord {
                name: row.name.unwrap_or_default(),
                address: row.address.unwrap_or_default(),
                city: row.city.unwrap_or_default(),
                booking_url: row.booking_url.unwrap_or_default(),
                sports: normalize_sports(sports),
                latitude: row.latitude,
                longitude: row.longitude,
                notes: row.notes.filter(|n| !n.trim().is_empty()),
                is_public: row.is_public.unwrap_or(true),
                place_id: row.place_id.filter(|p| !p.trim().is_empty()),
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct BookingUrlPatch<'a> {
    pub booking_url: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct CoordinatesPatch {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SportRow {
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_columns_become_defaults() {
        let row: VenueRow = serde_json::from_value(serde_json::json!({
            "id": 9,
            "name": "Court",
            "address": null,
            "city": "Fitzroy",
            "booking_url": "https://court.example/book",
            "sports": null,
            "latitude": null,
            "longitude": null,
            "notes": "",
            "is_public": null,
            "place_id": null
        }))
        .unwrap();
        let stored = StoredVenue::from(row);
        assert_eq!(stored.id, 9);
        assert_eq!(stored.venue.address, "");
        assert!(stored.venue.sports.is_empty());
        assert!(stored.venue.is_public);
        assert_eq!(stored.venue.notes, None);
    }

    #[test]
    fn sports_are_normalized_on_read() {
        let row: VenueRow = serde_json::from_value(serde_json::json!({
            "id": 1,
            "sports": ["Football", "soccer", "Table Tennis"]
        }))
        .unwrap();
        let stored = StoredVenue::from(row);
        assert_eq!(
            stored.venue.sports.into_iter().collect::<Vec<_>>(),
            vec!["soccer".to_string(), "table-tennis".to_string()]
        );
    }
}
