use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::GeoError;

/// South/west/north/east envelope scoping one POI query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl BoundingBox {
    /// Parse the geocoder's `[south, north, west, east]` string array.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::InvalidResponse`] if the array does not hold four
    /// numbers or south lies above north. West may exceed east for boxes that
    /// cross the antimeridian.
    pub fn from_geocoder(values: &[String]) -> Result<Self, GeoError> {
        let parsed: Vec<f64> = values
            .iter()
            .map(|v| v.trim().parse::<f64>())
            .collect::<Result<_, _>>()
            .map_err(|e| GeoError::InvalidResponse(format!("bounding box value: {e}")))?;

        let &[south, north, west, east] = parsed.as_slice() else {
            return Err(GeoError::InvalidResponse(format!(
                "bounding box must have 4 values, got {}",
                parsed.len()
            )));
        };

        if south > north {
            return Err(GeoError::InvalidResponse(format!(
                "inverted bounding box [{south}, {north}, {west}, {east}]"
            )));
        }

        Ok(Self {
            south,
            west,
            north,
            east,
        })
    }

    /// Overpass QL bbox filter body: `south,west,north,east`.
    #[must_use]
    pub fn to_overpass(&self) -> String {
        format!("{},{},{},{}", self.south, self.west, self.north, self.east)
    }
}

/// One entry of the geocoder's `/search?format=json` array.
#[derive(Debug, Clone, Deserialize)]
pub struct GeocodeResult {
    pub boundingbox: Vec<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OverpassResponse {
    #[serde(default)]
    pub elements: Vec<OverpassElement>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OverpassCenter {
    pub lat: f64,
    pub lon: f64,
}

/// A node, way or relation returned with `out center tags`.
#[derive(Debug, Clone, Deserialize)]
pub struct OverpassElement {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: i64,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub center: Option<OverpassCenter>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl OverpassElement {
    /// Point coordinates for nodes, centre coordinates for ways and relations.
    #[must_use]
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        if self.kind == "node" {
            return self.lat.zip(self.lon);
        }
        self.center
            .as_ref()
            .map(|c| (c.lat, c.lon))
            .or_else(|| self.lat.zip(self.lon))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_string()).collect()
    }

    #[test]
    fn parses_geocoder_order() {
        let bbox =
            BoundingBox::from_geocoder(&strings(&["-37.80", "-37.77", "144.97", "144.99"])).unwrap();
        assert!((bbox.south + 37.80).abs() < 1e-9);
        assert!((bbox.north + 37.77).abs() < 1e-9);
        assert!((bbox.west - 144.97).abs() < 1e-9);
        assert_eq!(bbox.to_overpass(), "-37.8,144.97,-37.77,144.99");
    }

    #[test]
    fn rejects_short_or_bad_boxes() {
        assert!(BoundingBox::from_geocoder(&strings(&["1", "2", "3"])).is_err());
        assert!(BoundingBox::from_geocoder(&strings(&["a", "2", "3", "4"])).is_err());
        assert!(BoundingBox::from_geocoder(&strings(&["5", "2", "3", "4"])).is_err());
    }

    #[test]
    fn antimeridian_box_is_kept() {
        let bbox = BoundingBox::from_geocoder(&strings(&["-18.3", "-15.7", "177.0", "-178.2"]))
            .expect("box crossing the antimeridian");
        assert!(bbox.west > bbox.east);
        assert_eq!(bbox.to_overpass(), "-18.3,177,-15.7,-178.2");
    }

    #[test]
    fn way_uses_center() {
        let element: OverpassElement = serde_json::from_value(serde_json::json!({
            "type": "way",
            "id": 42,
            "center": { "lat": -37.1, "lon": 144.2 },
            "tags": { "name": "Courts" }
        }))
        .unwrap();
        assert_eq!(element.coordinates(), Some((-37.1, 144.2)));
    }

    #[test]
    fn node_without_position_has_no_coordinates() {
        let element: OverpassElement = serde_json::from_value(serde_json::json!({
            "type": "node",
            "id": 1,
            "center": { "lat": 1.0, "lon": 2.0 }
        }))
        .unwrap();
        assert_eq!(element.coordinates(), None);
    }
}
