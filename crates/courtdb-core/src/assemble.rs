//! Record assembly: merge fresh venue records into the catalog without
//! creating duplicates.
//!
//! Everything here is a pure function of an immutable [`CatalogSnapshot`]
//! and the incoming batch. Store writes happen in the caller.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;

use crate::canonical::CanonicalUrlKey;
use crate::venues::{StoredVenue, VenueRecord};

/// Which index identified a duplicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    CanonicalUrl,
    NameCity,
    NameAddress,
}

impl std::fmt::Display for MatchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchKind::CanonicalUrl => write!(f, "canonical_url"),
            MatchKind::NameCity => write!(f, "name_city"),
            MatchKind::NameAddress => write!(f, "name_address"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    Incomplete { missing: String },
    DuplicateOfExisting { id: i64, matched_by: MatchKind },
    DuplicateInBatch { matched_by: MatchKind },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedVenue {
    pub venue: VenueRecord,
    pub reason: SkipReason,
}

/// Coordinates to write onto an existing catalog row that has none.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CoordinateBackfill {
    pub id: i64,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Assembly {
    pub accepted: Vec<VenueRecord>,
    pub skipped: Vec<SkippedVenue>,
    pub backfills: Vec<CoordinateBackfill>,
}

/// Immutable lookup indices over the catalog as read at the start of a run.
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    venues: Vec<StoredVenue>,
    by_url: HashMap<CanonicalUrlKey, usize>,
    by_name_city: HashMap<(String, String), Vec<usize>>,
}

impl CatalogSnapshot {
    #[must_use]
    pub fn new(existing: Vec<StoredVenue>) -> Self {
        let mut by_url = HashMap::new();
        let mut by_name_city: HashMap<(String, String), Vec<usize>> = HashMap::new();

        for (idx, stored) in existing.iter().enumerate() {
            let key = CanonicalUrlKey::from_raw(&stored.venue.booking_url);
            if !key.is_empty() {
                by_url.entry(key).or_insert(idx);
            }
            let name_city = fold_pair(&stored.venue.name, &stored.venue.city);
            if !name_city.0.is_empty() {
                by_name_city
                    .entry(name_city)
                    .or_default()
                    .push(idx);
            }
        }

        Self {
            venues: existing,
            by_url,
            by_name_city,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.venues.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.venues.is_empty()
    }

    #[must_use]
    pub fn venues(&self) -> &[StoredVenue] {
        &self.venues
    }

    /// Look up a catalog row by canonical booking URL, then by name and city.
    #[must_use]
    pub fn find(&self, record: &VenueRecord) -> Option<(&StoredVenue, MatchKind)> {
        let key = CanonicalUrlKey::from_raw(&record.booking_url);
        if let Some(&idx) = self.by_url.get(&key) {
            return Some((&self.venues[idx], MatchKind::CanonicalUrl));
        }
        self.find_by_name_city(&record.name, &record.city)
            .map(|stored| (stored, MatchKind::NameCity))
    }

    /// Case-insensitive lookup by name and city. The earliest row wins.
    #[must_use]
    pub fn find_by_name_city(&self, name: &str, city: &str) -> Option<&StoredVenue> {
        self.find_all_by_name_city(name, city).into_iter().next()
    }

    /// Every catalog row sharing a name and city, in catalog order.
    #[must_use]
    pub fn find_all_by_name_city(&self, name: &str, city: &str) -> Vec<&StoredVenue> {
        self.by_name_city
            .get(&fold_pair(name, city))
            .map(|indices| indices.iter().map(|&idx| &self.venues[idx]).collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn find_by_url(&self, url: &str) -> Option<&StoredVenue> {
        let key = CanonicalUrlKey::from_raw(url);
        if key.is_empty() {
            return None;
        }
        self.by_url.get(&key).map(|&idx| &self.venues[idx])
    }
}

fn fold(value: &str) -> String {
    value.trim().to_lowercase()
}

fn fold_pair(a: &str, b: &str) -> (String, String) {
    (fold(a), fold(b))
}

/// Split a batch into records to insert, records to skip and coordinate
/// backfills for existing rows.
///
/// Input order decides which of two in-batch duplicates is kept.
#[must_use]
pub fn assemble(snapshot: &CatalogSnapshot, candidates: Vec<VenueRecord>) -> Assembly {
    let mut assembly = Assembly::default();
    let mut seen_name_address: HashSet<(String, String)> = HashSet::new();
    let mut seen_urls: HashSet<CanonicalUrlKey> = HashSet::new();
    let mut backfilled: HashSet<i64> = HashSet::new();

    for record in candidates {
        if let Some(missing) = record.missing_required_field() {
            assembly.skipped.push(SkippedVenue {
                venue: record,
                reason: SkipReason::Incomplete {
                    missing: missing.to_string(),
                },
            });
            continue;
        }

        if let Some((stored, matched_by)) = snapshot.find(&record) {
            let id = stored.id;
            if let (Some(latitude), Some(longitude)) = (record.latitude, record.longitude) {
                if !stored.venue.has_coordinates() && backfilled.insert(id) {
                    assembly.backfills.push(CoordinateBackfill {
                        id,
                        latitude,
                        longitude,
                    });
                }
            }
            tracing::debug!(name = %record.name, city = %record.city, id, %matched_by, "already in catalog");
            assembly.skipped.push(SkippedVenue {
                venue: record,
                reason: SkipReason::DuplicateOfExisting { id, matched_by },
            });
            continue;
        }

        let name_address = fold_pair(&record.name, &record.address);
        let url_key = CanonicalUrlKey::from_raw(&record.booking_url);

        let in_batch = if seen_name_address.contains(&name_address) {
            Some(MatchKind::NameAddress)
        } else if seen_urls.contains(&url_key) {
            Some(MatchKind::CanonicalUrl)
        } else {
            None
        };

        if let Some(matched_by) = in_batch {
            tracing::debug!(name = %record.name, city = %record.city, %matched_by, "duplicate within batch");
            assembly.skipped.push(SkippedVenue {
                venue: record,
                reason: SkipReason::DuplicateInBatch { matched_by },
            });
            continue;
        }

        seen_name_address.insert(name_address);
        seen_urls.insert(url_key);
        assembly.accepted.push(record);
    }

    assembly
}

/// Catalog rows sharing one canonical booking URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    pub key: CanonicalUrlKey,
    pub keep_id: i64,
    pub remove_ids: Vec<i64>,
}

/// Group catalog rows by canonical booking URL, keeping the lowest id.
///
/// Groups come back ordered by key; rows with a blank booking URL are
/// ignored.
#[must_use]
pub fn find_catalog_duplicates(existing: &[StoredVenue]) -> Vec<DuplicateGroup> {
    let mut groups: BTreeMap<CanonicalUrlKey, Vec<i64>> = BTreeMap::new();
    for stored in existing {
        let key = CanonicalUrlKey::from_raw(&stored.venue.booking_url);
        if key.is_empty() {
            continue;
        }
        groups.entry(key).or_default().push(stored.id);
    }

    groups
        .into_iter()
        .filter(|(_, ids)| ids.len() > 1)
        .filter_map(|(key, mut ids)| {
            ids.sort_unstable();
            ids.dedup();
            let (&keep_id, rest) = ids.split_first()?;
            (!rest.is_empty()).then(|| DuplicateGroup {
                key,
                keep_id,
                remove_ids: rest.to_vec(),
            })
        })
        .collect()
}

#[cfg(test)]
#[path = "assemble_test.rs"]
mod tests;
