//! Overpass element to [`VenueCandidate`] mapping.

use courtdb_core::{AddressParts, VenueCandidate};

use crate::types::OverpassElement;

/// Map one Overpass element onto a venue candidate.
///
/// Returns `None` for elements without a usable `name` tag or without
/// coordinates.
#[must_use]
pub fn element_to_candidate(element: OverpassElement) -> Option<VenueCandidate> {
    let name = element
        .tags
        .get("name")
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());
    let Some(name) = name else {
        tracing::debug!(kind = %element.kind, id = element.id, "dropping unnamed element");
        return None;
    };

    let Some((latitude, longitude)) = element.coordinates() else {
        tracing::debug!(%name, kind = %element.kind, id = element.id, "dropping element without coordinates");
        return None;
    };

    let tag = |key: &str| {
        element
            .tags
            .get(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let address = AddressParts {
        house_number: tag("addr:housenumber"),
        street: tag("addr:street"),
        suburb: tag("addr:suburb"),
        city: tag("addr:city"),
        state: tag("addr:state"),
        postcode: tag("addr:postcode"),
    };

    let place_id = Some(format!("osm:{}/{}", element.kind, element.id));

    Some(VenueCandidate {
        name,
        raw_tags: element.tags,
        latitude,
        longitude,
        address,
        place_id,
    })
}
