//! End-to-end checks of the pure pipeline: tabular import, assembly against
//! a catalog, and export.

use courtdb_core::tabular;
use courtdb_core::{
    assemble, canonicalize, CatalogSnapshot, MatchKind, SkipReason, StoredVenue, VenueRecord,
    VENUE_COLUMNS,
};

const CATALOG: &str = "\
id,name,address,city,booking_url,sports,latitude,longitude,notes,is_public,place_id
1,Fitzroy Tennis Club,1 Brunswick St,Fitzroy,https://fitzroytennis.example/book,tennis,,,,true,
2,Carlton Courts,5 Lygon St,Carlton,https://play.example.net/carlton,\"{basketball,netball}\",-37.8,144.96,,true,osm:way/9
";

const INCOMING: &str = "\
name,address,city,booking_url,sports,latitude,longitude,is_public
FITZROY TENNIS CLUB,1 Brunswick Street,fitzroy,https://elsewhere.example/book,Tennis,-37.79,144.98,yes
Edinburgh Gardens Courts,Alfred Cres,Fitzroy North,http://PLAY.example.net/carlton/,basketball,,,1
\"Collingwood Padel, Indoor\",\"12 Smith St\",Collingwood,https://padel.example/book,padel;Football,,,no
Collingwood Padel Annex,12 Smith St,Collingwood,https://padel.example/book/,padel,,,
No Link Courts,3 Gertrude St,Fitzroy,,tennis,,,
";

fn catalog() -> Vec<StoredVenue> {
    tabular::parse(CATALOG)
        .iter()
        .filter_map(StoredVenue::from_row)
        .collect()
}

#[test]
fn tabular_batch_assembles_against_catalog() {
    let snapshot = CatalogSnapshot::new(catalog());
    assert_eq!(snapshot.len(), 2);

    let incoming: Vec<VenueRecord> = tabular::parse(INCOMING)
        .iter()
        .map(VenueRecord::from_row)
        .collect();
    assert_eq!(incoming.len(), 5);

    let assembly = assemble(&snapshot, incoming);

    // Only the padel venue is new; its annex repeats the booking URL.
    assert_eq!(assembly.accepted.len(), 1);
    let padel = &assembly.accepted[0];
    assert_eq!(padel.name, "Collingwood Padel, Indoor");
    assert!(!padel.is_public);
    assert_eq!(
        padel.sports.iter().map(String::as_str).collect::<Vec<_>>(),
        vec!["padel", "soccer"]
    );

    let reasons: Vec<&SkipReason> = assembly.skipped.iter().map(|s| &s.reason).collect();
    assert_eq!(
        reasons,
        vec![
            &SkipReason::DuplicateOfExisting {
                id: 1,
                matched_by: MatchKind::NameCity
            },
            &SkipReason::DuplicateOfExisting {
                id: 2,
                matched_by: MatchKind::CanonicalUrl
            },
            &SkipReason::DuplicateInBatch {
                matched_by: MatchKind::CanonicalUrl
            },
            &SkipReason::Incomplete {
                missing: "booking_url".to_string()
            },
        ]
    );

    // Row 1 had no coordinates; row 2 already did.
    assert_eq!(assembly.backfills.len(), 1);
    assert_eq!(assembly.backfills[0].id, 1);
}

#[test]
fn catalog_export_survives_a_round_trip() {
    let venues = catalog();
    let rows: Vec<_> = venues.iter().map(StoredVenue::to_row).collect();
    let text = tabular::serialize(&rows, VENUE_COLUMNS).expect("encode");

    let reread: Vec<StoredVenue> = tabular::parse(&text)
        .iter()
        .filter_map(StoredVenue::from_row)
        .collect();

    assert_eq!(reread, venues);
}

#[test]
fn scheme_and_case_do_not_split_canonical_keys() {
    let venues = catalog();
    assert_eq!(
        canonicalize(&venues[1].venue.booking_url),
        canonicalize("http://PLAY.example.net/carlton/")
    );
}
