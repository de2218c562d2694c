use std::fs;

use kifield::board::{self, FormatPreference, LoadedBoard, SnapshotBoard};
use kifield::field::{self, RenameRequest, Strategy};
use kifield::ErrorCode;
use tempfile::tempdir;

const SNAPSHOT: &str = r#"{
  "components": [
    { "reference": "R1", "properties": [{ "key": "PART NUMBER", "value": "ABC123" }] },
    { "reference": "U1", "fields": [{ "name": "Part Number", "text": "XYZ999" }] },
    { "reference": "C1", "properties": [], "fields": [] }
  ]
}
"#;

const KICAD_FIELDS: &str = r#"(kicad_pcb (version 20240108) (generator "pcbnew")
  (footprint "Package_SO:SOIC-8"
    (layer "F.Cu")
    (uuid "00000000-0000-0000-0000-000000000001")
    (property "Reference" "U1" (at 0 -3 0) (layer "F.SilkS") (uuid "00000000-0000-0000-0000-0000000000a1"))
    (property "Value" "LM358" (at 0 3 0) (layer "F.Fab") (uuid "00000000-0000-0000-0000-0000000000a2"))
    (property "PART NUMBER" "LM358DR" (at 0 0 0) (layer "F.Fab") (hide yes) (uuid "00000000-0000-0000-0000-0000000000a3"))
  )
)
"#;

fn snapshot(board: &LoadedBoard) -> &SnapshotBoard {
    match board {
        LoadedBoard::Snapshot(board) => board,
        LoadedBoard::Kicad(_) => panic!("expected a snapshot board"),
    }
}

#[test]
fn rename_across_mixed_components() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("board.json");
    fs::write(&path, SNAPSHOT).unwrap();

    let mut loaded = board::load(&path, FormatPreference::Auto).unwrap();
    let request = RenameRequest::new("PART NUMBER", "MPN", false).unwrap();
    let outcome = field::execute(loaded.as_board_mut(), &request);

    assert_eq!(outcome.found_count, 2);
    assert_eq!(outcome.modified_count, 2);
    assert_eq!(
        outcome.summary(&request),
        "Renamed 2 occurrence(s) of 'PART NUMBER' → 'MPN'. Modified footprints: 2."
    );

    let components = &snapshot(&loaded).components;
    assert_eq!(components[0].property_pairs(), vec![("MPN", "ABC123")]);
    assert_eq!(components[1].field_pairs(), vec![("MPN", "XYZ999")]);
    assert!(components[2].property_pairs().is_empty());
    assert!(components[2].field_pairs().is_empty());
}

#[test]
fn copy_keeps_originals_and_adds_new_entries() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("board.json");
    fs::write(&path, SNAPSHOT).unwrap();

    let mut loaded = board::load(&path, FormatPreference::Auto).unwrap();
    let request = RenameRequest::new("part number", "MPN", true).unwrap();
    let outcome = field::execute(loaded.as_board_mut(), &request);

    assert_eq!(outcome.found_count, 2);
    assert!(outcome.summary(&request).starts_with("Copied 2 occurrence(s)"));

    let components = &snapshot(&loaded).components;
    assert_eq!(
        components[0].property_pairs(),
        vec![("PART NUMBER", "ABC123"), ("MPN", "ABC123")]
    );
    // U1 has no property mapping, so the field itself is duplicated.
    assert_eq!(
        components[1].field_pairs(),
        vec![("Part Number", "XYZ999"), ("MPN", "XYZ999")]
    );
    assert!(components[1].properties.is_none());
    assert_eq!(outcome.components[1].strategy, Strategy::FieldDuplicated);
}

#[test]
fn saved_snapshot_round_trips_through_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("board.json");
    fs::write(&path, SNAPSHOT).unwrap();

    let mut loaded = board::load(&path, FormatPreference::Auto).unwrap();
    let request = RenameRequest::new("Part Number", "MPN", false).unwrap();
    field::execute(loaded.as_board_mut(), &request);
    let backup = board::save(&loaded, &path, true).unwrap();

    assert_eq!(fs::read_to_string(backup.unwrap()).unwrap(), SNAPSHOT);

    let reloaded = board::load(&path, FormatPreference::Auto).unwrap();
    let components = &snapshot(&reloaded).components;
    assert_eq!(components[0].property_pairs(), vec![("MPN", "ABC123")]);
    assert_eq!(components[1].field_pairs(), vec![("MPN", "XYZ999")]);
}

#[test]
fn kicad_board_rename_is_written_in_place() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("amp.kicad_pcb");
    fs::write(&path, KICAD_FIELDS).unwrap();

    let mut loaded = board::load(&path, FormatPreference::Auto).unwrap();
    assert_eq!(loaded.kind(), "kicad/fields");

    let request = RenameRequest::new("Part Number", "MPN", false).unwrap();
    let outcome = field::execute(loaded.as_board_mut(), &request);
    assert_eq!(outcome.components[0].strategy, Strategy::FieldRenamed);
    assert_eq!(outcome.components[0].reference.as_deref(), Some("U1"));

    assert!(board::save(&loaded, &path, false).unwrap().is_none());
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        KICAD_FIELDS.replace("(property \"PART NUMBER\"", "(property \"MPN\"")
    );
}

#[test]
fn no_match_leaves_board_untouched() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("amp.kicad_pcb");
    fs::write(&path, KICAD_FIELDS).unwrap();

    let mut loaded = board::load(&path, FormatPreference::Auto).unwrap();
    let request = RenameRequest::new("Supplier", "Vendor", false).unwrap();
    let outcome = field::execute(loaded.as_board_mut(), &request);

    assert_eq!(outcome.found_count, 0);
    assert_eq!(outcome.modified_count, 0);
    assert!(outcome.components.is_empty());
    assert_eq!(loaded.render().unwrap(), KICAD_FIELDS);
}

#[test]
fn inventory_reports_names_across_representations() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("board.json");
    fs::write(&path, SNAPSHOT).unwrap();

    let mut loaded = board::load(&path, FormatPreference::Auto).unwrap();
    let usages = field::inventory(loaded.as_board_mut());

    assert_eq!(usages.len(), 1);
    assert_eq!(usages[0].name, "PART NUMBER");
    assert_eq!(usages[0].components, 2);
    assert_eq!(usages[0].in_properties, 1);
    assert_eq!(usages[0].in_fields, 1);
    assert_eq!(usages[0].variants, vec!["Part Number".to_string()]);
}

#[test]
fn invalid_requests_are_rejected_before_any_board_work() {
    let err = RenameRequest::new("  ", "MPN", false).unwrap_err();
    assert_eq!(err.code, ErrorCode::ValidationInvalidArgument);

    let err = RenameRequest::new("MPN", " mpn ", false).unwrap_err();
    assert_eq!(err.code, ErrorCode::ValidationInvalidArgument);
}

#[test]
fn malformed_board_reports_position() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.kicad_pcb");
    fs::write(&path, "(kicad_pcb (version 20240108)\n  (footprint \"R\"\n").unwrap();

    let err = board::load(&path, FormatPreference::Auto).unwrap_err();
    assert_eq!(err.code, ErrorCode::BoardParseFailed);
    assert!(err.details["line"].is_number());
}
