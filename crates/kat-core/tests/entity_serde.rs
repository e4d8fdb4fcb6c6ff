//! Serde shape tests for persisted entity types.

use chrono::Utc;
use kat_core::entities::{ChangelogEntry, SyncRun};
use kat_core::enums::{ChangeType, EntityType};
use kat_core::snapshot::CatalogSnapshot;

macro_rules! roundtrip {
    ($name:ident, $ty:ty, $instance:expr) => {
        #[test]
        fn $name() {
            let val: $ty = $instance;
            let json_str = serde_json::to_string_pretty(&val).unwrap();
            let recovered: $ty = serde_json::from_str(&json_str).unwrap();
            assert_eq!(recovered, val, "serde roundtrip failed for {}", stringify!($ty));
        }
    };
}

fn update_entry() -> ChangelogEntry {
    ChangelogEntry {
        id: "chg-0011223344556677".into(),
        sync_id: "syn-8899aabbccddeeff".into(),
        change_type: ChangeType::Update,
        entity_type: EntityType::Column,
        entity_id: "col-1".into(),
        entity_name: "amount".into(),
        field_name: "column_type".into(),
        old_value: "\"INTEGER\"".into(),
        new_value: "\"NUMERIC\"".into(),
        parent_id: Some("tbl-1".into()),
        parent_name: Some("orders".into()),
        grandparent_id: Some("dst-1".into()),
        grandparent_name: Some("sales".into()),
        created_at: Utc::now(),
    }
}

roundtrip!(changelog_entry_roundtrip, ChangelogEntry, update_entry());
roundtrip!(
    sync_run_roundtrip,
    SyncRun,
    SyncRun {
        id: "syn-1".into(),
        project_id: "prj-1".into(),
        started_at: Utc::now(),
    }
);
roundtrip!(empty_snapshot_roundtrip, CatalogSnapshot, CatalogSnapshot::empty("prj-1"));

#[test]
fn changelog_entry_serializes_enums_as_snake_case() {
    let value = serde_json::to_value(update_entry()).unwrap();
    assert_eq!(value["change_type"], "update");
    assert_eq!(value["entity_type"], "column");
    assert_eq!(value["grandparent_name"], "sales");
}
