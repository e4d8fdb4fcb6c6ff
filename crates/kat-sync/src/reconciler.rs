//! Snapshot diffing.
//!
//! [`diff`] compares two snapshots of the same project level by level,
//! matching entities by id. New and removed entities produce one record
//! each and their subtrees are not visited. Matched entities are compared
//! field by field over a fixed, ordered field list and their children are
//! diffed in turn.

use std::collections::HashMap;

use kat_core::change::{ChangeRecord, EntityRef, Lineage};
use kat_core::entities::{Column, Dataset, Table};
use kat_core::enums::EntityType;
use kat_core::errors::CoreError;
use kat_core::snapshot::{CatalogSnapshot, DatasetNode, TableNode};
use serde::Serialize;

/// A compared field value. Serializes to a bare JSON scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
enum FieldValue<'a> {
    Text(&'a str),
    Count(i64),
}

type Fields<'a, const N: usize> = [(&'static str, FieldValue<'a>); N];

fn dataset_fields(d: &Dataset) -> Fields<'_, 2> {
    [
        ("name", FieldValue::Text(&d.name)),
        ("description", FieldValue::Text(&d.description)),
    ]
}

fn table_fields(t: &Table) -> Fields<'_, 3> {
    [
        ("name", FieldValue::Text(&t.name)),
        ("description", FieldValue::Text(&t.description)),
        ("row_count", FieldValue::Count(t.row_count)),
    ]
}

fn column_fields(c: &Column) -> Fields<'_, 3> {
    [
        ("name", FieldValue::Text(&c.name)),
        ("column_type", FieldValue::Text(&c.column_type)),
        ("description", FieldValue::Text(&c.description)),
    ]
}

/// Sibling sets split by id.
struct Matched<'a, T> {
    /// In `after` order: `(before, after)`, `before` absent for inserts.
    current: Vec<(Option<&'a T>, &'a T)>,
    /// In `before` order.
    removed: Vec<&'a T>,
}

fn match_by_id<'a, T>(before: &'a [T], after: &'a [T], id: impl Fn(&T) -> &str) -> Matched<'a, T> {
    let before_by_id: HashMap<&str, &T> = before.iter().map(|n| (id(n), n)).collect();
    let after_by_id: HashMap<&str, &T> = after.iter().map(|n| (id(n), n)).collect();
    Matched {
        current: after
            .iter()
            .map(|n| (before_by_id.get(id(n)).copied(), n))
            .collect(),
        removed: before
            .iter()
            .filter(|n| !after_by_id.contains_key(id(n)))
            .collect(),
    }
}

fn field_updates<const N: usize>(
    out: &mut Vec<ChangeRecord>,
    entity_type: EntityType,
    entity: &EntityRef,
    lineage: &Lineage,
    old: Fields<'_, N>,
    new: Fields<'_, N>,
) -> Result<(), CoreError> {
    for ((field, old_value), (_, new_value)) in old.into_iter().zip(new) {
        if old_value != new_value {
            out.push(ChangeRecord::update(
                entity_type,
                entity.clone(),
                lineage.clone(),
                field,
                &old_value,
                &new_value,
            )?);
        }
    }
    Ok(())
}

fn dataset_ref(d: &Dataset) -> EntityRef {
    EntityRef::new(&d.id, &d.name)
}

fn table_ref(t: &Table) -> EntityRef {
    EntityRef::new(&t.id, &t.name)
}

fn column_ref(c: &Column) -> EntityRef {
    EntityRef::new(&c.id, &c.name)
}

/// Every change that turns `before` into `after`.
///
/// # Errors
///
/// Returns [`CoreError::InvalidChange`] only if a change record cannot be
/// built, which the fixed field lists rule out in practice.
pub fn diff(
    before: &CatalogSnapshot,
    after: &CatalogSnapshot,
) -> Result<Vec<ChangeRecord>, CoreError> {
    let mut out = Vec::new();
    let datasets = match_by_id(&before.datasets, &after.datasets, |n| &n.dataset.id);

    for (old, new) in datasets.current {
        let entity = dataset_ref(&new.dataset);
        let Some(old) = old else {
            out.push(ChangeRecord::insert(EntityType::Dataset, entity, Lineage::root()));
            continue;
        };
        field_updates(
            &mut out,
            EntityType::Dataset,
            &entity,
            &Lineage::root(),
            dataset_fields(&old.dataset),
            dataset_fields(&new.dataset),
        )?;
        diff_tables(&mut out, old, new)?;
    }
    for old in datasets.removed {
        out.push(ChangeRecord::delete(
            EntityType::Dataset,
            dataset_ref(&old.dataset),
            Lineage::root(),
        ));
    }
    Ok(out)
}

fn diff_tables(
    out: &mut Vec<ChangeRecord>,
    before: &DatasetNode,
    after: &DatasetNode,
) -> Result<(), CoreError> {
    let lineage = Lineage::in_dataset(dataset_ref(&after.dataset));
    let tables = match_by_id(&before.tables, &after.tables, |n| &n.table.id);

    for (old, new) in tables.current {
        let entity = table_ref(&new.table);
        let Some(old) = old else {
            out.push(ChangeRecord::insert(EntityType::Table, entity, lineage.clone()));
            continue;
        };
        field_updates(
            out,
            EntityType::Table,
            &entity,
            &lineage,
            table_fields(&old.table),
            table_fields(&new.table),
        )?;
        diff_columns(out, &after.dataset, old, new)?;
    }
    for old in tables.removed {
        out.push(ChangeRecord::delete(EntityType::Table, table_ref(&old.table), lineage.clone()));
    }
    Ok(())
}

fn diff_columns(
    out: &mut Vec<ChangeRecord>,
    dataset: &Dataset,
    before: &TableNode,
    after: &TableNode,
) -> Result<(), CoreError> {
    let lineage = Lineage::in_table(table_ref(&after.table), dataset_ref(dataset));
    let columns = match_by_id(&before.columns, &after.columns, |c| &c.id);

    for (old, new) in columns.current {
        let entity = column_ref(new);
        match old {
            None => out.push(ChangeRecord::insert(EntityType::Column, entity, lineage.clone())),
            Some(old) => field_updates(
                out,
                EntityType::Column,
                &entity,
                &lineage,
                column_fields(old),
                column_fields(new),
            )?,
        }
    }
    for old in columns.removed {
        out.push(ChangeRecord::delete(EntityType::Column, column_ref(old), lineage.clone()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use kat_core::enums::ChangeType;
    use pretty_assertions::assert_eq;

    fn column(id: &str, name: &str, ty: &str) -> Column {
        Column {
            id: id.into(),
            name: name.into(),
            table_id: "tbl-1".into(),
            column_type: ty.into(),
            description: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn table(id: &str, name: &str, columns: Vec<Column>) -> TableNode {
        TableNode {
            table: Table {
                id: id.into(),
                name: name.into(),
                dataset_id: "dst-1".into(),
                description: String::new(),
                row_count: 10,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            columns,
        }
    }

    fn dataset(id: &str, name: &str, description: &str, tables: Vec<TableNode>) -> DatasetNode {
        DatasetNode {
            dataset: Dataset {
                id: id.into(),
                name: name.into(),
                project_id: "prj-a".into(),
                description: description.into(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            tables,
        }
    }

    fn snapshot(datasets: Vec<DatasetNode>) -> CatalogSnapshot {
        CatalogSnapshot {
            project_id: "prj-a".into(),
            datasets,
        }
    }

    fn summary(records: &[ChangeRecord]) -> Vec<(ChangeType, &str, &str)> {
        records
            .iter()
            .map(|r| (r.change_type, r.entity.id.as_str(), r.field_name.as_str()))
            .collect()
    }

    #[test]
    fn identical_snapshots_have_no_changes() {
        let s = snapshot(vec![dataset(
            "dst-1",
            "sales",
            "",
            vec![table("tbl-1", "orders", vec![column("col-1", "id", "INTEGER")])],
        )]);
        assert!(diff(&s, &s.clone()).unwrap().is_empty());
    }

    #[test]
    fn description_change_and_column_swap() {
        let before = snapshot(vec![dataset(
            "dst-1",
            "sales",
            "old",
            vec![table(
                "tbl-1",
                "orders",
                vec![column("col-1", "id", "INTEGER"), column("col-2", "amount", "NUMERIC")],
            )],
        )]);
        let after = snapshot(vec![dataset(
            "dst-1",
            "sales",
            "new",
            vec![table(
                "tbl-1",
                "orders",
                vec![column("col-2", "amount", "NUMERIC"), column("col-3", "total", "NUMERIC")],
            )],
        )]);

        let records = diff(&before, &after).unwrap();
        assert_eq!(
            summary(&records),
            vec![
                (ChangeType::Update, "dst-1", "description"),
                (ChangeType::Insert, "col-3", ""),
                (ChangeType::Delete, "col-1", ""),
            ]
        );
        assert_eq!(records[0].old_value, "\"old\"");
        assert_eq!(records[0].new_value, "\"new\"");

        let inserted = &records[1];
        assert_eq!(inserted.lineage.parent, Some(EntityRef::new("tbl-1", "orders")));
        assert_eq!(inserted.lineage.grandparent, Some(EntityRef::new("dst-1", "sales")));
    }

    #[test]
    fn new_dataset_is_logged_shallowly() {
        let before = snapshot(vec![]);
        let after = snapshot(vec![dataset(
            "dst-1",
            "sales",
            "",
            vec![table("tbl-1", "orders", vec![column("col-1", "id", "INTEGER")])],
        )]);
        assert_eq!(
            summary(&diff(&before, &after).unwrap()),
            vec![(ChangeType::Insert, "dst-1", "")]
        );
    }

    #[test]
    fn removed_table_is_logged_shallowly() {
        let before = snapshot(vec![dataset(
            "dst-1",
            "sales",
            "",
            vec![table("tbl-1", "orders", vec![column("col-1", "id", "INTEGER")])],
        )]);
        let after = snapshot(vec![dataset("dst-1", "sales", "", vec![])]);
        let records = diff(&before, &after).unwrap();
        assert_eq!(summary(&records), vec![(ChangeType::Delete, "tbl-1", "")]);
        assert_eq!(records[0].lineage, Lineage::in_dataset(EntityRef::new("dst-1", "sales")));
    }

    #[test]
    fn every_changed_field_is_one_record() {
        let mut changed = table("tbl-1", "orders", vec![column("col-1", "id", "STRING")]);
        changed.table.description = "Orders".into();
        changed.table.row_count = 11;
        changed.columns[0].description = "Key".into();

        let before = snapshot(vec![dataset(
            "dst-1",
            "sales",
            "",
            vec![table("tbl-1", "orders", vec![column("col-1", "id", "INTEGER")])],
        )]);
        let after = snapshot(vec![dataset("dst-1", "sales", "", vec![changed])]);

        let records = diff(&before, &after).unwrap();
        assert_eq!(
            summary(&records),
            vec![
                (ChangeType::Update, "tbl-1", "description"),
                (ChangeType::Update, "tbl-1", "row_count"),
                (ChangeType::Update, "col-1", "column_type"),
                (ChangeType::Update, "col-1", "description"),
            ]
        );
        assert_eq!(records[1].old_value, "10");
        assert_eq!(records[1].new_value, "11");
    }

    #[test]
    fn empty_remote_deletes_each_dataset_once() {
        let before = snapshot(vec![
            dataset("dst-1", "sales", "", vec![table("tbl-1", "orders", vec![])]),
            dataset("dst-2", "marketing", "", vec![]),
        ]);
        let records = diff(&before, &snapshot(vec![])).unwrap();
        assert_eq!(
            summary(&records),
            vec![(ChangeType::Delete, "dst-1", ""), (ChangeType::Delete, "dst-2", "")]
        );
        assert!(records.iter().all(|r| r.lineage == Lineage::root()));
    }
}
