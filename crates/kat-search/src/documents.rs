//! Index documents derived from a catalog snapshot.
//!
//! Each dataset, table and column becomes one flat document keyed by its
//! catalog id, tagged with `type` and denormalized with its ancestors' ids
//! and names so hits render without a store lookup.

use kat_core::enums::EntityType;
use kat_core::snapshot::CatalogSnapshot;
use serde::{Deserialize, Serialize};

/// Primary key field of every document.
pub const PRIMARY_KEY: &str = "id";

/// Attributes usable in filters.
pub const FILTERABLE_ATTRIBUTES: [&str; 4] = ["project_id", "type", "dataset_id", "table_id"];

/// Attributes matched by free-text queries.
pub const SEARCHABLE_ATTRIBUTES: [&str; 4] = ["name", "description", "type", "column_type"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResourceDocument {
    Dataset(DatasetDocument),
    Table(TableDocument),
    Column(ColumnDocument),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetDocument {
    pub id: String,
    pub name: String,
    pub description: String,
    pub project_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDocument {
    pub id: String,
    pub name: String,
    pub description: String,
    pub row_count: i64,
    pub project_id: String,
    pub parent_id: String,
    pub dataset_id: String,
    pub dataset_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDocument {
    pub id: String,
    pub name: String,
    pub description: String,
    pub column_type: String,
    pub project_id: String,
    pub parent_id: String,
    pub table_id: String,
    pub dataset_id: String,
    pub table_name: String,
    pub dataset_name: String,
}

impl ResourceDocument {
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Dataset(d) => &d.id,
            Self::Table(t) => &t.id,
            Self::Column(c) => &c.id,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Dataset(d) => &d.name,
            Self::Table(t) => &t.name,
            Self::Column(c) => &c.name,
        }
    }

    #[must_use]
    pub fn description(&self) -> &str {
        match self {
            Self::Dataset(d) => &d.description,
            Self::Table(t) => &t.description,
            Self::Column(c) => &c.description,
        }
    }

    #[must_use]
    pub fn project_id(&self) -> &str {
        match self {
            Self::Dataset(d) => &d.project_id,
            Self::Table(t) => &t.project_id,
            Self::Column(c) => &c.project_id,
        }
    }

    #[must_use]
    pub const fn entity_type(&self) -> EntityType {
        match self {
            Self::Dataset(_) => EntityType::Dataset,
            Self::Table(_) => EntityType::Table,
            Self::Column(_) => EntityType::Column,
        }
    }

    /// Column type for columns, `None` otherwise.
    #[must_use]
    pub fn column_type(&self) -> Option<&str> {
        match self {
            Self::Column(c) => Some(&c.column_type),
            _ => None,
        }
    }
}

/// Flatten a snapshot into documents, parents before children.
#[must_use]
pub fn documents_from_snapshot(snapshot: &CatalogSnapshot) -> Vec<ResourceDocument> {
    let project_id = &snapshot.project_id;
    let mut docs = Vec::new();
    for ds in &snapshot.datasets {
        let dataset = &ds.dataset;
        docs.push(ResourceDocument::Dataset(DatasetDocument {
            id: dataset.id.clone(),
            name: dataset.name.clone(),
            description: dataset.description.clone(),
            project_id: project_id.clone(),
        }));
        for tn in &ds.tables {
            let table = &tn.table;
            docs.push(ResourceDocument::Table(TableDocument {
                id: table.id.clone(),
                name: table.name.clone(),
                description: table.description.clone(),
                row_count: table.row_count,
                project_id: project_id.clone(),
                parent_id: dataset.id.clone(),
                dataset_id: dataset.id.clone(),
                dataset_name: dataset.name.clone(),
            }));
            for column in &tn.columns {
                docs.push(ResourceDocument::Column(ColumnDocument {
                    id: column.id.clone(),
                    name: column.name.clone(),
                    description: column.description.clone(),
                    column_type: column.column_type.clone(),
                    project_id: project_id.clone(),
                    parent_id: table.id.clone(),
                    table_id: table.id.clone(),
                    dataset_id: dataset.id.clone(),
                    table_name: table.name.clone(),
                    dataset_name: dataset.name.clone(),
                }));
            }
        }
    }
    docs
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::Utc;
    use kat_core::entities::{Column, Dataset, Table};
    use kat_core::snapshot::{CatalogSnapshot, DatasetNode, TableNode};

    /// `sales(orders(id, amount))` under `prj-a`.
    pub fn snapshot() -> CatalogSnapshot {
        let now = Utc::now();
        let column = |id: &str, name: &str, ty: &str| Column {
            id: id.into(),
            name: name.into(),
            table_id: "tbl-1".into(),
            column_type: ty.into(),
            description: String::new(),
            created_at: now,
            updated_at: now,
        };
        CatalogSnapshot {
            project_id: "prj-a".into(),
            datasets: vec![DatasetNode {
                dataset: Dataset {
                    id: "dst-1".into(),
                    name: "sales".into(),
                    project_id: "prj-a".into(),
                    description: "Sales data".into(),
                    created_at: now,
                    updated_at: now,
                },
                tables: vec![TableNode {
                    table: Table {
                        id: "tbl-1".into(),
                        name: "orders".into(),
                        dataset_id: "dst-1".into(),
                        description: "Customer orders".into(),
                        row_count: 42,
                        created_at: now,
                        updated_at: now,
                    },
                    columns: vec![
                        column("col-1", "id", "INTEGER"),
                        column("col-2", "amount", "NUMERIC"),
                    ],
                }],
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn snapshot_flattens_parents_first() {
        let docs = documents_from_snapshot(&fixtures::snapshot());
        let ids: Vec<&str> = docs.iter().map(ResourceDocument::id).collect();
        assert_eq!(ids, vec!["dst-1", "tbl-1", "col-1", "col-2"]);
    }

    #[test]
    fn column_document_wire_shape() {
        let docs = documents_from_snapshot(&fixtures::snapshot());
        let json = serde_json::to_value(&docs[3]).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "column",
                "id": "col-2",
                "name": "amount",
                "description": "",
                "column_type": "NUMERIC",
                "project_id": "prj-a",
                "parent_id": "tbl-1",
                "table_id": "tbl-1",
                "dataset_id": "dst-1",
                "table_name": "orders",
                "dataset_name": "sales",
            })
        );
    }

    #[test]
    fn table_document_carries_row_count_and_dataset() {
        let docs = documents_from_snapshot(&fixtures::snapshot());
        let json = serde_json::to_value(&docs[1]).unwrap();
        assert_eq!(json["type"], "table");
        assert_eq!(json["row_count"], 42);
        assert_eq!(json["parent_id"], "dst-1");
        assert_eq!(json["dataset_name"], "sales");
    }

    #[test]
    fn dataset_document_roundtrips_from_hit() {
        let hit = serde_json::json!({
            "type": "dataset",
            "id": "dst-9",
            "name": "marketing",
            "description": "",
            "project_id": "prj-a",
            "_formatted": {"name": "marketing"}
        });
        let doc: ResourceDocument = serde_json::from_value(hit).unwrap();
        assert_eq!(doc.entity_type(), EntityType::Dataset);
        assert_eq!(doc.name(), "marketing");
        assert_eq!(doc.column_type(), None);
    }
}
