//! End-to-end: index a snapshot, then search it the way the CLI does.

use chrono::Utc;
use kat_core::entities::{Column, Dataset, Table};
use kat_core::enums::EntityType;
use kat_core::snapshot::{CatalogSnapshot, DatasetNode, TableNode};
use kat_search::SearchIndex;
use kat_search::memory::InMemoryIndex;
use kat_search::query::{ResourceQuery, SearchRequest};
use kat_search::synchronizer::IndexSynchronizer;

fn snapshot(project_id: &str, dataset: &str) -> CatalogSnapshot {
    let now = Utc::now();
    let ds_id = format!("dst-{project_id}");
    let tbl_id = format!("tbl-{project_id}");
    CatalogSnapshot {
        project_id: project_id.into(),
        datasets: vec![DatasetNode {
            dataset: Dataset {
                id: ds_id.clone(),
                name: dataset.into(),
                project_id: project_id.into(),
                description: String::new(),
                created_at: now,
                updated_at: now,
            },
            tables: vec![TableNode {
                table: Table {
                    id: tbl_id.clone(),
                    name: "events".into(),
                    dataset_id: ds_id,
                    description: "Raw events".into(),
                    row_count: 0,
                    created_at: now,
                    updated_at: now,
                },
                columns: vec![Column {
                    id: format!("col-{project_id}"),
                    name: "event_id".into(),
                    table_id: tbl_id,
                    column_type: "STRING".into(),
                    description: String::new(),
                    created_at: now,
                    updated_at: now,
                }],
            }],
        }],
    }
}

#[tokio::test]
async fn projects_do_not_see_each_other() {
    let index = InMemoryIndex::new();
    let sync = IndexSynchronizer::new(&index, 1000);
    sync.sync(&snapshot("a", "web"), &[]).await.unwrap();
    sync.sync(&snapshot("b", "app"), &[]).await.unwrap();
    assert_eq!(index.len(), 6);

    let hits = index
        .search(&SearchRequest::new(ResourceQuery::parse("a", "event"), 20))
        .await
        .unwrap();
    assert_eq!(hits.len(), 2);
    assert!(hits.iter().all(|h| h.project_id() == "a"));

    let hits = index
        .search(&SearchRequest::new(ResourceQuery::parse("b", "ds:"), 20))
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].entity_type(), EntityType::Dataset);
    assert_eq!(hits[0].name(), "app");
}

#[tokio::test]
async fn limit_caps_hits() {
    let index = InMemoryIndex::new();
    IndexSynchronizer::new(&index, 1000)
        .sync(&snapshot("a", "web"), &[])
        .await
        .unwrap();
    let hits = index
        .search(&SearchRequest::new(ResourceQuery::parse("a", ""), 2))
        .await
        .unwrap();
    assert_eq!(hits.len(), 2);
}
