//! Shared test utilities for kat-db unit tests.

#[cfg(test)]
pub(crate) mod helpers {
    use crate::KatDb;

    /// In-memory database with migrations applied.
    pub async fn test_db() -> KatDb {
        KatDb::open_local(":memory:").await.unwrap()
    }

    /// In-memory database with one project `prj-test`.
    pub async fn test_db_with_project() -> KatDb {
        let db = test_db().await;
        db.ensure_project("prj-test", "Test").await.unwrap();
        db
    }

    /// Write `sales(orders(id, amount), refunds(id))` and `marketing()` under
    /// `prj-test` in one committed sync.
    pub async fn seed_catalog(db: &KatDb) {
        let mut w = db.begin_catalog_write("prj-test").await.unwrap();
        w.mark_pending().await.unwrap();
        let sales = w.upsert_dataset("sales", "Sales data").await.unwrap();
        let orders = w.upsert_table(&sales, "orders", "", 10).await.unwrap();
        w.upsert_column(&orders, "id", "INTEGER", "").await.unwrap();
        w.upsert_column(&orders, "amount", "NUMERIC", "Gross").await.unwrap();
        let refunds = w.upsert_table(&sales, "refunds", "", 0).await.unwrap();
        w.upsert_column(&refunds, "id", "INTEGER", "").await.unwrap();
        w.upsert_dataset("marketing", "").await.unwrap();
        w.sweep().await.unwrap();
        w.commit().await.unwrap();
    }
}
