//! Integration tests for schema initialization using in-memory SurrealDB.

use surrealdb::Surreal;
use surrealdb::engine::local::Mem;

#[tokio::test]
async fn schema_migration_applies_successfully() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    sentinel_db::run_migrations(&db).await.unwrap();

    let mut result = db.query("INFO FOR DB").await.unwrap();
    let info: Option<surrealdb_types::Value> = result.take(0).unwrap();
    let info = info.expect("INFO FOR DB should return a value");
    let info_str = format!("{:?}", info);

    for table in ["tenant", "client", "scope", "user", "verification_token", "_migration"] {
        assert!(info_str.contains(table), "missing {table} table");
    }
}

#[tokio::test]
async fn migration_is_idempotent() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    sentinel_db::run_migrations(&db).await.unwrap();
    sentinel_db::run_migrations(&db).await.unwrap();

    let mut result = db.query("SELECT * FROM _migration").await.unwrap();
    let records: Vec<surrealdb_types::Value> = result.take(0).unwrap();
    assert_eq!(
        records.len(),
        sentinel_db::latest_version() as usize,
        "expected one record per migration"
    );
}

#[tokio::test]
async fn unique_slug_index_rejects_raw_duplicates() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    sentinel_db::run_migrations(&db).await.unwrap();

    db.query("CREATE tenant SET name = 'Acme', slug = 'acme'")
        .await
        .unwrap()
        .check()
        .unwrap();
    let second = db
        .query("CREATE tenant SET name = 'Acme 2', slug = 'acme'")
        .await
        .unwrap()
        .check();
    assert!(second.is_err(), "duplicate slug must be rejected by the index");
}
