use fedlock_db::{create_pool, run_migrations, DbRuntimeSettings};

#[test]
fn fresh_database_gets_the_federation_cache_table() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let path = dir.path().join("cache.db");
    let pool = create_pool(path.to_str().unwrap(), DbRuntimeSettings::default())
        .expect("failed to create pool");
    let conn = pool.get().expect("failed to get connection");
    let applied = run_migrations(&conn).expect("failed to run migrations");
    assert_eq!(applied, 2);

    let mut stmt = conn
        .prepare(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .expect("failed to prepare table query");
    let tables: Vec<String> = stmt
        .query_map([], |row| row.get(0))
        .expect("failed to execute table query")
        .map(|r| r.expect("failed to read table name"))
        .collect();

    assert_eq!(tables, vec!["_fedlock_migrations", "federation_records"]);
}

#[test]
fn migrations_survive_reopening_the_file() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let path = dir.path().join("cache.db");
    let path = path.to_str().unwrap();

    {
        let pool = create_pool(path, DbRuntimeSettings::default()).unwrap();
        run_migrations(&pool.get().unwrap()).unwrap();
    }

    let pool = create_pool(path, DbRuntimeSettings::default()).unwrap();
    assert_eq!(run_migrations(&pool.get().unwrap()).unwrap(), 0);
}
