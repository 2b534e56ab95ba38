//! End-to-end checks against a live server.
//!
//! Every test returns early when `DATABASE_URL` is not set. Each one works inside
//! its own throwaway schema.

use pgstore::{
    EntityDescriptor, ErrorKind, FieldDescriptor, FieldType, Filter, IndexDescriptor,
    IntegrityKind, KeywordCache, Operator, Query, Record, Repository, RepositoryConfig, TimeRole,
    Value,
};

async fn try_connect() -> Option<tokio_postgres::Client> {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").ok()?;
    let (client, connection) = tokio_postgres::connect(&database_url, tokio_postgres::NoTls)
        .await
        .expect("Failed to connect to DATABASE_URL with NoTls");
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            eprintln!("tokio-postgres connection error: {e}");
        }
    });
    Some(client)
}

struct Scratch {
    schema: String,
    repo: Repository,
}

async fn scratch(client: &tokio_postgres::Client, cache: &KeywordCache) -> Scratch {
    let schema = format!("pgstore_it_{}", uuid::Uuid::new_v4().simple());
    client
        .batch_execute(&format!("CREATE SCHEMA {schema}"))
        .await
        .unwrap();
    let mut repo =
        Repository::new(RepositoryConfig::default().default_schema(schema.clone())).unwrap();
    repo.initialize(client, cache).await.unwrap();
    Scratch { schema, repo }
}

async fn drop_scratch(client: &tokio_postgres::Client, scratch: &Scratch) {
    client
        .batch_execute(&format!("DROP SCHEMA {} CASCADE", scratch.schema))
        .await
        .unwrap();
}

fn widget(repo: &Repository) -> EntityDescriptor {
    let mut entity = EntityDescriptor::new("Widget")
        .field(FieldDescriptor::new("id", FieldType::I64).primary())
        .field(FieldDescriptor::new("name", FieldType::String).not_null().unique())
        .field(FieldDescriptor::new("qty", FieldType::I32))
        .field(FieldDescriptor::new(
            "note",
            FieldType::optional(FieldType::String),
        ))
        .field(
            FieldDescriptor::new("created_at", FieldType::optional(FieldType::Timestamp))
                .time_role(TimeRole::Created),
        )
        .index(IndexDescriptor::on(["qty"]));
    repo.prepare(&mut entity).unwrap();
    entity
}

#[tokio::test]
async fn migrate_twice_issues_nothing_the_second_time() {
    let Some(client) = try_connect().await else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };
    let cache = KeywordCache::new();
    let scratch = scratch(&client, &cache).await;
    let entity = widget(&scratch.repo);

    let first = scratch.repo.migrate(&client, &[&entity]).await.unwrap();
    assert!(!first.is_empty());
    let second = scratch.repo.migrate(&client, &[&entity]).await.unwrap();
    assert_eq!(second, Vec::new());

    drop_scratch(&client, &scratch).await;
}

#[tokio::test]
async fn heterogeneous_insert_writes_keys_back_in_order() {
    let Some(client) = try_connect().await else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };
    let cache = KeywordCache::new();
    let scratch = scratch(&client, &cache).await;
    let entity = widget(&scratch.repo);
    scratch.repo.migrate(&client, &[&entity]).await.unwrap();
    let repo = &scratch.repo;

    let mut rows = vec![
        Record::new().with("name", "a").with("qty", 1),
        Record::new().with("name", "b").with("note", "second"),
        Record::new().with("name", "c").with("qty", 3),
    ];
    let query = Query::new(&entity).field_sets([
        entity.field_set(&["name", "qty"]).unwrap(),
        entity.field_set(&["name", "note"]).unwrap(),
        entity.field_set(&["qty", "name"]).unwrap(),
    ]);
    let inserted = repo.insert(&client, &query, &mut rows).await.unwrap();
    assert_eq!(inserted, 3);

    let ids: Vec<i64> = rows
        .iter()
        .map(|r| r.get("id").and_then(Value::as_i64).unwrap())
        .collect();
    assert!(ids.iter().all(|id| *id > 0));
    let id = entity.field_by_name("id").unwrap();
    let found: Vec<Record> = repo
        .find(&client, &Query::new(&entity).filter(Filter::eq(id, ids[1])))
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].get("name"), Some(&Value::from("b")));
    assert_eq!(found[0].get("note"), Some(&Value::from("second")));

    drop_scratch(&client, &scratch).await;
}

#[tokio::test]
async fn update_count_and_delete() {
    let Some(client) = try_connect().await else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };
    let cache = KeywordCache::new();
    let scratch = scratch(&client, &cache).await;
    let entity = widget(&scratch.repo);
    scratch.repo.migrate(&client, &[&entity]).await.unwrap();
    let repo = &scratch.repo;
    let qty = entity.field_by_name("qty").unwrap();

    let mut rows: Vec<Record> = (0..4i32)
        .map(|i| Record::new().with("name", format!("w{i}").as_str()).with("qty", i))
        .collect();
    let insert = Query::new(&entity).field_set(entity.field_set(&["name", "qty"]).unwrap());
    repo.insert(&client, &insert, &mut rows).await.unwrap();

    rows[0].set("qty", 10);
    rows[1].set("qty", 11);
    let update = Query::new(&entity).field_set(entity.field_set(&["qty"]).unwrap());
    let touched = repo.update(&client, &update, &rows[..2]).await.unwrap();
    assert_eq!(touched, 2);

    let big = Query::new(&entity).filter(Filter::new(qty, Operator::Gte, [10]));
    assert_eq!(repo.count(&client, &big).await.unwrap(), 2);

    let deleted = repo.delete(&client, &big).await.unwrap();
    assert_eq!(deleted, 2);
    assert_eq!(repo.count(&client, &Query::new(&entity)).await.unwrap(), 2);

    drop_scratch(&client, &scratch).await;
}

#[tokio::test]
async fn duplicate_unique_value_is_classified() {
    let Some(client) = try_connect().await else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };
    let cache = KeywordCache::new();
    let scratch = scratch(&client, &cache).await;
    let entity = widget(&scratch.repo);
    scratch.repo.migrate(&client, &[&entity]).await.unwrap();

    let query = Query::new(&entity).field_set(entity.field_set(&["name"]).unwrap());
    let mut rows = vec![Record::new().with("name", "dup"), Record::new().with("name", "dup")];
    let err = scratch
        .repo
        .insert(&client, &query, &mut rows)
        .await
        .unwrap_err();
    assert!(err.is_unique_violation(), "{err}");
    assert_eq!(err.kind(), ErrorKind::IntegrityViolation(IntegrityKind::Unique));
    assert_eq!(err.code(), Some("23505"));

    drop_scratch(&client, &scratch).await;
}

#[tokio::test]
async fn failing_group_leaves_no_rows_from_earlier_groups() {
    let Some(client) = try_connect().await else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };
    let cache = KeywordCache::new();
    let scratch = scratch(&client, &cache).await;
    let entity = widget(&scratch.repo);
    let repo = &scratch.repo;
    repo.migrate(&client, &[&entity]).await.unwrap();

    let mut rows = vec![
        Record::new().with("name", "a").with("qty", 1),
        Record::new().with("name", "a").with("note", "clash"),
    ];
    let query = Query::new(&entity).field_sets([
        entity.field_set(&["name", "qty"]).unwrap(),
        entity.field_set(&["name", "note"]).unwrap(),
    ]);
    let err = repo.insert(&client, &query, &mut rows).await.unwrap_err();
    assert!(err.is_unique_violation(), "{err}");
    assert_eq!(rows[0].get("id"), None);

    assert_eq!(repo.count(&client, &Query::new(&entity)).await.unwrap(), 0);

    // The connection is usable again once the batch has rolled back.
    let mut rows = vec![Record::new().with("name", "b")];
    let single = Query::new(&entity).field_set(entity.field_set(&["name"]).unwrap());
    assert_eq!(repo.insert(&client, &single, &mut rows).await.unwrap(), 1);

    drop_scratch(&client, &scratch).await;
}

#[tokio::test]
async fn rolled_back_transaction_leaves_no_rows() {
    let Some(client) = try_connect().await else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };
    let cache = KeywordCache::new();
    let scratch = scratch(&client, &cache).await;
    let entity = widget(&scratch.repo);
    let repo = &scratch.repo;
    repo.migrate(&client, &[&entity]).await.unwrap();

    let query = Query::new(&entity).field_set(entity.field_set(&["name"]).unwrap());
    let tx = repo.begin(&client, repo.tx_options()).await.unwrap();
    let mut rows = vec![Record::new().with("name", "gone")];
    repo.insert(&tx, &query, &mut rows).await.unwrap();
    assert_eq!(repo.count(&tx, &Query::new(&entity)).await.unwrap(), 1);
    tx.rollback().await.unwrap();

    assert_eq!(repo.count(&client, &Query::new(&entity)).await.unwrap(), 0);

    drop_scratch(&client, &scratch).await;
}

#[tokio::test]
async fn health_check_reports_version() {
    let Some(client) = try_connect().await else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };
    let repo = Repository::new(RepositoryConfig::default()).unwrap();
    let status = repo.health_check(&client).await.unwrap();
    assert!(status.version.starts_with("PostgreSQL"));

    let rows = client.query("SELECT 1", &[]).await.unwrap();
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn keyword_table_is_loaded_once_per_version() {
    let Some(client) = try_connect().await else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };
    let cache = KeywordCache::new();
    let version = pgstore::server_version(&client).await.unwrap();
    let dialect = cache.load(&client, version).await.unwrap();
    assert!(dialect.has_keywords());
    assert_eq!(dialect.quote("select"), "\"select\"");
    assert_eq!(dialect.quote("widgets"), "widgets");
    assert!(cache.get(version).is_some());
}

#[tokio::test]
async fn transaction_macro_commits_on_ok() {
    let Some(client) = try_connect().await else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };
    let cache = KeywordCache::new();
    let scratch = scratch(&client, &cache).await;
    let entity = widget(&scratch.repo);
    let repo = &scratch.repo;
    repo.migrate(&client, &[&entity]).await.unwrap();
    let query = Query::new(&entity).field_set(entity.field_set(&["name"]).unwrap());

    let result: pgstore::OrmResult<u64> = async {
        pgstore::transaction!(&client, repo.tx_options(), tx, {
            let mut rows = vec![Record::new().with("name", "kept")];
            repo.insert(&tx, &query, &mut rows).await
        })
    }
    .await;
    assert_eq!(result.unwrap(), 1);
    assert_eq!(repo.count(&client, &Query::new(&entity)).await.unwrap(), 1);

    drop_scratch(&client, &scratch).await;
}
