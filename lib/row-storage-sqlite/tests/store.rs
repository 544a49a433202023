#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

use row_storage::{
    AfterPut, Changes, DefaultPutResolver, DeleteConfig, DeleteQuery, GetConfig, ObserveChanges,
    PreparedOperation, PutConfig, PutResolver, PutResult, RawQuery, RowValues, SelectQuery,
    StorageError, Store, StoreConnection, StoreExecutor, Value, deserialize_row,
    row_from_serialize,
};
use row_storage_sqlite::SqliteExecutor;
use serde::{Deserialize, Serialize};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        _id INTEGER PRIMARY KEY,
        name TEXT NOT NULL UNIQUE,
        active INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE TABLE IF NOT EXISTS tweets (
        _id INTEGER PRIMARY KEY,
        author TEXT NOT NULL,
        content TEXT NOT NULL
    )",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<i64>,
    name: String,
    active: i64,
}

impl User {
    fn new(name: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            active: 1,
        }
    }
}

fn store() -> Store<SqliteExecutor> {
    let executor = SqliteExecutor::connect(":memory:").unwrap();
    executor.initialize(SCHEMA).unwrap();
    Store::new(executor)
}

fn user_config() -> PutConfig<User> {
    PutConfig::builder()
        .map_func(|user: &User| row_from_serialize(user))
        .table("users")
        .build()
        .unwrap()
}

fn by_name() -> DeleteConfig<User> {
    DeleteConfig::builder()
        .map_func(|user: &User| {
            DeleteQuery::builder()
                .table("users")
                .where_clause("name = ?")
                .where_args([user.name.as_str()])
                .build()
        })
        .build()
        .unwrap()
}

fn all_users(store: &Store<SqliteExecutor>) -> Vec<User> {
    let config = GetConfig::builder()
        .query(
            SelectQuery::builder()
                .table("users")
                .order_by("_id")
                .build()
                .unwrap(),
        )
        .build()
        .unwrap();

    store
        .get(config)
        .execute()
        .unwrap()
        .iter()
        .map(|row| deserialize_row(row).unwrap())
        .collect()
}

async fn no_notification(receiver: &mut row_storage::ChangesReceiver) -> bool {
    tokio::time::timeout(Duration::from_millis(50), receiver.recv())
        .await
        .is_err()
}

#[test]
fn upsert_inserts_updates_and_falls_back() {
    let store = store();
    let config = PutConfig::rows().table("users").build().unwrap();

    let inserted = store
        .put_row(RowValues::new().with("name", "ann"), config.clone())
        .execute()
        .unwrap();
    assert_eq!(inserted.inserted_id(), Some(1));

    let updated = store
        .put_row(
            RowValues::new().with("_id", 1).with("name", "annie"),
            config.clone(),
        )
        .execute()
        .unwrap();
    assert_eq!(updated.rows_updated(), Some(1));

    let fallback = store
        .put_row(RowValues::new().with("_id", 42).with("name", "bob"), config)
        .execute()
        .unwrap();
    assert_eq!(fallback.inserted_id(), Some(42));

    let names: Vec<String> = all_users(&store).into_iter().map(|u| u.name).collect();
    assert_eq!(names, vec!["annie", "bob"]);
}

#[test]
fn batch_put_reports_per_object_outcome() {
    let store = store();
    store
        .put_object(User::new("ann"), user_config())
        .execute()
        .unwrap();

    let existing = Arc::new(User {
        id: Some(1),
        name: "ann".to_string(),
        active: 0,
    });
    let fresh = Arc::new(User::new("bob"));

    let results = store
        .put_objects([Arc::clone(&existing), Arc::clone(&fresh)], user_config())
        .execute()
        .unwrap();

    assert_eq!(results.len(), 2);
    assert!(results.get(&existing).unwrap().was_updated());
    assert!(results.get(&fresh).unwrap().was_inserted());
    assert_eq!(results.number_of_inserts(), 1);
    assert_eq!(results.number_of_updates(), 1);
}

#[tokio::test]
async fn failed_transactional_batch_rolls_back_and_stays_silent() {
    let store = store();
    let mut receiver = store.observe_changes_in_table("users");

    let users = [User::new("ann"), User::new("bob"), User::new("ann")];
    let err = store.put_objects(users, user_config()).execute();

    assert!(err.is_err());
    assert!(all_users(&store).is_empty());
    assert!(!store.executor().in_transaction().unwrap());
    assert!(no_notification(&mut receiver).await);
}

#[tokio::test]
async fn failed_batch_without_transaction_keeps_earlier_items() {
    let store = store();
    let mut receiver = store.observe_changes_in_table("users");

    let config = PutConfig::builder()
        .map_func(|user: &User| row_from_serialize(user))
        .table("users")
        .dont_use_transaction()
        .build()
        .unwrap();
    let users = [User::new("ann"), User::new("bob"), User::new("ann")];

    assert!(store.put_objects(users, config).execute().is_err());
    assert_eq!(all_users(&store).len(), 2);

    assert_eq!(receiver.recv().await, Some(Changes::table("users")));
    assert_eq!(receiver.recv().await, Some(Changes::table("users")));
    assert!(no_notification(&mut receiver).await);
}

#[tokio::test]
async fn successful_batch_notifies_once() {
    let store = store();
    let mut receiver = store.observe_changes_in_tables(["users", "tweets"]);

    let users: Vec<User> = ["ann", "bob", "cat"].into_iter().map(User::new).collect();
    store
        .put_objects(users, user_config())
        .execute_async()
        .await
        .unwrap();

    assert_eq!(receiver.recv().await, Some(Changes::table("users")));
    assert!(no_notification(&mut receiver).await);
}

#[test]
fn delete_tracks_each_object_and_reads_back_survivors() {
    let store = store();
    let users: Vec<Arc<User>> = ["ann", "bob", "cat"]
        .into_iter()
        .map(|name| Arc::new(User::new(name)))
        .collect();
    store
        .put_objects(users.iter().cloned(), user_config())
        .execute()
        .unwrap();

    let ghost = Arc::new(User::new("ghost"));
    let targets = vec![Arc::clone(&users[0]), Arc::clone(&ghost), Arc::clone(&users[2])];

    let results = store
        .delete_objects(targets, by_name())
        .execute()
        .unwrap();

    assert!(results.was_deleted(&users[0]));
    assert!(results.was_not_deleted(&ghost));
    assert!(results.was_deleted(&users[2]));
    assert!(!results.contains(&users[1]));

    let survivors = all_users(&store);
    assert_eq!(survivors.len(), 1);
    assert_eq!(survivors[0].name, "bob");
    assert_eq!(survivors[0].id, Some(2));
}

#[test]
fn after_put_copies_inserted_id_back() {
    struct Tweet {
        id: AtomicI64,
        author: String,
        content: String,
    }

    let resolver = AfterPut::new(
        DefaultPutResolver::for_table("tweets"),
        |tweet: &Tweet, result: &PutResult| {
            if let Some(id) = result.inserted_id() {
                tweet.id.store(id, Ordering::SeqCst);
            }
        },
    );
    let config = PutConfig::builder()
        .map_func(|tweet: &Tweet| {
            Ok(RowValues::new()
                .with("author", tweet.author.as_str())
                .with("content", tweet.content.as_str()))
        })
        .resolver(resolver)
        .build()
        .unwrap();

    let tweets: Vec<Arc<Tweet>> = (0..3)
        .map(|i| {
            Arc::new(Tweet {
                id: AtomicI64::new(0),
                author: "ann".to_string(),
                content: format!("tweet {}", i),
            })
        })
        .collect();

    store()
        .put_objects(tweets.iter().cloned(), config)
        .execute()
        .unwrap();

    let ids: Vec<i64> = tweets.iter().map(|t| t.id.load(Ordering::SeqCst)).collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[tokio::test]
async fn exec_sql_and_delete_by_query_notify_their_tables() {
    let store = store();
    store
        .put_object(User::new("ann"), user_config())
        .execute()
        .unwrap();
    let mut receiver = store.observe_changes_in_tables(["users", "tweets"]);

    store
        .exec_sql(
            RawQuery::builder()
                .sql("INSERT INTO tweets (author, content) VALUES (?, ?)")
                .args(["ann", "hello"])
                .affects_tables(["tweets"])
                .build()
                .unwrap(),
        )
        .execute()
        .unwrap();
    assert_eq!(receiver.recv().await, Some(Changes::table("tweets")));

    let deleted = store
        .delete_by_query(DeleteQuery::builder().table("users").build().unwrap())
        .execute()
        .unwrap();
    assert_eq!(deleted.rows_deleted(), 1);
    assert_eq!(receiver.recv().await, Some(Changes::table("users")));
}

#[test]
fn raw_query_binds_arguments() {
    let store = store();
    let users: Vec<User> = ["ann", "bob"].into_iter().map(User::new).collect();
    store.put_objects(users, user_config()).execute().unwrap();

    let config = GetConfig::builder()
        .query(
            RawQuery::builder()
                .sql("SELECT name FROM users WHERE name = ?")
                .args(["bob"])
                .build()
                .unwrap(),
        )
        .build()
        .unwrap();
    let rows = store.get(config).execute().unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("name"), Some(&Value::from("bob")));
}

#[test]
fn file_backed_store_survives_reconnect() {
    let path = std::env::temp_dir().join(format!("row-storage-{}.db", std::process::id()));
    let _ = std::fs::remove_file(&path);

    {
        let executor = SqliteExecutor::connect(path.clone()).unwrap();
        executor.initialize(SCHEMA).unwrap();
        Store::new(executor)
            .put_object(User::new("ann"), user_config())
            .execute()
            .unwrap();
    }

    let executor = SqliteExecutor::connect(path.clone()).unwrap();
    executor.initialize(SCHEMA).unwrap();
    let names: Vec<String> = all_users(&Store::new(executor))
        .into_iter()
        .map(|u| u.name)
        .collect();
    assert_eq!(names, vec!["ann"]);

    let _ = std::fs::remove_file(&path);
}

/// Inserts its row, reports that the transaction holds a write, then fails
/// once the other thread has had time to reach the executor.
struct InsertThenFail {
    written: mpsc::Sender<()>,
}

impl PutResolver<RowValues> for InsertThenFail {
    fn perform_put(
        &self,
        executor: &dyn StoreExecutor,
        row: &RowValues,
    ) -> Result<PutResult, StorageError> {
        let default = DefaultPutResolver::for_table("users");
        PutResolver::<RowValues>::perform_put(&default, executor, row)?;

        let _ = self.written.send(());
        thread::sleep(Duration::from_millis(100));
        Err(StorageError::StorageError("rejected".to_string()))
    }
}

/// Starts a transactional batch on its own thread and returns once its
/// insert is in, with the transaction still open.
fn start_failing_batch(store: &Store<SqliteExecutor>) -> thread::JoinHandle<bool> {
    let (written, inside) = mpsc::channel();
    let config = PutConfig::rows()
        .resolver(InsertThenFail { written })
        .build()
        .unwrap();
    let store = store.clone();

    let handle = thread::spawn(move || {
        store
            .put_rows([RowValues::new().with("name", "rolled-back")], config)
            .execute()
            .is_err()
    });
    inside.recv().unwrap();
    handle
}

fn names(store: &Store<SqliteExecutor>) -> Vec<String> {
    all_users(store).into_iter().map(|u| u.name).collect()
}

#[test]
fn put_from_another_thread_waits_for_open_transaction() {
    let store = store();
    let failing = start_failing_batch(&store);

    let other = store.clone();
    let put = thread::spawn(move || {
        let config = PutConfig::rows().table("users").build().unwrap();
        other
            .put_row(RowValues::new().with("name", "bob"), config)
            .execute()
    });

    let result = put.join().unwrap().unwrap();
    assert!(failing.join().unwrap());
    assert!(result.was_inserted());
    assert_eq!(names(&store), vec!["bob"]);
}

#[test]
fn transactional_batch_from_another_thread_waits_instead_of_failing() {
    let store = store();
    let failing = start_failing_batch(&store);

    let other = store.clone();
    let batch = thread::spawn(move || {
        let config = PutConfig::rows().table("users").build().unwrap();
        let rows = ["bob", "cat"].map(|name| RowValues::new().with("name", name));
        other.put_rows(rows, config).execute()
    });

    let results = batch.join().unwrap().unwrap();
    assert!(failing.join().unwrap());
    assert_eq!(results.number_of_inserts(), 2);
    assert_eq!(names(&store), vec!["bob", "cat"]);
    assert!(!store.executor().in_transaction().unwrap());
}
