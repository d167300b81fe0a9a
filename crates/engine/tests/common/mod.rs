#![allow(dead_code)]

use std::{path::PathBuf, time::Duration};

use chrono::Utc;
use sea_orm::Database;

use engine::{
    Cursor, Money, Month, NewExpense, Notice, RecordStore, SqliteStore, SyncController,
};
use migration::MigratorTrait;
use uuid::Uuid;

pub async fn store_with_file_db() -> (SqliteStore, PathBuf) {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../target/test_dbs");
    std::fs::create_dir_all(&root).unwrap();

    let path = root.join(format!("engine_{}.db", Uuid::new_v4()));
    let url = format!("sqlite:{}?mode=rwc", path.display());

    let db = Database::connect(&url).await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();

    (SqliteStore::builder().database(db).build(), path)
}

pub fn cursor(month: u8, year: i32) -> Cursor {
    Cursor::new(Month::new(month).unwrap(), year)
}

pub fn draft(owner: &str, label: &str, amount: i64, at: Cursor) -> NewExpense {
    NewExpense::new(owner, label, Money::new(amount), at, Utc::now()).unwrap()
}

/// Wait for the next notice, failing the test instead of hanging.
pub async fn next_notice<S: RecordStore>(controller: &mut SyncController<S>) -> Notice {
    tokio::time::timeout(Duration::from_secs(5), controller.process_next())
        .await
        .expect("timed out waiting for a sync notice")
        .expect("sync channel closed")
}
