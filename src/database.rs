use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

use crate::data_layer_error::Result;

const CREATE_TABLES: [&str; 5] = [
    "CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        pwd_hash TEXT NOT NULL,
        role TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS revoked_tokens (
        jti TEXT PRIMARY KEY,
        expires INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS stores (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE
    )",
    "CREATE TABLE IF NOT EXISTS items (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        price REAL NOT NULL,
        store_id INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS chats (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        text TEXT NOT NULL,
        username TEXT NOT NULL,
        publish_date TEXT NOT NULL
    )",
];

///
/// Opens a pool for `url`. In-memory databases live only as long as their
/// connection, so those pools are pinned to a single connection that is
/// never recycled.
///
pub async fn connect(url: &str) -> Result<SqlitePool> {
    let pool = if url.contains(":memory:") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect(url)
            .await?
    } else {
        SqlitePool::connect(url).await?
    };

    Ok(pool)
}

///
/// Creates every table the services rely on, skipping those that exist.
///
pub async fn create_tables(db: &SqlitePool) -> Result<()> {
    for statement in CREATE_TABLES {
        sqlx::query(statement).execute(db).await?;
    }
    Ok(())
}
