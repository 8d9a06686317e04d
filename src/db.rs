use std::{str::FromStr, time::Duration};

use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
};

pub mod migrate;
pub mod scheduler;

mod user;
pub use user::UserExt;

mod chapter;
pub use chapter::ChapterExt;

mod resource;
pub use resource::ResourceExt;

mod thread;
pub use thread::ThreadExt;

mod comment;
pub use comment::CommentExt;

mod vote;
pub use vote::VoteExt;

mod reaction;
pub use reaction::ReactionExt;

const CONNECT_ATTEMPTS: u32 = 3;
const CONNECT_RETRY_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct DBClient {
    pool: SqlitePool,
}

impl DBClient {
    pub fn new(pool: SqlitePool) -> Self {
        DBClient { pool }
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Round-trip to the store, used by the health check.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn connect_options(database_url: &str) -> Result<SqliteConnectOptions, sqlx::Error> {
    Ok(SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5)))
}

/// Opens the single-writer pool. SQLite allows one writer at a time, so the
/// pool holds exactly one connection and callers queue on it.
pub async fn connect(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = connect_options(database_url)?;

    if let Some(dir) = options.get_filename().parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            std::fs::create_dir_all(dir)?;
        }
    }

    SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
}

/// Tries `connect` a few times before giving up. `None` means the server
/// should come up without a store and answer 503 where one is needed.
pub async fn connect_with_retry(database_url: &str) -> Option<SqlitePool> {
    for attempt in 1..=CONNECT_ATTEMPTS {
        match connect(database_url).await {
            Ok(pool) => {
                tracing::info!("Connection to the database is successful");
                return Some(pool);
            }
            Err(err) => {
                tracing::error!(
                    "Failed to connect to the database (attempt {}/{}): {:?}",
                    attempt,
                    CONNECT_ATTEMPTS,
                    err
                );
                if attempt < CONNECT_ATTEMPTS {
                    tokio::time::sleep(CONNECT_RETRY_DELAY).await;
                }
            }
        }
    }
    None
}

#[cfg(test)]
pub(crate) async fn test_client() -> DBClient {
    let pool = connect("sqlite::memory:").await.unwrap();
    let report = migrate::run_migrations(&pool).await;
    assert!(report.failed.is_empty(), "{:?}", report.failed);
    DBClient::new(pool)
}
