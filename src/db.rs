use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::{
    path::PathBuf,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::{fs, sync::RwLock};

use crate::error::{AppError, AppResult};

pub const MIGRATIONS_DIR: &str = "migrations";

/// Create a SeaORM connection.
pub async fn create_orm_conn(
    database_url: &str,
    connect_timeout: Duration,
) -> Result<DatabaseConnection> {
    let mut options = ConnectOptions::new(database_url.to_owned());
    options
        .connect_timeout(connect_timeout)
        .acquire_timeout(connect_timeout)
        .sqlx_logging(false);
    let conn = Database::connect(options).await?;
    Ok(conn)
}

/// Minimal migration runner that executes SQL files in `migrations/` in filename order.
/// Every statement is idempotent, so the runner is safe to repeat on reconnect.
pub async fn run_migrations(conn: &DatabaseConnection) -> Result<()> {
    let mut entries = fs::read_dir(MIGRATIONS_DIR).await?;
    let mut files: Vec<PathBuf> = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "sql") {
            files.push(path);
        }
    }
    files.sort();

    let backend = conn.get_database_backend();
    for file in files {
        let sql = fs::read_to_string(&file).await?;
        // Postgres prepared statements cannot contain multiple commands,
        // so split the migration file and run each statement individually.
        for stmt in sql.split(';') {
            let stmt = stmt.trim();
            if stmt.is_empty() {
                continue;
            }
            let statement = format!("{stmt};");
            conn.execute(Statement::from_string(backend, statement))
                .await?;
        }
        tracing::debug!(file = %file.display(), "migration applied");
    }

    Ok(())
}

/// Handle to the database that tolerates the database being down.
///
/// The server starts even when the first connection attempt fails; each
/// request that needs the database retries the connection, at most once per
/// `retry_interval`, and gets [`AppError::Unavailable`] until it succeeds.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    database_url: String,
    connect_timeout: Duration,
    retry_interval: Duration,
    slot: RwLock<Slot>,
}

#[derive(Default)]
struct Slot {
    conn: Option<DatabaseConnection>,
    last_attempt: Option<Instant>,
}

impl Store {
    /// Connect now, logging (not returning) a failure.
    pub async fn connect(
        database_url: impl Into<String>,
        connect_timeout: Duration,
        retry_interval: Duration,
    ) -> Self {
        let store = Self::build(database_url.into(), connect_timeout, retry_interval, Slot::default());
        if store.connection().await.is_err() {
            tracing::warn!("starting without a database connection; store routes will report unavailable");
        }
        store
    }

    /// A store whose first connection attempt is deferred by `retry_interval`.
    pub fn disconnected(
        database_url: impl Into<String>,
        connect_timeout: Duration,
        retry_interval: Duration,
    ) -> Self {
        let slot = Slot {
            conn: None,
            last_attempt: Some(Instant::now()),
        };
        Self::build(database_url.into(), connect_timeout, retry_interval, slot)
    }

    pub fn from_connection(conn: DatabaseConnection) -> Self {
        let slot = Slot {
            conn: Some(conn),
            last_attempt: None,
        };
        Self::build(String::new(), Duration::ZERO, Duration::MAX, slot)
    }

    fn build(
        database_url: String,
        connect_timeout: Duration,
        retry_interval: Duration,
        slot: Slot,
    ) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                database_url,
                connect_timeout,
                retry_interval,
                slot: RwLock::new(slot),
            }),
        }
    }

    pub async fn connection(&self) -> AppResult<DatabaseConnection> {
        if let Some(conn) = self.inner.slot.read().await.conn.clone() {
            return Ok(conn);
        }

        let mut slot = self.inner.slot.write().await;
        if let Some(conn) = slot.conn.clone() {
            return Ok(conn);
        }
        if let Some(last) = slot.last_attempt {
            if last.elapsed() < self.inner.retry_interval {
                return Err(AppError::Unavailable);
            }
        }

        slot.last_attempt = Some(Instant::now());
        match self.establish().await {
            Ok(conn) => {
                tracing::info!("database connection established");
                slot.conn = Some(conn.clone());
                Ok(conn)
            }
            Err(err) => {
                tracing::error!(error = %err, "database connection failed");
                Err(AppError::Unavailable)
            }
        }
    }

    async fn establish(&self) -> Result<DatabaseConnection> {
        let conn = create_orm_conn(&self.inner.database_url, self.inner.connect_timeout).await?;
        run_migrations(&conn).await?;
        Ok(conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disconnected_store_reports_unavailable_within_retry_window() {
        let store = Store::disconnected(
            "postgres://nobody@127.0.0.1:1/none",
            Duration::from_millis(50),
            Duration::from_secs(60),
        );
        assert!(matches!(store.connection().await, Err(AppError::Unavailable)));
        assert!(matches!(store.connection().await, Err(AppError::Unavailable)));
    }
}
