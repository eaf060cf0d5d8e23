use crate::connection::AwaitableConnection;
use crate::pool::AwaitablePool;
use crate::raw::RawDriver;
use crate::types::RowValues;

/// Entry point: builds awaitable connections and pools from a raw driver.
///
/// ```rust,no_run
/// use sql_await::prelude::*;
/// use sql_await::sqlite::{SqliteConfig, SqliteDriver};
///
/// # async fn demo() -> Result<(), SqlAwaitError<SqliteClientError>> {
/// let client = AwaitableClient::new(SqliteDriver);
/// let config = SqliteConfig::builder("people.db").finish();
///
/// let mut conn = client.create_connection(&config);
/// conn.begin_transaction().await?;
/// conn.query_with_params("INSERT INTO people (lastName) VALUES (?)", &["Scrooge".into()])
///     .await?;
/// conn.commit().await?;
/// conn.end().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct AwaitableClient<D: RawDriver> {
    driver: D,
}

impl<D: RawDriver> AwaitableClient<D> {
    #[must_use]
    pub fn new(driver: D) -> Self {
        Self { driver }
    }

    #[must_use]
    pub fn create_connection(&self, config: &D::Config) -> AwaitableConnection<D::Connection> {
        AwaitableConnection::new(self.driver.create_connection(config))
    }

    #[must_use]
    pub fn create_pool(&self, config: &D::Config) -> AwaitablePool<D::Pool> {
        AwaitablePool::new(self.driver.create_pool(config))
    }

    /// The driver's own placeholder substitution.
    #[must_use]
    pub fn format(&self, sql: &str, params: &[RowValues]) -> String {
        self.driver.format(sql, params)
    }
}
