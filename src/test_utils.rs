/*!
 * Database test context
 *
 * Starts a throwaway PostgreSQL container per context and applies the
 * migrations. Set TEST_DATABASE_URL to run against an existing server
 * instead.
 */

use testcontainers::{runners::AsyncRunner, ContainerAsync};
use testcontainers_modules::postgres::Postgres;

use crate::db::Database;

pub struct TestContext {
    db: Database,
    // Dropping the handle stops the container
    _container: Option<ContainerAsync<Postgres>>,
}

impl TestContext {
    pub async fn new() -> Self {
        let (database_url, container) = match std::env::var("TEST_DATABASE_URL") {
            Ok(url) => (url, None),
            Err(_) => {
                let container = Postgres::default()
                    .start()
                    .await
                    .expect("Failed to start postgres container");
                let host = container
                    .get_host()
                    .await
                    .expect("Failed to get container host");
                let port = container
                    .get_host_port_ipv4(5432)
                    .await
                    .expect("Failed to get container port");
                let url = format!("postgresql://postgres:postgres@{}:{}/postgres", host, port);
                (url, Some(container))
            }
        };

        let db = Database::new(&database_url)
            .await
            .expect("Failed to connect to test database");
        db.migrate().await.expect("Failed to migrate test database");

        Self {
            db,
            _container: container,
        }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }
}
