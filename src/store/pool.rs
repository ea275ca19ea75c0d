// Bounded pool of datastore connections shared by all connection workers

use deadpool_postgres::{Manager, ManagerConfig, Object, Pool, RecyclingMethod, Status};
use std::cell::Cell;
use std::time::Duration;
use tokio_postgres::NoTls;

use super::StoreError;
use super::tls;
use crate::config::DatabaseConfig;

const MAX_IDLE_CONNECTIONS: usize = 2;
const MAX_CONNECTION_LIFETIME: Duration = Duration::from_secs(120);

/// Limits applied by a pool
#[derive(Debug, Clone, Copy)]
pub struct PoolLimits {
    pub max_open: usize,
    pub max_idle: usize,
    pub max_lifetime: Duration,
}

impl PoolLimits {
    pub fn new(max_open: usize) -> Self {
        PoolLimits {
            max_open,
            max_idle: MAX_IDLE_CONNECTIONS,
            max_lifetime: MAX_CONNECTION_LIFETIME,
        }
    }
}

/// Connection pool over deadpool-postgres.
///
/// Connections are opened lazily. At most `max_open` are checked out at once;
/// callers beyond that wait for one to be returned.
pub struct PgPool {
    pool: Pool,
    limits: PoolLimits,
}

impl PgPool {
    /// Prepare a pool for the configured database. Does not connect.
    pub fn open(db: &DatabaseConfig, limits: PoolLimits) -> Result<Self, StoreError> {
        if limits.max_open == 0 {
            return Err(StoreError::Unavailable(
                "pool needs at least one connection".to_string(),
            ));
        }

        let mut config = tokio_postgres::Config::new();
        config
            .host(&db.host)
            .port(db.port)
            .user(&db.user)
            .ssl_mode(db.sslmode.ssl_mode())
            .connect_timeout(Duration::from_secs(db.connect_timeout_secs))
            .application_name(&db.application_name);
        if !db.password.is_empty() {
            config.password(&db.password);
        }
        if !db.dbname.is_empty() {
            config.dbname(&db.dbname);
        }

        let manager_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };
        let manager = match tls::make_connector(db.sslmode)? {
            Some(connector) => Manager::from_config(config, connector, manager_config),
            None => Manager::from_config(config, NoTls, manager_config),
        };

        let pool = Pool::builder(manager)
            .max_size(limits.max_open)
            .build()
            .map_err(|e| StoreError::Unavailable(format!("pool setup failed: {}", e)))?;

        tracing::info!(
            "Store pool for {}:{}/{} (sslmode {}, max open {})",
            db.host,
            db.port,
            db.dbname,
            db.sslmode,
            limits.max_open
        );

        Ok(PgPool { pool, limits })
    }

    /// Check out a connection, reusing an idle one when possible
    pub async fn get(&self) -> Result<Object, StoreError> {
        self.prune();
        self.pool
            .get()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }

    pub fn status(&self) -> Status {
        self.pool.status()
    }

    /// Drop idle connections past their lifetime or beyond the idle cap
    fn prune(&self) {
        let kept = Cell::new(0usize);
        let limits = self.limits;
        self.pool.retain(|_, metrics| {
            let keep = metrics.age() < limits.max_lifetime && kept.get() < limits.max_idle;
            if keep {
                kept.set(kept.get() + 1);
            }
            keep
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tls::TlsMode;

    fn database() -> DatabaseConfig {
        DatabaseConfig {
            sslmode: TlsMode::Disable,
            ..DatabaseConfig::default()
        }
    }

    #[test]
    fn test_pool_limits() {
        let limits = PoolLimits::new(10);
        assert_eq!(limits.max_open, 10);
        assert_eq!(limits.max_idle, 2);
        assert_eq!(limits.max_lifetime, Duration::from_secs(120));
    }

    #[test]
    fn test_open_does_not_connect() {
        let pool = PgPool::open(&database(), PoolLimits::new(4)).unwrap();
        let status = pool.status();
        assert_eq!(status.max_size, 4);
        assert_eq!(status.size, 0);
    }

    #[test]
    fn test_open_with_tls() {
        let db = DatabaseConfig {
            sslmode: TlsMode::Require,
            ..DatabaseConfig::default()
        };
        let pool = PgPool::open(&db, PoolLimits::new(2)).unwrap();
        assert_eq!(pool.status().max_size, 2);
    }

    #[test]
    fn test_open_rejects_empty_pool() {
        assert!(PgPool::open(&database(), PoolLimits::new(0)).is_err());
    }

    #[tokio::test]
    async fn test_unreachable_store_is_unavailable() {
        let db = DatabaseConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            connect_timeout_secs: 1,
            ..database()
        };
        let pool = PgPool::open(&db, PoolLimits::new(1)).unwrap();

        match pool.get().await {
            Err(StoreError::Unavailable(_)) => {}
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("connected to a closed port"),
        }
        // A failed connect leaves nothing open in the pool
        assert_eq!(pool.status().size, 0);

        // and the only slot is free again
        match pool.get().await {
            Err(StoreError::Unavailable(_)) => {}
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("connected to a closed port"),
        }
    }
}
