// Connection pool construction.

use crate::DbError;
use golbat_config::DatabaseConfig;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use std::time::Duration;
use tracing::info;

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);
const IDLE_TIMEOUT: Duration = Duration::from_secs(60);

pub fn connect_options(config: &DatabaseConfig) -> MySqlConnectOptions {
    let (host, port) = match config.address.rsplit_once(':') {
        Some((host, port)) => (host, port.parse().unwrap_or(3306)),
        None => (config.address.as_str(), 3306),
    };
    MySqlConnectOptions::new()
        .host(host)
        .port(port)
        .username(&config.user)
        .password(&config.password)
        .database(&config.db)
}

pub async fn connect(config: &DatabaseConfig) -> Result<MySqlPool, DbError> {
    let pool = MySqlPoolOptions::new()
        .max_connections(config.max_pool)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .idle_timeout(IDLE_TIMEOUT)
        .connect_with(connect_options(config))
        .await
        .map_err(|source| DbError::Connect {
            address: config.address.clone(),
            source,
        })?;
    info!(address = %config.address, max_pool = config.max_pool, "Connected to database");
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_port_is_split() {
        let config = DatabaseConfig {
            address: "db.local:3307".into(),
            user: "golbat".into(),
            ..Default::default()
        };
        let options = connect_options(&config);
        assert_eq!(options.get_host(), "db.local");
        assert_eq!(options.get_port(), 3307);
        assert_eq!(options.get_database(), Some("golbat"));
    }
}
