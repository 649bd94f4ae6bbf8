//! Database layer for InspireQA
//!
//! Provides:
//! - SeaORM entities for stored answers, feedback and search reports
//! - Repository pattern for data access
//! - Connection pool management

pub mod models;
mod repository;

pub use repository::{NewQueryRecord, Repository};

use crate::config::DatabaseConfig;
use crate::errors::{AppError, Result};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use std::time::Duration;
use tracing::info;

/// Database connection pool wrapper
#[derive(Clone)]
pub struct DbPool {
    pub conn: DatabaseConnection,
}

impl DbPool {
    /// Create a new database pool from configuration
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        info!("Connecting to database...");

        let mut opts = ConnectOptions::new(&config.url);
        opts.max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .sqlx_logging(false);

        let conn = Database::connect(opts)
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Failed to connect: {}", e),
            })?;

        info!("Database connection established");

        Ok(Self { conn })
    }

    pub fn conn(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Ping the database to check connectivity
    pub async fn ping(&self) -> Result<()> {
        self.conn
            .execute_unprepared("SELECT 1")
            .await
            .map(|_| ())
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Ping failed: {}", e),
            })
    }
}
