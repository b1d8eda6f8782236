//! The statement execution seam.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::endpoint::Endpoint;
use crate::error::{DatabaseError, Result};
use crate::row::{decode_rows, SqlRow};

/// Executes one SQL statement against an endpoint.
///
/// Implementations open a new connection per call; there is no pooling.
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    /// Executes `statement` at `endpoint`.
    ///
    /// Returns the rows when the statement yields a result set and `None`
    /// otherwise.
    async fn execute(&self, endpoint: &Endpoint, statement: &str) -> Result<Option<Vec<SqlRow>>>;

    /// Returns the name of this executor.
    fn name(&self) -> &str;
}

/// An executor bound to one endpoint.
#[derive(Clone)]
pub struct Database {
    executor: Arc<dyn SqlExecutor>,
    endpoint: Endpoint,
}

impl Database {
    /// Binds `executor` to `endpoint`.
    pub fn new(executor: Arc<dyn SqlExecutor>, endpoint: Endpoint) -> Self {
        Self { executor, endpoint }
    }

    /// Returns the bound endpoint.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Returns the same executor bound to a different endpoint.
    pub fn at(&self, endpoint: Endpoint) -> Self {
        Self::new(self.executor.clone(), endpoint)
    }

    /// Executes a statement whose result set, if any, is not needed.
    pub async fn execute(&self, statement: &str) -> Result<()> {
        self.executor.execute(&self.endpoint, statement).await?;
        Ok(())
    }

    /// Executes a query and returns its rows.
    ///
    /// A query that produced no result set is a command error.
    pub async fn query(&self, statement: &str) -> Result<Vec<SqlRow>> {
        self.executor
            .execute(&self.endpoint, statement)
            .await?
            .ok_or_else(|| DatabaseError::command(statement, "statement returned no result set"))
    }

    /// Executes a query and decodes every row into `T`.
    pub async fn query_as<T: DeserializeOwned>(&self, statement: &str) -> Result<Vec<T>> {
        let rows = self.query(statement).await?;
        decode_rows(&rows)
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("executor", &self.executor.name())
            .field("endpoint", &self.endpoint)
            .finish()
    }
}
