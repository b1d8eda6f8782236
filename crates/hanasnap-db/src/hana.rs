//! SAP HANA implementation of [`SqlExecutor`] over the native wire protocol.

use async_trait::async_trait;
use hdbconnect_async::{ConnectParams, Connection, ResultSet};
use tracing::debug;

use crate::config::HanaConfig;
use crate::endpoint::{sql_port, Endpoint};
use crate::error::{DatabaseError, Result};
use crate::executor::SqlExecutor;
use crate::row::SqlRow;

/// Runs statements over a fresh `hdbconnect_async` connection per call.
#[derive(Debug, Clone)]
pub struct HanaExecutor {
    config: HanaConfig,
}

impl HanaExecutor {
    /// Creates an executor with the given configuration.
    pub fn new(config: HanaConfig) -> Self {
        Self { config }
    }

    async fn connect(&self, endpoint: &Endpoint) -> Result<Connection> {
        let port = sql_port(self.config.instance_number, endpoint.selector);
        let address = endpoint.address(self.config.instance_number);

        let params = ConnectParams::builder()
            .hostname(endpoint.host.as_str())
            .port(port)
            .dbuser(self.config.credentials.user.as_str())
            .password(self.config.credentials.password.as_str())
            .build()
            .map_err(|e| DatabaseError::connection(&address, e))?;

        Connection::new(params)
            .await
            .map_err(|e| DatabaseError::connection(&address, e))
    }

    async fn run(&self, endpoint: &Endpoint, statement: &str) -> Result<Option<Vec<SqlRow>>> {
        let connection = self.connect(endpoint).await?;

        if !returns_rows(statement) {
            connection
                .exec(statement)
                .await
                .map_err(|e| DatabaseError::command(statement, e))?;
            return Ok(None);
        }

        let result_set = connection
            .query(statement)
            .await
            .map_err(|e| DatabaseError::command(statement, e))?;
        collect_rows(statement, result_set).await.map(Some)
    }
}

#[async_trait]
impl SqlExecutor for HanaExecutor {
    async fn execute(&self, endpoint: &Endpoint, statement: &str) -> Result<Option<Vec<SqlRow>>> {
        let deadline = self.config.statement_timeout();
        debug!(endpoint = %endpoint, statement, "Executing statement");

        let rows = tokio::time::timeout(deadline, self.run(endpoint, statement))
            .await
            .map_err(|_| DatabaseError::timeout(statement, deadline))??;

        debug!(
            endpoint = %endpoint,
            rows = rows.as_ref().map(Vec::len),
            "Statement finished"
        );
        Ok(rows)
    }

    fn name(&self) -> &str {
        "hana"
    }
}

async fn collect_rows(statement: &str, result_set: ResultSet) -> Result<Vec<SqlRow>> {
    let columns: Vec<String> = result_set
        .metadata()
        .iter()
        .map(|field| field.displayname().to_string())
        .collect();

    let rows = result_set
        .into_rows()
        .await
        .map_err(|e| DatabaseError::command(statement, e))?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let mut sql_row = SqlRow::new();
            for (column, value) in columns.iter().zip(row) {
                let text = (!value.is_null()).then(|| value.to_string());
                sql_row.insert(column.as_str(), text);
            }
            sql_row
        })
        .collect())
}

fn returns_rows(statement: &str) -> bool {
    statement
        .trim_start()
        .get(..6)
        .is_some_and(|verb| verb.eq_ignore_ascii_case("SELECT"))
}
