//! # Hanasnap DB - statement execution against SAP HANA
//!
//! Sends the fixed set of snapshot-protocol statements to the right SQL
//! endpoint and decodes result rows by column name.
//!
//! ## Overview
//!
//! - [`SqlExecutor`]: the seam; executes one statement at one [`Endpoint`]
//! - [`Database`]: an executor bound to an endpoint, with typed queries
//! - [`PortSelector`]: `13` for the system database, otherwise the tenant port
//! - [`statements`]: the statement catalogue and its row types
//! - `HanaExecutor` (feature `hana`): the `hdbconnect_async` implementation
//!
//! ## Example
//!
//! ```
//! use hanasnap_db::{sql_port, PortSelector};
//!
//! assert_eq!(sql_port(0, PortSelector::SystemDatabase), 30013);
//! assert_eq!(sql_port(2, PortSelector::Tenant(15)), 30215);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod endpoint;
pub mod error;
pub mod executor;
#[cfg(feature = "hana")]
pub mod hana;
pub mod row;
pub mod statements;

pub use config::HanaConfig;
pub use endpoint::{sql_port, Endpoint, PortSelector};
pub use error::{DatabaseError, Result};
pub use executor::{Database, SqlExecutor};
#[cfg(feature = "hana")]
pub use hana::HanaExecutor;
pub use row::{decode_rows, SqlRow};
