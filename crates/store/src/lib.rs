//! Persistence layer for the storefront system.
//!
//! The [`SalesStore`] trait is the only way the rest of the system touches
//! the catalog and the order ledger. Two implementations are provided:
//! [`PostgresStore`] for production (row locks, transactional commits) and
//! [`InMemoryStore`] for tests, mirroring each other method for method.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use store::{ConfirmationOutcome, MonthlyTotal, Receipt, SalesStore};
