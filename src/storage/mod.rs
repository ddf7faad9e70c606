//! SQLite-backed persistence.
//!
//! [`Database`] doubles as the bundled [`DocumentStore`]: favorite documents
//! live in a `documents` table keyed by `(collection, key)`, and every
//! successful write wakes the live [`Subscription`]s of its collection. The
//! same database keeps small key/value preferences such as the device's
//! session uid.

mod documents;
mod preferences;
mod schema;
mod types;

pub use documents::{DocumentStore, Subscription};
pub use schema::Database;
pub use types::{DatabaseError, Document, StoreError};
