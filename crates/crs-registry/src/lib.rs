//! Authority factories, the priority-ordered registry, and the
//! single-flight object cache.

pub mod bundled;
pub mod cache;
pub mod epsg_db;
pub mod factory;
pub mod registry;
pub mod sql;
pub mod vendor;

pub use bundled::BundledFactory;
pub use cache::{CacheStats, ObjectCache};
pub use epsg_db::{EpsgSqlConfig, EpsgSqlFactory};
pub use factory::{AuthorityFactory, Citation};
pub use registry::AuthorityRegistry;
pub use sql::{Row, SqlStore, SqlValue, SqlitePool};
pub use vendor::VendorSrsFactory;
