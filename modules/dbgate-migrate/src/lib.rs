pub mod error;
pub mod migrator;
pub mod probe;
pub mod source;
pub mod store;

#[cfg(feature = "test-utils")]
pub mod testutil;

pub use error::{MigrateError, Result};
pub use migrator::{migration_status, run_migrations, MigrationReport, MigrationStatus, Migrator};
pub use probe::wait_for_database;
pub use source::{list_migrations, Migration, MigrationFile};
pub use store::AppliedMigration;
