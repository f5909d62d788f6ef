pub mod blob;
pub mod db;
pub mod identity;

pub use blob::FsBlobAdapter;
pub use db::DbAdapter;
pub use identity::PgIdentityAdapter;
