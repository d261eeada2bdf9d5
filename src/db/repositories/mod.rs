//! Database repositories
//!
//! Repository pattern implementations for database access. Accounts and
//! sessions have one repository each; content kinds share the
//! [`ContentStore`] trait with one adapter per kind.

pub mod article;
pub mod content;
pub mod event;
pub mod expert;
pub mod explorer;
pub mod memory;
pub mod partner;
pub mod session;
pub mod user;

pub use article::SqlxArticleStore;
pub use content::{ContentStore, DynContentStore, SqlContentStore};
pub use event::SqlxEventStore;
pub use expert::SqlxExpertStore;
pub use explorer::{ColumnType, ExplorerRepository, JsonRow, SqlxExplorerRepository, TableColumn};
pub use memory::MemoryContentStore;
pub use partner::SqlxPartnerStore;
pub use session::{SessionRepository, SqlxSessionRepository};
pub use user::{SqlxUserRepository, UserRepository};

use crate::db::DynDatabasePool;

/// One SQL store per content kind, all sharing `pool`.
pub fn sql_content_stores(pool: &DynDatabasePool) -> Vec<DynContentStore> {
    vec![
        SqlxArticleStore::boxed(pool.clone()),
        SqlxEventStore::boxed(pool.clone()),
        SqlxPartnerStore::boxed(pool.clone()),
        SqlxExpertStore::boxed(pool.clone()),
    ]
}
