//! Tradie DB - Database abstractions
//!
//! SQLx-based database layer for the billing core. Business logic talks to
//! the repository traits in [`repo`]; [`pg`] holds the Postgres
//! implementations.
//!
//! # Example
//!
//! ```rust,ignore
//! use tradie_db::{create_pool, Repositories};
//!
//! let pool = create_pool("postgres://localhost/tradiemate").await?;
//! let repos = Repositories::new(pool);
//!
//! let profile = repos.profiles.find_by_id(user_id).await?;
//! ```

pub mod error;
pub mod models;
pub mod pg;
pub mod pool;
pub mod repo;

pub use error::{DbError, DbResult};
pub use models::*;
pub use pg::Repositories;
pub use pool::{create_pool, run_migrations, DbPool};
pub use repo::*;
