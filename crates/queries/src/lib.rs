//! Bookswap Queries Crate
//!
//! Query examples against the Bookswap schema, grouped by level: single-table
//! CRUD, filtering, transactions, cross-domain relations and aggregations.
//! The [`catalogue`] names every example so it can be run on its own.

pub mod catalogue;
pub mod error;
pub mod level1;
pub mod level2;
pub mod level3;
pub mod level4;
pub mod level5;
pub mod output;
pub mod preload;

pub use catalogue::{run_example, run_logged, Example, UnknownExample};
pub use error::{QueryError, QueryResult};
pub use output::{pretty_print, render};
pub use preload::{BookPreload, Scope, UserPreload};
