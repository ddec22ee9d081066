//! Listing query pipeline
//!
//! - `params`: raw query string → typed parameter map
//! - `filter`: predicate and sort types shared by every store
//! - `compiler`: parameter map → predicate, sort and page window

mod compiler;
mod filter;
mod params;

pub use compiler::{CompiledQuery, FilterCompiler, Pagination, SortKey};
pub use filter::{Constraint, Field, Predicate, SortDirection, SortField, SortSpec, Value};
pub use params::{ParamValue, QueryParams};
