//! Search domain - query/result types and the strategy trait

mod backend;
mod query;
mod result;

pub use backend::SearchBackend;
pub use query::QueryVector;
pub use result::SearchResult;

#[cfg(test)]
pub use backend::mock::MockSearchBackend;
