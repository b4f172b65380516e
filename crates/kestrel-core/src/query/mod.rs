//! # Query Runtime
//!
//! What the mutation operators evaluate against:
//! - `ExecutionContext`: one row of named slots plus its property cache
//! - `Expression`: the expressions evaluated per row
//! - `QueryState`: the transaction and the reusable cursors of one query

mod expression;
mod row;
mod state;

pub use expression::Expression;
pub use row::ExecutionContext;
pub use state::QueryState;
