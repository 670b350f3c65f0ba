//! Query building and rendering.
//!
//! - [`lookups`] - the lookup vocabulary, [`Operand`] and [`LookupBuilder`]
//! - [`schema`] - relation metadata and auto-join bookkeeping
//! - [`q`] - the [`Q`] condition tree
//! - [`expressions`] - raw/column/cast expressions and aggregates
//! - [`compiler`] - the per-statement render context, [`Row`] and [`FromValue`]
//! - [`builder`] - the [`QueryBuilder`] itself
//! - [`factory`] - [`QueryBuilderFactory`], builders pre-wired from settings

pub mod builder;
pub mod compiler;
pub mod expressions;
pub mod factory;
pub mod lookups;
pub mod q;
pub mod schema;

pub use builder::{Join, JoinOn, JoinType, OrderBy, QueryBuilder, SelectItem, StatementType};
pub use compiler::{Compiler, FromValue, ParamMode, Row};
pub use expressions::{AggregateFunc, Aggregation, Expression};
pub use factory::QueryBuilderFactory;
pub use lookups::{DatePart, Lookup, LookupBuilder, LookupOp, Operand};
pub use q::{Condition, Connector, Entry, Q};
pub use schema::{AutoJoin, JoinScope, Relation, Schema, TableDef};
