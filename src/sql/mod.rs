//! SQL statement generation for the staging and star-schema tables

pub mod copy;
pub mod ddl;
pub mod dialect;
pub mod transform;

pub use copy::{CopyCommand, JsonFormat};
pub use ddl::{create_table, drop_table};
pub use dialect::{quote_literal, DatePart, Dialect};
pub use transform::{insert_for, Dedup};

use thiserror::Error;

/// Errors raised while building SQL text
#[derive(Error, Debug, PartialEq)]
pub enum SqlError {
    /// A configuration value cannot be embedded in a string literal
    #[error("unsafe value for {field}: {reason}")]
    UnsafeLiteral { field: &'static str, reason: String },

    /// The dialect has no equivalent for a statement
    #[error("{statement} is not supported by the {dialect} dialect")]
    Unsupported {
        statement: &'static str,
        dialect: Dialect,
    },
}
