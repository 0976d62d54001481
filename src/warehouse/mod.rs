pub mod loader;
pub mod sqlite;

pub use sqlite::SqliteWarehouse;

use anyhow::Result;

use crate::sql::{CopyCommand, Dialect};
use crate::ui::Ui;

/// A SQL engine the catalog can be executed against, one statement at a time
pub trait Warehouse {
    /// Dialect the engine understands
    fn dialect(&self) -> Dialect;

    /// Run one statement, returning the number of rows it changed
    fn execute(&mut self, sql: &str) -> Result<usize>;

    /// Bulk load a staging table, returning the number of records loaded
    fn copy(&mut self, cmd: &CopyCommand, ui: &mut impl Ui) -> Result<u64>;

    /// Rows currently in `table`, `None` if the table does not exist
    fn row_count(&mut self, table: &str) -> Result<Option<u64>>;
}
