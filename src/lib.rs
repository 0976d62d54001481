pub mod catalog;
pub mod cli;
pub mod config;
pub mod parser;
pub mod pipeline;
pub mod schema;
pub mod sql;
pub mod ui;
pub mod warehouse;

pub use catalog::{Phase, QueryCatalog, Statement};
pub use cli::{Cli, Commands};
pub use config::{load_config, ConfigError, DwhConfig};
pub use pipeline::{run_pipeline, PipelineReport};
pub use ui::{ConsoleUi, SilentUi, Stage, Ui, UiApp};
pub use warehouse::{SqliteWarehouse, Warehouse};
