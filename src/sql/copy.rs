use super::dialect::quote_literal;
use super::SqlError;
use crate::schema::{staging_table, StagingSource, TableSchema};

/// How line-delimited JSON records map onto staging columns
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JsonFormat {
    /// Location of a JSONPaths document listing one path per column, in column order
    Paths(String),
    /// Field names are matched to column names
    Auto,
}

/// Bulk load of one external source into a staging table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyCommand {
    pub source: StagingSource,
    /// Object-storage prefix, local file or local directory
    pub path: String,
    pub iam_role: String,
    pub format: JsonFormat,
    pub region: String,
}

impl CopyCommand {
    pub fn table(&self) -> &'static TableSchema {
        staging_table(self.source)
    }

    /// Render the warehouse COPY statement with every parameter quoted
    pub fn to_sql(&self) -> Result<String, SqlError> {
        let format = match &self.format {
            JsonFormat::Paths(path) => quote_literal("log_jsonpath", path)?,
            JsonFormat::Auto => "'auto'".to_string(),
        };

        Ok(format!(
            "COPY {} FROM {}\nIAM_ROLE {}\nJSON {} REGION {};",
            self.table().name,
            quote_literal(source_field(self.source), &self.path)?,
            quote_literal("iam_role", &self.iam_role)?,
            format,
            quote_literal("region", &self.region)?,
        ))
    }
}

fn source_field(source: StagingSource) -> &'static str {
    match source {
        StagingSource::Events => "log_data",
        StagingSource::Songs => "song_data",
    }
}
