//! The ordered statement lists a pipeline run executes:
//! drop, then create, then copy, then insert.

use std::fmt;
use std::str::FromStr;

use crate::config::DwhConfig;
use crate::schema::{StagingSource, TableRole, TableSchema, ALL_TABLES};
use crate::sql::{
    create_table, drop_table, insert_for, CopyCommand, Dedup, Dialect, JsonFormat, SqlError,
};

/// One list of the catalog, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Drop,
    Create,
    Copy,
    Insert,
}

impl Phase {
    pub const ALL: [Phase; 4] = [Phase::Drop, Phase::Create, Phase::Copy, Phase::Insert];
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Drop => write!(f, "drop"),
            Phase::Create => write!(f, "create"),
            Phase::Copy => write!(f, "copy"),
            Phase::Insert => write!(f, "insert"),
        }
    }
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "drop" => Ok(Phase::Drop),
            "create" => Ok(Phase::Create),
            "copy" => Ok(Phase::Copy),
            "insert" => Ok(Phase::Insert),
            other => Err(format!("Unknown phase: {}", other)),
        }
    }
}

/// A rendered statement and the table it acts on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub table: &'static str,
    pub sql: String,
}

impl Statement {
    fn new(table: &TableSchema, sql: String) -> Self {
        Self {
            table: table.name,
            sql,
        }
    }
}

/// Schema and transform catalog for one dialect
#[derive(Debug, Clone)]
pub struct QueryCatalog {
    pub dialect: Dialect,
    pub dedup: Dedup,
    pub drop_table_queries: Vec<Statement>,
    pub create_table_queries: Vec<Statement>,
    pub copy_table_queries: Vec<CopyCommand>,
    pub insert_table_queries: Vec<Statement>,
}

impl QueryCatalog {
    pub fn new(config: &DwhConfig, dialect: Dialect, dedup: Dedup) -> Self {
        let drop_table_queries = ALL_TABLES
            .iter()
            .map(|t| Statement::new(t, drop_table(t)))
            .collect();

        let create_table_queries = ALL_TABLES
            .iter()
            .map(|t| Statement::new(t, create_table(t, dialect)))
            .collect();

        let copy_table_queries = ALL_TABLES
            .iter()
            .filter_map(|t| t.source)
            .map(|source| copy_command(config, source))
            .collect();

        let insert_table_queries = ALL_TABLES
            .iter()
            .filter(|t| t.role != TableRole::Staging)
            .filter_map(|t| insert_for(t, dialect, dedup).map(|sql| Statement::new(t, sql)))
            .collect();

        Self {
            dialect,
            dedup,
            drop_table_queries,
            create_table_queries,
            copy_table_queries,
            insert_table_queries,
        }
    }

    /// Number of statements in a phase
    pub fn statement_count(&self, phase: Phase) -> usize {
        match phase {
            Phase::Drop => self.drop_table_queries.len(),
            Phase::Create => self.create_table_queries.len(),
            Phase::Copy => self.copy_table_queries.len(),
            Phase::Insert => self.insert_table_queries.len(),
        }
    }

    /// Rendered SQL text of one phase.
    ///
    /// Copy statements only exist for warehouses with a bulk-load command.
    pub fn sql(&self, phase: Phase) -> Result<Vec<String>, SqlError> {
        let texts = |stmts: &[Statement]| -> Vec<String> {
            stmts.iter().map(|s| s.sql.clone()).collect()
        };

        match phase {
            Phase::Drop => Ok(texts(&self.drop_table_queries)),
            Phase::Create => Ok(texts(&self.create_table_queries)),
            Phase::Insert => Ok(texts(&self.insert_table_queries)),
            Phase::Copy => {
                if !self.dialect.supports_copy() {
                    return Err(SqlError::Unsupported {
                        statement: "COPY",
                        dialect: self.dialect,
                    });
                }
                self.copy_table_queries.iter().map(|c| c.to_sql()).collect()
            }
        }
    }

    /// Rendered SQL of `phase`, or of every phase the dialect can express.
    ///
    /// Without an explicit phase, copy is left out on engines lacking a
    /// bulk-load statement; asking for it by name is still an error.
    pub fn script(&self, phase: Option<Phase>) -> Result<Vec<(Phase, Vec<String>)>, SqlError> {
        let phases: Vec<Phase> = match phase {
            Some(p) => vec![p],
            None => Phase::ALL
                .into_iter()
                .filter(|p| *p != Phase::Copy || self.dialect.supports_copy())
                .collect(),
        };

        phases.into_iter().map(|p| Ok((p, self.sql(p)?))).collect()
    }
}

fn copy_command(config: &DwhConfig, source: StagingSource) -> CopyCommand {
    let (path, format) = match source {
        StagingSource::Events => (
            config.storage.log_data.clone(),
            JsonFormat::Paths(config.storage.log_jsonpath.clone()),
        ),
        StagingSource::Songs => (config.storage.song_data.clone(), JsonFormat::Auto),
    };

    CopyCommand {
        source,
        path,
        iam_role: config.access.iam_role.clone(),
        format,
        region: config.cluster.region.clone(),
    }
}
