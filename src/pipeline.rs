//! Runs catalog phases against a warehouse, in order, one statement at a time.

use anyhow::{bail, Context, Result};
use std::time::{Duration, Instant};

use crate::catalog::{Phase, QueryCatalog, Statement};
use crate::schema::ALL_TABLES;
use crate::ui::{Stage, Ui};
use crate::warehouse::Warehouse;

/// Outcome of one phase
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseReport {
    pub phase: Phase,
    pub statements: usize,
    /// Records loaded (copy) or rows written (insert)
    pub rows: u64,
    pub elapsed: Duration,
}

/// Outcome of a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    pub phases: Vec<PhaseReport>,
    /// Row count of every table present after the run
    pub table_rows: Vec<(&'static str, u64)>,
}

impl PipelineReport {
    pub fn phase(&self, phase: Phase) -> Option<&PhaseReport> {
        self.phases.iter().find(|p| p.phase == phase)
    }

    pub fn rows_in(&self, table: &str) -> Option<u64> {
        self.table_rows
            .iter()
            .find(|(name, _)| *name == table)
            .map(|(_, rows)| *rows)
    }
}

/// Execute the selected phases of `catalog` in drop, create, copy, insert order.
///
/// Stops at the first failing statement; nothing is retried or rolled back
/// beyond what the warehouse itself does for that statement.
pub fn run_pipeline<W: Warehouse>(
    catalog: &QueryCatalog,
    warehouse: &mut W,
    phases: &[Phase],
    ui: &mut impl Ui,
) -> Result<PipelineReport> {
    if catalog.dialect != warehouse.dialect() {
        bail!(
            "Catalog was built for {} but the warehouse speaks {}",
            catalog.dialect,
            warehouse.dialect()
        );
    }

    let mut report = PipelineReport::default();

    for phase in Phase::ALL.into_iter().filter(|p| phases.contains(p)) {
        ui.set_stage(Stage::Running(phase));
        tracing::info!(%phase, statements = catalog.statement_count(phase), "starting phase");

        let start = Instant::now();
        let rows = match phase {
            Phase::Drop => run_statements(&catalog.drop_table_queries, warehouse, ui)?,
            Phase::Create => run_statements(&catalog.create_table_queries, warehouse, ui)?,
            Phase::Insert => run_statements(&catalog.insert_table_queries, warehouse, ui)?,
            Phase::Copy => run_copies(catalog, warehouse, ui)?,
        };
        ui.clear_progress();

        let phase_report = PhaseReport {
            phase,
            statements: catalog.statement_count(phase),
            rows,
            elapsed: start.elapsed(),
        };
        tracing::info!(
            %phase,
            rows,
            elapsed_ms = phase_report.elapsed.as_millis() as u64,
            "phase complete"
        );
        report.phases.push(phase_report);
    }

    for table in ALL_TABLES {
        if let Some(rows) = warehouse.row_count(table.name)? {
            report.table_rows.push((table.name, rows));
        }
    }

    Ok(report)
}

fn run_statements<W: Warehouse>(
    statements: &[Statement],
    warehouse: &mut W,
    ui: &mut impl Ui,
) -> Result<u64> {
    let total = statements.len() as u64;
    let mut rows: u64 = 0;

    for (idx, stmt) in statements.iter().enumerate() {
        check_cancelled(ui)?;
        ui.set_progress(idx as u64, total, stmt.table);
        tracing::debug!(table = stmt.table, sql = %stmt.sql, "executing");

        let changed = warehouse
            .execute(&stmt.sql)
            .with_context(|| format!("Statement failed for table {}", stmt.table))?;
        rows += changed as u64;
        ui.log(format!("{}: {} rows", stmt.table, changed));
    }

    ui.set_progress(total, total, "done");
    Ok(rows)
}

fn run_copies<W: Warehouse>(
    catalog: &QueryCatalog,
    warehouse: &mut W,
    ui: &mut impl Ui,
) -> Result<u64> {
    let mut rows: u64 = 0;

    for cmd in &catalog.copy_table_queries {
        check_cancelled(ui)?;
        let table = cmd.table().name;
        ui.set_info(format!("{} <- {}", table, cmd.path));

        let loaded = warehouse
            .copy(cmd, ui)
            .with_context(|| format!("Bulk load failed for table {}", table))?;
        rows += loaded;
        ui.log(format!("{}: {} records loaded", table, loaded));
    }

    Ok(rows)
}

fn check_cancelled(ui: &mut impl Ui) -> Result<()> {
    if ui.cancelled() {
        bail!("Pipeline cancelled");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AccessConfig, ClusterConfig, DwhConfig, StorageConfig};
    use crate::sql::{CopyCommand, Dedup, Dialect};
    use crate::ui::SilentUi;

    /// Records what it is asked to run; fails on statements containing `fail_on`
    #[derive(Default)]
    struct RecordingWarehouse {
        log: Vec<String>,
        fail_on: Option<&'static str>,
    }

    impl Warehouse for RecordingWarehouse {
        fn dialect(&self) -> Dialect {
            Dialect::Redshift
        }

        fn execute(&mut self, sql: &str) -> Result<usize> {
            if self.fail_on.is_some_and(|f| sql.contains(f)) {
                bail!("boom");
            }
            self.log.push(sql.lines().next().unwrap_or_default().to_string());
            Ok(0)
        }

        fn copy(&mut self, cmd: &CopyCommand, _ui: &mut impl Ui) -> Result<u64> {
            self.log.push(format!("COPY {}", cmd.table().name));
            Ok(3)
        }

        fn row_count(&mut self, _table: &str) -> Result<Option<u64>> {
            Ok(None)
        }
    }

    fn catalog(dialect: Dialect) -> QueryCatalog {
        let config = DwhConfig {
            storage: StorageConfig {
                log_data: "s3://bucket/log_data".to_string(),
                log_jsonpath: "s3://bucket/log_json_path.json".to_string(),
                song_data: "s3://bucket/song_data".to_string(),
            },
            access: AccessConfig {
                iam_role: "arn:aws:iam::1:role/r".to_string(),
            },
            cluster: ClusterConfig {
                region: "us-west-2".to_string(),
            },
        };
        QueryCatalog::new(&config, dialect, Dedup::ByKey)
    }

    #[test]
    fn test_phases_run_in_order_regardless_of_request_order() {
        let mut wh = RecordingWarehouse::default();
        let report = run_pipeline(
            &catalog(Dialect::Redshift),
            &mut wh,
            &[Phase::Insert, Phase::Copy, Phase::Drop, Phase::Create],
            &mut SilentUi::new(),
        )
        .unwrap();

        assert_eq!(wh.log.len(), 7 + 7 + 2 + 5);
        assert_eq!(wh.log[0], "DROP TABLE IF EXISTS staging_events");
        assert_eq!(wh.log[7], "CREATE TABLE IF NOT EXISTS staging_events (");
        assert_eq!(wh.log[14], "COPY staging_events");
        assert_eq!(wh.log[15], "COPY staging_songs");
        assert_eq!(wh.log[16], "INSERT INTO songplays (start_time, user_id, level, song_id, artist_id, session_id, location, user_agent)");

        let phases: Vec<_> = report.phases.iter().map(|p| p.phase).collect();
        assert_eq!(phases, Phase::ALL.to_vec());
        assert_eq!(report.phase(Phase::Copy).map(|p| p.rows), Some(6));
    }

    #[test]
    fn test_stops_at_first_failure() {
        let mut wh = RecordingWarehouse {
            fail_on: Some("INTO users"),
            ..Default::default()
        };
        let err = run_pipeline(
            &catalog(Dialect::Redshift),
            &mut wh,
            &[Phase::Insert],
            &mut SilentUi::new(),
        )
        .unwrap_err();

        assert!(err.to_string().contains("users"));
        // songplays ran, nothing after users did
        assert_eq!(wh.log.len(), 1);
    }

    #[test]
    fn test_dialect_mismatch_is_rejected() {
        let mut wh = RecordingWarehouse::default();
        let result = run_pipeline(
            &catalog(Dialect::Sqlite),
            &mut wh,
            &Phase::ALL,
            &mut SilentUi::new(),
        );
        assert!(result.is_err());
        assert!(wh.log.is_empty());
    }
}
