use anyhow::{anyhow, Context, Result};
use songplay_dwh::{
    catalog::{Phase, QueryCatalog},
    cli::{Cli, Commands},
    config::{load_config, ConfigOverrides, DwhConfig},
    pipeline::{run_pipeline, PipelineReport},
    schema::{get_table, table_names, DistStyle, TableSchema, ALL_TABLES},
    sql::{Dedup, Dialect},
    ui::{ConsoleUi, Stage, Ui, UiApp},
    warehouse::SqliteWarehouse,
};
use std::path::Path;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // The full-screen view owns the terminal; log lines would tear it
    if !cli.tui {
        init_tracing(&cli.log_level);
    }

    let overrides = ConfigOverrides::from(cli.overrides);
    let config_path = cli.config;
    let config = || -> Result<DwhConfig> {
        load_config(config_path.clone(), &overrides).context("Failed to load configuration")
    };

    match cli.command {
        Commands::Sql {
            dialect,
            phase,
            dedup,
        } => {
            let catalog = QueryCatalog::new(&config()?, dialect, dedup);

            for (phase, statements) in catalog.script(phase)? {
                println!("-- {} ({} statements)", phase, statements.len());
                for sql in statements {
                    println!("{};\n", sql.trim_end_matches(';'));
                }
            }
        }

        Commands::CreateTables { db } => {
            run_local(&db, &config()?, Dedup::ByKey, &[Phase::Drop, Phase::Create], cli.tui)?;
        }

        Commands::Etl { db, dedup } => {
            run_local(&db, &config()?, dedup, &[Phase::Copy, Phase::Insert], cli.tui)?;
        }

        Commands::Run { db, dedup } => {
            run_local(&db, &config()?, dedup, &Phase::ALL, cli.tui)?;
        }

        Commands::ListTables { table: None } => {
            println!("Tables:\n");
            for table in ALL_TABLES {
                let dist = match table.dist_style {
                    DistStyle::Auto => "-".to_string(),
                    DistStyle::All => "all".to_string(),
                    DistStyle::Key => table
                        .dist_key()
                        .map(|c| format!("key({})", c.name))
                        .unwrap_or_default(),
                };
                let sort = table.sort_key().map(|c| c.name).unwrap_or("-");
                println!(
                    "  {:<16} {:<10} dist={:<18} sort={}",
                    table.name,
                    table.role.to_string(),
                    dist,
                    sort
                );
            }
        }

        Commands::ListTables { table: Some(name) } => {
            let table = get_table(&name).ok_or_else(|| {
                anyhow!("Unknown table {}; expected one of {}", name, table_names().join(", "))
            })?;
            print_columns(table);
        }
    }

    Ok(())
}

fn print_columns(table: &TableSchema) {
    println!("{} ({})\n", table.name, table.role);
    for col in table.columns {
        let mut flags = Vec::new();
        if col.primary_key {
            flags.push("primary key");
        }
        if col.identity {
            flags.push("identity");
        }
        if !col.nullable {
            flags.push("not null");
        }
        if col.dist_key {
            flags.push("distkey");
        }
        if col.sort_key {
            flags.push("sortkey");
        }
        println!(
            "  {:<18} {:<10} {}",
            col.name,
            Dialect::Redshift.type_name(col.col_type),
            flags.join(", ")
        );
    }
}

fn init_tracing(level: &str) {
    let filter = log_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok(), level);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// RUST_LOG wins over --log-level; unparsable filters fall through to "info"
fn log_filter(env: Option<String>, level: &str) -> EnvFilter {
    env.and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_new(level).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

/// Execute phases against a local SQLite database and print a summary
fn run_local(
    db: &Path,
    config: &DwhConfig,
    dedup: Dedup,
    phases: &[Phase],
    tui: bool,
) -> Result<()> {
    let start = Instant::now();
    let catalog = QueryCatalog::new(config, Dialect::Sqlite, dedup);

    let (warehouse, report) = if tui {
        let mut ui = UiApp::new()?;
        match open_and_run(db, &catalog, phases, &mut ui) {
            Ok((warehouse, report)) => {
                ui.finish(&summary_line(db, &report, start))?;
                (warehouse, report)
            }
            Err(e) => {
                ui.restore()?;
                return Err(e);
            }
        }
    } else {
        open_and_run(db, &catalog, phases, &mut ConsoleUi::new())?
    };

    warehouse.finalize()?;

    for (table, rows) in &report.table_rows {
        println!("  {:<16} {} rows", table, rows);
    }
    println!("\n{}", summary_line(db, &report, start));

    Ok(())
}

fn open_and_run(
    db: &Path,
    catalog: &QueryCatalog,
    phases: &[Phase],
    ui: &mut impl Ui,
) -> Result<(SqliteWarehouse, PipelineReport)> {
    ui.set_stage(Stage::Connecting);
    ui.set_info(format!("{:?}", db));
    let mut warehouse = SqliteWarehouse::open(db)?;

    let report = run_pipeline(catalog, &mut warehouse, phases, ui)?;
    Ok((warehouse, report))
}

fn summary_line(db: &Path, report: &PipelineReport, start: Instant) -> String {
    let statements: usize = report.phases.iter().map(|p| p.statements).sum();
    format!(
        "Ran {} statements on {:?} in {:.1}s",
        statements,
        db,
        start.elapsed().as_secs_f64()
    )
}
