use super::dialect::Dialect;
use crate::schema::{Column, DistStyle, TableSchema};

/// Generate DROP TABLE SQL that succeeds whether or not the table exists
pub fn drop_table(schema: &TableSchema) -> String {
    format!("DROP TABLE IF EXISTS {}", schema.name)
}

/// Generate CREATE TABLE SQL for a table schema
pub fn create_table(schema: &TableSchema, dialect: Dialect) -> String {
    let mut sql = format!("CREATE TABLE IF NOT EXISTS {} (\n", schema.name);

    let columns: Vec<String> = schema
        .columns
        .iter()
        .map(|col| format!("    {}", column_definition(col, dialect)))
        .collect();

    sql.push_str(&columns.join(",\n"));
    sql.push_str("\n)");

    if dialect.supports_distribution() {
        match schema.dist_style {
            DistStyle::Auto => {}
            DistStyle::Key => sql.push_str(" DISTSTYLE KEY"),
            DistStyle::All => sql.push_str(" DISTSTYLE ALL"),
        }
    }

    sql
}

fn column_definition(col: &Column, dialect: Dialect) -> String {
    if col.identity && dialect == Dialect::Sqlite {
        return format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", col.name);
    }

    let mut def = format!("{} {}", col.name, dialect.type_name(col.col_type));

    if col.identity {
        def.push_str(" IDENTITY(1, 1)");
    }
    if col.primary_key {
        def.push_str(" PRIMARY KEY");
    }
    if !col.nullable {
        def.push_str(" NOT NULL");
    }
    if dialect.supports_distribution() {
        if col.dist_key {
            def.push_str(" DISTKEY");
        }
        if col.sort_key {
            def.push_str(" SORTKEY");
        }
    }

    def
}
