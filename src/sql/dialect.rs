use std::fmt;
use std::str::FromStr;

use super::SqlError;
use crate::schema::ColumnType;

/// SQL engine family the statements are rendered for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// Columnar cloud warehouse with COPY, DISTKEY and SORTKEY support
    #[default]
    Redshift,
    /// Local engine; distribution and sort hints are dropped
    Sqlite,
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::Redshift => write!(f, "redshift"),
            Dialect::Sqlite => write!(f, "sqlite"),
        }
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "redshift" => Ok(Dialect::Redshift),
            "sqlite" => Ok(Dialect::Sqlite),
            other => Err(format!("Unknown dialect: {}", other)),
        }
    }
}

/// Calendar component pulled out of a timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePart {
    Hour,
    Day,
    /// ISO 8601 week of year (1-53)
    Week,
    Month,
    Year,
    /// Day of week, 0 = Sunday
    Weekday,
}

impl DatePart {
    pub const ALL: [DatePart; 6] = [
        DatePart::Hour,
        DatePart::Day,
        DatePart::Week,
        DatePart::Month,
        DatePart::Year,
        DatePart::Weekday,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DatePart::Hour => "hour",
            DatePart::Day => "day",
            DatePart::Week => "week",
            DatePart::Month => "month",
            DatePart::Year => "year",
            DatePart::Weekday => "weekday",
        }
    }
}

impl Dialect {
    pub fn type_name(&self, col_type: ColumnType) -> &'static str {
        // Both engines accept the same type names; SQLite maps them to affinities
        match col_type {
            ColumnType::SmallInt => "SMALLINT",
            ColumnType::Integer => "INTEGER",
            ColumnType::BigInt => "BIGINT",
            ColumnType::Float => "FLOAT",
            ColumnType::Text => "TEXT",
            ColumnType::Timestamp => "TIMESTAMP",
        }
    }

    /// Whether DISTSTYLE / DISTKEY / SORTKEY directives are emitted
    pub fn supports_distribution(&self) -> bool {
        matches!(self, Dialect::Redshift)
    }

    /// Whether the engine has a COPY bulk-load statement
    pub fn supports_copy(&self) -> bool {
        matches!(self, Dialect::Redshift)
    }

    /// Expression turning epoch milliseconds into a calendar timestamp
    pub fn epoch_millis_to_timestamp(&self, expr: &str) -> String {
        match self {
            Dialect::Redshift => {
                format!("TIMESTAMP 'epoch' + ({}/1000 * INTERVAL '1 second')", expr)
            }
            Dialect::Sqlite => format!("datetime({} / 1000, 'unixepoch')", expr),
        }
    }

    /// Expression extracting one calendar part from a timestamp
    pub fn extract(&self, part: DatePart, expr: &str) -> String {
        match self {
            Dialect::Redshift => format!("EXTRACT({} FROM {})", part.name(), expr),
            Dialect::Sqlite => {
                let fmt = match part {
                    DatePart::Hour => "%H",
                    DatePart::Day => "%d",
                    DatePart::Month => "%m",
                    DatePart::Year => "%Y",
                    DatePart::Weekday => "%w",
                    // ISO week: day-of-year of the Thursday in the same Monday-based week
                    DatePart::Week => {
                        return format!(
                            "(CAST(strftime('%j', date({}, '-3 days', 'weekday 4')) AS INTEGER) - 1) / 7 + 1",
                            expr
                        );
                    }
                };
                format!("CAST(strftime('{}', {}) AS INTEGER)", fmt, expr)
            }
        }
    }
}

/// Render a value as a single-quoted SQL string literal.
///
/// Quotes are doubled. Control characters and backslashes are refused
/// because their meaning inside a literal differs between engines.
pub fn quote_literal(field: &'static str, value: &str) -> Result<String, SqlError> {
    if value.is_empty() {
        return Err(SqlError::UnsafeLiteral {
            field,
            reason: "value is empty".to_string(),
        });
    }
    if let Some(c) = value.chars().find(|c| c.is_control() || *c == '\\') {
        return Err(SqlError::UnsafeLiteral {
            field,
            reason: format!("contains forbidden character {:?}", c),
        });
    }

    Ok(format!("'{}'", value.replace('\'', "''")))
}
