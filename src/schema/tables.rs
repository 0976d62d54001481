//! Table definitions for the song-play star schema

use super::types::*;

// =============================================================================
// Staging Tables (shape of the source files)
// =============================================================================

pub static STAGING_EVENTS: TableSchema = TableSchema {
    name: "staging_events",
    role: TableRole::Staging,
    columns: &[
        Column::new("artist", ColumnType::Text),
        Column::new("auth", ColumnType::Text),
        Column::new("first_name", ColumnType::Text),
        Column::new("gender", ColumnType::Text),
        Column::new("item_in_session", ColumnType::Integer),
        Column::new("last_name", ColumnType::Text),
        Column::new("length", ColumnType::Float),
        Column::new("level", ColumnType::Text),
        Column::new("location", ColumnType::Text),
        Column::new("method", ColumnType::Text),
        Column::new("page", ColumnType::Text),
        Column::new("registration", ColumnType::Float),
        Column::new("session_id", ColumnType::Integer),
        Column::new("song", ColumnType::Text),
        Column::new("status", ColumnType::Integer),
        Column::new("ts", ColumnType::BigInt),
        Column::new("user_agent", ColumnType::Text),
        Column::new("user_id", ColumnType::Text),
    ],
    dist_style: DistStyle::Auto,
    source: Some(StagingSource::Events),
};

pub static STAGING_SONGS: TableSchema = TableSchema {
    name: "staging_songs",
    role: TableRole::Staging,
    columns: &[
        Column::new("num_songs", ColumnType::Integer),
        Column::new("artist_id", ColumnType::Text),
        Column::new("artist_latitude", ColumnType::Float),
        Column::new("artist_longitude", ColumnType::Float),
        Column::new("artist_location", ColumnType::Text),
        Column::new("artist_name", ColumnType::Text),
        Column::new("song_id", ColumnType::Text),
        Column::new("title", ColumnType::Text),
        Column::new("duration", ColumnType::Float),
        Column::new("year", ColumnType::SmallInt),
    ],
    dist_style: DistStyle::Auto,
    source: Some(StagingSource::Songs),
};

// =============================================================================
// Fact Table
// =============================================================================

pub static SONGPLAYS: TableSchema = TableSchema {
    name: "songplays",
    role: TableRole::Fact,
    columns: &[
        Column::required("songplay_id", ColumnType::BigInt)
            .identity()
            .primary_key(),
        Column::required("start_time", ColumnType::Timestamp).sort_key(),
        Column::required("user_id", ColumnType::Text).dist_key(),
        Column::new("level", ColumnType::Text),
        Column::new("song_id", ColumnType::Text),
        Column::new("artist_id", ColumnType::Text),
        Column::new("session_id", ColumnType::Integer),
        Column::new("location", ColumnType::Text),
        Column::new("user_agent", ColumnType::Text),
    ],
    dist_style: DistStyle::Key,
    source: None,
};

// =============================================================================
// Dimension Tables
// =============================================================================

pub static USERS: TableSchema = TableSchema {
    name: "users",
    role: TableRole::Dimension,
    columns: &[
        Column::new("user_id", ColumnType::Text).primary_key().sort_key(),
        Column::new("first_name", ColumnType::Text),
        Column::new("last_name", ColumnType::Text),
        Column::new("gender", ColumnType::Text),
        Column::new("level", ColumnType::Text),
    ],
    dist_style: DistStyle::All,
    source: None,
};

pub static SONGS: TableSchema = TableSchema {
    name: "songs",
    role: TableRole::Dimension,
    columns: &[
        Column::new("song_id", ColumnType::Text).primary_key().sort_key(),
        Column::new("title", ColumnType::Text),
        Column::new("artist_id", ColumnType::Text).dist_key(),
        Column::new("year", ColumnType::SmallInt),
        Column::new("duration", ColumnType::Float),
    ],
    dist_style: DistStyle::Key,
    source: None,
};

pub static ARTISTS: TableSchema = TableSchema {
    name: "artists",
    role: TableRole::Dimension,
    columns: &[
        Column::new("artist_id", ColumnType::Text).primary_key().sort_key(),
        Column::new("name", ColumnType::Text),
        Column::new("location", ColumnType::Text),
        Column::new("latitude", ColumnType::Float),
        Column::new("longitude", ColumnType::Float),
    ],
    dist_style: DistStyle::All,
    source: None,
};

pub static TIME: TableSchema = TableSchema {
    name: "time",
    role: TableRole::Dimension,
    columns: &[
        Column::new("start_time", ColumnType::Timestamp)
            .primary_key()
            .sort_key(),
        Column::new("hour", ColumnType::SmallInt),
        Column::new("day", ColumnType::SmallInt),
        Column::new("week", ColumnType::SmallInt),
        Column::new("month", ColumnType::SmallInt),
        Column::new("year", ColumnType::SmallInt).dist_key(),
        Column::new("weekday", ColumnType::SmallInt),
    ],
    dist_style: DistStyle::Key,
    source: None,
};

// =============================================================================
// All Tables (pipeline order)
// =============================================================================

/// Staging tables first, then the fact table, then dimensions
pub static ALL_TABLES: &[&TableSchema] = &[
    &STAGING_EVENTS,
    &STAGING_SONGS,
    &SONGPLAYS,
    &USERS,
    &SONGS,
    &ARTISTS,
    &TIME,
];

/// Get a table schema by name
pub fn get_table(name: &str) -> Option<&'static TableSchema> {
    ALL_TABLES.iter().find(|t| t.name == name).copied()
}

/// Get all table names
pub fn table_names() -> Vec<&'static str> {
    ALL_TABLES.iter().map(|t| t.name).collect()
}

/// Staging table loaded from the given source
pub fn staging_table(source: StagingSource) -> &'static TableSchema {
    match source {
        StagingSource::Events => &STAGING_EVENTS,
        StagingSource::Songs => &STAGING_SONGS,
    }
}
