//! INSERT ... SELECT statements that rebuild the star schema from staging

use std::fmt;
use std::str::FromStr;

use super::dialect::{DatePart, Dialect};
use crate::schema::tables::{
    ARTISTS, SONGPLAYS, SONGS, STAGING_EVENTS, STAGING_SONGS, TIME, USERS,
};
use crate::schema::TableSchema;

/// An event and a catalog song match when their durations differ by less than this
pub const DURATION_TOLERANCE_SECS: u32 = 2;

/// Only events on this page are song plays
pub const NEXT_SONG_PAGE: &str = "NextSong";

/// How dimension rows are made unique on their primary key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dedup {
    /// Exactly one row per key; rows with a NULL key are skipped
    #[default]
    ByKey,
    /// `SELECT DISTINCT (key) key, ...`: distinct over the whole row, so a key
    /// can repeat when its other columns differ
    Literal,
}

impl fmt::Display for Dedup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dedup::ByKey => write!(f, "by-key"),
            Dedup::Literal => write!(f, "literal"),
        }
    }
}

impl FromStr for Dedup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "by-key" => Ok(Dedup::ByKey),
            "literal" => Ok(Dedup::Literal),
            other => Err(format!("Unknown dedup mode: {}", other)),
        }
    }
}

/// Source of a dimension: staging columns feeding each target column
struct DimensionSource {
    target: &'static TableSchema,
    from: &'static TableSchema,
    /// (staging expression, target column), key first
    mapping: &'static [(&'static str, &'static str)],
    /// Which row wins inside a key partition
    order_by: &'static str,
}

static USER_SOURCE: DimensionSource = DimensionSource {
    target: &USERS,
    from: &STAGING_EVENTS,
    mapping: &[
        ("user_id", "user_id"),
        ("first_name", "first_name"),
        ("last_name", "last_name"),
        ("gender", "gender"),
        ("level", "level"),
    ],
    // latest event carries the user's current level
    order_by: "ts DESC NULLS LAST",
};

static SONG_SOURCE: DimensionSource = DimensionSource {
    target: &SONGS,
    from: &STAGING_SONGS,
    mapping: &[
        ("song_id", "song_id"),
        ("title", "title"),
        ("artist_id", "artist_id"),
        ("year", "year"),
        ("duration", "duration"),
    ],
    order_by: "title ASC NULLS LAST, duration ASC NULLS LAST",
};

static ARTIST_SOURCE: DimensionSource = DimensionSource {
    target: &ARTISTS,
    from: &STAGING_SONGS,
    mapping: &[
        ("artist_id", "artist_id"),
        ("artist_name", "name"),
        ("artist_location", "location"),
        ("artist_latitude", "latitude"),
        ("artist_longitude", "longitude"),
    ],
    order_by: "artist_name ASC NULLS LAST",
};

/// Fact rows: every NextSong event, with song and artist ids when the catalog matches
pub fn songplay_insert(dialect: Dialect) -> String {
    let columns: Vec<&str> = SONGPLAYS.insertable_columns().map(|c| c.name).collect();

    format!(
        "INSERT INTO {table} ({columns})\n\
         SELECT\n    \
             {start_time},\n    \
             e.user_id,\n    \
             e.level,\n    \
             s.song_id,\n    \
             s.artist_id,\n    \
             e.session_id,\n    \
             e.location,\n    \
             e.user_agent\n\
         FROM {events} e\n\
         LEFT JOIN {songs} s ON\n    \
             e.song = s.title AND\n    \
             e.artist = s.artist_name AND\n    \
             ABS(e.length - s.duration) < {tolerance}\n\
         WHERE e.page = '{page}'",
        table = SONGPLAYS.name,
        columns = columns.join(", "),
        start_time = dialect.epoch_millis_to_timestamp("e.ts"),
        events = STAGING_EVENTS.name,
        songs = STAGING_SONGS.name,
        tolerance = DURATION_TOLERANCE_SECS,
        page = NEXT_SONG_PAGE,
    )
}

pub fn user_insert(dedup: Dedup) -> String {
    dimension_insert(&USER_SOURCE, dedup)
}

pub fn song_insert(dedup: Dedup) -> String {
    dimension_insert(&SONG_SOURCE, dedup)
}

pub fn artist_insert(dedup: Dedup) -> String {
    dimension_insert(&ARTIST_SOURCE, dedup)
}

/// Time rows: each distinct event timestamp broken into calendar parts
pub fn time_insert(dialect: Dialect) -> String {
    let parts: Vec<String> = DatePart::ALL
        .iter()
        .map(|part| format!("    {}", dialect.extract(*part, "start_time")))
        .collect();

    format!(
        "INSERT INTO {table} (start_time, {part_columns})\n\
         SELECT DISTINCT\n    \
             start_time,\n\
         {parts}\n\
         FROM (\n    \
             SELECT {start_time} AS start_time\n    \
             FROM {events}\n    \
             WHERE ts IS NOT NULL\n\
         ) event_time",
        table = TIME.name,
        part_columns = DatePart::ALL
            .iter()
            .map(|p| p.name())
            .collect::<Vec<_>>()
            .join(", "),
        parts = parts.join(",\n"),
        start_time = dialect.epoch_millis_to_timestamp("ts"),
        events = STAGING_EVENTS.name,
    )
}

/// INSERT statement that populates `table`, or `None` for staging tables
pub fn insert_for(table: &TableSchema, dialect: Dialect, dedup: Dedup) -> Option<String> {
    match table.name {
        "songplays" => Some(songplay_insert(dialect)),
        "users" => Some(user_insert(dedup)),
        "songs" => Some(song_insert(dedup)),
        "artists" => Some(artist_insert(dedup)),
        "time" => Some(time_insert(dialect)),
        _ => None,
    }
}

fn dimension_insert(source: &DimensionSource, dedup: Dedup) -> String {
    let targets: Vec<&str> = source.mapping.iter().map(|(_, target)| *target).collect();
    let (key_expr, _) = source.mapping[0];

    match dedup {
        Dedup::ByKey => {
            let inner: Vec<String> = source
                .mapping
                .iter()
                .map(|(expr, target)| {
                    if expr == target {
                        format!("        {},", expr)
                    } else {
                        format!("        {} AS {},", expr, target)
                    }
                })
                .collect();

            format!(
                "INSERT INTO {table} ({targets})\n\
                 SELECT {targets}\n\
                 FROM (\n    \
                     SELECT\n\
                 {inner}\n        \
                         ROW_NUMBER() OVER (PARTITION BY {key} ORDER BY {order_by}) AS row_num\n    \
                     FROM {from}\n    \
                     WHERE {key} IS NOT NULL\n\
                 ) ranked\n\
                 WHERE row_num = 1",
                table = source.target.name,
                targets = targets.join(", "),
                inner = inner.join("\n"),
                key = key_expr,
                order_by = source.order_by,
                from = source.from.name,
            )
        }
        Dedup::Literal => {
            let rest: Vec<&str> = source.mapping[1..].iter().map(|(expr, _)| *expr).collect();
            format!(
                "INSERT INTO {table} ({targets})\n\
                 SELECT DISTINCT ({key}) {key}, {rest}\n\
                 FROM {from}",
                table = source.target.name,
                targets = targets.join(", "),
                key = key_expr,
                rest = rest.join(", "),
                from = source.from.name,
            )
        }
    }
}
