//! End-to-end runs of the catalog against the local SQLite warehouse.
//!
//! Each test writes its own event-log and song-catalog fixtures to a temp
//! directory, runs drop → create → copy → insert and checks the star schema.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rusqlite::Connection;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

use songplay_dwh::catalog::{Phase, QueryCatalog};
use songplay_dwh::config::{AccessConfig, ClusterConfig, DwhConfig, StorageConfig};
use songplay_dwh::pipeline::{run_pipeline, PipelineReport};
use songplay_dwh::schema::ALL_TABLES;
use songplay_dwh::sql::{Dedup, Dialect};
use songplay_dwh::ui::SilentUi;
use songplay_dwh::warehouse::{SqliteWarehouse, Warehouse};

// =============================================================================
// Fixtures
// =============================================================================

/// Random seed for reproducible event logs
const RANDOM_SEED: u64 = 42;

/// 2018-11-01T21:01:46.796Z
const NOV_1_2018_MS: i64 = 1_541_106_106_796;

const EVENT_JSONPATHS: &[&str] = &[
    "$['artist']",
    "$['auth']",
    "$['firstName']",
    "$['gender']",
    "$['itemInSession']",
    "$['lastName']",
    "$['length']",
    "$['level']",
    "$['location']",
    "$['method']",
    "$['page']",
    "$['registration']",
    "$['sessionId']",
    "$['song']",
    "$['status']",
    "$['ts']",
    "$['userAgent']",
    "$['userId']",
];

struct Fixture {
    _dir: TempDir,
    config: DwhConfig,
}

impl Fixture {
    /// Events go to one JSON-lines file per 50 events; songs to one file each
    fn new(events: &[Value], songs: &[Value]) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let log_dir = dir.path().join("log_data").join("2018").join("11");
        let song_dir = dir.path().join("song_data");
        fs::create_dir_all(&log_dir).unwrap();
        fs::create_dir_all(&song_dir).unwrap();

        for (idx, chunk) in events.chunks(50).enumerate() {
            let lines: Vec<String> = chunk.iter().map(|e| e.to_string()).collect();
            let name = format!("2018-11-{:02}-events.json", idx + 1);
            fs::write(log_dir.join(name), lines.join("\n")).unwrap();
        }

        for (idx, song) in songs.iter().enumerate() {
            let nested = song_dir.join("A").join(format!("{}", idx % 3));
            fs::create_dir_all(&nested).unwrap();
            fs::write(nested.join(format!("TRAAA{:04}.json", idx)), song.to_string()).unwrap();
        }

        let jsonpaths = dir.path().join("log_json_path.json");
        fs::write(&jsonpaths, json!({ "jsonpaths": EVENT_JSONPATHS }).to_string()).unwrap();

        let config = DwhConfig {
            storage: StorageConfig {
                log_data: path_str(&dir.path().join("log_data")),
                log_jsonpath: path_str(&jsonpaths),
                song_data: path_str(&song_dir),
            },
            access: AccessConfig {
                iam_role: "arn:aws:iam::123456789012:role/dwhRole".to_string(),
            },
            cluster: ClusterConfig {
                region: "us-west-2".to_string(),
            },
        };

        Self { _dir: dir, config }
    }

    fn run(
        &self,
        wh: &mut SqliteWarehouse,
        dedup: Dedup,
        phases: &[Phase],
    ) -> anyhow::Result<PipelineReport> {
        let catalog = QueryCatalog::new(&self.config, Dialect::Sqlite, dedup);
        run_pipeline(&catalog, wh, phases, &mut SilentUi::new())
    }

    /// Full drop → create → copy → insert on a fresh in-memory database
    fn run_all(&self, dedup: Dedup) -> (SqliteWarehouse, PipelineReport) {
        let mut wh = SqliteWarehouse::in_memory().unwrap();
        let report = self.run(&mut wh, dedup, &Phase::ALL).expect("pipeline failed");
        (wh, report)
    }
}

fn path_str(path: &Path) -> String {
    path.to_str().expect("temp path is not UTF-8").to_string()
}

fn event(
    user_id: &str,
    page: &str,
    song: Option<&str>,
    artist: Option<&str>,
    length: Option<f64>,
    ts: i64,
) -> Value {
    json!({
        "artist": artist,
        "auth": "Logged In",
        "firstName": format!("First{}", user_id),
        "gender": "F",
        "itemInSession": 0,
        "lastName": format!("Last{}", user_id),
        "length": length,
        "level": "free",
        "location": "Atlanta-Sandy Springs-Roswell, GA",
        "method": "PUT",
        "page": page,
        "registration": 1540940782796.0,
        "sessionId": 139,
        "song": song,
        "status": 200,
        "ts": ts,
        "userAgent": "Mozilla/5.0 (Windows NT 6.1; WOW64)",
        "userId": user_id
    })
}

fn song(song_id: &str, title: &str, artist_id: &str, artist_name: &str, duration: f64) -> Value {
    json!({
        "num_songs": 1,
        "artist_id": artist_id,
        "artist_latitude": 35.14968,
        "artist_longitude": -90.04892,
        "artist_location": "Memphis, TN",
        "artist_name": artist_name,
        "song_id": song_id,
        "title": title,
        "duration": duration,
        "year": 1999
    })
}

fn count(conn: &Connection, sql: &str) -> i64 {
    conn.query_row(sql, [], |row| row.get(0)).unwrap()
}

// =============================================================================
// Drop / Create
// =============================================================================

#[test]
fn test_drop_create_on_empty_database() {
    let fixture = Fixture::new(&[], &[]);
    let mut wh = SqliteWarehouse::in_memory().unwrap();

    let report = fixture.run(&mut wh, Dedup::ByKey, &[Phase::Drop, Phase::Create]).unwrap();

    assert_eq!(report.table_rows.len(), ALL_TABLES.len());
    assert!(report.table_rows.iter().all(|(_, rows)| *rows == 0));
}

#[test]
fn test_drop_create_empties_populated_tables() {
    let events = vec![event("7", "NextSong", Some("X"), Some("Y"), Some(120.0), NOV_1_2018_MS)];
    let songs = vec![song("SO1", "X", "AR1", "Y", 121.0)];
    let fixture = Fixture::new(&events, &songs);

    let (mut wh, report) = fixture.run_all(Dedup::ByKey);
    assert_eq!(report.rows_in("songplays"), Some(1));
    assert_eq!(report.rows_in("staging_songs"), Some(1));

    let report = fixture.run(&mut wh, Dedup::ByKey, &[Phase::Drop, Phase::Create]).unwrap();
    for table in ALL_TABLES {
        assert_eq!(report.rows_in(table.name), Some(0), "{} not empty", table.name);
    }
}

#[test]
fn test_create_twice_is_harmless() {
    let fixture = Fixture::new(&[], &[]);
    let mut wh = SqliteWarehouse::in_memory().unwrap();

    fixture.run(&mut wh, Dedup::ByKey, &[Phase::Create]).unwrap();
    fixture.run(&mut wh, Dedup::ByKey, &[Phase::Create]).unwrap();
    assert_eq!(wh.row_count("time").unwrap(), Some(0));
}

// =============================================================================
// Song-play matching
// =============================================================================

#[test]
fn test_duration_within_tolerance_matches() {
    let events = vec![event("7", "NextSong", Some("X"), Some("Y"), Some(120.0), NOV_1_2018_MS)];
    let songs = vec![song("SO1", "X", "AR1", "Y", 121.0)];
    let (wh, _) = Fixture::new(&events, &songs).run_all(Dedup::ByKey);

    let (song_id, artist_id): (Option<String>, Option<String>) = wh
        .connection()
        .query_row("SELECT song_id, artist_id FROM songplays", [], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })
        .unwrap();

    assert_eq!(count(wh.connection(), "SELECT COUNT(*) FROM songplays"), 1);
    assert_eq!(song_id.as_deref(), Some("SO1"));
    assert_eq!(artist_id.as_deref(), Some("AR1"));
}

#[test]
fn test_duration_outside_tolerance_keeps_event_without_ids() {
    let events = vec![event("7", "NextSong", Some("X"), Some("Y"), Some(120.0), NOV_1_2018_MS)];
    let songs = vec![song("SO1", "X", "AR1", "Y", 125.0)];
    let (wh, _) = Fixture::new(&events, &songs).run_all(Dedup::ByKey);

    let conn = wh.connection();
    assert_eq!(count(conn, "SELECT COUNT(*) FROM songplays"), 1);
    assert_eq!(
        count(conn, "SELECT COUNT(*) FROM songplays WHERE song_id IS NULL AND artist_id IS NULL"),
        1
    );
}

#[test]
fn test_title_or_artist_mismatch_does_not_match() {
    let events = vec![
        event("7", "NextSong", Some("X"), Some("Other"), Some(120.0), NOV_1_2018_MS),
        event("7", "NextSong", Some("Other"), Some("Y"), Some(120.0), NOV_1_2018_MS + 1000),
    ];
    let songs = vec![song("SO1", "X", "AR1", "Y", 120.0)];
    let (wh, _) = Fixture::new(&events, &songs).run_all(Dedup::ByKey);

    let conn = wh.connection();
    assert_eq!(count(conn, "SELECT COUNT(*) FROM songplays"), 2);
    assert_eq!(count(conn, "SELECT COUNT(*) FROM songplays WHERE song_id IS NOT NULL"), 0);
}

#[test]
fn test_login_event_is_not_a_songplay() {
    let events = vec![event("7", "Login", None, None, None, NOV_1_2018_MS)];
    let (wh, report) = Fixture::new(&events, &[]).run_all(Dedup::ByKey);

    assert_eq!(report.rows_in("staging_events"), Some(1));
    assert_eq!(report.rows_in("songplays"), Some(0));
    // still a listener and a timestamp
    assert_eq!(report.rows_in("users"), Some(1));
    assert_eq!(report.rows_in("time"), Some(1));
}

#[test]
fn test_songplay_count_matches_next_song_events() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(RANDOM_SEED);
    let pages = ["NextSong", "NextSong", "NextSong", "Home", "Login", "Logout", "Settings"];

    let songs: Vec<Value> = (0..20)
        .map(|i| {
            song(
                &format!("SO{}", i),
                &format!("Title {}", i),
                &format!("AR{}", i % 7),
                &format!("Artist {}", i % 7),
                180.0 + i as f64,
            )
        })
        .collect();

    let mut next_song = 0;
    let events: Vec<Value> = (0..240)
        .map(|i| {
            let page = *pages.choose(&mut rng).unwrap();
            let user = format!("{}", rng.gen_range(1..30));
            let ts = NOV_1_2018_MS + i * 37_000;
            if page == "NextSong" {
                next_song += 1;
                let s = rng.gen_range(0..25);
                let jitter: f64 = rng.gen_range(-1.5..1.5);
                let title = format!("Title {}", s);
                let artist = format!("Artist {}", s % 7);
                event(
                    &user,
                    page,
                    Some(title.as_str()),
                    Some(artist.as_str()),
                    Some(180.0 + s as f64 + jitter),
                    ts,
                )
            } else {
                event(&user, page, None, None, None, ts)
            }
        })
        .collect();

    let (wh, report) = Fixture::new(&events, &songs).run_all(Dedup::ByKey);

    assert_eq!(report.rows_in("staging_events"), Some(240));
    assert_eq!(report.rows_in("staging_songs"), Some(20));
    assert_eq!(report.rows_in("songplays"), Some(next_song));

    // every fact row traces back to a NextSong event
    let conn = wh.connection();
    assert_eq!(
        count(
            conn,
            "SELECT COUNT(*) FROM songplays p
             WHERE NOT EXISTS (
                 SELECT 1 FROM staging_events e
                 WHERE e.page = 'NextSong'
                   AND e.user_id = p.user_id
                   AND datetime(e.ts / 1000, 'unixepoch') = p.start_time
             )"
        ),
        0
    );

    // surrogate keys are assigned 1..n
    assert_eq!(count(conn, "SELECT MIN(songplay_id) FROM songplays"), 1);
    assert_eq!(count(conn, "SELECT MAX(songplay_id) FROM songplays"), next_song as i64);
}

// =============================================================================
// Dimensions
// =============================================================================

#[test]
fn test_dimension_keys_are_unique() {
    // user 7 upgrades mid-log; the same song appears in two catalog files
    let ts = NOV_1_2018_MS + 60_000;
    let mut later = event("7", "NextSong", Some("X"), Some("Y"), Some(120.0), ts);
    later["level"] = json!("paid");
    let events = vec![
        event("7", "NextSong", Some("X"), Some("Y"), Some(120.0), NOV_1_2018_MS),
        later,
        event("8", "Home", None, None, None, NOV_1_2018_MS + 120_000),
    ];
    let mut relocated = song("SO1", "X", "AR1", "Y", 121.0);
    relocated["artist_location"] = json!("Nashville, TN");
    let songs = vec![
        song("SO1", "X", "AR1", "Y", 121.0),
        relocated,
        song("SO2", "Z", "AR1", "Y", 200.0),
    ];

    let (wh, _) = Fixture::new(&events, &songs).run_all(Dedup::ByKey);
    let conn = wh.connection();

    for (table, key) in [("users", "user_id"), ("songs", "song_id"), ("artists", "artist_id")] {
        let total = count(conn, &format!("SELECT COUNT(*) FROM {}", table));
        let distinct = count(conn, &format!("SELECT COUNT(DISTINCT {}) FROM {}", key, table));
        assert_eq!(total, distinct, "{} has duplicate keys", table);
    }

    assert_eq!(count(conn, "SELECT COUNT(*) FROM users"), 2);
    assert_eq!(count(conn, "SELECT COUNT(*) FROM songs"), 2);
    assert_eq!(count(conn, "SELECT COUNT(*) FROM artists"), 1);

    let level: String = conn
        .query_row("SELECT level FROM users WHERE user_id = '7'", [], |row| row.get(0))
        .unwrap();
    assert_eq!(level, "paid");
}

#[test]
fn test_literal_dedup_collapses_identical_rows() {
    let events = vec![
        event("7", "NextSong", Some("X"), Some("Y"), Some(120.0), NOV_1_2018_MS),
        event("7", "Home", None, None, None, NOV_1_2018_MS + 1000),
    ];
    let songs = vec![song("SO1", "X", "AR1", "Y", 121.0), song("SO1", "X", "AR1", "Y", 121.0)];

    let (_, report) = Fixture::new(&events, &songs).run_all(Dedup::Literal);
    assert_eq!(report.rows_in("users"), Some(1));
    assert_eq!(report.rows_in("songs"), Some(1));
}

#[test]
fn test_literal_dedup_conflicting_rows_violate_key() {
    let mut later = event("7", "Home", None, None, None, NOV_1_2018_MS + 1000);
    later["level"] = json!("paid");
    let first = event("7", "NextSong", Some("X"), Some("Y"), Some(120.0), NOV_1_2018_MS);
    let events = vec![first, later];
    let fixture = Fixture::new(&events, &[]);

    let mut wh = SqliteWarehouse::in_memory().unwrap();
    let err = fixture.run(&mut wh, Dedup::Literal, &Phase::ALL).unwrap_err();
    assert!(format!("{:#}", err).contains("users"));
}

#[test]
fn test_time_decomposition() {
    let events = vec![
        event("7", "NextSong", Some("X"), Some("Y"), Some(120.0), NOV_1_2018_MS),
        // same second, second event
        event("7", "Home", None, None, None, NOV_1_2018_MS + 100),
    ];
    let (wh, report) = Fixture::new(&events, &[]).run_all(Dedup::ByKey);
    assert_eq!(report.rows_in("time"), Some(1));

    let row: (String, i64, i64, i64, i64, i64, i64) = wh
        .connection()
        .query_row(
            "SELECT start_time, hour, day, week, month, year, weekday FROM time",
            [],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?, r.get(5)?, r.get(6)?)),
        )
        .unwrap();

    assert_eq!(row, ("2018-11-01 21:01:46".to_string(), 21, 1, 44, 11, 2018, 4));
}

#[test]
fn test_iso_week_at_year_boundaries() {
    let events = vec![
        // Monday 2018-12-31: ISO week 1 of 2019
        event("7", "Home", None, None, None, 1_546_257_600_000),
        // Sunday 2021-01-03: ISO week 53 of 2020
        event("7", "Home", None, None, None, 1_609_662_600_000),
    ];
    let (wh, _) = Fixture::new(&events, &[]).run_all(Dedup::ByKey);

    let mut stmt = wh
        .connection()
        .prepare("SELECT week, year, weekday FROM time ORDER BY start_time")
        .unwrap();
    let rows: Vec<(i64, i64, i64)> = stmt
        .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(rows, vec![(1, 2018, 1), (53, 2021, 0)]);
}

// =============================================================================
// Bulk load failures
// =============================================================================

#[test]
fn test_malformed_record_fails_whole_load() {
    let fixture = Fixture::new(&[], &[song("SO1", "X", "AR1", "Y", 121.0)]);
    let bad = Path::new(&fixture.config.storage.song_data).join("zz_bad.json");
    fs::write(&bad, r#"{"song_id": "SO2", "duration": "not a number"}"#).unwrap();

    let mut wh = SqliteWarehouse::in_memory().unwrap();
    let err = fixture.run(&mut wh, Dedup::ByKey, &Phase::ALL).unwrap_err();

    assert!(format!("{:#}", err).contains("staging_songs"));
    // events loaded, songs rolled back, inserts never ran
    assert_eq!(wh.row_count("staging_songs").unwrap(), Some(0));
    assert_eq!(wh.row_count("songplays").unwrap(), Some(0));
}

#[test]
fn test_truncated_json_fails_load() {
    let fixture = Fixture::new(&[event("7", "Home", None, None, None, NOV_1_2018_MS)], &[]);
    let bad = Path::new(&fixture.config.storage.log_data).join("broken.json");
    fs::write(&bad, r#"{"artist": null, "auth": "#).unwrap();

    let mut wh = SqliteWarehouse::in_memory().unwrap();
    assert!(fixture.run(&mut wh, Dedup::ByKey, &Phase::ALL).is_err());
    assert_eq!(wh.row_count("staging_events").unwrap(), Some(0));
}

#[test]
fn test_object_storage_path_needs_a_real_warehouse() {
    let mut fixture = Fixture::new(&[], &[]);
    fixture.config.storage.log_data = "s3://udacity-dend/log_data".to_string();

    let mut wh = SqliteWarehouse::in_memory().unwrap();
    let err = fixture.run(&mut wh, Dedup::ByKey, &Phase::ALL).unwrap_err();
    assert!(format!("{:#}", err).contains("s3"));
}
