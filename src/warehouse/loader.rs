//! Local stand-in for the warehouse bulk load: reads JSON records from files
//! and inserts them into a staging table.

use anyhow::{bail, Context, Result};
use rusqlite::Connection;
use serde_json::Value;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::parser::{load_jsonpaths, parse_record, FieldMapping, ParsedRow};
use crate::sql::{CopyCommand, JsonFormat};
use crate::ui::Ui;

const BATCH_SIZE: usize = 1000;

/// Source data file extensions picked up from directories
const SOURCE_EXTENSIONS: &[&str] = &["json", "jsonl"];

/// Strip a `file://` scheme; object-storage URLs cannot be read locally
pub fn local_path(location: &str) -> Result<PathBuf> {
    if let Some(path) = location.strip_prefix("file://") {
        return Ok(PathBuf::from(path));
    }
    if let Some((scheme, _)) = location.split_once("://") {
        bail!(
            "{} is a {} location; the local warehouse only reads local files",
            location,
            scheme
        );
    }
    Ok(PathBuf::from(location))
}

/// All source files under `path`, sorted. A file path is returned as is.
pub fn source_files(path: &Path) -> Result<Vec<PathBuf>> {
    if !path.exists() {
        bail!("Source not found: {:?}", path);
    }
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files = Vec::new();
    collect_files(path, &mut files)?;
    files.sort();
    Ok(files)
}

fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to list {:?}", dir))? {
        let entry = entry?;
        let path = entry.path();
        // symlinked directories are not followed
        if entry.file_type()?.is_dir() {
            collect_files(&path, files)?;
        } else if path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| SOURCE_EXTENSIONS.contains(&e))
        {
            files.push(path);
        }
    }
    Ok(())
}

/// Field mapping named by the copy command
pub fn field_mapping(format: &JsonFormat) -> Result<FieldMapping> {
    match format {
        JsonFormat::Auto => Ok(FieldMapping::Auto),
        JsonFormat::Paths(location) => {
            let paths = load_jsonpaths(&local_path(location)?)?;
            Ok(FieldMapping::Paths(paths))
        }
    }
}

/// Load every record the command points at into its staging table.
///
/// Runs in one transaction: a malformed record anywhere aborts the whole load.
pub fn copy_into(conn: &mut Connection, cmd: &CopyCommand, ui: &mut impl Ui) -> Result<u64> {
    let schema = cmd.table();
    let mapping = field_mapping(&cmd.format)?;
    mapping.validate(schema)?;

    let files = source_files(&local_path(&cmd.path)?)?;
    tracing::debug!(
        table = schema.name,
        files = files.len(),
        iam_role = %cmd.iam_role,
        region = %cmd.region,
        "loading local source"
    );

    // Build insert statement
    let columns = schema.column_names();
    let placeholders: Vec<&str> = columns.iter().map(|_| "?").collect();
    let insert_sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        schema.name,
        columns.join(", "),
        placeholders.join(", ")
    );

    let tx = conn.transaction()?;
    let mut count: u64 = 0;
    let mut batch: Vec<ParsedRow> = Vec::with_capacity(BATCH_SIZE);
    let total_files = files.len() as u64;

    for (file_idx, file_path) in files.iter().enumerate() {
        let file =
            File::open(file_path).with_context(|| format!("Failed to open: {:?}", file_path))?;
        let records =
            serde_json::Deserializer::from_reader(BufReader::new(file)).into_iter::<Value>();

        for (record_idx, record) in records.enumerate() {
            let record = record
                .with_context(|| format!("Malformed JSON in {:?}", file_path))?;
            let row = parse_record(&record, schema, &mapping).with_context(|| {
                format!("Malformed record {} in {:?}", record_idx + 1, file_path)
            })?;
            batch.push(row);

            if batch.len() >= BATCH_SIZE {
                insert_batch(&tx, &insert_sql, &batch)?;
                count += batch.len() as u64;
                batch.clear();
            }
        }

        ui.set_progress(file_idx as u64 + 1, total_files, format!("{} files", schema.name));
    }

    // Insert remaining batch
    if !batch.is_empty() {
        insert_batch(&tx, &insert_sql, &batch)?;
        count += batch.len() as u64;
    }

    tx.commit()?;
    Ok(count)
}

/// Insert a batch of rows into the database
fn insert_batch(tx: &rusqlite::Transaction, sql: &str, batch: &[ParsedRow]) -> Result<()> {
    let mut stmt = tx.prepare_cached(sql)?;

    for row in batch {
        for (idx, value) in row.values.iter().enumerate() {
            value.bind_to(idx + 1, &mut stmt)?;
        }
        stmt.raw_execute()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_path() {
        assert_eq!(local_path("file:///data/log").unwrap(), PathBuf::from("/data/log"));
        assert_eq!(local_path("data/log").unwrap(), PathBuf::from("data/log"));
        assert!(local_path("s3://udacity-dend/log_data").is_err());
    }

    #[test]
    fn test_source_files_walks_directories() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("A").join("B");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("b.json"), "{}").unwrap();
        fs::write(dir.path().join("a.jsonl"), "{}").unwrap();
        fs::write(dir.path().join("notes.txt"), "skip").unwrap();

        let files = source_files(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("A/B/b.json"));
        assert!(files[1].ends_with("a.jsonl"));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_cycle_is_not_followed() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("2018");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("events.json"), "{}").unwrap();
        std::os::unix::fs::symlink(dir.path(), nested.join("loop")).unwrap();

        let files = source_files(dir.path()).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("2018/events.json"));
    }

    #[test]
    fn test_missing_source() {
        assert!(source_files(Path::new("/nonexistent/song_data")).is_err());
    }
}
