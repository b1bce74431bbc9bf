//! CSV snapshots of the tag table.
//!
//! Format: headerless rows of `id,secondary,link_target,variant,updated_at,
//! created_at`, timestamps in RFC 3339, empty string for NULL. A snapshot is
//! a full-fidelity copy; restore rebuilds the exact table state and reseeds
//! the id sequence.

use std::io;

use chrono::{DateTime, Utc};
use thiserror::Error;

use tagmint_id::{MAX_TAG_ID, MIN_TAG_ID};

use crate::db::TagRow;

const FIELDS: usize = 6;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot I/O failed: {0}")]
    Csv(#[from] csv::Error),

    /// A row that cannot become a valid tag. Reported before any write, so
    /// a bad snapshot never destroys the current table.
    #[error("malformed snapshot row at line {line}: {reason}")]
    MalformedRow { line: u64, reason: String },
}

/// Writes all rows as a headerless CSV snapshot.
pub fn write_snapshot<W: io::Write>(writer: W, rows: &[TagRow]) -> Result<(), SnapshotError> {
    let mut csv = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    for row in rows {
        csv.write_record([
            row.id.to_string().as_str(),
            row.secondary.as_deref().unwrap_or(""),
            row.link_target.as_deref().unwrap_or(""),
            row.variant.as_str(),
            &row.updated_at.to_rfc3339(),
            &row.created_at.to_rfc3339(),
        ])?;
    }
    csv.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Parses a snapshot in full before returning.
///
/// Any malformed row fails the whole read; callers only hand complete,
/// validated row sets to the destructive restore path.
pub fn read_snapshot<R: io::Read>(reader: R) -> Result<Vec<TagRow>, SnapshotError> {
    let mut csv = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut rows = Vec::new();
    for result in csv.records() {
        let record = result?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        rows.push(parse_record(&record, line)?);
    }
    Ok(rows)
}

fn parse_record(record: &csv::StringRecord, line: u64) -> Result<TagRow, SnapshotError> {
    let malformed = |reason: String| SnapshotError::MalformedRow { line, reason };

    if record.len() != FIELDS {
        return Err(malformed(format!(
            "expected {FIELDS} fields, got {}",
            record.len()
        )));
    }

    let id: i64 = record[0]
        .parse()
        .map_err(|_| malformed(format!("invalid tag id {:?}", &record[0])))?;
    if id < MIN_TAG_ID as i64 || id >= MAX_TAG_ID as i64 {
        return Err(malformed(format!("tag id {id} is out of range")));
    }

    let variant = record[3]
        .parse()
        .map_err(|_| malformed(format!("unknown variant {:?}", &record[3])))?;

    Ok(TagRow {
        id,
        secondary: optional(&record[1]),
        variant,
        link_target: optional(&record[2]),
        updated_at: timestamp(&record[4]).map_err(|r| malformed(r))?,
        created_at: timestamp(&record[5]).map_err(|r| malformed(r))?,
    })
}

fn optional(field: &str) -> Option<String> {
    if field.is_empty() {
        None
    } else {
        Some(field.to_string())
    }
}

fn timestamp(field: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(field)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| format!("invalid timestamp {field:?}"))
}

#[cfg(test)]
mod tests {
    use tagmint_id::TagVariant;

    use super::*;

    fn row(id: i64, secondary: Option<&str>, target: Option<&str>) -> TagRow {
        let now = "2026-08-26T10:00:00+00:00".parse::<DateTime<Utc>>().unwrap();
        TagRow {
            id,
            secondary: secondary.map(str::to_string),
            variant: TagVariant::Bare,
            link_target: target.map(str::to_string),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn snapshot_roundtrips() {
        let rows = vec![
            row(1, None, None),
            row(2, Some("NFC123"), Some("https://dh.example")),
            row(900, None, Some("https://dh.example")),
        ];

        let mut buf = Vec::new();
        write_snapshot(&mut buf, &rows).unwrap();
        let restored = read_snapshot(buf.as_slice()).unwrap();

        assert_eq!(restored.len(), 3);
        assert_eq!(restored[0].id, 1);
        assert_eq!(restored[1].secondary.as_deref(), Some("NFC123"));
        assert_eq!(restored[1].link_target.as_deref(), Some("https://dh.example"));
        assert_eq!(restored[2].id, 900);
        assert_eq!(restored[0].created_at, rows[0].created_at);
    }

    #[test]
    fn empty_fields_restore_as_null() {
        let data = "5,,,tag,2026-01-02T03:04:05+00:00,2026-01-02T03:04:05+00:00\n";
        let rows = read_snapshot(data.as_bytes()).unwrap();
        assert_eq!(rows[0].secondary, None);
        assert_eq!(rows[0].link_target, None);
    }

    #[test]
    fn empty_snapshot_is_valid() {
        assert!(read_snapshot("".as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn malformed_rows_are_rejected_with_line_numbers() {
        let cases = [
            "abc,,,tag,2026-01-01T00:00:00Z,2026-01-01T00:00:00Z\n",
            "0,,,tag,2026-01-01T00:00:00Z,2026-01-01T00:00:00Z\n",
            "1,,,gizmo,2026-01-01T00:00:00Z,2026-01-01T00:00:00Z\n",
            "1,,,tag,not-a-time,2026-01-01T00:00:00Z\n",
            "1,,tag\n",
        ];
        for data in cases {
            let err = read_snapshot(data.as_bytes()).unwrap_err();
            assert!(
                matches!(err, SnapshotError::MalformedRow { line: 1, .. }),
                "{data:?} gave {err}"
            );
        }
    }

    #[test]
    fn error_names_the_offending_line() {
        let data = "\
1,,,tag,2026-01-01T00:00:00Z,2026-01-01T00:00:00Z
2,,,etag,bogus,2026-01-01T00:00:00Z
";
        let err = read_snapshot(data.as_bytes()).unwrap_err();
        assert!(matches!(err, SnapshotError::MalformedRow { line: 2, .. }));
    }
}
