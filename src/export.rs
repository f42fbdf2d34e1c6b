use crate::config::Config;
use crate::row::{Row, HEADER};
use crate::text::timestamp_now;
use csv::{QuoteStyle, ReaderBuilder, StringRecord, Terminator, WriterBuilder};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// UTF-8 byte order mark, so spreadsheet apps detect the encoding.
const BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV validation failed: file is empty.")]
    Empty,

    #[error("CSV validation failed: header mismatch.\nExpected: {expected:?}\nFound:   {found:?}")]
    HeaderMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("CSV validation failed: wrong column count at row {row} (got {found}, expected {expected})")]
    ColumnCount {
        row: usize,
        found: usize,
        expected: usize,
    },
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> ExportError + '_ {
    move |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Write `rows` to `<out_dir>/<prefix>_<YYYY-MM-DD_HH-MM>.csv` and return the path.
pub fn write_csv(rows: &[Row], out_dir: &Path, config: &Config) -> Result<PathBuf, ExportError> {
    fs::create_dir_all(out_dir).map_err(io_error(out_dir))?;

    let path = out_dir.join(format!(
        "{}_{}.csv",
        config.out_prefix,
        timestamp_now(config.timezone)
    ));
    write_rows(&path, rows, config)?;

    tracing::debug!(path = %path.display(), rows = rows.len(), "Wrote CSV");
    Ok(path)
}

fn write_rows(path: &Path, rows: &[Row], config: &Config) -> Result<(), ExportError> {
    let mut file = File::create(path).map_err(io_error(path))?;
    file.write_all(BOM).map_err(io_error(path))?;

    let mut writer = WriterBuilder::new()
        .delimiter(config.delimiter)
        .quote(config.quote)
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(file);

    writer.write_record(HEADER)?;
    for row in rows {
        writer.write_record(row.to_record())?;
    }
    writer.flush().map_err(io_error(path))?;
    Ok(())
}

/// Re-read a written file and check the header and every row's width.
/// Returns the number of data rows.
///
/// The csv reader silently skips blank lines. Each record consumes its own
/// terminator, so the bytes a read consumes start with `\n` only when blank
/// lines came before the record. A blank line counts as a row with zero columns.
pub fn validate_csv(path: &Path, config: &Config) -> Result<usize, ExportError> {
    let bytes = fs::read(path).map_err(io_error(path))?;
    let content = bytes.strip_prefix(BOM).unwrap_or(&bytes);
    if content.is_empty() {
        return Err(ExportError::Empty);
    }

    let mut reader = ReaderBuilder::new()
        .delimiter(config.delimiter)
        .quote(config.quote)
        .terminator(Terminator::Any(b'\n'))
        .has_headers(false)
        .flexible(true)
        .from_reader(content);

    let starts_blank = |start: u64| content.get(start as usize) == Some(&b'\n');

    let mut record = StringRecord::new();
    if !reader.read_record(&mut record)? || starts_blank(0) {
        return Err(header_mismatch(&StringRecord::new()));
    }
    if record.iter().ne(HEADER.iter().copied()) {
        return Err(header_mismatch(&record));
    }

    let blank_row = |row| ExportError::ColumnCount {
        row,
        found: 0,
        expected: HEADER.len(),
    };

    // Row numbers are 1-based and count the header.
    let mut row = 1;
    let mut data_rows = 0;
    let mut prev_end = reader.position().byte();
    while reader.read_record(&mut record)? {
        row += 1;
        if starts_blank(prev_end) {
            return Err(blank_row(row));
        }
        if record.len() != HEADER.len() {
            return Err(ExportError::ColumnCount {
                row,
                found: record.len(),
                expected: HEADER.len(),
            });
        }
        data_rows += 1;
        prev_end = reader.position().byte();
    }

    // Line breaks after the last record.
    if (content.len() as u64) > prev_end {
        return Err(blank_row(row + 1));
    }

    Ok(data_rows)
}

fn header_mismatch(found: &StringRecord) -> ExportError {
    ExportError::HeaderMismatch {
        expected: HEADER.iter().map(|s| s.to_string()).collect(),
        found: found.iter().map(str::to_string).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(text: &str) -> Row {
        Row {
            name: "Budi Santoso".to_string(),
            handle: "@budi".to_string(),
            timestamp: "2024-01-01T10:00:00+07:00".to_string(),
            text: text.to_string(),
            emojis: String::new(),
            comments: 1,
            retweets: 0,
            likes: 7,
        }
    }

    #[test]
    fn test_write_then_validate() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("nested").join("out");
        let config = Config::default();
        let rows = vec![
            row("plain indihome"),
            row("has; delimiter and \"quotes\""),
            row("multi\r\nline text"),
            row(""),
        ];

        let path = write_csv(&rows, &out_dir, &config).unwrap();
        assert_eq!(validate_csv(&path, &config).unwrap(), rows.len());

        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("Indihome_"));
        assert!(name.ends_with(".csv"));
        assert_eq!(name.len(), "Indihome_2024-01-01_10-00.csv".len());
    }

    #[test]
    fn test_file_layout() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        let path = write_csv(&[row("simple; text")], dir.path(), &config).unwrap();

        let bytes = fs::read(&path).unwrap();
        assert!(bytes.starts_with(BOM));
        let text = std::str::from_utf8(&bytes[BOM.len()..]).unwrap();
        assert_eq!(
            text,
            "UserName;Handle;Timestamp;Text;Emojis;Comments;Retweets;Likes\n\
             Budi Santoso;@budi;2024-01-01T10:00:00+07:00;\"simple; text\";;1;0;7\n"
        );
    }

    #[test]
    fn test_empty_rows_writes_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        let path = write_csv(&[], dir.path(), &config).unwrap();
        assert_eq!(validate_csv(&path, &config).unwrap(), 0);
    }

    #[test]
    fn test_validate_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        fs::write(&path, BOM).unwrap();
        assert!(matches!(
            validate_csv(&path, &Config::default()),
            Err(ExportError::Empty)
        ));
    }

    #[test]
    fn test_validate_header_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad_header.csv");
        fs::write(
            &path,
            "UserName;Handle;Time;Text;Emojis;Comments;Retweets;Likes\n",
        )
        .unwrap();

        let err = validate_csv(&path, &Config::default()).unwrap_err();
        match err {
            ExportError::HeaderMismatch { expected, found } => {
                assert_eq!(expected[2], "Timestamp");
                assert_eq!(found[2], "Time");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_validate_column_count() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short_row.csv");
        fs::write(
            &path,
            "UserName;Handle;Timestamp;Text;Emojis;Comments;Retweets;Likes\n\
             a;@a;2024;t;;0;0;0\n\
             a;@a;2024;t;0;0\n",
        )
        .unwrap();

        let err = validate_csv(&path, &Config::default()).unwrap_err();
        assert!(matches!(
            err,
            ExportError::ColumnCount {
                row: 3,
                found: 6,
                expected: 8
            }
        ));
        assert!(err.to_string().contains("row 3"));
    }

    const HEADER_LINE: &str = "UserName;Handle;Timestamp;Text;Emojis;Comments;Retweets;Likes";

    fn validate_str(dir: &Path, content: &str) -> Result<usize, ExportError> {
        let path = dir.join("check.csv");
        fs::write(&path, content).unwrap();
        validate_csv(&path, &Config::default())
    }

    #[test]
    fn test_validate_blank_data_row() {
        let dir = tempfile::tempdir().unwrap();
        let content = format!(
            "{}\na;@a;2024;t;;0;0;0\n\na;@a;2024;t;;0;0;0\n",
            HEADER_LINE
        );

        let err = validate_str(dir.path(), &content).unwrap_err();
        assert!(matches!(
            err,
            ExportError::ColumnCount {
                row: 3,
                found: 0,
                expected: 8
            }
        ));
    }

    #[test]
    fn test_validate_blank_first_line() {
        let dir = tempfile::tempdir().unwrap();
        let err = validate_str(dir.path(), &format!("\n{}\n", HEADER_LINE)).unwrap_err();
        match err {
            ExportError::HeaderMismatch { found, .. } => assert!(found.is_empty()),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_validate_only_line_breaks() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            validate_str(dir.path(), "\n\n"),
            Err(ExportError::HeaderMismatch { .. })
        ));
    }

    #[test]
    fn test_validate_trailing_blank_line() {
        let dir = tempfile::tempdir().unwrap();
        let content = format!("{}\na;@a;2024;t;;0;0;0\n\n", HEADER_LINE);

        let err = validate_str(dir.path(), &content).unwrap_err();
        assert!(matches!(err, ExportError::ColumnCount { row: 3, found: 0, .. }));
    }

    #[test]
    fn test_validate_crlf_header_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let content = format!("{}\r\na;@a;2024;t;;0;0;0\r\n", HEADER_LINE);
        match validate_str(dir.path(), &content).unwrap_err() {
            ExportError::HeaderMismatch { found, .. } => assert_eq!(found[7], "Likes\r"),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_validate_without_final_newline() {
        let dir = tempfile::tempdir().unwrap();
        let content = format!("{}\na;@a;2024;t;;0;0;0", HEADER_LINE);
        assert_eq!(validate_str(dir.path(), &content).unwrap(), 1);
    }
}
