//! CSV destination for sweep results.
//!
//! One header row (environment columns, flag columns, measurement column)
//! followed by one row per run. Every row is flushed as soon as it is written
//! so an interrupted sweep leaves a valid prefix on disk.

use std::{
    fs::{self, File, OpenOptions},
    io::{BufRead, BufReader, Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SweepError};

/// Cell written in the measurement column for a recorded failure.
pub const SENTINEL: &str = "NA";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Truncate the destination at the start of the sweep.
    #[default]
    Overwrite,
    /// Keep existing rows; the header is written only for a new or empty file.
    Append,
}

#[derive(Debug)]
pub struct CsvSink {
    path: PathBuf,
    file: File,
    columns: usize,
    rows: usize,
}

impl CsvSink {
    pub fn open(path: &Path, header: &[String], mode: OutputMode) -> Result<Self> {
        let io_err = |context: &str, source| SweepError::Io {
            path: path.to_path_buf(),
            context: context.to_string(),
            source,
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| io_err("creating directory", e))?;
            }
        }

        let expected = encode_row(header.iter().map(String::as_str));
        let needs_header = match mode {
            OutputMode::Overwrite => true,
            OutputMode::Append => match existing_header(path).map_err(|e| io_err("reading header", e))? {
                None => true,
                Some(found) if found == expected => false,
                Some(found) => {
                    return Err(SweepError::HeaderMismatch {
                        path: path.to_path_buf(),
                        found,
                        expected,
                    })
                }
            },
        };

        let mut options = OpenOptions::new();
        options.create(true);
        match mode {
            OutputMode::Overwrite => options.write(true).truncate(true),
            OutputMode::Append => options.append(true),
        };
        let unterminated = mode == OutputMode::Append
            && lacks_trailing_newline(path).map_err(|e| io_err("reading last line", e))?;
        let mut file = options.open(path).map_err(|e| io_err("opening", e))?;
        if unterminated {
            file.write_all(b"\n")
                .map_err(|e| io_err("terminating last line", e))?;
        }

        let mut sink = Self {
            path: path.to_path_buf(),
            file,
            columns: header.len(),
            rows: 0,
        };
        if needs_header {
            sink.write_line(&expected, "writing header")?;
        }
        Ok(sink)
    }

    /// Writes and flushes one data row; `context` names the run for diagnostics.
    pub fn write_row<'a, I>(&mut self, cells: I, context: &str) -> Result<()>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let cells: Vec<&str> = cells.into_iter().collect();
        if cells.len() != self.columns {
            return Err(SweepError::InvalidConfig(format!(
                "row for [{context}] has {} cells, header has {}",
                cells.len(),
                self.columns
            )));
        }
        let line = encode_row(cells);
        self.write_line(&line, context)?;
        self.rows += 1;
        Ok(())
    }

    pub fn rows_written(&self) -> usize {
        self.rows
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_line(&mut self, line: &str, context: &str) -> Result<()> {
        writeln!(self.file, "{line}")
            .and_then(|_| self.file.flush())
            .map_err(|source| SweepError::Io {
                path: self.path.clone(),
                context: context.to_string(),
                source,
            })
    }
}

/// True for an existing, non-empty file whose last byte is not `\n`.
fn lacks_trailing_newline(path: &Path) -> std::io::Result<bool> {
    let mut file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };
    if file.metadata()?.len() == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

/// First line of an existing, non-empty file.
fn existing_header(path: &Path) -> std::io::Result<Option<String>> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    let mut first = String::new();
    BufReader::new(file).read_line(&mut first)?;
    let first = first.trim_end_matches(['\r', '\n']);
    Ok((!first.is_empty()).then(|| first.to_string()))
}

pub fn encode_row<'a>(cells: impl IntoIterator<Item = &'a str>) -> String {
    cells
        .into_iter()
        .map(escape_field)
        .collect::<Vec<_>>()
        .join(",")
}

fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(cols: &[&str]) -> Vec<String> {
        cols.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_escape_field() {
        assert_eq!(encode_row(["a", "b,c", "say \"hi\"", ""]), "a,\"b,c\",\"say \"\"hi\"\"\",");
    }

    #[test]
    fn test_overwrite_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        fs::write(&path, "stale\n1\n").unwrap();

        let mut sink = CsvSink::open(&path, &header(&["ts", "measurement"]), OutputMode::Overwrite).unwrap();
        sink.write_row(["8", "1.5"], "ts=8").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "ts,measurement\n8,1.5\n");
        assert_eq!(sink.rows_written(), 1);
    }

    #[test]
    fn test_append_writes_header_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.csv");
        let cols = header(&["ts", "measurement"]);
        for v in ["1", "2"] {
            let mut sink = CsvSink::open(&path, &cols, OutputMode::Append).unwrap();
            sink.write_row(["8", v], "ts=8").unwrap();
        }
        assert_eq!(fs::read_to_string(&path).unwrap(), "ts,measurement\n8,1\n8,2\n");
    }

    #[test]
    fn test_append_after_unterminated_last_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        fs::write(&path, "n,measurement").unwrap();

        let mut sink = CsvSink::open(&path, &header(&["n", "measurement"]), OutputMode::Append).unwrap();
        sink.write_row(["1", "7"], "n=1").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "n,measurement\n1,7\n");

        fs::write(&path, "n,measurement\n1,7").unwrap();
        let mut sink = CsvSink::open(&path, &header(&["n", "measurement"]), OutputMode::Append).unwrap();
        sink.write_row(["2", "8"], "n=2").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "n,measurement\n1,7\n2,8\n");
    }

    #[test]
    fn test_append_rejects_different_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        fs::write(&path, "OMP_NUM_THREADS,ts,measurement\n").unwrap();
        let err = CsvSink::open(&path, &header(&["OMP_NUM_THREADS", "measurement"]), OutputMode::Append)
            .unwrap_err();
        assert!(matches!(err, SweepError::HeaderMismatch { .. }));
    }

    #[test]
    fn test_row_width_checked() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let mut sink = CsvSink::open(&path, &header(&["a", "b"]), OutputMode::Overwrite).unwrap();
        assert!(sink.write_row(["only"], "a=1").is_err());
    }
}
