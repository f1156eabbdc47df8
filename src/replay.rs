// src/replay.rs
use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord, Trim};
use log::{debug, info};

use crate::drivers::{PipelineError, SampleSet, SampleSource};

// muselsl writes `timestamps`, Mind Monitor and our own recorder `Timestamp`
const TIMESTAMP_HEADERS: [&str; 2] = ["timestamp", "timestamps"];

/// Replays a recorded CSV one row at a time.
///
/// Only the timestamp column and the configured channel columns are read;
/// anything else in the file (AUX channels, Muse `Elements` markers) is
/// ignored. An empty channel cell leaves that channel out of the sample-set so
/// the pipeline rejects it as a missing channel. A channel cell that is not a
/// number is a source error.
pub struct CsvReplaySource<R> {
    reader: csv::Reader<R>,
    row: StringRecord,
    timestamp_column: Option<usize>,
    channel_columns: Vec<(String, usize)>,
}

impl CsvReplaySource<File> {
    pub fn open(path: &Path, channels: &[String]) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("opening recording {}", path.display()))?;
        let source = Self::from_reader(file, channels)
            .with_context(|| format!("reading header of {}", path.display()))?;
        info!(
            "replaying {} ({} channel columns, timestamps {})",
            path.display(),
            source.channel_columns.len(),
            if source.timestamp_column.is_some() { "present" } else { "absent" }
        );
        Ok(source)
    }
}

impl<R: Read> CsvReplaySource<R> {
    pub fn from_reader(reader: R, channels: &[String]) -> Result<Self, PipelineError> {
        let mut reader = ReaderBuilder::new()
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);
        let headers = reader.headers().map_err(source_error)?.clone();
        if headers.is_empty() {
            return Err(PipelineError::Source("recording has no header row".into()));
        }
        let names: Vec<&str> = headers
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}'))
            .collect();
        let timestamp_column = names
            .iter()
            .position(|h| TIMESTAMP_HEADERS.iter().any(|t| h.eq_ignore_ascii_case(t)));
        let channel_columns = channels
            .iter()
            .map(|channel| {
                names
                    .iter()
                    .position(|h| *h == channel.as_str())
                    .map(|idx| (channel.clone(), idx))
                    .ok_or_else(|| {
                        PipelineError::Source(format!("recording has no column for channel {channel}"))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            reader,
            row: StringRecord::new(),
            timestamp_column,
            channel_columns,
        })
    }
}

impl<R: Read> SampleSource for CsvReplaySource<R> {
    fn next_sample_set(&mut self) -> Result<Option<SampleSet>, PipelineError> {
        if !self.reader.read_record(&mut self.row).map_err(source_error)? {
            debug!("recording exhausted");
            return Ok(None);
        }
        let line = self.row.position().map_or(0, |p| p.line());
        let mut set = SampleSet::new(None);
        if let Some(idx) = self.timestamp_column {
            set.timestamp = parse_cell(&self.row, idx, line, "timestamp")?;
        }
        for (channel, idx) in &self.channel_columns {
            if let Some(value) = parse_cell(&self.row, *idx, line, channel)? {
                set.insert(channel.clone(), value);
            }
        }
        Ok(Some(set))
    }
}

fn parse_cell(
    row: &StringRecord,
    idx: usize,
    line: u64,
    column: &str,
) -> Result<Option<f64>, PipelineError> {
    match row.get(idx) {
        None | Some("") => Ok(None),
        Some(cell) => cell.parse().map(Some).map_err(|_| {
            PipelineError::Source(format!(
                "line {line}: column {column}: cannot parse {cell:?} as a number"
            ))
        }),
    }
}

fn source_error(err: csv::Error) -> PipelineError {
    PipelineError::Source(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::engine::StreamDriver;
    use std::io::{Cursor, Write};

    fn muse() -> Vec<String> {
        PipelineConfig::playback().channels
    }

    fn source(text: &str) -> CsvReplaySource<Cursor<&str>> {
        CsvReplaySource::from_reader(Cursor::new(text), &muse()).unwrap()
    }

    #[test]
    fn yields_rows_in_order() {
        let mut source = source(
            "Timestamp,TP9,AF7,AF8,TP10,Right AUX\n\
             0.0,1.0,2.0,3.0,4.0,0.0\n\
             \n\
             0.004,-1.5,,3.5,4.5,0.0\n",
        );
        let first = source.next_sample_set().unwrap().unwrap();
        assert_eq!(first.timestamp, Some(0.0));
        assert_eq!(first.value("AF8"), Some(3.0));
        assert_eq!(first.value("Right AUX"), None);
        assert_eq!(first.num_channels(), 4);
        let second = source.next_sample_set().unwrap().unwrap();
        assert_eq!(second.timestamp, Some(0.004));
        assert_eq!(second.value("AF7"), None);
        assert!(source.next_sample_set().unwrap().is_none());
    }

    #[test]
    fn quoted_header_is_understood() {
        let mut source = source(
            "\"Timestamp\",\"TP9\",\"AF7\",\"AF8\",\"TP10\"\n\
             1.0,0.1,0.2,0.3,0.4\n",
        );
        let set = source.next_sample_set().unwrap().unwrap();
        assert_eq!(set.timestamp, Some(1.0));
        assert_eq!(set.value("TP10"), Some(0.4));
    }

    #[test]
    fn unused_text_columns_are_never_parsed() {
        let mut source = source(
            "TimeStamp,TP9,AF7,AF8,TP10,Elements\n\
             0.0,1.0,2.0,3.0,4.0,\n\
             0.1,,,,,/muse/elements/blink\n\
             0.2,1.0,2.0,3.0,4.0,\n",
        );
        assert_eq!(source.next_sample_set().unwrap().unwrap().num_channels(), 4);
        let marker = source.next_sample_set().unwrap().unwrap();
        assert_eq!(marker.timestamp, Some(0.1));
        assert_eq!(marker.num_channels(), 0);
        assert_eq!(source.next_sample_set().unwrap().unwrap().timestamp, Some(0.2));
    }

    #[test]
    fn muselsl_timestamps_column_is_recognised() {
        let mut source = source("timestamps,TP9,AF7,AF8,TP10\n1700000000.5,1,2,3,4\n");
        let set = source.next_sample_set().unwrap().unwrap();
        assert_eq!(set.timestamp, Some(1700000000.5));
        assert_eq!(set.num_channels(), 4);
    }

    #[test]
    fn short_rows_leave_channels_missing() {
        let mut source = source("Timestamp,TP9,AF7,AF8,TP10\n0.0,1.0,2.0\n");
        let set = source.next_sample_set().unwrap().unwrap();
        assert_eq!(set.value("AF7"), Some(2.0));
        assert_eq!(set.value("AF8"), None);
    }

    #[test]
    fn bad_channel_cells_report_line_numbers() {
        let mut source = source("Timestamp,TP9,AF7,AF8,TP10\n0.0,1,1,1,1\n0.1,abc,1,1,1\n");
        source.next_sample_set().unwrap();
        let err = source.next_sample_set().unwrap_err();
        assert_eq!(err.kind(), crate::drivers::ErrorKind::Source);
        assert!(err.to_string().contains("line 3"), "{err}");
        assert!(err.to_string().contains("TP9"), "{err}");
    }

    #[test]
    fn header_must_name_every_channel() {
        let err = CsvReplaySource::from_reader(Cursor::new("Timestamp,TP9,AF7\n0,1,2\n"), &muse())
            .err()
            .unwrap();
        assert!(err.to_string().contains("AF8"), "{err}");
        assert!(CsvReplaySource::from_reader(Cursor::new(""), &muse()).is_err());
    }

    #[test]
    fn replays_file_through_driver() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Timestamp,TP9,AF7,AF8,TP10,Elements").unwrap();
        for i in 0..40 {
            let t = i as f64 / 256.0;
            let v = (t * 60.0).sin();
            writeln!(file, "{t},{v},{},{},{},", -v, 0.5 * v, 2.0 * v).unwrap();
        }
        writeln!(file, "0.2,,,,,/muse/elements/blink").unwrap();
        file.flush().unwrap();
        let config = PipelineConfig {
            window_size: 32,
            ..PipelineConfig::playback()
        };
        let source = CsvReplaySource::open(file.path(), &config.channels).unwrap();
        let mut driver = StreamDriver::new(source, config).unwrap();
        let records = driver.drain().unwrap();
        assert_eq!(records.len(), 40);
        assert_eq!(driver.rejected(), 1);
        assert!(records[31].warm);
        assert!(!records[30].warm);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(CsvReplaySource::open(&dir.path().join("absent.csv"), &muse()).is_err());
    }
}
