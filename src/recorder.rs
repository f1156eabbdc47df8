// src/recorder.rs
use std::fmt::Display;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use log::info;

use crate::types::{BandKind, ResultRecord};

/// CSV sink for result records: one header row, then one row per record.
///
/// Columns are `Timestamp`, one `<Band> Power Combined` per configured band,
/// `Alpha/Theta Ratio Combined`, `Mental State` and `Color`. Values a record
/// does not carry are left empty.
pub struct ResultRecorder<W: Write> {
    writer: csv::Writer<W>,
    bands: Vec<BandKind>,
    rows: u64,
}

impl ResultRecorder<File> {
    pub fn create(path: &Path, bands: &[BandKind]) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("creating result file {}", path.display()))?;
        let recorder = Self::new(file, bands)
            .with_context(|| format!("writing header to {}", path.display()))?;
        info!("recording results to {}", path.display());
        Ok(recorder)
    }
}

fn cell<T: Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

impl<W: Write> ResultRecorder<W> {
    pub fn new(writer: W, bands: &[BandKind]) -> csv::Result<Self> {
        let mut writer = csv::Writer::from_writer(writer);
        let mut header = vec!["Timestamp".to_string()];
        header.extend(bands.iter().map(|b| format!("{} Power Combined", b.title())));
        header.extend(
            ["Alpha/Theta Ratio Combined", "Mental State", "Color"].map(String::from),
        );
        writer.write_record(&header)?;
        Ok(Self {
            writer,
            bands: bands.to_vec(),
            rows: 0,
        })
    }

    pub fn write_record(&mut self, record: &ResultRecord) -> csv::Result<()> {
        let mut row = Vec::with_capacity(self.bands.len() + 4);
        row.push(cell(record.timestamp));
        row.extend(self.bands.iter().map(|&band| cell(record.band_power(band))));
        row.push(cell(record.alpha_theta_ratio));
        row.push(cell(record.state()));
        row.push(cell(record.color));
        self.writer.write_record(&row)?;
        self.rows += 1;
        Ok(())
    }

    /// Flush and hand back the underlying writer.
    pub fn finish(mut self) -> io::Result<W> {
        self.writer.flush()?;
        info!("result file closed after {} rows", self.rows);
        self.writer.into_inner().map_err(|err| err.into_error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::ColorCode;
    use crate::types::{Classification, MentalState};
    use std::collections::BTreeMap;

    fn record() -> ResultRecord {
        let mut band_powers = BTreeMap::new();
        band_powers.insert(BandKind::Theta, 0.5);
        band_powers.insert(BandKind::Alpha, 0.25);
        ResultRecord {
            sequence: 0,
            timestamp: Some(1.5),
            warm: true,
            band_powers,
            alpha_theta_ratio: Some(0.5),
            classification: Some(Classification {
                ratio: 0.5,
                state: MentalState::Drowsy,
                note: String::new(),
                denominator_clamped: false,
            }),
            color: Some(ColorCode {
                red: 0x80,
                green: 0x7f,
                blue: 0,
            }),
            channels: Vec::new(),
        }
    }

    #[test]
    fn writes_header_and_rows() {
        let bands = [BandKind::Delta, BandKind::Theta, BandKind::Alpha];
        let mut recorder = ResultRecorder::new(Vec::new(), &bands).unwrap();
        recorder.write_record(&record()).unwrap();
        let mut partial = record();
        partial.timestamp = None;
        partial.classification = None;
        partial.color = None;
        partial.alpha_theta_ratio = None;
        recorder.write_record(&partial).unwrap();
        let text = String::from_utf8(recorder.finish().unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Timestamp,Delta Power Combined,Theta Power Combined,Alpha Power Combined,Alpha/Theta Ratio Combined,Mental State,Color",
                "1.5,,0.5,0.25,0.5,drowsy,0x807f00",
                ",,0.5,0.25,,,",
            ]
        );
    }

    #[test]
    fn creates_file_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eeg_results.csv");
        let mut recorder = ResultRecorder::create(&path, &[BandKind::Alpha]).unwrap();
        recorder.write_record(&record()).unwrap();
        recorder.finish().unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.starts_with("Timestamp,Alpha Power Combined,"));
    }
}
