//! CSV attribute table backend.
//!
//! The table is held in memory for the duration of the run so that columns
//! this tool does not know about survive the rewrite untouched.

use crate::config::ColumnConfig;
use crate::hydrology::{self, Discharge};
use crate::network::WriteStats;
use anyhow::{Context, Result, anyhow};
use csv::{ReaderBuilder, WriterBuilder};
use indicatif::ProgressBar;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

pub struct CsvStore {
    path: PathBuf,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl CsvStore {
    pub fn open(path: &Path) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("Failed to open network table: {:?}", path))?;
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(BufReader::new(file));

        let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for result in rdr.records() {
            let record = result?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(CsvStore {
            path: path.to_path_buf(),
            headers,
            rows,
        })
    }

    fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    fn require_column(&self, name: &str) -> Result<usize> {
        self.column(name)
            .ok_or_else(|| anyhow!("Column {} not found in {:?}", name, self.path))
    }

    // Adds the column with empty cells when it does not exist yet
    fn ensure_column(&mut self, name: &str) -> usize {
        match self.column(name) {
            Some(idx) => idx,
            None => {
                self.headers.push(name.to_string());
                for row in &mut self.rows {
                    row.push(String::new());
                }
                self.headers.len() - 1
            }
        }
    }

    pub fn drainage(&self, cols: &ColumnConfig) -> Result<(Vec<i64>, Vec<f64>)> {
        let segid_idx = self.require_column(&cols.segid)?;
        let da_idx = self.require_column(&cols.drainage_area)?;

        let mut segids = Vec::with_capacity(self.rows.len());
        let mut da_sqkm = Vec::with_capacity(self.rows.len());
        for (i, row) in self.rows.iter().enumerate() {
            let segid: i64 = row[segid_idx].parse().with_context(|| {
                format!(
                    "Row {}: invalid {} value {:?}",
                    i + 1,
                    cols.segid,
                    row[segid_idx]
                )
            })?;
            let da: f64 = row[da_idx].parse().with_context(|| {
                format!(
                    "Row {}: invalid {} value {:?}",
                    i + 1,
                    cols.drainage_area,
                    row[da_idx]
                )
            })?;
            segids.push(segid);
            da_sqkm.push(da);
        }
        Ok((segids, da_sqkm))
    }

    pub fn write_discharge(
        &mut self,
        cols: &ColumnConfig,
        map: &HashMap<i64, Discharge>,
        pb: &ProgressBar,
    ) -> Result<WriteStats> {
        let segid_idx = self.require_column(&cols.segid)?;
        let qlow_idx = self.ensure_column(&cols.qlow);
        let q2_idx = self.ensure_column(&cols.q2);

        let mut stats = WriteStats::default();
        for row in &mut self.rows {
            pb.inc(1);
            let Ok(segid) = row[segid_idx].parse::<i64>() else {
                eprintln!(
                    "Skipping row with unreadable {}: {:?}",
                    cols.segid, row[segid_idx]
                );
                stats.skipped += 1;
                continue;
            };
            match map.get(&segid) {
                Some(discharge) => {
                    row[qlow_idx] = discharge.qlow.to_string();
                    row[q2_idx] = discharge.q2.to_string();
                    stats.matched += 1;
                }
                None => {
                    eprintln!("No discharge computed for SegID {}; row left unchanged", segid);
                    stats.skipped += 1;
                }
            }
        }
        Ok(stats)
    }

    pub fn repair_peaks(&mut self, cols: &ColumnConfig) -> Result<usize> {
        let qlow_idx = self.require_column(&cols.qlow)?;
        let q2_idx = self.require_column(&cols.q2)?;

        let mut repaired = 0;
        for row in &mut self.rows {
            let (Ok(qlow), Ok(q2)) = (row[qlow_idx].parse::<f64>(), row[q2_idx].parse::<f64>())
            else {
                continue;
            };
            if q2 < qlow {
                row[q2_idx] = hydrology::repair_peak(qlow, q2).to_string();
                repaired += 1;
            }
        }
        Ok(repaired)
    }

    pub fn write_stream_power(&mut self, cols: &ColumnConfig, pb: &ProgressBar) -> Result<usize> {
        let slope_idx = self.require_column(&cols.slope)?;
        let qlow_idx = self.require_column(&cols.qlow)?;
        let q2_idx = self.require_column(&cols.q2)?;
        let sp_low_idx = self.ensure_column(&cols.sp_low);
        let sp2_idx = self.ensure_column(&cols.sp2);

        let mut updated = 0;
        for (i, row) in self.rows.iter_mut().enumerate() {
            pb.inc(1);
            let parsed = (
                row[slope_idx].parse::<f64>(),
                row[qlow_idx].parse::<f64>(),
                row[q2_idx].parse::<f64>(),
            );
            let (Ok(slope), Ok(qlow), Ok(q2)) = parsed else {
                eprintln!(
                    "Row {}: missing slope or discharge; stream power not computed",
                    i + 1
                );
                continue;
            };
            row[sp_low_idx] = hydrology::stream_power(slope, qlow).to_string();
            row[sp2_idx] = hydrology::stream_power(slope, q2).to_string();
            updated += 1;
        }
        Ok(updated)
    }

    pub fn save(&self) -> Result<()> {
        let mut wtr = WriterBuilder::new()
            .from_path(&self.path)
            .with_context(|| format!("Failed to rewrite network table: {:?}", self.path))?;
        wtr.write_record(&self.headers)?;
        for row in &self.rows {
            wtr.write_record(row)?;
        }
        wtr.flush().context("Failed to flush CSV writer")?;
        Ok(())
    }
}
