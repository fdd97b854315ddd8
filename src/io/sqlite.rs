//! SQLite attribute table backend (plain .sqlite/.db files or GeoPackage).
//!
//! Output fields are added with ALTER TABLE when missing and values are
//! written row by row keyed on the segment identifier.

use crate::config::ColumnConfig;
use crate::hydrology::{self, Discharge};
use crate::network::WriteStats;
use anyhow::{Context, Result, bail};
use indicatif::ProgressBar;
use rusqlite::{Connection, params};
use std::collections::HashMap;
use std::path::Path;

pub struct SqliteStore {
    conn: Connection,
    table: String,
}

impl SqliteStore {
    pub fn open(path: &Path, table: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {:?}", path))?;
        let tables: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![table],
            |row| row.get(0),
        )?;
        if tables == 0 {
            bail!("Table {} not found in {:?}", table, path);
        }
        Ok(SqliteStore {
            conn,
            table: table.to_string(),
        })
    }

    fn has_column(&self, name: &str) -> rusqlite::Result<bool> {
        let mut stmt = self
            .conn
            .prepare("SELECT COUNT(*) FROM pragma_table_info(?1) WHERE name = ?2")?;
        let n: i64 = stmt.query_row(params![self.table, name], |row| row.get(0))?;
        Ok(n > 0)
    }

    fn ensure_column(&self, name: &str) -> Result<()> {
        if !self.has_column(name)? {
            self.conn.execute(
                &format!(
                    "ALTER TABLE \"{}\" ADD COLUMN \"{}\" REAL",
                    self.table, name
                ),
                [],
            )?;
        }
        Ok(())
    }

    pub fn drainage(&self, cols: &ColumnConfig) -> Result<(Vec<i64>, Vec<f64>)> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT \"{}\", \"{}\" FROM \"{}\"",
                cols.segid, cols.drainage_area, self.table
            ))
            .with_context(|| {
                format!(
                    "Columns {} and {} are required in table {}",
                    cols.segid, cols.drainage_area, self.table
                )
            })?;

        let mut segids = Vec::new();
        let mut da_sqkm = Vec::new();
        let rows = stmt.query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, f64>(1)?)))?;
        for row in rows {
            let (segid, da) = row.context("Malformed SegID or drainage area value")?;
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
        self.ensure_column(&cols.qlow)?;
        self.ensure_column(&cols.q2)?;

        let segids: Vec<i64> = {
            let mut stmt = self.conn.prepare(&format!(
                "SELECT \"{}\" FROM \"{}\"",
                cols.segid, self.table
            ))?;
            let rows = stmt.query_map([], |row| row.get(0))?;
            rows.collect::<rusqlite::Result<_>>()?
        };

        let mut update = self.conn.prepare(&format!(
            "UPDATE \"{}\" SET \"{}\" = ?1, \"{}\" = ?2 WHERE \"{}\" = ?3",
            self.table, cols.qlow, cols.q2, cols.segid
        ))?;

        let mut stats = WriteStats::default();
        for segid in segids {
            pb.inc(1);
            let Some(discharge) = map.get(&segid) else {
                eprintln!("No discharge computed for SegID {}; row left unchanged", segid);
                stats.skipped += 1;
                continue;
            };
            match update.execute(params![discharge.qlow, discharge.q2, segid]) {
                Ok(_) => stats.matched += 1,
                Err(e) => {
                    eprintln!("Failed to update SegID {}: {}", segid, e);
                    stats.skipped += 1;
                }
            }
        }
        Ok(stats)
    }

    pub fn repair_peaks(&mut self, cols: &ColumnConfig) -> Result<usize> {
        let repaired = self.conn.execute(
            &format!(
                "UPDATE \"{t}\" SET \"{q2}\" = \"{qlow}\" + {delta} WHERE \"{q2}\" < \"{qlow}\"",
                t = self.table,
                q2 = cols.q2,
                qlow = cols.qlow,
                delta = hydrology::PEAK_REPAIR_DELTA
            ),
            [],
        )?;
        Ok(repaired)
    }

    pub fn write_stream_power(&mut self, cols: &ColumnConfig, pb: &ProgressBar) -> Result<usize> {
        self.ensure_column(&cols.sp_low)?;
        self.ensure_column(&cols.sp2)?;

        type PowerRow = (i64, Option<f64>, Option<f64>, Option<f64>);
        let rows: Vec<PowerRow> = {
            let mut stmt = self
                .conn
                .prepare(&format!(
                    "SELECT \"{}\", \"{}\", \"{}\", \"{}\" FROM \"{}\"",
                    cols.segid, cols.slope, cols.qlow, cols.q2, self.table
                ))
                .with_context(|| {
                    format!(
                        "Column {} is required in table {} for stream power",
                        cols.slope, self.table
                    )
                })?;
            let mapped = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                ))
            })?;
            mapped.collect::<rusqlite::Result<_>>()?
        };

        let mut update = self.conn.prepare(&format!(
            "UPDATE \"{}\" SET \"{}\" = ?1, \"{}\" = ?2 WHERE \"{}\" = ?3",
            self.table, cols.sp_low, cols.sp2, cols.segid
        ))?;

        let mut updated = 0;
        for (segid, slope, qlow, q2) in rows {
            pb.inc(1);
            let (Some(slope), Some(qlow), Some(q2)) = (slope, qlow, q2) else {
                eprintln!(
                    "SegID {}: missing slope or discharge; stream power not computed",
                    segid
                );
                continue;
            };
            let sp_low = hydrology::stream_power(slope, qlow);
            let sp2 = hydrology::stream_power(slope, q2);
            match update.execute(params![sp_low, sp2, segid]) {
                Ok(_) => updated += 1,
                Err(e) => eprintln!("Failed to update SegID {}: {}", segid, e),
            }
        }
        Ok(updated)
    }
}
