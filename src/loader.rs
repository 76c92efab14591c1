use crate::schema;
use crate::storage::Storage;
use crate::timeutil::round_to_half_hour;
use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;
use std::io::Cursor;

/// Fetches the three input datasets from the document store and applies the
/// load-time fix-ups: the duplicated site-month key rename, permissive
/// datetime parsing, and time-of-day normalization. Any fetch or decode
/// failure aborts the run; only cell-level parse failures are recovered (as
/// nulls).
pub struct DatasetLoader<'a, S: Storage> {
    storage: &'a S,
}

impl<'a, S: Storage> DatasetLoader<'a, S> {
    pub fn new(storage: &'a S) -> Self {
        Self { storage }
    }

    fn load_parquet(&self, file_id: &str) -> Result<DataFrame> {
        let bytes = self.storage.fetch(file_id)?;
        ParquetReader::new(Cursor::new(bytes))
            .finish()
            .with_context(|| format!("failed to decode parquet dataset {}", file_id))
    }

    /// Monthly reading events, one row per site per billing period per read.
    pub fn load_site_month_readings(&self, file_id: &str) -> Result<DataFrame> {
        let mut df = self.load_parquet(file_id)?;
        fix_site_month_key(&mut df)?;
        schema::ensure_columns(&df, schema::SITE_MONTH_REQUIRED, "site-month readings")?;
        parse_datetime_column(&mut df, "MonthYear")?;
        parse_datetime_column(&mut df, "Date")?;
        normalize_times_column(&mut df, "Times")?;
        Ok(df)
    }

    /// Static per-site metadata; only `inst_date` feeds the pipeline.
    pub fn load_site_info(&self, file_id: &str) -> Result<DataFrame> {
        let mut df = self.load_parquet(file_id)?;
        schema::ensure_columns(&df, schema::SITE_INFO_REQUIRED, "site info")?;
        parse_datetime_column(&mut df, "inst_date")?;
        Ok(df)
    }

    /// Per-site-per-month maximum demand indicator history.
    pub fn load_max_mdi(&self, file_id: &str) -> Result<DataFrame> {
        let mut df = self.load_parquet(file_id)?;
        fix_site_month_key(&mut df)?;
        schema::ensure_columns(&df, schema::MAX_MDI_REQUIRED, "max MDI records")?;
        Ok(df)
    }
}

/// The upstream export writes the composite key twice: a stale
/// `site_month_KEY` and the canonical value under `site_month_KEY_`. Keep
/// the underscored one and give it the canonical name. This quirk is
/// specific to these exports, not a general rename rule.
fn fix_site_month_key(df: &mut DataFrame) -> Result<()> {
    if df.get_column_names().contains(&"site_month_KEY_") {
        if df.get_column_names().contains(&"site_month_KEY") {
            *df = df.drop("site_month_KEY")?;
        }
        df.rename("site_month_KEY_", "site_month_KEY")?;
    }
    Ok(())
}

/// Coerce a column to millisecond datetimes. Columns already typed as
/// dates are cast; string columns are parsed value by value, with
/// unparseable cells becoming null rather than aborting the load.
fn parse_datetime_column(df: &mut DataFrame, name: &str) -> Result<()> {
    let s = df.column(name)?;
    let parsed = match s.dtype() {
        DataType::Datetime(_, _) | DataType::Date => {
            s.cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?
        }
        _ => {
            let strings = s.cast(&DataType::String)?;
            let ca = strings.str()?;
            let mut unparseable = 0usize;
            let mut millis: Vec<Option<i64>> = Vec::with_capacity(ca.len());
            for value in ca.into_iter() {
                match value {
                    Some(raw) => {
                        let ms = parse_datetime_ms(raw);
                        if ms.is_none() {
                            unparseable += 1;
                        }
                        millis.push(ms);
                    }
                    None => millis.push(None),
                }
            }
            if unparseable > 0 {
                log::warn!("{}: {} unparseable values set to null", name, unparseable);
            }
            Series::new(name, millis).cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?
        }
    };
    df.replace(name, parsed)?;
    Ok(())
}

fn parse_datetime_ms(raw: &str) -> Option<i64> {
    const FORMATS: [&str; 4] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d", "%d/%m/%Y"];
    let raw = raw.trim();
    for format in FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt.and_utc().timestamp_millis());
        }
        if let Ok(d) = NaiveDate::parse_from_str(raw, format) {
            return Some(d.and_hms_opt(0, 0, 0)?.and_utc().timestamp_millis());
        }
    }
    None
}

/// Cast the reading-time column to string and snap every value to its
/// 30-minute boundary; malformed times come out null.
fn normalize_times_column(df: &mut DataFrame, name: &str) -> Result<()> {
    let strings = df.column(name)?.cast(&DataType::String)?;
    let ca = strings.str()?;
    let rounded: Vec<Option<String>> = ca.into_iter().map(round_to_half_hour).collect();
    df.replace(name, Series::new(name, rounded))?;
    Ok(())
}
