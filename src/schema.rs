use anyhow::{bail, Result};
use polars::prelude::*;
use std::collections::HashSet;

/// Columns the site-month reading export must carry (after the key rename
/// fix-up in the loader).
pub const SITE_MONTH_REQUIRED: &[&str] = &[
    "SiteID",
    "Batch",
    "BillRef#",
    "Date",
    "Times",
    "MonthYear",
    "DISCO",
    "Circle",
    "Division",
    "SubDivision",
    "Meter_Number",
    "kWh_Reading",
    "kWh_Units",
    "MDI",
    "ct_ratio",
    "pt_ratio",
    "site_month_KEY",
    "kvarh_reading",
    "kVARh Units",
    "Peak/OffPeak",
    "SDO",
    "peak_reading",
    "off_peak_reading",
    "bd_zy",
];

pub const SITE_INFO_REQUIRED: &[&str] = &["SiteID", "inst_date"];

pub const MAX_MDI_REQUIRED: &[&str] = &["SiteID", "site_month_KEY", "Max_MDI"];

/// Canonical enriched schema. The enrichment join projects to exactly these
/// columns, in this order; anything else from the inputs is dropped.
pub const ENRICHED_COLUMNS: &[&str] = &[
    "SiteID",
    "Batch",
    "BillRef#",
    "Date",
    "Times",
    "DISCO",
    "Circle",
    "Division",
    "SubDivision",
    "Meter_Number",
    "kWh_Reading",
    "kWh_Units",
    "MDI",
    "ct_ratio",
    "pt_ratio",
    "site_month_KEY",
    "inst_date",
    "Max_MDI_Per_Year",
    "Max_MDI_Per_Month",
    "kvarh_reading",
    "kVARh Units",
    "no_of_resets",
    "Peak/OffPeak",
    "SDO",
    "peak_reading",
    "off_peak_reading",
    "bd_zy",
];

/// Fail fast when an input is missing expected columns, naming the dataset
/// and every missing column instead of surfacing a lookup error deep inside
/// a join or aggregation.
pub fn ensure_columns(df: &DataFrame, required: &[&str], dataset: &str) -> Result<()> {
    let present: HashSet<&str> = df.get_column_names().into_iter().collect();
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|c| !present.contains(c))
        .collect();
    if !missing.is_empty() {
        bail!("{} is missing expected columns: {:?}", dataset, missing);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_columns_are_named_in_the_error() {
        let df = df!("SiteID" => ["S1"]).unwrap();
        let err = ensure_columns(&df, SITE_INFO_REQUIRED, "site info").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("site info"));
        assert!(msg.contains("inst_date"));
    }

    #[test]
    fn complete_frame_passes() {
        let df = df!("SiteID" => ["S1"], "inst_date" => ["2024-01-01"]).unwrap();
        assert!(ensure_columns(&df, SITE_INFO_REQUIRED, "site info").is_ok());
    }
}
