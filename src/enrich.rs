use crate::schema;
use anyhow::Result;
use chrono::{DateTime, Datelike, NaiveDate};
use polars::prelude::*;

/// Join the three inputs into the canonical enriched frame.
///
/// The MDI history is first reduced to one row per site (sum and max over
/// the whole record — the aggregation window is all-time, not the current
/// year, despite the output column names; see DESIGN.md), so the later
/// joins never multiply rows. All joins are full outer joins on `SiteID`
/// with the key coalesced: a site present in only one input still comes
/// through, with nulls on the other side.
pub fn enrich(
    site_month: DataFrame,
    site_info: DataFrame,
    max_mdi: DataFrame,
    today: NaiveDate,
) -> Result<DataFrame> {
    let yearly = max_mdi
        .clone()
        .lazy()
        .group_by([col("SiteID")])
        .agg([col("Max_MDI").sum().alias("Max_MDI_Per_Year")]);
    let monthly = max_mdi
        .lazy()
        .group_by([col("SiteID")])
        .agg([col("Max_MDI").max().alias("Max_MDI_Per_Month")]);

    let mut merged = outer_on_site(site_month.lazy(), site_info.lazy());
    merged = outer_on_site(merged, yearly);
    merged = outer_on_site(merged, monthly);
    let mut merged = merged.collect()?;

    let resets = months_since_install(&merged, today)?;
    merged.with_column(resets)?;

    let projection: Vec<Expr> = schema::ENRICHED_COLUMNS.iter().map(|c| col(*c)).collect();
    let enriched = merged.lazy().select(projection).collect()?;
    Ok(enriched)
}

fn outer_on_site(left: LazyFrame, right: LazyFrame) -> LazyFrame {
    left.join(
        right,
        [col("SiteID")],
        [col("SiteID")],
        JoinArgs::new(JoinType::Full).with_coalesce(JoinCoalesce::CoalesceColumns),
    )
}

/// Whole calendar months elapsed between the install date and today; null
/// when the install date is missing or never parsed.
fn months_since_install(df: &DataFrame, today: NaiveDate) -> Result<Series> {
    let current = today.year() * 12 + today.month() as i32;
    let inst = df
        .column("inst_date")?
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?;
    let resets: Vec<Option<i32>> = inst
        .datetime()?
        .into_iter()
        .map(|ms| {
            ms.and_then(DateTime::from_timestamp_millis).map(|dt| {
                let d = dt.naive_utc().date();
                current - (d.year() * 12 + d.month() as i32)
            })
        })
        .collect();
    Ok(Series::new("no_of_resets", resets))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    fn datetime_ms(y: i32, m: u32, d: u32) -> i64 {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            .and_utc()
            .timestamp_millis()
    }

    fn site_month_frame(site_ids: &[&str]) -> DataFrame {
        let n = site_ids.len();
        let mut df = df!(
            "SiteID" => site_ids,
            "Batch" => vec!["07"; n],
            "BillRef#" => vec!["B-1"; n],
            "Times" => vec!["10:30:00"; n],
            "DISCO" => vec!["D1"; n],
            "Circle" => vec!["C1"; n],
            "Division" => vec!["V1"; n],
            "SubDivision" => vec!["SV1"; n],
            "Meter_Number" => vec!["M1"; n],
            "kWh_Reading" => vec![100.0; n],
            "kWh_Units" => vec![5.0; n],
            "MDI" => vec![1.5; n],
            "ct_ratio" => vec![10.0; n],
            "pt_ratio" => vec![1.0; n],
            "site_month_KEY" => vec!["K"; n],
            "kvarh_reading" => vec![50.0; n],
            "kVARh Units" => vec![2.0; n],
            "Peak/OffPeak" => vec!["Peak"; n],
            "SDO" => vec!["SDO-1"; n],
            "peak_reading" => vec![70.0; n],
            "off_peak_reading" => vec![30.0; n],
            "bd_zy" => vec!["BZ"; n],
        )
        .unwrap();
        let dates = Series::new("Date", vec![datetime_ms(2025, 6, 10); n])
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
            .unwrap();
        df.with_column(dates).unwrap();
        df
    }

    fn site_info_frame(site_ids: &[&str], install: &[Option<(i32, u32, u32)>]) -> DataFrame {
        let mut df = df!("SiteID" => site_ids).unwrap();
        let inst: Vec<Option<i64>> = install
            .iter()
            .map(|ymd| ymd.map(|(y, m, d)| datetime_ms(y, m, d)))
            .collect();
        let inst = Series::new("inst_date", inst)
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
            .unwrap();
        df.with_column(inst).unwrap();
        df
    }

    #[test]
    fn mdi_history_reduces_to_all_time_sum_and_max() {
        let max_mdi = df!(
            "SiteID" => ["S1", "S1"],
            "site_month_KEY" => ["S1-2025-01", "S1-2025-03"],
            "Max_MDI" => [10.0, 15.0],
        )
        .unwrap();
        let info = site_info_frame(&["S1"], &[Some((2025, 1, 10))]);

        let out = enrich(site_month_frame(&["S1"]), info, max_mdi, today()).unwrap();

        assert_eq!(out.height(), 1);
        assert_eq!(out.column("Max_MDI_Per_Year").unwrap().f64().unwrap().get(0), Some(25.0));
        assert_eq!(out.column("Max_MDI_Per_Month").unwrap().f64().unwrap().get(0), Some(15.0));
        assert_eq!(out.column("no_of_resets").unwrap().i32().unwrap().get(0), Some(5));
    }

    #[test]
    fn unknown_site_survives_with_nulls() {
        // S1 has readings but no metadata and no MDI history; S9 exists only
        // in the metadata table.
        let info = site_info_frame(&["S9"], &[Some((2024, 1, 10))]);
        let max_mdi = df!(
            "SiteID" => ["S9"],
            "site_month_KEY" => ["S9-2024-01"],
            "Max_MDI" => [4.0],
        )
        .unwrap();

        let out = enrich(site_month_frame(&["S1"]), info, max_mdi, today())
            .unwrap()
            .sort(["SiteID"], SortMultipleOptions::default())
            .unwrap();

        assert_eq!(out.height(), 2);
        assert_eq!(out.get_column_names(), schema::ENRICHED_COLUMNS);

        // S1: reading fields intact, enrichment fields null.
        assert_eq!(out.column("kWh_Reading").unwrap().f64().unwrap().get(0), Some(100.0));
        assert!(matches!(out.column("inst_date").unwrap().get(0).unwrap(), AnyValue::Null));
        assert_eq!(out.column("Max_MDI_Per_Year").unwrap().f64().unwrap().get(0), None);
        assert_eq!(out.column("Max_MDI_Per_Month").unwrap().f64().unwrap().get(0), None);
        assert_eq!(out.column("no_of_resets").unwrap().i32().unwrap().get(0), None);

        // S9: metadata-only row still appears, reading fields null.
        assert_eq!(out.column("SiteID").unwrap().str().unwrap().get(1), Some("S9"));
        assert_eq!(out.column("kWh_Reading").unwrap().f64().unwrap().get(1), None);
        assert_eq!(out.column("no_of_resets").unwrap().i32().unwrap().get(1), Some(17));
        assert_eq!(out.column("Max_MDI_Per_Month").unwrap().f64().unwrap().get(1), Some(4.0));
    }

    #[test]
    fn single_row_per_site_aggregates_never_multiply_rows() {
        let max_mdi = df!(
            "SiteID" => ["S1", "S1", "S1"],
            "site_month_KEY" => ["a", "b", "c"],
            "Max_MDI" => [1.0, 2.0, 3.0],
        )
        .unwrap();
        let info = site_info_frame(&["S1"], &[Some((2025, 1, 1))]);
        let readings = site_month_frame(&["S1", "S1"]);

        let out = enrich(readings, info, max_mdi, today()).unwrap();
        assert_eq!(out.height(), 2);
    }

    #[test]
    fn missing_install_date_yields_null_resets() {
        let info = site_info_frame(&["S1"], &[None]);
        let max_mdi = df!(
            "SiteID" => ["S1"],
            "site_month_KEY" => ["k"],
            "Max_MDI" => [1.0],
        )
        .unwrap();

        let out = enrich(site_month_frame(&["S1"]), info, max_mdi, today()).unwrap();
        assert_eq!(out.column("no_of_resets").unwrap().i32().unwrap().get(0), None);
    }
}
