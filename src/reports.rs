use anyhow::Result;
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;

#[derive(Debug, Clone, Copy)]
pub enum Reduction {
    Min,
    Max,
    Sum,
}

impl Reduction {
    fn apply(self, expr: Expr) -> Expr {
        match self {
            Reduction::Min => expr.min(),
            Reduction::Max => expr.max(),
            Reduction::Sum => expr.sum(),
        }
    }
}

/// One aggregated output column: which measure, how to reduce it, and what
/// to call the result. The `_min`/`_max`/`_sum` suffix convention is gone
/// after aggregation; only the reading columns keep explicit
/// `Start`/`End` names.
pub struct Measure {
    pub column: &'static str,
    pub reduction: Reduction,
    pub output: &'static str,
}

const fn m(column: &'static str, reduction: Reduction, output: &'static str) -> Measure {
    Measure { column, reduction, output }
}

/// Declarative shape of one report: group keys plus the measure list. All
/// three reports run through the same interpreter so the rules stay data.
pub struct ReportSpec {
    pub group_keys: &'static [&'static str],
    pub measures: &'static [Measure],
}

impl ReportSpec {
    pub fn aggregate(&self, df: &DataFrame) -> Result<DataFrame> {
        let keys: Vec<Expr> = self.group_keys.iter().map(|k| col(*k)).collect();
        let aggs: Vec<Expr> = self
            .measures
            .iter()
            .map(|m| m.reduction.apply(col(m.column)).alias(m.output))
            .collect();
        // A null group key marks a metadata-only leftover from the outer
        // join; those rows carry no readings and belong in no report.
        let out = df
            .clone()
            .lazy()
            .drop_nulls(Some(keys.clone()))
            .group_by(keys)
            .agg(aggs)
            .collect()?;
        Ok(out)
    }
}

// The max reductions over MDI, ratios and resets are defensive: those are
// constant within a group, and max tolerates a single distinct value.
pub static BILLING_SPEC: ReportSpec = ReportSpec {
    group_keys: &["SiteID", "SDO", "BillRef#", "Batch", "Date"],
    measures: &[
        m("kWh_Reading", Reduction::Min, "kWh_Reading_Start"),
        m("kWh_Reading", Reduction::Max, "kWh_Reading_End"),
        m("kWh_Units", Reduction::Sum, "kWh_Units"),
        m("kvarh_reading", Reduction::Min, "kvarh_reading_Start"),
        m("kvarh_reading", Reduction::Max, "kvarh_reading_End"),
        m("MDI", Reduction::Max, "MDI"),
        m("ct_ratio", Reduction::Max, "ct_ratio"),
        m("pt_ratio", Reduction::Max, "pt_ratio"),
        m("Max_MDI_Per_Year", Reduction::Max, "Max_MDI_Per_Year"),
        m("Max_MDI_Per_Month", Reduction::Max, "Max_MDI_Per_Month"),
        m("no_of_resets", Reduction::Max, "no_of_resets"),
    ],
};

pub static SDO_SPEC: ReportSpec = ReportSpec {
    group_keys: &["SiteID", "SDO", "BillRef#", "Batch", "Date", "Meter_Number"],
    measures: &[
        m("kWh_Reading", Reduction::Min, "kWh_Reading_Start"),
        m("kWh_Reading", Reduction::Max, "kWh_Reading_End"),
        m("kWh_Units", Reduction::Sum, "kWh_Units"),
        m("kvarh_reading", Reduction::Min, "kvarh_reading_Start"),
        m("kvarh_reading", Reduction::Max, "kvarh_reading_End"),
        m("MDI", Reduction::Max, "MDI"),
        m("ct_ratio", Reduction::Max, "ct_ratio"),
        m("pt_ratio", Reduction::Max, "pt_ratio"),
        m("Max_MDI_Per_Year", Reduction::Max, "Max_MDI_Per_Year"),
        m("Max_MDI_Per_Month", Reduction::Max, "Max_MDI_Per_Month"),
        m("no_of_resets", Reduction::Max, "no_of_resets"),
        m("peak_reading", Reduction::Max, "peak_reading"),
        m("off_peak_reading", Reduction::Max, "off_peak_reading"),
        m("bd_zy", Reduction::Max, "bd_zy"),
    ],
};

pub static INTERVAL_SPEC: ReportSpec = ReportSpec {
    group_keys: &[
        "SiteID",
        "SDO",
        "BillRef#",
        "Date",
        "Times",
        "Peak/OffPeak",
        "DISCO",
        "Circle",
        "Division",
        "SubDivision",
    ],
    measures: &[m("kWh_Units", Reduction::Sum, "kWh_Units")],
};

/// Per-site daily billing summary over the full historical dataset.
pub fn billing_report(enriched: &DataFrame) -> Result<DataFrame> {
    BILLING_SPEC.aggregate(enriched)
}

/// Billing summary broken down further by meter, with the peak/off-peak
/// split readings and the bd_zy flag carried through.
pub fn sdo_report(enriched: &DataFrame) -> Result<DataFrame> {
    SDO_SPEC.aggregate(enriched)
}

/// Half-hourly consumption for the current calendar month only. The other
/// two reports see the whole history; this one is windowed to rows dated on
/// or after the 1st of the month containing `today`.
pub fn interval_report(enriched: &DataFrame, today: NaiveDate) -> Result<DataFrame> {
    let month_start = today
        .with_day(1)
        .expect("the 1st of a month always exists")
        .and_hms_opt(0, 0, 0)
        .expect("midnight always exists");
    let windowed = enriched
        .clone()
        .lazy()
        .filter(col("Date").gt_eq(lit(month_start)))
        .collect()?;
    INTERVAL_SPEC.aggregate(&windowed)
}
