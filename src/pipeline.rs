use crate::enrich::enrich;
use crate::loader::DatasetLoader;
use crate::persist::save_report;
use crate::reports::{billing_report, interval_report, sdo_report};
use crate::storage::Storage;
use anyhow::Result;
use chrono::NaiveDate;

// Fixed dataset identifiers and target folder; there is no configuration
// surface beyond these.
pub const SITE_MONTH_DATASET: &str = "datasets/site_month_readings.parquet";
pub const SITE_INFO_DATASET: &str = "datasets/site_info.parquet";
pub const MAX_MDI_DATASET: &str = "datasets/max_mdi.parquet";
pub const REPORT_FOLDER: &str = "reports";

pub const BILLING_FILE: &str = "billing_data.parquet";
pub const SDO_FILE: &str = "sdo_data.parquet";
pub const INTERVAL_FILE: &str = "interval_data.parquet";

/// One full batch run: load the three datasets, enrich once, and store the
/// three reports in order. The first unrecoverable error aborts the run;
/// reports after it are never attempted.
pub fn generate_all_reports<S: Storage>(storage: &S, today: NaiveDate) -> Result<()> {
    println!("\n📥 Loading datasets");
    let loader = DatasetLoader::new(storage);
    let site_month = loader.load_site_month_readings(SITE_MONTH_DATASET)?;
    let site_info = loader.load_site_info(SITE_INFO_DATASET)?;
    let max_mdi = loader.load_max_mdi(MAX_MDI_DATASET)?;
    println!(
        "  {} readings, {} sites, {} MDI records",
        site_month.height(),
        site_info.height(),
        max_mdi.height()
    );

    // The three reports share one read-only enriched frame; recomputing the
    // joins per report would triple the work for identical output.
    let enriched = enrich(site_month, site_info, max_mdi, today)?;
    println!("🔗 Enriched dataset: {} rows", enriched.height());

    println!("\n💾 Storing reports");
    let billing = billing_report(&enriched)?;
    save_report(storage, billing, REPORT_FOLDER, BILLING_FILE)?;

    let sdo = sdo_report(&enriched)?;
    save_report(storage, sdo, REPORT_FOLDER, SDO_FILE)?;

    let interval = interval_report(&enriched, today)?;
    save_report(storage, interval, REPORT_FOLDER, INTERVAL_FILE)?;

    Ok(())
}
