use ajked_reports::pipeline;
use ajked_reports::storage::LocalDirStorage;
use anyhow::Result;
use chrono::Local;

fn main() -> Result<()> {
    env_logger::init();

    println!("🚀 AJKED Meter Reading Reports");
    println!("{}", "=".repeat(60));

    let storage = LocalDirStorage::new("data");
    let today = Local::now().date_naive();

    let start = std::time::Instant::now();
    pipeline::generate_all_reports(&storage, today)?;

    println!("\n✅ All reports stored in {:?}", start.elapsed());
    Ok(())
}
