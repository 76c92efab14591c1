pub mod enrich;
pub mod loader;
pub mod persist;
pub mod pipeline;
pub mod reports;
pub mod schema;
pub mod storage;
pub mod timeutil;

pub use enrich::enrich;
pub use loader::DatasetLoader;
pub use persist::save_report;
pub use reports::{billing_report, interval_report, sdo_report};
pub use storage::{LocalDirStorage, Storage};
pub use timeutil::{ceil_to_half_hour, round_to_half_hour};
