use chrono::{NaiveTime, Timelike};

/// Normalize a free-text meter reading time to a 30-minute boundary.
///
/// Accepts `HH:MM:SS` with or without a fractional-second part; anything
/// else (including empty or missing values) is dropped as `None` — the
/// upstream export is full of blank and garbage time cells and they must
/// not abort the run. The value is truncated to its 30-minute bucket and
/// bumped to the next boundary whenever any sub-bucket component is
/// nonzero, so an exact boundary passes through unchanged.
pub fn round_to_half_hour(raw: Option<&str>) -> Option<String> {
    let raw = raw?;
    if raw.trim().is_empty() {
        return None;
    }

    let t = NaiveTime::parse_from_str(raw, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .ok()?;

    let mut bucket = (t.minute() / 30) * 30;
    if t.minute() % 30 != 0 || t.second() > 0 || t.nanosecond() > 0 {
        bucket += 30;
    }

    // 23:45 rolls over to 00:00; only the time-of-day part is kept.
    let total = (t.hour() * 60 + bucket) % (24 * 60);
    Some(format!("{:02}:{:02}:00", total / 60, total % 60))
}

/// Advance a time to the next 30-minute boundary unconditionally, so an
/// exact multiple still rolls forward (`10:00:00` -> `10:30:00`). Not the
/// same as [`round_to_half_hour`], which leaves exact boundaries alone.
pub fn ceil_to_half_hour(t: NaiveTime) -> NaiveTime {
    let bucket = (t.minute() / 30 + 1) * 30;
    let total = (t.hour() * 60 + bucket) % (24 * 60);
    NaiveTime::from_hms_opt(total / 60, total % 60, 0).unwrap()
}
