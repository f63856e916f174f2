//! CSV output of result records
//!
//! One row per completed customer, timestamps rendered as `HH:MM` through a
//! [`WallClock`]. Column order is fixed:
//!
//! ```text
//! customer,enter_time,shopping_time,start_queue,checkout_start,paying_time,packing_time,leave_time,checkout_choice_regular
//! ```

use crate::core::time::WallClock;
use crate::models::record::ResultRecord;
use serde::Serialize;
use std::io;
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Errors writing simulation output
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Header row, in column order
pub const CSV_HEADER: [&str; 9] = [
    "customer",
    "enter_time",
    "shopping_time",
    "start_queue",
    "checkout_start",
    "paying_time",
    "packing_time",
    "leave_time",
    "checkout_choice_regular",
];

#[derive(Serialize)]
struct CsvRow<'a> {
    customer: &'a str,
    enter_time: String,
    shopping_time: String,
    start_queue: String,
    checkout_start: String,
    paying_time: String,
    packing_time: String,
    leave_time: String,
    checkout_choice_regular: &'static str,
}

impl<'a> CsvRow<'a> {
    fn new(record: &'a ResultRecord, clock: &WallClock) -> Self {
        Self {
            customer: &record.customer,
            enter_time: clock.format(record.enter_time),
            shopping_time: clock.format(record.shopping_time),
            start_queue: clock.format(record.start_queue),
            checkout_start: clock.format(record.checkout_start),
            paying_time: clock.format(record.paying_time),
            packing_time: clock.format(record.packing_time),
            leave_time: clock.format(record.leave_time),
            checkout_choice_regular: if record.checkout_choice_regular {
                "True"
            } else {
                "False"
            },
        }
    }
}

/// Write `records` as CSV (header included) to `writer`
///
/// # Example
/// ```
/// use checkout_sim_core::output::write_records;
/// use checkout_sim_core::WallClock;
///
/// let mut buf = Vec::new();
/// write_records(&mut buf, &[], &WallClock::default()).unwrap();
/// assert!(String::from_utf8(buf).unwrap().starts_with("customer,enter_time,"));
/// ```
pub fn write_records<W: io::Write>(
    writer: W,
    records: &[ResultRecord],
    clock: &WallClock,
) -> Result<(), OutputError> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    // Written explicitly so an empty run still gets a header row
    csv_writer.write_record(CSV_HEADER)?;
    for record in records {
        csv_writer.serialize(CsvRow::new(record, clock))?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write `records` to a CSV file at `path`, replacing any existing file
pub fn write_records_to_path(
    path: &Path,
    records: &[ResultRecord],
    clock: &WallClock,
) -> Result<(), OutputError> {
    let file = std::fs::File::create(path)?;
    write_records(io::BufWriter::new(file), records, clock)?;
    info!(path = %path.display(), rows = records.len(), "CSV file created");
    Ok(())
}
