//! Inspect command implementation.

use footprint_cache::{ReadMode, StoreReader};
use footprint_canonical::decode_value;
use tracing::debug;

use crate::output::{format_table_row, print_table_header};

pub fn run(store: String, strict: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mode = if strict {
        ReadMode::Strict
    } else {
        ReadMode::Permissive
    };
    let mut reader = StoreReader::open(&store, mode)
        .map_err(|e| format!("Failed to open store {}: {}", store, e))?;

    print_table_header();
    let mut count = 0usize;
    while let Some(record) = reader.read_record()? {
        let rendered = match decode_value(&record.footprint) {
            Ok(value) => value.to_string(),
            Err(e) => format!("<{}>", e),
        };
        println!(
            "{}",
            format_table_row(&hex::encode(record.key), record.footprint.len(), &rendered)
        );
        count += 1;
    }
    debug!(store = %store, position = reader.position(), "finished reading store");
    println!("{} records", count);
    Ok(())
}
