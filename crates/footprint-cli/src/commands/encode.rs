//! Encode command implementation.

use footprint_canonical::encode_value;

use crate::input::read_json;

pub fn run(input: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let value = read_json(input)?;
    let bytes = encode_value(&value).map_err(|e| format!("Encoding failed: {}", e))?;
    println!("{}", hex::encode(bytes));
    Ok(())
}
