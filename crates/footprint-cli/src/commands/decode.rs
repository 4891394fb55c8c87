//! Decode command implementation.

use footprint_canonical::decode_value;

use crate::input::read_text;

pub fn run(input: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let text = read_text(input)?;
    let hex_digits: String = text.split_whitespace().collect();
    let bytes = hex::decode(&hex_digits).map_err(|e| format!("Invalid hex: {}", e))?;
    let value = decode_value(&bytes).map_err(|e| format!("Decoding failed: {}", e))?;
    println!("{}", value);
    Ok(())
}
