//! Hash command implementation.

use footprint_canonical::{encode_value, hash_bytes};

use crate::input::read_json;

pub fn run(input: Option<String>, b64: bool) -> Result<(), Box<dyn std::error::Error>> {
    let value = read_json(input)?;
    let bytes = encode_value(&value).map_err(|e| format!("Encoding failed: {}", e))?;
    let digest = hash_bytes(&bytes);
    if b64 {
        println!("{}", digest.b64());
    } else {
        println!("{}", digest.hex());
    }
    Ok(())
}
