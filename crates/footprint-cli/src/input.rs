//! Input helpers shared by commands.

use std::io::{self, Read};

use footprint_canonical::Value;

use crate::json::json_to_value;

/// Reads all of `input`, or stdin when no path is given.
pub fn read_text(input: Option<String>) -> Result<String, Box<dyn std::error::Error>> {
    match input {
        Some(path) => Ok(std::fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read file {}: {}", path, e))?),
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer)
        }
    }
}

/// Reads a JSON document and maps it onto the value model.
pub fn read_json(input: Option<String>) -> Result<Value, Box<dyn std::error::Error>> {
    let text = read_text(input)?;
    let json: serde_json::Value =
        serde_json::from_str(&text).map_err(|e| format!("Invalid JSON: {}", e))?;
    Ok(json_to_value(&json))
}
