//! Output formatting utilities.

/// Prints the store listing header.
#[allow(clippy::print_literal)]
pub fn print_table_header() {
    println!("{:<16} {:>8} {}", "KEY", "BYTES", "VALUE");
    println!("{}", "-".repeat(80));
}

/// Formats one store entry as a table row.
pub fn format_table_row(key_hex: &str, len: usize, rendered: &str) -> String {
    format!(
        "{:<16} {:>8} {}",
        truncate(key_hex, 16),
        len,
        truncate(rendered, 54)
    )
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_cells_are_truncated() {
        let row = format_table_row(&"ab".repeat(32), 12, "short");
        assert!(row.starts_with("ababababababa... "));
        assert!(row.ends_with("short"));
    }
}
