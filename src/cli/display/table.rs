//! Table builder wrapper around comfy-table for consistent list display.

use comfy_table::{presets, Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use console::style;

use crate::domain::models::Disposition;

/// Create a standard list table with the given headers.
///
/// Uses the NOTHING preset (no borders) for a clean CLI aesthetic.
pub fn list_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            headers
                .iter()
                .map(|h| Cell::new(h.to_uppercase()).set_alignment(CellAlignment::Left)),
        );
    table
}

/// Render the table to string with a count header.
pub fn render_list(entity_name: &str, table: Table, total: usize) -> String {
    if total == 0 {
        return format!("No {entity_name}s found.");
    }
    let count_line = format!(
        "{} {}:",
        style(total).bold(),
        if total == 1 {
            entity_name.to_string()
        } else {
            format!("{entity_name}s")
        }
    );
    format!("{count_line}\n{table}")
}

pub fn disposition_cell(disposition: Disposition) -> Cell {
    let cell = Cell::new(disposition.as_str());
    match disposition {
        Disposition::Passed => cell.fg(Color::Green).add_attribute(Attribute::Bold),
        Disposition::Problematic => cell.fg(Color::Red).add_attribute(Attribute::Bold),
        Disposition::Pending => cell.fg(Color::Yellow),
    }
}

/// Confidence as a percentage, dimmed below one half.
pub fn confidence_cell(confidence: f64) -> Cell {
    let cell = Cell::new(format!("{:.0}%", confidence * 100.0)).set_alignment(CellAlignment::Right);
    if confidence < 0.5 {
        cell.add_attribute(Attribute::Dim)
    } else {
        cell
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_list_counts() {
        let mut table = list_table(&["id", "status"]);
        table.add_row(vec![Cell::new("TC-1"), disposition_cell(Disposition::Passed)]);
        let rendered = render_list("case", table, 1);
        assert!(rendered.contains("case:"));
        assert!(rendered.contains("TC-1"));
        assert!(rendered.contains("ID"));

        assert_eq!(render_list("case", list_table(&["id"]), 0), "No cases found.");
    }
}
