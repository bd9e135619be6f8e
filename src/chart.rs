// 📈 Chart Builder - summary rows → bar chart description
// Pure data; the TUI and the HTTP API each render it their own way

use crate::aggregate::{GroupBy, SummaryRow};
use crate::dataset::InventoryTotal;
use serde::Serialize;

pub const VALUE_AXIS_LABEL: &str = "Total Inventory";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub category_axis_label: String,
    pub value_axis_label: String,
    pub title: String,
    /// Already in display order
    pub rows: Vec<SummaryRow>,
    pub color_by_category: bool,
}

impl ChartSpec {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Largest value, used to scale bars (0 for an empty chart)
    pub fn max_value(&self) -> InventoryTotal {
        self.rows
            .iter()
            .map(|r| r.total_inventory)
            .max()
            .unwrap_or(0)
            .max(0)
    }
}

/// Build a chart from rows the caller has already sorted.
pub fn build_chart(rows: Vec<SummaryRow>, axis_label: &str, title: &str) -> ChartSpec {
    ChartSpec {
        category_axis_label: axis_label.to_string(),
        value_axis_label: VALUE_AXIS_LABEL.to_string(),
        title: title.to_string(),
        rows,
        color_by_category: true,
    }
}

/// "Total Inventory by Frame Type" style chart for a grouping
pub fn chart_for(rows: Vec<SummaryRow>, group_by: GroupBy) -> ChartSpec {
    let label = group_by.label();
    build_chart(rows, label, &format!("Total Inventory by {}", label))
}

/// Same as [`chart_for`], titled as the filtered variant
pub fn filtered_chart_for(rows: Vec<SummaryRow>, group_by: GroupBy) -> ChartSpec {
    let label = group_by.label();
    build_chart(rows, label, &format!("Total Inventory by {} (Filtered)", label))
}

/// Plain-text rendering, one bar per line, used by `summary` mode
pub fn render_text(chart: &ChartSpec, width: usize) -> String {
    let mut out = format!("{}\n", chart.title);
    if chart.is_empty() {
        out.push_str("  (no data)\n");
        return out;
    }

    let label_width = chart
        .rows
        .iter()
        .map(|r| r.category.chars().count())
        .max()
        .unwrap_or(0);
    let max = chart.max_value();

    for row in &chart.rows {
        let bar_len = if max > 0 && row.total_inventory > 0 {
            ((row.total_inventory as f64 / max as f64) * width as f64).round() as usize
        } else {
            0
        };
        out.push_str(&format!(
            "  {:<label_width$} | {} {}\n",
            row.category,
            "█".repeat(bar_len),
            row.total_inventory,
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_chart_preserves_order() {
        let rows = vec![
            SummaryRow::new("Square", 5),
            SummaryRow::new("Round", 13),
            SummaryRow::new("Aviator", 13),
        ];

        let chart = build_chart(rows.clone(), "Frame Type", "Inventory");

        assert_eq!(chart.rows, rows);
        assert_eq!(chart.category_axis_label, "Frame Type");
        assert_eq!(chart.value_axis_label, "Total Inventory");
        assert!(chart.color_by_category);
    }

    #[test]
    fn test_chart_titles() {
        assert_eq!(chart_for(vec![], GroupBy::Brand).title, "Total Inventory by Brand");
        assert_eq!(
            filtered_chart_for(vec![], GroupBy::FrameType).title,
            "Total Inventory by Frame Type (Filtered)"
        );
    }

    #[test]
    fn test_empty_chart() {
        let chart = chart_for(vec![], GroupBy::FrameType);
        assert!(chart.is_empty());
        assert_eq!(chart.max_value(), 0);
        assert!(render_text(&chart, 20).contains("(no data)"));
    }

    #[test]
    fn test_render_text_scales_bars() {
        let chart = chart_for(
            vec![SummaryRow::new("Round", 10), SummaryRow::new("Square", 5)],
            GroupBy::FrameType,
        );

        let text = render_text(&chart, 10);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "Total Inventory by Frame Type");
        assert_eq!(lines[1].matches('█').count(), 10);
        assert_eq!(lines[2].matches('█').count(), 5);
    }
}
