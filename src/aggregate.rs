// 📊 Aggregator - group inventory by brand or frame type
// Also hosts the brand filter and the headline statistics

use crate::dataset::{InventoryRecord, InventoryTable, InventoryTotal};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ============================================================================
// GROUPING
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    Brand,
    FrameType,
}

impl GroupBy {
    /// Column header as it appears in the source file
    pub fn label(&self) -> &'static str {
        match self {
            GroupBy::Brand => "Brand",
            GroupBy::FrameType => "Frame Type",
        }
    }

    fn key<'a>(&self, record: &'a InventoryRecord) -> &'a str {
        match self {
            GroupBy::Brand => &record.brand,
            GroupBy::FrameType => &record.frame_type,
        }
    }
}

/// One aggregated (category, total) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub category: String,
    pub total_inventory: InventoryTotal,
}

impl SummaryRow {
    pub fn new(category: &str, total_inventory: InventoryTotal) -> Self {
        Self {
            category: category.to_string(),
            total_inventory,
        }
    }
}

/// Sum `inventory_count` per distinct category value.
///
/// Rows come out in order of first appearance. Empty category values form
/// their own group; zero and negative totals are kept.
pub fn aggregate(table: &InventoryTable, group_by: GroupBy) -> Vec<SummaryRow> {
    let mut totals: IndexMap<&str, InventoryTotal> = IndexMap::new();

    for record in table {
        *totals.entry(group_by.key(record)).or_insert(0) +=
            InventoryTotal::from(record.inventory_count);
    }

    totals
        .into_iter()
        .map(|(category, total)| SummaryRow::new(category, total))
        .collect()
}

// ============================================================================
// FILTER
// ============================================================================

/// Keep exactly the records whose brand is in `allowed`.
/// An empty set yields an empty table.
pub fn filter_by_brands(table: &InventoryTable, allowed: &BTreeSet<String>) -> InventoryTable {
    table
        .iter()
        .filter(|record| allowed.contains(&record.brand))
        .cloned()
        .collect()
}

/// Distinct brands in order of first appearance (filter options)
pub fn distinct_brands(table: &InventoryTable) -> Vec<String> {
    let mut seen: IndexMap<&str, ()> = IndexMap::new();
    for record in table {
        seen.entry(record.brand.as_str()).or_insert(());
    }
    seen.into_keys().map(str::to_string).collect()
}

// ============================================================================
// STATISTICS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statistics {
    pub total_inventory: InventoryTotal,
    /// None when the table is empty
    pub average_price: Option<f64>,
    /// Distinct non-empty brands
    pub brand_count: usize,
}

impl Statistics {
    pub fn compute(table: &InventoryTable) -> Self {
        let average_price = if table.is_empty() {
            None
        } else {
            let sum: f64 = table.iter().map(|r| r.price).sum();
            Some(sum / table.len() as f64)
        };

        let brand_count = table
            .iter()
            .map(|r| r.brand.as_str())
            .filter(|brand| !brand.is_empty())
            .collect::<BTreeSet<_>>()
            .len();

        Self {
            total_inventory: table.total_inventory(),
            average_price,
            brand_count,
        }
    }

    pub fn average_price_display(&self) -> String {
        match self.average_price {
            Some(avg) => format!("${:.2}", avg),
            None => "-".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> InventoryTable {
        InventoryTable::new(vec![
            InventoryRecord::new("Acme", "Round", 10, 50.0),
            InventoryRecord::new("Acme", "Square", 5, 60.0),
            InventoryRecord::new("Zeta", "Round", 3, 40.0),
        ])
    }

    fn brands(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn summary_total(rows: &[SummaryRow]) -> InventoryTotal {
        rows.iter().map(|r| r.total_inventory).sum()
    }

    #[test]
    fn test_aggregate_by_frame_type() {
        let rows = aggregate(&sample_table(), GroupBy::FrameType);

        assert_eq!(
            rows,
            vec![SummaryRow::new("Round", 13), SummaryRow::new("Square", 5)]
        );
    }

    #[test]
    fn test_aggregate_by_brand() {
        let rows = aggregate(&sample_table(), GroupBy::Brand);

        assert_eq!(
            rows,
            vec![SummaryRow::new("Acme", 15), SummaryRow::new("Zeta", 3)]
        );
    }

    #[test]
    fn test_aggregate_conserves_total_with_odd_rows() {
        let table = InventoryTable::new(vec![
            InventoryRecord::new("", "Round", 7, 10.0),
            InventoryRecord::new("Acme", "", 0, 10.0),
            InventoryRecord::new("Acme", "Round", -2, 10.0),
            InventoryRecord::new("", "Cat Eye", 4, 10.0),
        ]);

        for group_by in [GroupBy::Brand, GroupBy::FrameType] {
            let rows = aggregate(&table, group_by);
            assert_eq!(summary_total(&rows), table.total_inventory());
        }

        // Empty brand is its own bucket, zero/negative totals survive
        let by_brand = aggregate(&table, GroupBy::Brand);
        assert_eq!(by_brand, vec![SummaryRow::new("", 11), SummaryRow::new("Acme", -2)]);

        let by_frame = aggregate(&table, GroupBy::FrameType);
        assert!(by_frame.contains(&SummaryRow::new("", 0)));
    }

    #[test]
    fn test_aggregate_near_i64_limits() {
        let table = InventoryTable::new(vec![
            InventoryRecord::new("Acme", "Round", i64::MAX, 10.0),
            InventoryRecord::new("Acme", "Round", 1, 10.0),
            InventoryRecord::new("Zeta", "Square", i64::MIN, 10.0),
            InventoryRecord::new("Zeta", "Square", -1, 10.0),
        ]);

        let by_brand = aggregate(&table, GroupBy::Brand);
        assert_eq!(
            by_brand,
            vec![
                SummaryRow::new("Acme", i128::from(i64::MAX) + 1),
                SummaryRow::new("Zeta", i128::from(i64::MIN) - 1),
            ]
        );
        assert_eq!(summary_total(&by_brand), table.total_inventory());
        assert_eq!(Statistics::compute(&table).total_inventory, 0);
    }

    #[test]
    fn test_aggregate_is_deterministic() {
        let table = sample_table();
        assert_eq!(
            aggregate(&table, GroupBy::Brand),
            aggregate(&table, GroupBy::Brand)
        );
    }

    #[test]
    fn test_aggregate_empty_table() {
        assert!(aggregate(&InventoryTable::default(), GroupBy::Brand).is_empty());
    }

    #[test]
    fn test_filter_then_aggregate() {
        let filtered = filter_by_brands(&sample_table(), &brands(&["Acme"]));
        let rows = aggregate(&filtered, GroupBy::FrameType);

        assert_eq!(
            rows,
            vec![SummaryRow::new("Round", 10), SummaryRow::new("Square", 5)]
        );
        assert_eq!(summary_total(&rows), filtered.total_inventory());
    }

    #[test]
    fn test_filter_with_all_brands_keeps_everything() {
        let table = sample_table();
        let all: BTreeSet<String> = distinct_brands(&table).into_iter().collect();

        assert_eq!(filter_by_brands(&table, &all), table);
    }

    #[test]
    fn test_filter_with_empty_set_is_empty() {
        assert!(filter_by_brands(&sample_table(), &BTreeSet::new()).is_empty());
    }

    #[test]
    fn test_filter_ignores_unknown_brands() {
        let table = sample_table();

        assert!(filter_by_brands(&table, &brands(&["Nope"])).is_empty());

        let filtered = filter_by_brands(&table, &brands(&["Nope", "Zeta"]));
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered.records()[0].brand, "Zeta");
    }

    #[test]
    fn test_statistics() {
        let stats = Statistics::compute(&sample_table());

        assert_eq!(stats.total_inventory, 18);
        assert_eq!(stats.average_price_display(), "$50.00");
        assert_eq!(stats.brand_count, 2);
    }

    #[test]
    fn test_statistics_empty_table() {
        let stats = Statistics::compute(&InventoryTable::default());

        assert_eq!(stats.total_inventory, 0);
        assert_eq!(stats.average_price, None);
        assert_eq!(stats.brand_count, 0);
    }

    #[test]
    fn test_brand_count_ignores_empty_brand() {
        let table = InventoryTable::new(vec![
            InventoryRecord::new("", "Round", 1, 10.0),
            InventoryRecord::new("Acme", "Round", 2, 10.0),
            InventoryRecord::new("", "Square", 3, 10.0),
        ]);

        let stats = Statistics::compute(&table);
        assert_eq!(stats.brand_count, 1);
        // Still part of the totals
        assert_eq!(stats.total_inventory, 6);
    }
}
