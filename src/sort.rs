// ↕️ Sorter - reorder summary rows before charting
// Ordering only; rows are never added, removed or changed

use crate::aggregate::{GroupBy, SummaryRow};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortPolicy {
    CategoryAsc,
    InventoryAsc,
    InventoryDesc,
    Unsorted,
}

/// Reorder `rows` according to `policy`.
///
/// Inventory orderings use a stable sort, so equal totals keep their
/// relative input order.
pub fn sort_summary(mut rows: Vec<SummaryRow>, policy: SortPolicy) -> Vec<SummaryRow> {
    match policy {
        SortPolicy::CategoryAsc => rows.sort_by(|a, b| a.category.cmp(&b.category)),
        SortPolicy::InventoryAsc => rows.sort_by_key(|r| r.total_inventory),
        // Not `reverse()`: that would flip the order of ties
        SortPolicy::InventoryDesc => {
            rows.sort_by(|a, b| b.total_inventory.cmp(&a.total_inventory))
        }
        SortPolicy::Unsorted => {}
    }
    rows
}

// ============================================================================
// SORT SELECTOR
// ============================================================================

/// The four entries of the dashboard's "Sort by" selector.
///
/// Wire names are `frame_type_az`, `brand_az`, `inventory_low_high` and
/// `inventory_high_low`; the inventory options also accept the policy names
/// `inventory_asc` and `inventory_desc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOption {
    #[default]
    FrameTypeAz,
    BrandAz,
    #[serde(alias = "inventory_asc")]
    InventoryLowHigh,
    #[serde(alias = "inventory_desc")]
    InventoryHighLow,
}

impl SortOption {
    pub const ALL: [SortOption; 4] = [
        SortOption::FrameTypeAz,
        SortOption::BrandAz,
        SortOption::InventoryLowHigh,
        SortOption::InventoryHighLow,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SortOption::FrameTypeAz => "Frame Type (A-Z)",
            SortOption::BrandAz => "Brand Type (A-Z)",
            SortOption::InventoryLowHigh => "Inventory (Low to High)",
            SortOption::InventoryHighLow => "Inventory (High to Low)",
        }
    }

    /// Alphabetical options only apply to the chart of their own column;
    /// the other chart keeps aggregation order.
    pub fn policy_for(&self, group_by: GroupBy) -> SortPolicy {
        match (self, group_by) {
            (SortOption::FrameTypeAz, GroupBy::FrameType) => SortPolicy::CategoryAsc,
            (SortOption::BrandAz, GroupBy::Brand) => SortPolicy::CategoryAsc,
            (SortOption::FrameTypeAz, GroupBy::Brand) | (SortOption::BrandAz, GroupBy::FrameType) => {
                SortPolicy::Unsorted
            }
            (SortOption::InventoryLowHigh, _) => SortPolicy::InventoryAsc,
            (SortOption::InventoryHighLow, _) => SortPolicy::InventoryDesc,
        }
    }

    pub fn next(&self) -> Self {
        match self {
            SortOption::FrameTypeAz => SortOption::BrandAz,
            SortOption::BrandAz => SortOption::InventoryLowHigh,
            SortOption::InventoryLowHigh => SortOption::InventoryHighLow,
            SortOption::InventoryHighLow => SortOption::FrameTypeAz,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            SortOption::FrameTypeAz => SortOption::InventoryHighLow,
            SortOption::BrandAz => SortOption::FrameTypeAz,
            SortOption::InventoryLowHigh => SortOption::BrandAz,
            SortOption::InventoryHighLow => SortOption::InventoryLowHigh,
        }
    }
}
