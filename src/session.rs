// 🧭 Session - per-user state plus the interaction handlers
// The TUI and the HTTP server both drive the dashboard through `dispatch`

use crate::aggregate::{aggregate, distinct_brands, filter_by_brands, GroupBy, Statistics};
use crate::assistant::{AssistantError, QuestionAnswerer};
use crate::chart::{chart_for, filtered_chart_for, ChartSpec};
use crate::dataset::InventoryTable;
use crate::gate::{AccessGate, Secret};
use crate::sort::{sort_summary, SortOption};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct SessionState {
    pub gate: AccessGate,
    pub selected_brands: BTreeSet<String>,
    pub sort_option: SortOption,
}

impl SessionState {
    /// Locked, filtered to `default_brand`, first sort option
    pub fn new(secret: Arc<Secret>, default_brand: &str) -> Self {
        let mut selected_brands = BTreeSet::new();
        selected_brands.insert(default_brand.to_string());

        Self {
            gate: AccessGate::new(secret),
            selected_brands,
            sort_option: SortOption::default(),
        }
    }

    pub fn is_unlocked(&self) -> bool {
        self.gate.is_unlocked()
    }

    pub fn dispatch(
        &mut self,
        ctx: &SessionContext<'_>,
        interaction: Interaction,
    ) -> Result<Outcome, SessionError> {
        match interaction {
            Interaction::SubmitCredential(credential) => Ok(if self.gate.check(credential) {
                Outcome::Unlocked
            } else {
                Outcome::CredentialRejected
            }),
            _ if !self.is_unlocked() => Err(SessionError::Locked),
            Interaction::SelectSort(option) => {
                self.sort_option = option;
                Ok(self.view(ctx.table))
            }
            Interaction::SelectBrands(brands) => {
                self.selected_brands = brands;
                Ok(self.view(ctx.table))
            }
            Interaction::ToggleBrand(brand) => {
                if !self.selected_brands.remove(&brand) {
                    self.selected_brands.insert(brand);
                }
                Ok(self.view(ctx.table))
            }
            Interaction::View => Ok(self.view(ctx.table)),
            Interaction::Ask(question) => {
                let answerer = ctx.answerer.ok_or(SessionError::AssistantUnavailable)?;
                let answer = answerer.answer(ctx.table, &question)?;
                Ok(Outcome::Answer(answer))
            }
        }
    }

    fn view(&self, table: &InventoryTable) -> Outcome {
        Outcome::Dashboard(Box::new(DashboardView::build(table, self)))
    }
}

/// Shared, read-only collaborators a session works against
#[derive(Clone, Copy)]
pub struct SessionContext<'a> {
    pub table: &'a InventoryTable,
    pub answerer: Option<&'a QuestionAnswerer>,
}

#[derive(Debug, Clone)]
pub enum Interaction {
    SubmitCredential(String),
    SelectSort(SortOption),
    SelectBrands(BTreeSet<String>),
    ToggleBrand(String),
    Ask(String),
    View,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Unlocked,
    /// Shown to the user as "incorrect password"
    CredentialRejected,
    Dashboard(Box<DashboardView>),
    Answer(String),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session is locked")]
    Locked,

    #[error("question answering is not configured")]
    AssistantUnavailable,

    #[error(transparent)]
    Assistant(#[from] AssistantError),
}

// ============================================================================
// DASHBOARD VIEW
// ============================================================================

/// Everything the dashboard shows for one state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub sort_option: SortOption,
    pub sort_label: &'static str,
    pub brand_options: Vec<String>,
    pub selected_brands: Vec<String>,
    pub filtered_chart: ChartSpec,
    pub frame_type_chart: ChartSpec,
    pub brand_chart: ChartSpec,
    pub statistics: Statistics,
}

impl DashboardView {
    pub fn build(table: &InventoryTable, state: &SessionState) -> Self {
        let option = state.sort_option;

        let filtered = filter_by_brands(table, &state.selected_brands);
        let filtered_rows = sort_summary(
            aggregate(&filtered, GroupBy::FrameType),
            option.policy_for(GroupBy::FrameType),
        );

        let frame_rows = sort_summary(
            aggregate(table, GroupBy::FrameType),
            option.policy_for(GroupBy::FrameType),
        );

        let brand_rows = sort_summary(
            aggregate(table, GroupBy::Brand),
            option.policy_for(GroupBy::Brand),
        );

        Self {
            sort_option: option,
            sort_label: option.label(),
            brand_options: distinct_brands(table),
            selected_brands: state.selected_brands.iter().cloned().collect(),
            filtered_chart: filtered_chart_for(filtered_rows, GroupBy::FrameType),
            frame_type_chart: chart_for(frame_rows, GroupBy::FrameType),
            brand_chart: chart_for(brand_rows, GroupBy::Brand),
            statistics: Statistics::compute(table),
        }
    }
}
