// Eyewear Inventory Dashboard - Core Library
// Exposes all modules for use in CLI, TUI, API server, and tests

pub mod dataset;
pub mod aggregate;
pub mod sort;
pub mod chart;
pub mod gate;
pub mod assistant;
pub mod session;
pub mod config;

// Re-export commonly used types
pub use dataset::{InventoryRecord, InventoryTable, InventoryTotal, load_csv, shared_table};
pub use aggregate::{
    GroupBy, SummaryRow, Statistics,
    aggregate, filter_by_brands, distinct_brands,
};
pub use sort::{SortOption, SortPolicy, sort_summary};
pub use chart::{ChartSpec, build_chart, chart_for, filtered_chart_for};
pub use gate::{AccessGate, GateState, Secret, secrets_match};
pub use assistant::{
    AssistantError, GenerationRequest, HttpTextGenerator, QuestionAnswerer, TextGenerator,
    build_instructions, serialize_table,
};
pub use session::{
    DashboardView, Interaction, Outcome, SessionContext, SessionError, SessionState,
};
pub use config::{Config, ConfigError, LlmConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build the question answerer from config, if an API key is configured
pub fn answerer_from_config(config: &Config) -> Result<Option<QuestionAnswerer>, AssistantError> {
    match &config.llm {
        Some(llm) => {
            let generator = HttpTextGenerator::new(
                &llm.base_url,
                llm.api_key.clone(),
                &llm.model,
                llm.timeout,
            )?;
            Ok(Some(QuestionAnswerer::new(generator, llm.max_output_tokens)))
        }
        None => Ok(None),
    }
}

/// `RUST_LOG`-driven subscriber, `info` by default, logs to stderr
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
