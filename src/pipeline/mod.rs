// Resolution pipeline: extraction, redirect resolution, column detection,
// interval computation and orchestration

pub mod cache;
pub mod columns;
pub mod extract;
pub mod interval;
pub mod orchestrator;
pub mod preview;
pub mod resolver;

pub use cache::ResolutionCache;
pub use columns::ColumnDetector;
pub use extract::extract_timestamp;
pub use interval::{compute_interval, format_interval, IntervalResult};
pub use orchestrator::{PipelineOrchestrator, PipelineOutput, PipelineSummary};
pub use preview::Preview;
pub use resolver::{normalize_url, RedirectResolver, ResolutionOutcome};
