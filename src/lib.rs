//! Jobpulse - Aggregation and scene-state core for the AI job postings dashboard
//!
//! Jobpulse turns a batch of raw job-posting rows into three month-keyed
//! aggregate tables and drives the dashboard's three linked views through a
//! deterministic pipeline: normalization → aggregation → timeline
//! materialization → scene selection → render command encoding.
//!
//! ## Modules
//!
//! - **Normalizer**: raw string rows to typed records
//! - **Aggregation Engine**: one fold pass, three keyed tables
//! - **Timeline Materializer**: gap-filled fixed-window sequences with
//!   peak/trough annotations
//! - **Scene State Machine**: which aggregate feeds which visual
//! - **Render Adapter**: plain-data commands for any charting layer

pub mod aggregate;
pub mod error;
pub mod normalizer;
pub mod present;
pub mod scene;
pub mod session;
pub mod timeline;
pub mod types;

pub use aggregate::Aggregator;
pub use error::DashboardError;
pub use normalizer::RecordNormalizer;
pub use present::{Producer, RenderCommand};
pub use scene::{top_titles, Scene, SceneMachine, SelectionState, UiEvent};
pub use session::{DashboardConfig, DashboardSession, DispatchOutcome, LoadReport};
pub use timeline::{materialize, MonthWindow, TimelineSource};
pub use types::{
    AggregateTables, MissingValuePolicy, MonthKey, NormalizedRecord, RawRecord, SceneView,
    TitleRanking,
};

/// Core version embedded in every render command.
pub const CORE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for render commands.
pub const PRODUCER_NAME: &str = "jobpulse";
