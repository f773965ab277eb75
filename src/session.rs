//! Session orchestration
//!
//! `DashboardSession` is the session-scoped context that owns what used to
//! be global state: the aggregate tables, the scene machine, and the
//! configuration. Aggregation runs exactly once, on `load_rows`; every
//! subsequent event only re-reads the tables through the materializer or
//! the top-titles lookup. All reads are gated behind the dataset-ready
//! check, so default-initialized tables are never mistaken for a real
//! zero-activity dataset.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::aggregate::Aggregator;
use crate::error::DashboardError;
use crate::present::{present, Producer, RenderCommand};
use crate::scene::{top_titles, Scene, SceneMachine, SelectionState, Transition, UiEvent};
use crate::timeline::{materialize, MonthWindow};
use crate::types::{
    AggregateTables, MissingValuePolicy, MonthKey, PostingsView, RawRecord, SalaryTrendView,
    SceneView, TitleRanking,
};

/// Session configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Calendar window every timeline spans.
    pub window: MonthWindow,
    /// How missing numeric fields participate in averages.
    pub missing_policy: MissingValuePolicy,
    /// How many titles the top-titles view keeps.
    pub top_titles: usize,
}

impl DashboardConfig {
    pub const DEFAULT_TOP_TITLES: usize = 5;

    /// Jan 2024 through Apr 2025, the window of the source dataset.
    pub fn default_window() -> MonthWindow {
        let start = MonthKey::new(2024, 1).expect("literal month");
        let end = MonthKey::new(2025, 4).expect("literal month");
        MonthWindow::new(start, end).expect("start precedes end")
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            window: Self::default_window(),
            missing_policy: MissingValuePolicy::default(),
            top_titles: Self::DEFAULT_TOP_TITLES,
        }
    }
}

/// Dataset lifecycle. Reads are refused until the one-shot load completes.
#[derive(Debug, Clone)]
enum DatasetState {
    Pending,
    Ready(AggregateTables),
}

/// Summary of a dataset load, for diagnostics and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadReport {
    /// Rows handed to the loader.
    pub rows_seen: usize,
    /// Rows that survived normalization and were folded into the tables.
    pub records_aggregated: usize,
    /// Rows dropped for an unparseable posting date.
    pub records_skipped: usize,
    /// Distinct month keys with data.
    pub distinct_months: usize,
}

/// What a dispatched event produced.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// A recomputed view for the renderer.
    View(SceneView),
    /// Selection changed; the active view is unaffected.
    SelectionUpdated,
    /// Hover moved to this series index.
    Hover(usize),
    /// Slider moved to this 0-1 position.
    Slider(f64),
}

/// Session-scoped dashboard context.
pub struct DashboardSession {
    config: DashboardConfig,
    dataset: DatasetState,
    machine: SceneMachine,
    producer: Producer,
}

impl Default for DashboardSession {
    fn default() -> Self {
        Self::new(DashboardConfig::default())
    }
}

impl DashboardSession {
    pub fn new(config: DashboardConfig) -> Self {
        Self {
            config,
            dataset: DatasetState::Pending,
            machine: SceneMachine::new(),
            producer: Producer::new(Uuid::new_v4().to_string()),
        }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn selection(&self) -> &SelectionState {
        self.machine.state()
    }

    pub fn producer(&self) -> &Producer {
        &self.producer
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.dataset, DatasetState::Ready(_))
    }

    /// Load the dataset and build all three aggregate tables in one pass.
    ///
    /// This is the session's single aggregation point; navigation and
    /// selection events never re-run it.
    pub fn load_rows<I>(&mut self, rows: I) -> LoadReport
    where
        I: IntoIterator<Item = RawRecord>,
    {
        let rows: Vec<RawRecord> = rows.into_iter().collect();
        let rows_seen = rows.len();

        let tables = Aggregator::new(self.config.missing_policy).aggregate_rows(rows);
        let report = LoadReport {
            rows_seen,
            records_aggregated: rows_seen - tables.skipped_records as usize,
            records_skipped: tables.skipped_records as usize,
            distinct_months: tables.monthly.len(),
        };

        tracing::info!(
            rows = report.rows_seen,
            aggregated = report.records_aggregated,
            skipped = report.records_skipped,
            months = report.distinct_months,
            "dataset loaded"
        );

        self.dataset = DatasetState::Ready(tables);
        report
    }

    /// The aggregate tables, once built.
    pub fn tables(&self) -> Result<&AggregateTables, DashboardError> {
        match &self.dataset {
            DatasetState::Ready(tables) => Ok(tables),
            DatasetState::Pending => Err(DashboardError::DatasetNotReady),
        }
    }

    /// Count of rows dropped during the load, queryable for diagnostics.
    pub fn skipped_records(&self) -> Result<u32, DashboardError> {
        Ok(self.tables()?.skipped_records)
    }

    /// Apply one UI event.
    ///
    /// Month selections are validated against the configured window before
    /// any state mutation, so a rejected event leaves the scene/selection
    /// pair exactly as it was.
    pub fn dispatch(&mut self, event: UiEvent) -> Result<DispatchOutcome, DashboardError> {
        // Refuse every event until the dataset is ready; a recompute against
        // empty tables would be indistinguishable from real zero activity.
        self.tables()?;

        if let UiEvent::SelectMonth(key) = event {
            if !self.config.window.contains(key) {
                return Err(DashboardError::MonthOutOfWindow {
                    key,
                    start: self.config.window.start(),
                    end: self.config.window.end(),
                });
            }
        }

        match self.machine.apply(event) {
            Transition::Recompute(scene) => Ok(DispatchOutcome::View(self.view_for(scene)?)),
            Transition::StateOnly => Ok(DispatchOutcome::SelectionUpdated),
            Transition::Hover(index) => Ok(DispatchOutcome::Hover(index)),
            Transition::Slider(position) => Ok(DispatchOutcome::Slider(position)),
        }
    }

    /// Recompute the view for the active scene.
    pub fn current_view(&self) -> Result<SceneView, DashboardError> {
        self.view_for(self.machine.state().active_scene)
    }

    /// Render command for the active scene.
    pub fn render(&self) -> Result<RenderCommand, DashboardError> {
        Ok(present(&self.current_view()?, &self.producer))
    }

    fn view_for(&self, scene: Scene) -> Result<SceneView, DashboardError> {
        let tables = self.tables()?;
        Ok(match scene {
            Scene::Postings => SceneView::Postings(PostingsView {
                timeline: materialize(&tables.monthly, &self.config.window),
            }),
            Scene::SalaryTrend => SceneView::SalaryTrend(SalaryTrendView {
                timeline: materialize(&tables.salary, &self.config.window),
            }),
            Scene::TopTitles => {
                let ranking = match self.machine.state().selected_month {
                    Some(key) => top_titles(tables, key, self.config.top_titles),
                    None => TitleRanking::NoSelection,
                };
                SceneView::TopTitles(ranking)
            }
        })
    }
}
