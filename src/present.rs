//! Render adapter
//!
//! This module is the outward boundary of the core: a pure function from a
//! computed scene view to a `RenderCommand`, a language-agnostic description
//! (series points, axis labels, peak/trough annotation markers, a
//! hover-lookup index) that a charting library consumes. Nothing here
//! touches selection state or the aggregate tables.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::{MonthKey, SceneView, TitleRanking};
use crate::{CORE_VERSION, PRODUCER_NAME};

/// Render command schema version.
pub const RENDER_SCHEMA_VERSION: &str = "render.command.v1";

/// Producer metadata stamped into every render command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Producer {
    pub name: String,
    pub version: String,
    /// Session instance that produced the command.
    pub session_id: String,
}

impl Producer {
    pub fn new(session_id: String) -> Self {
        Self {
            name: PRODUCER_NAME.to_string(),
            version: CORE_VERSION.to_string(),
            session_id,
        }
    }
}

/// Which visual the renderer should draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewKind {
    /// Vertical bars, one per month (scene 1).
    MonthlyBars,
    /// Time line with dots (scene 2).
    SalaryLine,
    /// Horizontal bars, one per title (scene 3).
    TitleBars,
}

/// One drawable point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    /// Categorical axis label (`Mon YYYY` or a job title).
    pub label: String,
    /// Time axis position, when the x-axis is temporal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    pub value: f64,
    /// Whether the mark is drawn. Zero-salary months stay in the series for
    /// scale computation but are excluded from the line path.
    pub draw: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationKind {
    Peak,
    Trough,
}

/// Peak/trough marker anchored to a series index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub kind: AnnotationKind,
    pub index: usize,
    pub label: String,
    pub value: f64,
}

/// Preformatted tooltip lines for one series index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoverEntry {
    pub index: usize,
    pub lines: Vec<String>,
}

/// Why a command carries no drawable series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum EmptyReason {
    /// Valid month inside the window, zero title entries.
    NoDataForMonth { key: MonthKey },
    /// Scene 3 is active but no month has been selected.
    NoMonthSelected,
}

/// Renderer-consumable description of one scene view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderCommand {
    pub schema_version: String,
    pub kind: ViewKind,
    pub producer: Producer,
    pub series: Vec<SeriesPoint>,
    pub annotations: Vec<Annotation>,
    pub hover: Vec<HoverEntry>,
    /// Y-scale domain maximum over the full series, zeros included. Scale
    /// headroom is the renderer's concern.
    pub y_max: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub empty: Option<EmptyReason>,
}

/// Encode a computed scene view into a render command. Pure.
pub fn present(view: &SceneView, producer: &Producer) -> RenderCommand {
    match view {
        SceneView::Postings(postings) => {
            let timeline = &postings.timeline;
            let series = timeline
                .points
                .iter()
                .map(|p| SeriesPoint {
                    label: p.label.clone(),
                    date: Some(p.date),
                    value: f64::from(p.count),
                    draw: true,
                })
                .collect();

            let annotations = vec![
                Annotation {
                    kind: AnnotationKind::Peak,
                    index: timeline.peak,
                    label: format!("Peak: {} jobs", timeline.peak_point().count),
                    value: f64::from(timeline.peak_point().count),
                },
                Annotation {
                    kind: AnnotationKind::Trough,
                    index: timeline.trough,
                    label: format!("Trough: {} jobs", timeline.trough_point().count),
                    value: f64::from(timeline.trough_point().count),
                },
            ];

            let hover = timeline
                .points
                .iter()
                .enumerate()
                .map(|(index, p)| HoverEntry {
                    index,
                    lines: vec![
                        p.label.clone(),
                        format!("Job Postings: {}", p.count),
                        format!("Average Salary: {}", format_usd(p.avg_salary)),
                        format!("Average Experience: {:.1} years", p.avg_experience),
                        format!("Average Benefits Score: {:.1}", p.avg_benefits),
                    ],
                })
                .collect();

            RenderCommand {
                schema_version: RENDER_SCHEMA_VERSION.to_string(),
                kind: ViewKind::MonthlyBars,
                producer: producer.clone(),
                series,
                annotations,
                hover,
                y_max: f64::from(timeline.max_count()),
                empty: None,
            }
        }

        SceneView::SalaryTrend(trend) => {
            let timeline = &trend.timeline;
            let series = timeline
                .points
                .iter()
                .map(|p| SeriesPoint {
                    label: p.label.clone(),
                    date: Some(p.date),
                    value: p.avg_salary,
                    draw: p.avg_salary > 0.0,
                })
                .collect();

            let hover = timeline
                .points
                .iter()
                .enumerate()
                .map(|(index, p)| HoverEntry {
                    index,
                    lines: vec![
                        format!("{}/{}", p.key.month(), p.key.year()),
                        format!("Average Salary: {}", format_usd(p.avg_salary)),
                    ],
                })
                .collect();

            RenderCommand {
                schema_version: RENDER_SCHEMA_VERSION.to_string(),
                kind: ViewKind::SalaryLine,
                producer: producer.clone(),
                series,
                annotations: Vec::new(),
                hover,
                y_max: trend.y_domain_max(),
                empty: None,
            }
        }

        SceneView::TopTitles(ranking) => match ranking {
            TitleRanking::Ranked { titles, .. } => {
                let series = titles
                    .iter()
                    .map(|t| SeriesPoint {
                        label: t.title.clone(),
                        date: None,
                        value: f64::from(t.count),
                        draw: true,
                    })
                    .collect();

                let hover = titles
                    .iter()
                    .enumerate()
                    .map(|(index, t)| HoverEntry {
                        index,
                        lines: vec![t.title.clone(), format!("Number of Jobs: {}", t.count)],
                    })
                    .collect();

                let y_max = titles.iter().map(|t| f64::from(t.count)).fold(0.0, f64::max);

                RenderCommand {
                    schema_version: RENDER_SCHEMA_VERSION.to_string(),
                    kind: ViewKind::TitleBars,
                    producer: producer.clone(),
                    series,
                    annotations: Vec::new(),
                    hover,
                    y_max,
                    empty: None,
                }
            }
            TitleRanking::NoData { key } => empty_command(
                ViewKind::TitleBars,
                producer,
                EmptyReason::NoDataForMonth { key: *key },
            ),
            TitleRanking::NoSelection => {
                empty_command(ViewKind::TitleBars, producer, EmptyReason::NoMonthSelected)
            }
        },
    }
}

fn empty_command(kind: ViewKind, producer: &Producer, reason: EmptyReason) -> RenderCommand {
    RenderCommand {
        schema_version: RENDER_SCHEMA_VERSION.to_string(),
        kind,
        producer: producer.clone(),
        series: Vec::new(),
        annotations: Vec::new(),
        hover: Vec::new(),
        y_max: 0.0,
        empty: Some(reason),
    }
}

/// `$1,234,567` formatting, rounded to whole dollars.
fn format_usd(value: f64) -> String {
    let rounded = value.round() as u64;
    let digits = rounded.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    format!("${out}")
}
