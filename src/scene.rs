//! Scene navigation state machine
//!
//! The dashboard has three scenes; which aggregate feeds which visual is
//! decided here. The machine owns the selection state (active scene plus
//! selected month), mutates it only through explicit UI events, and reports
//! which view must be recomputed after each event. Aggregation itself is
//! never re-triggered by navigation.

use serde::{Deserialize, Serialize};

use crate::types::{AggregateTables, MonthKey, TitleCount, TitleRanking};

/// The three dashboard scenes, numbered 1-3 in the navigation bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scene {
    /// Scene 1: postings over time (monthly statistics).
    Postings,
    /// Scene 2: salary trend (salary series).
    SalaryTrend,
    /// Scene 3: top job titles for the selected month.
    TopTitles,
}

impl Scene {
    pub fn number(&self) -> u8 {
        match self {
            Scene::Postings => 1,
            Scene::SalaryTrend => 2,
            Scene::TopTitles => 3,
        }
    }

    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Scene::Postings),
            2 => Some(Scene::SalaryTrend),
            3 => Some(Scene::TopTitles),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Scene::Postings => "postings",
            Scene::SalaryTrend => "salary_trend",
            Scene::TopTitles => "top_titles",
        }
    }
}

/// The paired selection fields. Never observable mid-transition: the machine
/// updates both under one `&mut` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionState {
    pub active_scene: Scene,
    pub selected_month: Option<MonthKey>,
}

impl Default for SelectionState {
    fn default() -> Self {
        Self {
            active_scene: Scene::Postings,
            selected_month: None,
        }
    }
}

/// User interaction events reported by the renderer. These are the only
/// mutators of selection state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "event", content = "value")]
pub enum UiEvent {
    SwitchScene(Scene),
    SelectMonth(MonthKey),
    HoverAt(usize),
    DragSlider(f64),
}

/// What the session must do after an event is applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transition {
    /// Recompute and re-present the view for this scene.
    Recompute(Scene),
    /// Selection state changed but the active view is unaffected.
    StateOnly,
    /// Hover moved; the renderer resolves it against its hover index.
    Hover(usize),
    /// Slider dragged; position is a 0-1 fraction of the time axis.
    Slider(f64),
}

/// The scene/selection state machine.
///
/// Starts in scene 1 with no month selected; runs for the session lifetime,
/// no terminal state. Every scene is reachable from every scene.
#[derive(Debug, Clone, Default)]
pub struct SceneMachine {
    state: SelectionState,
}

impl SceneMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    /// Apply one event and report the required follow-up.
    ///
    /// Scene switches always recompute the target scene. Month selection is
    /// lazy: it recomputes only while the top-titles scene is active, since
    /// the other scenes do not depend on the selected month.
    pub fn apply(&mut self, event: UiEvent) -> Transition {
        match event {
            UiEvent::SwitchScene(scene) => {
                self.state.active_scene = scene;
                Transition::Recompute(scene)
            }
            UiEvent::SelectMonth(key) => {
                self.state.selected_month = Some(key);
                if self.state.active_scene == Scene::TopTitles {
                    Transition::Recompute(Scene::TopTitles)
                } else {
                    Transition::StateOnly
                }
            }
            UiEvent::HoverAt(index) => Transition::Hover(index),
            UiEvent::DragSlider(position) => Transition::Slider(position),
        }
    }
}

/// Pure read of the title-frequency table for one month.
///
/// Sorts descending by count, breaks ties alphabetically by title so the
/// ranking is deterministic, and truncates to `limit`. A key without
/// entries yields the explicit `NoData` variant, never an empty chart or a
/// fault.
pub fn top_titles(tables: &AggregateTables, key: MonthKey, limit: usize) -> TitleRanking {
    let counts = match tables.titles.get(&key) {
        Some(counts) if !counts.is_empty() => counts,
        _ => return TitleRanking::NoData { key },
    };

    let mut titles: Vec<TitleCount> = counts
        .iter()
        .map(|(title, count)| TitleCount {
            title: title.clone(),
            count: *count,
        })
        .collect();
    titles.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.title.cmp(&b.title)));
    titles.truncate(limit);

    TitleRanking::Ranked { key, titles }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Aggregator;
    use crate::types::NormalizedRecord;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn key(s: &str) -> MonthKey {
        s.parse().unwrap()
    }

    fn march_tables(title_counts: &[(&str, u32)]) -> AggregateTables {
        let records = title_counts.iter().flat_map(|(title, count)| {
            (0..*count).map(move |i| NormalizedRecord {
                posting_date: NaiveDate::from_ymd_opt(2024, 3, 1 + i % 28).unwrap(),
                salary_usd: Some(100_000.0),
                years_experience: None,
                benefits_score: None,
                job_title: title.to_string(),
            })
        });
        Aggregator::default().aggregate(records.collect::<Vec<_>>())
    }

    #[test]
    fn initial_state_is_scene_one_with_no_selection() {
        let machine = SceneMachine::new();
        assert_eq!(machine.state().active_scene, Scene::Postings);
        assert_eq!(machine.state().selected_month, None);
    }

    #[test]
    fn any_scene_is_reachable_from_any_scene() {
        let scenes = [Scene::Postings, Scene::SalaryTrend, Scene::TopTitles];
        for from in scenes {
            for to in scenes {
                let mut machine = SceneMachine::new();
                machine.apply(UiEvent::SwitchScene(from));
                let transition = machine.apply(UiEvent::SwitchScene(to));
                assert_eq!(transition, Transition::Recompute(to));
                assert_eq!(machine.state().active_scene, to);
            }
        }
    }

    #[test]
    fn month_selection_is_lazy_outside_scene_three() {
        let mut machine = SceneMachine::new();

        let transition = machine.apply(UiEvent::SelectMonth(key("2024-03")));
        assert_eq!(transition, Transition::StateOnly);
        assert_eq!(machine.state().selected_month, Some(key("2024-03")));

        machine.apply(UiEvent::SwitchScene(Scene::SalaryTrend));
        let transition = machine.apply(UiEvent::SelectMonth(key("2024-04")));
        assert_eq!(transition, Transition::StateOnly);
    }

    #[test]
    fn month_selection_recomputes_scene_three() {
        let mut machine = SceneMachine::new();
        machine.apply(UiEvent::SwitchScene(Scene::TopTitles));

        let transition = machine.apply(UiEvent::SelectMonth(key("2024-03")));
        assert_eq!(transition, Transition::Recompute(Scene::TopTitles));
        assert_eq!(machine.state().selected_month, Some(key("2024-03")));
    }

    #[test]
    fn hover_and_drag_leave_selection_untouched() {
        let mut machine = SceneMachine::new();
        machine.apply(UiEvent::SelectMonth(key("2024-03")));
        let before = *machine.state();

        assert_eq!(machine.apply(UiEvent::HoverAt(7)), Transition::Hover(7));
        assert_eq!(
            machine.apply(UiEvent::DragSlider(0.25)),
            Transition::Slider(0.25)
        );
        assert_eq!(*machine.state(), before);
    }

    #[test]
    fn scene_numbers_roundtrip() {
        for n in 1..=3 {
            assert_eq!(Scene::from_number(n).unwrap().number(), n);
        }
        assert_eq!(Scene::from_number(0), None);
        assert_eq!(Scene::from_number(4), None);
    }

    #[test]
    fn top_titles_sorts_and_truncates() {
        let tables = march_tables(&[
            ("ML Engineer", 5),
            ("Data Scientist", 3),
            ("AI Researcher", 8),
            ("Analyst", 2),
            ("Platform Engineer", 1),
            ("Prompt Engineer", 1),
        ]);

        let ranking = top_titles(&tables, key("2024-03"), 5);
        let TitleRanking::Ranked { key: ranked_key, titles } = ranking else {
            panic!("expected ranked titles");
        };
        assert_eq!(ranked_key, key("2024-03"));
        assert_eq!(titles.len(), 5, "truncated to top five");
        assert_eq!(titles[0].title, "AI Researcher");
        assert_eq!(titles[1].title, "ML Engineer");
        assert_eq!(titles[2].title, "Data Scientist");
        assert_eq!(titles[3].title, "Analyst");
        // Tied count (1): alphabetical order decides, and the loser of the
        // tie falls off the truncated list.
        assert_eq!(titles[4].title, "Platform Engineer");
    }

    #[test]
    fn tied_counts_rank_alphabetically() {
        let tables = march_tables(&[("Data Scientist", 2), ("AI Researcher", 2), ("Analyst", 2)]);

        let ranking = top_titles(&tables, key("2024-03"), 5);
        let TitleRanking::Ranked { titles, .. } = ranking else {
            panic!("expected ranked titles");
        };
        let names: Vec<&str> = titles.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(names, ["AI Researcher", "Analyst", "Data Scientist"]);
    }

    #[test]
    fn absent_month_yields_no_data() {
        let tables = march_tables(&[("ML Engineer", 2)]);
        let ranking = top_titles(&tables, key("2024-07"), 5);
        assert_eq!(
            ranking,
            TitleRanking::NoData {
                key: key("2024-07")
            }
        );
    }

    #[test]
    fn worked_example_ranking() {
        let tables = march_tables(&[("ML Engineer", 2), ("Data Scientist", 1)]);
        let ranking = top_titles(&tables, key("2024-03"), 5);
        let TitleRanking::Ranked { titles, .. } = ranking else {
            panic!("expected ranked titles");
        };
        assert_eq!(
            titles,
            vec![
                TitleCount {
                    title: "ML Engineer".to_string(),
                    count: 2
                },
                TitleCount {
                    title: "Data Scientist".to_string(),
                    count: 1
                },
            ]
        );
    }
}
