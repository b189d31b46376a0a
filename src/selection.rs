//! Routing between filtered and selection-scoped statistics.
//!
//! [`AnalyticsContext`] is the single owner of the loaded data, the active
//! filter criteria and the selection set. Every mutation recomputes the
//! statistics from scratch; nothing is updated incrementally.

use tracing::debug;

use crate::filter::{filter_paths, segments_for_path, segments_for_paths, select_paths};
use crate::model::{Criterion, Dataset, FilterCriteria, PathRecord, Segment, SelectionSet};
use crate::replay::{ReplayError, ReplayTimeline};
use crate::stats::{aggregate_with_catalog, StatisticsResult};

/// Which population the current statistics describe.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StatsScope {
    Filtered(FilterCriteria),
    /// An explicit selection of this many paths; filters are ignored.
    Selection(usize),
}

impl StatsScope {
    pub fn label(&self) -> String {
        match self {
            StatsScope::Filtered(criteria) => {
                if criteria.year.is_all() && criteria.aircraft.is_all() {
                    "All flights".to_string()
                } else {
                    format!("Year {} / Aircraft {}", criteria.year, criteria.aircraft)
                }
            }
            StatsScope::Selection(1) => "1 selected flight".to_string(),
            StatsScope::Selection(n) => format!("{n} selected flights"),
        }
    }
}

/// Statistics for `dataset` under `criteria`, unless `selection` is
/// non-empty, in which case the selected paths are used and the criteria
/// ignored.
pub fn route(
    dataset: &Dataset,
    criteria: &FilterCriteria,
    selection: &SelectionSet,
) -> (StatsScope, StatisticsResult) {
    let (scope, records) = if selection.is_empty() {
        (
            StatsScope::Filtered(criteria.clone()),
            filter_paths(&dataset.paths, criteria),
        )
    } else {
        (
            StatsScope::Selection(selection.len()),
            select_paths(&dataset.paths, selection),
        )
    };
    let segments = segments_for_paths(&dataset.segments, &records);
    let stats = aggregate_with_catalog(&records, &segments, &dataset.aircraft);
    (scope, stats)
}

#[derive(Clone, Debug)]
pub struct AnalyticsContext {
    dataset: Dataset,
    criteria: FilterCriteria,
    selection: SelectionSet,
    scope: StatsScope,
    stats: StatisticsResult,
    recomputes: u64,
}

impl AnalyticsContext {
    pub fn new(dataset: Dataset, criteria: FilterCriteria) -> Self {
        let mut ctx = Self {
            dataset,
            scope: StatsScope::Filtered(criteria.clone()),
            criteria,
            selection: SelectionSet::new(),
            stats: StatisticsResult::default(),
            recomputes: 0,
        };
        ctx.recompute();
        ctx
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn scope(&self) -> &StatsScope {
        &self.scope
    }

    pub fn stats(&self) -> &StatisticsResult {
        &self.stats
    }

    /// Number of full recomputations performed so far.
    pub fn recomputes(&self) -> u64 {
        self.recomputes
    }

    /// Paths matching the current criteria, in load order. The selection
    /// does not narrow this list.
    pub fn visible_paths(&self) -> Vec<PathRecord> {
        filter_paths(&self.dataset.paths, &self.criteria)
    }

    /// Segments of every path matching the current criteria.
    pub fn visible_segments(&self) -> Vec<Segment> {
        let records = self.visible_paths();
        if self.dataset.display_segments.is_empty() {
            segments_for_paths(&self.dataset.segments, &records)
        } else {
            segments_for_paths(&self.dataset.display_segments, &records)
        }
    }

    pub fn set_criteria(&mut self, criteria: FilterCriteria) {
        self.criteria = criteria;
        self.recompute();
    }

    pub fn set_year(&mut self, year: Criterion) {
        self.criteria.year = year;
        self.recompute();
    }

    pub fn set_aircraft(&mut self, aircraft: Criterion) {
        self.criteria.aircraft = aircraft;
        self.recompute();
    }

    pub fn set_selection(&mut self, selection: SelectionSet) {
        self.selection = selection;
        self.recompute();
    }

    /// Adds `path_id` to the selection, or removes it if already present.
    pub fn toggle_selection(&mut self, path_id: i64) {
        if !self.selection.remove(&path_id) {
            self.selection.insert(path_id);
        }
        self.recompute();
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
        self.recompute();
    }

    /// Swaps in newly loaded data. Selected ids that no longer exist are
    /// dropped.
    pub fn replace_dataset(&mut self, dataset: Dataset) {
        self.selection
            .retain(|id| dataset.paths.iter().any(|record| record.id == *id));
        self.dataset = dataset;
        self.recompute();
    }

    /// The path to replay, available only while exactly one path is
    /// selected.
    pub fn replay_candidate(&self) -> Option<i64> {
        if self.selection.len() == 1 {
            self.selection.iter().next().copied()
        } else {
            None
        }
    }

    /// Builds a fresh timeline for the single selected path.
    pub fn start_replay(&self) -> Result<ReplayTimeline, ReplayError> {
        let path_id = self
            .replay_candidate()
            .ok_or(ReplayError::MultiplePaths(self.selection.len()))?;
        let segments = segments_for_path(&self.dataset.segments, path_id);
        let display = segments_for_path(&self.dataset.display_segments, path_id);
        if segments.is_empty() {
            return Err(ReplayError::NoSegments);
        }
        ReplayTimeline::initialize(&segments, &display)
    }

    fn recompute(&mut self) {
        let (scope, stats) = route(&self.dataset, &self.criteria, &self.selection);
        self.scope = scope;
        self.stats = stats;
        self.recomputes += 1;
        debug!(
            "statistics recomputed ({}): {} paths",
            self.scope.label(),
            self.stats.num_paths
        );
    }
}
