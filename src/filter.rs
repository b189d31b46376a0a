//! Narrowing the loaded population down to the records a view cares about.

use std::collections::{BTreeSet, HashSet};

use crate::model::{FilterCriteria, PathRecord, Segment, SelectionSet};

/// Records matching both components of `criteria`, in their original order.
pub fn filter_paths(records: &[PathRecord], criteria: &FilterCriteria) -> Vec<PathRecord> {
    records
        .iter()
        .filter(|record| criteria.matches(record))
        .cloned()
        .collect()
}

/// Segments whose `path_id` belongs to one of `records`.
pub fn segments_for_paths(segments: &[Segment], records: &[PathRecord]) -> Vec<Segment> {
    let ids: HashSet<i64> = records.iter().map(|record| record.id).collect();
    segments
        .iter()
        .filter(|segment| ids.contains(&segment.path_id))
        .cloned()
        .collect()
}

/// Records whose id is in `selection`, ignoring any ambient filter.
pub fn select_paths(records: &[PathRecord], selection: &SelectionSet) -> Vec<PathRecord> {
    records
        .iter()
        .filter(|record| selection.contains(&record.id))
        .cloned()
        .collect()
}

/// Segments belonging to a single path.
pub fn segments_for_path(segments: &[Segment], path_id: i64) -> Vec<Segment> {
    segments
        .iter()
        .filter(|segment| segment.path_id == path_id)
        .cloned()
        .collect()
}

/// Distinct years present in `records`, newest first.
pub fn available_years(records: &[PathRecord]) -> Vec<i64> {
    let years: BTreeSet<i64> = records.iter().filter_map(|record| record.year).collect();
    years.into_iter().rev().collect()
}

/// Distinct aircraft registrations present in `records`, sorted.
pub fn available_aircraft(records: &[PathRecord]) -> Vec<String> {
    let regs: BTreeSet<&str> = records
        .iter()
        .filter_map(|record| record.aircraft_registration.as_deref())
        .collect();
    regs.into_iter().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i64, year: Option<i64>, reg: Option<&str>) -> PathRecord {
        PathRecord {
            id,
            year,
            aircraft_registration: reg.map(str::to_string),
            ..PathRecord::default()
        }
    }

    fn segment(path_id: i64) -> Segment {
        Segment {
            path_id,
            coords: [[0.0, 0.0], [0.0, 0.1]],
            ..Segment::default()
        }
    }

    fn sample_records() -> Vec<PathRecord> {
        vec![
            record(1, Some(2023), Some("D-EABC")),
            record(2, Some(2024), Some("D-EABC")),
            record(3, Some(2024), Some("N123AB")),
            record(4, None, Some("N123AB")),
            record(5, Some(2024), None),
        ]
    }

    fn ids(records: &[PathRecord]) -> Vec<i64> {
        records.iter().map(|r| r.id).collect()
    }

    #[test]
    fn year_and_aircraft_combine() {
        let records = sample_records();
        assert_eq!(ids(&filter_paths(&records, &FilterCriteria::all())), vec![1, 2, 3, 4, 5]);
        assert_eq!(
            ids(&filter_paths(&records, &FilterCriteria::new("2024", "all"))),
            vec![2, 3, 5]
        );
        assert_eq!(
            ids(&filter_paths(&records, &FilterCriteria::new("all", "N123AB"))),
            vec![3, 4]
        );
        assert_eq!(
            ids(&filter_paths(&records, &FilterCriteria::new("2024", "D-EABC"))),
            vec![2]
        );
        assert!(filter_paths(&records, &FilterCriteria::new("1999", "all")).is_empty());
    }

    #[test]
    fn filtering_is_idempotent() {
        let records = sample_records();
        for criteria in [
            FilterCriteria::all(),
            FilterCriteria::new("2024", "all"),
            FilterCriteria::new("all", "D-EABC"),
            FilterCriteria::new("2023", "N123AB"),
        ] {
            let once = filter_paths(&records, &criteria);
            let twice = filter_paths(&once, &criteria);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn segments_follow_record_membership() {
        let records = sample_records();
        let segments: Vec<Segment> = [1, 2, 2, 3, 9, 5].into_iter().map(segment).collect();
        let picked = filter_paths(&records, &FilterCriteria::new("2024", "all"));
        let narrowed = segments_for_paths(&segments, &picked);
        let path_ids: Vec<i64> = narrowed.iter().map(|s| s.path_id).collect();
        assert_eq!(path_ids, vec![2, 2, 3, 5]);
        assert!(segments_for_paths(&segments, &[]).is_empty());
    }

    #[test]
    fn selection_ignores_missing_ids() {
        let records = sample_records();
        let selection: SelectionSet = [3, 5, 42].into_iter().collect();
        assert_eq!(ids(&select_paths(&records, &selection)), vec![3, 5]);
    }

    #[test]
    fn option_listing() {
        let records = sample_records();
        assert_eq!(available_years(&records), vec![2024, 2023]);
        assert_eq!(
            available_aircraft(&records),
            vec!["D-EABC".to_string(), "N123AB".to_string()]
        );
    }
}
