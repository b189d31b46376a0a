//! Flight statistics over a filtered or selected population of paths.
//!
//! Every function here is total: an empty population produces the
//! zero-valued [`StatisticsResult`], and records or segments with missing
//! optional fields are skipped field by field.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;
use tracing::debug;

use crate::geo::{ft_to_m, haversine_km, km_to_nm};
use crate::model::{AircraftInfo, PathRecord, Segment};

/// Height above the population floor a segment must exceed to count as cruise.
pub const CRUISE_MIN_AGL_FT: f64 = 1000.0;
/// Width of the cruise altitude histogram buckets.
pub const CRUISE_BUCKET_FT: f64 = 100.0;

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AircraftSummary {
    pub registration: String,
    pub aircraft_type: Option<String>,
    pub model: Option<String>,
    pub flights: usize,
    pub flight_time_seconds: f64,
    pub flight_time: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsResult {
    pub total_points: usize,
    pub num_paths: usize,
    pub total_flights: usize,
    pub airports: Vec<String>,
    pub aircraft: Vec<AircraftSummary>,
    pub total_distance_km: f64,
    pub total_distance_nm: f64,
    pub average_distance_km: f64,
    pub average_distance_nm: f64,
    pub longest_flight_km: f64,
    pub longest_flight_nm: f64,
    pub min_altitude_ft: f64,
    pub max_altitude_ft: f64,
    pub min_altitude_m: f64,
    pub max_altitude_m: f64,
    pub total_altitude_gain_ft: f64,
    pub total_altitude_gain_m: f64,
    pub max_groundspeed_knots: f64,
    pub average_groundspeed_knots: f64,
    pub cruise_speed_knots: f64,
    pub most_common_cruise_altitude_ft: f64,
    pub most_common_cruise_altitude_m: f64,
    pub total_flight_time_seconds: f64,
    pub total_flight_time: String,
}

impl Default for StatisticsResult {
    fn default() -> Self {
        Self {
            total_points: 0,
            num_paths: 0,
            total_flights: 0,
            airports: Vec::new(),
            aircraft: Vec::new(),
            total_distance_km: 0.0,
            total_distance_nm: 0.0,
            average_distance_km: 0.0,
            average_distance_nm: 0.0,
            longest_flight_km: 0.0,
            longest_flight_nm: 0.0,
            min_altitude_ft: 0.0,
            max_altitude_ft: 0.0,
            min_altitude_m: 0.0,
            max_altitude_m: 0.0,
            total_altitude_gain_ft: 0.0,
            total_altitude_gain_m: 0.0,
            max_groundspeed_knots: 0.0,
            average_groundspeed_knots: 0.0,
            cruise_speed_knots: 0.0,
            most_common_cruise_altitude_ft: 0.0,
            most_common_cruise_altitude_m: 0.0,
            total_flight_time_seconds: 0.0,
            total_flight_time: format_flight_time(0.0),
        }
    }
}

impl StatisticsResult {
    pub fn num_airports(&self) -> usize {
        self.airports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.num_paths == 0
    }
}

/// Aggregates `records` and their `segments` without aircraft catalog data.
pub fn aggregate(records: &[PathRecord], segments: &[Segment]) -> StatisticsResult {
    aggregate_with_catalog(records, segments, &[])
}

/// Aggregates `records` and `segments`, which must already be narrowed to the
/// same path-id population. `catalog` supplies aircraft type/model details.
pub fn aggregate_with_catalog(
    records: &[PathRecord],
    segments: &[Segment],
    catalog: &[AircraftInfo],
) -> StatisticsResult {
    if records.is_empty() {
        return StatisticsResult::default();
    }

    let mut result = StatisticsResult {
        num_paths: records.len(),
        total_points: segments.len(),
        ..StatisticsResult::default()
    };

    let mut per_path_km: HashMap<i64, f64> = HashMap::new();
    let mut total_km = 0.0;
    for segment in segments {
        let km = haversine_km(segment.start(), segment.end());
        total_km += km;
        *per_path_km.entry(segment.path_id).or_insert(0.0) += km;
    }
    let longest_km = per_path_km.values().copied().fold(0.0, f64::max);
    let average_km = total_km / records.len() as f64;
    result.total_distance_km = total_km;
    result.total_distance_nm = km_to_nm(total_km);
    result.average_distance_km = average_km;
    result.average_distance_nm = km_to_nm(average_km);
    result.longest_flight_km = longest_km;
    result.longest_flight_nm = km_to_nm(longest_km);

    if let Some((min_ft, max_ft)) = altitude_bounds(segments) {
        result.min_altitude_ft = min_ft;
        result.max_altitude_ft = max_ft;
        result.min_altitude_m = ft_to_m(min_ft);
        result.max_altitude_m = ft_to_m(max_ft);
    }
    let gain_ft = altitude_gain_ft(segments);
    result.total_altitude_gain_ft = gain_ft;
    result.total_altitude_gain_m = ft_to_m(gain_ft);

    let (max_gs, avg_gs) = groundspeed_stats(segments);
    result.max_groundspeed_knots = max_gs;
    result.average_groundspeed_knots = avg_gs;

    let (cruise_speed, cruise_alt_ft) = cruise_profile(segments, result.min_altitude_ft);
    result.cruise_speed_knots = cruise_speed;
    result.most_common_cruise_altitude_ft = cruise_alt_ft;
    result.most_common_cruise_altitude_m = ft_to_m(cruise_alt_ft);

    let durations = path_durations(segments);
    let total_secs: f64 = durations.values().sum();
    result.total_flight_time_seconds = total_secs;
    result.total_flight_time = format_flight_time(total_secs);

    result.airports = airports(records);
    result.aircraft = aircraft_summaries(records, &durations, catalog);
    result.total_flights = if result.aircraft.is_empty() {
        result.num_paths
    } else {
        result.aircraft.iter().map(|a| a.flights).sum()
    };

    debug!(
        "aggregated {} paths / {} segments: {:.1} km",
        result.num_paths, result.total_points, result.total_distance_km
    );
    result
}

/// `"{hours}h {minutes}m"` with both components truncated.
pub fn format_flight_time(seconds: f64) -> String {
    let total = if seconds.is_finite() {
        seconds.max(0.0) as u64
    } else {
        0
    };
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    format!("{hours}h {minutes}m")
}

/// Duration of every path that has timestamped segments: `max(time) - min(time)`.
pub fn path_durations(segments: &[Segment]) -> HashMap<i64, f64> {
    let mut spans: HashMap<i64, (f64, f64)> = HashMap::new();
    for segment in segments {
        let Some(time) = segment.time_seconds else {
            continue;
        };
        let span = spans.entry(segment.path_id).or_insert((time, time));
        span.0 = span.0.min(time);
        span.1 = span.1.max(time);
    }
    spans
        .into_iter()
        .map(|(path_id, (start, end))| (path_id, end - start))
        .collect()
}

fn altitude_bounds(segments: &[Segment]) -> Option<(f64, f64)> {
    segments.iter().map(|s| s.altitude_ft).fold(None, |acc, alt| match acc {
        None => Some((alt, alt)),
        Some((lo, hi)) => Some((lo.min(alt), hi.max(alt))),
    })
}

/// Sum of the positive altitude steps between time-ordered samples of each
/// path. Descents are ignored rather than subtracted.
fn altitude_gain_ft(segments: &[Segment]) -> f64 {
    let mut by_path: BTreeMap<i64, Vec<&Segment>> = BTreeMap::new();
    for segment in segments {
        by_path.entry(segment.path_id).or_default().push(segment);
    }

    by_path
        .values_mut()
        .map(|path| {
            path.sort_by(|a, b| compare_time(a, b));
            path.windows(2)
                .map(|pair| pair[1].altitude_ft - pair[0].altitude_ft)
                .filter(|delta| *delta > 0.0)
                .fold(0.0, |acc, delta| acc + delta)
        })
        .fold(0.0, |acc, gain| acc + gain)
}

fn groundspeed_stats(segments: &[Segment]) -> (f64, f64) {
    let mut max = 0.0_f64;
    let mut sum = 0.0;
    let mut count = 0usize;
    for speed in segments.iter().filter_map(Segment::moving_speed) {
        max = max.max(speed);
        sum += speed;
        count += 1;
    }
    let avg = if count > 0 { sum / count as f64 } else { 0.0 };
    (max, avg)
}

fn is_cruise(segment: &Segment, floor_ft: f64) -> bool {
    segment.altitude_ft > floor_ft + CRUISE_MIN_AGL_FT && segment.moving_speed().is_some()
}

/// Mean cruise groundspeed and the time-weighted most common cruise altitude.
fn cruise_profile(segments: &[Segment], floor_ft: f64) -> (f64, f64) {
    let weights = segment_weights(segments);

    let mut speed_sum = 0.0;
    let mut speed_count = 0usize;
    let mut buckets: Vec<(i64, f64)> = Vec::new();
    let mut slots: HashMap<i64, usize> = HashMap::new();

    for (idx, segment) in segments.iter().enumerate() {
        if !is_cruise(segment, floor_ft) {
            continue;
        }
        if let Some(speed) = segment.moving_speed() {
            speed_sum += speed;
            speed_count += 1;
        }
        let bucket = cruise_bucket(segment.altitude_ft);
        let slot = *slots.entry(bucket).or_insert_with(|| {
            buckets.push((bucket, 0.0));
            buckets.len() - 1
        });
        buckets[slot].1 += weights[idx];
    }

    if speed_count == 0 {
        return (0.0, 0.0);
    }

    let mut best: Option<(i64, f64)> = None;
    for (bucket, weight) in buckets {
        match best {
            Some((_, best_weight)) if weight <= best_weight => {}
            _ => best = Some((bucket, weight)),
        }
    }
    let cruise_speed = speed_sum / speed_count as f64;
    let common_alt = best.map(|(bucket, _)| bucket as f64).unwrap_or(0.0);
    (cruise_speed, common_alt)
}

fn cruise_bucket(altitude_ft: f64) -> i64 {
    ((altitude_ft / CRUISE_BUCKET_FT).round() * CRUISE_BUCKET_FT) as i64
}

/// Histogram weight of each segment: the time until the next segment of the
/// same path. The last segment of a path reuses the previous gap, a lone
/// segment weighs 1, and gaps that cannot be measured (missing timestamps)
/// weigh 1.
fn segment_weights(segments: &[Segment]) -> Vec<f64> {
    let mut by_path: HashMap<i64, Vec<usize>> = HashMap::new();
    for (idx, segment) in segments.iter().enumerate() {
        by_path.entry(segment.path_id).or_default().push(idx);
    }

    let mut weights = vec![1.0; segments.len()];
    for indices in by_path.values_mut() {
        if indices.len() < 2 {
            continue;
        }
        indices.sort_by(|a, b| compare_time(&segments[*a], &segments[*b]));
        let gaps: Vec<f64> = indices
            .windows(2)
            .map(|pair| {
                match (
                    segments[pair[0]].time_seconds,
                    segments[pair[1]].time_seconds,
                ) {
                    (Some(t0), Some(t1)) => (t1 - t0).max(0.0),
                    _ => 1.0,
                }
            })
            .collect();
        for (pos, idx) in indices.iter().enumerate() {
            weights[*idx] = gaps.get(pos).or_else(|| gaps.last()).copied().unwrap_or(1.0);
        }
    }
    weights
}

/// Orders timestamped segments first, ascending; untimed ones keep their order.
pub(crate) fn compare_time(a: &Segment, b: &Segment) -> Ordering {
    match (a.time_seconds, b.time_seconds) {
        (Some(ta), Some(tb)) => ta.total_cmp(&tb),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn airports(records: &[PathRecord]) -> Vec<String> {
    let set: BTreeSet<&str> = records
        .iter()
        .flat_map(|r| [r.start_airport.as_deref(), r.end_airport.as_deref()])
        .flatten()
        .collect();
    set.into_iter().map(str::to_string).collect()
}

fn aircraft_summaries(
    records: &[PathRecord],
    durations: &HashMap<i64, f64>,
    catalog: &[AircraftInfo],
) -> Vec<AircraftSummary> {
    let mut by_reg: HashMap<&str, AircraftSummary> = HashMap::new();
    for record in records {
        let Some(reg) = record.aircraft_registration.as_deref() else {
            continue;
        };
        let entry = by_reg.entry(reg).or_insert_with(|| AircraftSummary {
            registration: reg.to_string(),
            ..AircraftSummary::default()
        });
        entry.flights += 1;
        entry.flight_time_seconds += durations.get(&record.id).copied().unwrap_or(0.0);
        if entry.aircraft_type.is_none() {
            entry.aircraft_type = record.aircraft_type.clone();
        }
    }

    let mut list: Vec<AircraftSummary> = by_reg
        .into_values()
        .map(|mut summary| {
            if let Some(info) = catalog
                .iter()
                .find(|info| info.registration.eq_ignore_ascii_case(&summary.registration))
            {
                if info.aircraft_type.is_some() {
                    summary.aircraft_type = info.aircraft_type.clone();
                }
                summary.model = info.model.clone();
            }
            summary.flight_time = format_flight_time(summary.flight_time_seconds);
            summary
        })
        .collect();
    list.sort_by(|a, b| {
        b.flights
            .cmp(&a.flights)
            .then_with(|| a.registration.cmp(&b.registration))
    });
    list
}
