//! Time-based playback of a single recorded flight.
//!
//! A [`ReplayTimeline`] owns the playback clock (seconds since path start),
//! the play/pause/stop state and the incremental trail cursor. It turns the
//! current time into an interpolated [`ReplayPosition`] plus a smoothed
//! heading, and it never assumes a particular frame scheduler: the host calls
//! [`ReplayTimeline::tick`] with the real elapsed time of each frame.

use std::ops::Range;

use thiserror::Error;
use tracing::{debug, trace};

use crate::geo::{bearing_deg, haversine_km, lerp, normalize, GeoPoint};
use crate::model::Segment;

pub const DEFAULT_SPEED: f64 = 50.0;
pub const MIN_SPEED: f64 = 1.0;
pub const MAX_SPEED: f64 = 1000.0;
pub const SPEED_PRESETS: [f64; 7] = [1.0, 10.0, 25.0, 50.0, 100.0, 200.0, 500.0];
/// How many segments ahead the heading is measured against.
pub const BEARING_LOOKAHEAD: usize = 5;
/// Displacements shorter than this (50 m) count as stationary.
pub const STATIONARY_KM: f64 = 0.05;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum ReplayError {
    #[error("no timestamp data for path {0}; replay needs timed segments")]
    NoTimestampData(i64),
    #[error("no segments to replay")]
    NoSegments,
    #[error("replay needs exactly one path, found {0}")]
    MultiplePaths(usize),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

impl PlaybackState {
    pub fn label(self) -> &'static str {
        match self {
            PlaybackState::Stopped => "STOPPED",
            PlaybackState::Playing => "PLAYING",
            PlaybackState::Paused => "PAUSED",
        }
    }
}

/// What a clock advance did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not playing; the clock did not move.
    Idle,
    Advanced,
    /// The clock reached the end of the path and playback paused.
    Finished,
}

/// Value range used to scale trail colours.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ColorRange {
    pub min: f64,
    pub max: f64,
}

impl ColorRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Smallest range covering `values`; empty input gives `0..0`.
    pub fn spanning(values: impl IntoIterator<Item = f64>) -> Self {
        let mut iter = values.into_iter().filter(|v| v.is_finite());
        let Some(first) = iter.next() else {
            return Self::default();
        };
        iter.fold(Self::new(first, first), |range, v| {
            Self::new(range.min.min(v), range.max.max(v))
        })
    }

    pub fn normalize(&self, value: f64) -> f64 {
        normalize(value, self.min, self.max)
    }
}

/// Interpolated aircraft state at one instant.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReplayPosition {
    pub time: f64,
    pub point: GeoPoint,
    pub altitude_ft: f64,
    pub groundspeed_knots: Option<f64>,
    /// Bearing of the leg being interpolated, if it has any length.
    pub leg_bearing_deg: Option<f64>,
    /// Index of the last segment whose time is `<= time`.
    pub index: Option<usize>,
}

/// Position plus the heading the marker should be drawn with.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReplaySample {
    pub position: ReplayPosition,
    /// Last known smoothed heading; `None` until the aircraft first moves.
    pub heading_deg: Option<f64>,
}

/// Newly eligible trail segments since the previous update.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrailUpdate {
    /// The renderer must drop everything it has drawn before applying `range`.
    pub reset: bool,
    pub range: Range<usize>,
}

impl TrailUpdate {
    pub fn is_empty(&self) -> bool {
        !self.reset && self.range.is_empty()
    }
}

#[derive(Clone, Debug)]
pub struct ReplayTimeline {
    path_id: i64,
    segments: Vec<Segment>,
    current_time: f64,
    max_time: f64,
    speed: f64,
    state: PlaybackState,
    last_drawn_index: Option<usize>,
    trail_reset: bool,
    last_bearing: Option<f64>,
    altitude_range: ColorRange,
    speed_range: ColorRange,
}

impl ReplayTimeline {
    /// Builds a timeline over the segments of one path.
    ///
    /// Segments without a timestamp cannot be placed on the clock and are
    /// dropped; the rest are sorted ascending by time. `display` holds the
    /// same path at the resolution currently drawn on the map and, when
    /// non-empty, defines the colour ranges so the replay matches the static
    /// overlay.
    pub fn initialize(segments: &[Segment], display: &[Segment]) -> Result<Self, ReplayError> {
        let Some(first) = segments.first() else {
            return Err(ReplayError::NoSegments);
        };
        let path_id = first.path_id;
        let mut ids: Vec<i64> = segments.iter().map(|s| s.path_id).collect();
        ids.sort_unstable();
        ids.dedup();
        if ids.len() > 1 {
            return Err(ReplayError::MultiplePaths(ids.len()));
        }

        let mut timed: Vec<Segment> = segments
            .iter()
            .filter(|s| s.time_seconds.is_some_and(f64::is_finite))
            .cloned()
            .collect();
        if timed.is_empty() {
            return Err(ReplayError::NoTimestampData(path_id));
        }
        timed.sort_by(|a, b| time_of(a).total_cmp(&time_of(b)));
        let max_time = timed.last().map(time_of).unwrap_or(0.0).max(0.0);

        let color_source: Vec<&Segment> = if display.iter().any(|s| s.path_id == path_id) {
            display.iter().filter(|s| s.path_id == path_id).collect()
        } else {
            segments.iter().collect()
        };
        let altitude_range = ColorRange::spanning(color_source.iter().map(|s| s.altitude_ft));
        let speed_range =
            ColorRange::spanning(color_source.iter().filter_map(|s| s.groundspeed_knots));

        debug!(
            "replay initialized for path {path_id}: {} segments, {max_time:.0}s",
            timed.len()
        );
        Ok(Self {
            path_id,
            segments: timed,
            current_time: 0.0,
            max_time,
            speed: DEFAULT_SPEED,
            state: PlaybackState::Stopped,
            last_drawn_index: None,
            trail_reset: true,
            last_bearing: None,
            altitude_range,
            speed_range,
        })
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.set_speed(speed);
        self
    }

    pub fn path_id(&self) -> i64 {
        self.path_id
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn max_time(&self) -> f64 {
        self.max_time
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn last_drawn_index(&self) -> Option<usize> {
        self.last_drawn_index
    }

    pub fn last_bearing(&self) -> Option<f64> {
        self.last_bearing
    }

    pub fn altitude_range(&self) -> ColorRange {
        self.altitude_range
    }

    pub fn speed_range(&self) -> ColorRange {
        self.speed_range
    }

    /// Fraction of the path already played, in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        if self.max_time <= 0.0 {
            return if self.current_time >= self.max_time { 1.0 } else { 0.0 };
        }
        (self.current_time / self.max_time).clamp(0.0, 1.0)
    }

    pub fn play(&mut self) {
        if self.current_time >= self.max_time {
            self.seek(0.0);
        }
        self.state = PlaybackState::Playing;
        debug!("replay -> {}", self.state.label());
    }

    pub fn pause(&mut self) {
        if self.state == PlaybackState::Playing {
            self.state = PlaybackState::Paused;
            debug!("replay -> {}", self.state.label());
        }
    }

    pub fn toggle_play(&mut self) {
        if self.is_playing() {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Halts playback and rewinds to the start, clearing the trail.
    pub fn stop(&mut self) {
        self.state = PlaybackState::Stopped;
        self.current_time = 0.0;
        self.last_drawn_index = None;
        self.trail_reset = true;
        self.last_bearing = None;
        debug!("replay -> {}", self.state.label());
    }

    pub fn set_speed(&mut self, speed: f64) {
        self.speed = if speed.is_finite() {
            speed.clamp(MIN_SPEED, MAX_SPEED)
        } else {
            DEFAULT_SPEED
        };
        debug!("replay speed -> {}x", self.speed);
    }

    /// Moves to the next faster preset.
    pub fn faster(&mut self) {
        if let Some(next) = SPEED_PRESETS.iter().copied().find(|p| *p > self.speed) {
            self.set_speed(next);
        }
    }

    /// Moves to the next slower preset.
    pub fn slower(&mut self) {
        if let Some(prev) = SPEED_PRESETS.iter().rev().copied().find(|p| *p < self.speed) {
            self.set_speed(prev);
        }
    }

    /// Jumps to `time`, clamped to the path. Play state is untouched.
    ///
    /// Seeking backwards rewinds the draw cursor so the next
    /// [`take_trail_update`](Self::take_trail_update) redraws the trail up to
    /// the new time.
    pub fn seek(&mut self, time: f64) {
        let target = self.clamp_time(time);
        if target < self.current_time {
            self.last_drawn_index = None;
            self.trail_reset = true;
        }
        trace!("replay seek {:.1}s -> {target:.1}s", self.current_time);
        self.current_time = target;
    }

    /// Relative seek by `seconds` of path time.
    pub fn step(&mut self, seconds: f64) {
        self.seek(self.current_time + seconds);
    }

    /// Advances the clock by `delta_seconds` of wall time scaled by the
    /// playback speed, regardless of play state.
    pub fn advance(&mut self, delta_seconds: f64) -> TickOutcome {
        if !delta_seconds.is_finite() {
            return TickOutcome::Idle;
        }
        let before = self.current_time;
        self.current_time = self.clamp_time(before + delta_seconds * self.speed);
        if self.current_time < before {
            self.last_drawn_index = None;
            self.trail_reset = true;
        }
        let at_end = self.current_time >= self.max_time;
        if at_end && (before < self.max_time || self.state == PlaybackState::Playing) {
            self.state = PlaybackState::Paused;
            debug!("replay finished at {:.0}s", self.max_time);
            return TickOutcome::Finished;
        }
        TickOutcome::Advanced
    }

    /// Frame callback: advances only while playing.
    pub fn tick(&mut self, delta_seconds: f64) -> TickOutcome {
        if !self.is_playing() {
            return TickOutcome::Idle;
        }
        self.advance(delta_seconds)
    }

    /// Interpolated state at `time`.
    ///
    /// Between two samples the position moves linearly from the end of the
    /// last segment at or before `time` to the end of the next one. An exact
    /// sample time returns that segment's end point; past the last sample
    /// the end of the path is returned; before the first sample the start of
    /// the first segment is returned.
    pub fn position_at(&self, time: f64) -> ReplayPosition {
        let count = self.segments.partition_point(|s| time_of(s) <= time);
        let Some(last_idx) = count.checked_sub(1) else {
            let first = &self.segments[0];
            return ReplayPosition {
                time,
                point: first.start(),
                altitude_ft: first.altitude_ft,
                groundspeed_knots: first.groundspeed_knots,
                leg_bearing_deg: leg_bearing(first.start(), first.end()),
                index: None,
            };
        };
        let last = &self.segments[last_idx];
        let last_time = time_of(last);

        let next = self.segments.get(count);
        match next {
            Some(next) if time > last_time => {
                let span = time_of(next) - last_time;
                let t = if span > 0.0 { (time - last_time) / span } else { 0.0 };
                let from = last.end();
                let to = next.end();
                let groundspeed = match (last.groundspeed_knots, next.groundspeed_knots) {
                    (Some(a), Some(b)) => Some(lerp(a, b, t)),
                    (a, b) => a.or(b),
                };
                ReplayPosition {
                    time,
                    point: GeoPoint::new(lerp(from.lat, to.lat, t), lerp(from.lon, to.lon, t)),
                    altitude_ft: lerp(last.altitude_ft, next.altitude_ft, t),
                    groundspeed_knots: groundspeed,
                    leg_bearing_deg: leg_bearing(from, to),
                    index: Some(last_idx),
                }
            }
            _ => ReplayPosition {
                time,
                point: last.end(),
                altitude_ft: last.altitude_ft,
                groundspeed_knots: last.groundspeed_knots,
                leg_bearing_deg: leg_bearing(last.start(), last.end()),
                index: Some(last_idx),
            },
        }
    }

    /// Heading from `position` towards the point up to
    /// [`BEARING_LOOKAHEAD`] segments ahead, or `None` while stationary.
    pub fn smoothed_bearing(&self, position: &ReplayPosition) -> Option<f64> {
        let base = position.index.unwrap_or(0);
        let ahead = (base + BEARING_LOOKAHEAD).min(self.segments.len().saturating_sub(1));
        let target = self.segments.get(ahead)?.end();
        bearing_if_moving(position.point, target)
    }

    /// Samples the current time, keeping the last known heading whenever the
    /// smoothed bearing reports no change.
    pub fn sample(&mut self) -> ReplaySample {
        let position = self.position_at(self.current_time);
        if let Some(bearing) = self.smoothed_bearing(&position) {
            self.last_bearing = Some(bearing);
        }
        ReplaySample {
            position,
            heading_deg: self.last_bearing,
        }
    }

    /// Segments that became eligible for drawing since the last call.
    pub fn take_trail_update(&mut self) -> TrailUpdate {
        let eligible = self
            .segments
            .partition_point(|s| time_of(s) <= self.current_time);
        let start = self.last_drawn_index.map(|idx| idx + 1).unwrap_or(0);
        let update = TrailUpdate {
            reset: self.trail_reset,
            range: start.min(eligible)..eligible,
        };
        self.trail_reset = false;
        if eligible > 0 {
            self.last_drawn_index = Some(eligible - 1);
        }
        update
    }

    /// Normalised altitude of segment `index` for trail colouring.
    pub fn altitude_fraction(&self, index: usize) -> f64 {
        self.segments
            .get(index)
            .map(|s| self.altitude_range.normalize(s.altitude_ft))
            .unwrap_or(0.0)
    }

    /// Normalised groundspeed of segment `index`; missing speeds read as 0.
    pub fn speed_fraction(&self, index: usize) -> f64 {
        self.segments
            .get(index)
            .and_then(|s| s.groundspeed_knots)
            .map(|gs| self.speed_range.normalize(gs))
            .unwrap_or(0.0)
    }

    fn clamp_time(&self, time: f64) -> f64 {
        if time.is_nan() {
            return self.current_time;
        }
        time.clamp(0.0, self.max_time)
    }
}

/// Bearing from `from` to `to`, unless the two are closer than
/// [`STATIONARY_KM`].
pub fn bearing_if_moving(from: GeoPoint, to: GeoPoint) -> Option<f64> {
    if haversine_km(from, to) < STATIONARY_KM {
        return None;
    }
    Some(bearing_deg(from, to))
}

fn leg_bearing(from: GeoPoint, to: GeoPoint) -> Option<f64> {
    if from == to {
        None
    } else {
        Some(bearing_deg(from, to))
    }
}

fn time_of(segment: &Segment) -> f64 {
    segment.time_seconds.unwrap_or(0.0)
}
