//! Viewport follow logic for replay.
//!
//! The camera stays put until the aircraft drifts into the edge margin, then
//! recenters in one step. Frequent recenters mean the aircraft crosses the
//! screen faster than is comfortable to follow, so while auto-zoom is on the
//! camera backs off one zoom level at a time.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::geo::GeoPoint;

pub const DEFAULT_EDGE_MARGIN: f64 = 0.10;
pub const MAX_EDGE_MARGIN: f64 = 0.45;
pub const MIN_ZOOM: u8 = 1;
pub const MAX_ZOOM: u8 = 18;
/// Auto-zoom never goes below this level.
pub const AUTO_ZOOM_FLOOR: u8 = 9;
/// Recenter timestamps older than this are forgotten.
pub const RECENTER_HISTORY: Duration = Duration::from_secs(30);
pub const BURST_WINDOW: Duration = Duration::from_secs(5);
/// More than this many recenters inside [`BURST_WINDOW`] triggers a zoom out.
pub const BURST_LIMIT: usize = 2;

/// Position in viewport cells, origin top-left.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewportSize {
    pub width: f64,
    pub height: f64,
}

impl ViewportSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Advisory directive for the map; the renderer decides how to animate it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CameraCommand {
    Recenter(GeoPoint),
    ZoomTo(u8),
}

#[derive(Clone, Debug)]
pub struct AutoCamera {
    zoom: u8,
    auto_zoom: bool,
    margin: f64,
    recenters: Vec<Instant>,
}

impl AutoCamera {
    pub fn new(zoom: u8, auto_zoom: bool, margin: f64) -> Self {
        Self {
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
            auto_zoom,
            margin: clamp_margin(margin),
            recenters: Vec::new(),
        }
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    pub fn auto_zoom(&self) -> bool {
        self.auto_zoom
    }

    pub fn margin(&self) -> f64 {
        self.margin
    }

    pub fn recent_recenters(&self) -> usize {
        self.recenters.len()
    }

    /// Turning auto-zoom off stops further automatic changes; the current
    /// zoom is kept.
    pub fn set_auto_zoom(&mut self, enabled: bool) {
        self.auto_zoom = enabled;
        debug!("auto-zoom -> {}", if enabled { "on" } else { "off" });
    }

    pub fn toggle_auto_zoom(&mut self) {
        self.set_auto_zoom(!self.auto_zoom);
    }

    /// Manual zoom; clamped to the supported range.
    pub fn set_zoom(&mut self, zoom: u8) {
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        debug!("zoom -> {}", self.zoom);
    }

    pub fn zoom_in(&mut self) {
        self.set_zoom(self.zoom.saturating_add(1));
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom(self.zoom.saturating_sub(1));
    }

    /// True when `aircraft` lies within the edge margin of `viewport`, or
    /// outside it entirely.
    pub fn should_recenter(&self, aircraft: ScreenPoint, viewport: ViewportSize) -> bool {
        if viewport.width <= 0.0 || viewport.height <= 0.0 {
            return false;
        }
        let mx = viewport.width * self.margin;
        let my = viewport.height * self.margin;
        aircraft.x < mx
            || aircraft.x > viewport.width - mx
            || aircraft.y < my
            || aircraft.y > viewport.height - my
    }

    /// One camera evaluation for the current aircraft position.
    ///
    /// `screen` is where the renderer currently draws `aircraft`, or `None`
    /// when it is off the map. `force` recenters unconditionally (manual
    /// seeks). Any pending auto-zoom is decided before the recenter check,
    /// so evidence from earlier frames is acted on at the next evaluation.
    pub fn evaluate(
        &mut self,
        aircraft: GeoPoint,
        screen: Option<ScreenPoint>,
        viewport: ViewportSize,
        force: bool,
        now: Instant,
    ) -> Vec<CameraCommand> {
        let mut commands = Vec::new();
        self.prune(now);

        if self.auto_zoom && self.zoom > AUTO_ZOOM_FLOOR && self.has_burst() {
            self.zoom -= 1;
            self.recenters.clear();
            debug!("auto-zoom out -> {}", self.zoom);
            commands.push(CameraCommand::ZoomTo(self.zoom));
        }

        let needs_recenter = force
            || match screen {
                Some(point) => self.should_recenter(point, viewport),
                None => true,
            };
        if needs_recenter {
            self.recenters.push(now);
            commands.push(CameraCommand::Recenter(aircraft));
        }
        commands
    }

    fn prune(&mut self, now: Instant) {
        self.recenters
            .retain(|t| now.saturating_duration_since(*t) <= RECENTER_HISTORY);
    }

    fn has_burst(&self) -> bool {
        self.recenters
            .windows(BURST_LIMIT + 1)
            .any(|w| w[BURST_LIMIT].saturating_duration_since(w[0]) <= BURST_WINDOW)
    }
}

impl Default for AutoCamera {
    fn default() -> Self {
        Self::new(12, true, DEFAULT_EDGE_MARGIN)
    }
}

pub fn clamp_margin(margin: f64) -> f64 {
    if margin.is_finite() {
        margin.clamp(0.0, MAX_EDGE_MARGIN)
    } else {
        DEFAULT_EDGE_MARGIN
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport() -> ViewportSize {
        ViewportSize::new(100.0, 50.0)
    }

    fn center() -> Option<ScreenPoint> {
        Some(ScreenPoint::new(50.0, 25.0))
    }

    fn edge() -> Option<ScreenPoint> {
        Some(ScreenPoint::new(97.0, 25.0))
    }

    fn here() -> GeoPoint {
        GeoPoint::new(47.0, 8.0)
    }

    #[test]
    fn margin_detection() {
        let camera = AutoCamera::default();
        let vp = viewport();
        assert!(!camera.should_recenter(ScreenPoint::new(50.0, 25.0), vp));
        assert!(!camera.should_recenter(ScreenPoint::new(10.0, 5.0), vp));
        assert!(camera.should_recenter(ScreenPoint::new(9.9, 25.0), vp));
        assert!(camera.should_recenter(ScreenPoint::new(50.0, 45.5), vp));
        assert!(camera.should_recenter(ScreenPoint::new(-3.0, 25.0), vp));
        assert!(!camera.should_recenter(ScreenPoint::new(50.0, 25.0), ViewportSize::new(0.0, 0.0)));
    }

    #[test]
    fn recenters_only_at_the_edge_or_when_forced() {
        let mut camera = AutoCamera::default();
        let now = Instant::now();
        assert!(camera.evaluate(here(), center(), viewport(), false, now).is_empty());
        assert_eq!(
            camera.evaluate(here(), center(), viewport(), true, now),
            vec![CameraCommand::Recenter(here())]
        );
        assert_eq!(
            camera.evaluate(here(), None, viewport(), false, now),
            vec![CameraCommand::Recenter(here())]
        );
        assert_eq!(camera.recent_recenters(), 2);
    }

    #[test]
    fn burst_of_recenters_zooms_out_once() {
        let mut camera = AutoCamera::new(12, true, DEFAULT_EDGE_MARGIN);
        let t0 = Instant::now();
        for s in 0..3 {
            camera.evaluate(here(), edge(), viewport(), false, t0 + Duration::from_secs(s));
        }
        assert_eq!(camera.zoom(), 12);
        assert_eq!(camera.recent_recenters(), 3);

        let commands = camera.evaluate(here(), center(), viewport(), false, t0 + Duration::from_secs(3));
        assert_eq!(commands, vec![CameraCommand::ZoomTo(11)]);
        assert_eq!(camera.zoom(), 11);
        assert_eq!(camera.recent_recenters(), 0);

        let again = camera.evaluate(here(), center(), viewport(), false, t0 + Duration::from_secs(4));
        assert!(again.is_empty());
        assert_eq!(camera.zoom(), 11);
    }

    #[test]
    fn spread_out_recenters_do_not_zoom() {
        let mut camera = AutoCamera::default();
        let t0 = Instant::now();
        for s in [0, 4, 8, 12] {
            camera.evaluate(here(), edge(), viewport(), false, t0 + Duration::from_secs(s));
        }
        camera.evaluate(here(), center(), viewport(), false, t0 + Duration::from_secs(13));
        assert_eq!(camera.zoom(), 12);
    }

    #[test]
    fn old_recenters_are_pruned() {
        let mut camera = AutoCamera::default();
        let t0 = Instant::now();
        camera.evaluate(here(), edge(), viewport(), false, t0);
        camera.evaluate(here(), center(), viewport(), false, t0 + Duration::from_secs(31));
        assert_eq!(camera.recent_recenters(), 0);
    }

    #[test]
    fn zoom_floor_and_disabled_auto_zoom() {
        let t0 = Instant::now();
        let mut floored = AutoCamera::new(9, true, DEFAULT_EDGE_MARGIN);
        let mut disabled = AutoCamera::new(12, true, DEFAULT_EDGE_MARGIN);
        disabled.set_auto_zoom(false);
        for s in 0..4 {
            let now = t0 + Duration::from_millis(s * 500);
            floored.evaluate(here(), edge(), viewport(), false, now);
            disabled.evaluate(here(), edge(), viewport(), false, now);
        }
        assert_eq!(floored.zoom(), 9);
        assert_eq!(disabled.zoom(), 12);
    }

    #[test]
    fn manual_zoom_is_clamped() {
        let mut camera = AutoCamera::new(40, false, 2.0);
        assert_eq!(camera.zoom(), MAX_ZOOM);
        assert_eq!(camera.margin(), MAX_EDGE_MARGIN);
        camera.zoom_in();
        assert_eq!(camera.zoom(), MAX_ZOOM);
        camera.set_zoom(0);
        assert_eq!(camera.zoom(), MIN_ZOOM);
        camera.zoom_out();
        assert_eq!(camera.zoom(), MIN_ZOOM);
    }
}
