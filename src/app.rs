use std::time::{Duration, Instant};

use ratatui::layout::Rect;
use ratatui::widgets::TableState;
use tracing::{debug, info, warn};

use crate::camera::{AutoCamera, ViewportSize};
use crate::config::Config;
use crate::export;
use crate::filter::{available_aircraft, available_years, segments_for_path};
use crate::geo::GeoPoint;
use crate::map::{self, MapView};
use crate::model::{Criterion, Dataset, FilterCriteria, PathRecord, Segment};
use crate::replay::{ReplaySample, ReplayTimeline, TickOutcome};
use crate::selection::AnalyticsContext;

/// Relative seek applied by the arrow keys, in seconds of path time.
pub const SEEK_STEP_SECS: f64 = 30.0;
const STATUS_TTL: Duration = Duration::from_secs(6);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Help,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThemeMode {
    Default,
    ColorBlind,
    Amber,
    Ocean,
    Matrix,
    Monochrome,
}

impl ThemeMode {
    pub fn toggle(self) -> Self {
        match self {
            ThemeMode::Default => ThemeMode::ColorBlind,
            ThemeMode::ColorBlind => ThemeMode::Amber,
            ThemeMode::Amber => ThemeMode::Ocean,
            ThemeMode::Ocean => ThemeMode::Matrix,
            ThemeMode::Matrix => ThemeMode::Monochrome,
            ThemeMode::Monochrome => ThemeMode::Default,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ThemeMode::Default => "DEFAULT",
            ThemeMode::ColorBlind => "COLOR",
            ThemeMode::Amber => "AMBER",
            ThemeMode::Ocean => "OCEAN",
            ThemeMode::Matrix => "MATRIX",
            ThemeMode::Monochrome => "MONO",
        }
    }

    pub fn from_str(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "color" | "colorblind" | "cb" => ThemeMode::ColorBlind,
            "amber" | "gold" => ThemeMode::Amber,
            "ocean" | "blue" => ThemeMode::Ocean,
            "matrix" | "green" => ThemeMode::Matrix,
            "mono" | "monochrome" | "bw" | "grayscale" => ThemeMode::Monochrome,
            _ => ThemeMode::Default,
        }
    }
}

/// A running replay: the timeline, the camera following it and the
/// renderer's view of the trail.
pub struct ReplaySession {
    pub(crate) timeline: ReplayTimeline,
    pub(crate) camera: AutoCamera,
    /// Number of leading timeline segments currently drawn as trail.
    pub(crate) drawn: usize,
    pub(crate) sample: Option<ReplaySample>,
    force_recenter: bool,
}

impl ReplaySession {
    fn new(timeline: ReplayTimeline, camera: AutoCamera) -> Self {
        Self {
            timeline,
            camera,
            drawn: 0,
            sample: None,
            force_recenter: true,
        }
    }

    fn sync_trail(&mut self) {
        let update = self.timeline.take_trail_update();
        if update.reset {
            self.drawn = 0;
        }
        if !update.range.is_empty() {
            self.drawn = update.range.end;
        }
    }

    pub fn trail(&self) -> &[Segment] {
        let segments = self.timeline.segments();
        &segments[..self.drawn.min(segments.len())]
    }
}

pub struct App {
    pub(crate) ctx: AnalyticsContext,
    pub(crate) years: Vec<i64>,
    pub(crate) aircraft: Vec<String>,
    pub(crate) table_state: TableState,
    pub(crate) table_area: Option<Rect>,
    pub(crate) input_mode: InputMode,
    pub(crate) theme_mode: ThemeMode,
    pub(crate) speed: f64,
    pub(crate) auto_zoom: bool,
    pub(crate) edge_margin: f64,
    pub(crate) ui_interval: Duration,
    pub(crate) map: MapView,
    pub(crate) map_viewport: Option<ViewportSize>,
    pub(crate) session: Option<ReplaySession>,
    pub(crate) status: Option<(String, Instant)>,
    needs_fit: bool,
    last_frame: Option<Instant>,
}

impl App {
    pub fn new(dataset: Dataset, config: &Config) -> Self {
        let years = available_years(&dataset.paths);
        let aircraft = available_aircraft(&dataset.paths);
        let criteria = FilterCriteria::new(&config.year, &config.aircraft);
        let ctx = AnalyticsContext::new(dataset, criteria);
        let mut table_state = TableState::default();
        if !ctx.visible_paths().is_empty() {
            table_state.select(Some(0));
        }
        info!(
            "app ready: {} paths, {} years, {} aircraft",
            ctx.dataset().paths.len(),
            years.len(),
            aircraft.len()
        );
        Self {
            ctx,
            years,
            aircraft,
            table_state,
            table_area: None,
            input_mode: InputMode::Normal,
            theme_mode: ThemeMode::from_str(&config.theme),
            speed: config.speed,
            auto_zoom: config.auto_zoom,
            edge_margin: config.edge_margin,
            ui_interval: Duration::from_millis(1000 / config.ui_fps.max(1)),
            map: MapView::new(GeoPoint::default(), config.zoom),
            map_viewport: None,
            session: None,
            status: None,
            needs_fit: true,
            last_frame: None,
        }
    }

    pub fn visible_paths(&self) -> Vec<PathRecord> {
        self.ctx.visible_paths()
    }

    pub fn selected_row(&self) -> Option<usize> {
        self.table_state.selected()
    }

    pub fn next_row(&mut self, visible_len: usize) {
        if visible_len == 0 {
            self.table_state.select(None);
            return;
        }
        let next = match self.table_state.selected() {
            Some(i) if i + 1 < visible_len => i + 1,
            Some(_) => 0,
            None => 0,
        };
        self.table_state.select(Some(next));
    }

    pub fn previous_row(&mut self, visible_len: usize) {
        if visible_len == 0 {
            self.table_state.select(None);
            return;
        }
        let prev = match self.table_state.selected() {
            Some(0) | None => visible_len - 1,
            Some(i) => i - 1,
        };
        self.table_state.select(Some(prev));
    }

    pub fn set_table_area(&mut self, area: Rect) {
        self.table_area = Some(area);
    }

    /// Data row under terminal row `y`, below the border and header line.
    pub fn table_row_at(&self, y: u16) -> Option<usize> {
        let area = self.table_area?;
        if area.height < 3 {
            return None;
        }
        let data_top = area.y + 2;
        let data_bottom = area.y + area.height.saturating_sub(1);
        if y < data_top || y >= data_bottom {
            return None;
        }
        Some((y - data_top) as usize + self.table_state.offset())
    }

    pub fn select_row(&mut self, row: usize, visible_len: usize) {
        if visible_len == 0 {
            self.table_state.select(None);
            return;
        }
        self.table_state.select(Some(row.min(visible_len - 1)));
    }

    pub fn clamp_selection_to(&mut self, visible_len: usize) {
        match self.table_state.selected() {
            _ if visible_len == 0 => self.table_state.select(None),
            Some(i) if i >= visible_len => self.table_state.select(Some(visible_len - 1)),
            None => self.table_state.select(Some(0)),
            _ => {}
        }
    }

    /// Adds the path under the cursor to the selection, or removes it.
    pub fn toggle_row_selection(&mut self, visible: &[PathRecord]) {
        let Some(record) = self.selected_row().and_then(|i| visible.get(i)) else {
            return;
        };
        self.ctx.toggle_selection(record.id);
        debug!("selection -> {:?}", self.ctx.selection());
        self.after_selection_change();
    }

    pub fn clear_selection(&mut self) {
        if self.ctx.selection().is_empty() {
            return;
        }
        self.ctx.clear_selection();
        self.after_selection_change();
    }

    pub fn cycle_year(&mut self) {
        let options: Vec<String> = self.years.iter().map(|y| y.to_string()).collect();
        let next = next_option(self.ctx.criteria().year.label(), &options);
        self.ctx.set_year(Criterion::parse(&next));
        debug!("year filter -> {next}");
        self.after_filter_change();
    }

    pub fn cycle_aircraft(&mut self) {
        let next = next_option(self.ctx.criteria().aircraft.label(), &self.aircraft);
        self.ctx.set_aircraft(Criterion::parse(&next));
        debug!("aircraft filter -> {next}");
        self.after_filter_change();
    }

    pub fn toggle_play(&mut self) {
        match self.session.as_mut() {
            Some(session) => session.timeline.toggle_play(),
            None => self.start_replay(),
        }
    }

    /// Starts a fresh replay of the single selected path, discarding any
    /// previous one.
    pub fn start_replay(&mut self) {
        self.session = None;
        match self.ctx.start_replay() {
            Ok(timeline) => {
                let mut timeline = timeline.with_speed(self.speed);
                timeline.play();
                let camera = AutoCamera::new(self.map.zoom, self.auto_zoom, self.edge_margin);
                self.map.zoom = camera.zoom();
                info!("replay started for path {}", timeline.path_id());
                self.session = Some(ReplaySession::new(timeline, camera));
            }
            Err(err) => {
                warn!("replay unavailable: {err}");
                self.set_status(format!("Replay unavailable: {err}"));
            }
        }
    }

    pub fn stop_replay(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.timeline.stop();
            session.force_recenter = true;
        }
    }

    pub fn seek_by(&mut self, seconds: f64) {
        if let Some(session) = self.session.as_mut() {
            session.timeline.step(seconds);
            session.force_recenter = true;
        }
    }

    pub fn faster(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.timeline.faster();
            self.speed = session.timeline.speed();
        }
    }

    pub fn slower(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.timeline.slower();
            self.speed = session.timeline.speed();
        }
    }

    pub fn toggle_auto_zoom(&mut self) {
        self.auto_zoom = !self.auto_zoom;
        if let Some(session) = self.session.as_mut() {
            session.camera.set_auto_zoom(self.auto_zoom);
        }
        debug!("auto-zoom -> {}", if self.auto_zoom { "on" } else { "off" });
    }

    pub fn zoom_in(&mut self) {
        match self.session.as_mut() {
            Some(session) => {
                session.camera.zoom_in();
                self.map.zoom = session.camera.zoom();
            }
            None => self.map = MapView::new(self.map.center, self.map.zoom.saturating_add(1)),
        }
    }

    pub fn zoom_out(&mut self) {
        match self.session.as_mut() {
            Some(session) => {
                session.camera.zoom_out();
                self.map.zoom = session.camera.zoom();
            }
            None => self.map = MapView::new(self.map.center, self.map.zoom.saturating_sub(1)),
        }
    }

    pub fn toggle_theme(&mut self) {
        self.theme_mode = self.theme_mode.toggle();
        debug!("theme -> {}", self.theme_mode.label());
    }

    pub fn open_help(&mut self) {
        self.input_mode = InputMode::Help;
    }

    pub fn close_help(&mut self) {
        self.input_mode = InputMode::Normal;
    }

    pub fn export_csv(&mut self) {
        let result = export::export_csv(self.ctx.stats(), &self.ctx.scope().label());
        self.finish_export(result);
    }

    pub fn export_json(&mut self) {
        let result = export::export_json(self.ctx.stats(), &self.ctx.scope().label());
        self.finish_export(result);
    }

    pub fn set_map_area(&mut self, area: Rect) {
        let viewport = map::inner_viewport(area);
        if self.map_viewport != Some(viewport) {
            self.map_viewport = Some(viewport);
            if self.session.is_none() {
                self.needs_fit = true;
            }
        }
    }

    pub fn set_status(&mut self, message: String) {
        self.status = Some((message, Instant::now()));
    }

    pub fn current_status(&self, now: Instant) -> Option<&str> {
        self.status
            .as_ref()
            .filter(|(_, at)| now.saturating_duration_since(*at) <= STATUS_TTL)
            .map(|(msg, _)| msg.as_str())
    }

    /// Segments of the selected paths, for highlighting on the map.
    pub fn selected_segments(&self) -> Vec<Segment> {
        self.ctx
            .selection()
            .iter()
            .flat_map(|id| segments_for_path(&self.ctx.dataset().segments, *id))
            .collect()
    }

    /// Per-frame update: advances the replay clock by the wall time since
    /// the previous frame and lets the camera follow the aircraft.
    pub fn frame(&mut self, now: Instant) {
        let delta = self
            .last_frame
            .map(|last| now.saturating_duration_since(last).as_secs_f64())
            .unwrap_or(0.0);
        self.last_frame = Some(now);

        let viewport = self.map_viewport;
        if self.needs_fit && self.session.is_none() {
            if let Some(viewport) = viewport {
                self.fit_map(viewport);
            }
        }

        let Some(session) = self.session.as_mut() else {
            return;
        };
        let outcome = session.timeline.tick(delta);
        let sample = session.timeline.sample();
        session.sample = Some(sample);
        session.sync_trail();

        let Some(viewport) = viewport else {
            return;
        };
        if outcome == TickOutcome::Finished {
            let points = session
                .timeline
                .segments()
                .iter()
                .flat_map(|s| [s.start(), s.end()]);
            if let Some(view) = MapView::fit(points, viewport) {
                session.camera.set_zoom(view.zoom);
                self.map = MapView::new(view.center, session.camera.zoom());
            }
            info!("replay of path {} finished", session.timeline.path_id());
            return;
        }
        let point = sample.position.point;
        let screen = self.map.project(point, viewport);
        let force = std::mem::take(&mut session.force_recenter);
        for command in session.camera.evaluate(point, screen, viewport, force, now) {
            self.map.apply(command);
        }
    }

    fn fit_map(&mut self, viewport: ViewportSize) {
        let segments = if self.ctx.selection().is_empty() {
            self.ctx.visible_segments()
        } else {
            self.selected_segments()
        };
        if let Some(view) = MapView::fit(segments.iter().flat_map(|s| [s.start(), s.end()]), viewport) {
            self.map = view;
        }
        self.needs_fit = false;
    }

    fn after_selection_change(&mut self) {
        let still_valid = match (&self.session, self.ctx.replay_candidate()) {
            (Some(session), Some(id)) => session.timeline.path_id() == id,
            (Some(_), None) => false,
            (None, _) => true,
        };
        if !still_valid {
            debug!("selection changed; replay ended");
            self.session = None;
        }
        if self.session.is_none() {
            self.needs_fit = true;
        }
    }

    fn after_filter_change(&mut self) {
        let len = self.visible_paths().len();
        self.clamp_selection_to(len);
        if self.session.is_none() {
            self.needs_fit = true;
        }
    }

    fn finish_export(&mut self, result: anyhow::Result<String>) {
        match result {
            Ok(path) => {
                info!("exported statistics to {path}");
                self.set_status(format!("SAVED {path}"));
            }
            Err(err) => {
                warn!("export failed: {err:#}");
                self.set_status(format!("Export failed: {err:#}"));
            }
        }
    }
}

/// Option after `current` in `all` + `options`, wrapping back to `all`.
fn next_option(current: &str, options: &[String]) -> String {
    let all = std::iter::once("all").chain(options.iter().map(String::as_str));
    let list: Vec<&str> = all.collect();
    let pos = list.iter().position(|o| *o == current).unwrap_or(0);
    list[(pos + 1) % list.len()].to_string()
}
