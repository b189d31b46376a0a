use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::symbols::Marker;
use ratatui::text::{Line as TextLine, Span};
use ratatui::widgets::canvas::{Canvas, Line as CanvasLine, Points};
use ratatui::widgets::{Block, BorderType, Borders, Paragraph, Wrap};
use ratatui::Frame;

use crate::camera::{CameraCommand, ScreenPoint, ViewportSize, MAX_ZOOM, MIN_ZOOM};
use crate::geo::GeoPoint;
use crate::model::Segment;

/// Terminal columns covered by one 256 px map tile.
const CELLS_PER_TILE: f64 = 32.0;
/// Terminal cells are roughly twice as tall as they are wide.
const CELL_ASPECT: f64 = 2.0;
const FIT_PADDING: f64 = 0.1;
const HEADING_CELLS: f64 = 3.0;

/// Centre and zoom of the map canvas, Web-map style: each zoom level halves
/// the visible span.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MapView {
    pub center: GeoPoint,
    pub zoom: u8,
}

impl MapView {
    pub fn new(center: GeoPoint, zoom: u8) -> Self {
        Self {
            center,
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
        }
    }

    /// Degrees of longitude per column and latitude per row.
    pub fn cell_size(&self) -> (f64, f64) {
        let lon = 360.0 / 2f64.powi(self.zoom as i32) / CELLS_PER_TILE;
        let lat = lon * CELL_ASPECT * self.center.lat.to_radians().cos().abs().max(0.01);
        (lon, lat)
    }

    /// `(west, east)` and `(south, north)` edges for a viewport.
    pub fn bounds(&self, viewport: ViewportSize) -> ([f64; 2], [f64; 2]) {
        let (lon_cell, lat_cell) = self.cell_size();
        let half_w = viewport.width * lon_cell / 2.0;
        let half_h = viewport.height * lat_cell / 2.0;
        (
            [self.center.lon - half_w, self.center.lon + half_w],
            [self.center.lat - half_h, self.center.lat + half_h],
        )
    }

    /// Screen position of `point` in cells from the top-left corner, or
    /// `None` when it falls outside the viewport.
    pub fn project(&self, point: GeoPoint, viewport: ViewportSize) -> Option<ScreenPoint> {
        let (lon_cell, lat_cell) = self.cell_size();
        let ([west, _], [_, north]) = self.bounds(viewport);
        let x = (point.lon - west) / lon_cell;
        let y = (north - point.lat) / lat_cell;
        if x < 0.0 || y < 0.0 || x > viewport.width || y > viewport.height {
            return None;
        }
        Some(ScreenPoint::new(x, y))
    }

    pub fn apply(&mut self, command: CameraCommand) {
        match command {
            CameraCommand::Recenter(point) => self.center = point,
            CameraCommand::ZoomTo(zoom) => self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM),
        }
    }

    /// Largest zoom at which every point fits inside `viewport` with a
    /// little padding. `None` without points or with an empty viewport.
    pub fn fit(points: impl IntoIterator<Item = GeoPoint>, viewport: ViewportSize) -> Option<Self> {
        if viewport.width <= 0.0 || viewport.height <= 0.0 {
            return None;
        }
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let (mut south, mut north, mut west, mut east) = (first.lat, first.lat, first.lon, first.lon);
        for p in iter {
            south = south.min(p.lat);
            north = north.max(p.lat);
            west = west.min(p.lon);
            east = east.max(p.lon);
        }
        let center = GeoPoint::new((south + north) / 2.0, (west + east) / 2.0);
        let usable = ViewportSize::new(
            viewport.width * (1.0 - 2.0 * FIT_PADDING),
            viewport.height * (1.0 - 2.0 * FIT_PADDING),
        );
        let zoom = (MIN_ZOOM..=MAX_ZOOM)
            .rev()
            .find(|z| {
                let (lon_cell, lat_cell) = MapView::new(center, *z).cell_size();
                (east - west) <= usable.width * lon_cell && (north - south) <= usable.height * lat_cell
            })
            .unwrap_or(MIN_ZOOM);
        Some(Self::new(center, zoom))
    }
}

impl Default for MapView {
    fn default() -> Self {
        Self::new(GeoPoint::default(), 12)
    }
}

#[derive(Clone, Copy)]
pub struct MapTheme {
    pub accent: Color,
    pub dim: Color,
    pub select: Color,
    pub aircraft: Color,
    pub panel_bg: Color,
}

/// One frame's worth of things to draw.
pub struct MapLayers<'a> {
    /// Every visible path, drawn dim.
    pub background: &'a [Segment],
    /// Selected paths, drawn highlighted.
    pub selected: &'a [Segment],
    /// Replay trail with an altitude fraction per segment.
    pub trail: Vec<(&'a Segment, f64)>,
    pub aircraft: Option<GeoPoint>,
    pub heading_deg: Option<f64>,
}

/// Inner drawing area of the map block, in cells.
pub fn inner_viewport(area: Rect) -> ViewportSize {
    ViewportSize::new(
        area.width.saturating_sub(2) as f64,
        area.height.saturating_sub(2) as f64,
    )
}

pub fn render(f: &mut Frame, area: Rect, view: MapView, layers: &MapLayers, theme: MapTheme, title: &str) {
    let viewport = inner_viewport(area);
    if layers.background.is_empty() || area.width < 8 || area.height < 6 {
        render_empty(f, area, theme, title);
        return;
    }
    let (x_bounds, y_bounds) = view.bounds(viewport);
    let (lon_cell, lat_cell) = view.cell_size();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Plain)
        .title(title.to_string());
    let canvas = Canvas::default()
        .block(block)
        .x_bounds(x_bounds)
        .y_bounds(y_bounds)
        .background_color(theme.panel_bg)
        .marker(Marker::Braille)
        .paint(|ctx| {
            for segment in layers.background {
                ctx.draw(&segment_line(segment, theme.dim));
            }
            for segment in layers.selected {
                ctx.draw(&segment_line(segment, theme.select));
            }
            ctx.layer();
            for (segment, fraction) in &layers.trail {
                ctx.draw(&segment_line(segment, altitude_color(*fraction)));
            }
            if let Some(point) = layers.aircraft {
                if let Some(heading) = layers.heading_deg {
                    let rad = heading.to_radians();
                    ctx.draw(&CanvasLine {
                        x1: point.lon,
                        y1: point.lat,
                        x2: point.lon + rad.sin() * HEADING_CELLS * lon_cell,
                        y2: point.lat + rad.cos() * HEADING_CELLS * lat_cell,
                        color: theme.accent,
                    });
                }
                ctx.draw(&Points {
                    coords: &[(point.lon, point.lat)],
                    color: theme.aircraft,
                });
            }
        });
    f.render_widget(canvas, area);
}

fn segment_line(segment: &Segment, color: Color) -> CanvasLine {
    let [from, to] = segment.coords;
    CanvasLine {
        x1: from[1],
        y1: from[0],
        x2: to[1],
        y2: to[0],
        color,
    }
}

/// Blue (low) through green and yellow to red (high).
pub fn altitude_color(fraction: f64) -> Color {
    let t = if fraction.is_finite() {
        fraction.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let (r, g, b) = if t < 1.0 / 3.0 {
        let k = t * 3.0;
        (0.0, 120.0 + 135.0 * k, 255.0 * (1.0 - k))
    } else if t < 2.0 / 3.0 {
        let k = (t - 1.0 / 3.0) * 3.0;
        (255.0 * k, 255.0, 0.0)
    } else {
        let k = (t - 2.0 / 3.0) * 3.0;
        (255.0, 255.0 * (1.0 - k), 0.0)
    };
    Color::Rgb(r.round() as u8, g.round() as u8, b.round() as u8)
}

fn render_empty(f: &mut Frame, area: Rect, theme: MapTheme, title: &str) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Plain)
        .title(title.to_string());
    let paragraph = Paragraph::new(vec![TextLine::from(Span::styled(
        "No tracks for the current filter",
        Style::default().fg(theme.dim),
    ))])
    .block(block)
    .wrap(Wrap { trim: true })
    .style(Style::default().bg(theme.panel_bg));
    f.render_widget(paragraph, area);
}
