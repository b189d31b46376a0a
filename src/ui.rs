use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Cell, Clear, Paragraph, Row, Table, Wrap};
use ratatui::Frame;
use std::time::Instant;

use crate::app::{App, InputMode, ThemeMode};
use crate::map::{self, MapLayers, MapTheme};
use crate::model::PathRecord;
use crate::replay::PlaybackState;
use crate::stats::StatisticsResult;

struct Theme {
    accent: Color,
    warn: Color,
    danger: Color,
    dim: Color,
    highlight_fg: Color,
    highlight_bg: Color,
    select: Color,
    row_even_bg: Color,
    row_odd_bg: Color,
    header_bg: Color,
    panel_bg: Color,
}

impl Theme {
    fn map(&self) -> MapTheme {
        MapTheme {
            accent: self.accent,
            dim: self.dim,
            select: self.select,
            aircraft: self.warn,
            panel_bg: self.panel_bg,
        }
    }
}

pub fn ui(f: &mut Frame, app: &mut App, visible: &[PathRecord]) {
    let size = f.area();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Min(10),
            Constraint::Length(1),
        ])
        .split(size);

    render_header(f, chunks[0], app, visible);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(chunks[1]);

    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(6), Constraint::Length(16)])
        .split(body[0]);
    render_table(f, side[0], app, visible);
    render_stats(f, side[1], app);

    let main = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(6), Constraint::Length(3)])
        .split(body[1]);
    render_map(f, main[0], app);
    render_replay_bar(f, main[1], app);

    render_footer(f, chunks[2], app);

    if app.input_mode == InputMode::Help {
        render_help_menu(f, size, app);
    }
}

fn render_header(f: &mut Frame, area: Rect, app: &App, visible: &[PathRecord]) {
    let theme = theme(app.theme_mode);
    let criteria = app.ctx.criteria();
    let selected = app.ctx.selection().len();

    let line_top = Line::from(vec![
        Span::styled(
            "FLIGHT REPLAY",
            Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | "),
        Span::styled(
            format!("PATHS {}/{}", visible.len(), app.ctx.dataset().paths.len()),
            Style::default().fg(Color::Cyan),
        ),
        Span::raw(" | "),
        Span::styled(format!("SELECTED {selected}"), Style::default().fg(theme.select)),
        Span::raw(" | "),
        Span::styled(
            format!("SCOPE {}", app.ctx.scope().label()),
            Style::default().fg(theme.accent),
        ),
    ]);

    let line_bottom = Line::from(vec![
        Span::raw(format!("YEAR {}", criteria.year)),
        Span::raw(" | "),
        Span::raw(format!("AIRCRAFT {}", criteria.aircraft)),
        Span::raw(" | "),
        Span::raw(format!("THEME {}", app.theme_mode.label())),
        Span::raw(" | "),
        Span::styled("MENU ", Style::default().fg(theme.dim)),
        Span::styled("[y]Year ", Style::default().fg(theme.dim)),
        Span::styled("[a]Aircraft ", Style::default().fg(theme.dim)),
        Span::styled("[p]Play ", Style::default().fg(theme.dim)),
        Span::styled("[e]Export ", Style::default().fg(theme.dim)),
        Span::styled("[?]Help", Style::default().fg(theme.dim)),
    ]);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title("LOGBOOK");
    let paragraph = Paragraph::new(vec![line_top, line_bottom])
        .block(block)
        .style(Style::default().bg(theme.panel_bg));
    f.render_widget(paragraph, area);
}

fn render_table(f: &mut Frame, area: Rect, app: &mut App, visible: &[PathRecord]) {
    let theme = theme(app.theme_mode);
    app.set_table_area(area);

    let labels = ["SEL", "ID", "YEAR", "REG", "TYPE", "ROUTE"];
    let widths = [3u16, 6, 4, 8, 5, 11];
    let header_cells = labels.iter().zip(widths.iter()).map(|(label, width)| {
        Cell::from(center_text(label, *width as usize)).style(
            Style::default()
                .fg(theme.accent)
                .bg(theme.header_bg)
                .add_modifier(Modifier::BOLD),
        )
    });
    let header = Row::new(header_cells)
        .style(Style::default().bg(theme.header_bg))
        .height(1);

    let rows = visible.iter().enumerate().map(|(i, record)| {
        let selected = app.ctx.selection().contains(&record.id);
        let mut style = if i % 2 == 0 {
            Style::default().bg(theme.row_even_bg)
        } else {
            Style::default().bg(theme.row_odd_bg)
        };
        if selected {
            style = style.fg(theme.select).add_modifier(Modifier::BOLD);
        }
        let cells = vec![
            Cell::from(if selected { "[x]" } else { "[ ]" }),
            Cell::from(record.id.to_string()),
            Cell::from(record.year.map(|y| y.to_string()).unwrap_or_else(|| "--".to_string())),
            Cell::from(fmt_text(record.aircraft_registration.as_deref())),
            Cell::from(fmt_text(record.aircraft_type.as_deref())),
            Cell::from(route_text(record)),
        ];
        Row::new(cells).style(style)
    });

    let constraints: Vec<Constraint> = widths.iter().map(|w| Constraint::Length(*w)).collect();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Plain)
        .title("FLIGHTS")
        .style(Style::default().bg(theme.panel_bg));

    let table = Table::new(rows, constraints)
        .header(header)
        .block(block)
        .column_spacing(1)
        .style(Style::default().bg(theme.panel_bg))
        .row_highlight_style(
            Style::default()
                .fg(theme.highlight_fg)
                .bg(theme.highlight_bg)
                .add_modifier(Modifier::BOLD),
        );

    f.render_stateful_widget(table, area, &mut app.table_state);
}

fn render_stats(f: &mut Frame, area: Rect, app: &App) {
    let theme = theme(app.theme_mode);
    let stats = app.ctx.stats();

    let mut lines = Vec::new();
    if stats.is_empty() {
        lines.push(stat_line("PATHS", "0".to_string(), &theme, true));
        lines.push(Line::from(Span::styled(
            "No flights in scope",
            Style::default().fg(theme.dim),
        )));
    } else {
        lines.push(stat_line(
            "PATHS",
            format!("{} ({} flights)", stats.num_paths, stats.total_flights),
            &theme,
            true,
        ));
        for (label, value) in stat_rows(stats) {
            lines.push(stat_line(label, value, &theme, false));
        }
        for aircraft in stats.aircraft.iter().take(3) {
            lines.push(stat_line(
                "AC",
                format!(
                    "{} {}x {}",
                    aircraft.registration, aircraft.flights, aircraft.flight_time
                ),
                &theme,
                false,
            ));
        }
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Plain)
        .title(format!("STATS {}", app.ctx.scope().label()));
    let paragraph = Paragraph::new(lines)
        .block(block)
        .style(Style::default().bg(theme.panel_bg));
    f.render_widget(paragraph, area);
}

fn stat_rows(stats: &StatisticsResult) -> Vec<(&'static str, String)> {
    vec![
        ("DISTANCE", fmt_distance(stats.total_distance_km, stats.total_distance_nm)),
        ("AVG DIST", fmt_distance(stats.average_distance_km, stats.average_distance_nm)),
        ("LONGEST", fmt_distance(stats.longest_flight_km, stats.longest_flight_nm)),
        (
            "ALTITUDE",
            format!("{:.0}-{:.0} ft", stats.min_altitude_ft, stats.max_altitude_ft),
        ),
        ("CLIMB", format!("{:.0} ft", stats.total_altitude_gain_ft)),
        (
            "SPEED",
            format!(
                "max {:.0} / avg {:.0} kt",
                stats.max_groundspeed_knots, stats.average_groundspeed_knots
            ),
        ),
        (
            "CRUISE",
            format!(
                "{:.0} kt @ {:.0} ft",
                stats.cruise_speed_knots, stats.most_common_cruise_altitude_ft
            ),
        ),
        ("TIME", stats.total_flight_time.clone()),
        ("AIRPORTS", stats.num_airports().to_string()),
        ("POINTS", stats.total_points.to_string()),
    ]
}

fn stat_line(label: &str, value: String, theme: &Theme, emphasize: bool) -> Line<'static> {
    let label = format!("{label:<10}");
    let label_style = if emphasize {
        Style::default()
            .fg(theme.accent)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(theme.dim)
    };
    let value_style = if emphasize {
        Style::default()
            .fg(theme.accent)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(theme.accent)
    };
    Line::from(vec![
        Span::styled(label, label_style),
        Span::styled(value, value_style),
    ])
}

fn render_map(f: &mut Frame, area: Rect, app: &mut App) {
    let theme = theme(app.theme_mode);
    app.set_map_area(area);

    let background = app.ctx.visible_segments();
    let selected = app.selected_segments();
    let (trail, aircraft, heading) = match &app.session {
        Some(session) => {
            let trail = session
                .trail()
                .iter()
                .enumerate()
                .map(|(i, segment)| (segment, session.timeline.altitude_fraction(i)))
                .collect::<Vec<_>>();
            let sample = session.sample;
            (
                trail,
                sample.map(|s| s.position.point),
                sample.and_then(|s| s.heading_deg),
            )
        }
        None => (Vec::new(), None, None),
    };
    let layers = MapLayers {
        background: &background,
        selected: &selected,
        trail,
        aircraft,
        heading_deg: heading,
    };
    let title = format!("MAP z{}", app.map.zoom);
    map::render(f, area, app.map, &layers, theme.map(), &title);
}

fn render_replay_bar(f: &mut Frame, area: Rect, app: &App) {
    let theme = theme(app.theme_mode);
    let line = match &app.session {
        Some(session) => {
            let timeline = &session.timeline;
            let state_style = match timeline.state() {
                PlaybackState::Playing => Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
                PlaybackState::Paused => Style::default().fg(theme.warn),
                PlaybackState::Stopped => Style::default().fg(theme.dim),
            };
            let bar_width = area.width.saturating_sub(70).max(10) as usize;
            let mut spans = vec![
                Span::styled(format!("{:<8}", timeline.state().label()), state_style),
                Span::raw(format!(
                    "{} / {} ",
                    format_clock(timeline.current_time()),
                    format_clock(timeline.max_time())
                )),
                Span::styled(
                    progress_bar(timeline.progress(), bar_width),
                    Style::default().fg(theme.accent),
                ),
                Span::raw(format!(" {}x", timeline.speed())),
                Span::raw(format!(" Z{}", session.camera.zoom())),
                Span::styled(
                    if session.camera.auto_zoom() { " AUTO" } else { " MANUAL" },
                    Style::default().fg(theme.dim),
                ),
            ];
            if let Some(sample) = session.sample {
                spans.push(Span::raw(format!(
                    "  ALT {:.0} ft  GS {}  HDG {}",
                    sample.position.altitude_ft,
                    fmt_knots(sample.position.groundspeed_knots),
                    fmt_heading(sample.heading_deg)
                )));
            }
            Line::from(spans)
        }
        None => {
            let hint = match app.ctx.replay_candidate() {
                Some(id) => format!("Path {id} ready: press p to replay"),
                None => "Select exactly one flight to replay".to_string(),
            };
            Line::from(Span::styled(hint, Style::default().fg(theme.dim)))
        }
    };
    let title = match &app.session {
        Some(session) => format!("REPLAY path {}", session.timeline.path_id()),
        None => "REPLAY".to_string(),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Plain)
        .title(title);
    let paragraph = Paragraph::new(line)
        .block(block)
        .style(Style::default().bg(theme.panel_bg));
    f.render_widget(paragraph, area);
}

fn render_footer(f: &mut Frame, area: Rect, app: &App) {
    let theme = theme(app.theme_mode);
    let help = "q quit  space select  c clear  y year  a aircraft  p play  x stop  ←/→ seek  +/- speed  z auto-zoom  [/] zoom  e/E export  t theme  ? help";
    let mut spans = vec![Span::styled(help, Style::default().fg(theme.dim))];
    if let Some(message) = app.current_status(Instant::now()) {
        let color = if message.starts_with("SAVED") {
            theme.accent
        } else {
            theme.danger
        };
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            message.to_string(),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ));
    }
    let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(theme.panel_bg));
    f.render_widget(paragraph, area);
}

fn render_help_menu(f: &mut Frame, area: Rect, app: &App) {
    let theme = theme(app.theme_mode);
    let popup = centered_rect(60, 24, area);

    f.render_widget(Clear, popup);

    let section = |title: &'static str| {
        Line::from(Span::styled(
            title,
            Style::default().fg(theme.dim).add_modifier(Modifier::BOLD),
        ))
    };
    let lines = vec![
        Line::from(Span::styled(
            "HELP",
            Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
        )),
        section("Flights"),
        Line::from("  ↑/↓        Move cursor"),
        Line::from("  Space      Select / deselect flight"),
        Line::from("  c          Clear selection"),
        Line::from("  y / a      Cycle year / aircraft filter"),
        Line::from("  Mouse      Scroll to move • Click row to select"),
        Line::from(""),
        section("Replay"),
        Line::from("  p / Enter  Play / pause the selected flight"),
        Line::from("  x          Stop and rewind"),
        Line::from("  ←/→        Seek 30s back / forward"),
        Line::from("  + / -      Faster / slower"),
        Line::from("  z          Toggle auto-zoom"),
        Line::from("  [ / ]      Zoom out / in"),
        Line::from(""),
        section("Export & Display"),
        Line::from("  e / E      Export statistics CSV / JSON"),
        Line::from("  t          Toggle theme"),
        Line::from(""),
        Line::from("  q          Quit"),
        Line::from(Span::styled(
            "Press Esc to close",
            Style::default().fg(theme.dim),
        )),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title("HELP");
    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: true })
        .style(Style::default().bg(theme.panel_bg));
    f.render_widget(paragraph, popup);
}

fn centered_rect(percent_x: u16, height: u16, area: Rect) -> Rect {
    let height = height.min(area.height.saturating_sub(2)).max(3);
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(height),
            Constraint::Min(1),
        ])
        .split(area);
    let vertical = popup_layout[1];
    let width = (vertical.width * percent_x / 100).max(20);
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(width),
            Constraint::Min(1),
        ])
        .split(vertical);
    horizontal[1]
}

fn fmt_text(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => "--".to_string(),
    }
}

fn route_text(record: &PathRecord) -> String {
    match (record.start_airport.as_deref(), record.end_airport.as_deref()) {
        (None, None) => "--".to_string(),
        (from, to) => format!("{}>{}", fmt_text(from), fmt_text(to)),
    }
}

fn fmt_distance(km: f64, nm: f64) -> String {
    format!("{km:.1} km / {nm:.1} nm")
}

fn fmt_knots(value: Option<f64>) -> String {
    value
        .map(|kt| format!("{kt:.0} kt"))
        .unwrap_or_else(|| "--".to_string())
}

fn fmt_heading(value: Option<f64>) -> String {
    value
        .map(|deg| format!("{:03.0}°", deg.rem_euclid(360.0)))
        .unwrap_or_else(|| "--".to_string())
}

/// `M:SS`, or `H:MM:SS` from one hour up.
fn format_clock(seconds: f64) -> String {
    let total = if seconds.is_finite() {
        seconds.max(0.0) as u64
    } else {
        0
    };
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}

fn progress_bar(fraction: f64, width: usize) -> String {
    let fraction = if fraction.is_finite() {
        fraction.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let filled = (fraction * width as f64).round() as usize;
    let mut bar = String::with_capacity(width + 2);
    bar.push('[');
    bar.push_str(&"#".repeat(filled));
    bar.push_str(&".".repeat(width - filled));
    bar.push(']');
    bar
}

fn center_text(value: &str, width: usize) -> String {
    let len = value.chars().count();
    if width == 0 || len >= width {
        return value.to_string();
    }
    let pad_left = (width - len) / 2;
    let pad_right = width - len - pad_left;
    format!("{}{value}{}", " ".repeat(pad_left), " ".repeat(pad_right))
}

fn theme(mode: ThemeMode) -> Theme {
    match mode {
        ThemeMode::Default => Theme {
            accent: Color::Yellow,
            warn: Color::LightMagenta,
            danger: Color::Red,
            dim: Color::DarkGray,
            highlight_fg: Color::Black,
            highlight_bg: Color::Rgb(200, 200, 200),
            select: Color::LightBlue,
            row_even_bg: Color::Rgb(20, 20, 24),
            row_odd_bg: Color::Rgb(12, 12, 16),
            header_bg: Color::Rgb(24, 24, 28),
            panel_bg: Color::Rgb(18, 18, 22),
        },
        ThemeMode::ColorBlind => Theme {
            accent: Color::Cyan,
            warn: Color::LightCyan,
            danger: Color::LightRed,
            dim: Color::DarkGray,
            highlight_fg: Color::Black,
            highlight_bg: Color::LightCyan,
            select: Color::Yellow,
            row_even_bg: Color::Rgb(16, 22, 26),
            row_odd_bg: Color::Rgb(10, 16, 20),
            header_bg: Color::Rgb(20, 26, 30),
            panel_bg: Color::Rgb(14, 20, 24),
        },
        ThemeMode::Amber => Theme {
            accent: Color::Rgb(255, 191, 0),
            warn: Color::Rgb(255, 220, 120),
            danger: Color::LightRed,
            dim: Color::Rgb(140, 110, 40),
            highlight_fg: Color::Black,
            highlight_bg: Color::Rgb(255, 220, 120),
            select: Color::LightBlue,
            row_even_bg: Color::Rgb(28, 22, 12),
            row_odd_bg: Color::Rgb(20, 16, 10),
            header_bg: Color::Rgb(32, 24, 14),
            panel_bg: Color::Rgb(24, 18, 10),
        },
        ThemeMode::Ocean => Theme {
            accent: Color::Rgb(0, 200, 220),
            warn: Color::LightYellow,
            danger: Color::LightRed,
            dim: Color::Rgb(80, 120, 130),
            highlight_fg: Color::Black,
            highlight_bg: Color::Rgb(0, 200, 220),
            select: Color::LightYellow,
            row_even_bg: Color::Rgb(10, 20, 26),
            row_odd_bg: Color::Rgb(8, 16, 22),
            header_bg: Color::Rgb(12, 24, 30),
            panel_bg: Color::Rgb(10, 18, 24),
        },
        ThemeMode::Matrix => Theme {
            accent: Color::Green,
            warn: Color::LightGreen,
            danger: Color::LightRed,
            dim: Color::Rgb(0, 120, 0),
            highlight_fg: Color::Black,
            highlight_bg: Color::Green,
            select: Color::LightCyan,
            row_even_bg: Color::Rgb(0, 18, 0),
            row_odd_bg: Color::Rgb(0, 12, 0),
            header_bg: Color::Rgb(0, 22, 0),
            panel_bg: Color::Rgb(0, 16, 0),
        },
        ThemeMode::Monochrome => Theme {
            accent: Color::White,
            warn: Color::Gray,
            danger: Color::White,
            dim: Color::DarkGray,
            highlight_fg: Color::Black,
            highlight_bg: Color::White,
            select: Color::Gray,
            row_even_bg: Color::Rgb(18, 18, 18),
            row_odd_bg: Color::Rgb(10, 10, 10),
            header_bg: Color::Rgb(24, 24, 24),
            panel_bg: Color::Rgb(14, 14, 14),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_formatting() {
        assert_eq!(format_clock(0.0), "0:00");
        assert_eq!(format_clock(59.9), "0:59");
        assert_eq!(format_clock(754.0), "12:34");
        assert_eq!(format_clock(3723.0), "1:02:03");
        assert_eq!(format_clock(-5.0), "0:00");
        assert_eq!(format_clock(f64::NAN), "0:00");
    }

    #[test]
    fn test_progress_bar() {
        assert_eq!(progress_bar(0.0, 4), "[....]");
        assert_eq!(progress_bar(0.5, 4), "[##..]");
        assert_eq!(progress_bar(2.0, 4), "[####]");
        assert_eq!(progress_bar(f64::NAN, 2), "[..]");
    }

    #[test]
    fn test_text_helpers() {
        assert_eq!(fmt_text(None), "--");
        assert_eq!(fmt_text(Some("  ")), "--");
        assert_eq!(fmt_text(Some("D-EABC")), "D-EABC");
        assert_eq!(center_text("A", 3), " A ");
        assert_eq!(center_text("ABC", 2), "ABC");
        assert_eq!(fmt_heading(Some(370.0)), "010°");
        assert_eq!(fmt_heading(None), "--");
        assert_eq!(fmt_knots(Some(101.6)), "102 kt");
    }

    #[test]
    fn test_route_text() {
        let mut record = PathRecord::default();
        assert_eq!(route_text(&record), "--");
        record.start_airport = Some("EDDF".to_string());
        assert_eq!(route_text(&record), "EDDF>--");
        record.end_airport = Some("EDDM".to_string());
        assert_eq!(route_text(&record), "EDDF>EDDM");
    }

    #[test]
    fn test_stat_rows_cover_headline_metrics() {
        let stats = StatisticsResult {
            total_distance_km: 10.0,
            total_distance_nm: 5.4,
            ..StatisticsResult::default()
        };
        let rows = stat_rows(&stats);
        assert_eq!(rows[0], ("DISTANCE", "10.0 km / 5.4 nm".to_string()));
        assert!(rows.iter().any(|(label, value)| *label == "TIME" && value == "0h 0m"));
    }
}
