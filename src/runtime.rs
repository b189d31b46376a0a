use anyhow::Result;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, MouseButton,
    MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io::{self, Stdout};
use std::time::Instant;

use crate::app::{App, InputMode, SEEK_STEP_SECS};
use crate::model::PathRecord;
use crate::ui;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub fn init_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    Ok(terminal)
}

pub fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

pub fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, mut app: App) -> Result<()> {
    loop {
        app.frame(Instant::now());

        let visible = app.visible_paths();
        app.clamp_selection_to(visible.len());
        terminal.draw(|f| ui::ui(f, &mut app, &visible))?;

        if event::poll(app.ui_interval)? {
            match event::read()? {
                Event::Key(key) => {
                    if handle_key(&mut app, &visible, key) == Flow::Quit {
                        return Ok(());
                    }
                }
                Event::Mouse(mouse) => handle_mouse(&mut app, &visible, mouse),
                _ => {}
            }
        }
    }
}

pub fn handle_key(app: &mut App, visible: &[PathRecord], key: KeyEvent) -> Flow {
    match app.input_mode {
        InputMode::Normal => match key.code {
            KeyCode::Char('q') => return Flow::Quit,
            KeyCode::Down => app.next_row(visible.len()),
            KeyCode::Up => app.previous_row(visible.len()),
            KeyCode::Char(' ') => app.toggle_row_selection(visible),
            KeyCode::Char('c') => app.clear_selection(),
            KeyCode::Char('y') => app.cycle_year(),
            KeyCode::Char('a') => app.cycle_aircraft(),
            KeyCode::Char('p') | KeyCode::Enter => app.toggle_play(),
            KeyCode::Char('x') => app.stop_replay(),
            KeyCode::Left => app.seek_by(-SEEK_STEP_SECS),
            KeyCode::Right => app.seek_by(SEEK_STEP_SECS),
            KeyCode::Char('+') | KeyCode::Char('=') => app.faster(),
            KeyCode::Char('-') => app.slower(),
            KeyCode::Char('z') => app.toggle_auto_zoom(),
            KeyCode::Char(']') => app.zoom_in(),
            KeyCode::Char('[') => app.zoom_out(),
            KeyCode::Char('e') => app.export_csv(),
            KeyCode::Char('E') => app.export_json(),
            KeyCode::Char('t') => app.toggle_theme(),
            KeyCode::Char('?') | KeyCode::Char('h') => app.open_help(),
            _ => {}
        },
        InputMode::Help => match key.code {
            KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('h') => app.close_help(),
            KeyCode::Char('q') => return Flow::Quit,
            _ => {}
        },
    }
    Flow::Continue
}

fn handle_mouse(app: &mut App, visible: &[PathRecord], mouse: MouseEvent) {
    if app.input_mode != InputMode::Normal {
        return;
    }
    match mouse.kind {
        MouseEventKind::ScrollUp => app.previous_row(visible.len()),
        MouseEventKind::ScrollDown => app.next_row(visible.len()),
        MouseEventKind::Down(MouseButton::Left) => {
            if let Some(row) = app.table_row_at(mouse.row) {
                app.select_row(row, visible.len());
            }
        }
        _ => {}
    }
}
