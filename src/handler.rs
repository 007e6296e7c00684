use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use crate::app::{App, FocusPane, InputMode};
use crate::attachment::{image_mime_type, parse_dropped_path};
use crate::config::Config;
use crate::mode::Mode;
use crate::tui::AppEvent;

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key).await?,
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Paste(text) => handle_paste(app, &text),
        AppEvent::Resize => {}
        AppEvent::Tick => {
            app.tick_animation();
        }
    }
    Ok(())
}

async fn handle_key(app: &mut App, key: KeyEvent) -> Result<()> {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return Ok(());
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key).await,
        InputMode::Attaching => handle_attaching_mode(app, key),
    }

    Ok(())
}

fn switch_mode(app: &mut App, mode: Mode) {
    if app.mode == mode {
        return;
    }
    app.set_mode(mode);
    if let Err(e) = Config::save_default_mode(mode) {
        log::warn!("Could not save default mode: {}", e);
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        // Quit
        KeyCode::Char('q') => app.should_quit = true,

        // Mode selector
        KeyCode::Char('1') => switch_mode(app, Mode::Text),
        KeyCode::Char('2') => switch_mode(app, Mode::Image),
        KeyCode::Char('3') => switch_mode(app, Mode::Conversation),
        KeyCode::BackTab => {
            let next = app.mode.next();
            switch_mode(app, next);
        }

        KeyCode::Tab => app.cycle_focus(),

        // Start typing
        KeyCode::Char('i') => {
            app.focus = FocusPane::Input;
            app.input_mode = InputMode::Editing;
        }

        KeyCode::Char('j') | KeyCode::Down => match app.focus {
            FocusPane::Sources => app.sources_nav_down(),
            _ => app.scroll_down(1),
        },
        KeyCode::Char('k') | KeyCode::Up => match app.focus {
            FocusPane::Sources => app.sources_nav_up(),
            _ => app.scroll_up(1),
        },
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_down(10);
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_up(10);
        }
        KeyCode::Char('g') => app.scroll_to_top(),
        KeyCode::Char('G') => app.scroll_to_bottom(),

        KeyCode::Enter => match app.focus {
            FocusPane::Sources => {
                if let Some(source) = app.selected_source() {
                    let uri = source.uri.clone();
                    open_in_browser(&uri);
                    app.notice = Some(format!("Opened {}", uri));
                }
            }
            FocusPane::Input => app.input_mode = InputMode::Editing,
            FocusPane::Results => {}
        },

        // Microphone
        KeyCode::Char('m') => app.start_dictation(),

        // Image attachment (image mode only)
        KeyCode::Char('a') if app.mode == Mode::Image && !app.is_loading() => {
            app.attach_input.clear();
            app.input_mode = InputMode::Attaching;
        }
        KeyCode::Char('x') if app.mode == Mode::Image => app.remove_image(),

        KeyCode::Char('n') if app.mode == Mode::Conversation => app.new_conversation(),

        KeyCode::Char('e') => {
            if let Err(e) = app.export_current() {
                log::error!("Export failed: {}", e);
                app.notice = Some(format!("Export failed: {}", e));
            }
        }

        _ => {}
    }
}

async fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    let locked = app.input_locked();
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter if key.modifiers.contains(KeyModifiers::ALT) => {
            if !locked {
                app.input_mut().insert('\n');
            }
        }
        KeyCode::Enter => {
            if let Some(request) = app.submit().await {
                app.dispatch(request);
                if app.mode == Mode::Conversation {
                    app.focus = FocusPane::Results;
                }
            }
        }
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.start_dictation();
        }
        KeyCode::Backspace if !locked => app.input_mut().backspace(),
        KeyCode::Delete if !locked => app.input_mut().delete(),
        KeyCode::Left => app.input_mut().left(),
        KeyCode::Right => app.input_mut().right(),
        KeyCode::Home => app.input_mut().home(),
        KeyCode::End => app.input_mut().end(),
        KeyCode::Char(c) if !locked => app.input_mut().insert(c),
        _ => {}
    }
}

fn handle_attaching_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.attach_input.clear();
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => {
            let path = parse_dropped_path(app.attach_input.text());
            match app.attach_image(&path) {
                Ok(()) => {
                    app.attach_input.clear();
                    app.input_mode = InputMode::Normal;
                }
                Err(e) => app.notice = Some(e.to_string()),
            }
        }
        KeyCode::Backspace => app.attach_input.backspace(),
        KeyCode::Delete => app.attach_input.delete(),
        KeyCode::Left => app.attach_input.left(),
        KeyCode::Right => app.attach_input.right(),
        KeyCode::Home => app.attach_input.home(),
        KeyCode::End => app.attach_input.end(),
        KeyCode::Char(c) => app.attach_input.insert(c),
        _ => {}
    }
}

/// A paste that names an image file attaches it; anything else is typed text
fn handle_paste(app: &mut App, text: &str) {
    let path = parse_dropped_path(text);
    if image_mime_type(&path).is_some() && path.is_file() {
        if app.mode != Mode::Image {
            switch_mode(app, Mode::Image);
        }
        match app.attach_image(&path) {
            Ok(()) => {
                if app.input_mode == InputMode::Attaching {
                    app.attach_input.clear();
                    app.input_mode = InputMode::Normal;
                }
            }
            Err(e) => app.notice = Some(e.to_string()),
        }
        return;
    }

    match app.input_mode {
        InputMode::Attaching => app.attach_input.insert_str(text.trim()),
        _ if app.input_locked() => {}
        _ => {
            app.focus = FocusPane::Input;
            app.input_mode = InputMode::Editing;
            app.input_mut().insert_str(text);
        }
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let x = mouse.column;
    let y = mouse.row;

    let in_sources = app.sources_area.is_some_and(|r| point_in_rect(x, y, r));
    let in_body = app.results_area.is_some_and(|r| point_in_rect(x, y, r))
        || app.chat_area.is_some_and(|r| point_in_rect(x, y, r));

    match mouse.kind {
        MouseEventKind::ScrollDown => {
            if in_sources {
                app.sources_nav_down();
            } else if in_body {
                app.scroll_down(3);
            }
        }
        MouseEventKind::ScrollUp => {
            if in_sources {
                app.sources_nav_up();
            } else if in_body {
                app.scroll_up(3);
            }
        }
        _ => {}
    }
}

fn open_in_browser(uri: &str) {
    use std::process::{Command, Stdio};

    let mut command = if cfg!(target_os = "macos") {
        Command::new("open")
    } else if cfg!(target_os = "windows") {
        let mut c = Command::new("cmd");
        c.args(["/C", "start", ""]);
        c
    } else {
        Command::new("xdg-open")
    };

    if let Err(e) = command
        .arg(uri)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
    {
        log::warn!("Could not open {}: {}", uri, e);
    }
}
