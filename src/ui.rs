use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Margin, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{
        Block, Borders, Clear, List, ListItem, Paragraph, Scrollbar, ScrollbarOrientation,
        ScrollbarState, Tabs, Wrap,
    },
};
use crate::app::{App, FocusPane, InputMode, SearchPanel};
use crate::format::{self, Density};
use crate::mode::Mode;
use crate::state::{ChatHistoryItem, ChatRole, Source};

type StyledChar = (char, Style);

/// Runs of whitespace and non-whitespace characters
fn tokens(chars: &[StyledChar]) -> Vec<&[StyledChar]> {
    let mut out = Vec::new();
    let mut start = 0;
    for i in 1..=chars.len() {
        if i == chars.len() || chars[i].0.is_whitespace() != chars[start].0.is_whitespace() {
            out.push(&chars[start..i]);
            start = i;
        }
    }
    out
}

fn styled_row(row: Vec<StyledChar>, source: &Line) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut text = String::new();
    let mut current: Option<Style> = None;
    for (c, style) in row {
        if current != Some(style) {
            if let Some(prev) = current {
                spans.push(Span::styled(std::mem::take(&mut text), prev));
            }
            current = Some(style);
        }
        text.push(c);
    }
    if let Some(prev) = current {
        spans.push(Span::styled(text, prev));
    }

    let mut line = Line::from(spans).style(source.style);
    line.alignment = source.alignment;
    line
}

/// Close a row, dropping the spaces it broke at
fn push_row(rows: &mut Vec<Vec<StyledChar>>, row: &mut Vec<StyledChar>) {
    let mut done = std::mem::take(row);
    while done.last().is_some_and(|(c, _)| c.is_whitespace()) {
        done.pop();
    }
    rows.push(done);
}

/// Wrap one styled line at word boundaries; words wider than a row are split
fn wrap_line(line: &Line, width: usize) -> Vec<Line<'static>> {
    let chars: Vec<StyledChar> = line
        .spans
        .iter()
        .flat_map(|span| span.content.chars().map(move |c| (c, span.style)))
        .collect();

    let mut rows: Vec<Vec<StyledChar>> = Vec::new();
    let mut row: Vec<StyledChar> = Vec::new();

    for token in tokens(&chars) {
        if token[0].0.is_whitespace() {
            // Continuation rows don't start with the space we broke at
            if row.is_empty() && !rows.is_empty() {
                continue;
            }
            if row.len() + token.len() <= width {
                row.extend_from_slice(token);
            } else {
                push_row(&mut rows, &mut row);
            }
            continue;
        }

        if !row.is_empty() && row.len() + token.len() > width {
            push_row(&mut rows, &mut row);
        }
        for chunk in token.chunks(width) {
            if row.len() + chunk.len() > width {
                push_row(&mut rows, &mut row);
            }
            row.extend_from_slice(chunk);
        }
    }

    if !row.is_empty() || rows.is_empty() {
        push_row(&mut rows, &mut row);
    }
    rows.into_iter().map(|row| styled_row(row, line)).collect()
}

/// Pre-wrap `lines` to `width` columns so every returned line is one screen row
fn wrap_lines(lines: &[Line], width: u16) -> Vec<Line<'static>> {
    let width = width.max(1) as usize;
    lines.iter().flat_map(|line| wrap_line(line, width)).collect()
}

fn row_count(lines: &[Line]) -> u16 {
    lines.len().min(u16::MAX as usize) as u16
}

fn border_color(focused: bool) -> Color {
    if focused { Color::Cyan } else { Color::DarkGray }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, mode selector, body, footer
    let [header_area, tabs_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_mode_selector(app, frame, tabs_area);

    app.results_area = None;
    app.sources_area = None;
    app.chat_area = None;

    match app.mode {
        Mode::Text | Mode::Image => render_search_screen(app, frame, body_area),
        Mode::Conversation => render_conversation_screen(app, frame, body_area),
    }

    render_footer(app, frame, footer_area);

    if app.input_mode == InputMode::Attaching {
        render_attach_popup(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let mut spans = vec![
        Span::styled(" Grounded Search ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(format!(" {} ", app.model), Style::default().fg(Color::Gray)),
    ];
    if app.client.is_none() {
        spans.push(Span::styled(" no API key ", Style::default().fg(Color::Red).bold()));
    }
    if let Some(notice) = &app.notice {
        spans.push(Span::styled(format!(" {} ", notice), Style::default().fg(Color::Yellow)));
    }
    spans.push(Span::styled(
        format!(" v{}", env!("CARGO_PKG_VERSION")),
        Style::default().fg(Color::Gray),
    ));

    let header = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_mode_selector(app: &App, frame: &mut Frame, area: Rect) {
    let titles: Vec<Line> = Mode::all()
        .iter()
        .enumerate()
        .map(|(i, mode)| Line::from(format!(" {} {} ", i + 1, mode.label())))
        .collect();

    let tabs = Tabs::new(titles)
        .select(app.mode.index())
        .style(Style::default().fg(Color::Gray))
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .divider(" ");

    frame.render_widget(tabs, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing | InputMode::Attaching => Style::default().bg(Color::Yellow).fg(Color::Black),
    };

    let mode_text = match app.mode {
        Mode::Text => " TEXT ",
        Mode::Image => " IMAGE ",
        Mode::Conversation => " CHAT ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);
    let hint = |key: &'static str, label: &'static str| {
        [Span::styled(key, key_style), Span::styled(label, label_style)]
    };

    let mut hints: Vec<Span> = Vec::new();
    match app.input_mode {
        InputMode::Attaching => {
            hints.extend(hint(" Enter ", " attach "));
            hints.extend(hint(" Esc ", " cancel "));
        }
        InputMode::Editing => {
            hints.extend(hint(" Enter ", " send "));
            hints.extend(hint(" Alt+Enter ", " newline "));
            if app.dictation.is_some() {
                hints.extend(hint(" Ctrl+D ", " dictate "));
            }
            hints.extend(hint(" Esc ", " stop typing "));
        }
        InputMode::Normal => {
            hints.extend(hint(" 1/2/3 ", " mode "));
            hints.extend(hint(" Tab ", " focus "));
            match app.focus {
                FocusPane::Sources => {
                    hints.extend(hint(" j/k ", " source "));
                    hints.extend(hint(" Enter ", " open "));
                }
                FocusPane::Results => hints.extend(hint(" j/k ", " scroll ")),
                FocusPane::Input => hints.extend(hint(" i ", " type ")),
            }
            if app.mode == Mode::Image {
                hints.extend(hint(" a ", " attach "));
                if app.image_attachment.is_some() {
                    hints.extend(hint(" x ", " remove "));
                }
            }
            if app.mode == Mode::Conversation {
                hints.extend(hint(" n ", " new chat "));
            }
            if app.dictation.is_some() {
                hints.extend(hint(" m ", " dictate "));
            }
            hints.extend(hint(" e ", " export "));
            hints.extend(hint(" q ", " quit "));
        }
    }

    let footer_content = Line::from(
        vec![
            Span::styled(mode_text, mode_style),
            Span::styled(" ", label_style),
        ]
        .into_iter()
        .chain(hints)
        .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

fn render_search_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    let is_image = app.mode == Mode::Image;
    let source_count = app.search_panel().map_or(0, |p| p.sources().len());
    let sources_height = if source_count == 0 {
        0
    } else {
        (source_count * 2).min(10) as u16 + 2 // +2 for borders
    };

    let [attach_area, results_area, sources_area, input_area, notice_area] = Layout::vertical([
        Constraint::Length(if is_image { 3 } else { 0 }),
        Constraint::Min(0),
        Constraint::Length(sources_height),
        Constraint::Length(3),
        Constraint::Length(if is_image { 1 } else { 0 }),
    ])
    .areas(area);

    app.results_area = Some(results_area);
    app.sources_area = if sources_height > 0 { Some(sources_area) } else { None };

    if is_image {
        render_attachment(app, frame, attach_area);
    }

    let loading = app.is_loading_in(app.mode);
    let animation_frame = app.animation_frame;
    let focus = app.focus;
    let mode = app.mode;
    if let Some(panel) = app.search_panel_mut() {
        render_result(panel, mode, loading, animation_frame, focus == FocusPane::Results, frame, results_area);
        if sources_height > 0 {
            render_sources(panel, focus == FocusPane::Sources, frame, sources_area);
        }
    }

    render_input(app, frame, input_area);

    if is_image {
        let notice = Paragraph::new(
            "Please be responsible. Do not upload sensitive images or photos of individuals without their consent.",
        )
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
        frame.render_widget(notice, notice_area);
    }
}

fn render_attachment(app: &App, frame: &mut Frame, area: Rect) {
    let (text, color) = match &app.image_attachment {
        Some(image) => (
            Line::from(vec![
                Span::styled(image.file_name(), Style::default().fg(Color::Cyan).bold()),
                Span::styled(
                    format!("  {}, {}", image.mime_type, image.size_label()),
                    Style::default().fg(Color::DarkGray),
                ),
            ]),
            Color::Cyan,
        ),
        None => (
            Line::from(vec![
                Span::styled("Drop an image onto the terminal", Style::default().fg(Color::Blue).bold()),
                Span::styled(" or press 'a' to attach one", Style::default().fg(Color::Gray)),
            ]),
            Color::DarkGray,
        ),
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .title(" Image ");
    let paragraph = Paragraph::new(text).block(block).alignment(Alignment::Center);
    frame.render_widget(paragraph, area);
}

#[allow(clippy::too_many_arguments)]
fn render_result(
    panel: &mut SearchPanel,
    mode: Mode,
    loading: bool,
    animation_frame: u8,
    focused: bool,
    frame: &mut Frame,
    area: Rect,
) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color(focused)))
        .title(" Answer ");
    let inner = block.inner(area);
    panel.height = inner.height;

    let mut lines: Vec<Line> = Vec::new();
    if loading {
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Searching the web{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    } else if let Some(error) = &panel.error {
        lines.push(Line::from(Span::styled("Error", Style::default().fg(Color::Red).bold())));
        lines.push(Line::from(Span::styled(error.clone(), Style::default().fg(Color::LightRed))));
    } else if let Some(result) = &panel.result {
        if let Some(image) = &result.image {
            lines.push(Line::from(vec![
                Span::styled("Your Query Image: ", Style::default().fg(Color::Gray).bold()),
                Span::styled(image.clone(), Style::default().fg(Color::Cyan)),
            ]));
            lines.push(Line::default());
        }
        let blocks = format::parse(&result.answer.text);
        if blocks.is_empty() {
            lines.push(Line::from(Span::styled(
                "The model returned no text.",
                Style::default().fg(Color::DarkGray),
            )));
        } else {
            lines.extend(format::to_lines(&blocks, Density::Roomy, Style::default()));
        }
    } else {
        let hint = match mode {
            Mode::Image => "Attach an image, then ask a question about it.",
            _ => "Ask a question to get an answer grounded in Google Search.",
        };
        lines.push(Line::from(Span::styled(hint, Style::default().fg(Color::DarkGray))));
    }

    let lines = wrap_lines(&lines, inner.width);
    panel.total_lines = row_count(&lines);
    panel.scroll = panel.scroll.min(panel.total_lines.saturating_sub(panel.height));

    let paragraph = Paragraph::new(Text::from(lines))
        .block(block)
        .scroll((panel.scroll, 0));
    frame.render_widget(paragraph, area);

    render_scrollbar(frame, area, panel.total_lines, panel.height, panel.scroll);
}

fn source_item(index: usize, source: &Source) -> ListItem<'static> {
    ListItem::new(vec![
        Line::from(Span::styled(
            format!("{}. {}", index + 1, source.title),
            Style::default().fg(Color::LightBlue).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            format!("   {}", source.uri),
            Style::default().fg(Color::DarkGray),
        )),
    ])
}

fn render_sources(panel: &mut SearchPanel, focused: bool, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if focused { Color::Cyan } else { Color::Magenta }))
        .title(" Sources (Tab to focus, Enter to open) ");

    let items: Vec<ListItem> = panel
        .sources()
        .iter()
        .enumerate()
        .map(|(i, source)| source_item(i, source))
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut panel.sources_state);
}

fn chat_item_lines(item: &ChatHistoryItem) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let (label, label_style, base) = match (item.role, item.is_error) {
        (ChatRole::User, _) => (
            "You:",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            Style::default(),
        ),
        (ChatRole::Model, true) => (
            "AI (error):",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            Style::default().fg(Color::LightRed),
        ),
        (ChatRole::Model, false) => (
            "AI:",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            Style::default(),
        ),
    };

    lines.push(Line::from(Span::styled(label, label_style)));
    lines.extend(format::to_lines(&format::parse(&item.text), Density::Compact, base));

    if !item.sources.is_empty() {
        lines.push(Line::from(Span::styled(
            "Sources:",
            Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
        )));
        for (i, source) in item.sources.iter().enumerate() {
            lines.push(Line::from(vec![
                Span::styled(format!("  [{}] {}", i + 1, source.title), Style::default().fg(Color::LightBlue)),
                Span::styled(format!("  {}", source.uri), Style::default().fg(Color::DarkGray)),
            ]));
        }
    }
    lines.push(Line::default());
    lines
}

fn render_conversation_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    let [chat_area, input_area] =
        Layout::vertical([Constraint::Min(0), Constraint::Length(3)]).areas(area);

    app.chat_area = Some(chat_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color(app.focus == FocusPane::Results)))
        .title(format!(" Conversation ({} turns) ", app.chat.history.len()));
    let inner = block.inner(chat_area);
    app.chat.height = inner.height;
    app.chat.width = inner.width;

    let loading = app.is_loading_in(Mode::Conversation);

    if app.chat.history.is_empty() && !loading {
        let mut lines = vec![Line::default(); (inner.height / 2).saturating_sub(1) as usize];
        lines.push(Line::from(Span::styled(
            "Conversation Mode",
            Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(Span::styled(
            "Ask follow-up questions to dig deeper into your topic.",
            Style::default().fg(Color::DarkGray),
        )));
        let placeholder = Paragraph::new(lines).block(block).alignment(Alignment::Center);
        frame.render_widget(placeholder, chat_area);
    } else {
        let mut lines: Vec<Line> = app.chat.history.iter().flat_map(chat_item_lines).collect();

        if loading {
            lines.push(Line::from(Span::styled(
                "AI:",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )));
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("Thinking{}", dots),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }

        // Stick to the newest turn unless the user scrolled away
        let lines = wrap_lines(&lines, inner.width);
        let total_lines = row_count(&lines);
        let max_scroll = total_lines.saturating_sub(inner.height);
        if app.chat.follow || app.chat.scroll >= max_scroll {
            app.chat.scroll = max_scroll;
            app.chat.follow = true;
        }

        let chat = Paragraph::new(Text::from(lines))
            .block(block)
            .scroll((app.chat.scroll, 0));
        frame.render_widget(chat, chat_area);

        render_scrollbar(frame, chat_area, total_lines, inner.height, app.chat.scroll);
    }

    render_input(app, frame, input_area);
}

fn render_scrollbar(frame: &mut Frame, area: Rect, total: u16, height: u16, position: u16) {
    if total <= height {
        return;
    }
    let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
        .begin_symbol(Some("^"))
        .end_symbol(Some("v"));

    let mut scrollbar_state = ScrollbarState::new(total.saturating_sub(height) as usize)
        .position(position as usize);

    frame.render_stateful_widget(
        scrollbar,
        area.inner(Margin {
            vertical: 1,
            horizontal: 0,
        }),
        &mut scrollbar_state,
    );
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let disabled = app.input_locked();

    let border = if editing {
        Color::Yellow
    } else {
        border_color(app.focus == FocusPane::Input)
    };

    let mut title = match app.mode {
        Mode::Text => " Ask a question... ".to_string(),
        Mode::Image => " Ask a question about the image... ".to_string(),
        Mode::Conversation => " Ask a follow-up question... ".to_string(),
    };
    if app.listening {
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        title = format!(" Listening{} ", dots);
    } else if app.is_loading() {
        title = " Waiting for the answer... ".to_string();
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .title(title);

    // Inner width = total width - 2 (for borders)
    let inner_width = area.width.saturating_sub(2) as usize;
    let input = app.input();
    let (visible_text, cursor_col) = input.visible(inner_width);

    let paragraph = if input.text().is_empty() && !editing {
        Paragraph::new(Span::styled(
            "Press i to type",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let color = if disabled { Color::DarkGray } else { Color::Cyan };
        Paragraph::new(visible_text).style(Style::default().fg(color))
    };
    frame.render_widget(paragraph.block(block), area);

    // Show cursor when editing
    if editing {
        frame.set_cursor_position((area.x + cursor_col as u16 + 1, area.y + 1));
    }
}

fn render_attach_popup(app: &App, frame: &mut Frame, area: Rect) {
    // Calculate popup size and position (centered)
    let popup_width = 70.min(area.width.saturating_sub(4));
    let popup_height = 7;

    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;

    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Attach Image ");

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let instructions = Paragraph::new("Type or drop an image path. Enter to attach, Esc to cancel.")
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(instructions, Rect::new(inner.x, inner.y, inner.width, 1));

    let input_area = Rect::new(inner.x, inner.y + 2, inner.width, 1);
    let (visible_text, cursor_col) = app.attach_input.visible(inner.width as usize);
    frame.render_widget(
        Paragraph::new(visible_text).style(Style::default().fg(Color::Cyan)),
        input_area,
    );
    frame.set_cursor_position((input_area.x + cursor_col as u16, input_area.y));

    let status = match &app.notice {
        Some(notice) => Span::styled(notice.clone(), Style::default().fg(Color::Yellow)),
        None => Span::styled("png, jpeg, gif, webp, heic, heif, bmp", Style::default().fg(Color::DarkGray)),
    };
    frame.render_widget(Paragraph::new(status), Rect::new(inner.x, inner.y + 4, inner.width, 1));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gemini::GroundedAnswer;
    use ratatui::{backend::TestBackend, Terminal};

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let mut text = String::new();
        for row in buffer.content.chunks(buffer.area.width as usize) {
            for cell in row {
                text.push_str(cell.symbol());
            }
            text.push('\n');
        }
        text
    }

    fn draw(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|frame| render(app, frame)).unwrap();
        screen_text(&terminal)
    }

    fn app(mode: Mode) -> App {
        App::new(mode, "test-model".to_string(), None, None)
    }

    fn row_text(line: &Line) -> String {
        line.spans.iter().map(|span| span.content.as_ref()).collect()
    }

    #[test]
    fn test_wrap_breaks_at_word_boundaries() {
        let lines = wrap_lines(&[Line::from("alpha beta gamma"), Line::default()], 11);
        let rows: Vec<String> = lines.iter().map(row_text).collect();
        assert_eq!(rows, vec!["alpha beta", "gamma", ""]);
    }

    #[test]
    fn test_wrap_splits_words_wider_than_a_row() {
        let rows: Vec<String> = wrap_lines(&[Line::from("abcdefgh ij")], 3)
            .iter()
            .map(row_text)
            .collect();
        assert_eq!(rows, vec!["abc", "def", "gh", "ij"]);
    }

    #[test]
    fn test_wrap_keeps_styles_and_bullet_indent() {
        let bold = Style::default().add_modifier(Modifier::BOLD);
        let line = Line::from(vec![
            Span::raw("  • "),
            Span::styled("Name:", bold),
            Span::raw(" some value"),
        ]);
        let lines = wrap_lines(&[line], 12);
        assert_eq!(row_text(&lines[0]), "  • Name:");
        assert_eq!(lines[0].spans[1].style, bold);
        assert_eq!(row_text(&lines[1]), "some value");
    }

    #[tokio::test]
    async fn test_empty_sources_render_no_sources_section() {
        let mut app = app(Mode::Text);
        app.submit().await.unwrap();
        app.complete_query(Ok(GroundedAnswer {
            text: "**Answer** here".to_string(),
            sources: vec![],
        }));
        let screen = draw(&mut app);
        assert!(screen.contains("Answer here"));
        assert!(!screen.contains("Sources"));
        assert!(app.sources_area.is_none());
    }

    #[tokio::test]
    async fn test_sources_render_in_order() {
        let mut app = app(Mode::Text);
        app.submit().await.unwrap();
        app.complete_query(Ok(GroundedAnswer {
            text: "Answer".to_string(),
            sources: vec![
                Source { uri: "https://first.example".to_string(), title: "First".to_string() },
                Source { uri: "https://second.example".to_string(), title: "Second".to_string() },
            ],
        }));
        let screen = draw(&mut app);
        let first = screen.find("1. First").unwrap();
        let second = screen.find("2. Second").unwrap();
        assert!(first < second);
        assert!(screen.contains("https://second.example"));
    }

    #[test]
    fn test_empty_conversation_shows_placeholder() {
        let mut app = app(Mode::Conversation);
        let screen = draw(&mut app);
        assert!(screen.contains("Conversation Mode"));
        assert!(screen.contains("Ask follow-up questions"));
    }

    #[tokio::test]
    async fn test_conversation_follows_newest_turn() {
        let mut app = app(Mode::Conversation);
        for i in 0..12 {
            app.input_mut().set(&format!("question number {}", i));
            app.submit().await.unwrap();
            app.complete_query(Ok(GroundedAnswer {
                text: format!("answer number {}", i),
                sources: vec![],
            }));
        }
        let screen = draw(&mut app);
        assert!(screen.contains("answer number 11"));
        assert!(!screen.contains("question number 0"));
        assert!(app.chat.scroll > 0);
    }

    #[test]
    fn test_image_mode_shows_drop_zone_and_notice() {
        let mut app = app(Mode::Image);
        let screen = draw(&mut app);
        assert!(screen.contains("Drop an image onto the terminal"));
        assert!(screen.contains("Please be responsible"));
    }

    #[tokio::test]
    async fn test_following_reaches_end_of_word_wrapped_answers() {
        let mut app = app(Mode::Conversation);
        let word = "w".repeat(60);
        for i in 0..6 {
            app.input_mut().set(&format!("question {}", i));
            app.submit().await.unwrap();
            app.complete_query(Ok(GroundedAnswer {
                text: format!("{w} {w} {w} {w} FINAL{i}", w = word, i = i),
                sources: vec![],
            }));
        }
        let screen = draw(&mut app);
        assert!(screen.contains("FINAL5"));

        app.scroll_up(5);
        let screen = draw(&mut app);
        assert!(!app.chat.follow);
        assert!(!screen.contains("FINAL5"));

        app.scroll_to_bottom();
        let screen = draw(&mut app);
        assert!(screen.contains("FINAL5"));
    }

    #[tokio::test]
    async fn test_end_of_long_result_is_reachable() {
        let mut app = app(Mode::Text);
        app.submit().await.unwrap();
        let word = "w".repeat(60);
        let text: Vec<String> = (0..12).map(|i| format!("{w} {w} line{i}", w = word, i = i)).collect();
        app.complete_query(Ok(GroundedAnswer {
            text: text.join("\n"),
            sources: vec![],
        }));
        draw(&mut app);
        app.scroll_to_bottom();
        let screen = draw(&mut app);
        assert!(screen.contains("line11"));
    }
}
