mod theme;

use crate::app::{
    AppModel, FilterState, Form, ListEntry, ListQuery, MenuStage, QueryState, ROW_HEIGHT,
    SETTINGS_FIELD_LABELS, SelectList, SettingsStage, Stage, StageTag, TextField,
};
use ratatui::prelude::*;
use ratatui::widgets::*;
use time::macros::format_description;
use unicode_width::UnicodeWidthStr;

const APP_TITLE: &str = "bloXroute Trader API";
/// Label, input and spacer rows per form field.
const FORM_FIELD_HEIGHT: u16 = 3;
/// The "> " focus marker in front of each field value.
const FIELD_MARKER_WIDTH: u16 = 2;

pub fn render(frame: &mut Frame, model: &AppModel) {
    let full_area = frame.area();
    if full_area.width == 0 || full_area.height == 0 {
        return;
    }

    render_header(frame, full_area, model);

    let content_area = if full_area.height > 1 {
        Rect {
            x: full_area.x,
            y: full_area.y.saturating_add(1),
            width: full_area.width,
            height: full_area.height.saturating_sub(1),
        }
    } else {
        full_area
    };

    match model.active_stage() {
        Some(Stage::Menu(menu)) => render_menu(frame, content_area, menu),
        Some(Stage::Settings(settings)) => render_settings(frame, content_area, settings),
        Some(Stage::OpenOrders(query)) | Some(Stage::Orderbook(query)) => {
            render_query(frame, content_area, query)
        }
        Some(Stage::Error(_)) | None => render_error(frame, content_area, model),
    }
}

fn render_header(frame: &mut Frame, area: Rect, model: &AppModel) {
    let bar_area = Rect {
        x: area.x,
        y: area.y,
        width: area.width,
        height: 1,
    };

    let base_style = Style::default().fg(theme::FG).bg(theme::BAR_BG);
    let title_style = Style::default()
        .fg(theme::ACCENT)
        .bg(theme::BAR_BG)
        .add_modifier(Modifier::BOLD);
    let title = format!(" {APP_TITLE} ");
    let stage = format!(" {} ", stage_title(model));

    let used_width = UnicodeWidthStr::width(title.as_str()) + UnicodeWidthStr::width(stage.as_str());
    let remaining = (bar_area.width as usize).saturating_sub(used_width);

    let spans = vec![
        Span::styled(title, title_style),
        Span::styled(stage, Style::default().fg(theme::MUTED).bg(theme::BAR_BG)),
        Span::styled(" ".repeat(remaining), base_style),
    ];
    frame.render_widget(Paragraph::new(Line::from(spans)).style(base_style), bar_area);
}

fn stage_title(model: &AppModel) -> &'static str {
    match model.active_stage().map(Stage::tag) {
        Some(StageTag::Menu) => "Menu",
        Some(StageTag::Settings) => "Settings",
        Some(StageTag::OpenOrders) => "Open Orders",
        Some(StageTag::Orderbook) => "Orderbook",
        Some(StageTag::Error) | Some(StageTag::Exit) | None => "Error",
    }
}

fn render_menu(frame: &mut Frame, area: Rect, menu: &MenuStage) {
    render_select_list(frame, inner_area(area), &menu.list, None);
}

fn render_settings(frame: &mut Frame, area: Rect, settings: &SettingsStage) {
    let area = inner_area(area);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(area);

    let block = panel("Settings");
    let inner = block.inner(chunks[0]);
    let mut lines = form_lines(
        &settings.form,
        &SETTINGS_FIELD_LABELS,
        !settings.connecting,
        inner.width,
    );
    if let Some(status) = &settings.status {
        lines.push(Line::from(Span::styled(
            status.clone(),
            Style::default().fg(theme::SUCCESS),
        )));
    }
    if let Some(error) = &settings.error {
        lines.push(error_line(error));
    }

    frame.render_widget(Paragraph::new(lines).block(block), chunks[0]);
    if !settings.connecting {
        place_cursor(frame, inner, &settings.form);
    }

    let footer = "Tab/↓ next  Shift+Tab/↑ prev  Enter submit  Esc menu  Ctrl+C quit";
    frame.render_widget(footer_paragraph(footer), chunks[1]);
}

fn render_query(frame: &mut Frame, area: Rect, query: &ListQuery) {
    let area = inner_area(area);
    match &query.state {
        QueryState::CollectingInput => {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(0), Constraint::Length(1)])
                .split(area);
            let labels: Vec<&str> = query
                .form
                .fields
                .iter()
                .map(|field| field.placeholder)
                .collect();
            let block = panel(&query.results.title);
            let inner = block.inner(chunks[0]);
            let mut lines = form_lines(&query.form, &labels, true, inner.width);
            if let Some(error) = &query.error {
                lines.push(error_line(error));
            }

            frame.render_widget(Paragraph::new(lines).block(block), chunks[0]);
            place_cursor(frame, inner, &query.form);

            let footer = "Tab/↓ next  Shift+Tab/↑ prev  Enter submit  Esc menu";
            frame.render_widget(footer_paragraph(footer), chunks[1]);
        }
        QueryState::Running { .. } => {
            let line = Line::from(vec![
                Span::styled(query.spinner.frame(), Style::default().fg(theme::ACCENT)),
                Span::raw(" loading..."),
            ]);
            frame.render_widget(
                Paragraph::new(line).block(panel(&query.results.title)),
                area,
            );
        }
        QueryState::ShowingResults => {
            let fetched = query
                .fetched_at
                .and_then(|at| {
                    at.format(format_description!("[hour]:[minute]:[second]"))
                        .ok()
                })
                .unwrap_or_default();
            let summary = format!(
                "{} results, fetched {fetched} UTC",
                query.results.items().len()
            );
            render_select_list(frame, area, &query.results, Some(summary));
        }
    }
}

fn render_error(frame: &mut Frame, area: Rect, model: &AppModel) {
    let area = inner_area(area);
    let error_text = model
        .ctx
        .fatal
        .clone()
        .unwrap_or_else(|| "unknown error".to_string());

    let paragraph = Paragraph::new(vec![
        Line::from("The trader cannot continue."),
        Line::from(""),
        error_line(&error_text),
        Line::from(""),
        Line::from("Keys: Esc/q=quit  Ctrl+Q/Ctrl+C=quit"),
    ])
    .wrap(Wrap { trim: false })
    .block(panel("Error"));

    frame.render_widget(paragraph, area);
}

fn render_select_list<T: ListEntry>(
    frame: &mut Frame,
    area: Rect,
    list: &SelectList<T>,
    summary: Option<String>,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area);

    frame.render_widget(Paragraph::new(filter_line(list, summary)), chunks[0]);

    if list.visible_len() == 0 {
        let message = match list.filter_state() {
            FilterState::Unfiltered => "Nothing to show.",
            FilterState::Filtering | FilterState::Applied => {
                "No matching entries. Press Esc to clear the filter."
            }
        };
        let empty = Paragraph::new(Span::styled(message, Style::default().fg(theme::DIM)))
            .block(panel(&list.title));
        frame.render_widget(empty, chunks[1]);
    } else {
        let max_width = (chunks[1].width as usize).saturating_sub(6);
        let items: Vec<ListItem> = list
            .visible()
            .map(|entry| list_item(entry, max_width))
            .collect();
        let widget = List::new(items)
            .block(panel(&list.title))
            .highlight_style(
                Style::default()
                    .fg(theme::ACCENT)
                    .bg(theme::ACCENT_BG)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("▸ ");

        let mut state = ListState::default();
        state.select(list.selected());
        frame.render_stateful_widget(widget, chunks[1], &mut state);
    }

    let footer = if list.is_filtering() {
        "type to filter  Enter apply  Esc clear"
    } else {
        "↑/k ↓/j move  PgUp/PgDn page  / filter  Enter choose  q/Esc back"
    };
    frame.render_widget(footer_paragraph(footer), chunks[2]);
}

fn list_item<T: ListEntry>(entry: &T, max_width: usize) -> ListItem<'static> {
    let mut lines = vec![
        Line::from(truncate_end(entry.title(), max_width)),
        Line::from(Span::styled(
            truncate_end(entry.description(), max_width),
            Style::default().fg(theme::DIM),
        )),
    ];
    lines.resize(usize::from(ROW_HEIGHT), Line::from(""));
    ListItem::new(lines)
}

fn filter_line<T: ListEntry>(list: &SelectList<T>, summary: Option<String>) -> Line<'static> {
    let mut spans = match list.filter_state() {
        FilterState::Unfiltered => vec![Span::styled(
            "/ to filter",
            Style::default().fg(theme::DIM),
        )],
        FilterState::Filtering => vec![
            Span::styled("Filter: ", Style::default().fg(theme::MUTED)),
            Span::styled(
                format!("{}▏", list.query().text),
                Style::default().fg(theme::ACCENT),
            ),
        ],
        FilterState::Applied => vec![
            Span::styled("Filter: ", Style::default().fg(theme::MUTED)),
            Span::raw(list.query().text.clone()),
            Span::styled(
                format!(" ({} shown)", list.visible_len()),
                Style::default().fg(theme::DIM),
            ),
        ],
    };
    if let Some(summary) = summary {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(summary, Style::default().fg(theme::SUCCESS)));
    }
    Line::from(spans)
}

fn form_lines(form: &Form, labels: &[&str], active: bool, width: u16) -> Vec<Line<'static>> {
    let value_width = usize::from(width.saturating_sub(FIELD_MARKER_WIDTH));
    let mut lines = Vec::new();
    for (index, field) in form.fields.iter().enumerate() {
        let focused = active && form.focus == index;
        let label = labels.get(index).copied().unwrap_or("");
        let label_style = if focused {
            Style::default().fg(theme::ACCENT).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme::MUTED)
        };
        lines.push(Line::from(Span::styled(label.to_string(), label_style)));

        let marker = if focused { "> " } else { "  " };
        let value = if field.editor.is_empty() {
            Span::styled(
                truncate_end(field.placeholder, value_width),
                Style::default().fg(theme::DIM),
            )
        } else if focused {
            let (shown, _) = field_window(field, value_width);
            Span::styled(shown, Style::default().fg(theme::FG))
        } else {
            Span::styled(
                truncate_end(&field.editor.display(field.mask), value_width),
                Style::default().fg(theme::FG),
            )
        };
        lines.push(Line::from(vec![Span::raw(marker), value]));
        lines.push(Line::from(""));
    }

    let submit_style = if active && form.submit_focused() {
        Style::default()
            .fg(theme::ACCENT)
            .bg(theme::ACCENT_BG)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(theme::MUTED)
    };
    lines.push(Line::from(Span::styled("[ Submit ]", submit_style)));
    lines.push(Line::from(""));
    lines
}

fn place_cursor(frame: &mut Frame, inner: Rect, form: &Form) {
    let Some(field) = form.focused_field() else {
        return;
    };
    let value_width = usize::from(inner.width.saturating_sub(FIELD_MARKER_WIDTH));
    let (_, cursor_x) = field_window(field, value_width);
    let x = inner
        .x
        .saturating_add(FIELD_MARKER_WIDTH)
        .saturating_add(cursor_x as u16);
    let y = inner
        .y
        .saturating_add(form.focus as u16 * FORM_FIELD_HEIGHT)
        .saturating_add(1);
    if x < inner.right() && y < inner.bottom() {
        frame.set_cursor_position((x, y));
    }
}

/// The slice of a field's text that fits in `width` columns with the cursor in view,
/// plus the cursor's column inside that slice.
fn field_window(field: &TextField, width: usize) -> (String, usize) {
    if width == 0 {
        return (String::new(), 0);
    }
    let chars: Vec<char> = field.editor.display(field.mask).chars().collect();
    let cursor = field.editor.cursor_col.min(chars.len());
    let columns = |slice: &[char]| -> usize {
        slice
            .iter()
            .map(|ch| unicode_width::UnicodeWidthChar::width(*ch).unwrap_or(0))
            .sum()
    };

    // The cursor cell itself needs a free column.
    let mut start = 0;
    while start < cursor && columns(&chars[start..cursor]) >= width {
        start += 1;
    }

    let mut shown = String::new();
    let mut used = 0;
    for ch in &chars[start..] {
        let ch_width = unicode_width::UnicodeWidthChar::width(*ch).unwrap_or(0);
        if used + ch_width > width {
            break;
        }
        used += ch_width;
        shown.push(*ch);
    }
    (shown, columns(&chars[start..cursor]))
}

fn error_line(message: &str) -> Line<'static> {
    Line::from(Span::styled(
        format!("Error: {message}"),
        Style::default().fg(theme::ERROR),
    ))
}

fn panel(title: &str) -> Block<'static> {
    Block::default()
        .title(title.to_string())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme::BORDER))
        .padding(Padding::horizontal(1))
}

fn footer_paragraph(text: &'static str) -> Paragraph<'static> {
    Paragraph::new(Span::styled(text, Style::default().fg(theme::DIM)))
}

fn truncate_end(text: &str, max_width: usize) -> String {
    if max_width == 0 {
        return String::new();
    }
    if UnicodeWidthStr::width(text) <= max_width {
        return text.to_string();
    }
    let ellipsis = "…";
    let available = max_width.saturating_sub(UnicodeWidthStr::width(ellipsis));
    let mut out = String::new();
    let mut width = 0;
    for ch in text.chars() {
        let ch_width = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if width + ch_width > available {
            break;
        }
        width += ch_width;
        out.push(ch);
    }
    out.push_str(ellipsis);
    out
}

fn inner_area(area: Rect) -> Rect {
    if area.width < 40 || area.height < 12 {
        return area;
    }
    area.inner(Margin {
        vertical: 1,
        horizontal: 2,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::testing::{context, harness};
    use crate::app::{AppEvent, Entry, TaskEvent, TaskSignal, init, update};
    use crate::domain::fixtures::valid_input;
    use crate::domain::validate_settings;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use ratatui::backend::TestBackend;
    use time::OffsetDateTime;

    fn draw(model: &AppModel, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).expect("terminal");
        terminal.draw(|frame| render(frame, model)).expect("draw");
        let buffer = terminal.backend().buffer();
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                text.push_str(buffer[(x, y)].symbol());
            }
            text.push('\n');
        }
        text
    }

    fn press(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn settings_form_masks_private_key() {
        let harness = harness();
        let (model, _) = init(context(), harness.dispatcher.clone());
        let model = "ab".chars().fold(model, |model, ch| {
            update(model, press(KeyCode::Char(ch))).0
        });
        let (model, _) = update(model, press(KeyCode::Tab));
        let model = "secret".chars().fold(model, |model, ch| {
            update(model, press(KeyCode::Char(ch))).0
        });

        let screen = draw(&model, 80, 30);
        assert!(screen.contains(APP_TITLE));
        assert!(screen.contains("Auth Header"));
        assert!(screen.contains("******"));
        assert!(!screen.contains("secret"));
        assert!(screen.contains("[ Submit ]"));
    }

    #[test]
    fn settings_error_is_rendered_inline() {
        let harness = harness();
        let (mut model, _) = init(context(), harness.dispatcher.clone());
        if let Some(Stage::Settings(stage)) = model.stages.get_mut(&StageTag::Settings) {
            stage.form.focus = stage.form.fields.len();
        }
        let (model, _) = update(model, press(KeyCode::Enter));
        let screen = draw(&model, 80, 30);
        assert!(screen.contains("Error: auth header cannot be empty"));
    }

    #[test]
    fn menu_lists_every_entry() {
        let harness = harness();
        let mut ctx = context();
        ctx.settings = validate_settings(&valid_input()).expect("valid");
        let (model, _) = init(ctx, harness.dispatcher.clone());
        let screen = draw(&model, 80, 30);
        for title in ["Settings", "Open Orders", "Orderbook", "Quit"] {
            assert!(screen.contains(title), "missing {title}");
        }
    }

    #[test]
    fn results_show_count_and_rows() {
        let harness = harness();
        let mut ctx = context();
        ctx.settings = validate_settings(&valid_input()).expect("valid");
        let (model, _) = init(ctx, harness.dispatcher.clone());
        let (model, _) = update(model, press(KeyCode::Down));
        let (model, _) = update(model, press(KeyCode::Down));
        let (model, _) = update(model, press(KeyCode::Enter));
        let model = "SOLUSDC".chars().fold(model, |model, ch| {
            update(model, press(KeyCode::Char(ch))).0
        });
        let (model, _) = update(model, press(KeyCode::Tab));
        let (model, _) = update(model, press(KeyCode::Tab));
        let (model, _) = update(model, press(KeyCode::Enter));
        assert!(draw(&model, 80, 30).contains("loading..."));

        let generation = match model.active_stage() {
            Some(Stage::Orderbook(query)) => query.generation(),
            other => panic!("expected orderbook, got {other:?}"),
        };
        let (model, _) = update(
            model,
            AppEvent::Task(TaskEvent {
                stage: StageTag::Orderbook,
                generation,
                signal: TaskSignal::QueryLoaded {
                    items: vec![
                        Entry::new("[ASK] 20.5".to_string(), "1 @ 20.5".to_string()),
                        Entry::new("[BID] 19.5".to_string(), "2 @ 19.5".to_string()),
                    ],
                    fetched_at: OffsetDateTime::now_utc(),
                },
            }),
        );

        let screen = draw(&model, 80, 30);
        assert!(screen.contains("2 results, fetched"));
        assert!(screen.contains("[ASK] 20.5"));
        assert!(screen.contains("[BID] 19.5"));
    }

    #[test]
    fn error_stage_shows_fatal_message() {
        let harness = harness();
        let (model, _) = init(context(), harness.dispatcher.clone());
        let (model, _) = update(model, AppEvent::Fatal("input closed".to_string()));
        let screen = draw(&model, 80, 20);
        assert!(screen.contains("Error: input closed"));
    }

    #[test]
    fn long_field_scrolls_to_keep_the_cursor_visible() {
        let harness = harness();
        let (model, _) = init(context(), harness.dispatcher.clone());
        let (model, _) = update(model, press(KeyCode::Tab));
        let (model, _) = update(model, press(KeyCode::Tab));
        let typed = format!("BEGIN{}END", "k".repeat(62));
        let model = typed.chars().fold(model, |model, ch| {
            update(model, press(KeyCode::Char(ch))).0
        });

        let mut terminal = Terminal::new(TestBackend::new(60, 30)).expect("terminal");
        terminal.draw(|frame| render(frame, &model)).expect("draw");
        let buffer = terminal.backend().buffer().clone();
        let screen: String = (0..buffer.area.height)
            .map(|y| {
                (0..buffer.area.width)
                    .map(|x| buffer[(x, y)].symbol().to_string())
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n");
        assert!(screen.contains("END"));
        assert!(!screen.contains("BEGIN"));

        // Panel content starts at column 4 and is 52 wide; 49 characters sit before the cursor.
        let cursor = terminal.get_cursor_position().expect("cursor");
        assert_eq!(cursor.x, 4 + 2 + 49);
    }

    #[test]
    fn field_window_follows_the_cursor() {
        let mut field = TextField::new("market");
        field.editor.set_text("abcdefghij");
        field.editor.cursor_col = 10;
        assert_eq!(field_window(&field, 4), ("hij".to_string(), 3));

        field.editor.cursor_col = 0;
        assert_eq!(field_window(&field, 4), ("abcd".to_string(), 0));

        let masked = TextField::new("key").masked('*').with_value("secret");
        assert_eq!(field_window(&masked, 10), ("******".to_string(), 6));
    }

    #[test]
    fn truncate_end_respects_width() {
        assert_eq!(truncate_end("abcdef", 4), "abc…");
        assert_eq!(truncate_end("abc", 4), "abc");
        assert_eq!(truncate_end("abc", 0), "");
    }
}
