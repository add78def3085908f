use crate::{TuiTheme, UiState};
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, List, ListItem, ListState, Paragraph, Tabs, Wrap};
use unicode_width::UnicodeWidthStr;
use vct_core::{Role, TeamResult, Turn, View};
use vct_errors::FAILURE_MESSAGE;
use vct_session::{PREDEFINED_PROMPTS, SessionSnapshot};

const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];
const HELP: &str = "Enter send | Tab view | Up/Down prompts | Ctrl+O use | Esc clear input | Ctrl+L reset | Ctrl+C quit";

pub fn draw(frame: &mut Frame, snapshot: &SessionSnapshot, ui: &UiState, theme: &TuiTheme) {
    let area = frame.area();
    if area.width < 20 || area.height < 8 {
        return;
    }
    let [header, body, input, status] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(4),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);
    let [chat, side] =
        Layout::horizontal([Constraint::Percentage(55), Constraint::Percentage(45)]).areas(body);

    frame.render_widget(Paragraph::new(header_line(ui, theme)), header);
    draw_chat(frame, chat, snapshot, ui, theme);

    match snapshot.result.as_deref() {
        Some(result) => {
            let prompts_height = (PREDEFINED_PROMPTS.len() as u16 + 2).min(side.height / 2);
            let [prompts, card] =
                Layout::vertical([Constraint::Length(prompts_height), Constraint::Min(3)])
                    .areas(side);
            draw_prompts(frame, prompts, ui, theme);
            draw_result_card(frame, card, result, snapshot.view, theme);
        }
        None => draw_prompts(frame, side, ui, theme),
    }

    draw_input(frame, input, snapshot, ui, theme);
    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled(format!(" {} ", ui.status), Style::default().fg(theme.secondary)),
            Span::styled(HELP, Style::default().fg(Color::DarkGray)),
        ])),
        status,
    );
}

fn header_line(ui: &UiState, theme: &TuiTheme) -> Line<'static> {
    Line::from(vec![
        Span::styled(
            " VCT Composer ",
            Style::default()
                .fg(theme.primary)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("gateway: {}", ui.gateway_label),
            Style::default().fg(Color::DarkGray),
        ),
    ])
}

fn draw_chat(
    frame: &mut Frame,
    area: Rect,
    snapshot: &SessionSnapshot,
    ui: &UiState,
    theme: &TuiTheme,
) {
    let mut lines = transcript_lines(&snapshot.turns, theme);
    if snapshot.is_busy() {
        lines.push(pending_line(ui, theme));
    }
    let inner_width = area.width.saturating_sub(2);
    let inner_height = area.height.saturating_sub(2);
    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false });
    let scroll = chat_scroll(&paragraph, inner_width, inner_height);
    frame.render_widget(
        paragraph
            .block(Block::bordered().title(" Chat "))
            .scroll((scroll, 0)),
        area,
    );
}

/// Rows to skip so the last wrapped row sits on the bottom edge.
fn chat_scroll(paragraph: &Paragraph<'_>, width: u16, height: u16) -> u16 {
    if width == 0 {
        return 0;
    }
    let rows = paragraph.line_count(width);
    u16::try_from(rows.saturating_sub(height as usize)).unwrap_or(u16::MAX)
}

/// One styled line per turn. Assistant turns carrying a team result are
/// summarized; the full result lives in the result card.
pub fn transcript_lines(turns: &[Turn], theme: &TuiTheme) -> Vec<Line<'static>> {
    if turns.is_empty() {
        return vec![Line::from(Span::styled(
            "Ask for a roster, or pick one of the predefined prompts.",
            Style::default().fg(Color::DarkGray),
        ))];
    }
    turns
        .iter()
        .map(|turn| match turn.role {
            Role::User => Line::from(vec![
                Span::styled(
                    "You: ",
                    Style::default()
                        .fg(theme.primary)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw(turn.content.clone()),
            ]),
            Role::Assistant => {
                let label = Span::styled(
                    "Composer: ",
                    Style::default()
                        .fg(theme.secondary)
                        .add_modifier(Modifier::BOLD),
                );
                if turn.content == FAILURE_MESSAGE {
                    return Line::from(vec![
                        label,
                        Span::styled(turn.content.clone(), Style::default().fg(theme.error)),
                    ]);
                }
                let body = match serde_json::from_str::<TeamResult>(&turn.content) {
                    Ok(result) => summarize(&result),
                    Err(_) => turn.content.clone(),
                };
                Line::from(vec![label, Span::raw(body)])
            }
        })
        .collect()
}

fn summarize(result: &TeamResult) -> String {
    let names = result
        .team
        .iter()
        .map(|p| p.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "Team ready ({} players): {names}. IGL: {}",
        result.team.len(),
        result.igl
    )
}

fn pending_line(ui: &UiState, theme: &TuiTheme) -> Line<'static> {
    let marker = if ui.reduced_motion {
        "..."
    } else {
        SPINNER[(ui.tick / 4) % SPINNER.len()]
    };
    Line::from(vec![
        Span::styled(
            "Composer: ",
            Style::default()
                .fg(theme.secondary)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("building a roster {marker}"),
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        ),
    ])
}

fn draw_prompts(frame: &mut Frame, area: Rect, ui: &UiState, theme: &TuiTheme) {
    let items = PREDEFINED_PROMPTS
        .iter()
        .enumerate()
        .map(|(i, prompt)| ListItem::new(format!("{}. {prompt}", i + 1)))
        .collect::<Vec<_>>();
    let list = List::new(items)
        .block(Block::bordered().title(" Predefined Prompts "))
        .highlight_style(
            Style::default()
                .fg(theme.primary)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");
    let mut state = ListState::default().with_selected(Some(ui.highlighted));
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_result_card(
    frame: &mut Frame,
    area: Rect,
    result: &TeamResult,
    view: View,
    theme: &TuiTheme,
) {
    let block = Block::bordered().title(" Team ");
    let inner = block.inner(area);
    frame.render_widget(block, area);
    let [tabs_area, content] =
        Layout::vertical([Constraint::Length(1), Constraint::Min(1)]).areas(inner);

    let tabs = Tabs::new(View::ALL.iter().map(|v| v.label()).collect::<Vec<_>>())
        .select(view.index())
        .style(Style::default().fg(Color::DarkGray))
        .highlight_style(
            Style::default()
                .fg(theme.primary)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        )
        .divider("|");
    frame.render_widget(tabs, tabs_area);

    let lines = match view {
        View::Players => roster_lines(result, theme),
        View::Strategy => strategy_lines(result, theme),
    };
    frame.render_widget(
        Paragraph::new(lines).wrap(Wrap { trim: false }),
        content,
    );
}

pub fn roster_lines(result: &TeamResult, theme: &TuiTheme) -> Vec<Line<'static>> {
    result
        .team
        .iter()
        .map(|player| {
            let mut spans = vec![
                Span::styled(
                    player.name.clone(),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::raw(format!(
                    "  {} / {}  {}  {}",
                    player.role, player.agent, player.region, player.league
                )),
            ];
            if player.name == result.igl {
                spans.push(Span::styled(" (IGL)", Style::default().fg(theme.secondary)));
            }
            Line::from(spans)
        })
        .collect()
}

pub fn strategy_lines(result: &TeamResult, theme: &TuiTheme) -> Vec<Line<'static>> {
    let heading = |text: &'static str| {
        Line::from(Span::styled(
            text,
            Style::default()
                .fg(theme.primary)
                .add_modifier(Modifier::BOLD),
        ))
    };
    vec![
        heading("Strategy"),
        Line::from(result.strategy.clone()),
        heading("Strengths"),
        Line::from(result.strengths.clone()),
        heading("Weaknesses"),
        Line::from(result.weaknesses.clone()),
        Line::from(vec![
            Span::styled("IGL: ", Style::default().fg(theme.secondary)),
            Span::raw(result.igl.clone()),
        ]),
    ]
}

fn draw_input(
    frame: &mut Frame,
    area: Rect,
    snapshot: &SessionSnapshot,
    ui: &UiState,
    theme: &TuiTheme,
) {
    let line = if snapshot.is_busy() {
        Line::from(Span::styled(
            "Sending...",
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        ))
    } else {
        let cursor = if ui.reduced_motion || ui.tick % 16 < 8 {
            "\u{2588}"
        } else {
            " "
        };
        Line::from(vec![
            Span::styled(
                "> ",
                Style::default()
                    .fg(theme.primary)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(snapshot.input.clone()),
            Span::raw(cursor),
        ])
    };
    // Keep the cursor end of a long prompt visible.
    let inner_width = area.width.saturating_sub(2) as usize;
    let used = line
        .spans
        .iter()
        .map(|span| UnicodeWidthStr::width(span.content.as_ref()))
        .sum::<usize>();
    let scroll_x = u16::try_from(used.saturating_sub(inner_width)).unwrap_or(u16::MAX);
    frame.render_widget(
        Paragraph::new(line)
            .block(Block::bordered().title(" Prompt "))
            .scroll((0, scroll_x)),
        area,
    );
}
