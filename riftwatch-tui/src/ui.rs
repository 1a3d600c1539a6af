//! UI rendering for the TUI.

use chrono::Utc;
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Wrap},
    Frame,
};
use riftwatch_core::lookup::HistorySource;
use riftwatch_core::view::{self, Badge, PanelView, RowView, Tone};
use riftwatch_core::PushCommand;

use crate::app::App;

/// Label color for the header
const LABEL_COLOR: Color = Color::Rgb(100, 180, 180);
/// Secondary text
const DIM: Color = Color::Rgb(128, 128, 128);
/// Border color for the teammates panel
const BORDER_TEAM: Color = Color::Rgb(0, 150, 150);
/// Border color for the enemies panel
const BORDER_ENEMY: Color = Color::Rgb(200, 80, 80);
/// Champion badge color
const BADGE_CHAMPION: Color = Color::Rgb(220, 180, 0);

fn tone_color(tone: Tone) -> Color {
    match tone {
        Tone::Muted => DIM,
        Tone::Info => Color::Cyan,
        Tone::Success => Color::Green,
        Tone::Warning => Color::Yellow,
        Tone::Danger => Color::Red,
    }
}

fn badge_span(badge: &Badge) -> Span<'_> {
    Span::styled(badge.text.as_str(), Style::default().fg(tone_color(badge.tone)))
}

/// Render the application UI.
pub fn render<S: HistorySource>(frame: &mut Frame, app: &App<S>) {
    let view = view::render(&app.session, Utc::now());
    let area = frame.area();

    // Layout: header, banner, notification, panels, footer
    let chunks = Layout::vertical([
        Constraint::Length(1), // Header
        Constraint::Length(1), // Banner
        Constraint::Length(1), // Notification
        Constraint::Min(5),    // Panels
        Constraint::Length(1), // Footer
    ])
    .split(area);

    let header = Line::from(vec![
        Span::styled(" riftwatch ", Style::default().fg(Color::Cyan).bold()),
        Span::styled("│ ", Style::default().fg(DIM)),
        Span::styled("client ", Style::default().fg(LABEL_COLOR)),
        Span::styled(
            "● ",
            Style::default().fg(tone_color(view.connection.tone)),
        ),
        badge_span(&view.connection),
        Span::styled(
            format!("  │ {}", app.backend_url),
            Style::default().fg(DIM),
        ),
    ]);
    frame.render_widget(Paragraph::new(header), chunks[0]);

    if let Some(banner) = &view.banner {
        let line = Line::from(vec![Span::raw(" "), badge_span(banner).bold()]);
        frame.render_widget(Paragraph::new(line), chunks[1]);
    }

    if let Some(notification) = &view.notification {
        let line = Line::from(vec![
            Span::styled(" ▶ ", Style::default().fg(tone_color(notification.tone))),
            badge_span(notification),
        ]);
        frame.render_widget(Paragraph::new(line), chunks[2]);
    }

    let panels = Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[3]);
    render_panel(frame, &view.teammates, BORDER_TEAM, panels[0]);
    render_panel(frame, &view.enemies, BORDER_ENEMY, panels[1]);

    render_footer(frame, app, chunks[4]);
}

fn render_panel(frame: &mut Frame, panel: &PanelView, border: Color, area: Rect) {
    let block = Block::default()
        .title(Span::styled(
            format!(" {} ", panel.title),
            Style::default().fg(tone_color(panel.tone)).bold(),
        ))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(border));

    let lines: Vec<Line> = if panel.rows.is_empty() {
        vec![Line::from(Span::styled(
            "Waiting for lobby...",
            Style::default().fg(DIM).add_modifier(Modifier::ITALIC),
        ))]
    } else {
        panel.rows.iter().flat_map(row_lines).collect()
    };

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn row_lines(row: &RowView) -> Vec<Line<'_>> {
    let mut title = vec![Span::styled(
        row.riot_id.as_str(),
        Style::default().add_modifier(Modifier::BOLD),
    )];
    if let Some(champion) = &row.champion {
        title.push(Span::raw(" "));
        title.push(Span::styled(
            format!("[{}]", champion),
            Style::default().fg(BADGE_CHAMPION),
        ));
    }
    title.push(Span::styled(
        format!("  {}", row.link),
        Style::default().fg(DIM),
    ));

    let mut lines = vec![
        Line::from(title),
        Line::from(vec![Span::raw("  "), badge_span(&row.headline)]),
    ];
    if let Some(detail) = &row.detail {
        lines.push(Line::from(Span::styled(
            format!("  {}", detail),
            Style::default().fg(DIM),
        )));
    }
    lines.push(Line::raw(""));
    lines
}

fn render_footer<S: HistorySource>(frame: &mut Frame, app: &App<S>, area: Rect) {
    let marker = |command: PushCommand| {
        if app.is_requested(command) {
            Span::styled(" ✓", Style::default().fg(Color::Green))
        } else {
            Span::raw("")
        }
    };

    let footer = Line::from(vec![
        Span::styled(" a", Style::default().fg(Color::Yellow)),
        Span::raw(" auto-accept"),
        marker(PushCommand::StartAutoAccept),
        Span::raw("  "),
        Span::styled("z", Style::default().fg(Color::Yellow)),
        Span::raw(" auto-analyze"),
        marker(PushCommand::StartAutoAnalyze),
        Span::raw("  "),
        Span::styled("c", Style::default().fg(Color::Yellow)),
        Span::raw(" clear notice  "),
        Span::styled("q", Style::default().fg(Color::Yellow)),
        Span::raw(" quit"),
    ]);
    frame.render_widget(Paragraph::new(footer), area);
}
