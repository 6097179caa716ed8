// src/ui/widgets/findings_view.rs

use crate::app::{App, AppState, SPINNER_CHARS};
use crate::core::models::{Finding, FindingCategory, Severity};
use ratatui::{
    prelude::*,
    text::Line,
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
};

pub fn render_findings_view(frame: &mut Frame, app: &mut App, area: Rect) {
    let main_block = Block::default()
        .borders(Borders::ALL)
        .title("Findings (Navigate with ↑ ↓)");

    if app.state != AppState::Finished {
        let content = match app.state {
            AppState::Scanning => {
                let spinner_char = SPINNER_CHARS[app.spinner_frame];
                Paragraph::new(Line::from(vec![
                    Span::styled(format!("{} ", spinner_char), Style::default().fg(Color::Cyan)),
                    Span::raw("Scanning ports, reputation and subdomains... Please wait."),
                ]))
            }
            _ => Paragraph::new("Scan results will appear here..."),
        };
        frame.render_widget(content.alignment(Alignment::Center).block(main_block), area);
        return;
    }

    if let Some(error) = &app.error {
        let p = Paragraph::new(Line::from(format!("Scan failed: {}", error)).red())
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(main_block);
        frame.render_widget(p, area);
        return;
    }

    let inner_area = main_block.inner(area);
    frame.render_widget(main_block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Min(0)])
        .split(inner_area);

    let items: Vec<ListItem> = app.findings.iter().map(finding_item).collect();
    let findings_list = List::new(items)
        .block(Block::default())
        .highlight_style(Style::new().bg(Color::DarkGray).add_modifier(Modifier::BOLD));
    frame.render_stateful_widget(findings_list, chunks[0], &mut app.findings_state);

    let detail_block = Block::default().borders(Borders::TOP).title("Details");
    let selected = app
        .findings_state
        .selected()
        .and_then(|index| app.findings.get(index));
    match selected {
        Some(finding) => {
            let text = vec![
                Line::from(""),
                Line::from("WHAT IT IS:".yellow().bold()),
                Line::from(finding.description.as_str()),
                Line::from(""),
                Line::from("HOW TO FIX:".yellow().bold()),
                Line::from(finding.remediation.as_str()),
            ];
            let p = Paragraph::new(text).wrap(Wrap { trim: true }).block(detail_block);
            frame.render_widget(p, chunks[1]);
        }
        None => render_placeholder_details(frame, app, detail_block, chunks[1]),
    }
}

fn finding_item(finding: &Finding) -> ListItem<'_> {
    let category_prefix = match finding.category {
        FindingCategory::Ports => "[PORTS] ",
        FindingCategory::Reputation => "[REPUTATION] ",
        FindingCategory::Subdomains => "[SUBDOMAIN] ",
    };
    let title_style = match finding.severity {
        Severity::Critical => Style::default().fg(Color::Red),
        Severity::Warning => Style::default().fg(Color::Yellow),
        Severity::Info => Style::default().fg(Color::Cyan),
    };

    ListItem::new(Line::from(vec![
        Span::styled(category_prefix, Style::default().fg(Color::DarkGray)),
        Span::styled(finding.title.as_str(), title_style),
    ]))
}

fn render_placeholder_details(frame: &mut Frame, app: &App, block: Block, area: Rect) {
    let total_issues = app.summary.critical_issues + app.summary.warning_issues;

    let placeholder_text = if app.summary.score.is_none() {
        Text::from(vec![
            Line::from(""),
            Line::from("? INCOMPLETE SCAN".bold().fg(Color::Yellow)),
            Line::from(""),
            Line::from("Some operations failed or lacked data; absence of issues is not a clean result."),
        ])
    } else if total_issues == 0 {
        Text::from(vec![
            Line::from(""),
            Line::from("✓ NO EXPOSURE FOUND".bold().fg(Color::Green)),
            Line::from(""),
            Line::from("No critical or warning issues were found for this target."),
        ])
    } else {
        Text::from("Select an item above to see details.")
    };

    let p = Paragraph::new(placeholder_text)
        .alignment(Alignment::Center)
        .block(block);
    frame.render_widget(p, area);
}
