// src/ui/widgets/summary.rs

use crate::app::{App, AppState};
use crate::core::models::{ProbeStatus, ReconReport, ThreatLevel};
use ratatui::{
    prelude::*,
    text::Line,
    widgets::{Block, Borders, Gauge, Paragraph},
};

/// Renders the summary panel: overall score, the state of each operation, issue
/// counts and the open ports. Nothing is drawn until a run has finished.
pub fn render_summary(frame: &mut Frame, app: &App, area: Rect) {
    let summary_container = Block::default().borders(Borders::ALL).title("Summary");
    frame.render_widget(summary_container, area);

    let summary_chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3), // Score & Rating section
            Constraint::Length(1), // Gauge chart
            Constraint::Length(1), // Spacer
            Constraint::Length(4), // Operations section
            Constraint::Length(1), // Spacer
            Constraint::Length(3), // Issues Found section
            Constraint::Length(1), // Spacer
            Constraint::Min(0),    // Open ports section
        ])
        .split(area);

    if app.state != AppState::Finished {
        return;
    }

    let Some(score) = app.summary.score else {
        let score_text = Text::from(vec![
            Line::from("Overall Score".bold()),
            Line::from("n/a (Incomplete Scan)").style(Style::default().fg(Color::Yellow)),
        ]);
        frame.render_widget(
            Paragraph::new(score_text).alignment(Alignment::Center),
            summary_chunks[0],
        );
        render_details(frame, app, &summary_chunks);
        return;
    };

    let (rating_text, rating_style) = match score {
        90..=100 => ("Low Exposure", Style::default().fg(Color::Green)),
        75..=89 => ("Moderate", Style::default().fg(Color::Cyan)),
        50..=74 => ("Elevated", Style::default().fg(Color::Yellow)),
        _ => ("High Exposure", Style::default().fg(Color::Red)),
    };
    let score_line = Line::from(format!("{}/100 ({})", score, rating_text)).style(rating_style);
    let score_text = Text::from(vec![Line::from("Overall Score".bold()), score_line]);
    frame.render_widget(
        Paragraph::new(score_text).alignment(Alignment::Center),
        summary_chunks[0],
    );

    let score_gauge = Gauge::default()
        .percent(app.displayed_score as u16)
        .label("")
        .style(Style::default().fg(if app.displayed_score >= 80 {
            Color::Green
        } else if app.displayed_score >= 50 {
            Color::Yellow
        } else {
            Color::Red
        }));
    frame.render_widget(score_gauge, summary_chunks[1]);

    render_details(frame, app, &summary_chunks);
}

fn render_details(frame: &mut Frame, app: &App, summary_chunks: &[Rect]) {
    let Some(report) = &app.report else {
        return;
    };

    let checks_block = Block::default().title("OPERATIONS".bold());
    frame.render_widget(
        Paragraph::new(operation_lines(report)).block(checks_block),
        summary_chunks[3],
    );

    let issues_block = Block::default().title("ISSUES FOUND".bold());
    let details_text = Text::from(vec![
        Line::from(vec![
            Span::raw("Critical: "),
            Span::styled(
                app.summary.critical_issues.to_string(),
                Style::default().fg(Color::Red),
            ),
        ]),
        Line::from(vec![
            Span::raw("Warnings: "),
            Span::styled(
                app.summary.warning_issues.to_string(),
                Style::default().fg(Color::Yellow),
            ),
        ]),
    ]);
    frame.render_widget(
        Paragraph::new(details_text).block(issues_block),
        summary_chunks[5],
    );

    let ports_block = Block::default().title("OPEN PORTS".bold());
    let mut port_lines = Vec::new();
    match &report.ports {
        Some(Ok(scan)) => {
            let open: Vec<_> = scan
                .scan_results
                .iter()
                .filter(|r| r.status == ProbeStatus::Open)
                .collect();
            if open.is_empty() {
                port_lines.push(Line::from("None."));
            }
            for result in open {
                port_lines.push(Line::from(vec![
                    Span::raw(format!("- {}/{} ", result.port, result.protocol)),
                    Span::styled(result.service.clone(), Style::default().fg(Color::Cyan)),
                ]));
            }
        }
        Some(Err(e)) => port_lines.push(Line::from(Span::styled(
            format!("Scan failed: {}", e),
            Style::default().fg(Color::Red),
        ))),
        None => {}
    }
    frame.render_widget(Paragraph::new(port_lines).block(ports_block), summary_chunks[7]);
}

/// `passed` is `None` when the operation ran but could not reach a verdict.
fn status_line(name: &str, passed: Option<bool>, detail: String) -> Line<'static> {
    let (icon, style) = match passed {
        Some(true) => ("✓", Style::default().fg(Color::Green)),
        Some(false) => ("✗", Style::default().fg(Color::Red)),
        None => ("?", Style::default().fg(Color::Yellow)),
    };
    Line::from(vec![
        Span::styled(format!("{} ", icon), style),
        Span::raw(format!("{}: {}", name, detail)),
    ])
}

fn operation_lines(report: &ReconReport) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    lines.push(match &report.ports {
        Some(Ok(scan)) => status_line(
            "Port Scan",
            Some(true),
            format!("{} open of {}", scan.open_ports, scan.scanned_ports),
        ),
        Some(Err(_)) => status_line("Port Scan", Some(false), "failed".to_string()),
        None => status_line("Port Scan", Some(false), "not run".to_string()),
    });

    lines.push(match &report.reputation {
        Some(Ok(verdict)) if verdict.insufficient_data => {
            status_line("Reputation", None, "insufficient data".to_string())
        }
        Some(Ok(verdict)) => status_line(
            "Reputation",
            Some(verdict.threat_level == ThreatLevel::Low),
            format!("{} ({}/100)", verdict.threat_level, verdict.confidence_score),
        ),
        Some(Err(e)) => status_line("Reputation", Some(false), e.clone()),
        None => status_line("Reputation", Some(false), "not run".to_string()),
    });

    lines.push(match &report.subdomains {
        Some(Ok(found)) => status_line(
            "Subdomains",
            Some(true),
            format!("{} of {} resolve", found.total_found, found.total_checked),
        ),
        Some(Err(e)) => status_line("Subdomains", Some(false), e.clone()),
        None => status_line("Subdomains", Some(true), "skipped for IP targets".to_string()),
    });

    lines
}
