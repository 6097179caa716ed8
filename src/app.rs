// src/app.rs

use crate::core::models::{Finding, ReconReport, Severity};
use crate::core::scanner::collect_findings;
use ratatui::widgets::ListState;

pub const SPINNER_CHARS: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Idle,
    Scanning,
    Finished,
}

#[derive(Debug, Default, PartialEq)]
pub struct ScanSummary {
    /// `None` when the run failed or any operation could not give a verdict.
    pub score: Option<u8>,
    pub critical_issues: usize,
    pub warning_issues: usize,
}

pub struct App {
    pub should_quit: bool,
    pub show_disclaimer: bool,
    pub state: AppState,
    pub input: String,
    pub report: Option<ReconReport>,
    pub error: Option<String>,
    pub findings: Vec<Finding>,
    pub findings_state: ListState,
    pub summary: ScanSummary,
    /// Animates toward `summary.score` on each tick.
    pub displayed_score: u8,
    pub spinner_frame: usize,
}

impl App {
    pub fn new() -> Self {
        Self {
            should_quit: false,
            show_disclaimer: true,
            state: AppState::Idle,
            input: String::new(),
            report: None,
            error: None,
            findings: Vec::new(),
            findings_state: ListState::default(),
            summary: ScanSummary::default(),
            displayed_score: 0,
            spinner_frame: 0,
        }
    }

    pub fn acknowledge_disclaimer(&mut self) {
        self.show_disclaimer = false;
    }

    pub fn start_scan(&mut self) -> Option<String> {
        let target = self.input.trim().to_string();
        if target.is_empty() {
            return None;
        }
        self.state = AppState::Scanning;
        self.error = None;
        Some(target)
    }

    /// Stores a finished run and recomputes findings and summary.
    pub fn finish_scan(&mut self, outcome: Result<ReconReport, String>) {
        self.state = AppState::Finished;
        match outcome {
            Ok(report) => {
                self.findings = collect_findings(&report);
                self.report = Some(report);
            }
            Err(e) => {
                self.findings.clear();
                self.report = None;
                self.error = Some(e);
            }
        }
        self.findings_state.select(None);
        self.update_summary();
    }

    pub fn select_previous(&mut self) {
        if self.findings.is_empty() {
            return;
        }
        let index = match self.findings_state.selected() {
            Some(0) | None => 0,
            Some(i) => i - 1,
        };
        self.findings_state.select(Some(index));
    }

    pub fn select_next(&mut self) {
        if self.findings.is_empty() {
            return;
        }
        let last = self.findings.len() - 1;
        let index = match self.findings_state.selected() {
            Some(i) => (i + 1).min(last),
            None => 0,
        };
        self.findings_state.select(Some(index));
    }

    pub fn update_summary(&mut self) {
        let criticals = self.count(Severity::Critical);
        let warnings = self.count(Severity::Warning);
        let score = 100_i64 - (criticals as i64 * 15) - (warnings as i64 * 5);
        let complete = self.error.is_none() && self.report.as_ref().is_some_and(is_complete);

        self.summary = ScanSummary {
            score: complete.then(|| score.clamp(0, 100) as u8),
            critical_issues: criticals,
            warning_issues: warnings,
        };
    }

    fn count(&self, severity: Severity) -> usize {
        self.findings.iter().filter(|f| f.severity == severity).count()
    }

    pub fn on_tick(&mut self) {
        match self.state {
            AppState::Scanning => {
                self.spinner_frame = (self.spinner_frame + 1) % SPINNER_CHARS.len();
            }
            AppState::Finished => {
                if let Some(score) = self.summary.score {
                    if self.displayed_score < score {
                        self.displayed_score = (self.displayed_score + 2).min(score);
                    }
                }
            }
            AppState::Idle => {}
        }
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    pub fn reset(&mut self) {
        self.state = AppState::Idle;
        self.input = String::new();
        self.report = None;
        self.error = None;
        self.findings.clear();
        self.findings_state = ListState::default();
        self.summary = ScanSummary::default();
        self.displayed_score = 0;
        self.spinner_frame = 0;
    }
}

/// True when every operation that ran produced a usable result.
fn is_complete(report: &ReconReport) -> bool {
    let ports_ok = !matches!(report.ports, Some(Err(_)));
    let subdomains_ok = !matches!(report.subdomains, Some(Err(_)));
    let reputation_ok = match &report.reputation {
        Some(Ok(verdict)) => !verdict.insufficient_data,
        Some(Err(_)) => false,
        None => true,
    };
    ports_ok && subdomains_ok && reputation_ok
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{
        AggregatedVerdict, FindingCategory, ReputationRecommendation, ThreatLevel,
    };
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn report_with_threat(level: ThreatLevel, titles: &[&str]) -> ReconReport {
        let verdict = AggregatedVerdict {
            ip: "203.0.113.5".parse().unwrap(),
            is_private: false,
            threat_level: level,
            confidence_score: 80,
            insufficient_data: false,
            categories: vec!["malicious".to_string()],
            details: BTreeMap::new(),
            recommendations: titles
                .iter()
                .map(|t| ReputationRecommendation {
                    title: t.to_string(),
                    description: String::new(),
                })
                .collect(),
            timestamp: Utc::now(),
        };
        ReconReport {
            target: "203.0.113.5".to_string(),
            reputation: Some(Ok(verdict)),
            ..Default::default()
        }
    }

    #[test]
    fn score_drops_per_issue() {
        let mut app = App::new();
        app.finish_scan(Ok(report_with_threat(
            ThreatLevel::High,
            &["Malicious Activity Detected", "Consider Blocking This IP"],
        )));
        assert_eq!(app.state, AppState::Finished);
        assert_eq!(app.findings.len(), 2);
        assert!(app.findings.iter().all(|f| f.category == FindingCategory::Reputation));
        assert_eq!(
            app.summary,
            ScanSummary { score: Some(70), critical_issues: 2, warning_issues: 0 }
        );
    }

    #[test]
    fn failed_run_keeps_the_error() {
        let mut app = App::new();
        app.input = "bad target".to_string();
        assert_eq!(app.start_scan(), Some("bad target".to_string()));
        app.finish_scan(Err("Invalid target".to_string()));
        assert_eq!(app.error.as_deref(), Some("Invalid target"));
        assert_eq!(app.summary.score, None);
        app.on_tick();
        assert_eq!(app.displayed_score, 0);
    }

    #[test]
    fn failed_operations_leave_the_score_unknown() {
        let mut app = App::new();
        app.finish_scan(Ok(ReconReport {
            target: "example.com".to_string(),
            ports: Some(Err("Scheduler misconfigured".to_string())),
            reputation: Some(Err("All sources unavailable".to_string())),
            subdomains: Some(Err("DNS failure".to_string())),
        }));
        assert!(app.error.is_none());
        assert_eq!(app.summary.score, None);
    }

    #[test]
    fn insufficient_reputation_data_is_not_a_clean_score() {
        let mut app = App::new();
        let mut report = report_with_threat(ThreatLevel::Low, &[]);
        if let Some(Ok(verdict)) = report.reputation.as_mut() {
            verdict.insufficient_data = true;
        }
        app.finish_scan(Ok(report));
        assert_eq!(app.summary.score, None);
    }

    #[test]
    fn selection_stays_in_bounds() {
        let mut app = App::new();
        app.select_next();
        assert_eq!(app.findings_state.selected(), None);

        app.finish_scan(Ok(report_with_threat(ThreatLevel::Medium, &["A", "B"])));
        app.select_previous();
        assert_eq!(app.findings_state.selected(), Some(0));
        app.select_next();
        app.select_next();
        assert_eq!(app.findings_state.selected(), Some(1));
    }

    #[test]
    fn empty_input_does_not_start_a_scan() {
        let mut app = App::new();
        app.input = "   ".to_string();
        assert_eq!(app.start_scan(), None);
        assert_eq!(app.state, AppState::Idle);
    }
}
