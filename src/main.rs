// src/main.rs

use clap::Parser;
use color_eyre::eyre::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::prelude::*;
use serde::Serialize;
use std::io::stdout;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;

mod app;
mod cli;
mod config;
mod core;
mod error;
mod logging;
mod server;
mod ui;

use app::{App, AppState};
use cli::{Cli, Command};
use crate::config::Settings;
use crate::core::context::ReconContext;
use crate::core::models::{PortScanRequest, ReconReport};

type ScanOutcome = Result<ReconReport, String>;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    let command = cli.command();
    logging::initialize_logging(command != Command::Tui)?;

    let settings = Settings::load(cli.config.as_deref())?;
    let ctx = Arc::new(ReconContext::from_settings(settings)?);

    match command {
        Command::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| ctx.settings.server.bind.clone());
            server::serve(ctx, &bind).await?;
        }
        Command::Ports { host, scan_type, ports } => {
            let request = PortScanRequest {
                host: Some(host),
                ports,
                scan_type: Some(scan_type),
            };
            print_json(&core::scanner::port_scanner::run_port_scan(&ctx, request).await?)?;
        }
        Command::Reputation { ip } => {
            print_json(&core::reputation::check_reputation(&ctx, Some(&ip)).await?)?;
        }
        Command::Subdomains { domain } => {
            print_json(&core::subdomain::discover_subdomains(&ctx, Some(&domain)).await?)?;
        }
        Command::Tui => run_tui(ctx).await?,
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run_tui(ctx: Arc<ReconContext>) -> Result<()> {
    // --- Setup ---
    stdout().execute(EnterAlternateScreen)?;
    stdout().execute(EnableMouseCapture)?;
    enable_raw_mode()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    terminal.clear()?;

    let mut app = App::new();
    let (tx, mut rx) = mpsc::channel::<ScanOutcome>(1);
    info!("Terminal UI started.");

    let result = async {
        while !app.should_quit {
            terminal.draw(|frame| ui::render(&mut app, frame))?;

            if event::poll(Duration::from_millis(100))? {
                handle_events(&mut app, &ctx, &tx)?;
            }

            if let Ok(outcome) = rx.try_recv() {
                app.finish_scan(outcome);
            }
            app.on_tick();
        }
        Ok::<(), color_eyre::eyre::Report>(())
    }
    .await;

    // --- Restore Terminal ---
    stdout().execute(LeaveAlternateScreen)?;
    stdout().execute(DisableMouseCapture)?;
    disable_raw_mode()?;
    result
}

fn handle_events(app: &mut App, ctx: &Arc<ReconContext>, tx: &mpsc::Sender<ScanOutcome>) -> Result<()> {
    if let Event::Key(key) = event::read()? {
        if key.kind != KeyEventKind::Press {
            return Ok(());
        }
        if app.show_disclaimer {
            match key.code {
                KeyCode::Enter => app.acknowledge_disclaimer(),
                KeyCode::Char('q') | KeyCode::Esc => app.quit(),
                _ => {}
            }
            return Ok(());
        }
        match app.state {
            AppState::Idle => handle_idle_input(app, key.code, ctx, tx),
            AppState::Finished => handle_finished_input(app, key.code),
            AppState::Scanning => {
                if key.code == KeyCode::Esc {
                    app.quit();
                }
            }
        }
    }
    Ok(())
}

fn handle_idle_input(
    app: &mut App,
    key_code: KeyCode,
    ctx: &Arc<ReconContext>,
    tx: &mpsc::Sender<ScanOutcome>,
) {
    match key_code {
        KeyCode::Esc => app.quit(),
        KeyCode::Char(c) => app.input.push(c),
        KeyCode::Backspace => {
            app.input.pop();
        }
        KeyCode::Enter => {
            let Some(target) = app.start_scan() else {
                return;
            };
            let ctx = Arc::clone(ctx);
            let tx = tx.clone();
            tokio::spawn(async move {
                let outcome = core::scanner::run_full_recon(&ctx, &target)
                    .await
                    .map_err(|e| e.to_string());
                let _ = tx.send(outcome).await;
            });
        }
        _ => {}
    }
}

fn handle_finished_input(app: &mut App, key_code: KeyCode) {
    match key_code {
        KeyCode::Char('q') | KeyCode::Esc => app.quit(),
        KeyCode::Char('n') => app.reset(),
        KeyCode::Up => app.select_previous(),
        KeyCode::Down => app.select_next(),
        _ => {}
    }
}
