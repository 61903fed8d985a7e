//! A terminal front end for the team.
//!
//! Reads one task per line and prints the answer. Set `AUTOTEAM_AGENT` to
//! send tasks straight to a specialist instead of the manager.

#[macro_use]
extern crate tracing;

use std::env;
use std::io::Write as _;
use std::pin::pin;
use std::time::{Duration, Instant};

use autoteam::core::tool::ApprovalRequest;
use autoteam::core::{AgentEvent, AgentEventKind, RunResult};
use autoteam::{DEFAULT_MAX_ITERATIONS, Settings, Team, TeamBuilder};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use tokio::io::{self, AsyncBufReadExt};
use tokio::select;
use tokio::sync::mpsc;
use tokio::time::sleep;

enum CliEvent {
    Agent(AgentEvent),
    Approval(ApprovalRequest),
}

const BAR_CHAR: &str = "▎";

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("{err}");
            return;
        }
    };
    debug!("{settings:?}");
    let agent = env::var("AUTOTEAM_AGENT")
        .ok()
        .filter(|agent| !agent.trim().is_empty());

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();

    let team = TeamBuilder::from_settings(&settings)
        .on_event({
            let event_tx = event_tx.clone();
            move |event| {
                event_tx.send(CliEvent::Agent(event)).ok();
            }
        })
        .with_approval_handler({
            let event_tx = event_tx.clone();
            move |request| {
                event_tx.send(CliEvent::Approval(request)).ok();
            }
        })
        .build();
    let team = match team {
        Ok(team) => team,
        Err(err) => {
            eprintln!("{err}");
            return;
        }
    };

    if let Some(agent) = &agent {
        if team.agent(agent).is_none() {
            eprintln!("Unknown agent: {agent}");
            return;
        }
        println!("Sending tasks to {}", agent.bright_white().bold());
    }

    let progress_style = ProgressStyle::with_template("{spinner} {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");

    'outer: loop {
        print!("> ");
        std::io::stdout().flush().ok();

        let Some(line) = read_line().await else {
            break;
        };
        let task = line.trim();
        if task.is_empty() {
            continue;
        }

        let started_at = Instant::now();
        let mut run =
            pin!(team.run(task, None, agent.as_deref(), DEFAULT_MAX_ITERATIONS));
        let mut progress_bar: Option<ProgressBar> = None;

        let outcome = loop {
            // Create a new progress bar if it has been finished.
            let bar = progress_bar.get_or_insert_with(|| {
                let progress_bar = ProgressBar::new_spinner();
                progress_bar.set_style(progress_style.clone());
                progress_bar.set_message("🤔 Thinking...");
                progress_bar
            });
            bar.inc(1);

            let event = select! {
                outcome = &mut run => break outcome,
                event = event_rx.recv() => {
                    let Some(event) = event else {
                        break 'outer;
                    };
                    event
                },
                _ = sleep(Duration::from_millis(100)) => {
                    continue;
                }
            };

            match event {
                CliEvent::Agent(event) => show_progress(bar, event),
                CliEvent::Approval(request) => {
                    // Finish the progress bar before asking anything.
                    bar.finish_and_clear();
                    progress_bar = None;
                    if !ask_approval(request).await {
                        break 'outer;
                    }
                }
            }
        };

        if let Some(progress_bar) = &progress_bar {
            progress_bar.finish_and_clear();
        }
        match outcome {
            Ok(result) => print_result(&team, &result, started_at),
            Err(err) => eprintln!("{}", err.red()),
        }
    }
}

fn show_progress(bar: &ProgressBar, event: AgentEvent) {
    let AgentEvent { agent_id, kind } = event;
    match kind {
        AgentEventKind::Thinking { iteration } => {
            bar.set_message(format!("🤔 {agent_id} is thinking (step {iteration})..."));
        }
        AgentEventKind::ToolStarted { name } => {
            bar.set_message(format!("🔧 {agent_id} → {name}"));
        }
        AgentEventKind::ToolFinished { name, success: false } => {
            bar.println(format!(
                "{}⚠️  {name} failed for {agent_id}",
                BAR_CHAR.bright_yellow()
            ));
        }
        AgentEventKind::RunFinished { success: false } => {
            bar.println(format!(
                "{}❌ {agent_id} gave up",
                BAR_CHAR.bright_red()
            ));
        }
        _ => {}
    }
}

async fn ask_approval(request: ApprovalRequest) -> bool {
    let bar = BAR_CHAR.bright_yellow();
    println!(
        "\n{bar}⚠️  {} asks for approval ({} risk):",
        request.agent_id(),
        request.risk_level()
    );
    println!("{bar}{}", request.decision().bright_white().bold());
    println!("{bar}{}", request.rationale());
    print!("Approve? [Y/n]: ");
    std::io::stdout().flush().ok();

    let Some(line) = read_line().await else {
        return false;
    };
    let line = line.trim();
    if line.is_empty() || line.eq_ignore_ascii_case("y") {
        request.approve();
    } else {
        request.reject(None);
    }

    println!();
    true
}

fn print_result(team: &Team, result: &RunResult, started_at: Instant) {
    match (&result.result, &result.error) {
        (Some(answer), _) => {
            println!("{}🤖 {}", BAR_CHAR.bright_cyan(), answer.bright_white());
        }
        (None, Some(error)) => {
            println!("{}❌ {}", BAR_CHAR.bright_red(), error.red());
        }
        (None, None) => {}
    }

    let mut stats = format!(
        "{} iterations · {:.1}s · {} tokens",
        result.iterations,
        started_at.elapsed().as_secs_f64(),
        result.usage.total(),
    );
    if let Some(budget) = team.budget() {
        let today = budget.get_daily_usage(None);
        stats.push_str(&format!(
            " · ${:.4} spent today ({:.1}% of budget)",
            today.total_cost_usd, today.budget_used_percentage
        ));
    }
    println!("{}\n", stats.dimmed());
}

async fn read_line() -> Option<String> {
    let mut stdin = io::BufReader::new(io::stdin());
    let mut line = String::new();

    match stdin.read_line(&mut line).await {
        Ok(count) => {
            if count == 0 {
                return None;
            }
            Some(line)
        }
        Err(err) => {
            error!("error reading input: {}", err);
            None
        }
    }
}
