//! `labconsole chat`: interactive REPL command.
//!
//! Restores the saved session, starts the background status poller, then
//! reads lines from the terminal. Plain lines are sent as turns; lines
//! starting with `/` are console commands. Ctrl+C while a reply is
//! pending stops that turn.

use std::path::PathBuf;
use std::sync::Arc;

use lc_client::{ConsoleBackend, ProviderConfig, ProvidersResponse, ServiceAction, ToggleRequest};
use lc_domain::config::Config;
use lc_domain::Turn;
use lc_session::{
    StatusPoller, SubmitOutcome, TokioScheduler, TurnController, TurnOutcome, TurnStore,
    VerifyOutcome,
};

use crate::render::{status_lines, TerminalSink, DIM, GREEN, RED, RESET};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Public entry point
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Run the interactive chat REPL until `/exit` or Ctrl+D.
pub async fn chat(config: Arc<Config>, fresh: bool) -> anyhow::Result<()> {
    // 1. Wire the session core to the terminal.
    let backend = lc_client::create_backend(&config.client)?;
    let sink = Arc::new(TerminalSink::new());
    let store = TurnStore::new(backend.clone());
    let controller = TurnController::new(backend.clone(), store.clone(), sink.clone());
    let poller = StatusPoller::new(
        backend.clone(),
        sink.clone(),
        Arc::new(TokioScheduler),
        config.poller.clone(),
    );

    // 2. Readline editor with persistent history.
    let history_path = config
        .console
        .history_file
        .clone()
        .unwrap_or_else(default_history_path);
    if let Some(parent) = history_path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let mut rl = rustyline::DefaultEditor::new()?;
    let _ = rl.load_history(&history_path);

    // 3. Welcome banner on stderr (stdout carries replies only).
    eprintln!("labconsole interactive chat");
    eprintln!(
        "Backend: {}  |  Type /help for commands, Ctrl+C stops a reply, Ctrl+D exits",
        config.client.base_url
    );
    eprintln!();

    // 4. Replay the saved session.
    if fresh {
        eprintln!("{DIM}(fresh session: the saved one is replaced on the first reply){RESET}\n");
    } else if config.console.restore_on_start {
        let restored = controller.restore().await;
        if restored > 0 {
            eprintln!(
                "{DIM}Restored {restored} turn(s), {} tokens this session.{RESET}\n",
                store.session_tokens()
            );
        }
    }
    sink.set_echo_user(false);

    // 5. Background status polling.
    if config.poller.enabled {
        tokio::spawn(poller.start());
    }

    let repl = Repl {
        backend,
        controller,
        poller: poller.clone(),
    };

    // 6. REPL loop.
    loop {
        match rl.readline("you> ") {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }

                rl.add_history_entry(&line).ok();

                if trimmed.starts_with('/') {
                    if repl.handle_slash_command(trimmed).await {
                        break;
                    }
                    continue;
                }

                repl.send_message(trimmed).await;
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                eprintln!("(Use Ctrl+D or /exit to quit)");
                continue;
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                break;
            }
            Err(e) => {
                eprintln!("{RED}readline error: {e}{RESET}");
                break;
            }
        }
    }

    // 7. Tear down: history, poller, pending session writes.
    rl.save_history(&history_path).ok();
    poller.stop();
    store.flush().await;

    eprintln!("Goodbye!");
    Ok(())
}

fn default_history_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_default()
        .join(".labconsole")
        .join("history.txt")
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// REPL state
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

struct Repl {
    backend: Arc<dyn ConsoleBackend>,
    controller: TurnController,
    poller: StatusPoller,
}

impl Repl {
    /// Submit a turn and wait for it, stopping it on Ctrl+C.
    async fn send_message(&self, text: &str) {
        let handle = match self.controller.submit(text) {
            SubmitOutcome::Started(handle) => handle,
            SubmitOutcome::Cancelled | SubmitOutcome::Ignored => return,
        };

        let wait = handle.wait();
        tokio::pin!(wait);
        let outcome = tokio::select! {
            outcome = &mut wait => outcome,
            _ = tokio::signal::ctrl_c() => {
                self.controller.abort();
                wait.await
            }
        };

        if let TurnOutcome::Completed { index } = outcome {
            let verifiable = self
                .controller
                .store()
                .turn(index)
                .is_some_and(|t| t.can_verify());
            if verifiable {
                eprintln!("{DIM}(/verify {} for a model-based check){RESET}\n", index + 1);
            }
        }
    }

    /// Process a slash command. Returns `true` if the REPL should exit.
    async fn handle_slash_command(&self, input: &str) -> bool {
        let mut parts = input.split_whitespace();
        let Some(cmd) = parts.next() else {
            return false;
        };
        let args: Vec<&str> = parts.collect();

        match cmd {
            "/exit" | "/quit" => return true,

            "/verify" => self.verify(args.first().copied()).await,

            "/status" => {
                self.poller.poll().await;
                for line in status_lines(&self.poller.snapshot()) {
                    eprintln!("{line}");
                }
            }

            "/tools" => self.list_tools().await,

            "/providers" => match self.backend.providers().await {
                Ok(resp) => print_providers(&resp),
                Err(e) => eprintln!("{RED}error: {e}{RESET}"),
            },

            "/provider" => self.set_provider(&args).await,

            "/toggle" => self.toggle(&args).await,

            "/clear" => {
                self.controller.reset();
                // ANSI escape: clear screen and move cursor to top-left.
                eprint!("\x1B[2J\x1B[1;1H");
                eprintln!("Session cleared.");
            }

            "/help" => print_help(),

            other => {
                eprintln!("Unknown command: {other}  (type /help for a list)");
            }
        }

        false
    }

    async fn verify(&self, arg: Option<&str>) {
        let turns = self.controller.store().turns();
        let index = match arg {
            Some(raw) => match parse_turn_number(raw) {
                Some(i) => i,
                None => {
                    eprintln!("Usage: /verify [turn number]");
                    return;
                }
            },
            None => match latest_verifiable(&turns) {
                Some(i) => i,
                None => {
                    eprintln!("Nothing to verify: no unverified turn used tools.");
                    return;
                }
            },
        };

        eprintln!("{DIM}verifying turn #{}...{RESET}", index + 1);
        match self.controller.verify(index).await {
            // The sink already printed the new confidence and usage.
            VerifyOutcome::Upgraded(_) | VerifyOutcome::Failed => {}
            VerifyOutcome::NotEligible => eprintln!(
                "Turn #{} cannot be verified (missing, already verified, or no tool calls).",
                index + 1
            ),
            VerifyOutcome::InFlight => {
                eprintln!("Turn #{} is already being verified.", index + 1)
            }
            VerifyOutcome::Discarded => {
                eprintln!("{DIM}(session cleared; verification discarded){RESET}")
            }
        }
    }

    async fn list_tools(&self) {
        match self.backend.tools().await {
            Ok(resp) => {
                if let Some(err) = resp.error {
                    eprintln!("{RED}tool listing failed: {err}{RESET}");
                }
                if resp.tools.is_empty() {
                    eprintln!("No tools available.");
                }
                for tool in &resp.tools {
                    if tool.description.is_empty() {
                        eprintln!("  {}", tool.name);
                    } else {
                        eprintln!("  {}: {}", tool.name, tool.description);
                    }
                }
            }
            Err(e) => eprintln!("{RED}error: {e}{RESET}"),
        }
    }

    async fn set_provider(&self, args: &[&str]) {
        let Some(provider) = args.first() else {
            eprintln!("Usage: /provider <id> [model]");
            return;
        };
        let cfg = ProviderConfig {
            provider: (*provider).to_string(),
            model: args.get(1).map(|m| (*m).to_string()),
            api_key: None,
            base_url: None,
        };
        match self.backend.set_provider(cfg).await {
            Ok(()) => eprintln!("{GREEN}Provider set to: {provider}{RESET}"),
            Err(e) => eprintln!("{RED}error: {e}{RESET}"),
        }
    }

    async fn toggle(&self, args: &[&str]) {
        let Some(req) = parse_toggle(args) else {
            eprintln!("Usage: /toggle <service> <start|stop>");
            return;
        };

        match self.backend.controls().await {
            Ok(controls) if controls.enabled => {}
            Ok(controls) => {
                let reason = controls.reason.unwrap_or_else(|| "disabled".into());
                eprintln!("Service controls unavailable: {reason}");
                return;
            }
            Err(e) => {
                eprintln!("{RED}error: {e}{RESET}");
                return;
            }
        }

        let service = req.service.clone();
        match self.backend.toggle_service(req).await {
            Ok(()) => {
                eprintln!("{GREEN}{service}: requested{RESET}");
                // Refresh now; the poller reports the change if any.
                self.poller.poll().await;
            }
            Err(e) => eprintln!("{RED}error: {e}{RESET}"),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// 1-based turn number to index.
fn parse_turn_number(raw: &str) -> Option<usize> {
    raw.parse::<usize>().ok()?.checked_sub(1)
}

/// Index of the most recent turn that can still be verified.
fn latest_verifiable(turns: &[Turn]) -> Option<usize> {
    turns.iter().rposition(Turn::can_verify)
}

fn parse_toggle(args: &[&str]) -> Option<ToggleRequest> {
    let [service, action] = args else {
        return None;
    };
    let action = match action.to_ascii_lowercase().as_str() {
        "start" => ServiceAction::Start,
        "stop" => ServiceAction::Stop,
        _ => return None,
    };
    Some(ToggleRequest {
        service: (*service).to_string(),
        action,
    })
}

/// The backend reports the active provider either as a bare id or as the
/// full config object.
fn active_provider_id(resp: &ProvidersResponse) -> Option<&str> {
    resp.active
        .as_str()
        .or_else(|| resp.active.get("provider").and_then(|v| v.as_str()))
}

fn print_providers(resp: &ProvidersResponse) {
    let active = active_provider_id(resp);
    for p in &resp.providers {
        let marker = if Some(p.id.as_str()) == active { "*" } else { " " };
        let key = if p.requires_key && !p.has_key {
            "  (no API key)"
        } else {
            ""
        };
        eprintln!(
            "{marker} {:<10} {}  [default model: {}]{key}",
            p.id, p.name, p.default_model
        );
    }
}

fn print_help() {
    eprintln!("Commands:");
    eprintln!("  /verify [n]                    Model-check turn n (default: latest eligible)");
    eprintln!("  /status                        Poll and show service status");
    eprintln!("  /tools                         List available tools");
    eprintln!("  /providers                     List LLM providers (* = active)");
    eprintln!("  /provider <id> [model]         Switch the LLM provider");
    eprintln!("  /toggle <service> <start|stop> Start or stop a tool service");
    eprintln!("  /clear                         Clear the session and the screen");
    eprintln!("  /exit, /quit                   Exit the chat");
    eprintln!("  /help                          Show this help");
}
