//! Terminal presentation of console events.
//!
//! Assistant replies go to stdout; everything else (tool calls,
//! confidence, usage, status, errors) goes to stderr so that piping the
//! REPL's stdout yields just the conversation.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use lc_domain::{Confidence, StatusSnapshot, TokenUsage, ToolCall};
use lc_session::{ConsoleSink, ErrorKind};

pub(crate) const DIM: &str = "\x1B[2m";
pub(crate) const RED: &str = "\x1B[31m";
pub(crate) const YELLOW: &str = "\x1B[33m";
pub(crate) const GREEN: &str = "\x1B[32m";
pub(crate) const RESET: &str = "\x1B[0m";

/// Longest tool argument/result preview printed inline.
const PREVIEW_CHARS: usize = 120;

/// [`ConsoleSink`] that prints to the terminal.
///
/// Status polls are quiet unless reachability flips or the number of
/// online services changes; `/status` prints the full view on demand.
pub struct TerminalSink {
    echo_user: AtomicBool,
    last_reachable: Mutex<Option<bool>>,
}

impl Default for TerminalSink {
    fn default() -> Self {
        Self {
            echo_user: AtomicBool::new(true),
            last_reachable: Mutex::new(None),
        }
    }
}

impl TerminalSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether user messages are printed. Live input is already on
    /// screen, so the REPL turns this off once restored turns are shown.
    pub fn set_echo_user(&self, on: bool) {
        self.echo_user.store(on, Ordering::Relaxed);
    }
}

impl ConsoleSink for TerminalSink {
    fn on_user_message(&self, text: &str) {
        if self.echo_user.load(Ordering::Relaxed) {
            eprintln!("{DIM}you> {text}{RESET}");
        }
    }

    fn on_tool_calls(&self, calls: &[ToolCall]) {
        for call in calls {
            eprintln!("{DIM}{}{RESET}", tool_call_line(call));
        }
    }

    fn on_assistant_message(&self, text: &str) {
        println!("{text}");
        std::io::stdout().flush().ok();
    }

    fn on_confidence(&self, turn_index: usize, confidence: &Confidence) {
        eprintln!("{}", confidence_line(turn_index, confidence));
    }

    fn on_token_usage(&self, usage: &TokenUsage, session_total: u64) {
        eprintln!("{DIM}{}{RESET}\n", usage_line(usage, session_total));
    }

    fn on_status_change(&self, snapshot: &StatusSnapshot) {
        let mut last = self.last_reachable.lock();
        let flipped = matches!(*last, Some(prev) if prev != snapshot.reachable);
        *last = Some(snapshot.reachable);
        if flipped {
            if snapshot.reachable {
                eprintln!("{GREEN}[status] backend reachable again{RESET}");
            } else {
                eprintln!("{YELLOW}[status] backend unreachable, retrying{RESET}");
            }
        }
    }

    fn on_services_changed(&self, previous: usize, current: usize) {
        eprintln!("{YELLOW}[status] services online: {previous} -> {current}{RESET}");
    }

    fn on_error(&self, kind: ErrorKind, message: &str) {
        match kind {
            ErrorKind::Server => eprintln!("{RED}Error: {message}{RESET}"),
            ErrorKind::Network => eprintln!("{RED}Network error: {message}{RESET}"),
            ErrorKind::Cancelled => eprintln!("{DIM}({message}){RESET}"),
        }
    }
}

// ── formatting ───────────────────────────────────────────────────────

pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_owned();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{cut}…")
}

pub fn tool_call_line(call: &ToolCall) -> String {
    let args = truncate(&call.arguments.to_string(), PREVIEW_CHARS);
    match call.result.as_deref() {
        Some(result) => format!(
            "[tool: {} {args}] -> {}",
            call.name,
            truncate(result, PREVIEW_CHARS)
        ),
        None => format!("[tool: {} {args}]", call.name),
    }
}

pub fn confidence_line(turn_index: usize, confidence: &Confidence) -> String {
    let a = confidence.assessment();
    let pct = (a.score * 100.0).round() as u32;
    let mut line = format!(
        "[#{} confidence: {} {pct}% ({})]",
        turn_index + 1,
        a.label,
        confidence.source().as_str()
    );
    if !a.details.is_empty() {
        line.push_str(&format!(" {}", a.details));
    }
    line
}

pub fn usage_line(usage: &TokenUsage, session_total: u64) -> String {
    format!(
        "[tokens: {} in / {} out / {} total | session: {session_total}]",
        usage.input_tokens, usage.output_tokens, usage.total_tokens
    )
}

/// One line per service plus a summary line.
pub fn status_lines(snapshot: &StatusSnapshot) -> Vec<String> {
    let mut lines = Vec::with_capacity(snapshot.services.len() + 1);
    let checked = chrono::Local::now().format("%H:%M:%S");
    if !snapshot.reachable {
        lines.push(format!("backend unreachable (checked {checked})"));
    } else {
        let engine = snapshot.engine.as_deref().unwrap_or("unknown engine");
        lines.push(format!(
            "{}/{} services online, {} tools ({engine}, checked {checked})",
            snapshot.online_count,
            snapshot.services.len(),
            snapshot.total_tools
        ));
    }
    for service in &snapshot.services {
        let state = if service.is_online() { "online " } else { "offline" };
        let port = service
            .port
            .map(|p| format!(":{p}"))
            .unwrap_or_default();
        lines.push(format!(
            "  {state}  {}{port}  {} tool(s)",
            service.name, service.tool_count
        ));
    }
    lines
}
