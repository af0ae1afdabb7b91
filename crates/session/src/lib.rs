//! `lc-session`: the console's session core.
//!
//! - [`TurnStore`]: the turn log, mirrored to the backend's session history.
//! - [`TurnController`]: single-flight send/abort/verify lifecycle.
//! - [`StatusPoller`]: adaptive, self-rescheduling service status poller.
//! - [`ConsoleSink`]: the only way anything here reaches the screen.

pub mod controller;
pub mod poller;
pub mod scheduler;
pub mod sink;
pub mod store;
pub mod totals;

pub use controller::{SubmitOutcome, TurnController, TurnHandle, TurnOutcome, VerifyOutcome};
pub use poller::{next_delay, PollResult, StatusPoller};
pub use scheduler::{ManualScheduler, Scheduler, TimerHandle, TokioScheduler};
pub use sink::{ChannelSink, ConsoleEvent, ConsoleSink, ErrorKind};
pub use store::TurnStore;
pub use totals::SessionTotals;
