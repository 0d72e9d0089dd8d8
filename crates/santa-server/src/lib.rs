//! Secret Santa coordinator service.
//!
//! This crate hosts the stateful side of the exchange:
//! - Participant registry with profiles and exclusion lists
//! - Admin-gated shuffle over `santa-core`
//! - Anonymous relay between gifters and recipients
//! - CBOR state snapshots
//! - A line-oriented console driver on Tokio
//!
//! ## Architecture
//!
//! ```text
//! santa-server
//!   ├─ SystemEnv          (production Environment impl)
//!   ├─ Server             (console driver, persistence)
//!   ├─ Coordinator        (command handling, epoch gating)
//!   │    ├─ Registry      (participants + exclusions)
//!   │    ├─ AssignmentStore (committed set, from santa-core)
//!   │    └─ MessageLog    (relayed messages)
//!   └─ StateSnapshot      (persistence format)
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
pub mod console;
mod coordinator;
mod error;
mod registry;
mod relay;
mod state;
mod system_env;

use std::{path::PathBuf, sync::Arc};

pub use config::{AdminList, ServerConfig};
pub use coordinator::{BotAction, Command, Coordinator, Delivery, ProfileView, Reply};
pub use error::{CommandError, ServerError};
pub use registry::{ProfileField, Registration, Registry, RegistryError};
pub use relay::{AnonymousMessage, Direction, MessageLog, RelayError, Route, route};
use santa_core::{AssignmentStore, Environment};
pub use state::{STATE_VERSION, StateError, StateSnapshot};
pub use system_env::SystemEnv;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt},
    sync::Mutex,
};

/// Console server.
///
/// Feeds input lines to one `Coordinator` and writes rendered output. The
/// coordinator sits behind a single mutex, so commands are applied one at a
/// time.
pub struct Server<E: Environment = SystemEnv> {
    coordinator: Arc<Mutex<Coordinator<E>>>,
    state_path: Option<PathBuf>,
}

impl<E: Environment> Server<E> {
    /// Build a server, resuming from `config.state_path` if it exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the state file
    /// cannot be read.
    pub fn open(config: ServerConfig, env: E) -> Result<Self, ServerError> {
        config.validate()?;

        let coordinator = match config.state_path.as_deref() {
            Some(path) => match StateSnapshot::load(path)? {
                Some(state) => {
                    tracing::info!(
                        path = %path.display(),
                        participants = state.participants.len(),
                        assignments = state.assignments.len(),
                        "state restored"
                    );
                    Coordinator::from_state(&config, env, state)?
                },
                None => {
                    tracing::info!(path = %path.display(), "no state file, starting fresh");
                    Coordinator::new(&config, env)
                },
            },
            None => Coordinator::new(&config, env),
        };

        Ok(Self { coordinator: Arc::new(Mutex::new(coordinator)), state_path: config.state_path })
    }

    /// Shared handle to the coordinator.
    pub fn coordinator(&self) -> Arc<Mutex<Coordinator<E>>> {
        Arc::clone(&self.coordinator)
    }

    /// Handle one console line and return the rendered output lines.
    ///
    /// Refused commands are reported to their sender. Blank lines produce no
    /// output. State is saved after every `PersistState` action, and also when
    /// a refused command left the committed set empty.
    ///
    /// # Errors
    ///
    /// Returns an error only if state could not be persisted.
    pub async fn handle_line(&self, line: &str) -> Result<Vec<String>, ServerError> {
        if line.trim().is_empty() {
            return Ok(Vec::new());
        }

        let (sender, command) = match console::parse_line(line) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(error = %e, "unparseable line");
                return Ok(vec![format!("error: {e}")]);
            },
        };

        let mut coordinator = self.coordinator.lock().await;
        let had_epoch = coordinator.store().has_assignments().unwrap_or(false);
        let actions = match coordinator.handle(sender, command) {
            Ok(actions) => actions,
            Err(e) => {
                // A failed reshuffle has already discarded the committed set.
                if had_epoch && !coordinator.store().has_assignments().unwrap_or(true) {
                    tracing::info!(sender, "epoch discarded by failed command");
                    self.persist(&coordinator)?;
                }
                if e.is_user_error() {
                    tracing::debug!(sender, error = %e, "command refused");
                    return Ok(vec![format!("-> {sender}: {e}")]);
                }
                tracing::error!(sender, error = %e, "command failed");
                return Ok(vec![format!("-> {sender}: internal error, please retry")]);
            },
        };

        let mut output = Vec::with_capacity(actions.len());
        for action in &actions {
            match action {
                BotAction::PersistState => self.persist(&coordinator)?,
                _ => {
                    if let Some((to, text)) = console::render_action(action) {
                        output.push(format!("-> {to}: {text}"));
                    }
                },
            }
        }
        Ok(output)
    }

    /// Read lines from `input` until EOF, writing output to `output`.
    ///
    /// # Errors
    ///
    /// Returns an error on console I/O failure or if state could not be
    /// persisted.
    pub async fn run<R, W>(&self, input: R, mut output: W) -> Result<(), ServerError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();
        while let Some(line) = lines.next_line().await? {
            for out in self.handle_line(&line).await? {
                output.write_all(out.as_bytes()).await?;
                output.write_all(b"\n").await?;
            }
            output.flush().await?;
        }
        tracing::info!("console closed");
        Ok(())
    }

    fn persist(&self, coordinator: &Coordinator<E>) -> Result<(), ServerError> {
        let Some(path) = self.state_path.as_deref() else {
            return Ok(());
        };
        let state = coordinator
            .export_state()
            .map_err(|e| ServerError::Internal(format!("failed to export state: {e}")))?;
        state.save(path)?;
        Ok(())
    }
}
