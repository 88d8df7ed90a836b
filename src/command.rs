use serde::Serialize;

use crate::error::{EngineError, Result};
use crate::state::clock_time;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandStatus {
    Pending,
    Success,
    /// Modeled terminal state; nothing currently produces it.
    Failed,
}

/// A user-issued command, distinct from agent-proposed actions.
#[derive(Debug, Clone, Serialize)]
pub struct Command {
    pub id: u64,
    pub timestamp: String,
    pub command: String,
    pub target: String,
    pub agent: String,
    pub status: CommandStatus,
    pub response: String,
}

/// Handle for a submitted command: the id to patch and the dispatcher epoch
/// the delayed completion must still match.
#[derive(Debug, Clone, Copy)]
pub struct CommandTicket {
    pub id: u64,
    pub epoch: u64,
}

/// Command history, most-recent-first. Completions arrive later from their
/// own timers and patch exactly one id, gated on the epoch so a pending
/// completion from before a reset never lands.
#[derive(Debug, Default)]
pub struct CommandDispatcher {
    history: Vec<Command>,
    next_id: u64,
    epoch: u64,
}

impl CommandDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submit(&mut self, command_type: &str, target: &str, agent: &str) -> Result<CommandTicket> {
        let target = target.trim();
        if target.is_empty() {
            return Err(EngineError::validation("command target must not be empty"));
        }
        self.next_id += 1;
        let id = self.next_id;
        self.history.insert(
            0,
            Command {
                id,
                timestamp: clock_time(),
                command: command_type.to_string(),
                target: target.to_string(),
                agent: agent.to_string(),
                status: CommandStatus::Pending,
                response: "Processing command...".to_string(),
            },
        );
        Ok(CommandTicket { id, epoch: self.epoch })
    }

    /// Terminal transition for one command. A stale epoch or an already
    /// terminal command is a no-op; nothing else in the history is touched.
    pub fn complete(&mut self, ticket: CommandTicket) -> bool {
        if ticket.epoch != self.epoch {
            return false;
        }
        let Some(cmd) = self
            .history
            .iter_mut()
            .find(|c| c.id == ticket.id && c.status == CommandStatus::Pending)
        else {
            return false;
        };
        cmd.response = canned_response(&cmd.command, &cmd.target);
        cmd.status = CommandStatus::Success;
        true
    }

    pub fn history(&self) -> Vec<Command> {
        self.history.clone()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Drop the history and invalidate every outstanding completion.
    pub fn reset(&mut self) {
        self.history.clear();
        self.epoch += 1;
    }
}

fn canned_response(command_type: &str, target: &str) -> String {
    match command_type {
        "block" => format!("IP {} successfully blocked. Firewall rules updated.", target),
        "unblock" => format!("IP {} unblocked. Access restored.", target),
        "isolate" => format!("{} isolated from network. Monitoring active.", target),
        _ => "Command executed successfully.".to_string(),
    }
}
