//! Simulation lifecycle: attacker selection, start/stop/reset, the tick
//! schedule and the hard stop.
//!
//! All shared state lives in one session object owned here and reached only
//! through the controller; there are no ambient globals. Scheduled work (the
//! tick loop, the hard stop, command completions) checks a generation or
//! epoch before committing, so nothing lands after a stop or reset.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::time::{interval, sleep, Duration, MissedTickBehavior};

use crate::agent::{ConsultRequest, DecisionClient, NodeCounters};
use crate::apply::apply_tick;
use crate::command::{Command, CommandDispatcher};
use crate::error::{EngineError, Result};
use crate::logbook::{LogBook, LogEntry, Severity};
use crate::logging::{json_log, obj, v_num, v_str};
use crate::registry::{Node, NodePatch, NodeRegistry};
use crate::state::Config;

struct Session {
    registry: NodeRegistry,
    log: LogBook,
    commands: CommandDispatcher,
    selected_attacker: Option<u32>,
    running: bool,
    current_step: u64,
    bus_load: f64,
    collisions: f64,
    connected: bool,
    malicious_ips: Vec<i64>,
    /// Bumped on every start/stop/reset; scheduled tasks carry the value
    /// they were spawned under and bail out on mismatch.
    generation: u64,
}

impl Session {
    fn new() -> Self {
        Self {
            registry: NodeRegistry::new(),
            log: LogBook::new(),
            commands: CommandDispatcher::new(),
            selected_attacker: None,
            running: false,
            current_step: 0,
            bus_load: 0.0,
            collisions: 0.0,
            connected: false,
            malicious_ips: Vec::new(),
            generation: 0,
        }
    }
}

fn lock_session(session: &Arc<Mutex<Session>>) -> MutexGuard<'_, Session> {
    session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// RUNNING → IDLE transition. Caller holds the lock and has checked
/// `running`.
fn halt(s: &mut Session) {
    s.generation += 1;
    s.running = false;
    s.registry.clear_attacker();
    s.log.append(
        Severity::Info,
        "Simulation Stopped",
        "Simulation schedule cleared by timeout or user.",
        "System",
    );
}

fn stop_generation(session: &Arc<Mutex<Session>>, generation: u64) -> bool {
    let mut s = lock_session(session);
    if s.generation != generation || !s.running {
        return false;
    }
    halt(&mut s);
    true
}

#[derive(Clone)]
pub struct Controller {
    cfg: Config,
    client: Arc<dyn DecisionClient>,
    session: Arc<Mutex<Session>>,
}

impl Controller {
    pub fn new(cfg: Config, client: Arc<dyn DecisionClient>) -> Self {
        Self {
            cfg,
            client,
            session: Arc::new(Mutex::new(Session::new())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        lock_session(&self.session)
    }

    /// One-time connectivity probe. Not re-checked per tick; a failure
    /// leaves the session disconnected and `start` blocked until a re-probe
    /// succeeds.
    pub async fn probe(&self) -> Result<()> {
        match self.client.probe().await {
            Ok(info) => {
                let mut s = self.lock();
                s.connected = true;
                s.malicious_ips = info.malicious_ips;
                s.log.append(
                    Severity::Success,
                    "Backend Connection Status",
                    format!("Connected to decision service at {}.", self.cfg.agent_base),
                    "System",
                );
                Ok(())
            }
            Err(err) => {
                let detail = err.to_string();
                let mut s = self.lock();
                s.connected = false;
                s.log.append(
                    Severity::Error,
                    "Backend Connection Failure",
                    format!(
                        "Cannot reach decision service at {}: {}",
                        self.cfg.agent_base, detail
                    ),
                    "System",
                );
                Err(EngineError::Connectivity { detail })
            }
        }
    }

    pub fn select_attacker(&self, id: Option<u32>) -> Result<()> {
        let mut s = self.lock();
        if s.running {
            return Err(EngineError::validation("cannot change attacker while running"));
        }
        if let Some(id) = id {
            if s.registry.get(id).is_none() {
                return Err(EngineError::NotFound { id });
            }
        }
        s.selected_attacker = id;
        Ok(())
    }

    /// IDLE → RUNNING. Deploys the attacker, schedules the repeating tick
    /// and the one-shot hard stop. A second start while running is rejected
    /// and never creates a second schedule.
    pub fn start(&self) -> Result<()> {
        let (attacker_id, generation) = {
            let mut s = self.lock();
            if s.running {
                return Err(EngineError::validation("simulation already running"));
            }
            let attacker_id = s
                .selected_attacker
                .ok_or_else(|| EngineError::validation("no attacker node selected"))?;
            if !s.connected {
                s.log.append(
                    Severity::Error,
                    "Simulation Startup Failure",
                    "Cannot start simulation: decision service not connected.",
                    "System",
                );
                return Err(EngineError::Connectivity {
                    detail: "connectivity probe has not succeeded".to_string(),
                });
            }
            s.registry.mark_attacker(attacker_id)?;
            s.running = true;
            s.current_step = 0;
            s.generation += 1;
            let name = s.registry.node_name(attacker_id).unwrap_or_default().to_string();
            s.log.append(
                Severity::Info,
                "Simulation Started",
                format!("Attacker deployed at node {} ({}).", attacker_id, name),
                "System",
            );
            (attacker_id, s.generation)
        };

        json_log(
            "controller",
            "simulation_started",
            obj(&[
                ("attacker", v_num(attacker_id as f64)),
                ("tick_ms", v_num(self.cfg.tick_ms as f64)),
                ("hard_stop_ms", v_num(self.cfg.hard_stop_ms as f64)),
            ]),
        );

        self.spawn_tick_loop(attacker_id, generation);
        self.spawn_hard_stop(generation);
        Ok(())
    }

    fn spawn_tick_loop(&self, attacker_id: u32, generation: u64) {
        let session = Arc::clone(&self.session);
        let client = Arc::clone(&self.client);
        let tick_ms = self.cfg.tick_ms;
        tokio::spawn(async move {
            let mut ticker = interval(Duration::from_millis(tick_ms));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // interval yields once immediately; the first real tick lands a
            // full period after start.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let request = {
                    let s = lock_session(&session);
                    if s.generation != generation || !s.running {
                        break;
                    }
                    ConsultRequest {
                        attacker: attacker_id,
                        bus_load: s.bus_load,
                        collisions: s.collisions,
                        nodes: s.registry.iter().map(NodeCounters::from).collect(),
                    }
                };
                let outcome = client.consult(request).await;
                let mut s = lock_session(&session);
                if s.generation != generation || !s.running {
                    // Stop landed while the consult was in flight; its
                    // effect is discarded.
                    break;
                }
                match outcome {
                    Ok(decision) => {
                        let s = &mut *s;
                        apply_tick(&mut s.registry, &mut s.log, &decision)
                    }
                    Err(err) => {
                        s.log.append(
                            Severity::Error,
                            "API Communication Error",
                            format!("Failed to get response from rule-agent: {}", err),
                            "System",
                        );
                    }
                }
                s.current_step += 1;
            }
        });
    }

    fn spawn_hard_stop(&self, generation: u64) {
        let session = Arc::clone(&self.session);
        let hard_stop_ms = self.cfg.hard_stop_ms;
        tokio::spawn(async move {
            sleep(Duration::from_millis(hard_stop_ms)).await;
            if stop_generation(&session, generation) {
                json_log("controller", "hard_stop", obj(&[("after_ms", v_num(hard_stop_ms as f64))]));
            }
        });
    }

    /// RUNNING → IDLE by user request. Returns false when already idle.
    pub fn stop(&self) -> bool {
        let stopped = {
            let mut s = self.lock();
            if !s.running {
                false
            } else {
                halt(&mut s);
                true
            }
        };
        if stopped {
            json_log("controller", "simulation_stopped", obj(&[("by", v_str("user"))]));
        }
        stopped
    }

    /// Valid from either state: cancel any schedule, restore the seed,
    /// reseed the log, zero the scalars, drop command history.
    pub fn reset(&self) {
        let mut s = self.lock();
        s.generation += 1;
        s.running = false;
        s.registry.reset_all();
        s.selected_attacker = None;
        s.current_step = 0;
        s.bus_load = 0.0;
        s.collisions = 0.0;
        s.commands.reset();
        s.log.reset();
    }

    pub fn set_bus_params(&self, bus_load: f64, collisions: f64) -> Result<()> {
        let mut s = self.lock();
        if s.running {
            return Err(EngineError::validation("cannot change bus parameters while running"));
        }
        s.bus_load = bus_load;
        s.collisions = collisions;
        Ok(())
    }

    /// Manual node edit. The registry enforces flag exclusivity at commit.
    pub fn update_node(&self, id: u32, patch: NodePatch) -> Result<()> {
        let mut s = self.lock();
        if s.running {
            return Err(EngineError::validation("cannot edit nodes while running"));
        }
        s.registry.update_node(id, patch)?;
        let name = s.registry.node_name(id).unwrap_or_default().to_string();
        s.log.append(
            Severity::Info,
            "Node Parameters Updated",
            format!("Manually updated parameters for {}.", name),
            "System",
        );
        Ok(())
    }

    /// Queue a user command. Completion is scheduled independently of the
    /// tick loop and patches only this command's id.
    pub fn submit_command(&self, command_type: &str, target: &str, agent: &str) -> Result<u64> {
        let ticket = self.lock().commands.submit(command_type, target, agent)?;
        let session = Arc::clone(&self.session);
        let delay_ms = self.cfg.command_delay_ms;
        tokio::spawn(async move {
            sleep(Duration::from_millis(delay_ms)).await;
            lock_session(&session).commands.complete(ticket);
        });
        Ok(ticket.id)
    }

    pub fn nodes(&self) -> Vec<Node> {
        self.lock().registry.list_nodes()
    }

    pub fn logs(&self, agent: &str) -> Vec<LogEntry> {
        self.lock().log.filter_by_agent(agent)
    }

    pub fn command_history(&self) -> Vec<Command> {
        self.lock().commands.history()
    }

    pub fn is_running(&self) -> bool {
        self.lock().running
    }

    pub fn is_connected(&self) -> bool {
        self.lock().connected
    }

    pub fn current_step(&self) -> u64 {
        self.lock().current_step
    }

    pub fn bus_params(&self) -> (f64, f64) {
        let s = self.lock();
        (s.bus_load, s.collisions)
    }

    pub fn selected_attacker(&self) -> Option<u32> {
        self.lock().selected_attacker
    }

    pub fn malicious_ips(&self) -> Vec<i64> {
        self.lock().malicious_ips.clone()
    }
}
