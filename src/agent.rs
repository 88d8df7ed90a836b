//! Bridge to the external decision service.
//!
//! The service is consumed only through its request/response contract: a
//! one-time connectivity probe at session start and a per-tick consult that
//! proposes an action. Everything behind the endpoint is out of scope.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::registry::Node;
use crate::state::Config;

/// Decision variants, exhaustively matched. Wire codes outside 0..=3 have no
/// variant and surface as a structural unknown, never a silent fallthrough.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentAction {
    NoOp,
    Block,
    Unblock,
    Isolate,
}

impl AgentAction {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(AgentAction::NoOp),
            1 => Some(AgentAction::Block),
            2 => Some(AgentAction::Unblock),
            3 => Some(AgentAction::Isolate),
            _ => None,
        }
    }
}

/// Per-node counters transmitted on consult. Names and ids of other nodes
/// are deliberately not part of the wire format; order is registry order.
#[derive(Debug, Clone, Serialize)]
pub struct NodeCounters {
    pub incoming_loads: u32,
    pub failed_logins: u32,
    pub blocked_flags: bool,
    pub isolated_flags: bool,
}

impl From<&Node> for NodeCounters {
    fn from(node: &Node) -> Self {
        Self {
            incoming_loads: node.incoming_loads,
            failed_logins: node.failed_logins,
            blocked_flags: node.blocked_flags,
            isolated_flags: node.isolated_flags,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConsultRequest {
    pub attacker: u32,
    #[serde(rename = "busLoad")]
    pub bus_load: f64,
    pub collisions: f64,
    pub nodes: Vec<NodeCounters>,
}

/// The action proposed by the service, as received. Interpretation of the
/// code and target happens at application time.
#[derive(Debug, Clone, Deserialize)]
pub struct Decision {
    pub action_name: String,
    #[serde(rename = "type")]
    pub type_code: i64,
    pub ip: i64,
}

#[derive(Debug, Deserialize)]
struct ConsultResponse {
    rule_agent_action: Decision,
}

/// Probe payload; the malicious ip list rides along with the handshake.
#[derive(Debug, Clone, Deserialize)]
pub struct EnvInfo {
    pub malicious_ips: Vec<i64>,
}

#[async_trait]
pub trait DecisionClient: Send + Sync {
    async fn probe(&self) -> Result<EnvInfo>;
    async fn consult(&self, req: ConsultRequest) -> Result<Decision>;
}

pub struct HttpDecisionClient {
    client: Client,
    base: String,
}

impl HttpDecisionClient {
    pub fn new(cfg: &Config) -> Self {
        Self {
            client: Client::new(),
            base: cfg.agent_base.clone(),
        }
    }
}

#[async_trait]
impl DecisionClient for HttpDecisionClient {
    async fn probe(&self) -> Result<EnvInfo> {
        let url = format!("{}/env-info", self.base);
        let resp = self.client.get(&url).send().await?;
        if !resp.status().is_success() {
            return Err(anyhow!("probe failed with status {}", resp.status()));
        }
        Ok(resp.json::<EnvInfo>().await?)
    }

    async fn consult(&self, req: ConsultRequest) -> Result<Decision> {
        let url = format!("{}/rule-agent", self.base);
        let resp = self.client.post(&url).json(&req).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!("rule-agent returned {}: {}", status, body));
        }
        let parsed: ConsultResponse = resp.json().await?;
        Ok(parsed.rule_agent_action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::NodeRegistry;

    #[test]
    fn test_action_code_mapping() {
        assert_eq!(AgentAction::from_code(0), Some(AgentAction::NoOp));
        assert_eq!(AgentAction::from_code(1), Some(AgentAction::Block));
        assert_eq!(AgentAction::from_code(2), Some(AgentAction::Unblock));
        assert_eq!(AgentAction::from_code(3), Some(AgentAction::Isolate));
        assert_eq!(AgentAction::from_code(4), None);
        assert_eq!(AgentAction::from_code(-1), None);
    }

    #[test]
    fn test_consult_request_wire_shape() {
        let reg = NodeRegistry::new();
        let req = ConsultRequest {
            attacker: 3,
            bus_load: 0.5,
            collisions: 2.0,
            nodes: reg.iter().map(NodeCounters::from).collect(),
        };
        let value = serde_json::to_value(&req).unwrap();

        assert_eq!(value["attacker"], 3);
        assert_eq!(value["busLoad"], 0.5);
        assert_eq!(value["collisions"], 2.0);
        let nodes = value["nodes"].as_array().unwrap();
        assert_eq!(nodes.len(), 6);
        // Counters only: no node name or id leaks onto the wire.
        let first = nodes[0].as_object().unwrap();
        assert_eq!(first.len(), 4);
        assert!(first.contains_key("incoming_loads"));
        assert!(first.contains_key("failed_logins"));
        assert!(first.contains_key("blocked_flags"));
        assert!(first.contains_key("isolated_flags"));
        assert!(!first.contains_key("name"));
        assert!(!first.contains_key("id"));
    }

    #[test]
    fn test_consult_response_parse() {
        let raw = r#"{"rule_agent_action":{"action_name":"Block Node","type":1,"ip":4}}"#;
        let parsed: ConsultResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.rule_agent_action.action_name, "Block Node");
        assert_eq!(parsed.rule_agent_action.type_code, 1);
        assert_eq!(parsed.rule_agent_action.ip, 4);
    }

    #[test]
    fn test_env_info_parse() {
        let raw = r#"{"malicious_ips":[2,5]}"#;
        let parsed: EnvInfo = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.malicious_ips, vec![2, 5]);
    }
}
