use serde::Serialize;

use crate::error::{EngineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NodeKind {
    #[serde(rename = "PC")]
    Pc,
    Server,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Benign,
    Attacker,
}

/// A simulated network endpoint and its security-relevant runtime state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub id: u32,
    pub name: String,
    pub kind: NodeKind,
    pub status: NodeStatus,
    pub is_active: bool,
    pub incoming_loads: u32,
    pub failed_logins: u32,
    pub blocked_flags: bool,
    pub isolated_flags: bool,
    pub restart_cd: u32,
}

impl Node {
    fn seeded(id: u32, name: &str, kind: NodeKind) -> Self {
        Self {
            id,
            name: name.to_string(),
            kind,
            status: NodeStatus::Benign,
            is_active: false,
            incoming_loads: 0,
            failed_logins: 0,
            blocked_flags: false,
            isolated_flags: false,
            restart_cd: 0,
        }
    }
}

/// Partial update for a manual node edit. Absent fields keep their value.
#[derive(Debug, Clone, Copy, Default)]
pub struct NodePatch {
    pub incoming_loads: Option<u32>,
    pub failed_logins: Option<u32>,
    pub blocked_flags: Option<bool>,
    pub isolated_flags: Option<bool>,
    pub restart_cd: Option<u32>,
}

pub fn seed_nodes() -> Vec<Node> {
    vec![
        Node::seeded(0, "PC-001", NodeKind::Pc),
        Node::seeded(1, "Server-001", NodeKind::Server),
        Node::seeded(2, "PC-002", NodeKind::Pc),
        Node::seeded(3, "PC-003", NodeKind::Pc),
        Node::seeded(4, "Server-002", NodeKind::Server),
        Node::seeded(5, "PC-004", NodeKind::Pc),
    ]
}

/// Owns the node entity set. Nodes are created once from the seed set and
/// never destroyed, only mutated or reset.
#[derive(Debug)]
pub struct NodeRegistry {
    nodes: Vec<Node>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self { nodes: seed_nodes() }
    }

    /// Cloned snapshot; callers cannot alias past the invariants.
    pub fn list_nodes(&self) -> Vec<Node> {
        self.nodes.clone()
    }

    pub fn get(&self, id: u32) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_name(&self, id: u32) -> Option<&str> {
        self.get(id).map(|n| n.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate in registry order; the consult wire format depends on it.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Apply a partial update. The blocked/isolated exclusivity invariant is
    /// enforced at commit time regardless of what the patch asked for:
    /// isolation wins if both end up set.
    pub fn update_node(&mut self, id: u32, patch: NodePatch) -> Result<()> {
        let node = self
            .nodes
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or(EngineError::NotFound { id })?;

        if let Some(v) = patch.incoming_loads {
            node.incoming_loads = v;
        }
        if let Some(v) = patch.failed_logins {
            node.failed_logins = v;
        }
        if let Some(v) = patch.blocked_flags {
            node.blocked_flags = v;
        }
        if let Some(v) = patch.isolated_flags {
            node.isolated_flags = v;
        }
        if let Some(v) = patch.restart_cd {
            node.restart_cd = v;
        }
        if node.isolated_flags {
            node.blocked_flags = false;
        }
        Ok(())
    }

    /// Set both containment flags in one commit. The pairs the applicator
    /// produces are exclusive by construction; this guards the invariant for
    /// any other caller too.
    pub fn set_containment(&mut self, id: u32, blocked: bool, isolated: bool) -> Result<()> {
        let node = self
            .nodes
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or(EngineError::NotFound { id })?;
        node.isolated_flags = isolated;
        node.blocked_flags = blocked && !isolated;
        Ok(())
    }

    /// Deploy the attacker: the chosen node becomes the single attacker and
    /// the active highlight; every other node is benign and inactive.
    pub fn mark_attacker(&mut self, id: u32) -> Result<()> {
        if self.get(id).is_none() {
            return Err(EngineError::NotFound { id });
        }
        for node in &mut self.nodes {
            if node.id == id {
                node.status = NodeStatus::Attacker;
                node.is_active = true;
            } else {
                node.status = NodeStatus::Benign;
                node.is_active = false;
            }
        }
        Ok(())
    }

    /// Stand down: no attacker outside a running simulation.
    pub fn clear_attacker(&mut self) {
        for node in &mut self.nodes {
            node.status = NodeStatus::Benign;
            node.is_active = false;
        }
    }

    /// Restore the exact seed set.
    pub fn reset_all(&mut self) {
        self.nodes = seed_nodes();
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
