use crate::agent::{AgentAction, Decision};
use crate::logbook::{LogBook, Severity};
use crate::registry::NodeRegistry;

/// Record one tick's decision and apply its effect.
///
/// The ordering is an observable contract: the "Rule-Based" decision entry is
/// appended first, the "System" effect entry (if any) strictly after it.
/// Nothing here can fail the tick: unknown codes and unknown targets degrade
/// to warnings.
pub fn apply_tick(registry: &mut NodeRegistry, log: &mut LogBook, decision: &Decision) {
    let target_label = node_label(registry, decision.ip);
    log.append(
        Severity::Info,
        format!("Rule-Based Agent Action: {}", decision.action_name),
        format!("Action applied to node {}.", target_label),
        "Rule-Based",
    );

    let action = match AgentAction::from_code(decision.type_code) {
        Some(action) => action,
        None => {
            log.append(
                Severity::Warning,
                "Unknown Agent Action",
                format!("Unrecognized action type {} ignored.", decision.type_code),
                "System",
            );
            return;
        }
    };

    let (blocked, isolated, severity, message) = match action {
        AgentAction::NoOp => return,
        AgentAction::Block => (true, false, Severity::Warning, "Node Blocked"),
        AgentAction::Unblock => (false, false, Severity::Info, "Node Unblocked"),
        AgentAction::Isolate => (false, true, Severity::Warning, "Node Isolated"),
    };

    let Some(target_id) = resolve_target(registry, decision.ip) else {
        log.append(
            Severity::Warning,
            "Invalid Action Target",
            format!("No node with id {}; action skipped.", decision.ip),
            "System",
        );
        return;
    };

    // Cannot fail: the id was just resolved and the pair is exclusive.
    let name = registry.node_name(target_id).unwrap_or_default().to_string();
    if registry.set_containment(target_id, blocked, isolated).is_ok() {
        log.append(
            severity,
            message,
            format!("Agent action applied successfully to {}.", name),
            "System",
        );
    }
}

fn resolve_target(registry: &NodeRegistry, ip: i64) -> Option<u32> {
    u32::try_from(ip).ok().filter(|id| registry.get(*id).is_some())
}

fn node_label(registry: &NodeRegistry, ip: i64) -> String {
    resolve_target(registry, ip)
        .and_then(|id| registry.node_name(id).map(str::to_string))
        .unwrap_or_else(|| format!("IP {}", ip))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decision(name: &str, type_code: i64, ip: i64) -> Decision {
        Decision { action_name: name.to_string(), type_code, ip }
    }

    #[test]
    fn test_block_sets_flags_and_orders_entries() {
        let mut reg = NodeRegistry::new();
        let mut log = LogBook::new();
        apply_tick(&mut reg, &mut log, &decision("Block Node", 1, 2));

        let node = reg.get(2).unwrap();
        assert!(node.blocked_flags);
        assert!(!node.isolated_flags);

        let entries = log.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].agent, "Rule-Based");
        assert_eq!(entries[0].message, "Rule-Based Agent Action: Block Node");
        assert_eq!(entries[1].agent, "System");
        assert_eq!(entries[1].message, "Node Blocked");
        assert_eq!(entries[1].severity, Severity::Warning);
        assert_eq!(entries[1].details, "Agent action applied successfully to PC-002.");
    }

    #[test]
    fn test_isolate_clears_block() {
        let mut reg = NodeRegistry::new();
        let mut log = LogBook::new();
        apply_tick(&mut reg, &mut log, &decision("Block Node", 1, 4));
        apply_tick(&mut reg, &mut log, &decision("Isolate Node", 3, 4));

        let node = reg.get(4).unwrap();
        assert!(node.isolated_flags);
        assert!(!node.blocked_flags);
        assert_eq!(log.entries().last().unwrap().message, "Node Isolated");
    }

    #[test]
    fn test_unblock_clears_both() {
        let mut reg = NodeRegistry::new();
        let mut log = LogBook::new();
        apply_tick(&mut reg, &mut log, &decision("Isolate Node", 3, 1));
        apply_tick(&mut reg, &mut log, &decision("Unblock Node", 2, 1));

        let node = reg.get(1).unwrap();
        assert!(!node.blocked_flags && !node.isolated_flags);
        let last = log.entries().last().unwrap();
        assert_eq!(last.message, "Node Unblocked");
        assert_eq!(last.severity, Severity::Info);
    }

    #[test]
    fn test_noop_logs_decision_only() {
        let mut reg = NodeRegistry::new();
        let mut log = LogBook::new();
        apply_tick(&mut reg, &mut log, &decision("No Action", 0, 0));

        assert_eq!(log.len(), 1);
        assert_eq!(log.entries()[0].agent, "Rule-Based");
        assert_eq!(reg.list_nodes(), crate::registry::seed_nodes());
    }

    #[test]
    fn test_unknown_type_is_warning_not_failure() {
        let mut reg = NodeRegistry::new();
        let mut log = LogBook::new();
        apply_tick(&mut reg, &mut log, &decision("???", 9, 0));

        assert_eq!(reg.list_nodes(), crate::registry::seed_nodes());
        let last = log.entries().last().unwrap();
        assert_eq!(last.message, "Unknown Agent Action");
        assert_eq!(last.severity, Severity::Warning);
    }

    #[test]
    fn test_unknown_ip_skips_mutation() {
        let mut reg = NodeRegistry::new();
        let mut log = LogBook::new();
        apply_tick(&mut reg, &mut log, &decision("Block Node", 1, 99));

        assert_eq!(reg.list_nodes(), crate::registry::seed_nodes());
        let entries = log.entries();
        assert_eq!(entries.len(), 2);
        // Decision entry falls back to the raw ip label.
        assert_eq!(entries[0].details, "Action applied to node IP 99.");
        assert_eq!(entries[1].message, "Invalid Action Target");
        assert_eq!(entries[1].severity, Severity::Warning);
    }

    #[test]
    fn test_negative_ip_handled() {
        let mut reg = NodeRegistry::new();
        let mut log = LogBook::new();
        apply_tick(&mut reg, &mut log, &decision("Block Node", 1, -3));
        assert_eq!(reg.list_nodes(), crate::registry::seed_nodes());
        assert_eq!(log.entries().last().unwrap().message, "Invalid Action Target");
    }
}
