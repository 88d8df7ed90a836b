use std::sync::Arc;

use anyhow::Result;
use tokio::time::{sleep, Duration};

use autosentinel::agent::HttpDecisionClient;
use autosentinel::controller::Controller;
use autosentinel::logging::{json_log, obj, v_num, v_str};
use autosentinel::state::Config;

/// Demo session: probe the decision service, deploy the attacker from
/// ATTACKER_ID, let the run play out to its hard stop, then dump the
/// session log as JSON lines.
#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env();
    let attacker: u32 = std::env::var("ATTACKER_ID")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);

    let client = Arc::new(HttpDecisionClient::new(&cfg));
    let controller = Controller::new(cfg.clone(), client);

    json_log("session", "boot", obj(&[("agent_base", v_str(&cfg.agent_base))]));
    controller.probe().await?;
    controller.select_attacker(Some(attacker))?;
    controller.start()?;

    while controller.is_running() {
        sleep(Duration::from_millis(200)).await;
    }

    json_log(
        "session",
        "finished",
        obj(&[("steps", v_num(controller.current_step() as f64))]),
    );
    for entry in controller.logs("All") {
        println!("{}", serde_json::to_string(&entry)?);
    }
    Ok(())
}
