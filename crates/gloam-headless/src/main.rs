use tracing_subscriber::EnvFilter;

use gloam_core::time::NOMINAL_FRAME_MS;
use gloam_escape::{EscapeConfig, MovementIntent, Session, load_level_from_file};

/// Value of a `--name=value` argument.
fn arg(name: &str) -> Option<String> {
    let prefix = format!("--{name}=");
    std::env::args().find_map(|a| a.strip_prefix(&prefix).map(String::from))
}

/// Parse a comma-separated intent such as `right,down,walk`.
fn parse_intent(keys: &str) -> MovementIntent {
    let mut intent = MovementIntent::default();
    for key in keys.split(',').map(str::trim).filter(|k| !k.is_empty()) {
        match key {
            "up" => intent.up = true,
            "down" => intent.down = true,
            "left" => intent.left = true,
            "right" => intent.right = true,
            "walk" => intent.walk = true,
            other => tracing::warn!("Ignoring unknown intent key {other:?}"),
        }
    }
    intent
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let level_path = arg("level").unwrap_or_else(|| "levels/vault.json".to_string());
    let ticks = arg("ticks")
        .and_then(|t| t.parse::<usize>().ok())
        .unwrap_or(600);
    let dash_every = arg("dash-every").and_then(|t| t.parse::<usize>().ok());
    let intent = arg("intent").map(|s| parse_intent(&s)).unwrap_or_default();

    let template = match load_level_from_file(&level_path) {
        Ok(t) => t,
        Err(e) => {
            tracing::error!("{e}");
            std::process::exit(1);
        },
    };

    let mut session = Session::new(EscapeConfig::load());
    if let Err(e) = session.start_level(template) {
        tracing::error!("{e}");
        std::process::exit(1);
    }
    session.set_intent(intent);

    let mut now = 0.0_f64;
    for tick in 0..ticks {
        if dash_every.is_some_and(|n| n > 0 && tick % n == 0) {
            session.trigger_dash();
        }
        for event in session.update(NOMINAL_FRAME_MS, now) {
            tracing::info!(tick, ?event, "event");
        }
        now += f64::from(NOMINAL_FRAME_MS);
        if session.phase().is_finished() {
            tracing::info!(tick, phase = ?session.phase(), "Session finished");
            break;
        }
    }

    match serde_json::to_string_pretty(session.state()) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            tracing::error!("Failed to encode final state: {e}");
            std::process::exit(1);
        },
    }
}
