use serde_json::json;
use supportdesk_agent::runtime::{SupportRouter, TurnOutcome};
use supportdesk_core::config::LoadOptions;

use crate::commands::{build_router, build_runtime, load_config, CommandResult};

pub fn run(options: LoadOptions, text: &str) -> CommandResult {
    let config = match load_config("ask", options) {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    crate::init_logging(&config);

    let router = match build_router("ask", &config) {
        Ok(router) => router,
        Err(failure) => return failure,
    };

    execute(&router, text)
}

/// Runs one turn on a fresh current-thread runtime.
pub fn execute(router: &SupportRouter, text: &str) -> CommandResult {
    let runtime = match build_runtime("ask") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let outcome = runtime.block_on(router.run_turn(text));
    render(&outcome)
}

fn render(outcome: &TurnOutcome) -> CommandResult {
    if let TurnOutcome::Degraded(error) = outcome {
        return CommandResult::failure(
            "ask",
            "backend_unavailable",
            format!("{} ({error})", outcome.reply()),
            4,
        );
    }

    CommandResult::success(
        "ask",
        outcome.reply(),
        Some(json!({
            "outcome": outcome.event_type(),
            "intent": outcome.category().map(|category| category.as_str()),
        })),
    )
}
