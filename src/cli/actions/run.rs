use crate::cli::{
    actions::{logout, server, watch, Action},
    telemetry,
};
use anyhow::Result;

/// Execute the provided action, then flush pending spans.
/// # Errors
/// Returns an error if the action fails.
pub async fn execute(action: Action) -> Result<()> {
    let result = match action {
        Action::Server(args) => server::execute(args).await,
        Action::Watch(args) => watch::execute(args).await,
        Action::Logout(args) => logout::execute(args).await,
    };

    telemetry::shutdown_tracer();

    result
}
