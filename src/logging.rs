use crate::config::Environment;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when `RUST_LOG` is unset.
///
/// The pipeline logs one line per analysis and the provider client one line
/// per failed attempt, so both stay at `info` in production while the HTTP
/// plumbing underneath them is kept quiet.
pub fn default_directives(env: &Environment) -> String {
    let (app, pipeline, services, http) = match env {
        Environment::Dev => ("debug", "debug", "debug", "debug"),
        Environment::Staging => ("debug", "info", "info", "info"),
        Environment::Prod => ("info", "info", "info", "warn"),
    };

    [
        format!("medlens_backend={app}"),
        format!("medlens_backend::pipeline={pipeline}"),
        format!("medlens_backend::services={services}"),
        format!("tower_http={http}"),
        "reqwest=warn".to_string(),
        "hyper=warn".to_string(),
        if env.is_prod() { "warn" } else { "info" }.to_string(),
    ]
    .join(",")
}

pub fn init_logging(env: &Environment) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| default_directives(env).into());

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(env.is_dev())
        .with_line_number(env.is_dev());

    // JSON in production so log shippers can index analysis fields
    if env.is_prod() {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json().flatten_event(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.pretty())
            .init();
    }

    tracing::info!(env = ?env, "Logging initialized");
}
