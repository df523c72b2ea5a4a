use std::sync::Arc;

use anyhow::{Context, Result};
use rumqttc::QoS;
use tracing::info;

use iotbridge::api::{self, ApiState};
use iotbridge::broker::{self, MqttPublisher, Publisher};
use iotbridge::config;
use iotbridge::context::ContextClient;
use iotbridge::dispatch::Dispatcher;
use iotbridge::history::HistoryClient;
use iotbridge::ledger::AccessGate;
use iotbridge::life;
use iotbridge::pipeline::AgentContext;
use iotbridge::topic::AgentIdentity;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "iotbridge=info".into()),
        )
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());
    let config = config::load_config(&config_path)?;

    let identity = AgentIdentity {
        location: config.broker.location.clone(),
        zone: config.broker.zone.clone(),
        entity_id: config.broker.entity.clone(),
    };

    info!(agent = %identity.entity_id, location = %identity.location, "Agent starting");

    let (client, event_loop) = broker::connect(&config.broker, &identity);
    let publisher: Arc<dyn Publisher> = Arc::new(MqttPublisher::new(client.clone()));

    let ctx = Arc::new(AgentContext {
        identity: identity.clone(),
        context: ContextClient::new(&config.context_store),
        history: HistoryClient::new(&config.history_store),
        gate: AccessGate::new(&config.oracle),
        publisher: publisher.clone(),
    });
    let dispatcher = Arc::new(Dispatcher::new(ctx));

    // HTTP boundary (About / Rules)
    let router = api::create_router(ApiState {
        dispatcher: dispatcher.clone(),
        identity: identity.clone(),
        server: config.server.clone(),
    });
    let listener = tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port))
        .await
        .with_context(|| {
            format!(
                "Failed to bind HTTP listener on {}:{}",
                config.server.host, config.server.port
            )
        })?;
    info!(host = %config.server.host, port = config.server.port, "HTTP boundary listening");
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!(error = %e, "HTTP server terminated");
        }
    });

    // Self-telemetry timer
    tokio::spawn(life::run(
        publisher.clone(),
        identity.clone(),
        config.life.clone(),
    ));

    // Receive loop until a termination signal arrives
    tokio::select! {
        _ = broker::run(event_loop, client.clone(), dispatcher, identity.clone()) => {}
        _ = shutdown_signal() => {
            info!("Disconnecting");
            let _ = client
                .publish(identity.status_topic(), QoS::AtLeastOnce, true, "OFFLINE".as_bytes().to_vec())
                .await;
            let _ = client.disconnect().await;
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
