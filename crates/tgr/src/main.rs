use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use tgr_core::{
    config::Config,
    messaging::{port::MessengerPort, throttled::ThrottledMessenger},
    relay::Relay,
};
use tgr_telegram::TelegramMessenger;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = Config::load().context("loading configuration")?;
    tgr_core::logging::init("tgr")?;

    let relay = Arc::new(Relay::new(&cfg).context("building relay")?);
    relay
        .downloads()
        .ensure()
        .await
        .with_context(|| format!("creating {}", cfg.download_dir.display()))?;
    info!(dir = %cfg.download_dir.display(), target = %cfg.target_chat, "relay configured");

    let cancel = CancellationToken::new();
    let listener = start_telegram(&cfg, relay.clone(), cancel.clone()).await;

    let app = tgr_web::build_router(tgr_web::AppState::new(relay.clone(), &cfg));
    let tcp = tokio::net::TcpListener::bind(cfg.bind_addr)
        .await
        .with_context(|| format!("binding {}", cfg.bind_addr))?;
    info!(addr = %cfg.bind_addr, version = env!("CARGO_PKG_VERSION"), "http listening");

    let shutdown = cancel.clone();
    axum::serve(tcp, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("ctrl-c received; shutting down");
            shutdown.cancel();
        })
        .await
        .context("http server failed")?;

    cancel.cancel();
    if let Some(handle) = listener {
        let _ = handle.await;
    }
    relay.detach_messenger().await;
    Ok(())
}

/// Connect the Telegram client and spawn the update loop.
///
/// Failures leave the HTTP surface running with no client attached.
async fn start_telegram(
    cfg: &Config,
    relay: Arc<Relay>,
    cancel: CancellationToken,
) -> Option<tokio::task::JoinHandle<()>> {
    let Some(creds) = &cfg.telegram else {
        let missing = Config::missing_telegram_vars(|k| std::env::var(k).ok());
        error!(?missing, "missing environment variables; telegram client not started");
        return None;
    };

    let client = match tgr_telegram::connect(creds).await {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "telegram client failed to start");
            return None;
        }
    };
    let target = match tgr_telegram::resolve_target(&client, &cfg.target_chat).await {
        Ok(chat) => chat,
        Err(e) => {
            error!(error = %e, "telegram client failed to start");
            return None;
        }
    };

    let raw = TelegramMessenger::new(client.clone(), &target);
    let target_id = raw.target_id();
    let messenger: Arc<dyn MessengerPort> = Arc::new(ThrottledMessenger::new(
        Arc::new(raw),
        cfg.send_min_interval,
    ));
    relay.attach_messenger(messenger).await;
    info!(chat_id = target_id.0, "telegram client started");

    Some(tokio::spawn(async move {
        let result =
            tgr_telegram::updates::run_updates(client, target_id, relay.clone(), cancel).await;
        if let Err(e) = result {
            warn!(error = %e, "update loop ended");
            relay.detach_messenger().await;
        }
    }))
}
