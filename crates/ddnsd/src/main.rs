// # ddnsd - DDNS Daemon
//
// Thin integration layer: reads the environment, wires components together and
// runs either half of the DDNS pair. All sync logic lives in ddns-core.
//
// ## Modes
//
// - `MODE=client` (default): poll `SERVER_URL` for the public address and keep
//   every configured DNS record pointing at it.
// - `MODE=server`: run the IP echo server on `HOST:PORT`.
//
// ## Configuration
//
// All configuration is done via environment variables.
//
// ### Client
// - `SERVER_URL`: IP echo endpoint (required)
// - `CHECK_PERIOD`: Time between syncs, e.g. `5m` or `PT5M` (default 5m)
// - `REQUEST_TIMEOUT`: HTTP timeout for every outbound call (default 30s)
// - `PROVIDERS`: Reconciliation order, e.g. `digitalocean,cloudflare`
// - `CLOUDFLARE_TOKEN`, `CLOUDFLARE_ZONE_ID`, `CLOUDFLARE_DOMAIN_NAME`
// - `DIGITALOCEAN_TOKEN`, `DIGITALOCEAN_DOMAIN_NAME`, `DIGITALOCEAN_SUBDOMAIN`
// - `TELEGRAM_TOKEN`, `TELEGRAM_CHAT_ID`: Optional change/failure alerts
//
// ### Server
// - `HOST` (default 0.0.0.0), `PORT` (default 8080)
// - `HEADER`: Trusted header carrying the caller's address
//
// ### Both
// - `LOG_LEVEL`: trace, debug, info, warn, error (default info)
//
// ## Example
//
// ```bash
// export SERVER_URL=https://ip.example.com/
// export CLOUDFLARE_TOKEN=your_token
// export CLOUDFLARE_ZONE_ID=023e105f4ecef8ad9ca31a8372d0c353
// export CLOUDFLARE_DOMAIN_NAME=home.example.com
// export CHECK_PERIOD=5m
//
// ddnsd
// ```

use anyhow::{Context, Result};
use ddns_core::config::{ClientConfig, Mode, ServerConfig};
use ddns_core::traits::{IpProvider, Notifier};
use ddns_core::{ProviderRegistry, ShutdownSignal, Updater, UpdaterSettings};
use std::collections::HashMap;
use std::env;
use std::future::Future;
use std::process::ExitCode;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (a sync cycle failed)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DdnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error
    RuntimeError = 2,
}

impl From<DdnsExitCode> for ExitCode {
    fn from(code: DdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Configuration errors exit with 1 wherever they surface; everything else is 2
fn exit_code_for(error: &anyhow::Error) -> DdnsExitCode {
    match error.downcast_ref::<ddns_core::Error>() {
        Some(e) if e.is_config() => DdnsExitCode::ConfigError,
        _ => DdnsExitCode::RuntimeError,
    }
}

fn parse_log_level(raw: Option<&str>) -> Result<Level> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty()).unwrap_or("info");
    match raw.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!(
            "LOG_LEVEL '{}' is not valid. Valid levels: trace, debug, info, warn, error",
            raw
        ),
    }
}

fn main() -> ExitCode {
    let env: HashMap<String, String> = env::vars().collect();

    let log_level = match parse_log_level(env.get("LOG_LEVEL").map(String::as_str)) {
        Ok(level) => level,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DdnsExitCode::ConfigError.into();
    }

    let mode = Mode::from_map(&env);
    info!("Starting ddnsd in {:?} mode", mode);

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DdnsExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        match mode {
            Mode::Client => run_client(&env).await,
            Mode::Server => run_server(&env).await,
        }
    });

    match result {
        Ok(()) => {
            info!("ddnsd stopped");
            DdnsExitCode::CleanShutdown.into()
        }
        Err(e) => {
            error!("ddnsd failed: {:#}", e);
            exit_code_for(&e).into()
        }
    }
}

/// Run the updater until a signal or a fatal sync error
async fn run_client(env: &HashMap<String, String>) -> Result<()> {
    let config = ClientConfig::from_map(env)?;
    log_client_config(&config);

    let http = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()
        .context("Failed to build HTTP client")?;

    let registry = ProviderRegistry::new();
    register_providers(&registry, &http);

    let dns_clients = registry.create_clients(&config.providers)?;
    let ip_provider: Box<dyn IpProvider> = Box::new(ddns_ip_http::ServerIpProvider::new(
        config.server_url.clone(),
        http.clone(),
    ));
    let notifier = build_notifier(&config, &http)?;

    let (mut updater, mut events) = Updater::new(
        ip_provider,
        dns_clients,
        notifier,
        UpdaterSettings::from(&config),
    )?;

    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            debug!("Updater event: {:?}", event);
        }
    });

    let shutdown = ShutdownSignal::new();
    let signal = install_signal_handlers()?;
    let signal_task = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            let name = signal.await;
            info!("Received shutdown signal: {}", name);
            shutdown.trigger();
        })
    };

    let result = updater.run(&shutdown).await;
    signal_task.abort();
    result?;
    Ok(())
}

/// Serve the echo endpoint until a signal
async fn run_server(env: &HashMap<String, String>) -> Result<()> {
    let config = ServerConfig::from_map(env)?;
    info!(
        "Echo server config: bind={}, header={}",
        config.bind_address(),
        config.header.as_deref().unwrap_or("-")
    );

    let signal = install_signal_handlers()?;
    ddns_echo_server::serve(&config, async move {
        let name = signal.await;
        info!("Received shutdown signal: {}", name);
    })
    .await?;

    Ok(())
}

#[cfg_attr(
    not(any(feature = "cloudflare", feature = "digitalocean")),
    allow(unused_variables)
)]
fn register_providers(registry: &ProviderRegistry, http: &reqwest::Client) {
    #[cfg(feature = "cloudflare")]
    ddns_provider_cloudflare::register(registry, http.clone());

    #[cfg(feature = "digitalocean")]
    ddns_provider_digitalocean::register(registry, http.clone());

    debug!("Registered DNS providers: {:?}", registry.list_providers());
}

#[cfg(feature = "telegram")]
fn build_notifier(
    config: &ClientConfig,
    http: &reqwest::Client,
) -> Result<Option<Box<dyn Notifier>>> {
    match &config.telegram {
        Some(telegram) => {
            let notifier = ddns_notify_telegram::TelegramNotifier::new(telegram, http.clone())?;
            Ok(Some(Box::new(notifier)))
        }
        None => Ok(None),
    }
}

#[cfg(not(feature = "telegram"))]
fn build_notifier(
    config: &ClientConfig,
    _http: &reqwest::Client,
) -> Result<Option<Box<dyn Notifier>>> {
    if config.telegram.is_some() {
        warn!("TELEGRAM_TOKEN is set but ddnsd was built without the telegram feature");
    }
    Ok(None)
}

fn log_client_config(config: &ClientConfig) {
    info!("IP server: {}", config.server_url);
    info!(
        "Check period: {:?}, request timeout: {:?}",
        config.check_period, config.request_timeout
    );
    debug!("Attempts before warning: {}", config.attempts_before_warning);

    if config.providers.is_empty() {
        warn!("No DNS providers configured");
    }
    for provider in &config.providers {
        info!("DNS provider: {:?}", provider);
    }

    match &config.telegram {
        Some(telegram) => info!("Notifications: telegram chat {}", telegram.chat_id),
        None => info!("Notifications: disabled"),
    }
}

/// Install SIGTERM/SIGINT handlers
///
/// Handlers are registered before the returned future is polled, so a signal
/// arriving during startup is not lost.
///
/// # Returns
///
/// A future resolving to the name of the first signal received.
#[cfg(unix)]
fn install_signal_handlers() -> Result<impl Future<Output = &'static str> + Send + 'static> {
    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to setup SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to setup SIGINT handler")?;

    Ok(async move {
        tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        }
    })
}

/// Fallback implementation for non-Unix platforms (CTRL-C only)
#[cfg(not(unix))]
fn install_signal_handlers() -> Result<impl Future<Output = &'static str> + Send + 'static> {
    Ok(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to wait for CTRL-C: {}", e);
            std::future::pending::<()>().await;
        }
        "CTRL-C"
    })
}
