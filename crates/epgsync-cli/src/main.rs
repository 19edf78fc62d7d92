//! epgsync - EPG provider fetch CLI.

/// Application configuration (TOML).
mod config;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use epgsync_api::{
    BatchOptions, ChannelMappingInfo, LocalEpgProvider, ProviderHealth, ProviderRegistry,
};
use tokio_util::sync::CancellationToken;
use tracing::instrument;
use tracing_subscriber::filter::EnvFilter;
#[cfg(not(feature = "otel"))]
use tracing_subscriber::fmt;
#[cfg(feature = "otel")]
use tracing_subscriber::layer::SubscriberExt;
#[cfg(feature = "otel")]
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{AppConfig, resolve_config_path};

/// CLI argument parser.
#[derive(Parser)]
#[command(about, version)]
struct Cli {
    /// Override config directory.
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// List registered providers and their channel catalogs.
    Providers,
    /// Run provider health checks.
    Health(HealthArgs),
    /// Fetch EPG data for several channels of one provider.
    Fetch(FetchArgs),
}

/// Arguments for the `health` subcommand.
#[derive(clap::Args)]
struct HealthArgs {
    /// Check only this provider (default: every enabled provider).
    /// A disabled provider named here is an error, as with `fetch`.
    #[arg(long)]
    provider: Option<String>,
}

/// Arguments for the `fetch` subcommand.
#[derive(clap::Args)]
struct FetchArgs {
    /// Provider name (e.g. "hebei").
    #[arg(long, required = true)]
    provider: String,

    /// Broadcast date, `YYYY-MM-DD` (default: today in the provider's timezone).
    #[arg(long)]
    date: Option<NaiveDate>,

    /// Comma-separated `provider_channel_id=channel_id` pairs (e.g. "462=hebei-tv").
    /// Falls back to config channels, then to the provider catalog.
    #[arg(long, value_delimiter = ',', value_parser = parse_channel_mapping)]
    channels: Option<Vec<ChannelMappingInfo>>,

    /// Maximum channels fetched at once (default: provider config).
    #[arg(long)]
    concurrency: Option<usize>,

    /// Abort channels still running after this many seconds.
    #[arg(long)]
    deadline_secs: Option<u64>,
}

/// Parses one `provider_channel_id=channel_id` pair.
fn parse_channel_mapping(s: &str) -> Result<ChannelMappingInfo, String> {
    match s.split_once('=') {
        Some((pid, cid)) if !pid.trim().is_empty() && !cid.trim().is_empty() => {
            Ok(ChannelMappingInfo::new(pid.trim(), cid.trim()))
        }
        _ => Err(format!(
            "invalid channel mapping {s:?}: expected provider_channel_id=channel_id"
        )),
    }
}

/// Loads the app config from `--dir` or the default location.
fn load_config(dir: Option<&PathBuf>) -> Result<AppConfig> {
    let path = resolve_config_path(dir)?;
    AppConfig::load(&path)
}

/// Requested date, or the provider's current date when omitted.
fn resolve_fetch_date(
    requested: Option<NaiveDate>,
    provider: &impl LocalEpgProvider,
) -> NaiveDate {
    requested.unwrap_or_else(|| provider.today())
}

/// Runs the `providers` subcommand.
fn run_providers(registry: &ProviderRegistry) {
    for name in registry.names() {
        let channels = registry.channels(name).unwrap_or_default();
        tracing::info!("{name} ({} channels)", channels.len());
        for channel in channels {
            tracing::info!("  {}\t{}", channel.id, channel.name);
        }
    }
}

/// Runs the `health` subcommand.
///
/// # Errors
///
/// Returns an error if the config cannot be loaded, the provider is
/// unknown, or any checked provider is unhealthy.
#[instrument(skip_all)]
async fn run_health(
    args: &HealthArgs,
    registry: &ProviderRegistry,
    dir: Option<&PathBuf>,
) -> Result<()> {
    let app_config = load_config(dir)?;

    let names: Vec<&str> = match args.provider.as_deref() {
        Some(name) if !registry.contains(name) => {
            bail!(
                "unknown provider: {name} (available: {})",
                registry.names().join(", ")
            );
        }
        Some(name) => vec![name],
        None => registry.names(),
    };

    let mut unhealthy = 0_usize;
    for name in names {
        let provider_config = app_config.provider_config(name);
        if !provider_config.enabled {
            if args.provider.is_some() {
                bail!("provider {name} is disabled in config");
            }
            tracing::info!("{name}\tskipped (disabled)");
            continue;
        }

        let health = match registry.create(&provider_config) {
            Ok(provider) => provider.health_check().await,
            Err(e) => ProviderHealth::unhealthy(format!("{e:#}")),
        };

        if health.healthy {
            tracing::info!("{name}\t{}", health.message);
        } else {
            unhealthy = unhealthy.saturating_add(1);
            tracing::warn!("{name}\tunhealthy: {}", health.message);
        }
    }

    if unhealthy > 0 {
        bail!("{unhealthy} provider(s) unhealthy");
    }
    Ok(())
}

/// Runs the `fetch` subcommand.
///
/// # Errors
///
/// Returns an error if the config cannot be loaded, the provider cannot be
/// built, or no channels are available.
#[instrument(skip_all, fields(provider = %args.provider))]
async fn run_fetch(
    args: &FetchArgs,
    registry: &ProviderRegistry,
    dir: Option<&PathBuf>,
) -> Result<()> {
    let app_config = load_config(dir)?;
    let provider_config = app_config.provider_config(&args.provider);
    if !provider_config.enabled {
        bail!("provider {} is disabled in config", args.provider);
    }
    let provider = registry
        .create(&provider_config)
        .with_context(|| format!("failed to create provider {}", args.provider))?;

    let mappings = match args.channels.clone() {
        Some(channels) => channels,
        None => {
            let configured = app_config.channel_mappings(&args.provider);
            if configured.is_empty() {
                // Catalog names double as canonical IDs.
                provider
                    .channels()
                    .iter()
                    .map(|c| ChannelMappingInfo::new(c.id, c.name))
                    .collect()
            } else {
                configured
            }
        }
    };
    if mappings.is_empty() {
        bail!("no channels to fetch for provider {}", args.provider);
    }

    let date = resolve_fetch_date(args.date, &provider);

    let cancel = CancellationToken::new();
    let mut options = BatchOptions::default()
        .max_concurrency(
            args.concurrency
                .unwrap_or_else(|| provider_config.max_concurrency()),
        )
        .cancel(cancel.clone());
    if let Some(secs) = args.deadline_secs {
        options = options.deadline(Duration::from_secs(secs));
    }

    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling remaining channels");
            cancel.cancel();
        }
    });

    tracing::info!("Fetching {} channel(s) for {date}", mappings.len());
    let mut outcome = provider.fetch_epg_batch(&mappings, date, &options).await;
    ctrl_c.abort();

    outcome
        .programs
        .sort_by(|a, b| a.channel_id.cmp(&b.channel_id).then(a.start_time.cmp(&b.start_time)));

    tracing::info!("Channel\tStart\t\t\tEnd\t\t\tTitle");
    for program in &outcome.programs {
        tracing::info!(
            "{}\t{}\t{}\t{}",
            program.channel_id,
            program.start_time.format("%Y-%m-%dT%H:%M:%SZ"),
            program.end_time.format("%Y-%m-%dT%H:%M:%SZ"),
            program.title,
        );
    }
    for failure in &outcome.failures {
        tracing::warn!(
            "{} ({}): {}",
            failure.channel_id,
            failure.provider_channel_id,
            failure.error
        );
    }
    tracing::info!(
        "Total: {} programs, {} failed channel(s)",
        outcome.programs.len(),
        outcome.failures.len()
    );

    Ok(())
}

/// Entry point.
///
/// # Errors
///
/// Returns an error if subcommand execution fails.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    #[cfg(not(feature = "otel"))]
    {
        fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .with_target(false)
            .init();
    }

    #[cfg(feature = "otel")]
    {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);

        let otel_layer = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
            .ok()
            .and_then(|_| {
                let exporter = opentelemetry_otlp::SpanExporter::builder()
                    .with_http()
                    .build()
                    .ok()?;

                let tracer_provider = opentelemetry_sdk::trace::SdkTracerProvider::builder()
                    .with_simple_exporter(exporter)
                    .build();

                let tracer = opentelemetry::trace::TracerProvider::tracer(
                    &tracer_provider,
                    env!("CARGO_PKG_NAME"),
                );
                opentelemetry::global::set_tracer_provider(tracer_provider);

                Some(tracing_opentelemetry::layer().with_tracer(tracer))
            });

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .with(otel_layer)
            .init();
    }

    let cli = Cli::parse();
    let registry = ProviderRegistry::with_builtin();
    match cli.command {
        Commands::Providers => {
            run_providers(&registry);
            Ok(())
        }
        Commands::Health(args) => run_health(&args, &registry, cli.dir.as_ref()).await,
        Commands::Fetch(args) => run_fetch(&args, &registry, cli.dir.as_ref()).await,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::panic)]

    use super::*;

    #[test]
    fn test_parse_channel_mapping() {
        // Arrange & Act
        let mapping = parse_channel_mapping(" 462 = hebei-tv ").unwrap();

        // Assert
        assert_eq!(mapping, ChannelMappingInfo::new("462", "hebei-tv"));
    }

    #[test]
    fn test_parse_channel_mapping_rejects_malformed() {
        // Arrange & Act & Assert
        for input in ["462", "=hebei-tv", "462=", ""] {
            let err = parse_channel_mapping(input).unwrap_err();
            assert!(err.contains("invalid channel mapping"), "{input}");
        }
    }

    #[test]
    fn test_cli_parses_fetch_args() {
        // Arrange & Act
        let cli = Cli::try_parse_from([
            "epgsync",
            "fetch",
            "--provider",
            "hebei",
            "--date",
            "2024-01-10",
            "--channels",
            "462=hebei-tv,114=hebei-economy",
            "--concurrency",
            "2",
        ])
        .unwrap();

        // Assert
        let Commands::Fetch(args) = cli.command else {
            panic!("expected fetch subcommand");
        };
        assert_eq!(args.provider, "hebei");
        assert_eq!(args.date, NaiveDate::from_ymd_opt(2024, 1, 10));
        assert_eq!(args.channels.unwrap().len(), 2);
        assert_eq!(args.concurrency, Some(2));
        assert!(args.deadline_secs.is_none());
    }

    #[test]
    fn test_resolve_fetch_date_defaults_to_provider_today() {
        // Arrange
        let registry = ProviderRegistry::with_builtin();
        let config = epgsync_api::ProviderConfig::new("hebei").with_base_url("http://127.0.0.1:9");
        let provider = registry.create(&config).unwrap();
        let explicit = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();

        // Act
        let before = provider.today();
        let defaulted = resolve_fetch_date(None, &provider);
        let after = provider.today();
        let requested = resolve_fetch_date(Some(explicit), &provider);

        // Assert
        assert!(defaulted == before || defaulted == after);
        assert_eq!(requested, explicit);
    }
}
