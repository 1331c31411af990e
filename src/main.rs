use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use rivestack_provider::controller::catalog;
use rivestack_provider::{
    ApplyOutcome, BackupConfigReconciler, ClusterReconciler, Context, DatabaseReconciler,
    ExtensionReconciler, FirewallReconciler, GrantReconciler, HttpApiClient, Lifecycle,
    ManagedResource, ProviderConfig, ProviderSettings, UserReconciler,
};

type BoxError = Box<dyn std::error::Error>;

#[derive(Parser)]
#[command(name = "rivestack")]
#[command(about = "Declarative management of Rivestack HA PostgreSQL clusters", long_about = None)]
struct Cli {
    /// API key (falls back to RIVESTACK_API_KEY)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// API base URL (falls back to RIVESTACK_BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available server types
    ServerTypes,

    /// List available PostgreSQL extensions
    Extensions {
        /// Only show extensions in this category
        #[arg(long)]
        category: Option<String>,
    },

    /// Show a cluster
    ClusterInfo {
        /// Cluster ID
        id: String,
    },

    /// List all clusters
    Clusters,

    /// Converge a resource on the desired state in a JSON file
    Apply {
        kind: Kind,

        /// Desired state (JSON)
        #[arg(long)]
        desired: PathBuf,

        /// State file from a previous run; written back on success
        #[arg(long)]
        state: Option<PathBuf>,
    },

    /// Re-read a resource and update its state file
    Refresh {
        kind: Kind,

        #[arg(long)]
        state: PathBuf,
    },

    /// Delete a resource and remove its state file
    Destroy {
        kind: Kind,

        #[arg(long)]
        state: PathBuf,
    },

    /// Adopt an existing resource by its composite identifier
    Import {
        kind: Kind,

        /// e.g. `42`, `42/appdb`, `42/pgvector/appdb`
        id: String,

        /// Where to write the imported state (stdout when omitted)
        #[arg(long)]
        state: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Kind {
    Cluster,
    User,
    Database,
    Extension,
    Grant,
    Firewall,
    Backup,
}

/// Lifecycle action on a single resource
enum Action {
    Apply {
        desired: PathBuf,
        state: Option<PathBuf>,
    },
    Refresh {
        state: PathBuf,
    },
    Destroy {
        state: PathBuf,
    },
    Import {
        id: String,
        state: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Logs go to stderr; stdout carries JSON only
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("rivestack_provider=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let config = ProviderConfig::resolve(&ProviderSettings {
        api_key: cli.api_key,
        base_url: cli.base_url,
    })?;
    info!(base_url = %config.base_url, "Using Rivestack API");

    let cancel = CancellationToken::new();
    let client = HttpApiClient::new(&config)?.with_cancellation(cancel.clone());
    let ctx = Context::new(Arc::new(client)).with_cancellation(cancel.clone());

    tokio::spawn(async move {
        shutdown_signal().await;
        warn!("Received shutdown signal, cancelling in-flight waits");
        cancel.cancel();
    });

    let result = match cli.command {
        Commands::ServerTypes => print_json(&catalog::server_types(&ctx).await?),
        Commands::Extensions { category } => {
            print_json(&catalog::extensions(&ctx, category.as_deref()).await?)
        }
        Commands::ClusterInfo { id } => print_json(&catalog::cluster_info(&ctx, &id).await?),
        Commands::Clusters => print_json(&catalog::clusters(&ctx).await?),
        Commands::Apply {
            kind,
            desired,
            state,
        } => dispatch(kind, ctx, Action::Apply { desired, state }).await,
        Commands::Refresh { kind, state } => dispatch(kind, ctx, Action::Refresh { state }).await,
        Commands::Destroy { kind, state } => dispatch(kind, ctx, Action::Destroy { state }).await,
        Commands::Import { kind, id, state } => {
            dispatch(kind, ctx, Action::Import { id, state }).await
        }
    };

    if let Err(e) = &result {
        error!("{}", e);
    }
    result
}

async fn dispatch(kind: Kind, ctx: Context, action: Action) -> Result<(), BoxError> {
    match kind {
        Kind::Cluster => run(Lifecycle::new(ClusterReconciler, ctx), action).await,
        Kind::User => run(Lifecycle::new(UserReconciler, ctx), action).await,
        Kind::Database => run(Lifecycle::new(DatabaseReconciler, ctx), action).await,
        Kind::Extension => run(Lifecycle::new(ExtensionReconciler, ctx), action).await,
        Kind::Grant => run(Lifecycle::new(GrantReconciler, ctx), action).await,
        Kind::Firewall => run(Lifecycle::new(FirewallReconciler, ctx), action).await,
        Kind::Backup => run(Lifecycle::new(BackupConfigReconciler, ctx), action).await,
    }
}

async fn run<R: ManagedResource>(lifecycle: Lifecycle<R>, action: Action) -> Result<(), BoxError> {
    match action {
        Action::Apply { desired, state } => {
            let desired: R::Desired = read_json(&desired)?;
            let prior: Option<R::State> = match &state {
                Some(path) if path.exists() => Some(read_json(path)?),
                _ => None,
            };

            let applied = lifecycle.apply(&desired, prior.as_ref()).await?;
            if applied.outcome == ApplyOutcome::Unchanged {
                info!("No changes");
            }
            write_state(state.as_deref(), &applied.state)
        }
        Action::Refresh { state } => {
            let current: R::State = read_json(&state)?;
            match lifecycle.refresh(&current).await? {
                Some(refreshed) => write_state(Some(state.as_path()), &refreshed),
                None => {
                    std::fs::remove_file(&state)?;
                    Ok(())
                }
            }
        }
        Action::Destroy { state } => {
            let current: R::State = read_json(&state)?;
            lifecycle.destroy(&current).await?;
            std::fs::remove_file(&state)?;
            Ok(())
        }
        Action::Import { id, state } => {
            let imported = lifecycle.import(&id).await?;
            write_state(state.as_deref(), &imported)
        }
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, BoxError> {
    let raw = std::fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|e| format!("{}: {}", path.display(), e).into())
}

fn write_state<T: Serialize>(path: Option<&Path>, state: &T) -> Result<(), BoxError> {
    match path {
        Some(path) => {
            std::fs::write(path, serde_json::to_string_pretty(state)?)?;
            info!(path = %path.display(), "State written");
            Ok(())
        }
        None => print_json(state),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), BoxError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
