mod commands;

use std::path::PathBuf;

use autodeploy_core::{Track, DEFAULT_CLUSTER};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "autodeploy",
    about = "Build, provision, and deploy CI review apps to Kubernetes"
)]
#[command(version)]
struct Cli {
    /// Project directory holding the Dockerfile, chart, and autodeploy.toml
    #[arg(long, short = 'C', global = true, default_value = ".")]
    project_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure kubectl for a cluster from KUBE_* variables
    Auth {
        /// Cluster selector (`production` reads KUBE_*, others KUBE_<CLUSTER>_*)
        #[arg(default_value = DEFAULT_CLUSTER)]
        cluster: String,
    },
    /// Build and push every Dockerfile stage and the final image
    Build {
        /// Dockerfile to build (default from autodeploy.toml)
        #[arg(long)]
        dockerfile: Option<PathBuf>,
    },
    /// Provision the track's PostgreSQL or MySQL release
    Database {
        #[arg(default_value_t = Track::stable())]
        track: Track,
    },
    /// Replace the track's application secret from K8S_SECRET_* variables
    Secret {
        #[arg(default_value_t = Track::stable())]
        track: Track,
    },
    /// Deploy the track: namespace, secret, database, jobs, and release
    Deploy {
        #[arg(default_value_t = Track::stable())]
        track: Track,
    },
    /// Delete every resource of a track
    Delete {
        #[arg(default_value_t = Track::stable())]
        track: Track,
        /// Also delete the track's database release
        #[arg(long)]
        include_database: bool,
    },
    /// Check that docker, kubectl, and helm are ready
    Doctor,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                // arch-lint: allow(no-silent-result-drop) reason="unset or invalid RUST_LOG falls back to the info level"
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let project_dir = cli.project_dir;

    match cli.command {
        Commands::Auth { cluster } => commands::auth(&project_dir, &cluster).await?,
        Commands::Build { dockerfile } => commands::build(&project_dir, dockerfile).await?,
        Commands::Database { track } => commands::database(&project_dir, track).await?,
        Commands::Secret { track } => commands::secret(&project_dir, track).await?,
        Commands::Deploy { track } => commands::deploy(&project_dir, track).await?,
        Commands::Delete {
            track,
            include_database,
        } => commands::delete(&project_dir, track, include_database).await?,
        Commands::Doctor => commands::doctor(&project_dir).await?,
    }

    Ok(())
}
