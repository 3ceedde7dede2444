use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tokio::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lgtm_app::cache::RemoteCache;
use lgtm_app::config::AppConfig;
use lgtm_app::database::{Database, Store};
use lgtm_app::github::{GitHubClient, Remote};
use lgtm_app::webhooks::Dispatcher;
use lgtm_app::AppState;

#[derive(Parser)]
#[command(name = "lgtm-app")]
#[command(about = "Gate pull requests on a quorum of maintainer approvals")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to ./lgtm.toml when present)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run migrations and serve webhooks
    Serve,

    /// Store a user and the token used on behalf of their repositories
    Register {
        #[arg(long)]
        login: String,

        #[arg(long)]
        token: String,

        #[arg(long, default_value = "")]
        avatar: String,
    },

    /// Install or remove the webhook of a repository
    Hook {
        #[command(subcommand)]
        action: HookAction,
    },

    /// List repositories a user administers
    Repos {
        #[arg(long)]
        login: String,
    },

    /// List organisations a user belongs to
    Teams {
        #[arg(long)]
        login: String,
    },
}

#[derive(Subcommand)]
enum HookAction {
    /// Require approvals on a repository; the acting user must be an admin
    Enable {
        /// Repository as owner/name
        #[arg(long)]
        slug: String,

        /// Public URL of this service's /hook endpoint
        #[arg(long)]
        url: String,

        /// Registered user whose token installs the hook
        #[arg(long)]
        login: String,
    },

    /// Stop requiring approvals on a registered repository
    Disable {
        #[arg(long)]
        slug: String,

        #[arg(long)]
        url: String,
    },
}

struct Services {
    config: AppConfig,
    database: Database,
    remote: Arc<GitHubClient>,
    cache: Arc<RemoteCache>,
}

impl Services {
    async fn user(&self, login: &str) -> anyhow::Result<lgtm_app::database::models::User> {
        self.database
            .get_user_by_login(login)
            .await?
            .with_context(|| format!("User {} is not registered", login))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lgtm_app=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    debug!("Configuration loaded: {:?}", config.bind_address());

    let database = Database::new(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    database.run_migrations().await?;

    let services = Services {
        remote: Arc::new(GitHubClient::new(config.github_api_url.clone())),
        cache: Arc::new(RemoteCache::new(config.cache_ttl())),
        config,
        database,
    };

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(services).await,
        Commands::Register {
            login,
            token,
            avatar,
        } => {
            let user = services.database.create_user(&login, &token, &avatar).await?;
            info!("Registered user {} (id {})", user.login, user.id);
            Ok(())
        }
        Commands::Hook { action } => hook(services, action).await,
        Commands::Repos { login } => {
            let user = services.user(&login).await?;
            let repos = services
                .cache
                .get_repos(services.remote.as_ref(), &user)
                .await?;
            for repo in repos {
                println!("{}\t{}", repo.slug, repo.link);
            }
            Ok(())
        }
        Commands::Teams { login } => {
            let user = services.user(&login).await?;
            let teams = services
                .cache
                .get_teams(services.remote.as_ref(), &user)
                .await?;
            for team in teams {
                println!("{}", team.login);
            }
            Ok(())
        }
    }
}

async fn serve(services: Services) -> anyhow::Result<()> {
    info!("Starting lgtm-app");

    // Expired entries are also dropped on read; the sweep bounds memory.
    let cache = Arc::clone(&services.cache);
    let sweep_interval = services.config.cache_ttl().max(Duration::from_secs(60));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_interval);
        loop {
            interval.tick().await;
            let purged = cache.purge_expired();
            if purged > 0 {
                debug!("Purged {} expired cache entries", purged);
            }
        }
    });

    let defaults = services.config.default_policy();
    let dispatcher = Dispatcher::new(
        services.remote.clone(),
        Arc::new(services.database.clone()),
        services.cache.clone(),
        defaults,
    );
    let addr = services.config.bind_address();
    let app = lgtm_app::app(AppState::new(services.config, dispatcher));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn hook(services: Services, action: HookAction) -> anyhow::Result<()> {
    match action {
        HookAction::Enable { slug, url, login } => {
            let Some((owner, name)) = slug.split_once('/') else {
                bail!("Repository must be given as owner/name, got {}", slug);
            };
            let user = services.user(&login).await?;

            let perm = services
                .cache
                .get_perm(services.remote.as_ref(), &user, owner, name)
                .await?;
            if !perm.admin {
                bail!("{} is not an administrator of {}", user.login, slug);
            }

            let repo = services.remote.get_repo(&user, owner, name).await?;
            services.remote.set_hook(&user, &repo, &url).await?;
            if services.database.get_repo_by_slug(&repo.slug).await?.is_none() {
                services.database.create_repo(user.id, &repo).await?;
            }
            info!("Approvals required on {}", repo.slug);
        }
        HookAction::Disable { slug, url } => {
            let Some(repo) = services.database.get_repo_by_slug(&slug).await? else {
                bail!("Repository {} is not registered", slug);
            };
            let Some(user) = services.database.get_user(repo.user_id).await? else {
                bail!("Owner of {} is not registered", slug);
            };

            services.remote.del_hook(&user, &repo, &url).await?;
            services.database.delete_repo(&repo.slug).await?;
            info!("Approvals no longer required on {}", repo.slug);
        }
    }
    Ok(())
}
