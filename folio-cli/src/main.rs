//! Folio CLI
//!
//! Command-line client for the Ausexticity content platform.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use folio_client::search;
use folio_client::{ChatHistory, ClientConfig, ContentClient, HeaderPresenter, HeaderView};
use folio_core::constants::PREVIEW_MAX_CHARS;
use folio_core::error::FolioError;
use folio_core::types::{Article, ArticleDraft, ResourceKey, SessionState};

/// Folio - read and write on the Ausexticity content platform
#[derive(Parser)]
#[command(name = "folio")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Backend base URL
    #[arg(long, global = true, env = "FOLIO_API_BASE_URL")]
    base_url: Option<String>,

    /// Storage file for session, cache and chat history
    #[arg(long, global = true, env = "FOLIO_STORAGE_PATH")]
    storage: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List articles, newest first
    Articles {
        /// Ignore the cached list
        #[arg(short, long)]
        refresh: bool,
    },

    /// Search articles by keyword
    Search {
        /// Keyword matched against title, content and tags
        query: String,
        /// Print titles as HTML with matches marked
        #[arg(long)]
        html: bool,
    },

    /// List your own articles
    Mine,

    /// Show one article
    Show {
        /// Article id
        id: String,
    },

    /// Store a login
    Login {
        /// User id from the identity provider
        #[arg(long)]
        user_id: String,
        /// Bearer token from the identity provider
        #[arg(long, env = "FOLIO_TOKEN", hide_env_values = true)]
        token: String,
    },

    /// Forget the stored login
    Logout,

    /// Show who is logged in
    Whoami {
        /// Ignore cached profile data
        #[arg(short, long)]
        refresh: bool,
    },

    /// Publish a new article
    Publish {
        #[command(flatten)]
        article: ArticleArgs,
    },

    /// Replace an existing article
    Edit {
        /// Article id
        id: String,
        #[command(flatten)]
        article: ArticleArgs,
    },

    /// Upload a new avatar
    Avatar {
        /// Image file
        file: PathBuf,
    },

    /// Assistant chat transcript
    Chat {
        #[command(subcommand)]
        action: ChatCommand,
    },

    /// Local resource cache
    Cache {
        #[command(subcommand)]
        action: CacheCommand,
    },
}

#[derive(clap::Args)]
struct ArticleArgs {
    /// Title
    #[arg(short, long)]
    title: String,
    /// Markdown body
    #[arg(short, long)]
    content: String,
    /// Tag (repeatable)
    #[arg(long = "tag")]
    tags: Vec<String>,
    /// Cover image to upload
    #[arg(short, long)]
    image: Option<PathBuf>,
}

#[derive(Subcommand)]
enum ChatCommand {
    /// Print the transcript
    History,
    /// Replace the local transcript with the backend's
    Sync,
    /// Empty the local transcript
    Clear {
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Record a message
    Say {
        /// Message text
        text: String,
    },
}

#[derive(Subcommand)]
enum CacheCommand {
    /// Show cached resources and their age
    Status,
    /// Drop every cached resource
    Clear {
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "folio=debug,info"
    } else {
        "folio=info,warn"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = ClientConfig::from_env();
    if let Some(url) = cli.base_url {
        config = config.with_base_url(url);
    }
    if let Some(path) = cli.storage {
        config = config.with_storage_path(path);
    }
    debug!(?config, "Loaded configuration");

    let client = ContentClient::from_config(&config).context("Failed to initialize client")?;

    match cli.command {
        Commands::Articles { refresh } => cmd_articles(&client, refresh).await,
        Commands::Search { query, html } => cmd_search(&client, &query, html).await,
        Commands::Mine => cmd_mine(&client).await,
        Commands::Show { id } => cmd_show(&client, &id).await,
        Commands::Login { user_id, token } => cmd_login(&client, &user_id, &token),
        Commands::Logout => cmd_logout(&client),
        Commands::Whoami { refresh } => cmd_whoami(&client, refresh).await,
        Commands::Publish { article } => cmd_publish(&client, article).await,
        Commands::Edit { id, article } => cmd_edit(&client, &id, article).await,
        Commands::Avatar { file } => cmd_avatar(&client, &file).await,
        Commands::Chat { action } => cmd_chat(&client, action).await,
        Commands::Cache { action } => cmd_cache(&client, action),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// HELPERS
// ═══════════════════════════════════════════════════════════════════════════

fn spinner(message: &'static str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

fn require_session(client: &ContentClient) -> Result<SessionState> {
    let session = client.session();
    if !session.is_logged_in() {
        bail!("Not logged in. Run `folio login --user-id <ID> --token <TOKEN>` first.");
    }
    Ok(session)
}

fn print_stale_warning(warning: Option<&FolioError>) {
    if let Some(err) = warning {
        println!(
            "{} {}",
            "⚠️  Could not refresh, showing cached data:".yellow(),
            err.to_string().yellow()
        );
    }
}

fn print_article_row(article: &Article) {
    println!(
        "{} {} {}",
        article.formatted_date().dimmed(),
        article.title.bold(),
        format!("[{}]", article.id).dimmed()
    );
    let preview = article.preview_text(PREVIEW_MAX_CHARS);
    if !preview.is_empty() {
        println!("   {}", preview.replace('\n', " "));
    }
}

fn print_articles(articles: &[Article]) {
    if articles.is_empty() {
        println!("{}", "No articles found.".yellow());
        return;
    }
    for article in articles {
        print_article_row(article);
    }
}

fn confirm(prompt: &str, yes: bool) -> Result<bool> {
    if yes {
        return Ok(true);
    }
    Ok(Confirm::new().with_prompt(prompt).default(false).interact()?)
}

fn read_image(path: &Path) -> Result<(Vec<u8>, String)> {
    let data = std::fs::read(path)
        .with_context(|| format!("Failed to read image {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("image")
        .to_string();
    Ok((data, file_name))
}

async fn build_draft(
    client: &ContentClient,
    session: &SessionState,
    args: ArticleArgs,
) -> Result<ArticleDraft> {
    let mut draft = ArticleDraft::new(args.title, args.content).with_tags(args.tags);
    if let Some(path) = args.image {
        let (data, file_name) = read_image(&path)?;
        let pb = spinner("Uploading image...")?;
        let url = client.upload_image(data, &file_name, session).await;
        pb.finish_and_clear();
        draft = draft.with_image(url.context("Failed to upload image")?);
    }
    Ok(draft)
}

fn format_age(age: Duration) -> String {
    let secs = age.as_secs();
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else {
        format!("{}h{}m", secs / 3600, (secs % 3600) / 60)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// READING
// ═══════════════════════════════════════════════════════════════════════════

/// List articles
async fn cmd_articles(client: &ContentClient, refresh: bool) -> Result<()> {
    let pb = spinner("Loading articles...")?;
    let listing = client.articles(refresh).await;
    pb.finish_and_clear();
    let listing = listing.context("Failed to load articles")?;

    print_stale_warning(listing.warning());
    println!("{} {}", "📚 Articles:".cyan().bold(), listing.len());
    print_articles(&search::newest_first(listing.to_vec()));
    Ok(())
}

/// Search articles
async fn cmd_search(client: &ContentClient, query: &str, html: bool) -> Result<()> {
    println!("{} {}", "🔍 Searching:".cyan().bold(), query);

    let found = client.search(query).await.context("Search failed")?;
    print_stale_warning(found.warning.as_ref());

    if html {
        for article in &found.articles {
            println!("{}", search::highlight(&article.title, query));
        }
    } else {
        println!("{} {} result(s)", "✅".green(), found.articles.len());
        print_articles(&found.articles);
    }
    Ok(())
}

/// List own articles
async fn cmd_mine(client: &ContentClient) -> Result<()> {
    let session = require_session(client)?;
    let user_id = session.user_id.as_deref().unwrap_or_default();

    let mine = client
        .user_articles(user_id)
        .await
        .context("Failed to load articles")?;
    print_stale_warning(mine.warning.as_ref());

    println!("{} {}", "📝 Your articles:".cyan().bold(), mine.articles.len());
    print_articles(&mine.articles);
    Ok(())
}

/// Show one article
async fn cmd_show(client: &ContentClient, id: &str) -> Result<()> {
    let detail = client.article(id).await.context("Failed to load article")?;
    print_stale_warning(detail.warning.as_ref());

    let article = &detail.article;
    println!("\n{}", article.title.bold());
    println!(
        "   {} {}",
        "Published:".dimmed(),
        article.formatted_date()
    );
    if let Some(author) = &article.author {
        println!("   {} {}", "Author:".dimmed(), author);
    }
    if !article.tags.is_empty() {
        println!("   {} {}", "Tags:".dimmed(), article.tags.join(", "));
    }
    println!("   {} {}", "Image:".dimmed(), article.cover_image());
    println!("\n{}\n", article.content);

    if let Some(prev) = &detail.previous {
        println!(
            "   {} {} [{}]",
            "← Previous:".dimmed(),
            search::truncate_title(&prev.title),
            prev.id
        );
    }
    if let Some(next) = &detail.next {
        println!(
            "   {} {} [{}]",
            "→ Next:".dimmed(),
            search::truncate_title(&next.title),
            next.id
        );
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════
// SESSION
// ═══════════════════════════════════════════════════════════════════════════

/// Store a login
fn cmd_login(client: &ContentClient, user_id: &str, token: &str) -> Result<()> {
    let session = client.login(user_id, token).context("Failed to store login")?;
    println!(
        "{} {}",
        "✅ Logged in as".green(),
        session.user_id.unwrap_or_default().bold()
    );
    Ok(())
}

/// Forget the login
fn cmd_logout(client: &ContentClient) -> Result<()> {
    client.logout().context("Failed to clear login")?;
    println!("{}", "👋 Logged out".green());
    Ok(())
}

/// Show the current user
async fn cmd_whoami(client: &ContentClient, refresh: bool) -> Result<()> {
    let session = client.session();

    if refresh && session.is_logged_in() {
        let pb = spinner("Refreshing profile...")?;
        let (avatar, role) = tokio::join!(
            client.avatar(&session, true),
            client.role(&session, true)
        );
        pb.finish_and_clear();
        for err in [avatar.err(), role.err()].into_iter().flatten() {
            println!("{} {}", "⚠️  Could not refresh profile:".yellow(), err);
        }
    }

    let presenter = HeaderPresenter::new();
    let _subscription = presenter.subscribe(|view| debug!(?view, "Header rendered"));

    let view = presenter.render(&session, client).await;
    match &view {
        HeaderView::LoggedOut => {
            println!("{}", "Not logged in.".yellow());
        }
        HeaderView::LoggedIn {
            user_id,
            avatar_url,
            role,
        } => {
            println!("{} {}", "👤 User:".cyan().bold(), user_id);
            println!("   {} {}", "Avatar:".dimmed(), avatar_url);
            println!("   {} {}", "Role:".dimmed(), role);
            if view.show_admin_link() {
                println!("   {}", "Admin console available".green());
            }
        }
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════
// WRITING
// ═══════════════════════════════════════════════════════════════════════════

/// Publish an article
async fn cmd_publish(client: &ContentClient, args: ArticleArgs) -> Result<()> {
    let session = require_session(client)?;
    let draft = build_draft(client, &session, args).await?;

    let pb = spinner("Publishing...")?;
    let id = client.publish(draft, &session).await;
    pb.finish_and_clear();
    let id = id.context("Failed to publish article")?;

    println!("{} {}", "✅ Published:".green().bold(), id);
    Ok(())
}

/// Replace an article
async fn cmd_edit(client: &ContentClient, id: &str, args: ArticleArgs) -> Result<()> {
    let session = require_session(client)?;
    let draft = build_draft(client, &session, args).await?;

    let pb = spinner("Saving...")?;
    let result = client.update(id, draft, &session).await;
    pb.finish_and_clear();
    result.context("Failed to update article")?;

    println!("{} {}", "✅ Updated:".green().bold(), id);
    Ok(())
}

/// Replace the avatar
async fn cmd_avatar(client: &ContentClient, file: &Path) -> Result<()> {
    let session = require_session(client)?;
    let (data, file_name) = read_image(file)?;

    let pb = spinner("Uploading avatar...")?;
    let result = async {
        let url = client.upload_image(data, &file_name, &session).await?;
        client.change_avatar(&url, &session).await?;
        Ok::<_, FolioError>(url)
    }
    .await;
    pb.finish_and_clear();
    let url = result.context("Failed to change avatar")?;

    println!("{} {}", "✅ Avatar updated:".green().bold(), url);
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════
// CHAT & CACHE
// ═══════════════════════════════════════════════════════════════════════════

/// Chat transcript commands
async fn cmd_chat(client: &ContentClient, action: ChatCommand) -> Result<()> {
    let history = ChatHistory::new(Arc::clone(client.store().storage()), client.api().clone());

    match action {
        ChatCommand::History => {
            let messages = history.all();
            if messages.is_empty() {
                println!("{}", "No messages yet.".yellow());
            }
            for message in messages {
                let speaker = if message.is_bot { "🤖" } else { "🧑" };
                println!(
                    "{} {} {}",
                    message.timestamp.format("%Y-%m-%d %H:%M").to_string().dimmed(),
                    speaker,
                    message.message
                );
            }
        }
        ChatCommand::Sync => {
            let session = require_session(client)?;
            let count = history
                .load_from_cloud(&session)
                .await
                .context("Failed to load chat history")?;
            println!("{} {} message(s)", "✅ Synced".green(), count);
        }
        ChatCommand::Clear { yes } => {
            if confirm("Delete the local chat transcript?", yes)? {
                history.clear();
                println!("{}", "🧹 Chat history cleared".green());
            }
        }
        ChatCommand::Say { text } => {
            let message = history.add_message(&text, false, &client.session()).await;
            println!("{} {}", "✅ Recorded".green(), message.message);
            println!(
                "   {} {} message(s)",
                "Context:".dimmed(),
                history.recent_context().len()
            );
        }
    }
    Ok(())
}

/// Cache commands
fn cmd_cache(client: &ContentClient, action: CacheCommand) -> Result<()> {
    let store = client.store();

    match action {
        CacheCommand::Status => {
            println!("{}", "🗄️  Cached resources:".cyan().bold());
            for key in ResourceKey::ALL {
                let status = match store.age(key.as_str()) {
                    None => "missing".dimmed(),
                    Some(age) if store.is_valid(key.as_str(), key.ttl()) => {
                        format!("fresh ({} old)", format_age(age)).green()
                    }
                    Some(age) => format!("expired ({} old)", format_age(age)).yellow(),
                };
                println!("   {:<12} {}", key.as_str(), status);
            }
        }
        CacheCommand::Clear { yes } => {
            if confirm("Drop every cached resource?", yes)? {
                let removed = store.clear();
                println!("{} {} entr(ies)", "🧹 Removed".green(), removed);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_publish_with_tags() {
        let cli = Cli::try_parse_from([
            "folio", "publish", "--title", "T", "--content", "C", "--tag", "NEWS", "--tag", "Beauty",
        ])
        .unwrap();
        match cli.command {
            Commands::Publish { article } => {
                assert_eq!(article.tags, vec!["NEWS", "Beauty"]);
                assert!(article.image.is_none());
            }
            _ => panic!("expected publish"),
        }
    }

    #[test]
    fn test_format_age() {
        assert_eq!(format_age(Duration::from_secs(42)), "42s");
        assert_eq!(format_age(Duration::from_secs(40 * 60)), "40m");
        assert_eq!(format_age(Duration::from_secs(3600 + 5 * 60)), "1h5m");
    }
}
