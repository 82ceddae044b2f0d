use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::{self, BufRead, Write};
use std::sync::Arc;

use homeflix::config::Config;
use homeflix::credentials::FileCredentialStore;
use homeflix::extractor::{self, StrategyKind};
use homeflix::fetcher::PageFetcher;
use homeflix::hosts;
use homeflix::library;
use homeflix::links::LinkSet;
use homeflix::logging;
use homeflix::models::{MediaKind, MediaSummary};
use homeflix::pipeline::{AutoConfirm, Confirm, ScrapePipeline, ScrapeReport};
use homeflix::premiumize::PremiumizeClient;
use homeflix::targets;
use homeflix::tmdb::TmdbClient;
use homeflix::trakt::{ScrobbleAction, ScrobbleTarget, TraktAuth, TraktClient};

#[derive(Parser)]
#[command(name = "homeflix")]
#[command(about = "Find, scrape and queue downloads for your media library", long_about = None)]
struct Cli {
    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape a page for file-host links and send them to Premiumize
    Scrape {
        url: String,

        #[command(flatten)]
        options: ScrapeOptions,
    },

    /// Build a search URL for a title and scrape it
    Find {
        /// Metadata id of the movie or show
        id: u64,

        #[arg(short, long, default_value = "movie")]
        kind: MediaKind,

        #[arg(short, long, requires = "episode")]
        season: Option<u32>,

        #[arg(short, long, requires = "season")]
        episode: Option<u32>,

        #[command(flatten)]
        options: ScrapeOptions,
    },

    /// Tell which file host a URL belongs to
    Classify { url: String },

    /// Search movie (or show) metadata
    Search {
        query: String,

        #[arg(long)]
        shows: bool,
    },

    /// Upcoming movies, popular movies and trending shows
    Discover {
        /// Show only one of the lists
        list: Option<DiscoverList>,
    },

    /// Details of a movie or show
    Details {
        id: u64,

        #[arg(short, long, default_value = "movie")]
        kind: MediaKind,
    },

    /// Episodes of one season of a show
    Episodes { show_id: u64, season: u32 },

    /// Connect a tracking account using a device code
    Login,

    /// Forget the tracking account
    Logout,

    /// Your tracking lists
    Lists,

    /// Items of a tracking list with their metadata
    ListItems { list_id: String },

    /// Add a title to a tracking list
    Add {
        list_id: String,
        id: u64,

        #[arg(short, long, default_value = "movie")]
        kind: MediaKind,
    },

    /// Remove a title from a tracking list
    Remove {
        list_id: String,
        id: u64,

        #[arg(short, long, default_value = "movie")]
        kind: MediaKind,
    },

    /// Which of your lists contain a title
    Check {
        id: u64,

        #[arg(short, long, default_value = "movie")]
        kind: MediaKind,
    },

    /// Report watch progress (start, pause or stop)
    Scrobble {
        action: ScrobbleAction,

        /// Tracking-service id of the movie, show or episode
        trakt_id: u64,

        #[arg(short, long, default_value = "movie")]
        kind: MediaKind,

        #[arg(short, long, requires = "episode")]
        season: Option<u32>,

        #[arg(short, long, requires = "season")]
        episode: Option<u32>,

        #[arg(short, long, default_value_t = 0.0)]
        progress: f64,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum DiscoverList {
    Upcoming,
    Popular,
    Trending,
}

#[derive(clap::Args)]
struct ScrapeOptions {
    /// Extraction strategy: flat or posts
    #[arg(long)]
    strategy: Option<StrategyKind>,

    /// Submit without asking
    #[arg(short, long)]
    yes: bool,

    /// Only list the links found
    #[arg(long)]
    dry_run: bool,
}

/// Asks on the terminal before anything is submitted.
struct PromptConfirm;

impl Confirm for PromptConfirm {
    fn confirm(&self, links: &LinkSet) -> bool {
        print_links(links);
        print!("\nSubmit {} links to Premiumize? [y/N] ", links.len());
        if io::stdout().flush().is_err() {
            return false;
        }

        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(_) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
            Err(_) => false,
        }
    }
}

fn print_links(links: &LinkSet) {
    println!("\nFound {} links:", links.len());
    println!("{:-<100}", "");
    for (i, link) in links.iter().enumerate() {
        let host = hosts::registry().classify(link).unwrap_or("unknown host");
        println!("{}. [{}] {}", i + 1, host, link);
    }
    println!("{:-<100}", "");
}

fn print_summaries(heading: &str, results: &[MediaSummary]) {
    if results.is_empty() {
        println!("{}: no results", heading);
        return;
    }

    println!("\n{} ({}):", heading, results.len());
    println!("{:-<100}", "");
    for (i, item) in results.iter().enumerate() {
        print!("{}. {} [{}]", i + 1, item.title, item.id);
        if let Some(year) = &item.year {
            print!(" ({})", year);
        }
        if let Some(rating) = item.rating {
            print!(" | Rating: {:.1}", rating);
        }
        println!();
    }
    println!("{:-<100}", "");
}

fn print_report(report: &ScrapeReport) {
    let path: Vec<String> = report.states.iter().map(|s| s.to_string()).collect();
    println!("\nStrategy: {} | {}", report.strategy, path.join(" -> "));

    if report.links.is_empty() {
        println!("No downloadable links found on {}", report.target_url);
        return;
    }
    if report.submissions.is_empty() {
        if !report.confirmed {
            print_links(&report.links);
        }
        return;
    }

    for outcome in &report.submissions {
        match &outcome.result {
            Ok(result) => println!(
                "✓ {} ({})",
                outcome.link,
                result.name.as_deref().unwrap_or(&result.status)
            ),
            Err(e) => println!("✗ {}: {}", outcome.link, e),
        }
    }
    println!(
        "\nSubmitted {} of {} links",
        report.submitted(),
        report.submissions.len()
    );
}

async fn scrape(config: &Config, url: &str, options: &ScrapeOptions) -> Result<()> {
    let strategy = options.strategy.unwrap_or(config.scraper.strategy);
    let fetcher = PageFetcher::new(&config.scraper).context("building HTTP client")?;
    let extractor = extractor::for_strategy(strategy, &config.scraper)?;

    let report = if options.dry_run {
        ScrapePipeline::dry_run(&fetcher, extractor.as_ref())
            .run(url, &AutoConfirm(false))
            .await
    } else {
        let premiumize = PremiumizeClient::new(&config.premiumize)
            .context("set PREMIUMIZE_API_KEY or use --dry-run")?;
        let pipeline = ScrapePipeline::new(&fetcher, extractor.as_ref(), &premiumize);
        if options.yes {
            pipeline.run(url, &AutoConfirm(true)).await
        } else {
            pipeline.run(url, &PromptConfirm).await
        }
    };

    let report = report
        .into_result()
        .with_context(|| format!("scraping {}", url))?;
    print_report(&report);
    Ok(())
}

fn trakt_session(config: &Config) -> Result<(Arc<TraktAuth>, TraktClient)> {
    let store = Arc::new(FileCredentialStore::default_location()?);
    let auth = Arc::new(TraktAuth::new(&config.trakt, store)?);
    let client = TraktClient::new(&config.trakt, auth.clone())?;
    Ok((auth, client))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let config = Config::load().context("loading configuration")?;

    match cli.command {
        Commands::Scrape { url, options } => {
            scrape(&config, &url, &options).await?;
        }
        Commands::Find {
            id,
            kind,
            season,
            episode,
            options,
        } => {
            let kind = if season.is_some() { MediaKind::Show } else { kind };
            let tmdb = TmdbClient::new(&config.tmdb)?;
            let details = tmdb.item_details(id, kind).await?;

            let target = match (season, episode) {
                (Some(season), Some(episode)) => {
                    let imdb_id = tmdb.imdb_id(id, kind).await;
                    targets::episode_target(
                        &config.sources,
                        &details.title,
                        season,
                        episode,
                        imdb_id.as_deref(),
                    )
                }
                _ => targets::title_target(&config.sources, &details.title),
            };

            println!("Searching for: {}", target.search_term);
            scrape(&config, &target.url, &options).await?;
        }
        Commands::Classify { url } => {
            let registry = hosts::registry();
            match registry.classify(&url) {
                Some(host) => {
                    println!("{}", host);
                    if let Some(caps) = registry.capabilities(host) {
                        println!(
                            "   Cache: {} | Direct download: {} | Queue: {}",
                            caps.cache, caps.direct_download, caps.queue
                        );
                    }
                }
                None => println!("No known host matches {}", url),
            }
        }
        Commands::Search { query, shows } => {
            let tmdb = TmdbClient::new(&config.tmdb)?;
            if shows {
                let results = tmdb.search_shows(&query).await?;
                print_summaries(&format!("Shows matching \"{}\"", query), &results);
            } else {
                let results = tmdb.search_movies(&query).await?;
                print_summaries(&format!("Movies matching \"{}\"", query), &results);
            }
        }
        Commands::Discover { list } => {
            let tmdb = TmdbClient::new(&config.tmdb)?;
            match list {
                Some(DiscoverList::Upcoming) => {
                    print_summaries("Upcoming movies", &tmdb.upcoming_movies().await?)
                }
                Some(DiscoverList::Popular) => {
                    print_summaries("Popular movies", &tmdb.popular_movies().await?)
                }
                Some(DiscoverList::Trending) => {
                    print_summaries("Trending shows", &tmdb.trending_shows().await?)
                }
                None => {
                    let (upcoming, popular, trending) = tokio::try_join!(
                        tmdb.upcoming_movies(),
                        tmdb.popular_movies(),
                        tmdb.trending_shows()
                    )?;

                    print_summaries("Upcoming movies", &upcoming);
                    print_summaries("Popular movies", &popular);
                    print_summaries("Trending shows", &trending);
                }
            }
        }
        Commands::Details { id, kind } => {
            let tmdb = TmdbClient::new(&config.tmdb)?;
            let details = tmdb.item_details(id, kind).await?;

            println!("\n{} ({})", details.title, details.year);
            println!("{:-<100}", "");
            if !details.genres.is_empty() {
                println!("Genres: {}", details.genres.join(", "));
            }
            if let Some(rating) = details.rating {
                println!("Rating: {:.1}", rating);
            }
            if let Some(seasons) = details.seasons {
                println!("Seasons: {}", seasons);
            }
            if let Some(poster) = &details.poster_url {
                println!("Poster: {}", poster);
            }
            println!("\n{}", details.overview);
        }
        Commands::Episodes { show_id, season } => {
            let tmdb = TmdbClient::new(&config.tmdb)?;
            let episodes = tmdb.season_episodes(show_id, season).await?;

            println!("\nSeason {} ({} episodes):", season, episodes.len());
            println!("{:-<100}", "");
            for ep in &episodes {
                print!(
                    "{} {}",
                    targets::episode_tag(season, ep.episode_number),
                    ep.name
                );
                if let Some(date) = &ep.air_date {
                    print!(" | Aired: {}", date);
                }
                println!();
            }
        }
        Commands::Login => {
            let (auth, _) = trakt_session(&config)?;
            let username = auth
                .login(|code| {
                    println!("\nGo to {} and enter the code: {}", code.verification_url, code.user_code);
                    println!("Waiting for approval...");
                })
                .await?;
            println!("Logged in as {}", username);
        }
        Commands::Logout => {
            let (auth, _) = trakt_session(&config)?;
            auth.logout().await?;
            println!("Logged out");
        }
        Commands::Lists => {
            let (_, trakt) = trakt_session(&config)?;
            let lists = trakt.lists().await?;

            println!("\nYour lists ({}):", lists.len());
            println!("{:-<100}", "");
            for list in &lists {
                println!("{} [{}] - {} items", list.name, list.ids.trakt, list.item_count);
                if let Some(description) = list.description.as_deref().filter(|d| !d.is_empty()) {
                    println!("   {}", description);
                }
            }
        }
        Commands::ListItems { list_id } => {
            let (auth, trakt) = trakt_session(&config)?;
            let tmdb = TmdbClient::new(&config.tmdb)?;
            let username = auth.username()?.unwrap_or_else(|| "me".to_string());

            let items = library::list_items_with_details(&trakt, &tmdb, &username, &list_id).await?;
            if let Some(cover) = library::list_cover(&items) {
                println!("Cover: {}", cover);
            }
            println!("{:-<100}", "");
            for (i, item) in items.iter().enumerate() {
                print!("{}. {} [{}]", i + 1, item.title, item.kind);
                if !item.year.is_empty() {
                    print!(" ({})", item.year);
                }
                println!();
            }
        }
        Commands::Add { list_id, id, kind } => {
            let (_, trakt) = trakt_session(&config)?;
            trakt.add_to_list(&list_id, id, kind).await?;
            println!("Added {} {} to list {}", kind, id, list_id);
        }
        Commands::Remove { list_id, id, kind } => {
            let (_, trakt) = trakt_session(&config)?;
            trakt.remove_from_list(&list_id, id, kind).await?;
            println!("Removed {} {} from list {}", kind, id, list_id);
        }
        Commands::Check { id, kind } => {
            let (_, trakt) = trakt_session(&config)?;
            let lists = trakt.lists_containing(id, kind).await?;
            if lists.is_empty() {
                println!("Not on any of your lists");
            } else {
                let ids: Vec<String> = lists.iter().map(|id| id.to_string()).collect();
                println!("On lists: {}", ids.join(", "));
            }
        }
        Commands::Scrobble {
            action,
            trakt_id,
            kind,
            season,
            episode,
            progress,
        } => {
            if !(0.0..=100.0).contains(&progress) {
                bail!("progress must be between 0 and 100");
            }

            let target = match (season, episode, kind) {
                (Some(season), Some(number), _) => ScrobbleTarget::Episode {
                    trakt_id,
                    season,
                    number,
                },
                (_, _, MediaKind::Show) => ScrobbleTarget::Show { trakt_id },
                (_, _, MediaKind::Movie) => ScrobbleTarget::Movie { trakt_id },
            };

            let (_, trakt) = trakt_session(&config)?;
            trakt.scrobble(action, target, progress).await?;
            println!("Scrobbled {:?} at {:.0}%", action, progress);
        }
    }

    Ok(())
}
