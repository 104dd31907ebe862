//! Chophouse CLI - browse the menu, leave feedback, and place orders.
//!
//! # Usage
//!
//! ```bash
//! # Menu, cheapest first
//! chop products --sort price_low_to_high
//!
//! # Search with filters
//! chop search jollof --max-price 5000 --min-rating 4
//!
//! # Review a dish
//! chop review submit -p 3 -n "Ada Obi" -e ada@example.com -r 5 -c "Perfect puff puff"
//!
//! # Place an order described in a JSON file, paying with a Stripe test card
//! chop order place order.json --card-token tok_visa
//! ```
//!
//! # Environment Variables
//!
//! See `chophouse_storefront::config` for the full list;
//! `CHOPHOUSE_API_BASE_URL` is required.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chophouse_core::{OrderId, ProductId};
use chophouse_storefront::api::catalog::ProductSort;
use chophouse_storefront::StorefrontConfig;

mod commands;

use commands::CliError;

#[derive(Parser)]
#[command(name = "chop")]
#[command(author, version, about = "Chophouse storefront client")]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    /// `Cookie` header to read the Django CSRF token from
    #[arg(long, global = true)]
    cookie: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List menu items
    Products {
        #[arg(short, long)]
        search: Option<String>,
        /// Category slug, or `all`
        #[arg(short, long)]
        category: Option<String>,
        #[arg(long)]
        min_price: Option<Decimal>,
        #[arg(long)]
        max_price: Option<Decimal>,
        /// `featured`, `price_low_to_high`, `price_high_to_low`, `name`, `newest`, `rating`
        #[arg(long, default_value = "featured")]
        sort: ProductSort,
        /// Mark items saved in this customer's wishlist
        #[arg(short, long)]
        email: Option<String>,
    },
    /// Show one menu item with its reviews
    Product { id: ProductId },
    /// Search the menu
    Search {
        query: String,
        #[arg(short, long)]
        category: Option<String>,
        #[arg(long)]
        min_price: Option<Decimal>,
        #[arg(long)]
        max_price: Option<Decimal>,
        #[arg(long)]
        min_rating: Option<u8>,
    },
    /// Items similar to a product
    Recommendations { id: ProductId },
    /// List catering services
    Catering,
    /// Show restaurant contact details
    Settings,
    /// List blog posts, or show one by slug
    Blog { slug: Option<String> },
    /// Reviews, ratings, and comments
    Review {
        #[command(subcommand)]
        action: ReviewAction,
    },
    /// Manage a customer's wishlist
    Wishlist {
        /// Customer email
        #[arg(short, long)]
        email: String,
        #[command(subcommand)]
        action: Option<WishlistAction>,
    },
    /// Subscribe to the newsletter
    Subscribe {
        #[arg(short, long)]
        email: String,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
    },
    /// Unsubscribe from the newsletter
    Unsubscribe {
        #[arg(short, long)]
        email: String,
    },
    /// Send a message to the restaurant
    Contact {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        phone: Option<String>,
        #[arg(short, long)]
        message: String,
    },
    /// Place and track orders
    Order {
        #[command(subcommand)]
        action: OrderAction,
    },
}

#[derive(Subcommand)]
enum ReviewAction {
    /// List reviews, ratings, and comments for a product
    List { product: ProductId },
    /// Submit a review
    Submit {
        #[arg(short, long)]
        product: ProductId,
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        email: String,
        /// Stars, 1-5
        #[arg(short, long)]
        rating: u8,
        #[arg(short, long)]
        comment: String,
    },
    /// Rate a product without a written review
    Rate {
        #[arg(short, long)]
        product: ProductId,
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        rating: u8,
    },
    /// Comment on a product
    Comment {
        #[arg(short, long)]
        product: ProductId,
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        comment: String,
    },
}

#[derive(Subcommand)]
enum WishlistAction {
    /// Save a product
    Add { product: ProductId },
    /// Remove a saved product
    Remove { product: ProductId },
}

#[derive(Subcommand)]
enum OrderAction {
    /// Check out the cart described in a JSON file
    Place {
        /// Path to the order file
        file: std::path::PathBuf,
        /// Stripe card token used if the backend opens a Stripe payment
        #[arg(long, default_value = "tok_visa")]
        card_token: String,
    },
    /// Show an order's status
    Status { id: OrderId },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing(json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "chophouse_storefront=info,chophouse_cli=info".into());

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter));

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_tracing(cli.json_logs);
            tracing::error!(error = %e, "Failed to load configuration");
            std::process::exit(1);
        }
    };

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry(&config);
    init_tracing(cli.json_logs);

    if let Err(e) = run(cli, config).await {
        e.report();
        tracing::error!("Command failed: {}", e.user_message());
        std::process::exit(1);
    }
}

async fn run(cli: Cli, mut config: StorefrontConfig) -> Result<(), CliError> {
    if let Some(header) = cli.cookie.as_deref() {
        config.csrf_token = commands::csrf_from_cookie(header);
    }
    let api = chophouse_storefront::ApiClient::new(&config)?;

    match cli.command {
        Commands::Products {
            search,
            category,
            min_price,
            max_price,
            sort,
            email,
        } => {
            commands::catalog::products(
                &api,
                commands::catalog::ProductFilters {
                    search,
                    category,
                    min_price,
                    max_price,
                    sort,
                    email,
                },
            )
            .await?;
        }
        Commands::Product { id } => commands::catalog::product(&api, id).await?,
        Commands::Search {
            query,
            category,
            min_price,
            max_price,
            min_rating,
        } => {
            commands::catalog::search(
                &api,
                chophouse_storefront::api::catalog::SearchQuery {
                    q: query,
                    min_price,
                    max_price,
                    category,
                    min_rating,
                },
            )
            .await?;
        }
        Commands::Recommendations { id } => commands::catalog::recommendations(&api, id).await?,
        Commands::Catering => commands::catalog::catering(&api).await?,
        Commands::Settings => commands::catalog::settings(&api).await?,
        Commands::Blog { slug } => commands::engage::blog(&api, slug.as_deref()).await?,
        Commands::Review { action } => match action {
            ReviewAction::List { product } => commands::engage::reviews(&api, product).await?,
            ReviewAction::Submit {
                product,
                name,
                email,
                rating,
                comment,
            } => {
                commands::engage::submit_review(&api, product, &name, &email, rating, &comment)
                    .await?;
            }
            ReviewAction::Rate {
                product,
                email,
                rating,
            } => commands::engage::rate(&api, product, &email, rating).await?,
            ReviewAction::Comment {
                product,
                email,
                comment,
            } => commands::engage::comment(&api, product, &email, &comment).await?,
        },
        Commands::Wishlist { email, action } => match action {
            None => commands::engage::wishlist(&api, &email).await?,
            Some(WishlistAction::Add { product }) => {
                commands::engage::wishlist_add(&api, &email, product).await?;
            }
            Some(WishlistAction::Remove { product }) => {
                commands::engage::wishlist_remove(&api, &email, product).await?;
            }
        },
        Commands::Subscribe {
            email,
            first_name,
            last_name,
        } => {
            commands::engage::subscribe(&api, &email, first_name.as_deref(), last_name.as_deref())
                .await?;
        }
        Commands::Unsubscribe { email } => commands::engage::unsubscribe(&api, &email).await?,
        Commands::Contact {
            first_name,
            last_name,
            email,
            phone,
            message,
        } => {
            commands::engage::contact(
                &api,
                &first_name,
                &last_name,
                &email,
                phone.as_deref(),
                &message,
            )
            .await?;
        }
        Commands::Order { action } => match action {
            OrderAction::Place { file, card_token } => {
                commands::order::place(&api, &config, &file, card_token).await?;
            }
            OrderAction::Status { id } => commands::order::status(&api, id).await?,
        },
    }
    Ok(())
}
