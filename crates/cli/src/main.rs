//! Adroit Shop CLI - drive the storefront cart from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Show the cart (guest or account, depending on the stored login)
//! adroit-cli cart show
//!
//! # Add two of product 7 in size L
//! adroit-cli cart add 7 -q 2 -s L --name "Door Sensor" --price 19.50
//!
//! # Change a quantity by a delta
//! adroit-cli cart update 7 -- -1
//!
//! # Log in, merging the guest cart into the account cart
//! adroit-cli session login <token>
//! ```
//!
//! # Commands
//!
//! - `cart` - Show and change the cart
//! - `session` - Log in and out
//! - `compare` - Manage the product comparison list
//!
//! Configuration comes from the environment; see `adroit_storefront::config`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use adroit_storefront::ShopSession;
use adroit_storefront::config::StorefrontConfig;
use adroit_storefront::storage::FileStorage;
use adroit_storefront::telemetry;
use clap::{Parser, Subcommand};

mod commands;

use commands::CliError;

#[derive(Parser)]
#[command(name = "adroit-cli")]
#[command(author, version, about = "Adroit Shop cart tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show and change the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Log in and out
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
    /// Manage the product comparison list
    Compare {
        #[command(subcommand)]
        action: CompareAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Print every line and the total
    Show,
    /// Add a product
    Add {
        /// Catalog product ID
        product: String,

        /// Quantity to add
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,

        /// Size variant
        #[arg(short, long, default_value = "M")]
        size: String,

        /// Display name kept on guest lines
        #[arg(long)]
        name: Option<String>,

        /// Unit price kept on guest lines
        #[arg(long)]
        price: Option<String>,
    },
    /// Change a product's quantity by a delta
    Update {
        /// Catalog product ID
        product: String,

        /// Amount to add (negative to reduce)
        #[arg(allow_negative_numbers = true)]
        delta: i64,
    },
    /// Remove a product
    Remove {
        /// Catalog product ID
        product: String,
    },
    /// Remove everything
    Clear,
}

#[derive(Subcommand)]
enum SessionAction {
    /// Store a bearer token and merge the guest cart into the account
    Login {
        /// Bearer token issued by the shop
        token: String,
    },
    /// Forget the token and return to a guest cart
    Logout,
    /// Show whether the session is guest or account
    Status,
}

#[derive(Subcommand)]
enum CompareAction {
    /// Add a catalog product
    Add {
        /// Catalog product ID
        product: String,
    },
    /// Remove a product
    Remove {
        /// Product ID as listed
        product: String,
    },
    /// List products
    List,
    /// Remove every product
    Clear,
}

#[tokio::main]
async fn main() {
    let config = StorefrontConfig::from_env();

    // Sentry before the subscriber so the tracing layer has a client
    let _sentry_guard = config.as_ref().ok().and_then(telemetry::init_sentry);
    telemetry::init();

    let result = match config {
        Ok(config) => run(Cli::parse(), &config).await,
        Err(e) => Err(CliError::from(e)),
    };

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: &StorefrontConfig) -> Result<(), CliError> {
    let storage = Arc::new(FileStorage::new(config.storage_dir.clone()));
    let mut session = ShopSession::start(config, storage).await?;

    match cli.command {
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&session),
            CartAction::Add {
                product,
                quantity,
                size,
                name,
                price,
            } => {
                commands::cart::add(&mut session, product, quantity, &size, name, price).await?;
            }
            CartAction::Update { product, delta } => {
                commands::cart::update(&mut session, &product, delta).await?;
            }
            CartAction::Remove { product } => commands::cart::remove(&mut session, &product).await?,
            CartAction::Clear => commands::cart::clear(&mut session).await,
        },
        Commands::Session { action } => match action {
            SessionAction::Login { token } => commands::session::login(&mut session, token).await?,
            SessionAction::Logout => commands::session::logout(&mut session).await?,
            SessionAction::Status => commands::session::status(&session),
        },
        Commands::Compare { action } => match action {
            CompareAction::Add { product } => commands::compare::add(&session, &product).await?,
            CompareAction::Remove { product } => commands::compare::remove(&session, product)?,
            CompareAction::List => commands::compare::list(&session)?,
            CompareAction::Clear => commands::compare::clear(&session)?,
        },
    }
    Ok(())
}
