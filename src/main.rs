use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use log::info;

use novel_shelf::guard::{navigate, GuardOutcome};
use novel_shelf::models::SignInForm;
use novel_shelf::notify::Level;
use novel_shelf::storage::FileStore;
use novel_shelf::{Config, Storefront};

#[derive(Parser)]
#[command(name = "novel-shelf", about = "Command-line storefront for the bookstore API")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in and persist the session
    Login { email: String, password: String },
    /// Forget the persisted session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// List the catalog
    Browse,
    /// Show the cart
    Cart,
    /// Show the wishlist
    Wishlist,
    /// List categories
    Categories,
    /// Resolve a route through the guards
    Open { path: String },
}

fn print_notifications(shop: &Storefront) {
    for notification in shop.notifications().drain() {
        match notification.level {
            Level::Success => println!("{}", notification.message),
            Level::Error => eprintln!("{}", notification.message),
        }
    }
}

async fn run(shop: &Storefront, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Login { email, password } => {
            let form = SignInForm { email, password };
            let next = shop.sign_in(&form, None).await?;
            info!("next page: {}", next);
        }
        Command::Logout => shop.sign_out(),
        Command::Whoami => match shop.session().user() {
            Some(user) => {
                let role = user.role.as_deref().unwrap_or("user");
                println!("{} <{}> ({})", user.name, user.email, role);
            }
            None => println!("not signed in"),
        },
        Command::Browse => {
            for product in shop.products().await? {
                let marker = if shop.is_in_cart(&product.id) { "*" } else { " " };
                println!(
                    "{} {} | {} by {} | ${:.2} | {} left",
                    marker, product.id, product.title, product.author, product.price, product.quantity
                );
            }
        }
        Command::Cart => {
            let page = shop.cart_page();
            for item in page.items() {
                println!(
                    "{} | {} x{} | ${:.2}",
                    item.product_id, item.title, item.quantity, item.sub_total
                );
            }
            println!(
                "{} item(s), total ${:.2}",
                page.total_quantity(),
                page.total_price()
            );
        }
        Command::Wishlist => {
            for item in shop.wishlist().items() {
                println!("{} | {} by {}", item.product_id, item.title, item.author);
            }
        }
        Command::Categories => {
            for category in shop.categories().categories() {
                println!("{} | {}", category.id, category.name);
            }
        }
        Command::Open { path } => {
            let navigation = navigate(&shop.session().snapshot(), &path);
            match navigation.outcome {
                GuardOutcome::Loading => println!("loading"),
                GuardOutcome::Render => println!("{:?}", navigation.route),
                GuardOutcome::Redirect { to, from } => match from {
                    Some(from) => println!("redirect to {} (from {})", to, from),
                    None => println!("redirect to {}", to),
                },
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    let config = Config::from_env();
    let store = FileStore::open(&config.session_store_path);
    let shop = Storefront::new(&config, Arc::new(store)).context("failed to build API client")?;
    shop.start().await;

    let result = run(&shop, cli.command).await;
    print_notifications(&shop);
    result
}
