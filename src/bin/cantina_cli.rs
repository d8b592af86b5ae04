use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rust_decimal_macros::dec;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::info;

use cantina_api::{
    config::{self, AppConfig},
    db::{self, DbPool},
    events::EventSender,
    services::{
        categories::{CategoryService, CreateCategoryRequest},
        combos::{ComboItemInput, ComboService, ComboSlotInput, SaveComboRequest},
        products::{CreateProductRequest, ProductService},
        tenants::{CreateTenantRequest, TenantService},
    },
};

#[derive(Parser, Debug)]
#[command(name = "cantina-cli", version, about = "Operator tooling for the cantina API")]
struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Create a demo tenant with a small menu and one combo
    Seed(SeedArgs),
}

#[derive(Args, Debug)]
struct SeedArgs {
    #[arg(long, default_value = "Demo Cantina")]
    tenant_name: String,
    /// Opening stock for every seeded product
    #[arg(long, default_value_t = 50)]
    stock: i32,
}

#[derive(Debug, Serialize)]
struct SeedSummary {
    tenant_id: uuid::Uuid,
    tenant_name: String,
    products: usize,
    combo_product_id: uuid::Uuid,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config().context("failed to load configuration")?;
    config::init_tracing(cfg.log_level(), cfg.log_json);

    let pool = Arc::new(
        db::establish_connection_from_app_config(&cfg)
            .await
            .context("failed to connect to the database")?,
    );

    match cli.command {
        Commands::Migrate => {
            db::run_migrations(&pool)
                .await
                .context("failed to run migrations")?;
            if cli.json {
                println!("{}", serde_json::json!({ "migrated": true }));
            } else {
                println!("Migrations applied");
            }
        }
        Commands::Seed(args) => {
            db::run_migrations(&pool)
                .await
                .context("failed to run migrations")?;
            let summary = seed(pool, &cfg, args).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!(
                    "Seeded tenant '{}' ({}) with {} products; combo {}",
                    summary.tenant_name, summary.tenant_id, summary.products, summary.combo_product_id
                );
            }
        }
    }

    Ok(())
}

async fn seed(pool: Arc<DbPool>, cfg: &AppConfig, args: SeedArgs) -> Result<SeedSummary> {
    // Events are not consumed by the CLI; the receiver is kept alive so publishing succeeds.
    let (tx, _rx) = mpsc::channel(cfg.event_channel_capacity);
    let events = Arc::new(EventSender::new(tx));

    let tenants = TenantService::new(pool.clone());
    let categories = CategoryService::new(pool.clone());
    let products = ProductService::new(pool.clone(), Some(events.clone()), false);
    let combos = ComboService::new(pool, Some(events));

    let tenant = tenants
        .create_tenant(CreateTenantRequest {
            name: args.tenant_name.clone(),
            document: None,
            phone: None,
            address: None,
        })
        .await
        .context("failed to create tenant")?;
    info!(tenant_id = %tenant.id, "Seeding demo tenant");

    let snacks = categories
        .create_category(
            tenant.id,
            CreateCategoryRequest {
                name: "Snacks".into(),
                emoji: Some("🍔".into()),
                description: None,
            },
        )
        .await?;
    let drinks = categories
        .create_category(
            tenant.id,
            CreateCategoryRequest {
                name: "Drinks".into(),
                emoji: Some("🥤".into()),
                description: None,
            },
        )
        .await?;

    let menu = [
        ("Cheeseburger", dec!(18.00), snacks.id, 12),
        ("Fries", dec!(9.50), snacks.id, 6),
        ("Cola", dec!(6.00), drinks.id, 0),
        ("Orange Juice", dec!(8.00), drinks.id, 3),
    ];
    let mut created = Vec::with_capacity(menu.len());
    for (name, price, category_id, prep) in menu {
        let product = products
            .create_product(
                tenant.id,
                CreateProductRequest {
                    name: name.to_string(),
                    description: None,
                    price,
                    category_id: Some(category_id),
                    prep_time_minutes: Some(prep),
                    stock_quantity: args.stock,
                    is_active: Some(true),
                },
            )
            .await
            .with_context(|| format!("failed to create product {name}"))?;
        created.push(product);
    }

    let combo_category = categories
        .list_categories(tenant.id, true)
        .await?
        .into_iter()
        .find(|c| c.is_system)
        .map(|c| c.id);
    let combo = products
        .create_product(
            tenant.id,
            CreateProductRequest {
                name: "Burger Combo".into(),
                description: Some("Burger, side and a drink".into()),
                price: dec!(29.90),
                category_id: combo_category,
                prep_time_minutes: Some(15),
                stock_quantity: 0,
                is_active: Some(true),
            },
        )
        .await?;

    let item = |index: usize| ComboItemInput {
        product_id: created[index].id,
        debit_quantity: 1,
    };
    combos
        .save_config(
            tenant.id,
            combo.id,
            SaveComboRequest {
                slots: vec![
                    ComboSlotInput {
                        name: "Burger".into(),
                        emoji: Some("🍔".into()),
                        position: Some(0),
                        items: vec![item(0)],
                    },
                    ComboSlotInput {
                        name: "Side".into(),
                        emoji: Some("🍟".into()),
                        position: Some(1),
                        items: vec![item(1)],
                    },
                    ComboSlotInput {
                        name: "Drink".into(),
                        emoji: Some("🥤".into()),
                        position: Some(2),
                        items: vec![item(2), item(3)],
                    },
                ],
            },
        )
        .await
        .context("failed to configure the demo combo")?;

    Ok(SeedSummary {
        tenant_id: tenant.id,
        tenant_name: tenant.name,
        products: created.len() + 1,
        combo_product_id: combo.id,
    })
}
