//! Database-backed flow tests for the market core.
//!
//! These run against a real `PostgreSQL` instance. Set
//! `MARKET_TEST_DATABASE_URL` (or `DATABASE_URL`) to enable them; without it
//! each test skips. Migrations are applied once per target database.

#![allow(clippy::unwrap_used, clippy::print_stderr)]

use secrecy::SecretString;
use sqlx::PgPool;

use market::db::users::BudgetError;
use market::db::{self, ItemRepository, RepositoryError, UserRepository};
use market::models::{Identity, Item, User};
use market::services::auth::AuthError;
use market::services::trade::TradeError;
use market::services::{AuthService, SessionService, TradeService};
use market_core::{ItemId, ItemName, UserId, Username};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Route service logs through the test harness. Repeated calls are no-ops.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

async fn try_pool() -> Option<PgPool> {
    init_tracing();

    let url = std::env::var("MARKET_TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()?;

    let pool = db::create_pool(&SecretString::from(url))
        .await
        .expect("database configured but unreachable");
    MIGRATOR.run(&pool).await.expect("migrations failed");
    Some(pool)
}

macro_rules! require_db {
    () => {
        match try_pool().await {
            Some(pool) => pool,
            None => {
                eprintln!("skipping: set MARKET_TEST_DATABASE_URL to run database tests");
                return;
            }
        }
    };
}

/// Random suffix so tests can re-run against the same database.
fn unique(prefix: &str) -> String {
    format!("{prefix}{:08x}", rand::random::<u32>())
}

fn barcode() -> String {
    format!("{:012}", rand::random::<u32>())
}

async fn register_user(pool: &PgPool, prefix: &str) -> User {
    let auth = AuthService::new(pool);
    let name = unique(prefix);
    auth.register(&name, &format!("{name}@example.com"), "secret-pass")
        .await
        .expect("registration failed")
}

async fn seed_item(pool: &PgPool, prefix: &str, price: i64) -> ItemName {
    let items = ItemRepository::new(pool);
    let name = ItemName::parse(&unique(prefix)).unwrap();
    items
        .create(&name, price, &barcode(), "a test item")
        .await
        .expect("item seeding failed");
    name
}

#[tokio::test]
async fn register_then_login() {
    let pool = require_db!();
    let auth = AuthService::new(&pool);

    let name = unique("alice");
    let user = auth
        .register(&name, &format!("{name}@example.com"), "secret-pass")
        .await
        .unwrap();
    assert_eq!(user.budget, User::STARTING_BUDGET);

    let logged_in = auth.verify_credentials(&name, "secret-pass").await.unwrap();
    assert_eq!(logged_in.id, user.id);
}

#[tokio::test]
async fn wrong_password_and_unknown_user_are_indistinguishable() {
    let pool = require_db!();
    let auth = AuthService::new(&pool);

    let name = unique("bob");
    auth.register(&name, &format!("{name}@example.com"), "secret-pass")
        .await
        .unwrap();

    let wrong_password = auth.verify_credentials(&name, "wrong-pass").await;
    let unknown_user = auth
        .verify_credentials(&unique("nobody"), "secret-pass")
        .await;

    assert!(matches!(wrong_password, Err(AuthError::InvalidCredentials)));
    assert!(matches!(unknown_user, Err(AuthError::InvalidCredentials)));
}

#[tokio::test]
async fn duplicate_registration_is_rejected() {
    let pool = require_db!();
    let auth = AuthService::new(&pool);
    let users = UserRepository::new(&pool);

    let name = unique("carol");
    let email = format!("{name}@example.com");
    auth.register(&name, &email, "secret-pass").await.unwrap();

    let same_name = auth
        .register(&name, &format!("other-{email}"), "secret-pass")
        .await;
    assert!(matches!(same_name, Err(AuthError::DuplicateName)));

    let same_email = auth.register(&unique("carol"), &email, "secret-pass").await;
    assert!(matches!(same_email, Err(AuthError::DuplicateEmail)));

    // Only the original record exists.
    let found = users
        .get_by_name(&Username::parse(&name).unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.email.as_str(), email);
}

#[tokio::test]
async fn session_identity_survives_round_trip() {
    let pool = require_db!();
    let sessions = SessionService::new(
        SecretString::from("kQ9vR2mX8pL4nW7jC3hF6dT1bY5gZ0aU"),
        14,
    );
    let auth = AuthService::new(&pool);

    let user = register_user(&pool, "dave").await;
    let token = sessions.establish(user.id).unwrap();

    let Identity::Authenticated(resolved_id) = sessions.resolve(&token) else {
        panic!("token did not resolve");
    };
    assert_eq!(resolved_id, user.id);

    let reloaded = auth.get_user(resolved_id).await.unwrap();
    assert_eq!(reloaded.name, user.name);
}

#[tokio::test]
async fn purchase_then_sell_restores_budget() {
    let pool = require_db!();
    let trade = TradeService::new(&pool);
    let items = ItemRepository::new(&pool);

    let user = register_user(&pool, "erin").await;
    let item_name = seed_item(&pool, "Widget", 300).await;

    // Buy: budget drops by the price, ownership moves to the buyer.
    let bought = trade.purchase(user.id, &item_name).await.unwrap();
    assert_eq!(bought.user.budget, 700);
    assert_eq!(bought.item.owner, Some(user.id));

    let stored = items.get_by_name(&item_name).await.unwrap().unwrap();
    assert_eq!(stored.owner, Some(user.id));

    // Buying an owned item fails, even for its owner.
    let again = trade.purchase(user.id, &item_name).await;
    assert!(matches!(again, Err(TradeError::AlreadyOwned)));

    // Sell: the round trip restores the original state.
    let sold = trade.sell(user.id, &item_name).await.unwrap();
    assert_eq!(sold.user.budget, 1000);
    assert_eq!(sold.item.owner, None);

    let stored = items.get_by_name(&item_name).await.unwrap().unwrap();
    assert_eq!(stored.owner, None);
}

#[tokio::test]
async fn unaffordable_purchase_mutates_nothing() {
    let pool = require_db!();
    let trade = TradeService::new(&pool);
    let users = UserRepository::new(&pool);
    let items = ItemRepository::new(&pool);

    let user = register_user(&pool, "frank").await;
    let item_name = seed_item(&pool, "Yacht", 1500).await;

    let result = trade.purchase(user.id, &item_name).await;
    assert!(matches!(result, Err(TradeError::InsufficientFunds)));

    let unchanged = users.get_by_id(user.id).await.unwrap().unwrap();
    assert_eq!(unchanged.budget, 1000);
    let item = items.get_by_name(&item_name).await.unwrap().unwrap();
    assert_eq!(item.owner, None);
}

#[tokio::test]
async fn selling_an_item_you_do_not_own_fails() {
    let pool = require_db!();
    let trade = TradeService::new(&pool);

    let owner = register_user(&pool, "gina").await;
    let interloper = register_user(&pool, "hank").await;
    let item_name = seed_item(&pool, "Lamp", 50).await;

    trade.purchase(owner.id, &item_name).await.unwrap();

    let result = trade.sell(interloper.id, &item_name).await;
    assert!(matches!(result, Err(TradeError::NotOwner)));
}

#[tokio::test]
async fn missing_item_reports_not_found() {
    let pool = require_db!();
    let trade = TradeService::new(&pool);

    let user = register_user(&pool, "ivan").await;
    let ghost = ItemName::parse(&unique("Ghost")).unwrap();

    assert!(matches!(
        trade.purchase(user.id, &ghost).await,
        Err(TradeError::ItemNotFound)
    ));
    assert!(matches!(
        trade.sell(user.id, &ghost).await,
        Err(TradeError::ItemNotFound)
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_purchases_have_exactly_one_winner() {
    let pool = require_db!();

    let item_name = seed_item(&pool, "Rare", 100).await;

    let mut buyers = Vec::new();
    for _ in 0..8 {
        buyers.push(register_user(&pool, "racer").await);
    }

    let mut tasks = tokio::task::JoinSet::new();
    for buyer in buyers {
        let pool = pool.clone();
        let item_name = item_name.clone();
        tasks.spawn(async move {
            TradeService::new(&pool)
                .purchase(buyer.id, &item_name)
                .await
        });
    }

    let mut wins = 0;
    let mut already_owned = 0;
    while let Some(result) = tasks.join_next().await {
        match result.unwrap() {
            Ok(_) => wins += 1,
            Err(TradeError::AlreadyOwned) => already_owned += 1,
            Err(other) => panic!("unexpected trade error: {other}"),
        }
    }

    assert_eq!(wins, 1);
    assert_eq!(already_owned, 7);
}

#[tokio::test]
async fn budget_adjustment_is_conditional() {
    let pool = require_db!();

    let user = register_user(&pool, "judy").await;
    let mut conn = pool.acquire().await.unwrap();

    // A credit and an affordable debit both apply.
    let (budget, _) = UserRepository::adjust_budget(&mut conn, user.id, 500)
        .await
        .unwrap();
    assert_eq!(budget, 1500);

    // An overdraw is rejected without mutating the row.
    let overdraw = UserRepository::adjust_budget(&mut conn, user.id, -2000).await;
    assert!(matches!(overdraw, Err(BudgetError::InsufficientFunds)));

    let (budget, _) = UserRepository::adjust_budget(&mut conn, user.id, -1500)
        .await
        .unwrap();
    assert_eq!(budget, 0);

    let missing = UserRepository::adjust_budget(&mut conn, UserId::new(i32::MAX), 1).await;
    assert!(matches!(missing, Err(BudgetError::UserNotFound)));
}

#[tokio::test]
async fn unowned_listing_tracks_ownership() {
    let pool = require_db!();
    let trade = TradeService::new(&pool);
    let items = ItemRepository::new(&pool);

    let user = register_user(&pool, "kate").await;
    let for_sale = seed_item(&pool, "Chair", 10).await;
    let to_buy = seed_item(&pool, "Table", 20).await;

    trade.purchase(user.id, &to_buy).await.unwrap();

    let listing = items.list_unowned().await.unwrap();
    assert!(listing.iter().any(|i| i.name == for_sale));
    assert!(listing.iter().all(|i| i.name != to_buy));
    assert!(listing.iter().all(Item::is_unowned));
}

#[tokio::test]
async fn set_owner_on_missing_item_is_not_found() {
    let pool = require_db!();
    let items = ItemRepository::new(&pool);

    let result = items.set_owner(ItemId::new(i32::MAX), None).await;
    assert!(matches!(result, Err(RepositoryError::NotFound)));
}
