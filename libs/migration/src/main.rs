//! Schema CLI for the `cloud_plans` store.
//!
//! `DATABASE_URL=... cargo run -p migration -- up` applies pending migrations,
//! `down`, `status` and `fresh` behave as in `sea-orm-cli migrate`.

use migration::Migrator;
use sea_orm_migration::cli;

#[tokio::main]
async fn main() {
    cli::run_cli(Migrator).await;
}
