use migration::Migrator;
use sea_orm_migration::cli;

/// Schedule schema CLI: `up`, `down`, `status`, `fresh`, ...
#[tokio::main]
async fn main() {
    cli::run_cli(Migrator).await;
}
