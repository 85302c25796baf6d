use env_logger::Env;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // a missing .env is fine, everything has a default
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    fitting_room_cli::run().await
}
