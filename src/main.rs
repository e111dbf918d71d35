#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().init();
    let config = billed_server::config::Config::from_env()?;
    billed_server::web::start_web_server(config).await
}
