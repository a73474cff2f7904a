//! Poll service entry point.
use pollserver::config::PollServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = PollServerConfig::from_env_or_yaml()?;
    pollserver::run_with_shutdown(config, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
}
