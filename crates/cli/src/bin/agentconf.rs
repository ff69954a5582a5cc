use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    agentconf_cli::main_entry().await
}
