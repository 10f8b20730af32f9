use anyhow::Result;
use pilot::ux;

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = pilot::cli::run().await {
        ux::present_error(e);
        std::process::exit(1);
    }
    Ok(())
}
