use anyhow::Result;
use datum::cli;

mod app;
mod logging;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::parse();
    app::run(args).await
}
