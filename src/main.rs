use clap::Parser;
use scan_history::Args;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    scan_history::run(args).await
}
