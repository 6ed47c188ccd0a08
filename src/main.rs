mod cli;

use log::info;
use vecviz::{Config, Walkthrough};

#[tokio::main(flavor = "current_thread")]
async fn main() -> vecviz::Result<()> {
    // read .env
    dotenv::dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let config = Config::from_env()?;
    info!("config: top_k = {}, pace = {}, color = {}", config.top_k, config.pacing.factor(), config.color);

    let args: Vec<String> = std::env::args().collect();

    if args.len() == 1 {
        let mut walkthrough = Walkthrough::from_config(&config);
        cli::run_repl(&mut walkthrough, &config).await?;
    } else if args[1] == "demo" {
        cli::run_demo(&config).await?;
    } else {
        cli::run_single_command(&args, &config).await;
    }

    Ok(())
}
