use clap::Parser;
use client::input::IdleInput;
use client::network::ClientSession;
use log::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Host address to join
    #[arg(short = 's', long, default_value = "127.0.0.1:9876")]
    server: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    info!("Starting client...");
    info!("Connecting to: {}", args.server);

    // Headless reference client: joins, idles in place and mirrors the
    // session until the host disconnects us. Frontends embed
    // ClientSession with their own input source instead.
    let mut session = ClientSession::connect(&args.server, Box::new(IdleInput)).await?;
    session.run().await?;

    Ok(())
}
