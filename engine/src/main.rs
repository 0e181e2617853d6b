use supermine_common::protocol::{ClientMessage, ServerMessage};
use supermine_engine::{config::Config, scenario::read_scenario, session::Session};
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env();
    let params = read_scenario(&config.scenario_dir, &config.scenario_id)?;
    info!(
        "Loaded scenario {} from {}",
        config.scenario_id,
        config.scenario_dir.display()
    );

    let session = Session::create(params, &config);
    let mut events = session.lock().await.subscribe();

    let writer = tokio::spawn(async move {
        let mut stdout = io::stdout();
        while let Some(message) = events.recv().await {
            if let Err(e) = write_message(&mut stdout, &message).await {
                warn!("Failed to write message: {}", e);
                break;
            }
        }
    });

    let mut lines = BufReader::new(io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<ClientMessage>(&line) {
            Ok(message) => session.lock().await.handle(message),
            Err(e) => warn!("Ignoring unparsable message {:?}: {}", line, e),
        }
    }

    info!("Input closed, shutting down");
    session.lock().await.unsubscribe();
    writer.await?;
    Ok(())
}

async fn write_message(stdout: &mut io::Stdout, message: &ServerMessage) -> Result<()> {
    let mut text = serde_json::to_string(message)?;
    text.push('\n');
    stdout.write_all(text.as_bytes()).await?;
    stdout.flush().await?;
    Ok(())
}
