use clap::{Parser, Subcommand};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

#[derive(Parser)]
#[command(name = "tap-cli")]
#[command(about = "Client for the Linkerd tap proxy", long_about = None)]
struct Cli {
    /// Base URL of the tap proxy.
    #[arg(short, long, default_value = "http://localhost:7007")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check proxy liveness
    Health,
    /// List the pods of a deployment
    Pods { namespace: String, deployment: String },
    /// Stream live tap events for a deployment until closed or Ctrl+C
    Tap { namespace: String, resource: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let base = cli.url.trim_end_matches('/').to_string();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Health => {
            let res = client.get(format!("{}/health", base)).send().await?;
            print_response(res).await?;
        }
        Commands::Pods { namespace, deployment } => {
            let res = client
                .get(format!("{}/deployment/{}/{}", base, namespace, deployment))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Tap { namespace, resource } => {
            stream_tap(&base, &namespace, &resource).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: proxy returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

async fn stream_tap(
    base: &str,
    namespace: &str,
    resource: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let ws_url = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{}/tap", rest)
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{}/tap", rest)
    } else {
        format!("{}/tap", base)
    };

    let (socket, _) = connect_async(ws_url.as_str()).await?;
    let (mut tx, mut rx) = socket.split();

    let subscription = json!({ "resource": resource, "namespace": namespace });
    tx.send(Message::text(subscription.to_string())).await?;

    loop {
        tokio::select! {
            message = rx.next() => match message {
                Some(Ok(Message::Text(text))) => println!("{}", text.as_str()),
                Some(Ok(Message::Binary(data))) => println!("{}", String::from_utf8_lossy(&data)),
                Some(Ok(Message::Close(frame))) => {
                    if let Some(frame) = frame {
                        eprintln!("Closed: {} {}", u16::from(frame.code), frame.reason.as_str());
                    }
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                let _ = tx.close().await;
                break;
            }
        }
    }
    Ok(())
}
