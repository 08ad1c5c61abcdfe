use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use sketchparty_protocol::*;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// Terminal client for poking at a sketchparty server by hand.
#[derive(Parser, Debug)]
#[command(name = "cli_client")]
struct Args {
    /// Websocket endpoint of the server
    #[arg(long, default_value = "ws://127.0.0.1:8000/ws")]
    url: String,
    /// Identity to reclaim; a fresh one is assigned when omitted
    #[arg(long)]
    id: Option<String>,
}

/// What a typed line turns into.
enum Outgoing {
    Event(ClientToServer),
    Drawing(Vec<u8>),
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    println!("🎨 Sketchparty CLI Client");
    println!("=========================");

    println!("🔗 Connecting to {}...", args.url);
    let (ws_stream, _) = connect_async(args.url.as_str()).await?;
    println!("✅ Connected to server!");

    let (mut write, mut read) = ws_stream.split();

    let hello = serde_json::to_string(&ClientToServer::AssignId(args.id.clone()))?;
    write.send(Message::Text(hello)).await?;

    tokio::spawn(async move {
        while let Some(msg) = read.next().await {
            match msg {
                Ok(Message::Text(text)) => match serde_json::from_str::<ServerToClient>(&text) {
                    Ok(server_msg) => handle_server_message(server_msg),
                    Err(_) => println!("📨 Raw: {}", text),
                },
                Ok(Message::Close(_)) => {
                    println!("🔌 Connection closed by server");
                    break;
                }
                Err(e) => {
                    println!("❌ WebSocket error: {}", e);
                    break;
                }
                _ => {}
            }
        }
    });

    print_help();

    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();

    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "quit" {
            break;
        }
        if line == "help" {
            print_help();
            continue;
        }

        match parse_command(line).await {
            Some(Outgoing::Event(cmd)) => {
                let json = serde_json::to_string(&cmd)?;
                write.send(Message::Text(json)).await?;
            }
            Some(Outgoing::Drawing(bytes)) => {
                println!("🖼️  Uploading {} bytes", bytes.len());
                write.send(Message::Binary(bytes)).await?;
            }
            None => println!("❓ Unknown command: {}", line),
        }
    }

    let _ = write.send(Message::Close(None)).await;
    println!("👋 Goodbye!");
    Ok(())
}

fn print_help() {
    println!("\n📋 Commands available:");
    println!("  id [id]               - Ask for (or reclaim) an identity");
    println!("  create                - Create a lobby and become its host");
    println!("  join <code> <name>    - Join a lobby");
    println!("  start                 - Host: start the game");
    println!("  prompt <text>         - Submit your prompt");
    println!("  handout               - Host: hand out prompts");
    println!("  draw                  - Host: start drawing");
    println!("  upload <path>         - Send a drawing file");
    println!("  enddraw               - Host: end drawing");
    println!("  present               - Host: start presenting");
    println!("  presenter <id>        - Host: pick the presenter");
    println!("  vote <id> <score>     - Vote on a presentation");
    println!("  done                  - Host: finish the game");
    println!("  react <emoji>         - Send a reaction to the host screen");
    println!("  cancel                - Cancel the game");
    println!("  quit                  - Exit");
    println!("\nType commands and press Enter:");
}

fn handle_server_message(msg: ServerToClient) {
    match msg {
        ServerToClient::AssignId(id) => println!("👋 Your ID: {}", id),
        ServerToClient::LobbyCreated(code) => println!("🏠 Lobby created: {}", code),
        ServerToClient::JoinedLobby(code) => println!("🚪 Joined lobby {}", code),
        ServerToClient::Error(message) => println!("❌ Error: {}", message),
        ServerToClient::PlayersUpdate(players) => {
            println!("👥 Players ({}):", players.len());
            for p in players {
                let wrote = if p.prompt_written.is_some() { " ✍️" } else { "" };
                println!("  {} [{}]{}", p.username, p.id, wrote);
            }
        }
        ServerToClient::GameState(phase) => println!("🕹️  Phase: {}", phase),
        ServerToClient::WritingSubmitted => println!("✍️  Prompt submitted"),
        ServerToClient::FinishWriting(n) => println!("✅ All {} prompts are in", n),
        ServerToClient::GivePrompt(prompt) => println!("🎯 Draw this: {}", prompt),
        ServerToClient::PlayerData(data) => {
            println!("\n🖼️  === PRESENTATIONS ===");
            for (id, p) in data {
                let size = p.drawing_data.as_ref().map(|d| d.len()).unwrap_or(0);
                println!(
                    "  {} [{}] prompt={:?} drawing={} b64 chars",
                    p.username, id, p.prompt, size
                );
            }
        }
        ServerToClient::YouArePresenting(_) => println!("🎤 You are presenting!"),
        ServerToClient::CurrentPresenter(p) => println!("🎤 Now presenting: {}", p.id),
        ServerToClient::Voted => println!("🗳️  Vote received"),
        ServerToClient::GameEnd(scores) => {
            println!("\n🏆 === FINAL SCORES ===");
            for s in scores {
                println!("  {}: {}", s.username, s.score);
            }
        }
        ServerToClient::Reaction(r) => println!("{} from {}", r.emoji, r.username),
        ServerToClient::Disconnected(reason) => println!("🔌 {}", reason),
        other => println!("📨 Server message: {:?}", other),
    }
}

async fn parse_command(input: &str) -> Option<Outgoing> {
    let parts: Vec<&str> = input.split_whitespace().collect();
    let (cmd, rest) = parts.split_first()?;
    let text = rest.join(" ");

    let event = match cmd.to_lowercase().as_str() {
        "id" => ClientToServer::AssignId(rest.first().map(|s| s.to_string())),
        "create" => ClientToServer::CreateLobby,
        "join" if rest.len() >= 2 => ClientToServer::JoinLobby(JoinLobby {
            lobby_code: rest[0].to_string(),
            username: rest[1..].join(" "),
        }),
        "start" => ClientToServer::StartGame,
        "prompt" if !text.is_empty() => ClientToServer::SubmitPrompt(SubmitPrompt { prompt: text }),
        "handout" => ClientToServer::HandOutPrompts,
        "draw" => ClientToServer::StartDrawing,
        "upload" => {
            let path = rest.first()?;
            return match tokio::fs::read(path).await {
                Ok(bytes) => Some(Outgoing::Drawing(bytes)),
                Err(e) => {
                    println!("❌ Could not read {}: {}", path, e);
                    None
                }
            };
        }
        "enddraw" => ClientToServer::EndDrawing,
        "present" => ClientToServer::StartPresenting,
        "presenter" => ClientToServer::SetPresenter(PresenterRef {
            id: PlayerId::from(*rest.first()?),
        }),
        "vote" => ClientToServer::VotePresentation(Vote {
            id: PlayerId::from(*rest.first()?),
            score: rest.get(1)?.parse().ok()?,
        }),
        "done" => ClientToServer::DonePresenting,
        "react" => ClientToServer::SendReaction(rest.first()?.to_string()),
        "cancel" => ClientToServer::CancelGame(serde_json::Value::Null),
        _ => return None,
    };
    Some(Outgoing::Event(event))
}
