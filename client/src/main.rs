//! Thin terminal client for the snake game server.
//!
//! Connects over TCP, joins with a player name, forwards keyboard commands
//! and prints the broadcast board and scores. Typing a bare direction word
//! (`up`, `down`, `left`, `right`) stages an `INPUT`; `next` and `level <n>`
//! request level changes; `quit` leaves the game.

use clap::Parser;
use log::{debug, warn};
use shared::{ClientCommand, Direction, ServerMessage};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server host to connect to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// Server port
    #[clap(short, long, default_value_t = shared::DEFAULT_PORT)]
    port: u16,
    /// Player name to join with
    #[clap(short, long, default_value = "player")]
    name: String,
}

/// Maps a typed line to a wire command. Unrecognized input is forwarded
/// as-is so raw protocol lines still work.
fn command_for(line: &str) -> String {
    let trimmed = line.trim();
    if let Some(direction) = Direction::parse(trimmed) {
        return ClientCommand::Input { direction }.encode();
    }
    match trimmed.to_ascii_lowercase().as_str() {
        "next" => ClientCommand::LevelNext.encode(),
        "quit" => ClientCommand::Quit.encode(),
        lower => {
            if let Some(n) = lower.strip_prefix("level ") {
                if let Ok(number) = n.trim().parse::<u32>() {
                    return ClientCommand::LevelSet { number }.encode();
                }
            }
            trimmed.to_string()
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let address = format!("{}:{}", args.host, args.port);
    let stream = TcpStream::connect(&address).await?;
    println!("Connected to {}", address);

    let (read_half, mut write_half) = stream.into_split();

    let join = ClientCommand::Join {
        name: args.name.clone(),
    };
    write_half
        .write_all(format!("{}\n", join.encode()).as_bytes())
        .await?;

    // Keyboard task: one command per typed line.
    let stdin_task = tokio::spawn(async move {
        let mut input = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = input.next_line().await {
            if line.trim().is_empty() {
                continue;
            }
            let command = command_for(&line);
            let quitting = command == "QUIT";
            if write_half
                .write_all(format!("{}\n", command).as_bytes())
                .await
                .is_err()
            {
                break;
            }
            if quitting {
                break;
            }
        }
    });

    // Broadcast stream: print what the server pushes each tick.
    let mut lines = BufReader::new(read_half).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        match ServerMessage::decode(&line) {
            Ok(ServerMessage::Welcome { id }) => {
                println!("Joined as player {}", id);
            }
            Ok(ServerMessage::Board { text }) => {
                println!("{}", text);
            }
            Ok(ServerMessage::Scores { text }) => {
                println!("{}\n", text);
            }
            Ok(ServerMessage::State { snapshot }) => {
                // the ASCII board already shows everything; keep the
                // structured snapshot for logging only
                debug!(
                    "state: {} snakes, {} fruits",
                    snapshot.snakes.len(),
                    snapshot.fruits.len()
                );
            }
            Ok(ServerMessage::Err { message }) => {
                eprintln!("server error: {}", message);
            }
            Err(e) => {
                warn!("Undecodable server line: {}", e);
            }
        }
    }

    println!("Disconnected");
    stdin_task.abort();
    Ok(())
}
