//! Server orchestration: accept loop, per-session I/O tasks and the tick loop.

use crate::game::GameState;
use crate::level::LevelSet;
use crate::session::SessionManager;
use log::{debug, error, info, warn};
use shared::{ClientCommand, PlayerId, ProtocolError, ServerMessage};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::{interval, Interval, MissedTickBehavior};

/// Events funneled from connection tasks into the main loop.
#[derive(Debug)]
pub enum ServerEvent {
    Connected { stream: TcpStream, addr: SocketAddr },
    LineReceived { id: PlayerId, line: String },
    Disconnected { id: PlayerId },
}

/// Main server coordinating networking and the game simulation.
///
/// The world is owned by this struct inside a single loop task; connection
/// tasks only send [`ServerEvent`]s in and drain their outbound channels,
/// so no lock guards the game state.
pub struct Server {
    /// Taken by the accept task when the server starts running.
    listener: Option<TcpListener>,
    local_addr: SocketAddr,
    sessions: SessionManager,
    game: GameState,
    levels: LevelSet,

    event_tx: mpsc::UnboundedSender<ServerEvent>,
    event_rx: mpsc::UnboundedReceiver<ServerEvent>,
}

impl Server {
    pub async fn bind(
        addr: &str,
        start_level: Option<u32>,
        preserve_scores: bool,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        info!("Server listening on {}", local_addr);

        let mut levels = LevelSet::new();
        if let Some(number) = start_level {
            if levels.set(number).is_none() {
                warn!("Start level {} out of range, using level 1", number);
            }
        }
        let game = GameState::new(levels.current(), levels.len(), preserve_scores);

        let (event_tx, event_rx) = mpsc::unbounded_channel();

        Ok(Server {
            listener: Some(listener),
            local_addr,
            sessions: SessionManager::new(),
            game,
            levels,
            event_tx,
            event_rx,
        })
    }

    /// Address the listener actually bound to (useful with port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Runs the accept loop and the tick loop until the event channel dies.
    /// Dropping the returned future stops accepting, cancels the tick timer
    /// and closes every session with it.
    pub async fn run(mut self) -> Result<(), Box<dyn std::error::Error>> {
        let accept_tx = self.event_tx.clone();
        let Some(listener) = self.listener.take() else {
            return Ok(());
        };
        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, addr)) => {
                        if accept_tx
                            .send(ServerEvent::Connected { stream, addr })
                            .is_err()
                        {
                            break;
                        }
                    }
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });

        let mut ticker = make_ticker(self.game.level().tick_rate_hz);
        info!(
            "Tick loop running at {} Hz",
            self.game.level().tick_rate_hz
        );

        loop {
            tokio::select! {
                event = self.event_rx.recv() => {
                    match event {
                        Some(ServerEvent::Connected { stream, addr }) => {
                            self.handle_connect(stream, addr);
                        }
                        Some(ServerEvent::LineReceived { id, line }) => {
                            if self.handle_line(id, &line) {
                                // level changed: retime the loop and push the
                                // new map out without waiting for the tick
                                ticker = make_ticker(self.game.level().tick_rate_hz);
                                info!(
                                    "Tick loop rescheduled at {} Hz",
                                    self.game.level().tick_rate_hz
                                );
                                self.broadcast_world();
                            }
                        }
                        Some(ServerEvent::Disconnected { id }) => {
                            self.handle_disconnect(id);
                        }
                        None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                _ = ticker.tick() => {
                    self.tick();
                },
            }
        }

        Ok(())
    }

    /// Registers a session and spawns its reader and writer tasks.
    fn handle_connect(&mut self, stream: TcpStream, addr: SocketAddr) {
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
        let id = self.sessions.register(outbound_tx);
        info!("Client connected: player {} from {}", id, addr);

        let (read_half, mut write_half) = stream.into_split();

        // Writer: drains the session's outbound queue. Ends when the session
        // is removed (channel closed) or the peer stops accepting writes.
        tokio::spawn(async move {
            while let Some(line) = outbound_rx.recv().await {
                if write_half.write_all(line.as_bytes()).await.is_err() {
                    break;
                }
            }
            let _ = write_half.shutdown().await;
        });

        // Reader: one blocking-read task per session, forwarding lines to
        // the main loop. EOF, I/O error or QUIT ends the session.
        let event_tx = self.event_tx.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(read_half).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let quitting = line.trim() == "QUIT";
                        if event_tx
                            .send(ServerEvent::LineReceived { id, line })
                            .is_err()
                        {
                            return;
                        }
                        if quitting {
                            return;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        debug!("Read error on session {}: {}", id, e);
                        break;
                    }
                }
            }
            let _ = event_tx.send(ServerEvent::Disconnected { id });
        });
    }

    /// Dispatches one inbound line. Returns true if the level changed and
    /// the tick loop must be rescheduled.
    fn handle_line(&mut self, id: PlayerId, line: &str) -> bool {
        // The reader task may still drain lines after its session was torn
        // down (e.g. by a broadcast failure). Without a registered session
        // a JOIN here would put a snake in the world that no disconnect
        // event can remove, so such lines are dropped outright.
        if self.sessions.get(id).is_none() {
            debug!("Dropping line from deregistered session {}", id);
            return false;
        }
        if line.trim().is_empty() {
            return false;
        }
        match ClientCommand::decode(line) {
            Ok(ClientCommand::Join { name }) => {
                self.game.add_player(id, &name);
                self.sessions.mark_joined(id);
                self.send_to(id, &ServerMessage::Welcome { id });
                info!("Player joined: {} name={}", id, name);
            }
            Ok(ClientCommand::Input { direction }) => {
                if let Some(session) = self.sessions.get_mut(id) {
                    session.stage_direction(direction);
                }
            }
            Ok(ClientCommand::LevelNext) => {
                let level = self.levels.next();
                info!("Player {} advanced to level {}", id, level.number);
                self.game.change_level(level);
                return true;
            }
            Ok(ClientCommand::LevelSet { number }) => match self.levels.set(number) {
                Some(level) => {
                    info!("Player {} selected level {}", id, level.number);
                    self.game.change_level(level);
                    return true;
                }
                None => {
                    self.send_to(
                        id,
                        &ServerMessage::Err {
                            message: "Invalid level number".to_string(),
                        },
                    );
                }
            },
            Ok(ClientCommand::Quit) => {
                self.handle_disconnect(id);
            }
            Err(ProtocolError::BadDirection(word)) => {
                debug!("Player {} sent unusable direction {:?}", id, word);
                self.send_to(
                    id,
                    &ServerMessage::Err {
                        message: "Invalid direction".to_string(),
                    },
                );
            }
            Err(ProtocolError::BadLevel(_)) => {
                self.send_to(
                    id,
                    &ServerMessage::Err {
                        message: "Invalid level number".to_string(),
                    },
                );
            }
            Err(ProtocolError::UnknownCommand(_)) | Err(ProtocolError::BadMessage(_)) => {
                self.send_to(
                    id,
                    &ServerMessage::Err {
                        message: "Unknown command".to_string(),
                    },
                );
            }
        }
        false
    }

    /// Tears down a session and deregisters the player, exactly once.
    fn handle_disconnect(&mut self, id: PlayerId) {
        if self.sessions.remove(id) {
            self.game.remove_player(id);
            info!("Player quit: {}", id);
        }
    }

    /// One simulation tick: apply staged intents, advance the world, then
    /// broadcast. The snapshot goes out even with zero players so idle
    /// clients still see a live board.
    fn tick(&mut self) {
        if self.game.has_players() {
            for (id, direction) in self.sessions.staged_directions() {
                self.game.set_heading(id, direction);
            }
            self.game.step();
        }
        self.broadcast_world();
    }

    /// Serializes the state, board render and score render and fans all
    /// three out to every session. Any encoding fault is confined to this
    /// tick; dead sessions are torn down afterwards.
    fn broadcast_world(&mut self) {
        let messages = [
            ServerMessage::State {
                snapshot: self.game.snapshot(),
            },
            ServerMessage::Board {
                text: self.game.render_board(),
            },
            ServerMessage::Scores {
                text: self.game.render_scores(),
            },
        ];

        let mut failed: Vec<PlayerId> = Vec::new();
        for message in &messages {
            match message.encode() {
                Ok(line) => failed.extend(self.sessions.broadcast(&line)),
                Err(e) => {
                    error!("Failed to encode broadcast message: {}", e);
                    return;
                }
            }
        }

        failed.sort_unstable();
        failed.dedup();
        for id in failed {
            self.handle_disconnect(id);
        }
    }

    fn send_to(&mut self, id: PlayerId, message: &ServerMessage) {
        let line = match message.encode() {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to encode message for player {}: {}", id, e);
                return;
            }
        };
        let alive = self
            .sessions
            .get(id)
            .map(|s| s.send_line(&line))
            .unwrap_or(true);
        if !alive {
            self.handle_disconnect(id);
        }
    }
}

fn make_ticker(tick_rate_hz: u32) -> Interval {
    let period = Duration::from_millis(1000 / tick_rate_hz.max(1) as u64);
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}
