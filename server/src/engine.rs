use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use sketchparty_protocol::*;
use std::ops::RangeInclusive;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::LobbyError;
use crate::identity::{ConnectionHandle, IdentityRegistry};
use crate::lobby::{Lobby, Player, DEFAULT_MAX_PLAYERS};
use crate::outbox::{short, Broadcast, Outbox, Outboxes};
use crate::phase::GameEvent;
use crate::registry::{LobbyRegistry, DEFAULT_CODE_RANGE};

pub const HOST_GONE: &str = "The host has disconnected from the game!";

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub max_players: usize,
    pub code_range: RangeInclusive<u32>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_players: DEFAULT_MAX_PLAYERS,
            code_range: DEFAULT_CODE_RANGE,
        }
    }
}

/// Shared by every connection task. Handlers finish their mutation under
/// the lock; outbound sends only enqueue, so nothing waits while holding it.
pub type SharedEngine = Arc<Mutex<Engine>>;

/// The orchestrator: identities, lobbies, reverse index and outboxes.
pub struct Engine {
    config: EngineConfig,
    identities: IdentityRegistry,
    registry: LobbyRegistry,
    outboxes: Outboxes,
    rng: StdRng,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    pub fn with_rng(config: EngineConfig, rng: StdRng) -> Self {
        Self {
            registry: LobbyRegistry::new(config.code_range.clone()),
            config,
            identities: IdentityRegistry::default(),
            outboxes: Outboxes::default(),
            rng,
        }
    }

    pub fn shared(self) -> SharedEngine {
        Arc::new(Mutex::new(self))
    }

    #[cfg(test)]
    pub fn registry(&self) -> &LobbyRegistry {
        &self.registry
    }

    #[cfg(test)]
    pub fn identities(&self) -> &IdentityRegistry {
        &self.identities
    }

    /* ---------------- transport callbacks ---------------- */

    pub fn on_connect(&mut self, conn: ConnectionHandle, outbox: Outbox) {
        info!("[CONNECT] {}", short(conn));
        self.outboxes.register(conn, outbox);
    }

    /// A connection superseded by a reconnect is no longer bound, and its
    /// handle string is in no lobby, so closing it changes nothing.
    pub fn on_disconnect(&mut self, conn: ConnectionHandle) {
        self.outboxes.remove(conn);
        let id = match self.identities.unbind(conn) {
            Some(id) => id,
            None => {
                debug!("[DISCONNECT] {} had no identity, using its handle", short(conn));
                self.identities.resolve_identity(conn)
            }
        };
        info!("[DISCONNECT] {} ({id})", short(conn));
        self.leave_lobby(&id);
    }

    pub fn on_event(&mut self, conn: ConnectionHandle, cmd: ClientToServer) {
        debug!("[EVENT] from {} → {:?}", short(conn), cmd);
        match cmd {
            ClientToServer::AssignId(requested) => self.assign_id(conn, requested),
            ClientToServer::CreateLobby => self.create_lobby(conn),
            ClientToServer::JoinLobby(req) => self.join_lobby(conn, req),
            ClientToServer::CancelGame(payload) => self.cancel_game(conn, payload),
            ClientToServer::StartGame => self.start_game(conn),
            ClientToServer::SubmitPrompt(SubmitPrompt { prompt }) => self.submit_prompt(conn, prompt),
            ClientToServer::HandOutPrompts => self.hand_out_prompts(conn),
            ClientToServer::StartDrawing => self.start_drawing(conn),
            ClientToServer::SubmitDrawingMeta(_) => {}
            ClientToServer::EndDrawing => self.end_drawing(conn),
            ClientToServer::StartPresenting => self.start_presenting(conn),
            ClientToServer::SetPresenter(target) => self.set_presenter(conn, target),
            ClientToServer::VotePresentation(vote) => self.vote_presentation(conn, vote),
            ClientToServer::DonePresenting => self.done_presenting(conn),
            ClientToServer::SendReaction(emoji) => self.send_reaction(conn, emoji),
        }
    }

    /// Drawings arrive as raw binary frames; stored silently.
    pub fn submit_drawing(&mut self, conn: ConnectionHandle, blob: Vec<u8>) {
        let id = self.identities.resolve_identity(conn);
        let Some(lobby) = self.lobby_mut_for(&id, GameEvent::SubmitDrawing) else {
            return;
        };
        let code = lobby.code.clone();
        if let Some(p) = lobby.player_mut(&id) {
            debug!("[DRAWING] lobby={code} {} stored {} bytes", p.username, blob.len());
            p.drawing = Some(blob);
        }
    }

    /* ---------------- lookups ---------------- */

    /// The sender's lobby, if the event is allowed there right now. Host-only
    /// events from anyone else are dropped.
    fn lobby_mut_for(&mut self, id: &PlayerId, event: GameEvent) -> Option<&mut Lobby> {
        let Some(code) = self.registry.lobby_of(id).map(str::to_owned) else {
            debug!("[{event:?}] {id} is not in a lobby");
            return None;
        };
        let lobby = self.registry.lookup_mut(&code)?;
        if event.host_only() && !lobby.is_host(id) {
            debug!("[{event:?}] {id} is not the host of {code}");
            return None;
        }
        if !lobby.phase.can_transition(event) {
            debug!("[{event:?}] rejected in phase {} (lobby {code})", lobby.current_phase());
            return None;
        }
        Some(lobby)
    }

    fn send_error(&self, conn: ConnectionHandle, err: &LobbyError) {
        warn!("[server validation] {} → {}", short(conn), err);
        self.outboxes.send(conn, ServerToClient::Error(err.to_string()));
    }

    /* ---------------- identity & lobby lifecycle ---------------- */

    fn assign_id(&mut self, conn: ConnectionHandle, requested: Option<String>) {
        let id = requested
            .filter(|s| !s.is_empty())
            .map(PlayerId)
            .unwrap_or_else(PlayerId::fresh);
        let previous = self.identities.resolve_identity(conn);
        if self.identities.is_bound(conn) {
            debug!("[ASSIGN_ID] {} was {previous}, rebinding", short(conn));
        }
        // The old identity would otherwise sit in its lobby with no socket.
        if previous != id {
            self.leave_lobby(&previous);
        }
        self.identities.bind(conn, id.clone());
        info!("[ASSIGN_ID] {} is {id}", short(conn));
        self.outboxes.send(conn, ServerToClient::AssignId(id));
    }

    fn create_lobby(&mut self, conn: ConnectionHandle) {
        let host = self.identities.resolve_identity(conn);
        if self.registry.lobby_of(&host).is_some() {
            self.leave_lobby(&host);
        }
        let code = self.registry.create(host.clone(), &mut self.rng);
        info!("[CREATE_LOBBY] {code} hosted by {host} ({} live)", self.registry.len());
        self.outboxes.send(conn, ServerToClient::LobbyCreated(code));
    }

    fn join_lobby(&mut self, conn: ConnectionHandle, req: JoinLobby) {
        let id = self.identities.resolve_identity(conn);
        let code = match self.try_join(&id, req) {
            Ok(code) => code,
            Err(e) => return self.send_error(conn, &e),
        };
        let Some(lobby) = self.registry.lookup(&code) else {
            return;
        };
        log_lobby("JOIN", lobby);

        self.outboxes.send(conn, ServerToClient::JoinedLobby(code));
        Broadcast::new(&self.identities, &self.outboxes)
            .to_players(&lobby.host_and_members(), ServerToClient::PlayersUpdate(lobby.roster()));
    }

    fn try_join(&mut self, id: &PlayerId, req: JoinLobby) -> Result<String, LobbyError> {
        let username = req.username.trim();
        let code = req.lobby_code.trim();
        if username.is_empty() || code.is_empty() {
            return Err(LobbyError::MissingFields);
        }
        let current = self.registry.lobby_of(id).map(str::to_owned);
        let lobby = self.registry.lookup_mut(code).ok_or(LobbyError::LobbyNotFound)?;
        if !lobby.phase.can_transition(GameEvent::Join) {
            return Err(LobbyError::AlreadyStarted);
        }
        // The host may join its own lobby as a player, once.
        if let Some(current) = current {
            if current != code || lobby.contains(id) {
                return Err(LobbyError::AlreadyInLobby);
            }
        }
        lobby.add_player(Player::new(id.clone(), username), self.config.max_players)?;
        self.registry.index(id.clone(), code);
        Ok(code.to_string())
    }

    /// Host leaving ends the session for everyone; a player leaving only
    /// updates the roster.
    fn leave_lobby(&mut self, id: &PlayerId) {
        let Some(code) = self.registry.lobby_of(id).map(str::to_owned) else {
            return;
        };
        let is_host = self.registry.lookup(&code).is_some_and(|l| l.is_host(id));

        if is_host {
            let Some(lobby) = self.registry.destroy(&code) else {
                return;
            };
            for p in lobby.players.iter().filter(|p| &p.id != id) {
                if let Some(conn) = self.identities.unbind_identity(&p.id) {
                    self.outboxes.send(conn, ServerToClient::Disconnected(HOST_GONE.into()));
                }
            }
            info!(
                "[TEARDOWN] lobby={code} host {id} left, {} players orphaned ({} live)",
                lobby.players.iter().filter(|p| &p.id != id).count(),
                self.registry.len()
            );
            return;
        }

        self.registry.unindex(id);
        let Some(lobby) = self.registry.lookup_mut(&code) else {
            return;
        };
        lobby.remove_player(id);
        log_lobby("LEAVE", lobby);
        Broadcast::new(&self.identities, &self.outboxes)
            .to_players(&lobby.host_and_members(), ServerToClient::PlayersUpdate(lobby.roster()));
    }

    /* ---------------- game flow ---------------- */

    fn cancel_game(&mut self, conn: ConnectionHandle, payload: serde_json::Value) {
        let id = self.identities.resolve_identity(conn);
        let Some(lobby) = self.lobby_mut_for(&id, GameEvent::CancelGame) else {
            return;
        };
        info!("[CANCEL] lobby={} by {id}", lobby.code);
        let targets = lobby.member_ids();
        Broadcast::new(&self.identities, &self.outboxes)
            .to_players(&targets, ServerToClient::CancelGame(payload));
    }

    fn start_game(&mut self, conn: ConnectionHandle) {
        let id = self.identities.resolve_identity(conn);
        let Some(lobby) = self.lobby_mut_for(&id, GameEvent::StartGame) else {
            return;
        };
        lobby.phase.apply(GameEvent::StartGame);
        log_lobby("START", lobby);
        let targets = lobby.member_ids();
        Broadcast::new(&self.identities, &self.outboxes)
            .to_players(&targets, ServerToClient::GameState(Phase::Writing));
    }

    fn submit_prompt(&mut self, conn: ConnectionHandle, prompt: String) {
        let id = self.identities.resolve_identity(conn);
        let Some(lobby) = self.lobby_mut_for(&id, GameEvent::SubmitPrompt) else {
            return;
        };
        let Some(player) = lobby.player_mut(&id) else {
            return;
        };
        player.written_prompt = Some(prompt);
        let done = lobby.all_prompts_written();
        let (host, count) = (lobby.host.clone(), lobby.players.len());
        debug!("[PROMPT] lobby={} from {id}, all_written={done}", lobby.code);

        self.outboxes.send(conn, ServerToClient::WritingSubmitted);
        if done {
            Broadcast::new(&self.identities, &self.outboxes)
                .to_player(&host, ServerToClient::FinishWriting(count));
        }
    }

    fn hand_out_prompts(&mut self, conn: ConnectionHandle) {
        let id = self.identities.resolve_identity(conn);
        let Some(code) = self
            .lobby_mut_for(&id, GameEvent::HandOutPrompts)
            .map(|l| l.code.clone())
        else {
            return;
        };
        let Some(lobby) = self.registry.lookup_mut(&code) else {
            return;
        };
        if let Err(e) = lobby.hand_out_prompts(&mut self.rng) {
            return self.send_error(conn, &LobbyError::from(e));
        }
        lobby.phase.apply(GameEvent::HandOutPrompts);
        log_lobby("HAND_OUT", lobby);

        let fanout = Broadcast::new(&self.identities, &self.outboxes);
        for p in &lobby.players {
            if let Some(prompt) = &p.given_prompt {
                fanout.to_player(&p.id, ServerToClient::GivePrompt(prompt.clone()));
            }
        }
        self.outboxes.send(conn, ServerToClient::StartViewing(String::new()));
    }

    fn start_drawing(&mut self, conn: ConnectionHandle) {
        let id = self.identities.resolve_identity(conn);
        let Some(lobby) = self.lobby_mut_for(&id, GameEvent::StartDrawing) else {
            return;
        };
        lobby.phase.apply(GameEvent::StartDrawing);
        log_lobby("DRAWING", lobby);
        let targets = lobby.member_ids();

        self.outboxes.send(conn, ServerToClient::DrawingStarted(Phase::Drawing));
        Broadcast::new(&self.identities, &self.outboxes)
            .to_players(&targets, ServerToClient::GameState(Phase::Drawing));
    }

    fn end_drawing(&mut self, conn: ConnectionHandle) {
        let id = self.identities.resolve_identity(conn);
        let Some(lobby) = self.lobby_mut_for(&id, GameEvent::EndDrawing) else {
            return;
        };
        lobby.phase.apply(GameEvent::EndDrawing);
        let targets = lobby.member_ids();
        Broadcast::new(&self.identities, &self.outboxes).to_players(&targets, ServerToClient::EndDrawing);
    }

    fn start_presenting(&mut self, conn: ConnectionHandle) {
        let id = self.identities.resolve_identity(conn);
        let Some(lobby) = self.lobby_mut_for(&id, GameEvent::StartPresenting) else {
            return;
        };
        lobby.phase.apply(GameEvent::StartPresenting);
        log_lobby("PRESENTING", lobby);
        let data = lobby.player_data();
        self.outboxes.send(conn, ServerToClient::PlayerData(data));
    }

    fn set_presenter(&mut self, conn: ConnectionHandle, target: PresenterRef) {
        let id = self.identities.resolve_identity(conn);
        let Some(lobby) = self.lobby_mut_for(&id, GameEvent::SetPresenter) else {
            return;
        };
        lobby.reset_votes();
        info!("[PRESENTER] lobby={} now {}", lobby.code, target.id);
        let targets = lobby.member_ids();

        let fanout = Broadcast::new(&self.identities, &self.outboxes);
        for p in &targets {
            let msg = if *p == target.id {
                ServerToClient::YouArePresenting(target.clone())
            } else {
                ServerToClient::CurrentPresenter(target.clone())
            };
            fanout.to_player(p, msg);
        }
    }

    fn vote_presentation(&mut self, conn: ConnectionHandle, vote: Vote) {
        let voter = self.identities.resolve_identity(conn);
        let Some(code) = self.registry.lobby_of(&voter).map(str::to_owned) else {
            return;
        };
        let Some(lobby) = self.registry.lookup_mut(&code) else {
            return;
        };
        let accepted = lobby.phase.can_transition(GameEvent::VotePresentation)
            && lobby.cast_vote(&voter, &vote.id, vote.score);
        debug!(
            "[VOTE] lobby={code} {voter} → {} ({}) accepted={accepted}",
            vote.id, vote.score
        );
        self.outboxes.send(conn, ServerToClient::Voted);
    }

    fn done_presenting(&mut self, conn: ConnectionHandle) {
        let id = self.identities.resolve_identity(conn);
        let Some(lobby) = self.lobby_mut_for(&id, GameEvent::DonePresenting) else {
            return;
        };
        lobby.phase.apply(GameEvent::DonePresenting);
        log_lobby("GAME_END", lobby);
        let scores = lobby.final_scores();
        let targets = lobby.host_and_members();
        Broadcast::new(&self.identities, &self.outboxes)
            .to_players(&targets, ServerToClient::GameEnd(scores));
    }

    fn send_reaction(&mut self, conn: ConnectionHandle, emoji: String) {
        let id = self.identities.resolve_identity(conn);
        let Some(lobby) = self.registry.lobby_of(&id).and_then(|code| self.registry.lookup(code)) else {
            return;
        };
        let Some(player) = lobby.player(&id) else {
            return;
        };
        let reaction = Reaction {
            emoji,
            username: player.username.clone(),
        };
        Broadcast::new(&self.identities, &self.outboxes)
            .to_player(&lobby.host, ServerToClient::Reaction(reaction));
    }
}

fn log_lobby(prefix: &str, lobby: &Lobby) {
    let names: Vec<&str> = lobby.players.iter().map(|p| p.username.as_str()).collect();
    info!(
        "[{prefix}] lobby={} phase={} players={}",
        lobby.code,
        lobby.current_phase(),
        names.join(", ")
    );
}
