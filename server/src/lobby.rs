use base64::Engine as _;
use rand::Rng;
use sketchparty_protocol::{FinalScore, Phase, PlayerId, PresentedPlayer, PublicPlayer};
use std::collections::BTreeMap;

use crate::derange::{self, RedistributeError};
use crate::error::LobbyError;
use crate::phase::{GameEvent, PhaseMachine};

pub const DEFAULT_MAX_PLAYERS: usize = 12;

#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub username: String,
    pub written_prompt: Option<String>,
    pub given_prompt: Option<String>,
    pub drawing: Option<Vec<u8>>,
    pub voted_this_round: bool,
    pub score: i64,
}

impl Player {
    pub fn new(id: PlayerId, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            written_prompt: None,
            given_prompt: None,
            drawing: None,
            voted_this_round: false,
            score: 0,
        }
    }

    pub fn public(&self) -> PublicPlayer {
        PublicPlayer {
            id: self.id.clone(),
            username: self.username.clone(),
            prompt_written: self.written_prompt.clone(),
            prompt_given: self.given_prompt.clone(),
        }
    }

    fn presented(&self) -> PresentedPlayer {
        PresentedPlayer {
            username: self.username.clone(),
            prompt: self.given_prompt.clone(),
            drawing_data: self
                .drawing
                .as_ref()
                .map(|d| base64::engine::general_purpose::STANDARD.encode(d)),
        }
    }
}

/// One game session: code, host, phase and the ordered roster.
#[derive(Debug)]
pub struct Lobby {
    pub code: String,
    pub host: PlayerId,
    pub phase: PhaseMachine,
    pub players: Vec<Player>,
}

impl Lobby {
    pub fn new(code: String, host: PlayerId) -> Self {
        Self {
            code,
            host,
            phase: PhaseMachine::new(),
            players: Vec::new(),
        }
    }

    pub fn current_phase(&self) -> Phase {
        self.phase.phase()
    }

    pub fn is_host(&self, id: &PlayerId) -> bool {
        &self.host == id
    }

    pub fn contains(&self, id: &PlayerId) -> bool {
        self.players.iter().any(|p| &p.id == id)
    }

    pub fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| &p.id == id)
    }

    pub fn player_mut(&mut self, id: &PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| &p.id == id)
    }

    /// Phase and capacity checks for a join; duplicate membership is the
    /// registry's concern.
    pub fn add_player(&mut self, player: Player, max_players: usize) -> Result<(), LobbyError> {
        if !self.phase.can_transition(GameEvent::Join) {
            return Err(LobbyError::AlreadyStarted);
        }
        if self.players.len() >= max_players {
            return Err(LobbyError::LobbyFull);
        }
        self.players.push(player);
        Ok(())
    }

    pub fn remove_player(&mut self, id: &PlayerId) -> Option<Player> {
        let pos = self.players.iter().position(|p| &p.id == id)?;
        Some(self.players.remove(pos))
    }

    pub fn roster(&self) -> Vec<PublicPlayer> {
        self.players.iter().map(Player::public).collect()
    }

    /// Snapshot of member identities for a fan-out.
    pub fn member_ids(&self) -> Vec<PlayerId> {
        self.players.iter().map(|p| p.id.clone()).collect()
    }

    /// Host first, then every member; the host appears once even when it
    /// also joined as a player.
    pub fn host_and_members(&self) -> Vec<PlayerId> {
        let mut ids = vec![self.host.clone()];
        ids.extend(self.players.iter().filter(|p| p.id != self.host).map(|p| p.id.clone()));
        ids
    }

    pub fn all_prompts_written(&self) -> bool {
        !self.players.is_empty() && self.players.iter().all(|p| p.written_prompt.is_some())
    }

    /// Gives every player someone else's prompt. On error nothing changes.
    pub fn hand_out_prompts<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<(), RedistributeError> {
        if self.players.len() < 2 {
            return Err(RedistributeError::TooFewPlayers(self.players.len()));
        }
        let written: Vec<String> = self
            .players
            .iter()
            .map(|p| p.written_prompt.clone())
            .collect::<Option<_>>()
            .ok_or(RedistributeError::MissingPrompt)?;
        let given = derange::redistribute(&written, rng)?;
        for (player, prompt) in self.players.iter_mut().zip(given) {
            player.given_prompt = Some(prompt);
        }
        Ok(())
    }

    /* ---------------- voting ---------------- */

    /// Opens a new presentation round.
    pub fn reset_votes(&mut self) {
        for p in self.players.iter_mut() {
            p.voted_this_round = false;
        }
    }

    /// Returns whether the vote counted. Self votes, repeat votes and votes
    /// from or for strangers are ignored.
    pub fn cast_vote(&mut self, voter: &PlayerId, target: &PlayerId, score: i64) -> bool {
        if voter == target || !self.contains(target) {
            return false;
        }
        match self.player_mut(voter) {
            Some(v) if !v.voted_this_round => v.voted_this_round = true,
            _ => return false,
        }
        if let Some(t) = self.player_mut(target) {
            t.score = t.score.saturating_add(score);
        }
        true
    }

    pub fn final_scores(&self) -> Vec<FinalScore> {
        self.players
            .iter()
            .map(|p| FinalScore {
                username: p.username.clone(),
                score: p.score,
            })
            .collect()
    }

    pub fn player_data(&self) -> BTreeMap<PlayerId, PresentedPlayer> {
        self.players.iter().map(|p| (p.id.clone(), p.presented())).collect()
    }
}
