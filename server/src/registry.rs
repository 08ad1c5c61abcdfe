use rand::Rng;
use sketchparty_protocol::PlayerId;
use std::collections::HashMap;
use std::ops::RangeInclusive;

use crate::lobby::Lobby;

pub const DEFAULT_CODE_RANGE: RangeInclusive<u32> = 1000..=999_999;

/// Owns every live lobby plus the identity -> lobby code reverse index.
///
/// An identity is indexed iff it hosts or sits in a live lobby, and that
/// lobby knows it. `destroy` clears the index for the whole roster.
#[derive(Debug)]
pub struct LobbyRegistry {
    lobbies: HashMap<String, Lobby>,
    index: HashMap<PlayerId, String>,
    code_range: RangeInclusive<u32>,
}

impl Default for LobbyRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_CODE_RANGE)
    }
}

impl LobbyRegistry {
    pub fn new(code_range: RangeInclusive<u32>) -> Self {
        Self {
            lobbies: HashMap::new(),
            index: HashMap::new(),
            code_range,
        }
    }

    /// Opens a lobby in WAITING with an empty roster. The host is indexed
    /// but only becomes a player by joining.
    ///
    /// Codes are re-sampled until one is free among live lobbies; callers
    /// keep the live count well below the size of the code range.
    pub fn create<R: Rng + ?Sized>(&mut self, host: PlayerId, rng: &mut R) -> String {
        let code = loop {
            let code = rng.gen_range(self.code_range.clone()).to_string();
            if !self.lobbies.contains_key(&code) {
                break code;
            }
        };
        self.index.insert(host.clone(), code.clone());
        self.lobbies.insert(code.clone(), Lobby::new(code.clone(), host));
        code
    }

    pub fn lookup(&self, code: &str) -> Option<&Lobby> {
        self.lobbies.get(code)
    }

    pub fn lookup_mut(&mut self, code: &str) -> Option<&mut Lobby> {
        self.lobbies.get_mut(code)
    }

    pub fn lobby_of(&self, id: &PlayerId) -> Option<&str> {
        self.index.get(id).map(String::as_str)
    }

    pub fn index(&mut self, id: PlayerId, code: &str) {
        self.index.insert(id, code.to_string());
    }

    pub fn unindex(&mut self, id: &PlayerId) -> Option<String> {
        self.index.remove(id)
    }

    pub fn destroy(&mut self, code: &str) -> Option<Lobby> {
        let lobby = self.lobbies.remove(code)?;
        for p in &lobby.players {
            if self.index.get(&p.id).map(String::as_str) == Some(code) {
                self.index.remove(&p.id);
            }
        }
        if self.index.get(&lobby.host).map(String::as_str) == Some(code) {
            self.index.remove(&lobby.host);
        }
        Some(lobby)
    }

    pub fn len(&self) -> usize {
        self.lobbies.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lobby::{Player, DEFAULT_MAX_PLAYERS};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use sketchparty_protocol::Phase;

    #[test]
    fn create_indexes_host_only() {
        let mut reg = LobbyRegistry::default();
        let mut rng = StdRng::seed_from_u64(5);
        let host = PlayerId::from("host");

        let code = reg.create(host.clone(), &mut rng);

        let n: u32 = code.parse().unwrap();
        assert!(DEFAULT_CODE_RANGE.contains(&n));
        assert_eq!(reg.lobby_of(&host), Some(code.as_str()));
        let lobby = reg.lookup(&code).unwrap();
        assert_eq!(lobby.current_phase(), Phase::Waiting);
        assert!(lobby.players.is_empty());
        assert_eq!(lobby.host, host);
    }

    #[test]
    fn codes_stay_unique_in_a_tiny_space() {
        let mut reg = LobbyRegistry::new(1..=8);
        let mut rng = StdRng::seed_from_u64(9);
        let mut codes: Vec<String> = (0..8)
            .map(|i| reg.create(PlayerId::from(format!("h{i}")), &mut rng))
            .collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), 8);
        assert_eq!(reg.len(), 8);
    }

    #[test]
    fn codes_are_reusable_after_destroy() {
        let mut reg = LobbyRegistry::new(7..=7);
        let mut rng = StdRng::seed_from_u64(1);
        let code = reg.create(PlayerId::from("a"), &mut rng);
        assert!(reg.destroy(&code).is_some());
        assert_eq!(reg.create(PlayerId::from("b"), &mut rng), code);
    }

    #[test]
    fn destroy_cascades_reverse_index() {
        let mut reg = LobbyRegistry::default();
        let mut rng = StdRng::seed_from_u64(2);
        let host = PlayerId::from("host");
        let code = reg.create(host.clone(), &mut rng);
        for name in ["host", "a", "b"] {
            let id = PlayerId::from(name);
            reg.lookup_mut(&code)
                .unwrap()
                .add_player(Player::new(id.clone(), name), DEFAULT_MAX_PLAYERS)
                .unwrap();
            reg.index(id, &code);
        }

        let lobby = reg.destroy(&code).unwrap();

        assert_eq!(lobby.players.len(), 3);
        assert!(reg.lookup(&code).is_none());
        for name in ["host", "a", "b"] {
            assert_eq!(reg.lobby_of(&PlayerId::from(name)), None);
        }
        assert_eq!(reg.len(), 0);
        assert!(reg.destroy(&code).is_none());
    }
}
