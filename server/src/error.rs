use crate::derange::RedistributeError;
use thiserror::Error;

/// Validation failures reported back to the sender as `error(message)`.
/// None of these close the connection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LobbyError {
    #[error("Username and lobby_code are required!")]
    MissingFields,
    #[error("Lobby not found!")]
    LobbyNotFound,
    #[error("Game is already started!")]
    AlreadyStarted,
    #[error("Lobby is full!")]
    LobbyFull,
    #[error("You are already in a lobby!")]
    AlreadyInLobby,
    #[error(transparent)]
    Redistribute(#[from] RedistributeError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_match_the_wire() {
        assert_eq!(LobbyError::LobbyNotFound.to_string(), "Lobby not found!");
        assert_eq!(LobbyError::LobbyFull.to_string(), "Lobby is full!");
        assert_eq!(
            LobbyError::from(RedistributeError::MissingPrompt).to_string(),
            "Not everyone has submitted a prompt yet!"
        );
    }
}
