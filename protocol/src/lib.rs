use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// ---- Identity ----
/// Durable player identity. Clients may hand a previously issued one back
/// on reconnect, so it is an opaque string rather than a Uuid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    pub fn fresh() -> Self {
        PlayerId(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(s: &str) -> Self {
        PlayerId(s.to_string())
    }
}

impl From<String> for PlayerId {
    fn from(s: String) -> Self {
        PlayerId(s)
    }
}

/// ---- Game Phases ----
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Waiting,
    Writing,
    Viewing,
    Drawing,
    Presenting,
    End,
}

impl Phase {
    pub const ALL: [Phase; 6] = [
        Phase::Waiting,
        Phase::Writing,
        Phase::Viewing,
        Phase::Drawing,
        Phase::Presenting,
        Phase::End,
    ];
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Waiting => "waiting",
            Phase::Writing => "writing",
            Phase::Viewing => "viewing",
            Phase::Drawing => "drawing",
            Phase::Presenting => "presenting",
            Phase::End => "end",
        };
        f.write_str(s)
    }
}

/// ---- Request payloads ----
/// Missing, null or empty fields (or no payload at all) decode to empty
/// strings, so they surface as a lobby validation error instead of a decode
/// failure.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct JoinLobby {
    pub username: String,
    pub lobby_code: String,
}

#[derive(Default, Deserialize)]
struct JoinLobbyFields {
    #[serde(default, deserialize_with = "lenient_string")]
    username: String,
    #[serde(default, deserialize_with = "lenient_string")]
    lobby_code: String,
}

impl<'de> Deserialize<'de> for JoinLobby {
    fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
        let fields = Option::<JoinLobbyFields>::deserialize(de)?.unwrap_or_default();
        Ok(JoinLobby {
            username: fields.username,
            lobby_code: fields.lobby_code,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubmitPrompt {
    pub prompt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PresenterRef {
    pub id: PlayerId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Vote {
    pub id: PlayerId,
    pub score: i64,
}

// Lobby codes are numeric, and some clients send them as JSON numbers.
// Anything that is neither a string nor a number counts as missing.
fn lenient_string<'de, D>(de: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(de)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

/// ---- Response payloads ----
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublicPlayer {
    pub id: PlayerId,
    pub username: String,
    pub prompt_written: Option<String>,
    pub prompt_given: Option<String>,
}

/// What the host needs to show one player's presentation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PresentedPlayer {
    pub username: String,
    pub prompt: Option<String>,
    /// Standard base64 of the uploaded drawing bytes.
    pub drawing_data: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FinalScore {
    pub username: String,
    pub score: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reaction {
    pub emoji: String,
    pub username: String,
}

/// Inbound events. Framed as `{"event": "<name>", "data": <payload>}`;
/// drawings arrive separately as binary frames.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientToServer {
    AssignId(Option<String>),
    CreateLobby,
    JoinLobby(JoinLobby),
    CancelGame(Value),

    // Game flow, host driven
    StartGame,
    HandOutPrompts,
    StartDrawing,
    EndDrawing,
    StartPresenting,
    SetPresenter(PresenterRef),
    DonePresenting,

    // Player actions
    SubmitPrompt(SubmitPrompt),
    SubmitDrawingMeta(Value),
    VotePresentation(Vote),
    SendReaction(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerToClient {
    AssignId(PlayerId),
    LobbyCreated(String),
    JoinedLobby(String),
    Error(String),
    PlayersUpdate(Vec<PublicPlayer>),
    CancelGame(Value),
    GameState(Phase),
    WritingSubmitted,
    FinishWriting(usize),
    GivePrompt(String),
    StartViewing(String),
    DrawingStarted(Phase),
    EndDrawing,
    PlayerData(BTreeMap<PlayerId, PresentedPlayer>),
    YouArePresenting(PresenterRef),
    CurrentPresenter(PresenterRef),
    Voted,
    GameEnd(Vec<FinalScore>),
    Reaction(Reaction),
    Disconnected(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn events_are_adjacently_tagged_snake_case() {
        let v = serde_json::to_value(ServerToClient::GameState(Phase::Writing)).unwrap();
        assert_eq!(v, json!({"event": "game_state", "data": "writing"}));

        let v = serde_json::to_value(ServerToClient::Voted).unwrap();
        assert_eq!(v, json!({"event": "voted"}));

        let v = serde_json::to_value(ServerToClient::Reaction(Reaction {
            emoji: "🎉".into(),
            username: "Ann".into(),
        }))
        .unwrap();
        assert_eq!(v["event"], "reaction");
        assert_eq!(v["data"]["username"], "Ann");
    }

    #[test]
    fn join_lobby_accepts_numeric_code_and_missing_fields() {
        let cmd: ClientToServer = serde_json::from_value(json!({
            "event": "join_lobby",
            "data": {"username": "Ann", "lobby_code": 48213}
        }))
        .unwrap();
        assert_eq!(
            cmd,
            ClientToServer::JoinLobby(JoinLobby {
                username: "Ann".into(),
                lobby_code: "48213".into(),
            })
        );

        let cmd: ClientToServer = serde_json::from_value(json!({
            "event": "join_lobby",
            "data": {"username": "Ann"}
        }))
        .unwrap();
        assert_eq!(
            cmd,
            ClientToServer::JoinLobby(JoinLobby {
                username: "Ann".into(),
                lobby_code: String::new(),
            })
        );
    }

    #[test]
    fn join_lobby_with_null_or_no_payload_decodes_empty() {
        let empty = ClientToServer::JoinLobby(JoinLobby::default());
        for frame in [
            json!({"event": "join_lobby"}),
            json!({"event": "join_lobby", "data": null}),
            json!({"event": "join_lobby", "data": {}}),
            json!({"event": "join_lobby", "data": {"username": null, "lobby_code": null}}),
        ] {
            let cmd: ClientToServer = serde_json::from_value(frame.clone()).unwrap();
            assert_eq!(cmd, empty, "{frame}");
        }

        let cmd: ClientToServer = serde_json::from_str(
            r#"{"event": "join_lobby", "data": {"username": null, "lobby_code": "1234"}}"#,
        )
        .unwrap();
        assert_eq!(
            cmd,
            ClientToServer::JoinLobby(JoinLobby {
                username: String::new(),
                lobby_code: "1234".into(),
            })
        );
    }

    #[test]
    fn phase_defaults_to_waiting() {
        assert_eq!(Phase::default(), Phase::Waiting);
    }

    #[test]
    fn unit_and_optional_events_decode() {
        let cmd: ClientToServer =
            serde_json::from_value(json!({"event": "start_game", "data": null})).unwrap();
        assert_eq!(cmd, ClientToServer::StartGame);

        let cmd: ClientToServer =
            serde_json::from_value(json!({"event": "assign_id", "data": null})).unwrap();
        assert_eq!(cmd, ClientToServer::AssignId(None));

        let cmd: ClientToServer = serde_json::from_value(json!({
            "event": "vote_presentation",
            "data": {"id": "abc", "score": 3}
        }))
        .unwrap();
        assert_eq!(
            cmd,
            ClientToServer::VotePresentation(Vote {
                id: PlayerId::from("abc"),
                score: 3,
            })
        );
    }

    #[test]
    fn player_data_is_keyed_by_identity() {
        let mut data = BTreeMap::new();
        data.insert(
            PlayerId::from("p1"),
            PresentedPlayer {
                username: "Ann".into(),
                prompt: Some("cat".into()),
                drawing_data: None,
            },
        );
        let v = serde_json::to_value(ServerToClient::PlayerData(data)).unwrap();
        assert_eq!(v["data"]["p1"]["prompt"], "cat");
        assert!(v["data"]["p1"]["drawing_data"].is_null());
    }

    #[test]
    fn fresh_ids_are_distinct_hex() {
        let a = PlayerId::fresh();
        let b = PlayerId::fresh();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 32);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }
}
