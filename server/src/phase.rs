use sketchparty_protocol::Phase;

/// Everything that is gated on the lobby's phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    Join,
    StartGame,
    SubmitPrompt,
    HandOutPrompts,
    StartDrawing,
    SubmitDrawing,
    EndDrawing,
    StartPresenting,
    SetPresenter,
    VotePresentation,
    DonePresenting,
    CancelGame,
}

impl GameEvent {
    /// Only the host drives the game forward.
    pub fn host_only(self) -> bool {
        matches!(
            self,
            GameEvent::StartGame
                | GameEvent::HandOutPrompts
                | GameEvent::StartDrawing
                | GameEvent::EndDrawing
                | GameEvent::StartPresenting
                | GameEvent::SetPresenter
                | GameEvent::DonePresenting
        )
    }
}

/// The transition table. Phases only ever move forward.
#[derive(Debug, Clone, Default)]
pub struct PhaseMachine {
    phase: Phase,
}

impl PhaseMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn target(&self, event: GameEvent) -> Option<Phase> {
        use GameEvent::*;
        use Phase::*;
        let p = self.phase;
        match (p, event) {
            (Waiting, Join) => Some(Waiting),
            (Waiting, StartGame) => Some(Writing),
            (Writing, SubmitPrompt) => Some(Writing),
            (Writing, HandOutPrompts) => Some(Viewing),
            (Viewing, StartDrawing) => Some(Drawing),
            (Drawing | Presenting, SubmitDrawing) => Some(p),
            (Drawing, EndDrawing) => Some(Drawing),
            (_, StartPresenting) => Some(p.max(Presenting)),
            (_, SetPresenter) => Some(p),
            (Presenting, VotePresentation) => Some(Presenting),
            (_, DonePresenting) => Some(End),
            (_, CancelGame) => Some(p),
            _ => None,
        }
    }

    pub fn can_transition(&self, event: GameEvent) -> bool {
        self.target(event).is_some()
    }

    /// Returns false and leaves the phase alone when `event` is not allowed.
    pub fn apply(&mut self, event: GameEvent) -> bool {
        match self.target(event) {
            Some(next) => {
                self.phase = next;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EVENTS: [GameEvent; 12] = [
        GameEvent::Join,
        GameEvent::StartGame,
        GameEvent::SubmitPrompt,
        GameEvent::HandOutPrompts,
        GameEvent::StartDrawing,
        GameEvent::SubmitDrawing,
        GameEvent::EndDrawing,
        GameEvent::StartPresenting,
        GameEvent::SetPresenter,
        GameEvent::VotePresentation,
        GameEvent::DonePresenting,
        GameEvent::CancelGame,
    ];

    fn at(phase: Phase) -> PhaseMachine {
        PhaseMachine { phase }
    }

    #[test]
    fn happy_path_walks_every_phase() {
        let mut m = PhaseMachine::new();
        assert_eq!(m.phase(), Phase::Waiting);

        assert!(m.apply(GameEvent::StartGame));
        assert_eq!(m.phase(), Phase::Writing);
        assert!(m.apply(GameEvent::HandOutPrompts));
        assert_eq!(m.phase(), Phase::Viewing);
        assert!(m.apply(GameEvent::StartDrawing));
        assert_eq!(m.phase(), Phase::Drawing);
        assert!(m.apply(GameEvent::EndDrawing));
        assert_eq!(m.phase(), Phase::Drawing);
        assert!(m.apply(GameEvent::StartPresenting));
        assert_eq!(m.phase(), Phase::Presenting);
        assert!(m.apply(GameEvent::SetPresenter));
        assert!(m.apply(GameEvent::DonePresenting));
        assert_eq!(m.phase(), Phase::End);
    }

    #[test]
    fn transitions_never_go_backwards() {
        for phase in Phase::ALL {
            for event in EVENTS {
                let mut m = at(phase);
                if m.apply(event) {
                    assert!(m.phase() >= phase, "{phase:?} --{event:?}--> {:?}", m.phase());
                }
            }
        }
    }

    #[test]
    fn rejected_event_leaves_phase_untouched() {
        let mut m = at(Phase::Writing);
        assert!(!m.apply(GameEvent::StartGame));
        assert!(!m.apply(GameEvent::StartDrawing));
        assert_eq!(m.phase(), Phase::Writing);
    }

    #[test]
    fn joins_only_while_waiting() {
        for phase in Phase::ALL {
            assert_eq!(at(phase).can_transition(GameEvent::Join), phase == Phase::Waiting);
        }
    }

    #[test]
    fn cancel_is_always_allowed_and_keeps_phase() {
        for phase in Phase::ALL {
            let mut m = at(phase);
            assert!(m.apply(GameEvent::CancelGame));
            assert_eq!(m.phase(), phase);
        }
    }

    #[test]
    fn done_presenting_ends_from_any_phase() {
        for phase in Phase::ALL {
            let mut m = at(phase);
            assert!(m.apply(GameEvent::DonePresenting));
            assert_eq!(m.phase(), Phase::End);
        }
    }

    #[test]
    fn presenting_controls_work_in_every_phase() {
        for phase in Phase::ALL {
            let mut m = at(phase);
            assert!(m.apply(GameEvent::SetPresenter));
            assert_eq!(m.phase(), phase);

            assert!(m.apply(GameEvent::StartPresenting));
            assert_eq!(m.phase(), phase.max(Phase::Presenting));
        }
    }

    #[test]
    fn votes_only_count_while_presenting() {
        for phase in Phase::ALL {
            assert_eq!(
                at(phase).can_transition(GameEvent::VotePresentation),
                phase == Phase::Presenting
            );
        }
    }

    #[test]
    fn host_only_events() {
        assert!(GameEvent::StartGame.host_only());
        assert!(GameEvent::DonePresenting.host_only());
        assert!(!GameEvent::SubmitPrompt.host_only());
        assert!(!GameEvent::VotePresentation.host_only());
        assert!(!GameEvent::CancelGame.host_only());
        assert!(!GameEvent::Join.host_only());
    }
}
