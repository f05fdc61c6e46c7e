//! Keyboard controls and text prompts

use super::session::Phase;
use crossterm::event::KeyCode;

/// Longest text a prompt accepts
const MAX_INPUT: usize = 32;

/// What a key press asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Open(PromptKind),
    CreateLobby,
    ListLobbies,
    Ready,
    Leave,
    ToggleEraser,
    ClearCanvas,
    SubmitDrawing,
    ToggleSound,
    Quit,
}

/// Map a key outside of any prompt to an intent
pub fn intent_for(code: KeyCode, phase: Phase) -> Option<Intent> {
    let intent = match code {
        KeyCode::Char('u') => Intent::Open(PromptKind::Username),
        KeyCode::Char('c') => Intent::CreateLobby,
        KeyCode::Char('j') => Intent::Open(PromptKind::LobbyId),
        KeyCode::Char('l') => Intent::ListLobbies,
        KeyCode::Char('r') => Intent::Ready,
        KeyCode::Char('x') => Intent::Leave,
        KeyCode::Char('m') => Intent::Open(PromptKind::MaxRounds),
        KeyCode::Char('e') => Intent::ToggleEraser,
        KeyCode::Char('k') => Intent::ClearCanvas,
        KeyCode::Char('s') => Intent::ToggleSound,
        KeyCode::Enter if phase == Phase::Playing => Intent::SubmitDrawing,
        KeyCode::Char('q') | KeyCode::Esc => Intent::Quit,
        _ => return None,
    };
    Some(intent)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Username,
    LobbyId,
    MaxRounds,
}

impl PromptKind {
    pub fn title(&self) -> &'static str {
        match self {
            PromptKind::Username => "Username",
            PromptKind::LobbyId => "Join lobby",
            PromptKind::MaxRounds => "Rounds per game (empty = default)",
        }
    }
}

/// A validated prompt answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Username(String),
    LobbyId(String),
    /// `None` restores the server default
    MaxRounds(Option<u32>),
}

/// Result of a key press inside a prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptEvent {
    Editing,
    Cancelled,
    Submitted(Answer),
    /// Input rejected; the prompt stays open
    Invalid(&'static str),
}

/// Single-line text prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub kind: PromptKind,
    pub input: String,
    /// Last validation message
    pub error: Option<&'static str>,
}

impl Prompt {
    pub fn new(kind: PromptKind, initial: impl Into<String>) -> Self {
        Self {
            kind,
            input: initial.into(),
            error: None,
        }
    }

    pub fn key(&mut self, code: KeyCode) -> PromptEvent {
        match code {
            KeyCode::Esc => PromptEvent::Cancelled,
            KeyCode::Enter => match self.answer() {
                Ok(answer) => PromptEvent::Submitted(answer),
                Err(message) => {
                    self.error = Some(message);
                    PromptEvent::Invalid(message)
                }
            },
            KeyCode::Backspace => {
                self.input.pop();
                self.error = None;
                PromptEvent::Editing
            }
            KeyCode::Char(c) if !c.is_control() && self.input.chars().count() < MAX_INPUT => {
                self.input.push(c);
                self.error = None;
                PromptEvent::Editing
            }
            _ => PromptEvent::Editing,
        }
    }

    fn answer(&self) -> Result<Answer, &'static str> {
        let text = self.input.trim();
        match self.kind {
            PromptKind::Username if text.is_empty() => Err("Please enter a username"),
            PromptKind::Username => Ok(Answer::Username(text.to_string())),
            PromptKind::LobbyId if text.is_empty() => Err("Please enter a lobby id"),
            PromptKind::LobbyId => Ok(Answer::LobbyId(text.to_string())),
            PromptKind::MaxRounds if text.is_empty() => Ok(Answer::MaxRounds(None)),
            PromptKind::MaxRounds => match text.parse::<u32>() {
                Ok(rounds) if rounds >= 1 => Ok(Answer::MaxRounds(Some(rounds))),
                _ => Err("Enter a whole number of rounds, at least 1"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_text(prompt: &mut Prompt, text: &str) {
        for c in text.chars() {
            prompt.key(KeyCode::Char(c));
        }
    }

    #[test]
    fn test_key_mapping() {
        assert_eq!(
            intent_for(KeyCode::Char('j'), Phase::Idle),
            Some(Intent::Open(PromptKind::LobbyId))
        );
        assert_eq!(intent_for(KeyCode::Char('r'), Phase::GameOver), Some(Intent::Ready));
        assert_eq!(intent_for(KeyCode::Esc, Phase::Idle), Some(Intent::Quit));
        assert_eq!(intent_for(KeyCode::Char('z'), Phase::Idle), None);
    }

    #[test]
    fn test_enter_submits_only_while_playing() {
        assert_eq!(
            intent_for(KeyCode::Enter, Phase::Playing),
            Some(Intent::SubmitDrawing)
        );
        assert_eq!(intent_for(KeyCode::Enter, Phase::LobbyWaiting), None);
    }

    #[test]
    fn test_username_prompt() {
        let mut prompt = Prompt::new(PromptKind::Username, "");
        assert_eq!(
            prompt.key(KeyCode::Enter),
            PromptEvent::Invalid("Please enter a username")
        );
        type_text(&mut prompt, " Ann ");
        assert_eq!(prompt.error, None);
        assert_eq!(
            prompt.key(KeyCode::Enter),
            PromptEvent::Submitted(Answer::Username("Ann".to_string()))
        );
    }

    #[test]
    fn test_lobby_prompt_prefilled() {
        let mut prompt = Prompt::new(PromptKind::LobbyId, "abc123");
        prompt.key(KeyCode::Backspace);
        assert_eq!(
            prompt.key(KeyCode::Enter),
            PromptEvent::Submitted(Answer::LobbyId("abc12".to_string()))
        );
    }

    #[test]
    fn test_max_rounds_prompt() {
        let mut prompt = Prompt::new(PromptKind::MaxRounds, "");
        assert_eq!(
            prompt.key(KeyCode::Enter),
            PromptEvent::Submitted(Answer::MaxRounds(None))
        );

        type_text(&mut prompt, "0");
        assert!(matches!(prompt.key(KeyCode::Enter), PromptEvent::Invalid(_)));

        prompt.key(KeyCode::Backspace);
        type_text(&mut prompt, "7");
        assert_eq!(
            prompt.key(KeyCode::Enter),
            PromptEvent::Submitted(Answer::MaxRounds(Some(7)))
        );
    }

    #[test]
    fn test_escape_cancels() {
        let mut prompt = Prompt::new(PromptKind::Username, "Ann");
        assert_eq!(prompt.key(KeyCode::Esc), PromptEvent::Cancelled);
    }

    #[test]
    fn test_input_length_capped() {
        let mut prompt = Prompt::new(PromptKind::Username, "");
        type_text(&mut prompt, &"a".repeat(100));
        assert_eq!(prompt.input.len(), MAX_INPUT);
    }
}
