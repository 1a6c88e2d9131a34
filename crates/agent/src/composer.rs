//! Prompt composition — persona, windowed history, then the new input.

use kotodama_core::message::{Message, Role};
use kotodama_core::persona::Persona;

/// How much stored history is forwarded to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryWindow {
    /// Every stored turn.
    Unbounded,
    /// The most recent `k` stored turns (messages, not exchanges).
    LastTurns(usize),
}

impl HistoryWindow {
    /// Window from a configured turn count, where `0` means unbounded.
    pub fn from_turns(turns: usize) -> Self {
        if turns == 0 {
            Self::Unbounded
        } else {
            Self::LastTurns(turns)
        }
    }

    /// The tail of `history` that falls inside the window.
    pub fn apply<'a>(&self, history: &'a [Message]) -> &'a [Message] {
        match *self {
            Self::Unbounded => history,
            Self::LastTurns(k) => &history[history.len().saturating_sub(k)..],
        }
    }
}

impl Default for HistoryWindow {
    fn default() -> Self {
        Self::LastTurns(6)
    }
}

/// Builds the message list sent to the model.
#[derive(Debug, Clone, Default)]
pub struct PromptComposer {
    window: HistoryWindow,
}

impl PromptComposer {
    pub fn new(window: HistoryWindow) -> Self {
        Self { window }
    }

    /// `[system: persona, ...windowed history, user: input]`.
    ///
    /// System messages found in `history` are dropped so the persona only
    /// ever appears once, at the head.
    pub fn compose(&self, persona: &Persona, history: &[Message], input: &str) -> Vec<Message> {
        let window = self.window.apply(history);

        let mut messages = Vec::with_capacity(window.len() + 2);
        messages.push(Message::system(&persona.system_prompt));
        messages.extend(
            window
                .iter()
                .filter(|m| m.role != Role::System)
                .cloned(),
        );
        messages.push(Message::user(input));
        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn persona() -> Persona {
        Persona::inline("test", "You are a test persona.")
    }

    fn history(n_exchanges: usize) -> Vec<Message> {
        (0..n_exchanges)
            .flat_map(|i| [Message::user(format!("q{i}")), Message::assistant(format!("a{i}"))])
            .collect()
    }

    fn contents(messages: &[Message]) -> Vec<&str> {
        messages.iter().map(|m| m.content.as_str()).collect()
    }

    #[test]
    fn empty_history() {
        let prompt = PromptComposer::default().compose(&persona(), &[], "Hello");
        assert_eq!(prompt.len(), 2);
        assert_eq!(prompt[0].role, Role::System);
        assert_eq!(prompt[0].content, "You are a test persona.");
        assert_eq!(prompt[1].role, Role::User);
        assert_eq!(prompt[1].content, "Hello");
    }

    #[test]
    fn unbounded_keeps_everything_in_order() {
        let composer = PromptComposer::new(HistoryWindow::Unbounded);
        let prompt = composer.compose(&persona(), &history(5), "next");
        assert_eq!(prompt.len(), 12);
        assert_eq!(
            contents(&prompt[1..11]),
            vec!["q0", "a0", "q1", "a1", "q2", "a2", "q3", "a3", "q4", "a4"]
        );
        assert_eq!(prompt[11].content, "next");
    }

    #[test]
    fn default_window_keeps_last_six_turns() {
        let prompt = PromptComposer::default().compose(&persona(), &history(5), "next");
        assert_eq!(
            contents(&prompt),
            vec![
                "You are a test persona.",
                "q2", "a2", "q3", "a3", "q4", "a4",
                "next"
            ]
        );
    }

    #[test]
    fn window_of_one_keeps_latest_turn() {
        let mut stored = history(1);
        stored.push(Message::user("dangling"));
        let composer = PromptComposer::new(HistoryWindow::LastTurns(1));
        let prompt = composer.compose(&persona(), &stored, "now");
        assert_eq!(contents(&prompt[1..]), vec!["dangling", "now"]);
    }

    #[test]
    fn window_larger_than_history() {
        let composer = PromptComposer::new(HistoryWindow::LastTurns(100));
        let prompt = composer.compose(&persona(), &history(2), "x");
        assert_eq!(prompt.len(), 6);
    }

    #[test]
    fn system_messages_in_history_are_dropped() {
        let stored = vec![
            Message::system("leaked"),
            Message::user("q"),
            Message::assistant("a"),
        ];
        let composer = PromptComposer::new(HistoryWindow::Unbounded);
        let prompt = composer.compose(&persona(), &stored, "x");
        assert_eq!(
            prompt.iter().filter(|m| m.role == Role::System).count(),
            1
        );
        assert_eq!(prompt[0].content, "You are a test persona.");
    }

    #[test]
    fn zero_turns_means_unbounded() {
        assert_eq!(HistoryWindow::from_turns(0), HistoryWindow::Unbounded);
        assert_eq!(HistoryWindow::from_turns(4), HistoryWindow::LastTurns(4));
    }
}
