pub mod chat {
    use futures::Stream;
    use serde::{Deserialize, Serialize};
    use thiserror::Error;

    #[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
    pub enum Role {
        User,
        Assistant,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct ChatTurn {
        pub role: Role,
        pub content: String,
    }

    impl ChatTurn {
        pub fn user<S: Into<String>>(s: S) -> Self {
            Self {
                role: Role::User,
                content: s.into(),
            }
        }
        pub fn assistant<S: Into<String>>(s: S) -> Self {
            Self {
                role: Role::Assistant,
                content: s.into(),
            }
        }
    }

    /// One decoded unit of the chat wire protocol: either literal text to
    /// append to the reply, or the end-of-answer sentinel.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum ChatDelta {
        Text(String),
        Done,
    }

    #[derive(Error, Debug)]
    pub enum ChatError {
        #[error("network: {0}")] Network(String),
        #[error("server: {0}")] Server(String),
        #[error("timeout: {0}")] Timeout(String),
        #[error("canceled")] Canceled,
    }

    #[derive(Error, Debug)]
    pub enum UploadError {
        #[error("invalid file type: {0}")] InvalidType(String),
        #[error("io: {0}")] Io(String),
        #[error("network: {0}")] Network(String),
        #[error("server: {0}")] Server(String),
    }

    /// Terminal result of a successful document upload.
    #[derive(Clone, Debug, Deserialize)]
    pub struct Uploaded {
        pub filename: String,
    }

    pub type ChatStream = Pin<Box<dyn Stream<Item = Result<ChatDelta, ChatError>> + Send>>;

    use std::pin::Pin;
}

pub mod transcript {
    use crate::chat::{ChatTurn, Role};

    /// Append-only conversation transcript with a single mutable tail.
    ///
    /// Turns are never removed or reordered. User turns are immutable once
    /// pushed. The only mutable record is the newest assistant turn (the
    /// in-progress reply): it is created empty with [`begin_reply`], grows
    /// through [`append_reply`], and may be swapped wholesale with
    /// [`replace_reply`] when a stream fails. There is no other mutation
    /// path, so a single streaming consumer can own the tail without locks.
    ///
    /// [`begin_reply`]: Transcript::begin_reply
    /// [`append_reply`]: Transcript::append_reply
    /// [`replace_reply`]: Transcript::replace_reply
    #[derive(Debug, Default)]
    pub struct Transcript {
        turns: Vec<ChatTurn>,
    }

    impl Transcript {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn turns(&self) -> &[ChatTurn] {
            &self.turns
        }

        pub fn len(&self) -> usize {
            self.turns.len()
        }

        pub fn is_empty(&self) -> bool {
            self.turns.is_empty()
        }

        pub fn last(&self) -> Option<&ChatTurn> {
            self.turns.last()
        }

        pub fn push_user<S: Into<String>>(&mut self, text: S) {
            self.turns.push(ChatTurn::user(text));
        }

        /// Push a complete assistant turn (welcome banner, info notices).
        pub fn push_assistant<S: Into<String>>(&mut self, text: S) {
            self.turns.push(ChatTurn::assistant(text));
        }

        /// Open an empty assistant placeholder at the tail. The placeholder
        /// is the only record [`append_reply`] and [`replace_reply`] touch.
        ///
        /// [`append_reply`]: Transcript::append_reply
        /// [`replace_reply`]: Transcript::replace_reply
        pub fn begin_reply(&mut self) {
            self.turns.push(ChatTurn::assistant(String::new()));
        }

        /// Append streamed text to the tail reply. Returns false (and leaves
        /// the transcript untouched) if the tail is not an assistant turn.
        pub fn append_reply(&mut self, chunk: &str) -> bool {
            match self.turns.last_mut() {
                Some(turn) if turn.role == Role::Assistant => {
                    turn.content.push_str(chunk);
                    true
                }
                _ => false,
            }
        }

        /// Replace the tail reply's content outright. Used when a stream
        /// fails and the partial answer is swapped for an error notice.
        pub fn replace_reply<S: Into<String>>(&mut self, text: S) -> bool {
            match self.turns.last_mut() {
                Some(turn) if turn.role == Role::Assistant => {
                    turn.content = text.into();
                    true
                }
                _ => false,
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::chat::Role;

        #[test]
        fn user_turns_are_appended_in_order() {
            let mut t = Transcript::new();
            t.push_user("first");
            t.push_user("second");
            assert_eq!(t.len(), 2);
            assert_eq!(t.turns()[0].content, "first");
            assert_eq!(t.turns()[1].content, "second");
        }

        #[test]
        fn reply_grows_by_append_only() {
            let mut t = Transcript::new();
            t.push_user("hi");
            t.begin_reply();
            assert!(t.append_reply("Hel"));
            assert!(t.append_reply("lo"));
            let last = t.last().unwrap();
            assert_eq!(last.role, Role::Assistant);
            assert_eq!(last.content, "Hello");
            // Earlier turns untouched.
            assert_eq!(t.turns()[0].content, "hi");
        }

        #[test]
        fn append_refuses_when_tail_is_a_user_turn() {
            let mut t = Transcript::new();
            t.push_user("hi");
            assert!(!t.append_reply("oops"));
            assert_eq!(t.turns()[0].content, "hi");
        }

        #[test]
        fn append_refuses_on_empty_transcript() {
            let mut t = Transcript::new();
            assert!(!t.append_reply("oops"));
            assert!(t.is_empty());
        }

        #[test]
        fn replace_swaps_partial_reply_for_error_text() {
            let mut t = Transcript::new();
            t.push_user("hi");
            t.begin_reply();
            t.append_reply("partial ans");
            assert!(t.replace_reply("error notice"));
            assert_eq!(t.last().unwrap().content, "error notice");
            assert_eq!(t.len(), 2);
        }
    }
}
