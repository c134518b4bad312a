use paper_core::chat::{ChatTurn, Role};
use textwrap::{wrap, Options};
use unicode_width::UnicodeWidthStr;

use crate::strings::{PREFIX_ASSISTANT, PREFIX_USER};

use super::{App, WrappedTurn};

impl App {
    pub fn ensure_chat_wrapped(&mut self, width: u16) {
        let width = width.max(1);
        let turns = self.transcript.turns();
        if self.chat_wrap_width != width || self.chat_cache.len() != turns.len() {
            self.chat_cache.clear();
            for t in turns {
                self.chat_cache.push(Self::wrap_turn(t, width));
            }
            self.chat_total_lines = self.chat_cache.iter().map(|w| w.lines.len()).sum();
            self.chat_wrap_width = width;
            return;
        }
        // Only the tail can have grown since the last frame.
        if let (Some(last_turn), Some(last_wrap)) = (turns.last(), self.chat_cache.last()) {
            if last_turn.content.len() != last_wrap.content_len {
                let idx = turns.len() - 1;
                self.chat_cache[idx] = Self::wrap_turn(last_turn, width);
                self.chat_total_lines = self.chat_cache.iter().map(|w| w.lines.len()).sum();
            }
        }
    }

    /// Clamp the scroll position and return (viewport, first visible line).
    pub fn compute_chat_layout(&mut self, inner_height: u16) -> (usize, usize) {
        let viewport = inner_height as usize;
        let max_scroll = self.chat_total_lines.saturating_sub(viewport);
        if self.stick_to_bottom {
            self.chat_scroll = 0;
        }
        let scroll = (self.chat_scroll as usize).min(max_scroll);
        self.chat_scroll = scroll as u16;
        (viewport, max_scroll - scroll)
    }

    fn wrap_turn(t: &ChatTurn, width: u16) -> WrappedTurn {
        let prefix = match t.role {
            Role::User => PREFIX_USER,
            Role::Assistant => PREFIX_ASSISTANT,
        };
        let full = format!("{}{}", prefix, t.content);
        let indent_width = UnicodeWidthStr::width(prefix);
        let indent = " ".repeat(indent_width);
        let opts = Options::new(width as usize).subsequent_indent(&indent);
        let lines = wrap(&full, opts)
            .into_iter()
            .map(|c| c.into_owned())
            .collect::<Vec<_>>();
        WrappedTurn {
            role: t.role.clone(),
            content_len: t.content.len(),
            lines,
        }
    }
}
