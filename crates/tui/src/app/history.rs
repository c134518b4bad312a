use unicode_segmentation::UnicodeSegmentation;

use super::App;

impl App {
    // Record input text to history if it's new, and reset history navigation state.
    pub fn record_history_entry(&mut self, text: &str) {
        if let Some(last) = self.history.last() {
            if last == text {
                self.history_index = None;
                return;
            }
        }
        self.history.push(text.to_string());
        self.history_index = None;
    }

    pub fn history_prev(&mut self) {
        if self.history.is_empty() {
            return;
        }
        let idx = match self.history_index {
            None => self.history.len() - 1,
            Some(0) => 0,
            Some(i) => i - 1,
        };
        self.history_index = Some(idx);
        self.input = self.history[idx].clone();
        self.input_cursor = self.input.graphemes(true).count();
        self.dirty = true;
    }

    pub fn history_next(&mut self) {
        let Some(i) = self.history_index else {
            return;
        };
        if i + 1 < self.history.len() {
            self.history_index = Some(i + 1);
            self.input = self.history[i + 1].clone();
        } else {
            self.history_index = None;
            self.input.clear();
        }
        self.input_cursor = self.input.graphemes(true).count();
        self.dirty = true;
    }
}
