use unicode_segmentation::UnicodeSegmentation;

use super::App;

// Cursor positions count graphemes; edits translate them to byte offsets
// and splice the input string in place.
impl App {
    fn byte_at(&self, idx: usize) -> usize {
        self.input
            .grapheme_indices(true)
            .nth(idx)
            .map(|(b, _)| b)
            .unwrap_or(self.input.len())
    }

    fn grapheme_count(&self) -> usize {
        self.input.graphemes(true).count()
    }

    fn grapheme_is(&self, idx: usize, s: &str) -> bool {
        self.input.graphemes(true).nth(idx) == Some(s)
    }

    fn grapheme_blank(&self, idx: usize) -> bool {
        self.input
            .graphemes(true)
            .nth(idx)
            .map(|g| g.trim().is_empty())
            .unwrap_or(true)
    }

    pub fn insert_text(&mut self, s: &str) {
        self.input_cursor = self.input_cursor.min(self.grapheme_count());
        let at = self.byte_at(self.input_cursor);
        self.input.insert_str(at, s);
        self.input_cursor += s.graphemes(true).count();
    }

    pub fn delete_left_grapheme(&mut self) {
        if self.input_cursor == 0 {
            return;
        }
        let start = self.byte_at(self.input_cursor - 1);
        let end = self.byte_at(self.input_cursor);
        self.input.replace_range(start..end, "");
        self.input_cursor -= 1;
    }

    pub fn delete_right_grapheme(&mut self) {
        if self.input_cursor >= self.grapheme_count() {
            return;
        }
        let start = self.byte_at(self.input_cursor);
        let end = self.byte_at(self.input_cursor + 1);
        self.input.replace_range(start..end, "");
    }

    pub fn move_cursor_line_start(&mut self) {
        while self.input_cursor > 0 && !self.grapheme_is(self.input_cursor - 1, "\n") {
            self.input_cursor -= 1;
        }
    }

    pub fn move_cursor_line_end(&mut self) {
        let count = self.grapheme_count();
        while self.input_cursor < count && !self.grapheme_is(self.input_cursor, "\n") {
            self.input_cursor += 1;
        }
    }

    pub fn delete_prev_word(&mut self) {
        if self.input_cursor == 0 {
            return;
        }
        let mut i = self.input_cursor;
        while i > 0 && self.grapheme_blank(i - 1) {
            i -= 1;
        }
        while i > 0 && !self.grapheme_blank(i - 1) {
            i -= 1;
        }
        let start = self.byte_at(i);
        let end = self.byte_at(self.input_cursor);
        self.input.replace_range(start..end, "");
        self.input_cursor = i;
    }

    pub fn kill_to_line_start(&mut self) {
        let end = self.byte_at(self.input_cursor);
        self.move_cursor_line_start();
        let start = self.byte_at(self.input_cursor);
        if start < end {
            self.input.replace_range(start..end, "");
        }
    }

    pub fn kill_to_line_end(&mut self) {
        let start = self.byte_at(self.input_cursor);
        let mut j = self.input_cursor;
        let count = self.grapheme_count();
        while j < count && !self.grapheme_is(j, "\n") {
            j += 1;
        }
        let end = self.byte_at(j);
        if start < end {
            self.input.replace_range(start..end, "");
        }
    }
}
