/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Append a dictated transcript to whatever was already typed
pub fn append_transcript(current: &str, transcript: &str) -> String {
    if current.is_empty() {
        transcript.to_string()
    } else {
        format!("{} {}", current.trim(), transcript)
    }
}

/// Editable text with a cursor counted in characters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputBuffer {
    text: String,
    cursor: usize,
}

impl InputBuffer {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            cursor: text.chars().count(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn set(&mut self, text: &str) {
        self.text = text.to_string();
        self.cursor = self.text.chars().count();
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }

    pub fn insert(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.text, self.cursor);
        self.text.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn insert_str(&mut self, s: &str) {
        for c in s.chars() {
            self.insert(c);
        }
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.text, self.cursor);
            self.text.remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.text.chars().count() {
            let byte_pos = char_to_byte_index(&self.text, self.cursor);
            self.text.remove(byte_pos);
        }
    }

    pub fn left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.text.chars().count());
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.text.chars().count();
    }

    /// Characters visible in a box `width` wide, scrolled so the cursor shows.
    /// Returns the visible text and the cursor column within it.
    pub fn visible(&self, width: usize) -> (String, usize) {
        let offset = if width == 0 || self.cursor < width {
            0
        } else {
            self.cursor - width + 1
        };
        let visible: String = self
            .text
            .chars()
            .map(|c| if c == '\n' { '⏎' } else { c })
            .skip(offset)
            .take(width)
            .collect();
        (visible, self.cursor - offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_transcript_to_empty_input() {
        assert_eq!(append_transcript("", "hello there"), "hello there");
    }

    #[test]
    fn test_append_transcript_trims_existing_text() {
        assert_eq!(append_transcript("  what is  ", "rust"), "what is rust");
    }

    #[test]
    fn test_editing_is_utf8_safe() {
        let mut input = InputBuffer::new("héllo");
        input.left();
        input.left();
        input.backspace();
        assert_eq!(input.text(), "hélo");
        input.home();
        input.delete();
        assert_eq!(input.text(), "élo");
        input.insert('ñ');
        assert_eq!(input.text(), "ñélo");
        assert_eq!(input.cursor, 1);
    }

    #[test]
    fn test_cursor_stays_in_bounds() {
        let mut input = InputBuffer::new("ab");
        input.right();
        assert_eq!(input.cursor, 2);
        input.home();
        input.left();
        assert_eq!(input.cursor, 0);
        input.backspace();
        assert_eq!(input.text(), "ab");
    }

    #[test]
    fn test_visible_scrolls_to_cursor() {
        let input = InputBuffer::new("abcdefgh");
        let (text, col) = input.visible(4);
        assert_eq!(text, "fgh");
        assert_eq!(col, 3);

        let mut input = InputBuffer::new("abcdefgh");
        input.home();
        assert_eq!(input.visible(4), ("abcd".to_string(), 0));
    }

    #[test]
    fn test_blank_detection() {
        assert!(InputBuffer::new("  \n ").is_blank());
        assert!(!InputBuffer::new(" x ").is_blank());
    }
}
