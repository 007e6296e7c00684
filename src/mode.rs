#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Text,
    Image,
    Conversation,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Text => "text",
            Mode::Image => "image",
            Mode::Conversation => "conversation",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(Mode::Text),
            "image" => Some(Mode::Image),
            "conversation" | "chat" => Some(Mode::Conversation),
            _ => None,
        }
    }

    pub fn all() -> Vec<Mode> {
        vec![Mode::Text, Mode::Image, Mode::Conversation]
    }

    pub fn label(&self) -> &'static str {
        match self {
            Mode::Text => "Text Search",
            Mode::Image => "Image Search",
            Mode::Conversation => "Conversation",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Mode::Text => 0,
            Mode::Image => 1,
            Mode::Conversation => 2,
        }
    }

    /// Next mode in selector order, wrapping around
    pub fn next(&self) -> Mode {
        match self {
            Mode::Text => Mode::Image,
            Mode::Image => Mode::Conversation,
            Mode::Conversation => Mode::Text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_accepts_labels_case_insensitively() {
        assert_eq!(Mode::from_str("TEXT"), Some(Mode::Text));
        assert_eq!(Mode::from_str("image"), Some(Mode::Image));
        assert_eq!(Mode::from_str("chat"), Some(Mode::Conversation));
        assert_eq!(Mode::from_str("video"), None);
    }

    #[test]
    fn test_as_str_round_trips() {
        for mode in Mode::all() {
            assert_eq!(Mode::from_str(mode.as_str()), Some(mode));
        }
    }

    #[test]
    fn test_next_cycles_in_selector_order() {
        assert_eq!(Mode::Text.next(), Mode::Image);
        assert_eq!(Mode::Image.next(), Mode::Conversation);
        assert_eq!(Mode::Conversation.next(), Mode::Text);
        assert_eq!(Mode::all()[Mode::Image.index()], Mode::Image);
    }
}
