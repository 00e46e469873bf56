//! Keyword classification of incoming text.

use std::fmt;

/// Reply category, in precedence order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    /// Salutations.
    Greeting,
    /// Anything that looks like a question.
    Question,
    /// Requests for assistance.
    Help,
    /// Goodbyes.
    Farewell,
    /// Small talk about the realtime connection itself.
    Realtime,
    /// Everything else.
    Default,
}

impl Category {
    /// Every category in precedence order (highest first).
    pub const PRECEDENCE: [Self; 6] = [
        Self::Greeting,
        Self::Question,
        Self::Help,
        Self::Farewell,
        Self::Realtime,
        Self::Default,
    ];

    /// Lowercase keywords that select this category. Empty for `Default`.
    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            Self::Greeting => &["hola", "hi", "buenos días", "buenas tardes", "buenas noches"],
            Self::Question => &["?", "qué", "cómo", "cuándo", "dónde", "por qué"],
            Self::Help => &["ayuda", "help", "asistencia"],
            Self::Farewell => &["adiós", "bye", "hasta luego", "nos vemos"],
            Self::Realtime => &["websocket", "tiempo real", "instantáneo"],
            Self::Default => &[],
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Greeting => "greeting",
            Self::Question => "question",
            Self::Help => "help",
            Self::Farewell => "farewell",
            Self::Realtime => "realtime",
            Self::Default => "default",
        };
        f.write_str(s)
    }
}

/// Classify text by case-insensitive substring match.
///
/// The first category in [`Category::PRECEDENCE`] with a matching keyword
/// wins; matching is plain substring, so `"hi"` also matches inside words.
pub fn classify(text: &str) -> Category {
    let lowered = text.to_lowercase();
    Category::PRECEDENCE
        .into_iter()
        .find(|category| category.keywords().iter().any(|k| lowered.contains(k)))
        .unwrap_or(Category::Default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greeting_beats_question() {
        assert_eq!(classify("hola, ¿qué hora es?"), Category::Greeting);
    }

    #[test]
    fn question_mark_alone() {
        assert_eq!(classify("¿Está abierto?"), Category::Question);
    }

    #[test]
    fn question_beats_help() {
        assert_eq!(classify("¿me das ayuda?"), Category::Question);
    }

    #[test]
    fn help_keywords() {
        assert_eq!(classify("ayuda"), Category::Help);
        assert_eq!(classify("Necesito ASISTENCIA"), Category::Help);
    }

    #[test]
    fn farewell_keywords() {
        assert_eq!(classify("Adiós amigo"), Category::Farewell);
        assert_eq!(classify("nos vemos mañana"), Category::Farewell);
    }

    #[test]
    fn help_beats_farewell() {
        assert_eq!(classify("ayuda, bye"), Category::Help);
    }

    #[test]
    fn farewell_beats_realtime() {
        assert_eq!(classify("bye websocket"), Category::Farewell);
    }

    #[test]
    fn realtime_smalltalk() {
        assert_eq!(classify("me gusta el WebSocket"), Category::Realtime);
        assert_eq!(classify("respuestas en tiempo real"), Category::Realtime);
    }

    #[test]
    fn uppercase_accented_greeting() {
        assert_eq!(classify("BUENOS DÍAS"), Category::Greeting);
    }

    #[test]
    fn substring_match_inside_words() {
        // "hi" inside "chiste" selects greeting
        assert_eq!(classify("cuéntame un chiste"), Category::Greeting);
    }

    #[test]
    fn unmatched_is_default() {
        assert_eq!(classify("el clima está bien"), Category::Default);
    }

    #[test]
    fn default_has_no_keywords() {
        assert!(Category::Default.keywords().is_empty());
        assert_eq!(Category::PRECEDENCE.last(), Some(&Category::Default));
    }
}
