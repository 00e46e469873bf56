//! Canned replies per category.

use crate::classify::Category;

const GREETING: &[&str] = &[
    "¡Hola! ¿Cómo estás?",
    "¡Saludos! ¿En qué puedo ayudarte?",
    "¡Hola! Me da mucho gusto verte por aquí.",
];

const QUESTION: &[&str] = &[
    "Esa es una excelente pregunta. ¿Podrías ser más específico?",
    "Interesante pregunta. Déjame pensar en eso...",
    "Me gusta tu curiosidad. ¿Hay algo más que te gustaría saber?",
];

const HELP: &[&str] = &[
    "Estoy aquí para ayudarte. ¿Qué necesitas?",
    "Puedo ayudarte con información general. ¿Qué te interesa?",
    "¡Por supuesto! Estoy aquí para asistirte.",
];

const FAREWELL: &[&str] = &[
    "¡Hasta luego! Fue un placer charlar contigo.",
    "¡Adiós! Que tengas un excelente día.",
    "¡Nos vemos pronto! Cuídate mucho.",
];

const REALTIME: &[&str] = &[
    "¡Genial! Estamos usando WebSocket para comunicación en tiempo real!",
    "WebSocket permite respuestas instantáneas. ¿No es genial?",
    "La conexión WebSocket está funcionando perfectamente.",
];

const DEFAULT: &[&str] = &[
    "Eso es muy interesante. ¿Podrías contarme más?",
    "Entiendo. ¿Hay algo específico en lo que pueda ayudarte?",
    "Gracias por compartir eso conmigo. ¿Qué más te gustaría saber?",
    "Me parece fascinante. ¿Tienes alguna pregunta?",
];

/// The reply set for a category. Never empty.
pub fn replies(category: Category) -> &'static [&'static str] {
    match category {
        Category::Greeting => GREETING,
        Category::Question => QUESTION,
        Category::Help => HELP,
        Category::Farewell => FAREWELL,
        Category::Realtime => REALTIME,
        Category::Default => DEFAULT,
    }
}
