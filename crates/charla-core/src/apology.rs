//! Fixed user-facing texts returned in place of a bot reply.

/// Returned when the input is empty or whitespace-only.
pub const INVALID_MESSAGE: &str = "Por favor, escribe un mensaje válido.";

/// Returned when the realtime channel produced no reply before the deadline.
pub const TIMED_OUT: &str = "Lo siento, el servidor tardó demasiado en responder.";

/// Returned for any transport or responder failure.
pub const PROCESSING_FAILED: &str = "Lo siento, hubo un error al procesar tu mensaje.";

/// Error body the server sends when a request carries no usable message.
pub const MESSAGE_REQUIRED: &str = "Mensaje requerido";
