use serde::Deserialize;

/// Error envelope the backend attaches to non-2xx responses. The server has
/// emitted at least three variants over time (`detail` from the validation
/// layer, `error`/`message` from handlers), so every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerErrorBody {
    pub detail: Option<String>,
    pub error: Option<String>,
    pub message: Option<String>,
}

impl ServerErrorBody {
    /// First human-readable message carried by the envelope, if any.
    pub fn into_message(self) -> Option<String> {
        self.detail.or(self.error).or(self.message)
    }
}
