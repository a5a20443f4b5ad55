use std::fmt;

#[derive(Clone, PartialEq)]
pub struct Screenshot {
    /// PNG bytes, base64 encoded.
    pub base64_data: String,
    pub width: u32,
    pub height: u32,
    /// True when the capture failed and this is a generated placeholder.
    pub is_fallback: bool,
    /// The device refused the capture (payment pages, secure input).
    pub is_sensitive: bool,
}

impl fmt::Debug for Screenshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Screenshot")
            .field("base64_len", &self.base64_data.len())
            .field("width", &self.width)
            .field("height", &self.height)
            .field("is_fallback", &self.is_fallback)
            .field("is_sensitive", &self.is_sensitive)
            .finish()
    }
}

/// Screen state observed at the start of a step.
#[derive(Debug, Clone)]
pub struct Observation {
    pub screenshot: Screenshot,
    pub current_app: String,
}
