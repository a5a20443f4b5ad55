use crate::llm::types::ChatMessage;

/// Ordered conversation sent to the model on every step.
///
/// Screenshots are single-use: the engine strips the latest user image once
/// the model has seen it, so at most one image is ever live.
#[derive(Debug, Clone, Default)]
pub struct ConversationContext {
    messages: Vec<ChatMessage>,
}

impl ConversationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_system(&mut self, text: impl Into<String>) {
        self.messages.push(ChatMessage::system(text));
    }

    pub fn push_user(&mut self, text: impl Into<String>, image_base64: Option<&str>) {
        self.messages.push(ChatMessage::user(text, image_base64));
    }

    pub fn push_assistant(&mut self, text: impl Into<String>) {
        self.messages.push(ChatMessage::assistant(text));
    }

    /// Removes the image from the most recent user message. Returns how many
    /// image parts were dropped.
    pub fn strip_last_user_image(&mut self) -> usize {
        self.messages
            .iter_mut()
            .rev()
            .find(|m| m.role == "user")
            .map(ChatMessage::strip_images)
            .unwrap_or(0)
    }

    pub fn image_count(&self) -> usize {
        self.messages.iter().map(ChatMessage::image_count).sum()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stripping_targets_the_latest_user_turn() {
        let mut ctx = ConversationContext::new();
        ctx.push_system("sys");
        ctx.push_user("first", Some("AAAA"));
        ctx.push_assistant("<think></think><answer>do(action=\"Back\")</answer>");
        ctx.push_user("second", Some("BBBB"));
        assert_eq!(ctx.image_count(), 2);

        assert_eq!(ctx.strip_last_user_image(), 1);
        assert_eq!(ctx.image_count(), 1);
        assert_eq!(ctx.messages()[3].text(), "second");
        assert_eq!(ctx.messages()[1].image_count(), 1);
    }

    #[test]
    fn clear_empties_everything() {
        let mut ctx = ConversationContext::new();
        ctx.push_system("sys");
        assert_eq!(ctx.strip_last_user_image(), 0);
        ctx.clear();
        assert!(ctx.is_empty());
    }
}
