/// Outgoing "chat action" shown while a reply is being prepared.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatAction {
    UploadPhoto,
}

/// Limits of a messenger implementation.
#[derive(Clone, Copy, Debug)]
pub struct MessagingCapabilities {
    pub max_message_len: usize,
}

/// Command list entry advertised to the messenger's UI.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandInfo {
    pub command: &'static str,
    pub description: &'static str,
}
