//! Fallback participant derivation, used when a room summary lacks member
//! data.  Never overwrites participants obtained from the primary room
//! normalization path unless the caller explicitly asks for a replacement.

use std::collections::HashSet;

use cabinet_shared::{Message, Sender, User};

/// Distinct non-self senders observed in `messages`, in order of first
/// appearance, with best-effort display names.
pub fn participants_from_messages(messages: &[Message]) -> Vec<User> {
    let mut seen = HashSet::new();
    let mut users = Vec::new();

    for message in messages {
        let Sender::Other(user_id) = &message.sender else {
            continue;
        };
        if !seen.insert(user_id.clone()) {
            continue;
        }
        users.push(User {
            id: user_id.clone(),
            display_name: message
                .sender_display_name
                .clone()
                .unwrap_or_else(|| user_id.to_string()),
            role: None,
        });
    }

    users
}
