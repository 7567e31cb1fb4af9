//! Inbound message classification.
//!
//! Pure decision logic: no I/O, no state. Precedence is command, then
//! mini-app payload, then receipt-looking text.

use crate::channels::IncomingMessage;

/// Substring markers that make free-form text look like receipt QR data.
const RECEIPT_MARKERS: [&str; 2] = ["t=", "fn="];

/// Bot commands the relay answers without forwarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `/start`, `/scan`: offer the scan mini-app.
    Scan,
    /// `/privacy`, `/policy`: show the privacy notice.
    Privacy,
}

/// What an inbound message is, and the payload to forward if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Command(Command),
    /// Data sent by the embedded mini-app.
    StructuredPayload(String),
    /// Free-form text containing the receipt markers.
    PatternMatch(String),
    Unmatched,
}

impl Classification {
    /// Payload to forward upstream, for the forwarding-eligible classes.
    pub fn payload(&self) -> Option<&str> {
        match self {
            Self::StructuredPayload(p) | Self::PatternMatch(p) => Some(p),
            Self::Command(_) | Self::Unmatched => None,
        }
    }
}

/// Classify an inbound message.
///
/// `bot_username` is this bot's Telegram username; commands addressed to a
/// different bot (`/start@OtherBot`) are not commands for us. When it is
/// unknown every `@` suffix is accepted.
pub fn classify(message: &IncomingMessage, bot_username: Option<&str>) -> Classification {
    if let Some(command) = message
        .text
        .as_deref()
        .and_then(|text| parse_command(text, bot_username))
    {
        return Classification::Command(command);
    }

    if let Some(payload) = message.structured_payload.as_deref() {
        if !payload.is_empty() {
            return Classification::StructuredPayload(payload.to_string());
        }
    }

    match message.text.as_deref() {
        Some(text) if looks_like_receipt(text) => Classification::PatternMatch(text.to_string()),
        _ => Classification::Unmatched,
    }
}

/// True when `text` contains every receipt marker, in any order.
pub fn looks_like_receipt(text: &str) -> bool {
    RECEIPT_MARKERS.iter().all(|marker| text.contains(marker))
}

/// Parse a leading `/command`, tolerating our own `@botname` and trailing
/// arguments.
fn parse_command(text: &str, bot_username: Option<&str>) -> Option<Command> {
    let word = text.split_whitespace().next()?;
    let word = word.strip_prefix('/')?;
    let name = match word.split_once('@') {
        Some((name, mention)) => {
            if let Some(ours) = bot_username {
                if !mention.eq_ignore_ascii_case(ours.trim_start_matches('@')) {
                    return None;
                }
            }
            name
        }
        None => word,
    };

    match name.to_lowercase().as_str() {
        "start" | "scan" => Some(Command::Scan),
        "privacy" | "policy" => Some(Command::Privacy),
        _ => None,
    }
}
