/// Reply used for anything the bot does not recognise.
pub const DEFAULT_REPLY: &str = "I only know one trick: say \"Hello\".";

/// Pick the reply text for an inbound message.
#[must_use]
pub fn reply_for(text: &str) -> &'static str {
    if text.trim().eq_ignore_ascii_case("hello") {
        "World!"
    } else {
        DEFAULT_REPLY
    }
}
