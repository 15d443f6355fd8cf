/// Default base URL for chat-completion requests.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";
const MODELS_PATH: &str = "/models";

/// Normalize a base URL to the chat-completion endpoint.
///
/// Normalization rules:
/// 1) keep `/chat/completions` unchanged
/// 2) append `/completions` when path ends in `/chat`
/// 3) append `/chat/completions` otherwise
pub fn chat_completions_url(input: &str) -> String {
    let trimmed = base_or_default(input);
    if trimmed.ends_with(CHAT_COMPLETIONS_PATH) {
        return trimmed.to_string();
    }
    if trimmed.ends_with("/chat") {
        return format!("{trimmed}/completions");
    }
    format!("{trimmed}{CHAT_COMPLETIONS_PATH}")
}

/// Model-list endpoint for a base URL, which may already point at the
/// chat-completion endpoint.
pub fn models_url(input: &str) -> String {
    let trimmed = base_or_default(input);
    let root = trimmed
        .strip_suffix(CHAT_COMPLETIONS_PATH)
        .or_else(|| trimmed.strip_suffix("/chat"))
        .unwrap_or(trimmed);
    if root.ends_with(MODELS_PATH) {
        return root.to_string();
    }
    format!("{root}{MODELS_PATH}")
}

fn base_or_default(input: &str) -> &str {
    let base = if input.trim().is_empty() {
        DEFAULT_BASE_URL
    } else {
        input.trim()
    };
    base.trim_end_matches('/')
}
