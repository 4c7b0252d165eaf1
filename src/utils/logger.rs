// Logger initialization and log-friendly text helpers

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const DEFAULT_LOG_FILTER: &str = "safebites_agents=info,safebites=info";

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins when set. Output goes to stderr so stdout stays clean for
/// JSON results. Calling this twice is a no-op.
pub fn init_logger() {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Trimmed text cut to at most `max` bytes on a char boundary, with "..." when cut
pub fn preview_text(raw: &str, max: usize) -> String {
    let text = raw.trim();
    if max == 0 || text.len() <= max {
        return text.to_string();
    }

    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_short_text_untouched() {
        assert_eq!(preview_text("  hello  ", 160), "hello");
        assert_eq!(preview_text("hello", 0), "hello");
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        assert_eq!(preview_text("abcdef", 3), "abc...");
        // 'é' is two bytes; cutting at 2 would split it
        assert_eq!(preview_text("aébc", 2), "a...");
    }
}
