// Token splitter
//
// Token count is the primary tree key, so splitting is deliberately
// literal: single-space splits, empty tokens from runs preserved.

/// Split a raw log line into tokens.
///
/// The line is trimmed, every occurrence of each extra delimiter is
/// rewritten to a single space, and the result is split on single space
/// characters. Consecutive spaces yield empty tokens, which are kept so
/// that token count stays a stable key across similar messages. An empty
/// line after trimming yields a single empty token.
pub fn tokenize(content: &str, extra_delimiters: &[String]) -> Vec<String> {
    let mut content = content.trim().to_string();
    for delimiter in extra_delimiters {
        content = content.replace(delimiter.as_str(), " ");
    }
    content.split(' ').map(str::to_string).collect()
}
