//! Token estimation for indexed content

/// Estimate how many BPE tokens a consumer would spend reading `text`.
///
/// Symbol-dense source tokenizes at roughly 3 chars/token, prose at about 4.
/// The ratio is interpolated on the share of punctuation typical of code.
pub fn estimate_tokens(text: &str) -> usize {
    if text.trim().is_empty() {
        return 0;
    }

    let total_chars = text.chars().count();
    let punctuation = text
        .chars()
        .filter(|&c| "{}[]();:=<>,.|&!*+-/\\\"'`".contains(c))
        .count();

    let density = (punctuation as f64 / total_chars as f64 * 6.0).min(1.0);
    let chars_per_token = 4.0 - density;

    ((total_chars as f64 / chars_per_token).ceil() as usize).max(1)
}
