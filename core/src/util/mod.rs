mod ring_bytes;

pub use ring_bytes::RingBytes;

/// Truncate to at most `max` chars, appending an ellipsis when cut.
pub fn preview(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((end, _)) => {
            let mut out = s[..end].to_string();
            out.push('…');
            out
        }
    }
}
