//! Masking helpers. Nothing leaves this crate with a raw secret in it.

/// Characters kept visible at each end of a long secret.
const VISIBLE_CHARS: usize = 3;

/// Secrets shorter than this are starred out completely.
const MIN_PARTIAL_LEN: usize = 16;

/// Context kept on each side of a match in a snippet.
pub const SNIPPET_CONTEXT_CHARS: usize = 10;

/// Mask a secret value.
///
/// Long values keep their first and last three characters; anything shorter
/// than 16 characters becomes all stars. The output always has the same
/// character count as the input.
#[must_use]
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() < MIN_PARTIAL_LEN {
        return "*".repeat(chars.len());
    }

    let head: String = chars[..VISIBLE_CHARS].iter().collect();
    let tail: String = chars[chars.len() - VISIBLE_CHARS..].iter().collect();
    format!(
        "{head}{}{tail}",
        "*".repeat(chars.len() - VISIBLE_CHARS * 2)
    )
}

/// Replace every span of `line` with its masked form.
///
/// `spans` are byte ranges, sorted and non-overlapping. Returns the masked line
/// and the byte ranges the masks occupy in it.
#[must_use]
pub fn mask_spans(line: &str, spans: &[(usize, usize)]) -> (String, Vec<(usize, usize)>) {
    let mut output = String::with_capacity(line.len());
    let mut moved = Vec::with_capacity(spans.len());
    let mut cursor = 0;

    for &(start, end) in spans {
        output.push_str(&line[cursor..start]);
        let masked_start = output.len();
        output.push_str(&mask_secret(&line[start..end]));
        moved.push((masked_start, output.len()));
        cursor = end;
    }
    output.push_str(&line[cursor..]);

    (output, moved)
}

/// Up to `radius` characters either side of `start..end`, respecting char
/// boundaries.
#[must_use]
pub fn window(text: &str, start: usize, end: usize, radius: usize) -> &str {
    let from = text[..start]
        .char_indices()
        .rev()
        .take(radius)
        .last()
        .map_or(start, |(idx, _)| idx);
    let to = text[end..]
        .char_indices()
        .nth(radius)
        .map_or(text.len(), |(idx, _)| end + idx);
    &text[from..to]
}

/// Shannon entropy in bits per character.
#[must_use]
pub fn shannon_entropy(value: &str) -> f64 {
    let mut counts: std::collections::HashMap<char, usize> = std::collections::HashMap::new();
    let mut total = 0usize;
    for c in value.chars() {
        *counts.entry(c).or_default() += 1;
        total += 1;
    }
    if total == 0 {
        return 0.0;
    }

    let len = total as f64;
    counts
        .values()
        .map(|&count| {
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}
