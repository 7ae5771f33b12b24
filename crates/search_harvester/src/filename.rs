use crate::types::PageIndex;

/// `{prefix}_{page:02}.json`, with the prefix made safe for Windows file systems.
pub fn page_filename(prefix: &str, page: PageIndex) -> String {
    format!("{}_{page:02}.json", sanitize_stem(prefix, "page"))
}

/// `{stem}.csv`, with the stem made safe for Windows file systems.
pub fn csv_filename(stem: &str) -> String {
    format!("{}.csv", sanitize_stem(stem, "records"))
}

fn sanitize_stem(input: &str, fallback: &str) -> String {
    let cleaned: String = input
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim_matches(&['_', ' ', '.'][..]);
    if cleaned.is_empty() {
        return fallback.to_string();
    }

    // Collapse multiple underscores
    let mut compacted = String::with_capacity(cleaned.len());
    let mut prev_underscore = false;
    for c in cleaned.chars() {
        if c == '_' && prev_underscore {
            continue;
        }
        prev_underscore = c == '_';
        compacted.push(c);
    }
    if is_reserved_windows_name(&compacted) {
        compacted.push('_');
    }
    compacted
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_suffix_is_zero_padded() {
        assert_eq!(page_filename("modern_love", 0), "modern_love_00.json");
        assert_eq!(page_filename("modern_love", 7), "modern_love_07.json");
        assert_eq!(page_filename("modern_love", 61), "modern_love_61.json");
        assert_eq!(page_filename("modern_love", 123), "modern_love_123.json");
    }

    #[test]
    fn unsafe_prefixes_are_cleaned() {
        assert_eq!(page_filename("a/b::c", 1), "a_b_c_01.json");
        assert_eq!(page_filename("  ..", 1), "page_01.json");
        assert_eq!(csv_filename("CON"), "CON_.csv");
        assert_eq!(csv_filename("podcasts?"), "podcasts.csv");
    }
}
