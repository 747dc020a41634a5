/// CJK Unified Ideographs, Extension A and Extension B.
pub fn is_cjk(c: char) -> bool {
    matches!(c as u32, 0x4E00..=0x9FFF | 0x3400..=0x4DBF | 0x20000..=0x2A6DF)
}

#[inline]
fn is_word_char(c: char) -> bool {
    c.is_ascii_digit() || c.is_ascii_lowercase()
}

/// Tokenize text into index terms.
///
/// The input is lowercased, then scanned codepoint by codepoint: runs of ASCII
/// letters/digits become one term when at least two characters long, runs of
/// CJK ideographs are shingled into overlapping bigrams, everything else is a
/// separator. Terms come out in input order and may repeat.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered: Vec<char> = text.to_lowercase().chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < lowered.len() {
        let c = lowered[i];
        if is_word_char(c) {
            let start = i;
            while i < lowered.len() && is_word_char(lowered[i]) {
                i += 1;
            }
            if i - start >= 2 {
                tokens.push(lowered[start..i].iter().collect());
            }
        } else if is_cjk(c) {
            let start = i;
            while i < lowered.len() && is_cjk(lowered[i]) {
                i += 1;
            }
            tokens.extend(lowered[start..i].windows(2).map(|pair| pair.iter().collect::<String>()));
        } else {
            i += 1;
        }
    }
    tokens
}
