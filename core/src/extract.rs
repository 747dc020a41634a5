use lazy_static::lazy_static;
use regex::Regex;
use std::path::Path;

lazy_static! {
    static ref SCRIPT: Regex = Regex::new(r"(?is)<script.*?</script>").expect("valid regex");
    static ref STYLE: Regex = Regex::new(r"(?is)<style.*?</style>").expect("valid regex");
    static ref TAG: Regex = Regex::new(r"<[^>]+>").expect("valid regex");
    static ref SPACE: Regex = Regex::new(r"\s+").expect("valid regex");
    static ref TITLE: Regex = Regex::new(r"(?i)<title>(.*?)</title>").expect("valid regex");
}

/// Plain text of an HTML page: script and style blocks dropped, tags replaced
/// by spaces, whitespace collapsed and trimmed.
pub fn html_to_text(html: &str) -> String {
    let text = SCRIPT.replace_all(html, "");
    let text = STYLE.replace_all(&text, "");
    let text = TAG.replace_all(&text, " ");
    SPACE.replace_all(&text, " ").trim().to_string()
}

/// Contents of the first `<title>` element, if present and non-empty.
pub fn extract_title(html: &str) -> Option<String> {
    TITLE
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .filter(|t| !t.is_empty())
        .map(String::from)
}

/// Title of a page, falling back to the file's base name.
pub fn title_or_basename(html: &str, path: &Path) -> String {
    extract_title(html).unwrap_or_else(|| {
        path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
    })
}

/// First `n` characters of `s`.
pub fn prefix_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_scripts_styles_and_tags() {
        let html = "<html><head><STYLE>p{color:red}</STYLE><script type=\"x\">var a = '<b>';\n</Script></head>\
                    <body><p>Hello\n\n  <b>world</b></p></body></html>";
        assert_eq!(html_to_text(html), "Hello world");
    }

    #[test]
    fn title_falls_back_to_basename() {
        assert_eq!(title_or_basename("<TITLE>Intro</TITLE>", Path::new("a/b.html")), "Intro");
        assert_eq!(title_or_basename("<title></title>", Path::new("a/b.html")), "b.html");
        assert_eq!(title_or_basename("<p>no title</p>", Path::new("x.htm")), "x.htm");
    }

    #[test]
    fn prefix_counts_characters() {
        assert_eq!(prefix_chars("中文字符", 2), "中文");
        assert_eq!(prefix_chars("ab", 5), "ab");
        assert_eq!(prefix_chars("", 3), "");
    }
}
