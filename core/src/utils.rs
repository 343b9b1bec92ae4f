//! Utility functions and helpers

/// Fold a string using RFC 1459 casemapping
pub fn irc_to_lower(input: &str) -> String {
    input.chars().map(irc_lower_char).collect()
}

/// RFC 1459 lowercase of a single character
pub fn irc_lower_char(c: char) -> char {
    match c {
        '[' => '{',
        ']' => '}',
        '\\' => '|',
        '~' => '^',
        _ => c.to_ascii_lowercase(),
    }
}

/// Case-insensitive comparison using RFC 1459 casemapping
pub fn irc_equals(a: &str, b: &str) -> bool {
    a.len() == b.len()
        && a.chars()
            .zip(b.chars())
            .all(|(x, y)| irc_lower_char(x) == irc_lower_char(y))
}

/// Check if a name looks like a channel name
pub fn is_channel_name(name: &str) -> bool {
    name.len() > 1
        && name.starts_with('#')
        && !name.contains(' ')
        && !name.contains(',')
        && !name.contains('\x07')
}

/// Glob match with `*` and `?` wildcards, case-insensitive under RFC 1459 casemapping
pub fn wildcard_match(pattern: &str, text: &str) -> bool {
    if pattern == "*" {
        return true;
    }

    let pattern: Vec<char> = pattern.chars().map(irc_lower_char).collect();
    let text: Vec<char> = text.chars().map(irc_lower_char).collect();

    let (mut p, mut t) = (0, 0);
    // Position of the last '*' seen and the text index it is currently absorbing up to
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == text[t]) {
            p += 1;
            t += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            backtrack = Some((p, t));
            p += 1;
        } else if let Some((star, absorbed)) = backtrack {
            p = star + 1;
            t = absorbed + 1;
            backtrack = Some((star, absorbed + 1));
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}

/// Current unix timestamp
pub fn current_unix_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_casemapping() {
        assert_eq!(irc_to_lower("#Rust[Dev]"), "#rust{dev}");
        assert!(irc_equals("Alice^", "ALICE~"));
        assert!(!irc_equals("alice", "alice2"));
    }

    #[test]
    fn test_wildcard_match() {
        assert!(wildcard_match("*!*@*.example.net", "bob!bob@host.EXAMPLE.net"));
        assert!(wildcard_match("b?b!*@*", "bob!x@y"));
        assert!(!wildcard_match("*!*@other", "bob!x@host"));
        assert!(wildcard_match("*", ""));
        assert!(wildcard_match("a*b*c", "aXXbYYc"));
        assert!(!wildcard_match("a*b*c", "aXXbYY"));
    }

    #[test]
    fn test_valid_channel_name() {
        assert!(is_channel_name("#rust"));
        assert!(!is_channel_name("#"));
        assert!(!is_channel_name("rust"));
        assert!(!is_channel_name("#a,b"));
    }
}
