const REGEX_METACHARACTERS: &[char] = &[
    '-', '[', ']', '/', '{', '}', '(', ')', '*', '+', '?', '.', '\\', '^', '$', '|',
];

/// Escapes every regex metacharacter so the result matches `input` literally.
pub fn escape_regex_string(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if REGEX_METACHARACTERS.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Random printable password for accounts created by an admin.
pub fn generate_password(length: usize) -> String {
    let mut out = String::new();
    while out.len() < length {
        out.push_str(&uuid::Uuid::new_v4().simple().to_string());
    }
    out.truncate(length);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;
    use rstest::rstest;

    #[rstest]
    #[case("a.b")]
    #[case("(555) 123-4567")]
    #[case("^start$")]
    #[case("C:\\path\\[x]")]
    #[case("a+b*c?{2}|d/e")]
    #[case("plain")]
    fn escaped_pattern_matches_literal_input(#[case] input: &str) {
        let pattern = format!("^{}$", escape_regex_string(input));
        let re = Regex::new(&pattern).expect("escaped pattern compiles");
        assert!(re.is_match(input));
    }

    #[test]
    fn escaped_dot_does_not_match_other_chars() {
        let re = Regex::new(&format!("^{}$", escape_regex_string("a.b"))).unwrap();
        assert!(!re.is_match("axb"));
    }

    #[test]
    fn generated_password_has_requested_length() {
        assert_eq!(generate_password(12).len(), 12);
        assert_eq!(generate_password(40).len(), 40);
    }
}
