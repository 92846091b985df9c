//! Placeholder heuristic: decides whether a regex match is a stand-in rather
//! than a real-looking value.
//!
//! The chain over-flags on purpose. Some genuine short codes (ex.: 3 character
//! diagnosis codes) and digit runs containing six zeros read as placeholders;
//! the validation report calls that bias out instead of tuning it away.

const DENYLIST: &[&str] = &[
    "xxx",
    "xxxx",
    "placeholder",
    "redacted",
    "example",
    "sample",
    "please",
    "share",
    "confidential",
    "document",
    "subject",
    "generated",
    "sig=xxxxx",
    "fake",
    "n/a",
    "number",
    "account",
];

const MASK_CHARS: &[char] = &['x', 'X', '*', '-', '_'];
const AMBIGUOUS_CHARS: &[char] = &['i', 'l', 'I', 'o', 'O', '0'];

/// Ordered predicate chain; the first predicate that fires wins.
pub fn is_placeholder(value: &str) -> bool {
    let value = value.trim();
    if value.is_empty() {
        return true;
    }
    let lower = value.to_lowercase();

    if DENYLIST.iter().any(|keyword| lower.contains(keyword)) {
        return true;
    }
    if lower.contains("sig=") && (lower.contains("xxxxx") || lower.contains("fake")) {
        return true;
    }

    let char_count = value.chars().count();
    if char_count >= 3 && value.chars().all(|ch| MASK_CHARS.contains(&ch)) {
        return true;
    }
    if char_count >= 6 && is_single_repeated(value) {
        return true;
    }

    let digits: Vec<char> = value.chars().filter(char::is_ascii_digit).collect();
    if !digits.is_empty() {
        if digits.iter().all(|digit| *digit == '0') {
            return true;
        }
        if digits.len() < 4 && digits.len() < char_count {
            return true;
        }
    }

    if value.chars().filter(|ch| !ch.is_whitespace()).count() <= 2 {
        return true;
    }
    if is_short_code(value) {
        return true;
    }

    let non_alnum = value.chars().filter(|ch| !ch.is_alphanumeric()).count();
    if non_alnum as f64 / char_count.max(1) as f64 > 0.6 {
        return true;
    }
    if longest_run(value, AMBIGUOUS_CHARS) >= 6 {
        return true;
    }

    is_template_token(value)
}

/// `<SOMETHING_VALUE>` style tokens produced for categories without a generator.
pub fn is_template_token(value: &str) -> bool {
    let value = value.trim();
    value.len() > 2 && value.starts_with('<') && value.ends_with('>')
}

fn is_single_repeated(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => chars.all(|ch| ch == first),
        None => false,
    }
}

/// `^[a-z0-9._-]{1,6}$`, case-insensitive.
fn is_short_code(value: &str) -> bool {
    let count = value.chars().count();
    (1..=6).contains(&count)
        && value
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-'))
}

fn longest_run(value: &str, set: &[char]) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for ch in value.chars() {
        if set.contains(&ch) {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn real_looking_values_pass() {
        for value in [
            "4111 1111 1111 1111",
            "GB82 WEST 1234 5698 7654 32",
            "123-45-6789",
            "192.168.10.24",
            "A1234567",
            "529.982.247-25",
        ] {
            assert!(!is_placeholder(value), "{value}");
        }
    }

    #[test]
    fn fixed_placeholders_are_flagged() {
        for value in [
            "",
            "   ",
            "0000 0000 0000 0000",
            "XXX-XX-XXXX",
            "XX00 XXXX XXXX XXXX XXXX",
            "000.000.000-00",
            "REDACTED_SIT_BADGE",
            "sig=XXXXX",
            "n/a",
            "******",
            "aaaaaaaa",
            "A00",
        ] {
            assert!(is_placeholder(value), "{value:?}");
        }
    }

    #[test]
    fn fallback_tokens_are_flagged() {
        assert!(is_placeholder("<EMPLOYEE_BADGE_VALUE>"));
        assert!(is_template_token("<X_VALUE>"));
        assert!(!is_template_token("<>"));
    }

    #[test]
    fn denylist_is_case_insensitive() {
        assert!(is_placeholder("Account 12345678"));
        assert!(is_placeholder("CONFIDENTIAL 99887766"));
    }

    #[test]
    fn short_codes_and_sparse_digits_over_flag() {
        assert!(is_placeholder("A12"));
        assert!(is_placeholder("abc-def1"));
        assert!(is_placeholder("I10000000"));
    }
}
