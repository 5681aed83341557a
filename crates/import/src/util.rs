/// Lazily compiled, process-wide regex accessor: `re!(re_name, r"...")`
/// defines `fn re_name() -> &'static Regex`.
macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static regex::Regex {
            static R: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
            R.get_or_init(|| regex::Regex::new($pat).expect("invalid regex"))
        }
    };
}

/// A standalone numeric token: `1,234`, `-12.5`, `(300)`. Ranges such as
/// `16-25` and codes such as `6a` are not numbers here.
pub(crate) fn is_numeric_token(token: &str) -> bool {
    re!(re_numeric, r"^(?:\(\s*[\d,]+(?:\.\d+)?\s*\)|-?[\d,]*\d(?:\.\d+)?)$");
    re_numeric().is_match(token.trim())
}

/// A token that occupies a value column: a number or a dash placeholder
/// for an empty cell.
pub(crate) fn is_value_token(token: &str) -> bool {
    is_numeric_token(token) || gmpricing_core::is_placeholder(token)
}

/// A four-digit calendar year in the range reports actually cover.
pub(crate) fn parse_year_token(token: &str) -> Option<i32> {
    let t = token.trim();
    if t.len() != 4 || !t.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let y: i32 = t.parse().ok()?;
    (1990..=2100).contains(&y).then_some(y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_tokens() {
        for t in ["10", "1,234", "-12.5", "(300)", "0.50", "2023"] {
            assert!(is_numeric_token(t), "{t}");
        }
        for t in ["16-25", "6a", "", "-", "1.2.3", "AED", "65+"] {
            assert!(!is_numeric_token(t), "{t}");
        }
    }

    #[test]
    fn dashes_hold_a_value_position() {
        for t in ["10", "-", "—", "(300)"] {
            assert!(is_value_token(t), "{t}");
        }
        for t in ["Male", "16-25", "6a"] {
            assert!(!is_value_token(t), "{t}");
        }
    }

    #[test]
    fn year_tokens() {
        assert_eq!(parse_year_token("2023"), Some(2023));
        assert_eq!(parse_year_token("1234"), None);
        assert_eq!(parse_year_token("23"), None);
        assert_eq!(parse_year_token("2023a"), None);
    }
}
