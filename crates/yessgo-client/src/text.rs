/*
[INPUT]:  User-entered text
[OUTPUT]: Text with the banned emoji character class removed
[POS]:    Input layer - pure filter applied before validation
[UPDATE]: When the banned character ranges change
*/

/// Miscellaneous symbols and dingbats (includes U+2764 heavy black heart)
const SYMBOL_RANGE: std::ops::RangeInclusive<u32> = 0x2600..=0x27BF;
/// Pictographs, emoticons, transport and supplemental symbols
const PICTOGRAPH_RANGE: std::ops::RangeInclusive<u32> = 0x1F300..=0x1FAFF;

/// Whether `c` belongs to the banned emoji class
pub fn is_emoji(c: char) -> bool {
    let code = c as u32;
    SYMBOL_RANGE.contains(&code) || PICTOGRAPH_RANGE.contains(&code)
}

pub fn contains_emoji(text: &str) -> bool {
    text.chars().any(is_emoji)
}

/// Remove every banned character, leaving the rest of the text untouched
pub fn strip_emoji(text: &str) -> String {
    text.chars().filter(|c| !is_emoji(*c)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Hello World", false)]
    #[case("123456", false)]
    #[case("Test@example.com", false)]
    #[case("Привет мир", false)]
    #[case("Hello 😀 World", true)]
    #[case("👍", true)]
    #[case("❤", true)]
    #[case("🚀", true)]
    #[case("Multiple 😀👍 emoji", true)]
    #[case("", false)]
    fn test_contains_emoji(#[case] text: &str, #[case] expected: bool) {
        assert_eq!(contains_emoji(text), expected);
    }

    #[rstest]
    #[case("Hello World", "Hello World")]
    #[case("Привет мир", "Привет мир")]
    #[case("Hello 😀 World", "Hello  World")]
    #[case("❤", "")]
    #[case("Test 😊 Test", "Test  Test")]
    #[case("Text with 😀 and 👍", "Text with  and ")]
    #[case("", "")]
    fn test_strip_emoji(#[case] text: &str, #[case] expected: &str) {
        assert_eq!(strip_emoji(text), expected);
    }

    #[test]
    fn test_non_emoji_astral_chars_survive() {
        // U+1D11E musical symbol G clef sits outside the banned ranges
        assert_eq!(strip_emoji("\u{1D11E}"), "\u{1D11E}");
    }
}
