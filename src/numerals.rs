//! Combined numerals (tate-chu-yoko).
//!
//! In vertical writing a short number is set upright inside a single
//! character cell. Only isolated groups of one or two ASCII digits qualify:
//! the group must have a non-digit (or the line edge) on both sides. Runs of
//! three or more digits are left as ordinary text; no part of them is
//! combined.

use crate::document::InlineRun;

/// Longest digit run that is combined into one cell.
pub const MAX_COMBINED_DIGITS: usize = 2;

/// Split one line into plain-text and combined-numeral runs.
///
/// A linear scan over the line: each maximal digit run is measured, then
/// emitted as [`InlineRun::Combined`] when it is at most
/// [`MAX_COMBINED_DIGITS`] long, or as its own [`InlineRun::Text`] when it is
/// longer. Text between digit runs is emitted unchanged.
pub fn combine_numerals(line: &str) -> Vec<InlineRun> {
    let bytes = line.as_bytes();
    let mut runs = Vec::new();
    let mut plain_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if !bytes[i].is_ascii_digit() {
            i += 1;
            continue;
        }
        // `i` starts a maximal run: the previous byte is never a digit here.
        let start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        // ASCII digits are single bytes, so the slice bounds are char
        // boundaries and the byte length is the digit count.
        if plain_start < start {
            runs.push(InlineRun::Text(line[plain_start..start].to_string()));
        }
        let digits = &line[start..i];
        if digits.len() <= MAX_COMBINED_DIGITS {
            runs.push(InlineRun::Combined(digits.to_string()));
        } else {
            runs.push(InlineRun::Text(digits.to_string()));
        }
        plain_start = i;
    }

    if plain_start < line.len() {
        runs.push(InlineRun::Text(line[plain_start..].to_string()));
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use InlineRun::{Combined, Text};

    fn t(s: &str) -> InlineRun {
        Text(s.to_string())
    }

    fn c(s: &str) -> InlineRun {
        Combined(s.to_string())
    }

    #[test]
    fn dates_have_two_single_digit_runs() {
        assert_eq!(
            combine_numerals("今日は5月3日です。"),
            vec![t("今日は"), c("5"), t("月"), c("3"), t("日です。")]
        );
    }

    #[test]
    fn long_runs_stay_plain() {
        assert_eq!(
            combine_numerals("吾輩は猫である12345。"),
            vec![t("吾輩は猫である"), t("12345"), t("。")]
        );
    }

    #[test]
    fn two_digits_at_the_edges() {
        assert_eq!(combine_numerals("12"), vec![c("12")]);
        assert_eq!(combine_numerals("12時"), vec![c("12"), t("時")]);
        assert_eq!(combine_numerals("第1"), vec![t("第"), c("1")]);
    }

    #[test]
    fn three_digits_never_combine() {
        for line in ["123", "a123b", "西暦2024年", "1234567890", "x100"] {
            assert!(
                combine_numerals(line)
                    .iter()
                    .all(|r| !matches!(r, Combined(_))),
                "{line:?}"
            );
        }
    }

    #[test]
    fn mixed_lengths() {
        assert_eq!(
            combine_numerals("1と22と333と4444"),
            vec![
                c("1"),
                t("と"),
                c("22"),
                t("と"),
                t("333"),
                t("と"),
                t("4444")
            ]
        );
    }

    #[test]
    fn full_width_digits_are_plain() {
        assert_eq!(combine_numerals("第１章"), vec![t("第１章")]);
    }

    #[test]
    fn digits_adjacent_to_punctuation() {
        assert_eq!(
            combine_numerals("3.14"),
            vec![c("3"), t("."), c("14")]
        );
    }

    #[test]
    fn runs_concatenate_back_to_the_line() {
        for line in ["", "猫", "1", "a1b22c333d", "２０２４年12月", "末尾99"] {
            let joined: String = combine_numerals(line)
                .iter()
                .map(InlineRun::text)
                .collect();
            assert_eq!(joined, line);
        }
    }
}
