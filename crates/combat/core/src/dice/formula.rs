//! Textual rewrites applied to formulas before evaluation.

use crate::config::RulesConfig;

/// Builds the check formula: `1d20`, or `(1+bonus)d20kh1` with bonus dice,
/// minus a flat penalty, plus the check attribute.
pub fn check_formula(bonus_dice: u32, penalty: u32, attribute: Option<&str>) -> String {
    let sides = RulesConfig::CHECK_DIE_SIDES;
    let mut formula = if bonus_dice > 0 {
        format!("{}d{sides}kh1", bonus_dice.saturating_add(1))
    } else {
        format!("1d{sides}")
    };
    if penalty > 0 {
        formula.push_str(&format!(" - {penalty}"));
    }
    if let Some(attribute) = attribute {
        formula.push_str(&format!(" + @{attribute}"));
    }
    formula
}

/// Doubles the dice count of every `NdM` token. Flat modifiers and die sizes
/// are untouched: `2d6+3` becomes `4d6+3`.
pub fn double_dice_counts(formula: &str) -> String {
    rewrite_dice(formula, |count, sides| format!("{}d{sides}", count.saturating_mul(2)))
}

/// Adds `extra` dice to every `NdM` token while keeping the original count of
/// best results: `2d6` with one extra becomes `3d6kh2`.
pub fn reroll_dice(formula: &str, extra: u32) -> String {
    if extra == 0 {
        return formula.to_owned();
    }
    rewrite_dice(formula, |count, sides| {
        format!("{}d{sides}kh{count}", count.saturating_add(extra))
    })
}

/// Calls `rewrite` for each `<digits>d<digits>` token and splices the result in.
fn rewrite_dice(formula: &str, rewrite: impl Fn(u32, u32) -> String) -> String {
    let bytes = formula.as_bytes();
    let mut out = String::with_capacity(formula.len() + 4);
    let mut i = 0;
    while i < bytes.len() {
        let boundary = i == 0 || !bytes[i - 1].is_ascii_alphanumeric();
        if boundary && bytes[i].is_ascii_digit() {
            let count_end = scan_digits(bytes, i);
            if bytes.get(count_end) == Some(&b'd') {
                let sides_end = scan_digits(bytes, count_end + 1);
                if sides_end > count_end + 1 {
                    let count = formula[i..count_end].parse::<u32>();
                    let sides = formula[count_end + 1..sides_end].parse::<u32>();
                    if let (Ok(count), Ok(sides)) = (count, sides) {
                        out.push_str(&rewrite(count, sides));
                        i = sides_end;
                        continue;
                    }
                }
            }
            out.push_str(&formula[i..count_end]);
            i = count_end;
            continue;
        }
        // advance by a whole char to stay on UTF-8 boundaries
        let ch_len = formula[i..].chars().next().map_or(1, char::len_utf8);
        out.push_str(&formula[i..i + ch_len]);
        i += ch_len;
    }
    out
}

fn scan_digits(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubling_changes_counts_only() {
        assert_eq!(double_dice_counts("2d6+3"), "4d6+3");
        assert_eq!(double_dice_counts("1d8 + 1d4 + @mag"), "2d8 + 2d4 + @mag");
        assert_eq!(double_dice_counts("12"), "12");
        assert_eq!(double_dice_counts("d6"), "d6");
    }

    #[test]
    fn reroll_keeps_original_count() {
        assert_eq!(reroll_dice("2d6+1", 1), "3d6kh2+1");
        assert_eq!(reroll_dice("2d6", 0), "2d6");
    }

    #[test]
    fn oversized_counts_saturate() {
        assert_eq!(double_dice_counts("4294967295d6"), "4294967295d6");
        assert_eq!(reroll_dice("4294967295d6", 2), "4294967295d6kh4294967295");
        assert_eq!(check_formula(u32::MAX, 0, None), "4294967295d20kh1");
    }

    #[test]
    fn check_formula_variants() {
        assert_eq!(check_formula(0, 0, None), "1d20");
        assert_eq!(check_formula(1, 0, Some("dex")), "2d20kh1 + @dex");
        assert_eq!(check_formula(2, 3, None), "3d20kh1 - 3");
    }
}
