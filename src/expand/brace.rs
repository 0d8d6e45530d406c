//! Brace expansion: purely syntactic, runs before everything else.
//!
//! `{a,b}` multiplies the surrounding word; ranges pad and step. A mixed-
//! case character range is reported as a soft error and left literal.

use crate::ast::{BraceItem, WordPart};
use crate::interp::flow::Interrupt;
use crate::interp::state::ShellState;

/// Multiply a part list across its brace parts.
pub fn expand(
    st: &mut ShellState,
    parts: &[WordPart],
) -> Result<Vec<Vec<WordPart>>, Interrupt> {
    let mut result: Vec<Vec<WordPart>> = vec![Vec::new()];
    for part in parts {
        match part {
            WordPart::Brace(items) => {
                let mut variants: Vec<Vec<WordPart>> = Vec::new();
                for item in items {
                    variants.extend(item_variants(st, item)?);
                }
                let mut next = Vec::with_capacity(result.len() * variants.len());
                for prefix in &result {
                    for variant in &variants {
                        let mut combined = prefix.clone();
                        combined.extend(variant.clone());
                        next.push(combined);
                    }
                }
                result = next;
            }
            other => {
                for word in &mut result {
                    word.push(other.clone());
                }
            }
        }
    }
    Ok(result)
}

fn item_variants(
    st: &mut ShellState,
    item: &BraceItem,
) -> Result<Vec<Vec<WordPart>>, Interrupt> {
    match item {
        BraceItem::Word(w) => expand(st, &w.parts),
        BraceItem::NumRange { from, to, step, width } => {
            let mut out = Vec::new();
            for n in number_sequence(*from, *to, *step) {
                out.push(vec![WordPart::Literal(pad_number(n, *width))]);
            }
            Ok(out)
        }
        BraceItem::CharRange { from, to, step } => {
            if from.is_ascii_lowercase() != to.is_ascii_lowercase() {
                st.expansion_stderr.push_str(&format!(
                    "bash: bad brace range `{{{from}..{to}}}'\n"
                ));
                let mut literal = format!("{{{from}..{to}");
                if let Some(s) = step {
                    literal.push_str(&format!("..{s}"));
                }
                literal.push('}');
                return Ok(vec![vec![WordPart::Literal(literal)]]);
            }
            let seq = number_sequence(*from as i64, *to as i64, *step);
            Ok(seq
                .into_iter()
                .filter_map(|n| char::from_u32(n as u32))
                .map(|c| vec![WordPart::Literal(c.to_string())])
                .collect())
        }
    }
}

/// Inclusive sequence; step 0 behaves as 1 and the sign of the step is
/// ignored in favor of the natural direction.
fn number_sequence(from: i64, to: i64, step: Option<i64>) -> Vec<i64> {
    let mut step = step.unwrap_or(1).abs();
    if step == 0 {
        step = 1;
    }
    let mut out = Vec::new();
    if from <= to {
        let mut n = from;
        while n <= to {
            out.push(n);
            n += step;
        }
    } else {
        let mut n = from;
        while n >= to {
            out.push(n);
            n -= step;
        }
    }
    out
}

fn pad_number(n: i64, width: usize) -> String {
    if width == 0 {
        n.to_string()
    } else if n < 0 {
        format!("-{:0>width$}", n.unsigned_abs(), width = width.saturating_sub(1))
    } else {
        format!("{n:0>width$}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Word;
    use crate::parser::word::parse_word;

    fn expand_to_strings(src: &str) -> Vec<String> {
        let word: Word = parse_word(src, 1).unwrap();
        let mut st = ShellState::new();
        expand(&mut st, &word.parts)
            .unwrap()
            .into_iter()
            .map(|parts| {
                parts
                    .iter()
                    .map(|p| match p {
                        WordPart::Literal(s) => s.clone(),
                        other => panic!("{other:?}"),
                    })
                    .collect::<String>()
            })
            .collect()
    }

    #[test]
    fn comma_list() {
        assert_eq!(expand_to_strings("a{b,c}d"), vec!["abd", "acd"]);
    }

    #[test]
    fn nested_lists() {
        assert_eq!(expand_to_strings("{a,{b,c}}"), vec!["a", "b", "c"]);
    }

    #[test]
    fn numeric_range_with_padding() {
        assert_eq!(
            expand_to_strings("{05..10}"),
            vec!["05", "06", "07", "08", "09", "10"]
        );
    }

    #[test]
    fn descending_range_ignores_step_sign() {
        assert_eq!(expand_to_strings("{5..1..2}"), vec!["5", "3", "1"]);
        assert_eq!(expand_to_strings("{1..5..-2}"), vec!["1", "3", "5"]);
    }

    #[test]
    fn char_range() {
        assert_eq!(expand_to_strings("{a..e..2}"), vec!["a", "c", "e"]);
    }

    #[test]
    fn mixed_case_range_is_soft_error() {
        let word: Word = parse_word("{a..Z}", 1).unwrap();
        let mut st = ShellState::new();
        let out = expand(&mut st, &word.parts).unwrap();
        assert_eq!(out.len(), 1);
        assert!(st.expansion_stderr.contains("bad brace range"));
    }

    #[test]
    fn cartesian_product() {
        assert_eq!(
            expand_to_strings("{a,b}{1,2}"),
            vec!["a1", "a2", "b1", "b2"]
        );
    }
}
