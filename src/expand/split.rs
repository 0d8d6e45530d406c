//! IFS word splitting over segment runs.
//!
//! Only segments flagged `splittable` (unquoted expansion results) are
//! inspected. Whitespace IFS characters collapse and trim; other IFS
//! characters delimit fields and can produce empty ones.

use super::{FieldBuf, Seg};
use crate::interp::state::ShellState;

pub fn split_field(st: &ShellState, buf: FieldBuf) -> Vec<FieldBuf> {
    let ifs = st.cell("IFS").map(str::to_string).unwrap_or_else(|| " \t\n".to_string());
    if ifs.is_empty() {
        return vec![buf];
    }
    let ws: Vec<char> = ifs.chars().filter(|c| c.is_whitespace()).collect();
    let hard: Vec<char> = ifs.chars().filter(|c| !c.is_whitespace()).collect();

    let mut fields: Vec<FieldBuf> = Vec::new();
    let mut cur: FieldBuf = Vec::new();
    let mut cur_text = String::new();
    // Whitespace delimiter seen; flushed on the next retained character.
    let mut pending_ws = false;
    // The field has content (or a quoted seg), so delimiters end it.
    let mut cur_started = false;

    let flush =
        |cur: &mut FieldBuf, cur_text: &mut String, fields: &mut Vec<FieldBuf>, started: &mut bool| {
            if !cur_text.is_empty() {
                cur.push(Seg { text: std::mem::take(cur_text), quoted: false, splittable: true });
            }
            fields.push(std::mem::take(cur));
            *started = false;
        };

    for seg in buf {
        if !seg.splittable {
            if pending_ws && cur_started {
                flush(&mut cur, &mut cur_text, &mut fields, &mut cur_started);
            }
            pending_ws = false;
            if !cur_text.is_empty() {
                cur.push(Seg { text: std::mem::take(&mut cur_text), quoted: false, splittable: true });
            }
            cur_started = true;
            cur.push(seg);
            continue;
        }
        for c in seg.text.chars() {
            if ws.contains(&c) {
                if cur_started {
                    pending_ws = true;
                }
                continue;
            }
            if hard.contains(&c) {
                // A hard delimiter absorbs surrounding whitespace; without
                // pending whitespace it still closes the (possibly empty)
                // current field.
                flush(&mut cur, &mut cur_text, &mut fields, &mut cur_started);
                pending_ws = false;
                continue;
            }
            if pending_ws {
                flush(&mut cur, &mut cur_text, &mut fields, &mut cur_started);
                pending_ws = false;
            }
            cur_text.push(c);
            cur_started = true;
        }
    }
    if !cur_text.is_empty() {
        cur.push(Seg { text: cur_text, quoted: false, splittable: true });
    }
    if cur_started || !cur.is_empty() {
        fields.push(cur);
    }
    if fields.is_empty() {
        // Everything split away; the caller drops the word unless quoted.
        fields.push(Vec::new());
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expand::field_text;

    fn split_texts(st: &ShellState, segs: Vec<Seg>) -> Vec<String> {
        split_field(st, segs)
            .into_iter()
            .map(|f| field_text(&f))
            .filter(|t| !t.is_empty())
            .collect()
    }

    fn expansion(text: &str) -> Seg {
        Seg { text: text.to_string(), quoted: false, splittable: true }
    }

    #[test]
    fn whitespace_collapses_and_trims() {
        let st = ShellState::new();
        assert_eq!(split_texts(&st, vec![expansion("  a   b  ")]), vec!["a", "b"]);
    }

    #[test]
    fn literal_prefix_joins_first_field() {
        let st = ShellState::new();
        let out = split_field(&st, vec![Seg::lit("x"), expansion("a b")]);
        assert_eq!(out.len(), 2);
        assert_eq!(field_text(&out[0]), "xa");
        assert_eq!(field_text(&out[1]), "b");
    }

    #[test]
    fn hard_ifs_produces_empty_fields() {
        let mut st = ShellState::new();
        st.set_cell("IFS", ":");
        let out = split_field(&st, vec![expansion("a::b")]);
        let texts: Vec<String> = out.iter().map(field_text).collect();
        assert_eq!(texts, vec!["a", "", "b"]);
    }

    #[test]
    fn leading_hard_delimiter_keeps_empty_trailing_dropped() {
        let mut st = ShellState::new();
        st.set_cell("IFS", ":");
        let out = split_field(&st, vec![expansion(":a:b:")]);
        let texts: Vec<String> = out.iter().map(field_text).collect();
        assert_eq!(texts, vec!["", "a", "b"]);
    }

    #[test]
    fn mixed_ws_and_hard_delimiters_merge() {
        let mut st = ShellState::new();
        st.set_cell("IFS", " :");
        let out = split_field(&st, vec![expansion("a : b")]);
        let texts: Vec<String> = out.iter().map(field_text).collect();
        assert_eq!(texts, vec!["a", "b"]);
    }

    #[test]
    fn empty_ifs_disables_splitting() {
        let mut st = ShellState::new();
        st.set_cell("IFS", "");
        let out = split_field(&st, vec![expansion("a b c")]);
        assert_eq!(out.len(), 1);
        assert_eq!(field_text(&out[0]), "a b c");
    }

    #[test]
    fn quoted_segments_are_opaque() {
        let st = ShellState::new();
        let out = split_field(
            &st,
            vec![Seg { text: "a b".into(), quoted: true, splittable: false }],
        );
        assert_eq!(out.len(), 1);
        assert_eq!(field_text(&out[0]), "a b");
    }
}
