//! Array access over the flat variable store.
//!
//! Indexed arrays keep cells at `name_0`, `name_1`, ...; associative
//! arrays at `name_<key>`. Iteration is numeric order for indexed arrays
//! and sorted-key order for associative ones.

use crate::interp::state::ShellState;

pub fn index_cell(name: &str, idx: i64) -> String {
    format!("{name}_{idx}")
}

pub fn assoc_cell(name: &str, key: &str) -> String {
    format!("{name}_{key}")
}

/// Sorted numeric indices present for `name`.
pub fn indices(st: &ShellState, name: &str) -> Vec<i64> {
    let prefix = format!("{name}_");
    let mut out: Vec<i64> = st
        .vars
        .keys()
        .filter_map(|k| k.strip_prefix(&prefix))
        .filter_map(|rest| {
            let idx: i64 = rest.parse().ok()?;
            // Reject `name_007`-style keys that are not canonical indices.
            (idx.to_string() == rest).then_some(idx)
        })
        .collect();
    out.sort_unstable();
    out
}

/// Sorted keys of an associative array.
pub fn assoc_keys(st: &ShellState, name: &str) -> Vec<String> {
    let prefix = format!("{name}_");
    let mut out: Vec<String> = st
        .vars
        .keys()
        .filter_map(|k| k.strip_prefix(&prefix))
        .map(str::to_string)
        .collect();
    out.sort();
    out
}

pub fn max_index(st: &ShellState, name: &str) -> Option<i64> {
    indices(st, name).into_iter().max()
}

/// Number of set elements; a bare scalar counts as one element.
pub fn len(st: &ShellState, name: &str) -> usize {
    if st.assoc.contains(name) {
        assoc_keys(st, name).len()
    } else {
        let n = indices(st, name).len();
        if n == 0 && st.cell(name).is_some() {
            1
        } else {
            n
        }
    }
}

/// Ordered `(display_key, value)` pairs.
pub fn entries(st: &ShellState, name: &str) -> Vec<(String, String)> {
    if st.assoc.contains(name) {
        assoc_keys(st, name)
            .into_iter()
            .filter_map(|k| {
                st.cell(&assoc_cell(name, &k)).map(|v| (k.clone(), v.to_string()))
            })
            .collect()
    } else {
        let idx = indices(st, name);
        if idx.is_empty() {
            return match st.cell(name) {
                Some(v) => vec![("0".to_string(), v.to_string())],
                None => Vec::new(),
            };
        }
        idx.into_iter()
            .filter_map(|i| {
                st.cell(&index_cell(name, i)).map(|v| (i.to_string(), v.to_string()))
            })
            .collect()
    }
}

pub fn values(st: &ShellState, name: &str) -> Vec<String> {
    entries(st, name).into_iter().map(|(_, v)| v).collect()
}

/// Resolve a possibly negative index; negative counts back from
/// `max_index + 1`. None when it falls off the left edge.
pub fn resolve_index(st: &ShellState, name: &str, idx: i64) -> Option<i64> {
    if idx >= 0 {
        return Some(idx);
    }
    let top = max_index(st, name).map(|m| m + 1).unwrap_or_else(|| {
        if st.cell(name).is_some() {
            1
        } else {
            0
        }
    });
    let resolved = top + idx;
    (resolved >= 0).then_some(resolved)
}

/// Read one element. Index 0 of a plain scalar reads the scalar.
pub fn get_indexed(st: &ShellState, name: &str, idx: i64) -> Option<String> {
    if let Some(v) = st.cell(&index_cell(name, idx)) {
        return Some(v.to_string());
    }
    if idx == 0 && !st.is_array(name) {
        return st.cell(name).map(str::to_string);
    }
    None
}

pub fn set_indexed(st: &mut ShellState, name: &str, idx: i64, value: String) {
    if !st.is_array(name) {
        // Promote an existing scalar to element 0 first.
        if let Some(old) = st.vars.shift_remove(name) {
            st.set_cell(index_cell(name, 0), old);
        }
    }
    st.indexed.insert(name.to_string());
    st.set_cell(index_cell(name, idx), value);
}

pub fn set_assoc(st: &mut ShellState, name: &str, key: &str, value: String) {
    st.set_cell(assoc_cell(name, key), value);
}

pub fn unset_indexed(st: &mut ShellState, name: &str, idx: i64) {
    st.vars.shift_remove(&index_cell(name, idx));
}

pub fn clear(st: &mut ShellState, name: &str) {
    let prefix = format!("{name}_");
    let doomed: Vec<String> = st
        .vars
        .keys()
        .filter(|k| k.as_str() == name || k.starts_with(&prefix))
        .cloned()
        .collect();
    for k in doomed {
        st.vars.shift_remove(&k);
    }
}

/// Append after the highest index (or 0 for an empty array).
pub fn push(st: &mut ShellState, name: &str, value: String) {
    let next = max_index(st, name).map(|m| m + 1).unwrap_or_else(|| {
        if st.cell(name).is_some() {
            // Scalar becomes element 0; new value lands at 1.
            1
        } else {
            0
        }
    });
    set_indexed(st, name, next, value);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> ShellState {
        ShellState::new()
    }

    #[test]
    fn indexed_roundtrip() {
        let mut st = fresh();
        set_indexed(&mut st, "a", 0, "x".into());
        set_indexed(&mut st, "a", 2, "z".into());
        assert_eq!(indices(&st, "a"), vec![0, 2]);
        assert_eq!(len(&st, "a"), 2);
        assert_eq!(values(&st, "a"), vec!["x", "z"]);
        assert_eq!(get_indexed(&st, "a", 2).as_deref(), Some("z"));
        assert_eq!(get_indexed(&st, "a", 1), None);
    }

    #[test]
    fn negative_index_resolution() {
        let mut st = fresh();
        set_indexed(&mut st, "a", 0, "x".into());
        set_indexed(&mut st, "a", 1, "y".into());
        set_indexed(&mut st, "a", 2, "z".into());
        assert_eq!(resolve_index(&st, "a", -1), Some(2));
        assert_eq!(resolve_index(&st, "a", -3), Some(0));
        assert_eq!(resolve_index(&st, "a", -4), None);
    }

    #[test]
    fn scalar_reads_as_element_zero() {
        let mut st = fresh();
        st.set_cell("s", "only");
        assert_eq!(get_indexed(&st, "s", 0).as_deref(), Some("only"));
        assert_eq!(len(&st, "s"), 1);
    }

    #[test]
    fn scalar_promotes_on_indexed_write() {
        let mut st = fresh();
        st.set_cell("s", "zero");
        set_indexed(&mut st, "s", 1, "one".into());
        assert_eq!(values(&st, "s"), vec!["zero", "one"]);
    }

    #[test]
    fn push_appends_after_max() {
        let mut st = fresh();
        push(&mut st, "a", "first".into());
        set_indexed(&mut st, "a", 5, "gap".into());
        push(&mut st, "a", "after".into());
        assert_eq!(indices(&st, "a"), vec![0, 5, 6]);
    }

    #[test]
    fn assoc_sorted_iteration() {
        let mut st = fresh();
        st.assoc.insert("m".to_string());
        set_assoc(&mut st, "m", "zebra", "1".into());
        set_assoc(&mut st, "m", "ant", "2".into());
        assert_eq!(assoc_keys(&st, "m"), vec!["ant", "zebra"]);
        assert_eq!(len(&st, "m"), 2);
    }

    #[test]
    fn noncanonical_numeric_keys_ignored() {
        let mut st = fresh();
        st.set_cell("a_007", "bond");
        st.indexed.insert("a".to_string());
        assert!(indices(&st, "a").is_empty());
    }
}
