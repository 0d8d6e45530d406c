//! Trap registry and firing.
//!
//! Traps are stored as unparsed source; only EXIT, ERR, DEBUG and RETURN
//! are ever fired. A trap body never re-enters trap handling.

use crate::interp::state::ShellState;
use crate::interp::Interp;

/// Signal names accepted by the `trap` builtin.
pub fn canonical_signal(name: &str) -> Option<String> {
    let upper = name.to_uppercase();
    let stripped = upper.strip_prefix("SIG").unwrap_or(&upper);
    let known = [
        "EXIT", "ERR", "DEBUG", "RETURN", "HUP", "INT", "QUIT", "ILL", "TRAP", "ABRT",
        "BUS", "FPE", "KILL", "USR1", "SEGV", "USR2", "PIPE", "ALRM", "TERM", "CHLD",
        "CONT", "STOP", "TSTP", "TTIN", "TTOU", "URG", "XCPU", "XFSZ", "VTALRM", "PROF",
        "WINCH", "IO", "PWR", "SYS",
    ];
    if known.contains(&stripped) {
        return Some(stripped.to_string());
    }
    // Numeric signals: 0 is EXIT.
    match name.parse::<u32>() {
        Ok(0) => Some("EXIT".to_string()),
        Ok(2) => Some("INT".to_string()),
        Ok(15) => Some("TERM".to_string()),
        Ok(n) if n < 65 => Some(format!("SIG{n}")),
        _ => None,
    }
}

impl Interp<'_> {
    /// Best-effort trap execution; returns captured output.
    pub(crate) fn fire_trap(&self, st: &mut ShellState, name: &str) -> (String, String) {
        if st.in_trap {
            return (String::new(), String::new());
        }
        let Some(src) = st.traps.get(name).cloned() else {
            return (String::new(), String::new());
        };
        if src.is_empty() {
            return (String::new(), String::new());
        }
        let script = match crate::parser::parse(&src) {
            Ok(s) => s,
            Err(e) => {
                return (String::new(), format!("bash: trap: {}\n", e.message));
            }
        };
        st.in_trap = true;
        let saved_exit = st.last_exit;
        let result = self.run_script(st, &script);
        st.in_trap = false;
        st.last_exit = saved_exit;
        match result {
            Ok(out) => (out.stdout, out.stderr),
            Err(int) => {
                let s = int.streams();
                (s.stdout.clone(), s.stderr.clone())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_names() {
        assert_eq!(canonical_signal("exit").as_deref(), Some("EXIT"));
        assert_eq!(canonical_signal("SIGTERM").as_deref(), Some("TERM"));
        assert_eq!(canonical_signal("0").as_deref(), Some("EXIT"));
        assert_eq!(canonical_signal("2").as_deref(), Some("INT"));
        assert_eq!(canonical_signal("bogus"), None);
    }
}
