//! Shell state: variables, attributes, functions, options, scopes, fds.
//!
//! Everything a subshell needs to snapshot lives in [`ShellState`];
//! `clone()` is the subshell fork. Variables (including array elements as
//! flat `name_idx` / `name_key` cells) sit in one insertion-ordered map,
//! with attribute membership tracked in side sets.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use indexmap::IndexMap;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::ast::FuncDef;

/// Limits the embedder may impose on one execution.
#[derive(Debug, Clone)]
pub struct ExecLimits {
    pub max_commands: u64,
    pub max_loop_iterations: u64,
    pub max_depth: u32,
    pub max_output_bytes: usize,
    pub timeout_ms: Option<u64>,
}

impl Default for ExecLimits {
    fn default() -> Self {
        ExecLimits {
            max_commands: 200_000,
            max_loop_iterations: 100_000,
            max_depth: 200,
            max_output_bytes: 8 * 1024 * 1024,
            timeout_ms: None,
        }
    }
}

/// `set` flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShellOpts {
    pub errexit: bool,
    pub nounset: bool,
    pub pipefail: bool,
    pub xtrace: bool,
    pub verbose: bool,
    pub noglob: bool,
    pub noclobber: bool,
    pub noexec: bool,
    pub allexport: bool,
}

impl ShellOpts {
    /// The `$-` string.
    pub fn flags(&self) -> String {
        let mut s = String::new();
        if self.allexport {
            s.push('a');
        }
        if self.noclobber {
            s.push('C');
        }
        if self.errexit {
            s.push('e');
        }
        if self.noglob {
            s.push('f');
        }
        s.push('h');
        if self.noexec {
            s.push('n');
        }
        if self.nounset {
            s.push('u');
        }
        if self.verbose {
            s.push('v');
        }
        if self.xtrace {
            s.push('x');
        }
        s.push('B');
        s
    }

    /// Colon-joined enabled option names, for `$SHELLOPTS`.
    pub fn shellopts(&self) -> String {
        let table: &[(&str, bool)] = &[
            ("allexport", self.allexport),
            ("errexit", self.errexit),
            ("noclobber", self.noclobber),
            ("noexec", self.noexec),
            ("noglob", self.noglob),
            ("nounset", self.nounset),
            ("pipefail", self.pipefail),
            ("verbose", self.verbose),
            ("xtrace", self.xtrace),
        ];
        table
            .iter()
            .filter(|(_, on)| *on)
            .map(|(n, _)| *n)
            .collect::<Vec<_>>()
            .join(":")
    }
}

/// `shopt` flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShoptFlags {
    pub extglob: bool,
    pub nocaseglob: bool,
    pub nocasematch: bool,
    pub globstar: bool,
    pub nullglob: bool,
    pub failglob: bool,
    pub dotglob: bool,
}

impl ShoptFlags {
    pub fn get(&self, name: &str) -> Option<bool> {
        Some(match name {
            "extglob" => self.extglob,
            "nocaseglob" => self.nocaseglob,
            "nocasematch" => self.nocasematch,
            "globstar" => self.globstar,
            "nullglob" => self.nullglob,
            "failglob" => self.failglob,
            "dotglob" => self.dotglob,
            _ => return None,
        })
    }

    pub fn set(&mut self, name: &str, value: bool) -> bool {
        match name {
            "extglob" => self.extglob = value,
            "nocaseglob" => self.nocaseglob = value,
            "nocasematch" => self.nocasematch = value,
            "globstar" => self.globstar = value,
            "nullglob" => self.nullglob = value,
            "failglob" => self.failglob = value,
            "dotglob" => self.dotglob = value,
            _ => return false,
        }
        true
    }

    pub fn names() -> &'static [&'static str] {
        &["dotglob", "extglob", "failglob", "globstar", "nocaseglob", "nocasematch", "nullglob"]
    }

    /// Colon-joined enabled names, for `$BASHOPTS`.
    pub fn bashopts(&self) -> String {
        Self::names()
            .iter()
            .filter(|n| self.get(n).unwrap_or(false))
            .copied()
            .collect::<Vec<_>>()
            .join(":")
    }
}

/// Where a file descriptor points during one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FdHandle {
    /// Inherited stdin (pipeline input or here-doc of an outer command).
    Stdin,
    /// Captured stdout of the enclosing context.
    Stdout,
    /// Captured stderr of the enclosing context.
    Stderr,
    /// Readable content (here-doc, here-string, file snapshot).
    ReadBuf(String),
    /// File on the virtual filesystem opened for writing.
    File { path: String, append: bool },
    /// `<>` read-write binding.
    ReadWrite { path: String },
    /// Writes discarded.
    Null,
    Closed,
}

/// Snapshot of one variable (all cells + attributes) for scope restore.
#[derive(Debug, Clone, Default)]
pub struct SavedVar {
    pub cells: Vec<(String, Option<String>)>,
    pub exported: bool,
    pub readonly: bool,
    pub integer: bool,
    pub assoc: bool,
    pub indexed: bool,
    pub nameref: bool,
}

/// One `local` scope; owns restore data for every name it shadows.
#[derive(Debug, Clone, Default)]
pub struct ScopeFrame {
    pub saved: HashMap<String, SavedVar>,
    /// Saved positional parameters of the caller.
    pub positional: Vec<String>,
}

#[derive(Clone)]
pub struct ShellState {
    /// Flat variable store; array cells are `name_idx` / `name_key`.
    pub vars: IndexMap<String, String>,
    pub exported: HashSet<String>,
    pub readonly: HashSet<String>,
    pub integers: HashSet<String>,
    pub assoc: HashSet<String>,
    pub indexed: HashSet<String>,
    pub namerefs: HashSet<String>,
    pub functions: IndexMap<String, FuncDef>,
    pub opts: ShellOpts,
    pub shopts: ShoptFlags,

    pub script_name: String,
    pub positional: Vec<String>,
    pub cwd: String,
    pub prev_dir: String,
    pub dir_stack: Vec<String>,
    pub scopes: Vec<ScopeFrame>,
    pub traps: HashMap<String, String>,
    pub func_stack: Vec<String>,
    pub call_lines: Vec<u32>,
    pub source_stack: Vec<String>,

    pub last_exit: i32,
    pub last_arg: String,
    pub pipestatus: Vec<i32>,
    pub line: u32,
    pub loop_depth: u32,
    /// Inside an `if`/`while` condition or `&&`/`||` guard: errexit off.
    pub errexit_suspended: bool,
    /// A trap body is running; suppresses nested trap firing.
    pub in_trap: bool,
    pub call_depth: u32,
    pub command_count: u64,

    pub shell_pid: u32,
    pub bash_pid: u32,
    pub next_pid: u32,
    pub last_bg_pid: u32,
    pub started: Instant,
    pub seconds_offset: i64,
    pub rng: SmallRng,
    pub umask: u32,

    pub fds: HashMap<i32, FdHandle>,
    pub next_fd: i32,
    /// Content behind the inherited `FdHandle::Stdin` (pipeline input).
    pub stdin: String,

    /// Soft expansion errors flushed into the owning command's stderr.
    pub expansion_stderr: String,
    /// Exit code forced by a failing expansion (e.g. command substitution).
    pub expansion_exit: Option<i32>,
    /// `>(cmd)` substitutions waiting to consume their file after the
    /// owning command completes.
    pub pending_procsubs: Vec<(String, crate::ast::Script)>,
}

impl Default for ShellState {
    fn default() -> Self {
        Self::new()
    }
}

impl ShellState {
    pub fn new() -> Self {
        ShellState {
            vars: IndexMap::new(),
            exported: HashSet::new(),
            readonly: HashSet::new(),
            integers: HashSet::new(),
            assoc: HashSet::new(),
            indexed: HashSet::new(),
            namerefs: HashSet::new(),
            functions: IndexMap::new(),
            opts: ShellOpts::default(),
            shopts: ShoptFlags::default(),
            script_name: "bash".to_string(),
            positional: Vec::new(),
            cwd: "/".to_string(),
            prev_dir: "/".to_string(),
            dir_stack: Vec::new(),
            scopes: Vec::new(),
            traps: HashMap::new(),
            func_stack: Vec::new(),
            call_lines: Vec::new(),
            source_stack: Vec::new(),
            last_exit: 0,
            last_arg: String::new(),
            pipestatus: Vec::new(),
            line: 1,
            loop_depth: 0,
            errexit_suspended: false,
            in_trap: false,
            call_depth: 0,
            command_count: 0,
            shell_pid: 4200,
            bash_pid: 4200,
            next_pid: 4201,
            last_bg_pid: 0,
            started: Instant::now(),
            seconds_offset: 0,
            rng: SmallRng::seed_from_u64(0x5eed),
            umask: 0o022,
            fds: Self::default_fds(),
            next_fd: 10,
            stdin: String::new(),
            expansion_stderr: String::new(),
            expansion_exit: None,
            pending_procsubs: Vec::new(),
        }
    }

    pub fn default_fds() -> HashMap<i32, FdHandle> {
        HashMap::from([
            (0, FdHandle::Stdin),
            (1, FdHandle::Stdout),
            (2, FdHandle::Stderr),
        ])
    }

    // -- variable cells -----------------------------------------------------

    pub fn cell(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn set_cell(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        // Keep map-key pollution out of the flat store.
        if matches!(key.as_str(), "__proto__" | "constructor" | "prototype") {
            return;
        }
        self.vars.insert(key, value.into());
    }

    /// All cells belonging to `name`: the scalar cell plus array cells.
    pub fn cells_of(&self, name: &str) -> Vec<String> {
        let prefix = format!("{name}_");
        self.vars
            .keys()
            .filter(|k| *k == name || k.starts_with(&prefix))
            .cloned()
            .collect()
    }

    pub fn remove_var(&mut self, name: &str) {
        for key in self.cells_of(name) {
            self.vars.shift_remove(&key);
        }
        self.exported.remove(name);
        self.integers.remove(name);
        self.assoc.remove(name);
        self.indexed.remove(name);
        self.namerefs.remove(name);
    }

    pub fn is_array(&self, name: &str) -> bool {
        self.assoc.contains(name) || self.indexed.contains(name)
    }

    /// Follow a nameref chain (cap 16 hops, cycle detected).
    pub fn resolve_nameref(&self, name: &str) -> Result<String, String> {
        let mut seen = HashSet::new();
        let mut cur = name.to_string();
        let mut hops = 0;
        while self.namerefs.contains(&cur) {
            if !seen.insert(cur.clone()) || hops >= 16 {
                return Err(format!("{name}: circular name reference"));
            }
            hops += 1;
            match self.vars.get(&cur) {
                Some(next) if !next.is_empty() => cur = next.clone(),
                _ => break,
            }
        }
        Ok(cur)
    }

    // -- scopes -------------------------------------------------------------

    /// Record `name` in the innermost scope frame (idempotent per frame).
    pub fn shadow_in_scope(&mut self, name: &str) {
        let Some(frame_idx) = self.scopes.len().checked_sub(1) else { return };
        if self.scopes[frame_idx].saved.contains_key(name) {
            return;
        }
        let saved = SavedVar {
            cells: self
                .cells_of(name)
                .into_iter()
                .map(|k| {
                    let v = self.vars.get(&k).cloned();
                    (k, v)
                })
                .collect(),
            exported: self.exported.contains(name),
            readonly: self.readonly.contains(name),
            integer: self.integers.contains(name),
            assoc: self.assoc.contains(name),
            indexed: self.indexed.contains(name),
            nameref: self.namerefs.contains(name),
        };
        self.scopes[frame_idx].saved.insert(name.to_string(), saved);
    }

    /// Undo every shadow recorded by `frame`.
    pub fn restore_scope(&mut self, frame: ScopeFrame) {
        for (name, saved) in frame.saved {
            // Drop current cells, then put the saved ones back.
            for key in self.cells_of(&name) {
                self.vars.shift_remove(&key);
            }
            for (key, value) in saved.cells {
                if let Some(v) = value {
                    self.vars.insert(key, v);
                }
            }
            set_membership(&mut self.exported, &name, saved.exported);
            set_membership(&mut self.readonly, &name, saved.readonly);
            set_membership(&mut self.integers, &name, saved.integer);
            set_membership(&mut self.assoc, &name, saved.assoc);
            set_membership(&mut self.indexed, &name, saved.indexed);
            set_membership(&mut self.namerefs, &name, saved.nameref);
        }
        self.positional = frame.positional;
    }

    // -- runtime ids --------------------------------------------------------

    pub fn fresh_pid(&mut self) -> u32 {
        let pid = self.next_pid;
        self.next_pid += 1;
        pid
    }

    pub fn random(&mut self) -> u32 {
        self.rng.gen_range(0..32768)
    }

    pub fn seconds(&self) -> i64 {
        self.started.elapsed().as_secs() as i64 + self.seconds_offset
    }

    /// Refresh the `SHELLOPTS`/`BASHOPTS` reflection cells.
    pub fn sync_option_vars(&mut self) {
        let shellopts = self.opts.shellopts();
        let bashopts = self.shopts.bashopts();
        self.vars.insert("SHELLOPTS".to_string(), shellopts);
        self.vars.insert("BASHOPTS".to_string(), bashopts);
    }

    /// Environment an external command sees: exported vars only.
    pub fn exported_env(&self) -> HashMap<String, String> {
        let mut env = HashMap::new();
        for name in &self.exported {
            if let Some(v) = self.vars.get(name) {
                env.insert(name.clone(), v.clone());
            }
        }
        env.insert("PWD".to_string(), self.cwd.clone());
        env
    }
}

fn set_membership(set: &mut HashSet<String>, name: &str, member: bool) {
    if member {
        set.insert(name.to_string());
    } else {
        set.remove(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_shadow_and_restore() {
        let mut st = ShellState::new();
        st.set_cell("x", "outer");
        st.scopes.push(ScopeFrame::default());
        st.shadow_in_scope("x");
        st.set_cell("x", "inner");
        assert_eq!(st.cell("x"), Some("inner"));
        let frame = st.scopes.pop().unwrap();
        st.restore_scope(frame);
        assert_eq!(st.cell("x"), Some("outer"));
    }

    #[test]
    fn scope_restore_removes_new_locals() {
        let mut st = ShellState::new();
        st.scopes.push(ScopeFrame::default());
        st.shadow_in_scope("fresh");
        st.set_cell("fresh", "v");
        let frame = st.scopes.pop().unwrap();
        st.restore_scope(frame);
        assert_eq!(st.cell("fresh"), None);
    }

    #[test]
    fn nameref_cycle_detected() {
        let mut st = ShellState::new();
        st.namerefs.insert("a".to_string());
        st.namerefs.insert("b".to_string());
        st.set_cell("a", "b");
        st.set_cell("b", "a");
        assert!(st.resolve_nameref("a").is_err());
    }

    #[test]
    fn nameref_chain_resolves() {
        let mut st = ShellState::new();
        st.namerefs.insert("r".to_string());
        st.set_cell("r", "target");
        st.set_cell("target", "42");
        assert_eq!(st.resolve_nameref("r").unwrap(), "target");
    }

    #[test]
    fn polluted_keys_are_rejected() {
        let mut st = ShellState::new();
        st.set_cell("__proto__", "x");
        assert_eq!(st.cell("__proto__"), None);
    }

    #[test]
    fn shellopts_reflection() {
        let mut st = ShellState::new();
        st.opts.errexit = true;
        st.opts.pipefail = true;
        assert_eq!(st.opts.shellopts(), "errexit:pipefail");
        assert!(st.opts.flags().contains('e'));
    }
}
