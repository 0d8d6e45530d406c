//! Public entry point: configure once, execute scripts, read the triple.

use std::collections::HashMap;
use std::sync::Arc;

use crate::commands::CommandRegistry;
use crate::interp::flow::ExecOutcome;
use crate::interp::state::{ExecLimits, ShellState};
use crate::interp::vfs_bridge::Host;
use crate::interp::Interp;
use crate::vfs::{MemFs, VfsError, VirtualFs};

/// Construction-time configuration.
#[derive(Default)]
pub struct ShellConfig {
    /// Initial files: absolute path to content.
    pub files: HashMap<String, Vec<u8>>,
    pub cwd: Option<String>,
    pub env: HashMap<String, String>,
    pub limits: ExecLimits,
    /// Replace the bundled external-command registry.
    pub registry: Option<CommandRegistry>,
}

pub struct Shell {
    host: Host,
    state: ShellState,
    limits: ExecLimits,
}

impl Shell {
    /// Build a shell. Must be called on a multi-thread tokio runtime; the
    /// interpreter bridges async filesystem calls with `block_in_place`.
    pub fn new(config: ShellConfig) -> Self {
        let cwd = config.cwd.unwrap_or_else(|| "/home/user".to_string());

        let fs = MemFs::new();
        for dir in ["/home/user", "/tmp", "/dev", "/etc", "/usr/bin", "/bin"] {
            fs.seed_dir(dir);
        }
        fs.seed_file("/dev/null", b"");
        fs.seed_file("/dev/stdin", b"");
        fs.seed_file("/dev/stdout", b"");
        fs.seed_file("/dev/stderr", b"");
        fs.seed_file("/etc/hostname", b"sandbox\n");
        fs.seed_dir(&cwd);
        for (path, content) in &config.files {
            fs.seed_file(path, content);
        }
        let fs: Arc<dyn VirtualFs> = Arc::new(fs);

        let mut state = ShellState::new();
        state.cwd = cwd.clone();
        state.prev_dir = cwd.clone();
        let defaults = [
            ("HOME", "/home/user"),
            ("PATH", "/usr/bin:/bin"),
            ("IFS", " \t\n"),
            ("PWD", cwd.as_str()),
            ("OLDPWD", cwd.as_str()),
            ("HOSTNAME", "sandbox"),
            ("OSTYPE", "linux-gnu"),
            ("MACHTYPE", "x86_64-pc-linux-gnu"),
            ("USER", "user"),
            ("UID", "0"),
            ("EUID", "0"),
            ("PPID", "1"),
            ("BASH_VERSION", "5.2.15(1)-release"),
            ("OPTIND", "1"),
        ];
        for (k, v) in defaults {
            state.set_cell(k, v);
        }
        for name in ["HOME", "PATH", "PWD", "OLDPWD", "USER", "HOSTNAME"] {
            state.exported.insert(name.to_string());
        }
        for (i, piece) in ["5", "2", "15", "1", "release", "x86_64-pc-linux-gnu"]
            .iter()
            .enumerate()
        {
            state.set_cell(format!("BASH_VERSINFO_{i}"), *piece);
        }
        state.indexed.insert("BASH_VERSINFO".to_string());
        for (k, v) in config.env {
            state.exported.insert(k.clone());
            state.set_cell(k, v);
        }
        state.sync_option_vars();
        state.readonly.insert("SHELLOPTS".to_string());
        state.readonly.insert("BASHOPTS".to_string());

        let registry = config.registry.unwrap_or_default();
        let host = Host::new(fs, registry, tokio::runtime::Handle::current());
        Shell { host, state, limits: config.limits }
    }

    /// Execute shell source and capture the triple.
    pub async fn exec(&mut self, source: &str) -> ExecOutcome {
        if source.trim().is_empty() {
            return ExecOutcome::ok();
        }
        let source = normalize_script(source);
        let script = match crate::parser::parse(&source) {
            Ok(s) => s,
            Err(e) => {
                return ExecOutcome::failure(
                    format!("bash: line {}: {}\n", e.line, e.message),
                    2,
                );
            }
        };
        let outcome = tokio::task::block_in_place(|| {
            let interp = Interp::new(&self.host, &self.limits);
            interp.run_program(&mut self.state, &script)
        });
        self.state.last_exit = outcome.exit_code;
        outcome
    }

    /// Direct filesystem access for embedding and tests.
    pub async fn read_file(&self, path: &str) -> Result<String, VfsError> {
        let resolved = crate::vfs::path::absolutize(&self.state.cwd, path);
        let bytes = self.host.fs.read(&resolved).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    pub async fn write_file(&self, path: &str, content: &str) -> Result<(), VfsError> {
        let resolved = crate::vfs::path::absolutize(&self.state.cwd, path);
        self.host.fs.write(&resolved, content.as_bytes(), None).await
    }

    pub fn cwd(&self) -> &str {
        &self.state.cwd
    }

    pub fn state(&self) -> &ShellState {
        &self.state
    }
}

/// Dedent embedded scripts (common leading whitespace stripped) so
/// indented raw strings execute cleanly. Sources containing here-docs are
/// left untouched; their bodies are whitespace-sensitive.
fn normalize_script(source: &str) -> String {
    if source.contains("<<") {
        return source.to_string();
    }
    let indent = source
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);
    if indent == 0 {
        return source.to_string();
    }
    source
        .lines()
        .map(|l| if l.len() >= indent { &l[indent..] } else { l })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn sh() -> Shell {
        Shell::new(ShellConfig::default())
    }

    async fn run(src: &str) -> ExecOutcome {
        sh().await.exec(src).await
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn echo_hello_world() {
        let out = run("echo hello world").await;
        assert_eq!(out.stdout, "hello world\n");
        assert_eq!(out.stderr, "");
        assert_eq!(out.exit_code, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn array_basics() {
        let out = run("a=(1 2 3); echo \"${a[@]}\"; echo \"${#a[@]}\"; echo \"${a[-1]}\"").await;
        assert_eq!(out.stdout, "1 2 3\n3\n3\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn arithmetic_expansion() {
        let out = run("x=5; y=10; echo $((x*y+1))").await;
        assert_eq!(out.stdout, "51\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn local_variables_restore() {
        let out = run("f(){ local x=2; echo $x; }; x=1; f; echo $x").await;
        assert_eq!(out.stdout, "2\n1\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn errexit_stops_script() {
        let out = run("set -e; false; echo nope").await;
        assert_eq!(out.stdout, "");
        assert_ne!(out.exit_code, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn pipeline_into_wc() {
        let out = run("for i in {1..3}; do echo $i; done | wc -l").await;
        assert_eq!(out.stdout.trim(), "3");
        assert_eq!(out.exit_code, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn case_glob_pattern() {
        let out = run("case apple in a*) echo A;; *) echo B;; esac").await;
        assert_eq!(out.stdout, "A\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn default_value_operators() {
        let out = run("v=''; echo \"${v:-default}\"; echo \"${v-default}\"").await;
        assert_eq!(out.stdout, "default\n\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn command_substitution_roundtrip() {
        let out = run("echo $(echo X)").await;
        assert_eq!(out.stdout, "X\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn subshell_does_not_leak() {
        let out = run("x=1; (x=2; echo $x); echo $x").await;
        assert_eq!(out.stdout, "2\n1\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn nounset_unbound_variable() {
        let out = run("set -u; echo ${undef}; echo after").await;
        assert_eq!(out.exit_code, 1);
        assert!(out.stderr.contains("undef: unbound variable"));
        assert!(!out.stdout.contains("after"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn pipefail_rightmost_nonzero() {
        let out = run("set -o pipefail; false | true; echo $?").await;
        assert_eq!(out.stdout, "1\n");
        let out = run("false | true; echo $?").await;
        assert_eq!(out.stdout, "0\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn case_terminators() {
        let out = run("case b in a|b) echo one;;& b) echo two;; esac").await;
        assert_eq!(out.stdout, "one\ntwo\n");
        let out = run("case a in a) echo one;& x) echo two;; y) echo three;; esac").await;
        assert_eq!(out.stdout, "one\ntwo\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn brace_range_zero_padded() {
        let out = run("echo {05..10}").await;
        assert_eq!(out.stdout, "05 06 07 08 09 10\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn quoted_at_expands_to_separate_words() {
        let out = run("arr=(a 'b c' d); for x in \"${arr[@]}\"; do echo \"[$x]\"; done").await;
        assert_eq!(out.stdout, "[a]\n[b c]\n[d]\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn redirection_to_file() {
        let mut shell = sh().await;
        let out = shell.exec("echo content > /tmp/out.txt; cat /tmp/out.txt").await;
        assert_eq!(out.stdout, "content\n");
        assert_eq!(shell.read_file("/tmp/out.txt").await.unwrap(), "content\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn append_redirection() {
        let out = run("echo a > /tmp/f; echo b >> /tmp/f; cat /tmp/f").await;
        assert_eq!(out.stdout, "a\nb\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stderr_redirect_and_dup() {
        let out = run("doesnotexist 2>/dev/null; echo ok").await;
        assert_eq!(out.stdout, "ok\n");
        assert_eq!(out.stderr, "");
        let out = run("doesnotexist 2>&1 | grep -c 'command not found'").await;
        assert_eq!(out.stdout.trim(), "1");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn heredoc_expansion_rules() {
        let out = run("x=5\ncat <<EOF\nvalue $x\nEOF\n").await;
        assert_eq!(out.stdout, "value 5\n");
        let out = run("x=5\ncat <<'EOF'\nvalue $x\nEOF\n").await;
        assert_eq!(out.stdout, "value $x\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn here_string() {
        let out = run("cat <<< 'hi there'").await;
        assert_eq!(out.stdout, "hi there\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn while_read_loop() {
        let out = run("printf 'a\\nb\\nc\\n' | while read line; do echo \"got $line\"; done")
            .await;
        assert_eq!(out.stdout, "got a\ngot b\ngot c\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn c_style_for_loop() {
        let out = run("for ((i=0; i<3; i++)); do echo $i; done").await;
        assert_eq!(out.stdout, "0\n1\n2\n");
        let out = run("for ((i=0; i<0; i++)); do echo $i; done; echo done").await;
        assert_eq!(out.stdout, "done\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn break_and_continue_levels() {
        let out = run(
            "for i in 1 2; do for j in a b; do [ $j = b ] && continue; echo $i$j; done; done",
        )
        .await;
        assert_eq!(out.stdout, "1a\n2a\n");
        let out =
            run("for i in 1 2 3; do for j in a b; do break 2; done; echo $i; done; echo out")
                .await;
        assert_eq!(out.stdout, "out\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn functions_return_codes() {
        let out = run("f() { return 3; }; f; echo $?").await;
        assert_eq!(out.stdout, "3\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn conditional_command() {
        let out = run("[[ abc == a* ]] && echo yes").await;
        assert_eq!(out.stdout, "yes\n");
        let out = run("[[ 10 -gt 9 ]]; echo $?").await;
        assert_eq!(out.stdout, "0\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn regex_match_sets_rematch() {
        let out = run("[[ 'foo42' =~ ([a-z]+)([0-9]+) ]] && echo \"${BASH_REMATCH[1]}:${BASH_REMATCH[2]}\"").await;
        assert_eq!(out.stdout, "foo:42\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn parameter_ops() {
        let out = run("p=/a/b/c.txt; echo ${p##*/}; echo ${p%.txt}; echo ${p/a/X}").await;
        assert_eq!(out.stdout, "c.txt\n/a/b/c\n/X/b/c.txt\n");
        let out = run("s=hello; echo ${s^}; echo ${s^^}; echo ${#s}; echo ${s:1:3}").await;
        assert_eq!(out.stdout, "Hello\nHELLO\n5\nell\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn array_slice_negative_offset() {
        let out = run("a=(x y z w); echo \"${a[@]:1:2}\"; echo \"${a[@]: -1}\"").await;
        assert_eq!(out.stdout, "y z\nw\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn assoc_arrays() {
        let out = run(
            "declare -A m; m[one]=1; m[two]=2; echo ${m[one]}; echo ${#m[@]}; echo \"${!m[@]}\"",
        )
        .await;
        assert_eq!(out.stdout, "1\n2\none two\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn ifs_word_splitting() {
        let out = run("IFS=:; v='a:b:c'; set -- $v; echo $#").await;
        assert_eq!(out.stdout, "3\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn globbing_against_vfs() {
        let out = run("cd /tmp && touch a.txt b.txt c.log && echo *.txt").await;
        assert_eq!(out.stdout, "a.txt b.txt\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn nullglob_and_failglob() {
        let out = run("cd /tmp; shopt -s nullglob; echo start *.zzz end").await;
        assert_eq!(out.stdout, "start end\n");
        let out = run("cd /tmp; shopt -s failglob; echo *.zzz; echo after").await;
        assert_ne!(out.exit_code, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn exit_code_convention() {
        assert_eq!(run("exit 7").await.exit_code, 7);
        assert_eq!(run("nosuchcmd").await.exit_code, 127);
        assert_eq!(run("if then").await.exit_code, 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn exit_trap_fires() {
        let out = run("trap 'echo bye' EXIT; echo hi").await;
        assert_eq!(out.stdout, "hi\nbye\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn background_records_bang() {
        let out = run("sleep 0 & echo started; [[ -n $! ]] && echo haspid").await;
        assert!(out.stdout.contains("started"));
        assert!(out.stdout.contains("haspid"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn loop_limit_is_enforced() {
        let mut config = ShellConfig::default();
        config.limits.max_loop_iterations = 50;
        let mut shell = Shell::new(config);
        let out = shell.exec("while true; do :; done; echo unreached").await;
        assert_eq!(out.exit_code, 124);
        assert!(!out.stdout.contains("unreached"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn seeded_files_are_visible() {
        let mut config = ShellConfig::default();
        config
            .files
            .insert("/data/in.txt".to_string(), b"one\ntwo\n".to_vec());
        let mut shell = Shell::new(config);
        let out = shell.exec("wc -l < /data/in.txt").await;
        assert_eq!(out.stdout.trim(), "2");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn errexit_guard_contexts() {
        let out = run("set -e; if false; then echo no; fi; echo survived").await;
        assert_eq!(out.stdout, "survived\n");
        let out = run("set -e; false || true; echo survived").await;
        assert_eq!(out.stdout, "survived\n");
        let out = run("set -e; ! false; echo survived").await;
        assert_eq!(out.stdout, "survived\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn errexit_fires_on_negated_success() {
        // `!` inverts the exit code but does not shield it from errexit.
        let out = run("set -e; ! true; echo unreached").await;
        assert_ne!(out.exit_code, 0);
        assert!(!out.stdout.contains("unreached"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn last_pipeline_stage_mutates_current_shell() {
        let out = run("echo x | read y; echo $y").await;
        assert_eq!(out.stdout, "x\n");
        // Non-final stages stay isolated.
        let out = run("z=outer; { z=inner; echo probe; } | cat; echo $z").await;
        assert_eq!(out.stdout, "probe\nouter\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn shell_state_persists_across_exec() {
        let mut shell = sh().await;
        shell.exec("x=keepme").await;
        let out = shell.exec("echo $x").await;
        assert_eq!(out.stdout, "keepme\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn division_by_zero() {
        let out = run("echo $((1/0)); echo after").await;
        assert!(out.stderr.contains("division by 0"));
        assert!(out.stdout.contains("after"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn eval_and_source() {
        let out = run("eval 'x=5; echo $x'").await;
        assert_eq!(out.stdout, "5\n");
        let mut shell = sh().await;
        shell.write_file("/tmp/lib.sh", "greet() { echo hi $1; }\n").await.unwrap();
        let out = shell.exec("source /tmp/lib.sh; greet world").await;
        assert_eq!(out.stdout, "hi world\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn printf_builtin() {
        let out = run("printf '%s=%d\\n' a 1 b 2").await;
        assert_eq!(out.stdout, "a=1\nb=2\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn tilde_and_pwd() {
        let out = run("echo ~; cd /tmp; echo $PWD; cd -").await;
        assert_eq!(out.stdout, "/home/user\n/tmp\n/home/user\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn positional_parameters() {
        let out = run("set -- a b c; echo $#; echo $2; shift; echo $1").await;
        assert_eq!(out.stdout, "3\nb\na\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn nameref_forwarding() {
        let out = run("declare -n ref=target; target=hello; echo $ref; ref=changed; echo $target")
            .await;
        assert_eq!(out.stdout, "hello\nchanged\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn extglob_matching() {
        let out = run("shopt -s extglob; [[ foo == @(foo|bar) ]] && echo yes").await;
        assert_eq!(out.stdout, "yes\n");
    }
}
