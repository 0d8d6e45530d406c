use async_trait::async_trait;

use crate::commands::{Command, CommandContext};
use crate::interp::flow::ExecOutcome;

/// Locate commands in the simulated /usr/bin.
pub struct Which;

#[async_trait]
impl Command for Which {
    fn name(&self) -> &'static str {
        "which"
    }

    async fn execute(&self, ctx: CommandContext) -> ExecOutcome {
        let mut out = String::new();
        let mut code = 0;
        for arg in ctx.argv[1..].iter().filter(|a| !a.starts_with('-')) {
            if STANDARD_COMMANDS.contains(&arg.as_str()) {
                out.push_str(&format!("/usr/bin/{arg}\n"));
            } else {
                code = 1;
            }
        }
        ExecOutcome { stdout: out, stderr: String::new(), exit_code: code }
    }
}

const STANDARD_COMMANDS: &[&str] = &[
    "basename", "cat", "cp", "cut", "date", "dirname", "env", "grep", "head", "ls",
    "mkdir", "mv", "rm", "seq", "sleep", "sort", "tail", "touch", "tr", "uniq", "wc",
    "which",
];
