use async_trait::async_trait;

use crate::commands::{Command, CommandContext};
use crate::interp::flow::ExecOutcome;

/// Create directories.
pub struct Mkdir;

#[async_trait]
impl Command for Mkdir {
    fn name(&self) -> &'static str {
        "mkdir"
    }

    async fn execute(&self, ctx: CommandContext) -> ExecOutcome {
        let recursive = ctx.argv[1..].iter().any(|a| a == "-p");
        let mut err = String::new();
        let mut code = 0;
        for arg in ctx.argv[1..].iter().filter(|a| !a.starts_with('-')) {
            if let Err(e) = ctx.fs.mkdir(&ctx.path(arg), 0o755, recursive).await {
                err.push_str(&format!("mkdir: cannot create directory '{arg}': {e}\n"));
                code = 1;
            }
        }
        ExecOutcome { stdout: String::new(), stderr: err, exit_code: code }
    }
}
