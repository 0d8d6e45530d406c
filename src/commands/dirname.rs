use async_trait::async_trait;

use crate::commands::{Command, CommandContext};
use crate::interp::flow::ExecOutcome;

/// Strip the final component from a path.
pub struct Dirname;

#[async_trait]
impl Command for Dirname {
    fn name(&self) -> &'static str {
        "dirname"
    }

    async fn execute(&self, ctx: CommandContext) -> ExecOutcome {
        let Some(path) = ctx.argv.get(1) else {
            return ExecOutcome::failure("dirname: missing operand\n", 1);
        };
        let trimmed = path.trim_end_matches('/');
        let dir = match trimmed.rfind('/') {
            Some(0) => "/",
            Some(idx) => &trimmed[..idx],
            None => ".",
        };
        ExecOutcome::success(format!("{dir}\n"))
    }
}
