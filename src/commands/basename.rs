use async_trait::async_trait;

use crate::commands::{Command, CommandContext};
use crate::interp::flow::ExecOutcome;

/// Strip directory (and optional suffix) from a path.
pub struct Basename;

#[async_trait]
impl Command for Basename {
    fn name(&self) -> &'static str {
        "basename"
    }

    async fn execute(&self, ctx: CommandContext) -> ExecOutcome {
        let Some(path) = ctx.argv.get(1) else {
            return ExecOutcome::failure("basename: missing operand\n", 1);
        };
        let trimmed = path.trim_end_matches('/');
        let mut base = trimmed.rsplit('/').next().unwrap_or(trimmed).to_string();
        if base.is_empty() {
            base = "/".to_string();
        }
        if let Some(suffix) = ctx.argv.get(2) {
            if base != *suffix {
                base = base.strip_suffix(suffix.as_str()).unwrap_or(&base).to_string();
            }
        }
        ExecOutcome::success(format!("{base}\n"))
    }
}
