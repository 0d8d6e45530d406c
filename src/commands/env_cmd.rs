use async_trait::async_trait;

use crate::commands::{Command, CommandContext};
use crate::interp::flow::ExecOutcome;

/// Print the exported environment.
pub struct Env;

#[async_trait]
impl Command for Env {
    fn name(&self) -> &'static str {
        "env"
    }

    async fn execute(&self, ctx: CommandContext) -> ExecOutcome {
        let mut pairs: Vec<(&String, &String)> = ctx.env.iter().collect();
        pairs.sort();
        let mut out = String::new();
        for (k, v) in pairs {
            out.push_str(&format!("{k}={v}\n"));
        }
        ExecOutcome::success(out)
    }
}
