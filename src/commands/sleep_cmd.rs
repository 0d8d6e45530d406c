use async_trait::async_trait;

use crate::commands::{Command, CommandContext};
use crate::interp::flow::ExecOutcome;
use std::time::Duration;

/// Suspend for a number of seconds (capped; the runtime stays live).
pub struct Sleep;

#[async_trait]
impl Command for Sleep {
    fn name(&self) -> &'static str {
        "sleep"
    }

    async fn execute(&self, ctx: CommandContext) -> ExecOutcome {
        let Some(spec) = ctx.argv.get(1) else {
            return ExecOutcome::failure("sleep: missing operand\n", 1);
        };
        let secs: f64 = match spec.trim_end_matches('s').parse() {
            Ok(v) => v,
            Err(_) => {
                return ExecOutcome::failure(
                    format!("sleep: invalid time interval '{spec}'\n"),
                    1,
                )
            }
        };
        let capped = secs.clamp(0.0, 30.0);
        tokio::time::sleep(Duration::from_secs_f64(capped)).await;
        ExecOutcome::ok()
    }
}
