use async_trait::async_trait;

use crate::commands::{Command, CommandContext};
use crate::interp::flow::ExecOutcome;
use chrono::Utc;

/// Print the current date, with optional `+FORMAT`.
pub struct Date;

#[async_trait]
impl Command for Date {
    fn name(&self) -> &'static str {
        "date"
    }

    async fn execute(&self, ctx: CommandContext) -> ExecOutcome {
        let now = Utc::now();
        let format = ctx.argv[1..]
            .iter()
            .find(|a| a.starts_with('+'))
            .map(|a| a[1..].to_string())
            .unwrap_or_else(|| "%a %b %e %H:%M:%S UTC %Y".to_string());
        // chrono shares the strftime vocabulary date(1) uses.
        let rendered = now.format(&format).to_string();
        ExecOutcome::success(format!("{rendered}\n"))
    }
}
