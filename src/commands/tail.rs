use async_trait::async_trait;

use crate::commands::{Command, CommandContext};
use crate::interp::flow::ExecOutcome;
use crate::commands::head::{gather, parse_line_args};

/// Last lines of files or stdin.
pub struct Tail;

#[async_trait]
impl Command for Tail {
    fn name(&self) -> &'static str {
        "tail"
    }

    async fn execute(&self, ctx: CommandContext) -> ExecOutcome {
        let (count, files) = parse_line_args(&ctx.argv[1..], 10);
        let mut out = String::new();
        let mut err = String::new();
        let mut code = 0;
        let inputs = gather(&ctx, &files, &mut err, &mut code).await;
        for text in inputs {
            let lines: Vec<&str> = text.split_inclusive('\n').collect();
            let start = lines.len().saturating_sub(count);
            for line in &lines[start..] {
                out.push_str(line);
            }
        }
        ExecOutcome { stdout: out, stderr: err, exit_code: code }
    }
}
