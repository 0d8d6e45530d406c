use async_trait::async_trait;

use crate::commands::{Command, CommandContext};
use crate::interp::flow::ExecOutcome;

/// Move or rename.
pub struct Mv;

#[async_trait]
impl Command for Mv {
    fn name(&self) -> &'static str {
        "mv"
    }

    async fn execute(&self, ctx: CommandContext) -> ExecOutcome {
        let operands: Vec<&String> =
            ctx.argv[1..].iter().filter(|a| !a.starts_with('-')).collect();
        if operands.len() < 2 {
            return ExecOutcome::failure("mv: missing file operand\n", 1);
        }
        let dst_raw = operands.last().expect("checked");
        let dst = ctx.path(dst_raw);
        let dst_is_dir = ctx.fs.stat(&dst).await.map(|m| m.is_dir()).unwrap_or(false);
        let mut err = String::new();
        let mut code = 0;
        for src_raw in &operands[..operands.len() - 1] {
            let src = ctx.path(src_raw);
            let target = if dst_is_dir {
                crate::vfs::path::join(&dst, crate::vfs::path::file_name(&src))
            } else {
                dst.clone()
            };
            if let Err(e) = ctx.fs.rename(&src, &target).await {
                err.push_str(&format!("mv: cannot move '{src_raw}': {e}\n"));
                code = 1;
            }
        }
        ExecOutcome { stdout: String::new(), stderr: err, exit_code: code }
    }
}
