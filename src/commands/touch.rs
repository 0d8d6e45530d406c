use async_trait::async_trait;

use crate::commands::{Command, CommandContext};
use crate::interp::flow::ExecOutcome;

/// Create files or bump their mtime.
pub struct Touch;

#[async_trait]
impl Command for Touch {
    fn name(&self) -> &'static str {
        "touch"
    }

    async fn execute(&self, ctx: CommandContext) -> ExecOutcome {
        let mut err = String::new();
        let mut code = 0;
        for arg in ctx.argv[1..].iter().filter(|a| !a.starts_with('-')) {
            let path = ctx.path(arg);
            match ctx.fs.stat(&path).await {
                Ok(_) => {
                    // Bump mtime by appending nothing.
                    if let Ok(data) = ctx.fs.read(&path).await {
                        let _ = ctx.fs.write(&path, &data, None).await;
                    }
                }
                Err(_) => {
                    if let Err(e) = ctx.fs.write(&path, b"", None).await {
                        err.push_str(&format!("touch: cannot touch '{arg}': {e}\n"));
                        code = 1;
                    }
                }
            }
        }
        ExecOutcome { stdout: String::new(), stderr: err, exit_code: code }
    }
}
