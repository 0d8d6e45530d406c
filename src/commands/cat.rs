use async_trait::async_trait;

use crate::commands::{Command, CommandContext};
use crate::interp::flow::ExecOutcome;

/// Concatenate files (or stdin) to stdout; `-n` numbers lines.
pub struct Cat;

#[async_trait]
impl Command for Cat {
    fn name(&self) -> &'static str {
        "cat"
    }

    async fn execute(&self, ctx: CommandContext) -> ExecOutcome {
        let mut number = false;
        let mut files: Vec<&String> = Vec::new();
        for arg in &ctx.argv[1..] {
            match arg.as_str() {
                "-n" => number = true,
                "-" => files.push(arg),
                _ => files.push(arg),
            }
        }
        let mut out = String::new();
        let mut err = String::new();
        let mut code = 0;
        if files.is_empty() {
            out.push_str(&ctx.stdin);
        }
        for file in files {
            if file == "-" {
                out.push_str(&ctx.stdin);
                continue;
            }
            match ctx.fs.read(&ctx.path(file)).await {
                Ok(bytes) => out.push_str(&String::from_utf8_lossy(&bytes)),
                Err(_) => {
                    err.push_str(&format!("cat: {file}: No such file or directory\n"));
                    code = 1;
                }
            }
        }
        if number {
            let mut numbered = String::new();
            for (i, line) in out.lines().enumerate() {
                numbered.push_str(&format!("{:6}\t{}\n", i + 1, line));
            }
            out = numbered;
        }
        ExecOutcome { stdout: out, stderr: err, exit_code: code }
    }
}
