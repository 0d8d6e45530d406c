use async_trait::async_trait;

use crate::commands::{Command, CommandContext};
use crate::interp::flow::ExecOutcome;

/// Sort lines of files or stdin.
pub struct Sort;

#[async_trait]
impl Command for Sort {
    fn name(&self) -> &'static str {
        "sort"
    }

    async fn execute(&self, ctx: CommandContext) -> ExecOutcome {
        let mut reverse = false;
        let mut numeric = false;
        let mut unique = false;
        let mut files: Vec<&String> = Vec::new();
        for arg in &ctx.argv[1..] {
            match arg.as_str() {
                "-r" => reverse = true,
                "-n" => numeric = true,
                "-u" => unique = true,
                "-rn" | "-nr" => {
                    reverse = true;
                    numeric = true;
                }
                _ => files.push(arg),
            }
        }
        let mut text = String::new();
        let mut err = String::new();
        let mut code = 0;
        if files.is_empty() {
            text = ctx.stdin.clone();
        } else {
            for file in files {
                match ctx.fs.read(&ctx.path(file)).await {
                    Ok(bytes) => text.push_str(&String::from_utf8_lossy(&bytes)),
                    Err(_) => {
                        err.push_str(&format!("sort: cannot read: {file}\n"));
                        code = 2;
                    }
                }
            }
        }
        let mut lines: Vec<&str> = text.lines().collect();
        if numeric {
            lines.sort_by(|a, b| {
                let na: f64 = a.trim().parse().unwrap_or(0.0);
                let nb: f64 = b.trim().parse().unwrap_or(0.0);
                na.partial_cmp(&nb).unwrap_or(std::cmp::Ordering::Equal).then(a.cmp(b))
            });
        } else {
            lines.sort();
        }
        if unique {
            lines.dedup();
        }
        if reverse {
            lines.reverse();
        }
        let mut out = lines.join("\n");
        if !out.is_empty() {
            out.push('\n');
        }
        ExecOutcome { stdout: out, stderr: err, exit_code: code }
    }
}
