use async_trait::async_trait;

use crate::commands::{Command, CommandContext};
use crate::interp::flow::ExecOutcome;

/// Filter adjacent duplicate lines.
pub struct Uniq;

#[async_trait]
impl Command for Uniq {
    fn name(&self) -> &'static str {
        "uniq"
    }

    async fn execute(&self, ctx: CommandContext) -> ExecOutcome {
        let mut count = false;
        let mut dups_only = false;
        let mut uniq_only = false;
        let mut files: Vec<&String> = Vec::new();
        for arg in &ctx.argv[1..] {
            match arg.as_str() {
                "-c" => count = true,
                "-d" => dups_only = true,
                "-u" => uniq_only = true,
                _ => files.push(arg),
            }
        }
        let text = if let Some(file) = files.first() {
            match ctx.fs.read(&ctx.path(file)).await {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(_) => {
                    return ExecOutcome::failure(
                        format!("uniq: {file}: No such file or directory\n"),
                        1,
                    )
                }
            }
        } else {
            ctx.stdin.clone()
        };

        let mut out = String::new();
        let mut groups: Vec<(usize, &str)> = Vec::new();
        for line in text.lines() {
            match groups.last_mut() {
                Some((n, prev)) if *prev == line => *n += 1,
                _ => groups.push((1, line)),
            }
        }
        for (n, line) in groups {
            if dups_only && n < 2 {
                continue;
            }
            if uniq_only && n > 1 {
                continue;
            }
            if count {
                out.push_str(&format!("{n:7} {line}\n"));
            } else {
                out.push_str(&format!("{line}\n"));
            }
        }
        ExecOutcome::success(out)
    }
}
