use async_trait::async_trait;

use crate::commands::{Command, CommandContext};
use crate::interp::flow::ExecOutcome;

/// First lines of files or stdin.
pub struct Head;

#[async_trait]
impl Command for Head {
    fn name(&self) -> &'static str {
        "head"
    }

    async fn execute(&self, ctx: CommandContext) -> ExecOutcome {
        let (count, files) = parse_line_args(&ctx.argv[1..], 10);
        let mut out = String::new();
        let mut err = String::new();
        let mut code = 0;
        let inputs = gather(&ctx, &files, &mut err, &mut code).await;
        for text in inputs {
            for line in text.split_inclusive('\n').take(count) {
                out.push_str(line);
            }
        }
        ExecOutcome { stdout: out, stderr: err, exit_code: code }
    }
}

pub(crate) fn parse_line_args(args: &[String], default: usize) -> (usize, Vec<String>) {
    let mut count = default;
    let mut files = Vec::new();
    let mut i = 0;
    while i < args.len() {
        let a = &args[i];
        if a == "-n" {
            i += 1;
            count = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(default);
        } else if let Some(n) = a.strip_prefix('-').filter(|r| r.chars().all(|c| c.is_ascii_digit())) {
            count = n.parse().unwrap_or(default);
        } else {
            files.push(a.clone());
        }
        i += 1;
    }
    (count, files)
}

pub(crate) async fn gather(
    ctx: &CommandContext,
    files: &[String],
    err: &mut String,
    code: &mut i32,
) -> Vec<String> {
    if files.is_empty() {
        return vec![ctx.stdin.clone()];
    }
    let mut out = Vec::new();
    for file in files {
        if file == "-" {
            out.push(ctx.stdin.clone());
            continue;
        }
        match ctx.fs.read(&ctx.path(file)).await {
            Ok(bytes) => out.push(String::from_utf8_lossy(&bytes).into_owned()),
            Err(_) => {
                err.push_str(&format!("head: cannot open '{file}' for reading\n"));
                *code = 1;
            }
        }
    }
    out
}
