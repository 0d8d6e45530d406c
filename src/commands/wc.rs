use async_trait::async_trait;

use crate::commands::{Command, CommandContext};
use crate::interp::flow::ExecOutcome;

/// Count lines, words and bytes.
pub struct Wc;

#[async_trait]
impl Command for Wc {
    fn name(&self) -> &'static str {
        "wc"
    }

    async fn execute(&self, ctx: CommandContext) -> ExecOutcome {
        let mut lines_only = false;
        let mut words_only = false;
        let mut bytes_only = false;
        let mut files: Vec<&String> = Vec::new();
        for arg in &ctx.argv[1..] {
            match arg.as_str() {
                "-l" => lines_only = true,
                "-w" => words_only = true,
                "-c" | "-m" => bytes_only = true,
                _ => files.push(arg),
            }
        }
        let mut out = String::new();
        let mut err = String::new();
        let mut code = 0;

        let mut totals = (0usize, 0usize, 0usize);
        let mut report = |text: &str, label: Option<&str>, out: &mut String| {
            let l = text.matches('\n').count();
            let w = text.split_whitespace().count();
            let c = text.len();
            totals.0 += l;
            totals.1 += w;
            totals.2 += c;
            let cell = if lines_only {
                l.to_string()
            } else if words_only {
                w.to_string()
            } else if bytes_only {
                c.to_string()
            } else {
                format!("{l:7} {w:7} {c:7}")
            };
            match label {
                Some(name) => out.push_str(&format!("{cell} {name}\n")),
                None => out.push_str(&format!("{cell}\n")),
            }
        };

        if files.is_empty() {
            report(&ctx.stdin, None, &mut out);
        } else {
            let many = files.len() > 1;
            for file in &files {
                match ctx.fs.read(&ctx.path(file)).await {
                    Ok(bytes) => {
                        let text = String::from_utf8_lossy(&bytes).into_owned();
                        report(&text, Some(file.as_str()), &mut out);
                    }
                    Err(_) => {
                        err.push_str(&format!("wc: {file}: No such file or directory\n"));
                        code = 1;
                    }
                }
            }
            if many {
                let cell = if lines_only {
                    totals.0.to_string()
                } else if words_only {
                    totals.1.to_string()
                } else if bytes_only {
                    totals.2.to_string()
                } else {
                    format!("{:7} {:7} {:7}", totals.0, totals.1, totals.2)
                };
                out.push_str(&format!("{cell} total\n"));
            }
        }
        ExecOutcome { stdout: out, stderr: err, exit_code: code }
    }
}
