use async_trait::async_trait;

use crate::commands::{Command, CommandContext};
use crate::interp::flow::ExecOutcome;
use regex_lite::Regex;

/// Line matching with a regex (or fixed string with -F).
pub struct Grep;

#[async_trait]
impl Command for Grep {
    fn name(&self) -> &'static str {
        "grep"
    }

    async fn execute(&self, ctx: CommandContext) -> ExecOutcome {
        let mut ignore_case = false;
        let mut invert = false;
        let mut line_numbers = false;
        let mut count_only = false;
        let mut quiet = false;
        let mut fixed = false;
        let mut only_matching = false;
        let mut operands: Vec<&String> = Vec::new();
        for arg in &ctx.argv[1..] {
            match arg.as_str() {
                "-i" => ignore_case = true,
                "-v" => invert = true,
                "-n" => line_numbers = true,
                "-c" => count_only = true,
                "-q" => quiet = true,
                "-F" => fixed = true,
                "-E" => {}
                "-o" => only_matching = true,
                _ => operands.push(arg),
            }
        }
        let Some(pattern) = operands.first() else {
            return ExecOutcome::failure("usage: grep [-ivncqEFo] pattern [file...]\n", 2);
        };
        let src = if fixed {
            regex_escape(pattern)
        } else {
            (*pattern).clone()
        };
        let src = if ignore_case { format!("(?i){src}") } else { src };
        let re = match Regex::new(&src) {
            Ok(r) => r,
            Err(_) => {
                return ExecOutcome::failure(format!("grep: invalid pattern: {pattern}\n"), 2)
            }
        };

        let files = &operands[1..];
        let mut inputs: Vec<(Option<String>, String)> = Vec::new();
        let mut err = String::new();
        if files.is_empty() {
            inputs.push((None, ctx.stdin.clone()));
        } else {
            for file in files {
                match ctx.fs.read(&ctx.path(file)).await {
                    Ok(bytes) => inputs
                        .push((Some((*file).clone()), String::from_utf8_lossy(&bytes).into_owned())),
                    Err(_) => {
                        err.push_str(&format!("grep: {file}: No such file or directory\n"))
                    }
                }
            }
        }

        let label_all = inputs.len() > 1;
        let mut out = String::new();
        let mut hits = 0usize;
        for (label, text) in &inputs {
            let mut file_hits = 0usize;
            for (i, line) in text.lines().enumerate() {
                let matched = re.is_match(line) != invert;
                if !matched {
                    continue;
                }
                file_hits += 1;
                hits += 1;
                if quiet || count_only {
                    continue;
                }
                let prefix = match (label_all, label) {
                    (true, Some(name)) => format!("{name}:"),
                    _ => String::new(),
                };
                if only_matching && !invert {
                    for m in re.find_iter(line) {
                        if line_numbers {
                            out.push_str(&format!("{prefix}{}:{}\n", i + 1, m.as_str()));
                        } else {
                            out.push_str(&format!("{prefix}{}\n", m.as_str()));
                        }
                    }
                } else if line_numbers {
                    out.push_str(&format!("{prefix}{}:{line}\n", i + 1));
                } else {
                    out.push_str(&format!("{prefix}{line}\n"));
                }
            }
            if count_only && !quiet {
                match (label_all, label) {
                    (true, Some(name)) => out.push_str(&format!("{name}:{file_hits}\n")),
                    _ => out.push_str(&format!("{file_hits}\n")),
                }
            }
        }
        let code = if hits > 0 { 0 } else { 1 };
        if quiet {
            return ExecOutcome::code(code);
        }
        ExecOutcome { stdout: out, stderr: err, exit_code: code }
    }
}

fn regex_escape(s: &str) -> String {
    let mut out = String::new();
    for c in s.chars() {
        if "\\.^$|()[]{}*+?".contains(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
