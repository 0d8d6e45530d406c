use async_trait::async_trait;

use crate::commands::{Command, CommandContext};
use crate::interp::flow::ExecOutcome;

/// Select fields or character columns from each line.
pub struct Cut;

#[async_trait]
impl Command for Cut {
    fn name(&self) -> &'static str {
        "cut"
    }

    async fn execute(&self, ctx: CommandContext) -> ExecOutcome {
        let mut delim = '\t';
        let mut fields: Option<Vec<(usize, usize)>> = None;
        let mut chars_sel: Option<Vec<(usize, usize)>> = None;
        let mut files: Vec<String> = Vec::new();
        let args = &ctx.argv[1..];
        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "-d" => {
                    i += 1;
                    delim = args.get(i).and_then(|s| s.chars().next()).unwrap_or('\t');
                }
                "-f" => {
                    i += 1;
                    fields = args.get(i).map(|s| parse_ranges(s));
                }
                "-c" => {
                    i += 1;
                    chars_sel = args.get(i).map(|s| parse_ranges(s));
                }
                s if s.starts_with("-d") => delim = s[2..].chars().next().unwrap_or('\t'),
                s if s.starts_with("-f") => fields = Some(parse_ranges(&s[2..])),
                s if s.starts_with("-c") => chars_sel = Some(parse_ranges(&s[2..])),
                s => files.push(s.to_string()),
            }
            i += 1;
        }
        if fields.is_none() && chars_sel.is_none() {
            return ExecOutcome::failure("cut: you must specify a list of bytes, characters, or fields\n", 1);
        }

        let text = if let Some(file) = files.first() {
            match ctx.fs.read(&ctx.path(file)).await {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(_) => {
                    return ExecOutcome::failure(
                        format!("cut: {file}: No such file or directory\n"),
                        1,
                    )
                }
            }
        } else {
            ctx.stdin.clone()
        };

        let mut out = String::new();
        for line in text.lines() {
            if let Some(ranges) = &chars_sel {
                let cs: Vec<char> = line.chars().collect();
                for &(a, b) in ranges {
                    for c in cs.iter().skip(a - 1).take(b - a + 1) {
                        out.push(*c);
                    }
                }
                out.push('\n');
            } else if let Some(ranges) = &fields {
                if !line.contains(delim) {
                    out.push_str(line);
                    out.push('\n');
                    continue;
                }
                let parts: Vec<&str> = line.split(delim).collect();
                let mut picked: Vec<&str> = Vec::new();
                for &(a, b) in ranges {
                    for p in parts.iter().skip(a - 1).take(b - a + 1) {
                        picked.push(p);
                    }
                }
                out.push_str(&picked.join(&delim.to_string()));
                out.push('\n');
            }
        }
        ExecOutcome::success(out)
    }
}

/// `1,3-5,7-` style selections.
fn parse_ranges(spec: &str) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    for piece in spec.split(',') {
        if let Some((a, b)) = piece.split_once('-') {
            let from = a.parse().unwrap_or(1);
            let to = if b.is_empty() { usize::MAX / 2 } else { b.parse().unwrap_or(from) };
            out.push((from.max(1), to));
        } else if let Ok(n) = piece.parse::<usize>() {
            out.push((n.max(1), n.max(1)));
        }
    }
    out
}
