use async_trait::async_trait;

use crate::commands::{Command, CommandContext};
use crate::interp::flow::ExecOutcome;

/// Translate or delete characters from stdin.
pub struct Tr;

#[async_trait]
impl Command for Tr {
    fn name(&self) -> &'static str {
        "tr"
    }

    async fn execute(&self, ctx: CommandContext) -> ExecOutcome {
        let mut delete = false;
        let mut squeeze = false;
        let mut sets: Vec<&String> = Vec::new();
        for arg in &ctx.argv[1..] {
            match arg.as_str() {
                "-d" => delete = true,
                "-s" => squeeze = true,
                _ => sets.push(arg),
            }
        }
        let Some(set1) = sets.first() else {
            return ExecOutcome::failure("tr: missing operand\n", 1);
        };
        let from = expand_set(set1);
        let mut out = String::new();
        if delete {
            for c in ctx.stdin.chars() {
                if !from.contains(&c) {
                    out.push(c);
                }
            }
        } else {
            let to: Vec<char> = sets.get(1).map(|s| expand_set(s)).unwrap_or_default();
            if to.is_empty() {
                return ExecOutcome::failure("tr: missing operand after translation set\n", 1);
            }
            let mut last: Option<char> = None;
            for c in ctx.stdin.chars() {
                let mapped = match from.iter().position(|f| *f == c) {
                    Some(i) => *to.get(i).unwrap_or_else(|| to.last().expect("nonempty")),
                    None => c,
                };
                if squeeze && last == Some(mapped) && to.contains(&mapped) {
                    continue;
                }
                last = Some(mapped);
                out.push(mapped);
            }
        }
        ExecOutcome::success(out)
    }
}

/// Expand `a-z` ranges, `[:class:]` names and escapes.
fn expand_set(spec: &str) -> Vec<char> {
    match spec {
        "[:lower:]" => return ('a'..='z').collect(),
        "[:upper:]" => return ('A'..='Z').collect(),
        "[:digit:]" => return ('0'..='9').collect(),
        "[:alpha:]" => {
            let mut v: Vec<char> = ('a'..='z').collect();
            v.extend('A'..='Z');
            return v;
        }
        "[:space:]" => return vec![' ', '\t', '\n', '\r'],
        _ => {}
    }
    let chars: Vec<char> = spec.chars().collect();
    let mut out = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '\\' && i + 1 < chars.len() {
            out.push(match chars[i + 1] {
                'n' => '\n',
                't' => '\t',
                'r' => '\r',
                c => c,
            });
            i += 2;
        } else if i + 2 < chars.len() && chars[i + 1] == '-' {
            let (a, b) = (chars[i], chars[i + 2]);
            if a <= b {
                for c in a..=b {
                    out.push(c);
                }
            }
            i += 3;
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}
