//! `printf`: the conversions scripts actually use (%s %d %i %u %x %X %o
//! %c %q %b %e %f %g and %%), flags/width/precision, format reuse, -v.

use crate::expand::quote;
use crate::interp::flow::{ExecOutcome, Interrupt};
use crate::interp::state::ShellState;
use crate::interp::Interp;
use crate::parser::word::decode_ansi_c;

pub fn printf_cmd(
    interp: &Interp<'_>,
    st: &mut ShellState,
    args: &[String],
) -> Result<ExecOutcome, Interrupt> {
    let mut args = args;
    let mut target_var: Option<String> = None;
    if args.first().map(String::as_str) == Some("-v") {
        target_var = args.get(1).cloned();
        args = &args[2.min(args.len())..];
    }
    let Some(format) = args.first() else {
        return Ok(ExecOutcome::failure("bash: printf: usage: printf [-v var] format [arguments]\n", 2));
    };
    let operands = &args[1..];

    let mut out = String::new();
    let mut errors = String::new();
    let mut idx = 0;
    loop {
        let consumed = render(format, operands, &mut idx, &mut out, &mut errors);
        // Reuse the format while operands remain, but only if it consumed any.
        if idx >= operands.len() || consumed == 0 {
            break;
        }
    }

    let code = i32::from(!errors.is_empty());
    if let Some(var) = target_var {
        interp.set_scalar(st, &var, out);
        return Ok(ExecOutcome { stdout: String::new(), stderr: errors, exit_code: code });
    }
    Ok(ExecOutcome { stdout: out, stderr: errors, exit_code: code })
}

/// One pass over the format; returns how many operands were consumed.
fn render(
    format: &str,
    operands: &[String],
    idx: &mut usize,
    out: &mut String,
    errors: &mut String,
) -> usize {
    let start_idx = *idx;
    let chars: Vec<char> = format.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '\\' && i + 1 < chars.len() {
            // Escapes are live in the format even without %b.
            let mut two = String::new();
            two.push('\\');
            two.push(chars[i + 1]);
            let decoded = decode_ansi_c(&two);
            out.push_str(&decoded);
            i += 2;
            continue;
        }
        if c != '%' {
            out.push(c);
            i += 1;
            continue;
        }
        i += 1;
        if chars.get(i) == Some(&'%') {
            out.push('%');
            i += 1;
            continue;
        }
        // %[flags][width][.precision]conv
        let mut left = false;
        let mut zero = false;
        let mut plus = false;
        let mut space = false;
        while let Some(&f) = chars.get(i) {
            match f {
                '-' => left = true,
                '0' => zero = true,
                '+' => plus = true,
                ' ' => space = true,
                '#' => {}
                _ => break,
            }
            i += 1;
        }
        let mut width = 0usize;
        while let Some(d) = chars.get(i).and_then(|c| c.to_digit(10)) {
            width = width * 10 + d as usize;
            i += 1;
        }
        let mut precision: Option<usize> = None;
        if chars.get(i) == Some(&'.') {
            i += 1;
            let mut p = 0usize;
            while let Some(d) = chars.get(i).and_then(|c| c.to_digit(10)) {
                p = p * 10 + d as usize;
                i += 1;
            }
            precision = Some(p);
        }
        let Some(&conv) = chars.get(i) else {
            out.push('%');
            break;
        };
        i += 1;

        let arg = operands.get(*idx).cloned().unwrap_or_default();
        if !matches!(conv, '%') {
            *idx += 1;
        }

        let rendered = match conv {
            's' => {
                let mut s = arg;
                if let Some(p) = precision {
                    s = s.chars().take(p).collect();
                }
                s
            }
            'b' => decode_ansi_c(&arg),
            'q' => quote::shell_quote(&arg),
            'c' => arg.chars().next().map(|c| c.to_string()).unwrap_or_default(),
            'd' | 'i' => {
                let n = int_arg(&arg, errors);
                let mut s = n.to_string();
                if n >= 0 && plus {
                    s = format!("+{s}");
                } else if n >= 0 && space {
                    s = format!(" {s}");
                }
                s
            }
            'u' => (int_arg(&arg, errors) as u64).to_string(),
            'x' => format!("{:x}", int_arg(&arg, errors)),
            'X' => format!("{:X}", int_arg(&arg, errors)),
            'o' => format!("{:o}", int_arg(&arg, errors)),
            'e' | 'f' | 'g' => {
                let v: f64 = arg.trim().parse().unwrap_or_else(|_| {
                    if !arg.is_empty() {
                        errors.push_str(&format!("bash: printf: {arg}: invalid number\n"));
                    }
                    0.0
                });
                match conv {
                    'e' => format!("{:e}", v),
                    'f' => match precision {
                        Some(p) => format!("{v:.p$}"),
                        None => format!("{v:.6}"),
                    },
                    _ => format!("{v}"),
                }
            }
            other => {
                errors.push_str(&format!("bash: printf: `{other}': invalid format character\n"));
                String::new()
            }
        };

        let padded = if width > rendered.chars().count() {
            let pad = width - rendered.chars().count();
            if left {
                format!("{rendered}{}", " ".repeat(pad))
            } else if zero && matches!(conv, 'd' | 'i' | 'u' | 'x' | 'X' | 'o' | 'f' | 'e') {
                if let Some(stripped) = rendered.strip_prefix('-') {
                    format!("-{}{}", "0".repeat(pad), stripped)
                } else {
                    format!("{}{rendered}", "0".repeat(pad))
                }
            } else {
                format!("{}{rendered}", " ".repeat(pad))
            }
        } else {
            rendered
        };
        out.push_str(&padded);
    }
    *idx - start_idx
}

fn int_arg(arg: &str, errors: &mut String) -> i64 {
    let t = arg.trim();
    if t.is_empty() {
        return 0;
    }
    // Leading-quote form: numeric value of the first character.
    if let Some(rest) = t.strip_prefix('\'').or_else(|| t.strip_prefix('"')) {
        return rest.chars().next().map(|c| c as i64).unwrap_or(0);
    }
    match crate::parser::arith::parse_number(t) {
        Ok(n) => n,
        Err(_) => match t.parse::<i64>() {
            Ok(n) => n,
            Err(_) => {
                errors.push_str(&format!("bash: printf: {arg}: invalid number\n"));
                0
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(fmt: &str, args: &[&str]) -> String {
        let operands: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        let mut out = String::new();
        let mut errors = String::new();
        let mut idx = 0;
        loop {
            let consumed = render(fmt, &operands, &mut idx, &mut out, &mut errors);
            if idx >= operands.len() || consumed == 0 {
                break;
            }
        }
        out
    }

    #[test]
    fn plain_conversions() {
        assert_eq!(run("%s\n", &["hi"]), "hi\n");
        assert_eq!(run("%d\n", &["42"]), "42\n");
        assert_eq!(run("%x", &["255"]), "ff");
        assert_eq!(run("%o", &["8"]), "10");
        assert_eq!(run("%%", &[]), "%");
    }

    #[test]
    fn width_and_alignment() {
        assert_eq!(run("%5d", &["42"]), "   42");
        assert_eq!(run("%-5d|", &["42"]), "42   |");
        assert_eq!(run("%05d", &["42"]), "00042");
        assert_eq!(run("%05d", &["-42"]), "-0042");
        assert_eq!(run("%.2s", &["hello"]), "he");
    }

    #[test]
    fn format_reuse() {
        assert_eq!(run("%s-", &["a", "b", "c"]), "a-b-c-");
    }

    #[test]
    fn escapes_in_format() {
        assert_eq!(run("a\\tb", &[]), "a\tb");
    }

    #[test]
    fn quoted_char_numeric() {
        assert_eq!(run("%d", &["'A"]), "65");
    }

    #[test]
    fn b_conversion_decodes() {
        assert_eq!(run("%b", &["x\\ny"]), "x\ny");
    }

    fn run_noargs(fmt: &str) -> String {
        run(fmt, &[])
    }

    #[test]
    fn missing_args_render_empty() {
        assert_eq!(run_noargs("%s|%d|"), "|0|");
    }
}
