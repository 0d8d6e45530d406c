//! Variable builtins: declare/typeset/local/export/readonly, unset, let,
//! getopts.

use crate::expand::{arrays, quote};
use crate::interp::flow::{ExecOutcome, Interrupt};
use crate::interp::state::ShellState;
use crate::interp::Interp;
use crate::parser::word as word_parser;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclareMode {
    Declare,
    Local,
    Export,
    Readonly,
}

#[derive(Default)]
struct Flags {
    indexed: bool,
    assoc: bool,
    integer: bool,
    nameref: bool,
    readonly: bool,
    export: bool,
    unexport: bool,
    print: bool,
    functions: bool,
    function_names: bool,
    global: bool,
}

pub fn declare(
    interp: &Interp<'_>,
    st: &mut ShellState,
    args: &[String],
    mode: DeclareMode,
) -> Result<ExecOutcome, Interrupt> {
    let what = match mode {
        DeclareMode::Declare => "declare",
        DeclareMode::Local => "local",
        DeclareMode::Export => "export",
        DeclareMode::Readonly => "readonly",
    };
    if mode == DeclareMode::Local && st.scopes.is_empty() {
        return Ok(ExecOutcome::failure(
            "bash: local: can only be used in a function\n",
            1,
        ));
    }

    let mut flags = Flags {
        export: mode == DeclareMode::Export,
        readonly: mode == DeclareMode::Readonly,
        ..Flags::default()
    };
    let mut operands: Vec<&String> = Vec::new();
    for arg in args {
        match arg.as_str() {
            "-a" => flags.indexed = true,
            "-A" => flags.assoc = true,
            "-i" => flags.integer = true,
            "-n" => flags.nameref = true,
            "-r" => flags.readonly = true,
            "-x" => flags.export = true,
            "+x" => flags.unexport = true,
            "-p" => flags.print = true,
            "-f" => flags.functions = true,
            "-F" => flags.function_names = true,
            "-g" => flags.global = true,
            "--" => {}
            s if s.starts_with('-') && s.len() > 1 && s[1..].chars().all(|c| "aAinrxpfFg".contains(c)) => {
                for c in s[1..].chars() {
                    match c {
                        'a' => flags.indexed = true,
                        'A' => flags.assoc = true,
                        'i' => flags.integer = true,
                        'n' => flags.nameref = true,
                        'r' => flags.readonly = true,
                        'x' => flags.export = true,
                        'p' => flags.print = true,
                        'f' => flags.functions = true,
                        'F' => flags.function_names = true,
                        'g' => flags.global = true,
                        _ => {}
                    }
                }
            }
            _ => operands.push(arg),
        }
    }

    if flags.functions || flags.function_names {
        let mut out = ExecOutcome::ok();
        let names: Vec<String> = if operands.is_empty() {
            st.functions.keys().cloned().collect()
        } else {
            operands.iter().map(|s| s.to_string()).collect()
        };
        for name in names {
            if st.functions.contains_key(&name) {
                out.stdout.push_str(&format!("declare -f {name}\n"));
            } else if !operands.is_empty() {
                out.exit_code = 1;
            }
        }
        return Ok(out);
    }

    if operands.is_empty() {
        if flags.print || mode == DeclareMode::Export || mode == DeclareMode::Readonly {
            return Ok(print_matching(st, &flags, mode));
        }
        return Ok(print_all(st));
    }

    let mut out = ExecOutcome::ok();
    for operand in operands {
        if flags.print {
            out.absorb(print_one(st, operand, what));
            continue;
        }
        // NAME or NAME=VALUE (value may be an array literal).
        let (name, has_assign) = match operand.find('=') {
            Some(_) if crate::lexer::is_assignment_prefix(operand) => {
                (operand.split(['=', '[', '+']).next().unwrap_or("").to_string(), true)
            }
            _ => (operand.clone(), false),
        };
        if !crate::parser::is_valid_name(&name) {
            out.stderr
                .push_str(&format!("bash: {what}: `{operand}': not a valid identifier\n"));
            out.exit_code = 1;
            continue;
        }

        let make_local = mode == DeclareMode::Local
            || (mode == DeclareMode::Declare && !flags.global && !st.scopes.is_empty());
        if make_local {
            st.shadow_in_scope(&name);
            if !has_assign {
                // A fresh local starts unset; the frame restores the
                // outer value on scope exit.
                for key in st.cells_of(&name) {
                    st.vars.shift_remove(&key);
                }
            }
        }

        if flags.assoc {
            st.assoc.insert(name.clone());
        } else if flags.indexed {
            st.indexed.insert(name.clone());
        }
        if flags.integer {
            st.integers.insert(name.clone());
        }
        if flags.nameref {
            st.namerefs.insert(name.clone());
        }
        if flags.export {
            st.exported.insert(name.clone());
        }
        if flags.unexport {
            st.exported.remove(&name);
        }

        if has_assign {
            match word_parser::parse_assignment(operand, st.line) {
                Ok(assignment) => {
                    if let Err(int) = interp.apply_assignment(st, &assignment) {
                        let streams = int.streams().clone();
                        out.stderr.push_str(&streams.stderr);
                        out.exit_code = 1;
                        continue;
                    }
                }
                Err(e) => {
                    out.stderr.push_str(&format!("bash: {what}: {}\n", e.message));
                    out.exit_code = 1;
                    continue;
                }
            }
        }
        // Readonly lands after the assignment so the value sticks.
        if flags.readonly {
            st.readonly.insert(name.clone());
        }
    }
    Ok(out)
}

fn print_all(st: &ShellState) -> ExecOutcome {
    let mut names: Vec<String> = st
        .vars
        .keys()
        .filter(|k| crate::parser::is_valid_name(k))
        .cloned()
        .collect();
    names.extend(st.indexed.iter().cloned());
    names.extend(st.assoc.iter().cloned());
    names.sort();
    names.dedup();
    let mut out = String::new();
    for name in names {
        out.push_str(&declare_line(st, &name, "declare"));
    }
    ExecOutcome::success(out)
}

fn print_matching(st: &ShellState, flags: &Flags, mode: DeclareMode) -> ExecOutcome {
    let mut names: Vec<String> = match mode {
        DeclareMode::Export => st.exported.iter().cloned().collect(),
        DeclareMode::Readonly => st.readonly.iter().cloned().collect(),
        _ => {
            let mut all: Vec<String> = st
                .vars
                .keys()
                .filter(|k| crate::parser::is_valid_name(k))
                .cloned()
                .collect();
            all.extend(st.indexed.iter().cloned());
            all.extend(st.assoc.iter().cloned());
            all
        }
    };
    let _ = flags;
    names.sort();
    names.dedup();
    let mut out = String::new();
    for name in names {
        out.push_str(&declare_line(st, &name, "declare"));
    }
    ExecOutcome::success(out)
}

fn print_one(st: &ShellState, name: &str, what: &str) -> ExecOutcome {
    if st.cell(name).is_none() && !st.is_array(name) {
        return ExecOutcome::failure(format!("bash: {what}: {name}: not found\n"), 1);
    }
    ExecOutcome::success(declare_line(st, name, "declare"))
}

fn declare_line(st: &ShellState, name: &str, cmd: &str) -> String {
    let mut attrs = String::new();
    if st.indexed.contains(name) {
        attrs.push('a');
    }
    if st.assoc.contains(name) {
        attrs.push('A');
    }
    if st.integers.contains(name) {
        attrs.push('i');
    }
    if st.namerefs.contains(name) {
        attrs.push('n');
    }
    if st.readonly.contains(name) {
        attrs.push('r');
    }
    if st.exported.contains(name) {
        attrs.push('x');
    }
    let attrs = if attrs.is_empty() { "--".to_string() } else { format!("-{attrs}") };
    if st.is_array(name) {
        let body: Vec<String> = arrays::entries(st, name)
            .into_iter()
            .map(|(k, v)| format!("[{k}]={}", quote::shell_quote(&v)))
            .collect();
        format!("{cmd} {attrs} {name}=({})\n", body.join(" "))
    } else {
        match st.cell(name) {
            Some(v) => format!("{cmd} {attrs} {name}={}\n", quote::shell_quote(v)),
            None => format!("{cmd} {attrs} {name}\n"),
        }
    }
}

pub fn unset(
    interp: &Interp<'_>,
    st: &mut ShellState,
    args: &[String],
) -> Result<ExecOutcome, Interrupt> {
    let mut unset_func = false;
    let mut operands: Vec<&String> = Vec::new();
    for arg in args {
        match arg.as_str() {
            "-f" => unset_func = true,
            "-v" => unset_func = false,
            "--" => {}
            _ => operands.push(arg),
        }
    }
    let mut out = ExecOutcome::ok();
    for operand in operands {
        if unset_func {
            st.functions.shift_remove(operand.as_str());
            continue;
        }
        if let Some(open) = operand.find('[') {
            let base = operand[..open].to_string();
            let sub = operand[open + 1..operand.len().saturating_sub(1)].to_string();
            if st.readonly.contains(&base) {
                out.stderr
                    .push_str(&format!("bash: unset: {base}: cannot unset: readonly variable\n"));
                out.exit_code = 1;
                continue;
            }
            if sub == "@" || sub == "*" {
                arrays::clear(st, &base);
            } else if st.assoc.contains(&base) {
                let key = interp.expand_subscript_text(st, &sub)?;
                st.vars.shift_remove(&arrays::assoc_cell(&base, &key));
            } else {
                let idx = interp.eval_subscript(st, &sub)?;
                if let Some(i) = arrays::resolve_index(st, &base, idx) {
                    arrays::unset_indexed(st, &base, i);
                }
            }
            continue;
        }
        if st.readonly.contains(operand.as_str()) {
            out.stderr.push_str(&format!(
                "bash: unset: {operand}: cannot unset: readonly variable\n"
            ));
            out.exit_code = 1;
            continue;
        }
        st.remove_var(operand);
        st.functions.shift_remove(operand.as_str());
    }
    Ok(out)
}

pub fn let_cmd(
    interp: &Interp<'_>,
    st: &mut ShellState,
    args: &[String],
) -> Result<ExecOutcome, Interrupt> {
    if args.is_empty() {
        return Ok(ExecOutcome::failure("bash: let: expression expected\n", 1));
    }
    let mut last = 0i64;
    for arg in args {
        match interp.eval_text_arith(st, arg) {
            Ok(v) => last = v,
            Err(Interrupt::Fault { streams, .. }) => {
                return Ok(ExecOutcome {
                    stdout: streams.stdout,
                    stderr: streams.stderr,
                    exit_code: 1,
                })
            }
            Err(other) => return Err(other),
        }
    }
    Ok(ExecOutcome::code(i32::from(last == 0)))
}

pub fn getopts(
    interp: &Interp<'_>,
    st: &mut ShellState,
    args: &[String],
) -> Result<ExecOutcome, Interrupt> {
    let _ = interp;
    let (optstring, name) = match (args.first(), args.get(1)) {
        (Some(o), Some(n)) => (o.clone(), n.clone()),
        _ => {
            return Ok(ExecOutcome::failure(
                "bash: getopts: usage: getopts optstring name [arg ...]\n",
                2,
            ))
        }
    };
    let silent = optstring.starts_with(':');
    let opts: Vec<char> = optstring.trim_start_matches(':').chars().collect();
    let params: Vec<String> = if args.len() > 2 {
        args[2..].to_vec()
    } else {
        st.positional.clone()
    };

    let mut optind: usize = st
        .cell("OPTIND")
        .and_then(|s| s.parse().ok())
        .unwrap_or(1);
    let mut subpos: usize = st
        .cell("__OPTPOS")
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);

    let done = |st: &mut ShellState, name: &str| {
        st.set_cell(name.to_string(), "?".to_string());
        st.vars.shift_remove("__OPTPOS");
        Ok(ExecOutcome::code(1))
    };

    loop {
        if optind == 0 || optind > params.len() {
            return done(st, &name);
        }
        let current = params[optind - 1].clone();
        if !current.starts_with('-') || current == "-" || current == "--" {
            if current == "--" {
                st.set_cell("OPTIND", (optind + 1).to_string());
            }
            return done(st, &name);
        }
        let chars: Vec<char> = current.chars().collect();
        if subpos == 0 {
            subpos = 1; // skip the dash
        }
        if subpos >= chars.len() {
            optind += 1;
            subpos = 0;
            st.set_cell("OPTIND", optind.to_string());
            st.set_cell("__OPTPOS", "0".to_string());
            continue;
        }
        let opt = chars[subpos];
        subpos += 1;
        let takes_arg = {
            let mut takes = false;
            for (i, c) in opts.iter().enumerate() {
                if *c == opt {
                    takes = opts.get(i + 1) == Some(&':');
                    break;
                }
            }
            takes
        };
        let known = opts.iter().any(|c| *c == opt && opt != ':');

        if !known {
            st.set_cell(name.clone(), "?".to_string());
            let mut out = ExecOutcome::ok();
            if silent {
                st.set_cell("OPTARG", opt.to_string());
            } else {
                st.vars.shift_remove("OPTARG");
                out.stderr
                    .push_str(&format!("bash: getopts: illegal option -- {opt}\n"));
            }
            save_getopts_pos(st, optind, subpos, &chars);
            return Ok(out);
        }

        if takes_arg {
            let arg = if subpos < chars.len() {
                let rest: String = chars[subpos..].iter().collect();
                optind += 1;
                subpos = 0;
                Some(rest)
            } else if optind < params.len() {
                let a = params[optind].clone();
                optind += 2;
                subpos = 0;
                Some(a)
            } else {
                optind += 1;
                subpos = 0;
                None
            };
            match arg {
                Some(a) => {
                    st.set_cell(name.clone(), opt.to_string());
                    st.set_cell("OPTARG", a);
                }
                None => {
                    if silent {
                        st.set_cell(name.clone(), ":".to_string());
                        st.set_cell("OPTARG", opt.to_string());
                    } else {
                        st.set_cell(name.clone(), "?".to_string());
                        st.vars.shift_remove("OPTARG");
                    }
                }
            }
            st.set_cell("OPTIND", optind.to_string());
            st.set_cell("__OPTPOS", "0".to_string());
            return Ok(ExecOutcome::ok());
        }

        st.set_cell(name.clone(), opt.to_string());
        st.vars.shift_remove("OPTARG");
        save_getopts_pos(st, optind, subpos, &chars);
        return Ok(ExecOutcome::ok());
    }
}

fn save_getopts_pos(st: &mut ShellState, mut optind: usize, mut subpos: usize, chars: &[char]) {
    if subpos >= chars.len() {
        optind += 1;
        subpos = 0;
    }
    st.set_cell("OPTIND", optind.to_string());
    st.set_cell("__OPTPOS", subpos.to_string());
}
