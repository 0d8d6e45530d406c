//! CLI driver: run a script string or file against a fresh sandbox.

use std::collections::HashMap;
use std::process::ExitCode;

use clap::Parser;

use shellbox::interp::state::ExecLimits;
use shellbox::{Shell, ShellConfig};

#[derive(Parser)]
#[command(name = "shellbox", about = "Sandboxed in-process bash emulation", version)]
struct Cli {
    /// Execute this script string.
    #[arg(short = 'c', value_name = "SCRIPT", conflicts_with = "script")]
    command: Option<String>,

    /// Script file to execute (read from the host filesystem).
    script: Option<String>,

    /// Positional parameters for the script.
    #[arg(trailing_var_arg = true)]
    args: Vec<String>,

    /// Initial working directory inside the sandbox.
    #[arg(long, default_value = "/home/user")]
    cwd: String,

    /// Seed a sandbox file from the host: DEST=HOSTPATH (repeatable).
    #[arg(long = "file", value_name = "DEST=HOSTPATH")]
    files: Vec<String>,

    #[arg(long)]
    max_commands: Option<u64>,

    #[arg(long)]
    max_loop_iterations: Option<u64>,

    #[arg(long)]
    max_depth: Option<u32>,

    #[arg(long, value_name = "MS")]
    timeout: Option<u64>,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let source = match (&cli.command, &cli.script) {
        (Some(src), _) => src.clone(),
        (None, Some(path)) => match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("shellbox: {path}: {e}");
                return ExitCode::from(127);
            }
        },
        (None, None) => {
            eprintln!("shellbox: no script given (use -c or a script file)");
            return ExitCode::from(2);
        }
    };

    let mut files = HashMap::new();
    for spec in &cli.files {
        let Some((dest, host_path)) = spec.split_once('=') else {
            eprintln!("shellbox: --file expects DEST=HOSTPATH, got {spec}");
            return ExitCode::from(2);
        };
        match std::fs::read(host_path) {
            Ok(bytes) => {
                files.insert(dest.to_string(), bytes);
            }
            Err(e) => {
                eprintln!("shellbox: {host_path}: {e}");
                return ExitCode::from(127);
            }
        }
    }

    let mut limits = ExecLimits::default();
    if let Some(n) = cli.max_commands {
        limits.max_commands = n;
    }
    if let Some(n) = cli.max_loop_iterations {
        limits.max_loop_iterations = n;
    }
    if let Some(n) = cli.max_depth {
        limits.max_depth = n;
    }
    limits.timeout_ms = cli.timeout;

    let config = ShellConfig {
        files,
        cwd: Some(cli.cwd.clone()),
        env: HashMap::new(),
        limits,
        registry: None,
    };
    let mut shell = Shell::new(config);
    if !cli.args.is_empty() {
        // Positional parameters for the script: $1..$N via `set --`.
        let quoted: Vec<String> = cli
            .args
            .iter()
            .map(|a| shellbox::expand::quote::shell_quote(a))
            .collect();
        shell.exec(&format!("set -- {}", quoted.join(" "))).await;
    }

    let outcome = shell.exec(&source).await;
    print!("{}", outcome.stdout);
    eprint!("{}", outcome.stderr);
    ExitCode::from(outcome.exit_code.clamp(0, 255) as u8)
}
