use async_trait::async_trait;

use crate::commands::{Command, CommandContext};
use crate::interp::flow::ExecOutcome;

/// List directory contents.
pub struct Ls;

#[async_trait]
impl Command for Ls {
    fn name(&self) -> &'static str {
        "ls"
    }

    async fn execute(&self, ctx: CommandContext) -> ExecOutcome {
        let mut long = false;
        let mut all = false;
        let mut targets: Vec<&String> = Vec::new();
        for arg in &ctx.argv[1..] {
            match arg.as_str() {
                "-l" => long = true,
                "-a" | "-A" => all = true,
                "-la" | "-al" => {
                    long = true;
                    all = true;
                }
                "-1" => {}
                _ => targets.push(arg),
            }
        }
        let cwd = ctx.cwd.clone();
        let targets: Vec<String> = if targets.is_empty() {
            vec![cwd]
        } else {
            targets.iter().map(|t| ctx.path(t)).collect()
        };

        let mut out = String::new();
        let mut err = String::new();
        let mut code = 0;
        for target in &targets {
            match ctx.fs.stat(target).await {
                Ok(meta) if meta.is_dir() => {
                    let names = ctx.fs.readdir(target).await.unwrap_or_default();
                    for name in names {
                        if !all && name.starts_with('.') {
                            continue;
                        }
                        if long {
                            let full = crate::vfs::path::join(target, &name);
                            if let Ok(m) = ctx.fs.lstat(&full).await {
                                out.push_str(&long_line(&m, &name));
                            }
                        } else {
                            out.push_str(&name);
                            out.push('\n');
                        }
                    }
                }
                Ok(meta) => {
                    let name = crate::vfs::path::file_name(target);
                    if long {
                        out.push_str(&long_line(&meta, name));
                    } else {
                        out.push_str(&format!("{name}\n"));
                    }
                }
                Err(_) => {
                    err.push_str(&format!(
                        "ls: cannot access '{target}': No such file or directory\n"
                    ));
                    code = 2;
                }
            }
        }
        ExecOutcome { stdout: out, stderr: err, exit_code: code }
    }
}

fn long_line(meta: &crate::vfs::Metadata, name: &str) -> String {
    let kind = match meta.kind {
        crate::vfs::FileKind::Dir => 'd',
        crate::vfs::FileKind::Symlink => 'l',
        crate::vfs::FileKind::File => '-',
    };
    let mut perms = String::new();
    for shift in [6u32, 3, 0] {
        let bits = (meta.mode >> shift) & 0o7;
        perms.push(if bits & 4 != 0 { 'r' } else { '-' });
        perms.push(if bits & 2 != 0 { 'w' } else { '-' });
        perms.push(if bits & 1 != 0 { 'x' } else { '-' });
    }
    format!("{kind}{perms} 1 root root {:8} {name}\n", meta.size)
}
