use async_trait::async_trait;

use crate::commands::{Command, CommandContext};
use crate::interp::flow::ExecOutcome;

/// Remove files (and trees with -r).
pub struct Rm;

#[async_trait]
impl Command for Rm {
    fn name(&self) -> &'static str {
        "rm"
    }

    async fn execute(&self, ctx: CommandContext) -> ExecOutcome {
        let mut recursive = false;
        let mut force = false;
        let mut targets: Vec<&String> = Vec::new();
        for arg in &ctx.argv[1..] {
            match arg.as_str() {
                "-r" | "-R" => recursive = true,
                "-f" => force = true,
                "-rf" | "-fr" => {
                    recursive = true;
                    force = true;
                }
                _ => targets.push(arg),
            }
        }
        let mut err = String::new();
        let mut code = 0;
        for target in targets {
            let path = ctx.path(target);
            match ctx.fs.lstat(&path).await {
                Err(_) => {
                    if !force {
                        err.push_str(&format!(
                            "rm: cannot remove '{target}': No such file or directory\n"
                        ));
                        code = 1;
                    }
                }
                Ok(meta) if meta.is_dir() => {
                    if !recursive {
                        err.push_str(&format!("rm: cannot remove '{target}': Is a directory\n"));
                        code = 1;
                    } else if let Err(e) = remove_tree(&ctx, &path).await {
                        err.push_str(&format!("rm: cannot remove '{target}': {e}\n"));
                        code = 1;
                    }
                }
                Ok(_) => {
                    if let Err(e) = ctx.fs.unlink(&path).await {
                        err.push_str(&format!("rm: cannot remove '{target}': {e}\n"));
                        code = 1;
                    }
                }
            }
        }
        ExecOutcome { stdout: String::new(), stderr: err, exit_code: code }
    }
}

async fn remove_tree(ctx: &CommandContext, path: &str) -> Result<(), crate::vfs::VfsError> {
    let names = ctx.fs.readdir(path).await?;
    for name in names {
        let child = crate::vfs::path::join(path, &name);
        let meta = ctx.fs.lstat(&child).await?;
        if meta.is_dir() {
            Box::pin(remove_tree(ctx, &child)).await?;
        } else {
            ctx.fs.unlink(&child).await?;
        }
    }
    ctx.fs.rmdir(path).await
}
