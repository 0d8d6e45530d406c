use async_trait::async_trait;

use crate::commands::{Command, CommandContext};
use crate::interp::flow::ExecOutcome;

/// Copy files (and trees with -r).
pub struct Cp;

#[async_trait]
impl Command for Cp {
    fn name(&self) -> &'static str {
        "cp"
    }

    async fn execute(&self, ctx: CommandContext) -> ExecOutcome {
        let recursive = ctx.argv[1..].iter().any(|a| a == "-r" || a == "-R" || a == "-a");
        let operands: Vec<&String> =
            ctx.argv[1..].iter().filter(|a| !a.starts_with('-')).collect();
        if operands.len() < 2 {
            return ExecOutcome::failure("cp: missing file operand\n", 1);
        }
        let dst_raw = operands.last().expect("checked");
        let dst = ctx.path(dst_raw);
        let dst_is_dir = ctx.fs.stat(&dst).await.map(|m| m.is_dir()).unwrap_or(false);
        if operands.len() > 2 && !dst_is_dir {
            return ExecOutcome::failure(
                format!("cp: target '{dst_raw}' is not a directory\n"),
                1,
            );
        }
        let mut err = String::new();
        let mut code = 0;
        for src_raw in &operands[..operands.len() - 1] {
            let src = ctx.path(src_raw);
            let target = if dst_is_dir {
                crate::vfs::path::join(&dst, crate::vfs::path::file_name(&src))
            } else {
                dst.clone()
            };
            if let Err(e) = copy_one(&ctx, &src, &target, recursive).await {
                err.push_str(&format!("cp: cannot copy '{src_raw}': {e}\n"));
                code = 1;
            }
        }
        ExecOutcome { stdout: String::new(), stderr: err, exit_code: code }
    }
}

async fn copy_one(
    ctx: &CommandContext,
    src: &str,
    dst: &str,
    recursive: bool,
) -> Result<(), crate::vfs::VfsError> {
    let meta = ctx.fs.stat(src).await?;
    if meta.is_dir() {
        if !recursive {
            return Err(crate::vfs::VfsError::IsDirectory(src.to_string()));
        }
        ctx.fs.mkdir(dst, meta.mode, true).await?;
        for name in ctx.fs.readdir(src).await? {
            let s = crate::vfs::path::join(src, &name);
            let d = crate::vfs::path::join(dst, &name);
            Box::pin(copy_one(ctx, &s, &d, true)).await?;
        }
        return Ok(());
    }
    let data = ctx.fs.read(src).await?;
    ctx.fs.write(dst, &data, Some(meta.mode)).await
}
