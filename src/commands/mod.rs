//! External command boundary.
//!
//! Commands live behind a registry and see only the narrow
//! [`CommandContext`]: argv, stdin bytes, cwd, exported env, and the
//! shared virtual filesystem. They return a captured outcome and never
//! touch shell variables.

pub mod basename;
pub mod cat;
pub mod cp;
pub mod cut;
pub mod date;
pub mod dirname;
pub mod env_cmd;
pub mod grep;
pub mod head;
pub mod ls;
pub mod mkdir;
pub mod mv;
pub mod rm;
pub mod seq;
pub mod sleep_cmd;
pub mod sort;
pub mod tail;
pub mod touch;
pub mod tr;
pub mod uniq;
pub mod wc;
pub mod which;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::interp::flow::ExecOutcome;
use crate::vfs::VirtualFs;

pub struct CommandContext {
    pub argv: Vec<String>,
    pub stdin: String,
    pub cwd: String,
    pub env: HashMap<String, String>,
    pub fs: Arc<dyn VirtualFs>,
}

impl CommandContext {
    /// Resolve an operand against the working directory.
    pub fn path(&self, operand: &str) -> String {
        crate::vfs::path::absolutize(&self.cwd, operand)
    }
}

#[async_trait]
pub trait Command: Send + Sync {
    fn name(&self) -> &'static str;
    async fn execute(&self, ctx: CommandContext) -> ExecOutcome;
}

pub struct CommandRegistry {
    commands: HashMap<&'static str, Box<dyn Command>>,
}

impl CommandRegistry {
    pub fn empty() -> Self {
        CommandRegistry { commands: HashMap::new() }
    }

    /// Registry with the bundled coreutils subset.
    pub fn standard() -> Self {
        let mut r = CommandRegistry::empty();
        r.register(Box::new(basename::Basename));
        r.register(Box::new(cat::Cat));
        r.register(Box::new(cp::Cp));
        r.register(Box::new(cut::Cut));
        r.register(Box::new(date::Date));
        r.register(Box::new(dirname::Dirname));
        r.register(Box::new(env_cmd::Env));
        r.register(Box::new(grep::Grep));
        r.register(Box::new(head::Head));
        r.register(Box::new(ls::Ls));
        r.register(Box::new(mkdir::Mkdir));
        r.register(Box::new(mv::Mv));
        r.register(Box::new(rm::Rm));
        r.register(Box::new(seq::Seq));
        r.register(Box::new(sleep_cmd::Sleep));
        r.register(Box::new(sort::Sort));
        r.register(Box::new(tail::Tail));
        r.register(Box::new(touch::Touch));
        r.register(Box::new(tr::Tr));
        r.register(Box::new(uniq::Uniq));
        r.register(Box::new(wc::Wc));
        r.register(Box::new(which::Which));
        r
    }

    pub fn register(&mut self, cmd: Box<dyn Command>) {
        self.commands.insert(cmd.name(), cmd);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Command> {
        self.commands.get(name).map(|c| c.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut v: Vec<_> = self.commands.keys().copied().collect();
        v.sort();
        v
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
