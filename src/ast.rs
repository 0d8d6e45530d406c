//! AST node types for the shell language.
//!
//! Everything the parser produces and the interpreter walks lives here as
//! plain tagged variants. Nodes carry the source line where it is needed
//! at runtime ($LINENO, BASH_LINENO); no other position data is retained.

/// A complete parsed program.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Script {
    pub statements: Vec<Statement>,
}

/// Pipelines joined by `&&`, `||` or `;`, optionally sent to the background.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub pipelines: Vec<Pipeline>,
    /// Connector *before* pipeline i+1; `connectors.len() == pipelines.len() - 1`.
    pub connectors: Vec<Connector>,
    pub background: bool,
    /// Raw source text, kept for `set -v`.
    pub source: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connector {
    AndIf, // &&
    OrIf,  // ||
    Seq,   // ;
}

/// Commands joined by `|` / `|&`, with an optional leading `!`.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    pub commands: Vec<Command>,
    pub negated: bool,
    /// `stderr_pipes[i]` is true when the pipe after command i is `|&`.
    pub stderr_pipes: Vec<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Simple(SimpleCmd),
    Compound(Compound),
    FuncDef(FuncDef),
}

/// `VAR=x cmd arg >out`: assignments, optional name, args, redirections.
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleCmd {
    pub assignments: Vec<Assignment>,
    pub name: Option<Word>,
    pub args: Vec<Word>,
    pub redirs: Vec<Redir>,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub name: String,
    /// `arr[expr]=` / `map[key]=` subscript text, unparsed.
    pub subscript: Option<String>,
    pub append: bool,
    pub value: AssignValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AssignValue {
    /// `VAR=` with nothing after the `=`.
    Empty,
    Scalar(Word),
    /// `VAR=(a b [k]=v ...)`
    Array(Vec<ArrayElem>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayElem {
    /// `[key]=value` form; None for positional elements.
    pub key: Option<String>,
    pub value: Word,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuncDef {
    pub name: String,
    pub body: Box<Compound>,
    pub redirs: Vec<Redir>,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Compound {
    If {
        arms: Vec<IfArm>,
        orelse: Option<Vec<Statement>>,
        redirs: Vec<Redir>,
    },
    For {
        var: String,
        /// None means iterate over `"$@"`.
        words: Option<Vec<Word>>,
        body: Vec<Statement>,
        redirs: Vec<Redir>,
    },
    ForArith {
        init: Option<ArithExpr>,
        cond: Option<ArithExpr>,
        step: Option<ArithExpr>,
        body: Vec<Statement>,
        redirs: Vec<Redir>,
    },
    While {
        cond: Vec<Statement>,
        body: Vec<Statement>,
        until: bool,
        redirs: Vec<Redir>,
    },
    Case {
        word: Word,
        items: Vec<CaseItem>,
        redirs: Vec<Redir>,
    },
    Subshell {
        body: Vec<Statement>,
        redirs: Vec<Redir>,
    },
    Group {
        body: Vec<Statement>,
        redirs: Vec<Redir>,
    },
    Arith {
        expr: ArithExpr,
        redirs: Vec<Redir>,
        line: u32,
    },
    Cond {
        expr: CondExpr,
        redirs: Vec<Redir>,
        line: u32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfArm {
    pub cond: Vec<Statement>,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseItem {
    pub patterns: Vec<Word>,
    pub body: Vec<Statement>,
    pub terminator: CaseTerm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseTerm {
    /// `;;`: stop after this body.
    Break,
    /// `;&`: fall through into the next body without testing.
    Fallthrough,
    /// `;;&`: keep testing subsequent patterns.
    Continue,
}

// ---------------------------------------------------------------------------
// Redirections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Redir {
    pub fd: Option<i32>,
    /// `{name}>file`: allocate an fd >= 10 and bind it to `name`.
    pub fd_var: Option<String>,
    pub op: RedirOp,
    pub target: RedirTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirOp {
    In,        // <
    Out,       // >
    Append,    // >>
    OutDup,    // >&
    InDup,     // <&
    ReadWrite, // <>
    Clobber,   // >|
    OutErr,    // &>
    AppendErr, // &>>
    HereString, // <<<
    HereDoc,    // <<
    HereDocDash, // <<-
}

#[derive(Debug, Clone, PartialEq)]
pub enum RedirTarget {
    Word(Word),
    HereDoc(HereDoc),
}

#[derive(Debug, Clone, PartialEq)]
pub struct HereDoc {
    pub delimiter: String,
    /// Body as a word: one literal part when the delimiter was quoted,
    /// otherwise the parsed expansion parts.
    pub body: Word,
    pub strip_tabs: bool,
    pub quoted: bool,
}

// ---------------------------------------------------------------------------
// Words
// ---------------------------------------------------------------------------

/// One syntactic argument before expansion.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Word {
    pub parts: Vec<WordPart>,
}

impl Word {
    pub fn literal(s: impl Into<String>) -> Self {
        Word { parts: vec![WordPart::Literal(s.into())] }
    }

    /// True if the word is a single literal equal to `s`.
    pub fn is_literal(&self, s: &str) -> bool {
        matches!(self.parts.as_slice(), [WordPart::Literal(t)] if t == s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WordPart {
    Literal(String),
    SingleQuoted(String),
    /// `$'...'` with C-style escapes already decoded.
    AnsiQuoted(String),
    DoubleQuoted(Vec<WordPart>),
    /// `\x`: the escaped character, literal under expansion.
    Escaped(String),
    Param(ParamExp),
    CommandSub { script: Script, backquoted: bool },
    ArithSub(ArithExpr),
    ProcessSub { script: Script, write: bool },
    Brace(Vec<BraceItem>),
    Tilde { user: Option<String> },
    /// Unquoted text containing glob metacharacters.
    Glob(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamExp {
    /// Parameter name: variable, `arr[...]` kept whole, or special (`@ * # ? $ ! 0`..).
    pub name: String,
    pub op: Option<ParamOp>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParamOp {
    /// `${v-w}` / `${v:-w}`
    Default { word: Word, or_empty: bool },
    /// `${v=w}` / `${v:=w}`
    Assign { word: Word, or_empty: bool },
    /// `${v?w}` / `${v:?w}`
    Error { word: Option<Word>, or_empty: bool },
    /// `${v+w}` / `${v:+w}`
    Alternative { word: Word, or_empty: bool },
    /// `${#v}`
    Length,
    /// `${v:off}` / `${v:off:len}`
    Substring { offset: ArithExpr, length: Option<ArithExpr> },
    /// `${v#p} ${v##p} ${v%p} ${v%%p}`
    StripPattern { pattern: Word, suffix: bool, greedy: bool },
    /// `${v/p/r}` and friends.
    Replace { pattern: Word, replacement: Option<Word>, all: bool, anchor: Option<ReplaceAnchor> },
    /// `${v^p} ${v^^p} ${v,p} ${v,,p}`
    CaseMod { upper: bool, all: bool, pattern: Option<Word> },
    /// `${v@Q}` etc.
    Transform(TransformKind),
    /// `${!v}` with an optional further operation applied to the target.
    Indirect(Option<Box<ParamOp>>),
    /// `${!arr[@]}` / `${!arr[*]}`
    Keys { star: bool },
    /// `${!prefix*}` / `${!prefix@}`
    NamePrefix { star: bool },
    /// Parsed but invalid; reported at expansion time.
    BadSubst { text: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceAnchor {
    Start,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformKind {
    Quote,      // @Q
    Prompt,     // @P
    Attrs,      // @a
    Assignment, // @A
    Escape,     // @E
    Keys,       // @K
}

#[derive(Debug, Clone, PartialEq)]
pub enum BraceItem {
    Word(Word),
    NumRange { from: i64, to: i64, step: Option<i64>, width: usize },
    CharRange { from: char, to: char, step: Option<i64> },
}

// ---------------------------------------------------------------------------
// Arithmetic
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ArithExpr {
    Num(i64),
    /// Variable reference; recursive resolution happens at eval time.
    Var(String),
    Elem { array: String, index: Box<ArithExpr>, key: Option<String> },
    Unary { op: UnaryOp, operand: Box<ArithExpr> },
    /// Pre/post increment and decrement.
    Step { inc: bool, pre: bool, target: Box<ArithExpr> },
    Binary { op: BinOp, lhs: Box<ArithExpr>, rhs: Box<ArithExpr> },
    Ternary { cond: Box<ArithExpr>, then: Box<ArithExpr>, other: Box<ArithExpr> },
    Assign { op: AssignOp, target: Box<ArithExpr>, value: Box<ArithExpr> },
    Group(Box<ArithExpr>),
    /// `$(cmd)` inside arithmetic; evaluated then re-parsed as a number.
    CommandSub(Script),
    /// `${...}` inside arithmetic, expanded then re-parsed.
    ParamSub(Box<WordPart>),
    /// `base#value` where base itself needs expansion first.
    DynBase { base: Box<ArithExpr>, digits: String },
    /// Adjacent pieces glued together, re-parsed after expansion (`1$x2`).
    Splice(Vec<ArithExpr>),
    /// Raw text that failed to parse; surfaces as a runtime arithmetic error.
    Invalid { text: String, message: String },
}

impl std::fmt::Display for ArithExpr {
    /// Un-parse back to source form. Static expressions round-trip to an
    /// equivalent tree; dynamic sub-expressions render as placeholders.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArithExpr::Num(n) => write!(f, "{n}"),
            ArithExpr::Var(v) => write!(f, "{v}"),
            ArithExpr::Elem { array, key: Some(k), .. } => write!(f, "{array}[{k}]"),
            ArithExpr::Elem { array, index, key: None } => write!(f, "{array}[{index}]"),
            ArithExpr::Unary { op, operand } => write!(f, "{}({operand})", op.token()),
            ArithExpr::Step { inc, pre, target } => {
                let tok = if *inc { "++" } else { "--" };
                if *pre {
                    write!(f, "{tok}{target}")
                } else {
                    write!(f, "{target}{tok}")
                }
            }
            ArithExpr::Binary { op, lhs, rhs } => {
                write!(f, "({lhs} {} {rhs})", op.token())
            }
            ArithExpr::Ternary { cond, then, other } => {
                write!(f, "({cond} ? {then} : {other})")
            }
            ArithExpr::Assign { op, target, value } => {
                write!(f, "({target} {} {value})", op.token())
            }
            ArithExpr::Group(inner) => write!(f, "({inner})"),
            ArithExpr::CommandSub(_) => write!(f, "$(...)"),
            ArithExpr::ParamSub(_) => write!(f, "${{...}}"),
            ArithExpr::DynBase { base, digits } => write!(f, "{base}#{digits}"),
            ArithExpr::Splice(pieces) => {
                for p in pieces {
                    write!(f, "{p}")?;
                }
                Ok(())
            }
            ArithExpr::Invalid { text, .. } => write!(f, "{text}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
    Not,
    BitNot,
}

impl UnaryOp {
    pub fn token(&self) -> &'static str {
        match self {
            UnaryOp::Plus => "+",
            UnaryOp::Minus => "-",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "~",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add, Sub, Mul, Div, Rem, Pow,
    Shl, Shr,
    Lt, Le, Gt, Ge, Eq, Ne,
    BitAnd, BitXor, BitOr,
    AndAnd, OrOr,
    Comma,
}

impl BinOp {
    pub fn token(&self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
            BinOp::Pow => "**",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::BitAnd => "&",
            BinOp::BitXor => "^",
            BinOp::BitOr => "|",
            BinOp::AndAnd => "&&",
            BinOp::OrOr => "||",
            BinOp::Comma => ",",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Set,
    Add, Sub, Mul, Div, Rem,
    Shl, Shr,
    And, Xor, Or,
}

impl AssignOp {
    pub fn token(&self) -> &'static str {
        match self {
            AssignOp::Set => "=",
            AssignOp::Add => "+=",
            AssignOp::Sub => "-=",
            AssignOp::Mul => "*=",
            AssignOp::Div => "/=",
            AssignOp::Rem => "%=",
            AssignOp::Shl => "<<=",
            AssignOp::Shr => ">>=",
            AssignOp::And => "&=",
            AssignOp::Xor => "^=",
            AssignOp::Or => "|=",
        }
    }
}

// ---------------------------------------------------------------------------
// Conditional expressions ([[ ]])
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum CondExpr {
    /// Bare word: true when non-empty.
    Word(Word),
    Unary { op: CondUnary, operand: Word },
    Binary { op: CondBinary, lhs: Word, rhs: Word },
    Not(Box<CondExpr>),
    And(Box<CondExpr>, Box<CondExpr>),
    Or(Box<CondExpr>, Box<CondExpr>),
    Group(Box<CondExpr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CondUnary {
    // file tests
    Exists,     // -e
    IsFile,     // -f
    IsDir,      // -d
    IsSymlink,  // -h / -L
    IsReadable, // -r
    IsWritable, // -w
    IsExec,     // -x
    NonEmptyFile, // -s
    IsPipe,     // -p
    IsSocket,   // -S
    IsBlock,    // -b
    IsChar,     // -c
    IsTty,      // -t
    Setuid,     // -u
    Setgid,     // -g
    Sticky,     // -k
    Owned,      // -O
    GroupOwned, // -G
    Modified,   // -N
    // string / shell tests
    ZeroLen,    // -z
    NonZeroLen, // -n
    VarSet,     // -v
    VarNameref, // -R
    OptSet,     // -o
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CondBinary {
    StrEq,    // = / ==  (pattern match in [[ ]])
    StrNe,    // !=
    Regex,    // =~
    StrLt,    // <
    StrGt,    // >
    NumEq, NumNe, NumLt, NumLe, NumGt, NumGe,
    Newer,    // -nt
    Older,    // -ot
    SameFile, // -ef
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_literal_helpers() {
        let w = Word::literal("done");
        assert!(w.is_literal("done"));
        assert!(!w.is_literal("do"));
        assert!(!Word::default().is_literal(""));
    }

    #[test]
    fn case_terminators_are_distinct() {
        assert_ne!(CaseTerm::Break, CaseTerm::Fallthrough);
        assert_ne!(CaseTerm::Fallthrough, CaseTerm::Continue);
    }
}
