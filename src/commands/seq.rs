use async_trait::async_trait;

use crate::commands::{Command, CommandContext};
use crate::interp::flow::ExecOutcome;

/// Print a number sequence.
pub struct Seq;

#[async_trait]
impl Command for Seq {
    fn name(&self) -> &'static str {
        "seq"
    }

    async fn execute(&self, ctx: CommandContext) -> ExecOutcome {
        let nums: Vec<i64> = ctx.argv[1..]
            .iter()
            .filter_map(|s| s.parse().ok())
            .collect();
        let (first, incr, last) = match nums.len() {
            1 => (1, 1, nums[0]),
            2 => (nums[0], 1, nums[1]),
            3 => (nums[0], nums[1], nums[2]),
            _ => return ExecOutcome::failure("seq: missing operand\n", 1),
        };
        if incr == 0 {
            return ExecOutcome::failure("seq: increment must not be 0\n", 1);
        }
        let mut out = String::new();
        let mut n = first;
        let mut emitted = 0u64;
        while (incr > 0 && n <= last) || (incr < 0 && n >= last) {
            out.push_str(&format!("{n}\n"));
            n += incr;
            emitted += 1;
            if emitted > 10_000_000 {
                break;
            }
        }
        ExecOutcome::success(out)
    }
}
