use clvmr::allocator::{Allocator, NodePtr};
use clvmr::chia_dialect::{ChiaDialect, ClvmFlags};
use clvmr::cost::Cost;
use clvmr::reduction::Reduction;
use clvmr::run_program::run_program;

use crate::EvalFault;

/// Runs CLVM programs. The extractor and the spend builder only see this
/// trait, so the engine can be swapped out (or faked in tests).
pub trait ProgramEvaluator {
    fn run(
        &self,
        a: &mut Allocator,
        program: NodePtr,
        args: NodePtr,
        max_cost: Cost,
    ) -> Result<(Cost, NodePtr), EvalFault>;
}

/// Evaluates programs with `clvmr` under the chia dialect.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ClvmEvaluator {
    pub flags: u32,
}

impl ClvmEvaluator {
    pub fn new(flags: u32) -> Self {
        Self { flags }
    }
}

impl ProgramEvaluator for ClvmEvaluator {
    fn run(
        &self,
        a: &mut Allocator,
        program: NodePtr,
        args: NodePtr,
        max_cost: Cost,
    ) -> Result<(Cost, NodePtr), EvalFault> {
        let dialect = ChiaDialect::new(ClvmFlags::from_bits_truncate(self.flags));
        let Reduction(cost, result) = run_program(a, &dialect, program, args, max_cost)?;
        Ok((cost, result))
    }
}

impl<T: ProgramEvaluator + ?Sized> ProgramEvaluator for &T {
    fn run(
        &self,
        a: &mut Allocator,
        program: NodePtr,
        args: NodePtr,
        max_cost: Cost,
    ) -> Result<(Cost, NodePtr), EvalFault> {
        (**self).run(a, program, args, max_cost)
    }
}
