//! Caller-provided scratch space.
//!
//! Blocked drivers run faster with more workspace. Callers first ask for
//! the optimal length with [`Work::Query`], allocate it, and then run the
//! routine with [`Work::Execute`]. Any length between the documented minimum
//! and the optimum is accepted; the block size shrinks to fit.

use densrus_core::{require, Precondition};

#[derive(Debug)]
pub enum Work<'a> {
    /// Write the optimal workspace length into `slot[0]` and return without
    /// touching any other argument.
    Query(&'a mut [f64]),
    /// Run the routine with this scratch buffer. Its length is the lwork.
    Execute(&'a mut [f64]),
}

impl<'a> Work<'a> {
    /// Answer a query with `optimal`, or hand back the execution buffer after
    /// checking it against `minimum`.
    pub(crate) fn resolve(self, optimal: usize, minimum: usize) -> Option<&'a mut [f64]> {
        match self {
            Work::Query(slot) => {
                require!(!slot.is_empty(), Precondition::ShortWork);
                slot[0] = optimal as f64;
                None
            }
            Work::Execute(buf) => {
                require!(buf.len() >= minimum, Precondition::BadLWork);
                Some(buf)
            }
        }
    }
}
