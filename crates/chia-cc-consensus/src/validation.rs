//! Structural helpers over generator output. Every failure carries the
//! [`ErrorCode`] the caller asked for, so the extractor can report it together
//! with the cost accrued so far.

use clvmr::allocator::{Allocator, Atom, NodePtr, SExp};

use crate::ErrorCode;

pub fn first(a: &Allocator, n: NodePtr, code: ErrorCode) -> Result<NodePtr, ErrorCode> {
    match a.sexp(n) {
        SExp::Pair(left, _) => Ok(left),
        SExp::Atom => Err(code),
    }
}

pub fn rest(a: &Allocator, n: NodePtr, code: ErrorCode) -> Result<NodePtr, ErrorCode> {
    match a.sexp(n) {
        SExp::Pair(_, right) => Ok(right),
        SExp::Atom => Err(code),
    }
}

/// Steps through a proper list. The terminator must be nil.
pub fn next(
    a: &Allocator,
    n: NodePtr,
    code: ErrorCode,
) -> Result<Option<(NodePtr, NodePtr)>, ErrorCode> {
    match a.sexp(n) {
        SExp::Pair(left, right) => Ok(Some((left, right))),
        SExp::Atom => {
            if a.atom_len(n) == 0 {
                Ok(None)
            } else {
                Err(code)
            }
        }
    }
}

pub fn atom(a: &Allocator, n: NodePtr, code: ErrorCode) -> Result<Atom<'_>, ErrorCode> {
    match a.sexp(n) {
        SExp::Atom => Ok(a.atom(n)),
        SExp::Pair(..) => Err(code),
    }
}

pub fn check_nil(a: &Allocator, n: NodePtr, code: ErrorCode) -> Result<(), ErrorCode> {
    if atom(a, n, code)?.as_ref().is_empty() {
        Ok(())
    } else {
        Err(code)
    }
}

/// Splits a list of exactly two elements.
pub fn two_items(
    a: &Allocator,
    n: NodePtr,
    code: ErrorCode,
) -> Result<(NodePtr, NodePtr), ErrorCode> {
    let left = first(a, n, code)?;
    let n = rest(a, n, code)?;
    let right = first(a, n, code)?;
    check_nil(a, rest(a, n, code)?, code)?;
    Ok((left, right))
}
