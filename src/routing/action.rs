//! Action handlers
//!
//! A handler is either an object implementing [`Action`] (its `run` method
//! is the designated entry point) or a closure wrapped by [`action`] together
//! with its declared parameter list.

use std::fmt;
use std::sync::Arc;

use super::exchange::{ActionResult, Exchange};
use super::params::{Args, Signature};

/// An application operation bound to an action name and HTTP method
pub trait Action: Send + Sync {
    /// Declared formal parameters; required ones receive request data
    fn signature(&self) -> Signature {
        Signature::new()
    }

    fn run(&self, ex: &mut Exchange<'_>, args: &Args) -> ActionResult;
}

impl<A: Action + ?Sized> Action for Arc<A> {
    fn signature(&self) -> Signature {
        (**self).signature()
    }

    fn run(&self, ex: &mut Exchange<'_>, args: &Args) -> ActionResult {
        (**self).run(ex, args)
    }
}

impl<A: Action + ?Sized> Action for Box<A> {
    fn signature(&self) -> Signature {
        (**self).signature()
    }

    fn run(&self, ex: &mut Exchange<'_>, args: &Args) -> ActionResult {
        (**self).run(ex, args)
    }
}

/// Closure handler with a declared signature
pub struct FnAction<F> {
    signature: Signature,
    f: F,
}

impl<F> fmt::Debug for FnAction<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnAction")
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

/// Wrap a closure as a handler
///
/// `decl` uses the [`Signature::parse`] syntax: `"id"` is required,
/// `"page=1"` optional with a default, `"tag?"` optional without one.
pub fn action<F>(decl: &[&str], f: F) -> FnAction<F>
where
    F: Fn(&mut Exchange<'_>, &Args) -> ActionResult + Send + Sync,
{
    FnAction {
        signature: Signature::parse(decl),
        f,
    }
}

impl<F> Action for FnAction<F>
where
    F: Fn(&mut Exchange<'_>, &Args) -> ActionResult + Send + Sync,
{
    fn signature(&self) -> Signature {
        self.signature.clone()
    }

    fn run(&self, ex: &mut Exchange<'_>, args: &Args) -> ActionResult {
        (self.f)(ex, args)
    }
}
