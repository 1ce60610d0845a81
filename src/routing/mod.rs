//! Routing module
//!
//! Action-based dispatch:
//! - Action name taken from a request field, with a default action
//! - Handler lookup by action name and HTTP method
//! - Argument binding from request data and forwarded parameters
//! - Forward and redirect between actions

mod action;
mod exchange;
mod params;
mod request;
mod router;

pub use action::{action, Action, FnAction};
pub use exchange::{ActionResult, Done, Exchange};
pub use params::{bind, Args, Param, Params, Signature};
pub use request::RequestData;
pub use router::Router;
