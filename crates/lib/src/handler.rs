//! Handler results and the helpers that turn a failed handler call into a description.

use std::any::Any;

/// What every handler returns. An `Err` is a handler failure.
pub type HandlerResult = anyhow::Result<()>;

/// Description of a handler call that failed, either by returning `Err` or by panicking.
/// `None` when the call returned `Ok`.
pub(crate) fn failure_description(outcome: std::thread::Result<HandlerResult>) -> Option<String> {
    match outcome {
        Ok(Ok(())) => None,
        Ok(Err(e)) => Some(e.to_string()),
        Err(payload) => Some(panic_message(payload.as_ref())),
    }
}

/// Message carried by a panic payload (`panic!("...")` yields `&str` or `String`).
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}
