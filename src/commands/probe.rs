//! Hidden `probe <path>`: the child side of the isolated identity probe

use std::path::Path;

use crate::assembly::{IdentityProbe, InProcessProbe, ProbeOutcome};

use super::{CommandResult, Response};

/// Exit code when the file has no readable identity
pub const UNREADABLE_EXIT_CODE: i32 = 2;

/// One line of JSON describing the identity of `path`
pub fn run(path: &Path) -> CommandResult<Response> {
    let outcome = InProcessProbe.identity_of(path);
    let exit_code = match outcome {
        ProbeOutcome::Identified(_) => 0,
        ProbeOutcome::Unreadable(_) => UNREADABLE_EXIT_CODE,
    };
    Ok(Response::message(serde_json::to_string(&outcome)?).with_exit_code(exit_code))
}
