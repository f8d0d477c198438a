#![allow(dead_code)]

use nix::{
    sys::wait::{waitpid, WaitStatus},
    unistd::{fork, ForkResult},
};
use nsjoin::{linux::capability::has_capability, Capability};

/// Runs `f` in a forked child so process-wide changes stay out of the test
/// harness. Returns the child's exit code, 0 when `f` returned without
/// panicking.
pub fn in_child(f: impl FnOnce()) -> i32 {
    match unsafe { fork() }.expect("fork") {
        ForkResult::Child => {
            let code = match std::panic::catch_unwind(std::panic::AssertUnwindSafe(f)) {
                Ok(()) => 0,
                Err(_) => 101,
            };
            unsafe { libc::_exit(code) }
        }
        ForkResult::Parent { child } => match waitpid(child, None).expect("waitpid") {
            WaitStatus::Exited(_, code) => code,
            status => panic!("child ended with {status:?}"),
        },
    }
}

pub fn has_all(caps: &[Capability]) -> bool {
    caps.iter().all(|cap| has_capability(*cap))
}

pub fn skip(reason: &str) {
    eprintln!("skipped: {reason}");
}
