//! Process-wide and unlocked, callers serialize identity changes themselves.

use std::fmt::Display;

use getset::CopyGetters;
use nix::errno::Errno;

use crate::linux::{
    self,
    capability::{self, CapabilitySet},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentityStep {
    KeepCapabilities,
    CaptureCapabilities,
    SetGid,
    SetUid,
    RestoreCapabilities,
}

impl Display for IdentityStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdentityStep::KeepCapabilities => write!(f, "enable keep-capabilities"),
            IdentityStep::CaptureCapabilities => write!(f, "read capabilities"),
            IdentityStep::SetGid => write!(f, "set gid"),
            IdentityStep::SetUid => write!(f, "set uid"),
            IdentityStep::RestoreCapabilities => write!(f, "restore capabilities"),
        }
    }
}

/// Steps before `step` are not undone. From [`IdentityStep::SetGid`] on the
/// resulting identity is unknown, check [`ProcessIdentity::current`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error, CopyGetters)]
#[error("Unable to {step}: {errno}")]
#[getset(get_copy = "pub")]
pub struct IdentityChangeError {
    step: IdentityStep,
    errno: Errno,
}

impl From<IdentityChangeError> for std::io::Error {
    fn from(err: IdentityChangeError) -> Self {
        std::io::Error::from(err.errno)
    }
}

fn run_step<T>(
    step: IdentityStep,
    op: impl FnOnce() -> Result<T, Errno>,
) -> Result<T, IdentityChangeError> {
    log::trace!("Identity change: {step}");
    op().map_err(|errno| {
        log::error!("Identity change aborted, unable to {step}: {errno}");
        IdentityChangeError { step, errno }
    })
}

/// Keep-capabilities, read capabilities, `setgid`, `setuid`, write the same
/// capabilities back. The keep-capabilities flag stays enabled.
pub fn drop_privileges_keep_capabilities(
    gid: libc::gid_t,
    uid: libc::uid_t,
) -> Result<(), IdentityChangeError> {
    run_step(IdentityStep::KeepCapabilities, || {
        linux::set_keep_capabilities(true)
    })?;
    let caps = run_step(IdentityStep::CaptureCapabilities, CapabilitySet::current)?;
    run_step(IdentityStep::SetGid, || linux::set_gid(gid))?;
    run_step(IdentityStep::SetUid, || linux::set_uid(uid))?;
    run_step(IdentityStep::RestoreCapabilities, || capability::capset(caps))?;
    log::info!("Switched to uid {uid} gid {gid} keeping capabilities {caps:?}");
    Ok(())
}

pub fn change_identity(gid: libc::gid_t, uid: libc::uid_t) -> Result<(), IdentityChangeError> {
    run_step(IdentityStep::SetGid, || linux::set_gid(gid))?;
    run_step(IdentityStep::SetUid, || linux::set_uid(uid))?;
    log::info!("Switched to uid {uid} gid {gid}");
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct ProcessIdentity {
    uid: libc::uid_t,
    euid: libc::uid_t,
    gid: libc::gid_t,
    egid: libc::gid_t,
}

impl ProcessIdentity {
    pub fn current() -> Self {
        Self {
            uid: nix::unistd::getuid().as_raw(),
            euid: nix::unistd::geteuid().as_raw(),
            gid: nix::unistd::getgid().as_raw(),
            egid: nix::unistd::getegid().as_raw(),
        }
    }

    pub fn is(&self, gid: libc::gid_t, uid: libc::uid_t) -> bool {
        self.gid == gid && self.egid == gid && self.uid == uid && self.euid == uid
    }
}
