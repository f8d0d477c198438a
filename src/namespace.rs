//! Unsupported kinds are `0` in the raw constants, which the kernel reads as
//! "any namespace type". Use [`NsFlag::is_supported`] to tell them apart.

use std::os::fd::{AsFd, AsRawFd, BorrowedFd, RawFd};

use getset::{CopyGetters, Getters};
use nix::errno::Errno;

use crate::linux;

mod guard;
pub use guard::*;

/// Declared in join order, user last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NamespaceKind {
    CGroup,
    Ipc,
    Uts,
    Net,
    Pid,
    Mnt,
    Time,
    User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NsFlag {
    Supported(u32),
    Unsupported,
}

impl NsFlag {
    pub const fn bits(self) -> u32 {
        match self {
            NsFlag::Supported(bits) => bits,
            NsFlag::Unsupported => 0,
        }
    }

    pub const fn is_supported(self) -> bool {
        matches!(self, NsFlag::Supported(_))
    }
}

#[cfg(feature = "cgroup-ns")]
const CGROUP_FLAG: NsFlag = NsFlag::Supported(libc::CLONE_NEWCGROUP as u32);
#[cfg(not(feature = "cgroup-ns"))]
const CGROUP_FLAG: NsFlag = NsFlag::Unsupported;

#[cfg(feature = "time-ns")]
const TIME_FLAG: NsFlag = NsFlag::Supported(libc::CLONE_NEWTIME as u32);
#[cfg(not(feature = "time-ns"))]
const TIME_FLAG: NsFlag = NsFlag::Unsupported;

impl NamespaceKind {
    pub const ALL: [NamespaceKind; 8] = [
        NamespaceKind::CGroup,
        NamespaceKind::Ipc,
        NamespaceKind::Uts,
        NamespaceKind::Net,
        NamespaceKind::Pid,
        NamespaceKind::Mnt,
        NamespaceKind::Time,
        NamespaceKind::User,
    ];

    pub const fn flag(self) -> NsFlag {
        match self {
            NamespaceKind::CGroup => CGROUP_FLAG,
            NamespaceKind::Ipc => NsFlag::Supported(libc::CLONE_NEWIPC as u32),
            NamespaceKind::Uts => NsFlag::Supported(libc::CLONE_NEWUTS as u32),
            NamespaceKind::Net => NsFlag::Supported(libc::CLONE_NEWNET as u32),
            NamespaceKind::Pid => NsFlag::Supported(libc::CLONE_NEWPID as u32),
            NamespaceKind::Mnt => NsFlag::Supported(libc::CLONE_NEWNS as u32),
            NamespaceKind::Time => TIME_FLAG,
            NamespaceKind::User => NsFlag::Supported(libc::CLONE_NEWUSER as u32),
        }
    }

    /// Name the kernel uses for this kind, as in `/proc/<pid>/ns/<name>`.
    pub const fn name(self) -> &'static str {
        match self {
            NamespaceKind::CGroup => "cgroup",
            NamespaceKind::Ipc => "ipc",
            NamespaceKind::Uts => "uts",
            NamespaceKind::Net => "net",
            NamespaceKind::Pid => "pid",
            NamespaceKind::Mnt => "mnt",
            NamespaceKind::Time => "time",
            NamespaceKind::User => "user",
        }
    }
}

pub const NEWNS: u32 = NamespaceKind::Mnt.flag().bits();
pub const NEWUTS: u32 = NamespaceKind::Uts.flag().bits();
pub const NEWIPC: u32 = NamespaceKind::Ipc.flag().bits();
pub const NEWUSER: u32 = NamespaceKind::User.flag().bits();
pub const NEWPID: u32 = NamespaceKind::Pid.flag().bits();
pub const NEWNET: u32 = NamespaceKind::Net.flag().bits();
pub const NEWCGROUP: u32 = NamespaceKind::CGroup.flag().bits();
pub const NEWTIME: u32 = NamespaceKind::Time.flag().bits();
pub const ALL: u32 = NEWNS | NEWUTS | NEWIPC | NEWUSER | NEWPID | NEWNET | NEWCGROUP | NEWTIME;

/// Supported kinds whose bit is set in `mask`, in join order.
pub fn kinds_in(mask: u32) -> Vec<NamespaceKind> {
    NamespaceKind::ALL
        .into_iter()
        .filter(|kind| kind.flag().bits() & mask != 0)
        .collect()
}

/// Renders `mask` as `|`-separated kind names, e.g. `"net|mnt|user"`.
pub fn describe_mask(mask: u32) -> String {
    kinds_in(mask)
        .into_iter()
        .map(NamespaceKind::name)
        .collect::<Vec<_>>()
        .join("|")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error, CopyGetters)]
#[error("Unable to join namespace (nstype {nstype:#x}): {errno}")]
#[getset(get_copy = "pub")]
pub struct JoinNamespaceError {
    nstype: u32,
    errno: Errno,
}

impl From<JoinNamespaceError> for std::io::Error {
    fn from(err: JoinNamespaceError) -> Self {
        std::io::Error::from(err.errno)
    }
}

/// Only the calling thread moves. `fd` stays open.
pub fn join_namespace<Fd: AsFd>(fd: Fd, nstype: u32) -> Result<(), JoinNamespaceError> {
    join_namespace_raw(fd.as_fd().as_raw_fd(), nstype)
}

pub fn join_namespace_raw(fd: RawFd, nstype: u32) -> Result<(), JoinNamespaceError> {
    log::debug!("setns fd {fd} nstype {nstype:#x}");
    linux::setns(fd, nstype).map_err(|errno| JoinNamespaceError { nstype, errno })
}

#[derive(Debug, Default, Getters, CopyGetters)]
pub struct JoinReport {
    /// Bits of every kind that was joined.
    #[getset(get_copy = "pub")]
    joined: u32,
    #[getset(get = "pub")]
    failed: Vec<(NamespaceKind, JoinNamespaceError)>,
}

impl JoinReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn error_for(&self, kind: NamespaceKind) -> Option<&JoinNamespaceError> {
        self.failed
            .iter()
            .find(|(failed, _)| *failed == kind)
            .map(|(_, err)| err)
    }
}

/// Joins `fd` restricted to `kind`. Unsupported kinds fail with `EINVAL`
/// without reaching the kernel, their zero bit would accept any namespace.
fn join_kind(fd: BorrowedFd<'_>, kind: NamespaceKind) -> Result<u32, JoinNamespaceError> {
    match kind.flag() {
        NsFlag::Supported(bits) => join_namespace(fd, bits).map(|()| bits),
        NsFlag::Unsupported => Err(JoinNamespaceError {
            nstype: 0,
            errno: Errno::EINVAL,
        }),
    }
}

impl JoinReport {
    fn record(&mut self, kind: NamespaceKind, res: Result<u32, JoinNamespaceError>) -> bool {
        match res {
            Ok(bits) => {
                self.joined |= bits;
                true
            }
            Err(err) => {
                log::warn!("Failed to join {} namespace: {err}", kind.name());
                self.failed.push((kind, err));
                false
            }
        }
    }
}

/// Joins every target in join order. A failure does not stop the remaining
/// joins.
pub fn join_namespaces(targets: &[(BorrowedFd<'_>, NamespaceKind)]) -> JoinReport {
    let mut ordered = targets.to_vec();
    ordered.sort_by_key(|(_, kind)| *kind);

    let mut report = JoinReport::default();
    for (fd, kind) in ordered {
        report.record(kind, join_kind(fd, kind));
    }
    report
}
