use std::os::fd::BorrowedFd;

use getset::{CopyGetters, Getters};
use nix::errno::Errno;

use super::{join_kind, JoinReport, NamespaceKind};
use crate::identity::{self, IdentityChangeError};

#[derive(Debug, Clone, Copy)]
pub struct NamespaceTarget<'fd> {
    kind: NamespaceKind,
    target: BorrowedFd<'fd>,
    /// Namespace of the same kind to return to.
    parent: BorrowedFd<'fd>,
}

impl<'fd> NamespaceTarget<'fd> {
    pub fn new(kind: NamespaceKind, target: BorrowedFd<'fd>, parent: BorrowedFd<'fd>) -> Self {
        Self {
            kind,
            target,
            parent,
        }
    }
}

/// What to do for a [`NamespaceKind::User`] target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserEntry {
    /// `setns` into the user namespace. It is never left again.
    Setns,
    /// Skip `setns` and switch to `gid`/`uid` instead.
    SwitchIdentity {
        gid: libc::gid_t,
        uid: libc::uid_t,
        keep_capabilities: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error, CopyGetters)]
#[error("Unable to return to {} namespace, further work is impossible: {errno}", .kind.name())]
#[getset(get_copy = "pub")]
pub struct RestoreNamespaceError {
    kind: NamespaceKind,
    errno: Errno,
}

impl From<RestoreNamespaceError> for std::io::Error {
    fn from(err: RestoreNamespaceError) -> Self {
        std::io::Error::from(err.errno)
    }
}

/// Namespaces entered by [`enter_namespaces`]. Dropping the guard returns to
/// the parents like [`NamespaceGuard::leave`] and only logs failures.
#[derive(Debug, Getters)]
pub struct NamespaceGuard<'fd> {
    #[getset(get = "pub")]
    report: JoinReport,
    #[getset(get = "pub")]
    identity_error: Option<IdentityChangeError>,
    entered: Vec<(NamespaceKind, BorrowedFd<'fd>)>,
}

impl NamespaceGuard<'_> {
    /// Returns to the parent namespaces in reverse join order and stops at the
    /// first failure. A changed identity stays as it is.
    pub fn leave(mut self) -> Result<(), RestoreNamespaceError> {
        self.restore()
    }

    fn restore(&mut self) -> Result<(), RestoreNamespaceError> {
        while let Some((kind, parent)) = self.entered.pop() {
            log::debug!("Returning to parent {} namespace", kind.name());
            if let Err(err) = join_kind(parent, kind) {
                self.entered.clear();
                let err = RestoreNamespaceError {
                    kind,
                    errno: err.errno(),
                };
                log::error!("{err}");
                return Err(err);
            }
        }
        Ok(())
    }
}

impl Drop for NamespaceGuard<'_> {
    fn drop(&mut self) {
        let _ = self.restore();
    }
}

/// Joins `targets` like [`super::join_namespaces`] and remembers the parents
/// of the joined ones. The user namespace is handled as `user` says and never
/// restored.
pub fn enter_namespaces<'fd>(
    targets: &[NamespaceTarget<'fd>],
    user: UserEntry,
) -> NamespaceGuard<'fd> {
    let mut ordered = targets.to_vec();
    ordered.sort_by_key(|target| target.kind);

    let mut guard = NamespaceGuard {
        report: JoinReport::default(),
        identity_error: None,
        entered: Vec::new(),
    };
    for target in ordered {
        if target.kind != NamespaceKind::User {
            if guard
                .report
                .record(target.kind, join_kind(target.target, target.kind))
            {
                guard.entered.push((target.kind, target.parent));
            }
            continue;
        }
        match user {
            UserEntry::Setns => {
                guard
                    .report
                    .record(target.kind, join_kind(target.target, target.kind));
            }
            UserEntry::SwitchIdentity {
                gid,
                uid,
                keep_capabilities,
            } => {
                let res = if keep_capabilities {
                    identity::drop_privileges_keep_capabilities(gid, uid)
                } else {
                    identity::change_identity(gid, uid)
                };
                guard.identity_error = res.err();
            }
        }
    }
    guard
}
