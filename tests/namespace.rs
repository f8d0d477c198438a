mod common;

use std::{fs::File, os::fd::AsFd};

use common::{has_all, in_child, skip};
use nix::errno::Errno;
use nsjoin::{
    enter_namespaces, join_namespace, join_namespace_raw, join_namespaces, linux, Capability,
    NamespaceKind, NamespaceTarget, ProcessIdentity, UserEntry, NEWNET, NEWUSER, NEWUTS,
};

fn own_namespace(kind: NamespaceKind) -> File {
    File::open(format!("/proc/self/ns/{}", kind.name())).unwrap()
}

#[test]
fn descriptor_out_of_range_is_rejected() {
    let err = join_namespace_raw(1 << 20, 0).unwrap_err();
    assert_eq!(err.errno(), Errno::EBADF);
}

#[test]
fn regular_file_is_not_a_namespace() {
    let file = File::open("/dev/null").unwrap();
    let err = join_namespace(&file, 0).unwrap_err();
    assert_eq!(err.errno(), Errno::EINVAL);
    assert_eq!(err.nstype(), 0);
}

#[test]
fn mismatching_type_mask_is_rejected() {
    let uts = own_namespace(NamespaceKind::Uts);
    let err = join_namespace(&uts, NEWNET).unwrap_err();
    assert_eq!(err.errno(), Errno::EINVAL);
    assert_eq!(err.nstype(), NEWNET);

    // a namespace descriptor has to match the mask exactly
    let err = join_namespace(&uts, NEWUTS | NEWNET).unwrap_err();
    assert_eq!(err.errno(), Errno::EINVAL);
}

#[test]
fn joining_own_uts_namespace() {
    if !has_all(&[Capability::SysAdmin]) {
        return skip("needs CAP_SYS_ADMIN");
    }
    let uts = own_namespace(NamespaceKind::Uts);
    join_namespace(&uts, 0).unwrap();
    join_namespace(&uts, NEWUTS).unwrap();
    // the descriptor is left open
    uts.metadata().unwrap();
}

#[test]
fn join_namespaces_continues_after_failure() {
    let uts = own_namespace(NamespaceKind::Uts);
    let user = own_namespace(NamespaceKind::User);
    let report = join_namespaces(&[
        (user.as_fd(), NamespaceKind::User),
        (uts.as_fd(), NamespaceKind::Net),
        (uts.as_fd(), NamespaceKind::Uts),
    ]);

    // the current user namespace can never be re-entered
    assert_eq!(
        report.error_for(NamespaceKind::User).map(|err| err.errno()),
        Some(Errno::EINVAL)
    );
    assert_eq!(
        report.error_for(NamespaceKind::Net).map(|err| err.errno()),
        Some(Errno::EINVAL)
    );
    assert!(!report.is_complete());
    assert_eq!(report.joined() & NEWNET, 0);

    let failed: Vec<_> = report.failed().iter().map(|(kind, _)| *kind).collect();
    if has_all(&[Capability::SysAdmin]) {
        assert_eq!(failed, vec![NamespaceKind::Net, NamespaceKind::User]);
        assert_eq!(report.joined(), NEWUTS);
    } else {
        assert_eq!(
            failed,
            vec![NamespaceKind::Uts, NamespaceKind::Net, NamespaceKind::User]
        );
    }
}

#[test]
fn scoped_join_returns_to_parent_namespaces() {
    let uts = own_namespace(NamespaceKind::Uts);
    let net = own_namespace(NamespaceKind::Net);
    let guard = enter_namespaces(
        &[
            NamespaceTarget::new(NamespaceKind::Net, net.as_fd(), net.as_fd()),
            NamespaceTarget::new(NamespaceKind::Uts, uts.as_fd(), uts.as_fd()),
        ],
        UserEntry::Setns,
    );

    if has_all(&[Capability::SysAdmin]) {
        assert!(guard.report().is_complete());
        assert_eq!(guard.report().joined(), NEWUTS | NEWNET);
    } else {
        assert_eq!(guard.report().joined(), 0);
        assert_eq!(guard.report().failed().len(), 2);
    }
    guard.leave().unwrap();
}

#[test]
fn failed_return_names_the_kind() {
    if !has_all(&[Capability::SysAdmin]) {
        return skip("needs CAP_SYS_ADMIN");
    }
    let uts = own_namespace(NamespaceKind::Uts);
    let net = own_namespace(NamespaceKind::Net);
    let not_a_namespace = File::open("/dev/null").unwrap();
    let guard = enter_namespaces(
        &[
            NamespaceTarget::new(NamespaceKind::Uts, uts.as_fd(), not_a_namespace.as_fd()),
            NamespaceTarget::new(NamespaceKind::Net, net.as_fd(), net.as_fd()),
        ],
        UserEntry::Setns,
    );
    assert!(guard.report().is_complete());

    // net is left first, then uts cannot be returned to
    let err = guard.leave().unwrap_err();
    assert_eq!(err.kind(), NamespaceKind::Uts);
    assert_eq!(err.errno(), Errno::EINVAL);
}

#[test]
fn user_target_switches_identity_instead_of_setns() {
    let code = in_child(|| {
        let user = own_namespace(NamespaceKind::User);
        let id = ProcessIdentity::current();
        let guard = enter_namespaces(
            &[NamespaceTarget::new(NamespaceKind::User, user.as_fd(), user.as_fd())],
            UserEntry::SwitchIdentity {
                gid: id.gid(),
                uid: id.uid(),
                keep_capabilities: true,
            },
        );

        // re-entering the own user namespace would have failed with EINVAL
        assert!(guard.report().is_complete());
        assert_eq!(guard.report().joined() & NEWUSER, 0);
        assert!(guard.identity_error().is_none());
        assert!(linux::keep_capabilities().unwrap());
        guard.leave().unwrap();
    });
    assert_eq!(code, 0);
}

#[test]
fn user_target_with_setns_is_attempted() {
    let user = own_namespace(NamespaceKind::User);
    let guard = enter_namespaces(
        &[NamespaceTarget::new(NamespaceKind::User, user.as_fd(), user.as_fd())],
        UserEntry::Setns,
    );
    assert_eq!(
        guard
            .report()
            .error_for(NamespaceKind::User)
            .map(|err| err.errno()),
        Some(Errno::EINVAL)
    );
    guard.leave().unwrap();
}
