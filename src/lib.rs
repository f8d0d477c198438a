//! Joining Linux namespaces and dropping to another uid/gid without losing
//! capabilities.

pub mod identity;
pub mod linux;
pub mod namespace;

pub use identity::{
    change_identity, drop_privileges_keep_capabilities, IdentityChangeError, IdentityStep,
    ProcessIdentity,
};
pub use linux::capability::{Capability, CapabilityFlag, CapabilitySet};
pub use namespace::{
    describe_mask, enter_namespaces, join_namespace, join_namespace_raw, join_namespaces,
    JoinNamespaceError, JoinReport, NamespaceGuard, NamespaceKind, NamespaceTarget, NsFlag,
    RestoreNamespaceError, UserEntry, ALL, NEWCGROUP, NEWIPC, NEWNET, NEWNS, NEWPID, NEWTIME,
    NEWUSER, NEWUTS,
};
