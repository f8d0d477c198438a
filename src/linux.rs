use std::os::fd::RawFd;

use nix::{
    errno::Errno,
    unistd::{Gid, Uid},
};

pub mod capability;

pub fn setns(fd: RawFd, nstype: u32) -> Result<(), Errno> {
    let res = unsafe { libc::setns(fd, nstype as libc::c_int) };
    Errno::result(res).map(drop)
}

pub fn set_keep_capabilities(keep: bool) -> Result<(), Errno> {
    nix::sys::prctl::set_keepcaps(keep)
}

pub fn keep_capabilities() -> Result<bool, Errno> {
    nix::sys::prctl::get_keepcaps()
}

pub fn set_gid(gid: libc::gid_t) -> Result<(), Errno> {
    nix::unistd::setgid(Gid::from_raw(gid))
}

pub fn set_uid(uid: libc::uid_t) -> Result<(), Errno> {
    nix::unistd::setuid(Uid::from_raw(uid))
}
