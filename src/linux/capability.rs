//! Process capability sets through the raw `capget(2)` / `capset(2)` interface.
//!
//! Only ABI version 3 is spoken: every set is 64 bits wide and travels as two
//! 32-bit words, low word first.

use getset::CopyGetters;
use nix::{errno::Errno, unistd::Pid};

pub const LINUX_CAPABILITY_VERSION_3: u32 = 0x2008_0522;
const LINUX_CAPABILITY_U32S_3: usize = 2;

#[repr(C)]
struct CapUserHeader {
    version: u32,
    pid: libc::c_int,
}

#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
struct CapUserData {
    effective: u32,
    permitted: u32,
    inheritable: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Capability {
    Chown = 0,
    DacOverride = 1,
    DacReadSearch = 2,
    Fowner = 3,
    Fsetid = 4,
    Kill = 5,
    SetGid = 6,
    SetUid = 7,
    SetPcap = 8,
    LinuxImmutable = 9,
    NetBindService = 10,
    NetBroadcast = 11,
    NetAdmin = 12,
    NetRaw = 13,
    IpcLock = 14,
    IpcOwner = 15,
    SysModule = 16,
    SysRawio = 17,
    SysChroot = 18,
    SysPtrace = 19,
    SysPacct = 20,
    SysAdmin = 21,
    SysBoot = 22,
    SysNice = 23,
    SysResource = 24,
    SysTime = 25,
    SysTtyConfig = 26,
    Mknod = 27,
    Lease = 28,
    AuditWrite = 29,
    AuditControl = 30,
    SetFcap = 31,
    MacOverride = 32,
    MacAdmin = 33,
    Syslog = 34,
    WakeAlarm = 35,
    BlockSuspend = 36,
    AuditRead = 37,
    Perfmon = 38,
    Bpf = 39,
    CheckpointRestore = 40,
}

impl Capability {
    fn mask(self) -> u64 {
        1 << self as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityFlag {
    Effective,
    Permitted,
    Inheritable,
}

/// Snapshot of a process's effective, permitted and inheritable sets.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct CapabilitySet {
    effective: u64,
    permitted: u64,
    inheritable: u64,
}

impl CapabilitySet {
    /// Reads the sets of the calling process, addressed by its own pid.
    pub fn current() -> Result<Self, Errno> {
        capget(nix::unistd::getpid())
    }

    pub fn has(&self, cap: Capability, flag: CapabilityFlag) -> bool {
        let set = match flag {
            CapabilityFlag::Effective => self.effective,
            CapabilityFlag::Permitted => self.permitted,
            CapabilityFlag::Inheritable => self.inheritable,
        };
        set & cap.mask() != 0
    }

    fn from_words(data: &[CapUserData; LINUX_CAPABILITY_U32S_3]) -> Self {
        let join = |lo: u32, hi: u32| u64::from(lo) | u64::from(hi) << 32;
        Self {
            effective: join(data[0].effective, data[1].effective),
            permitted: join(data[0].permitted, data[1].permitted),
            inheritable: join(data[0].inheritable, data[1].inheritable),
        }
    }

    fn to_words(self) -> [CapUserData; LINUX_CAPABILITY_U32S_3] {
        let word = |shift: u32| CapUserData {
            effective: (self.effective >> shift) as u32,
            permitted: (self.permitted >> shift) as u32,
            inheritable: (self.inheritable >> shift) as u32,
        };
        [word(0), word(32)]
    }
}

pub fn capget(pid: Pid) -> Result<CapabilitySet, Errno> {
    let mut header = CapUserHeader {
        version: LINUX_CAPABILITY_VERSION_3,
        pid: pid.as_raw(),
    };
    let mut data = [CapUserData::default(); LINUX_CAPABILITY_U32S_3];
    let res = unsafe {
        libc::syscall(
            libc::SYS_capget,
            &mut header as *mut CapUserHeader,
            data.as_mut_ptr(),
        )
    };
    Errno::result(res)?;
    Ok(CapabilitySet::from_words(&data))
}

/// Replaces the sets of the calling process with `set`.
pub fn capset(set: CapabilitySet) -> Result<(), Errno> {
    let header = CapUserHeader {
        version: LINUX_CAPABILITY_VERSION_3,
        pid: 0,
    };
    let data = set.to_words();
    let res = unsafe {
        libc::syscall(
            libc::SYS_capset,
            &header as *const CapUserHeader,
            data.as_ptr(),
        )
    };
    Errno::result(res).map(drop)
}

/// Whether the calling process currently holds `cap` in its effective set.
pub fn has_capability(cap: Capability) -> bool {
    effective_has(CapabilitySet::current(), cap)
}

fn effective_has(caps: Result<CapabilitySet, Errno>, cap: Capability) -> bool {
    match caps {
        Ok(caps) => caps.has(cap, CapabilityFlag::Effective),
        Err(errno) => {
            log::warn!("Unable to read capabilities, assuming {cap:?} is missing: {errno}");
            false
        }
    }
}
