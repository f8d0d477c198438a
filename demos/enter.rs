//! Enters the namespaces of another process and prints the mount points seen
//! from there.
//!
//! Usage: enter <pid> [<uid> <gid>]

use std::{
    fs::{File, OpenOptions},
    io::BufRead,
    os::{
        fd::AsFd,
        unix::fs::{MetadataExt, OpenOptionsExt},
    },
};

use nsjoin::{namespace::kinds_in, NamespaceKind, NamespaceTarget, UserEntry, ALL};
use simplelog::*;

fn open_ns(pid: &str, kind: NamespaceKind) -> std::io::Result<File> {
    OpenOptions::new()
        .read(true)
        .custom_flags(libc::O_NONBLOCK | libc::O_NOCTTY)
        .open(format!("/proc/{pid}/ns/{}", kind.name()))
}

/// The current user namespace cannot be re-entered.
fn same_user_ns(pid: &str) -> std::io::Result<bool> {
    let own = std::fs::metadata("/proc/self/ns/user")?.ino();
    let target = std::fs::metadata(format!("/proc/{pid}/ns/user"))?.ino();
    Ok(own == target)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    TermLogger::init(
        LevelFilter::Debug,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(pid) = args.first() else {
        eprintln!("usage: enter <pid> [<uid> <gid>]");
        std::process::exit(2);
    };
    let switch_to = match (args.get(1), args.get(2)) {
        (Some(uid), Some(gid)) => Some((uid.parse::<u32>()?, gid.parse::<u32>()?)),
        _ => None,
    };

    let skip_user = same_user_ns(pid)?;
    let mut files = Vec::new();
    for kind in kinds_in(ALL) {
        // with an identity switch the user descriptor is never passed to setns
        if kind == NamespaceKind::User && skip_user && switch_to.is_none() {
            continue;
        }
        match (open_ns(pid, kind), open_ns("self", kind)) {
            (Ok(target), Ok(parent)) => files.push((kind, target, parent)),
            (Err(err), _) | (_, Err(err)) => {
                log::warn!("Skipping {} namespace: {err}", kind.name())
            }
        }
    }
    let targets: Vec<_> = files
        .iter()
        .map(|(kind, target, parent)| {
            NamespaceTarget::new(*kind, target.as_fd(), parent.as_fd())
        })
        .collect();
    let user = match switch_to {
        Some((uid, gid)) => UserEntry::SwitchIdentity {
            gid,
            uid,
            keep_capabilities: true,
        },
        None => UserEntry::Setns,
    };

    let guard = nsjoin::enter_namespaces(&targets, user);
    for (kind, err) in guard.report().failed() {
        eprintln!("[NS] ERROR: <{}> {err}", kind.name().to_uppercase());
    }
    if let Some(err) = guard.identity_error() {
        eprintln!("[NS] ERROR: <USER> {err}");
    }
    log::info!("Joined {}", nsjoin::describe_mask(guard.report().joined()));

    let mounts = std::io::BufReader::new(File::open("/proc/self/mounts")?);
    for line in mounts.lines() {
        let line = line?;
        if let Some(mount_point) = line.split_whitespace().nth(1) {
            println!("{mount_point}");
        }
    }
    guard.leave()?;
    Ok(())
}
