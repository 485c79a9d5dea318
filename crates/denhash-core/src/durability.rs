//! File synchronization with real persistence guarantees.
//!
//! The record log only needs its data blocks on stable storage; file
//! metadata (timestamps, and on most filesystems the length after an
//! append is covered by the data sync on the platforms below) is not part
//! of the durability contract.

use std::fs::File;
use std::io;

/// Flush `file` so its contents survive power loss.
///
/// Linux gets `fdatasync` (no metadata round-trip). Apple platforms need
/// `fcntl(F_FULLFSYNC)`: plain fsync there stops at the drive's volatile
/// write cache. Windows uses `FlushFileBuffers`. Anything else falls back
/// to `File::sync_data`.
///
/// May block for a long time under heavy I/O; callers must not hold the
/// index lock across it.
pub fn durable_sync(file: &File) -> io::Result<()> {
    sync_impl(file)
}

#[cfg(target_os = "linux")]
fn sync_impl(file: &File) -> io::Result<()> {
    use std::os::unix::io::AsRawFd;
    // SAFETY: the descriptor belongs to `file`, which stays open for the
    // duration of the call
    match unsafe { libc::fdatasync(file.as_raw_fd()) } {
        0 => Ok(()),
        _ => Err(io::Error::last_os_error()),
    }
}

#[cfg(any(target_os = "macos", target_os = "ios"))]
fn sync_impl(file: &File) -> io::Result<()> {
    use std::os::unix::io::AsRawFd;
    // SAFETY: the descriptor belongs to `file`, which stays open for the
    // duration of the call
    match unsafe { libc::fcntl(file.as_raw_fd(), libc::F_FULLFSYNC) } {
        0 => Ok(()),
        _ => Err(io::Error::last_os_error()),
    }
}

#[cfg(target_os = "windows")]
fn sync_impl(file: &File) -> io::Result<()> {
    use std::os::windows::io::AsRawHandle;
    use winapi::um::fileapi::FlushFileBuffers;
    // SAFETY: the handle belongs to `file`, which stays open for the
    // duration of the call
    let ok = unsafe { FlushFileBuffers(file.as_raw_handle() as *mut _) };
    if ok != 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(not(any(
    target_os = "linux",
    target_os = "macos",
    target_os = "ios",
    target_os = "windows"
)))]
fn sync_impl(file: &File) -> io::Result<()> {
    file.sync_data()
}
