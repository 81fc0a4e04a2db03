//! I/O error adapters for the filesystem backend.
//!
//! Converts io::Error into StoreError with the failing operation, the path and a
//! platform-aware hint. A missing file becomes `StoreError::NotFound` so callers
//! can tell "absent" apart from every other failure.
//!
//! Usage:
//!   tokio::fs::read(&p).await.map_err(store_io_error("read record", &p))?;

use std::io;
use std::path::Path;

use super::StoreError;

/// Hint appended to the message for well-known OS errors.
fn hint_for(e: &io::Error) -> Option<&'static str> {
    if let Some(code) = e.raw_os_error() {
        #[cfg(unix)]
        {
            match code {
                libc::EACCES | libc::EPERM => {
                    return Some("permission denied; check ownership and write permissions");
                }
                libc::ENOSPC => return Some("insufficient space on device"),
                libc::EROFS => return Some("read-only filesystem; cannot write here"),
                libc::ENAMETOOLONG => {
                    return Some("filename or path too long; shorten path segments");
                }
                libc::EMFILE => return Some("process file descriptor limit reached"),
                libc::ENOTDIR => return Some("a parent component is a file, not a directory"),
                _ => {}
            }
        }
        #[cfg(windows)]
        {
            match code {
                5 => return Some("access denied; check permissions"),
                32 => return Some("sharing violation; file is in use"),
                112 => return Some("insufficient disk space"),
                206 => return Some("filename or path too long"),
                _ => {}
            }
        }
        #[cfg(not(any(unix, windows)))]
        let _ = code;
    }
    match e.kind() {
        io::ErrorKind::PermissionDenied => Some("permission denied; check ownership and write permissions"),
        io::ErrorKind::AlreadyExists => Some("already exists"),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => Some("busy/timed out; retry later"),
        _ => None,
    }
}

fn build_message(op: &str, path: &Path, e: &io::Error) -> String {
    let mut msg = format!("{} '{}': {}", op, path.display(), e);
    if let Some(h) = hint_for(e) {
        msg.push_str(" (");
        msg.push_str(h);
        msg.push(')');
    }
    if let Some(code) = e.raw_os_error() {
        msg.push_str(&format!(" [os code: {code}]"));
    }
    msg
}

/// Returns a closure for `.map_err(...)` turning io::Error into StoreError.
pub fn store_io_error<'a>(op: &'a str, path: &'a Path) -> impl FnOnce(io::Error) -> StoreError + 'a {
    move |e: io::Error| {
        if e.kind() == io::ErrorKind::NotFound {
            StoreError::NotFound(path.display().to_string())
        } else {
            StoreError::Io(io::Error::new(e.kind(), build_message(op, path, &e)))
        }
    }
}
