use std::os::unix::fs::{FileTypeExt, MetadataExt, PermissionsExt};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Result, TransportError};

/// Default permission mode for created socket paths.
pub const DEFAULT_SOCKET_MODE: u32 = 0o600;

/// Maximum socket path length.
/// Unix `sockaddr_un.sun_path` is typically 108 bytes on Linux, 104 on macOS.
#[cfg(target_os = "linux")]
const MAX_PATH_LEN: usize = 108;
#[cfg(not(target_os = "linux"))]
const MAX_PATH_LEN: usize = 104;

/// Validate a socket path and remove a stale socket left at it.
///
/// Never removes a path that is not a socket.
pub fn prepare_socket_path(path: &Path) -> Result<()> {
    let bind_err = |source| TransportError::Bind {
        endpoint: format!("unix://{}", path.display()),
        source,
    };

    let path_bytes = path.as_os_str().len();
    if path_bytes >= MAX_PATH_LEN {
        return Err(TransportError::PathTooLong {
            path: path.to_path_buf(),
            len: path_bytes,
            max: MAX_PATH_LEN,
        });
    }

    if path.exists() {
        let metadata = std::fs::symlink_metadata(path).map_err(bind_err)?;
        if !metadata.file_type().is_socket() {
            return Err(TransportError::NotASocket {
                path: path.to_path_buf(),
            });
        }
        debug!(?path, "removing stale socket");
        std::fs::remove_file(path).map_err(bind_err)?;
    }

    Ok(())
}

/// Owns a bound socket file and removes it on drop.
///
/// The file is only removed if it is still the socket this guard created.
#[derive(Debug)]
pub struct SocketFileGuard {
    path: PathBuf,
    created_inode: (u64, u64),
}

impl SocketFileGuard {
    /// Restrict permissions on a freshly bound socket and record its identity.
    pub fn new(path: impl Into<PathBuf>, mode: u32) -> Result<Self> {
        let path = path.into();
        let bind_err = |source| TransportError::Bind {
            endpoint: format!("unix://{}", path.display()),
            source,
        };

        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode))
            .map_err(bind_err)?;
        let metadata = std::fs::symlink_metadata(&path).map_err(bind_err)?;
        let created_inode = (metadata.dev(), metadata.ino());

        Ok(Self {
            path,
            created_inode,
        })
    }

    /// The guarded socket path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for SocketFileGuard {
    fn drop(&mut self) {
        let (expected_dev, expected_ino) = self.created_inode;
        if let Ok(metadata) = std::fs::symlink_metadata(&self.path) {
            if metadata.file_type().is_socket()
                && metadata.dev() == expected_dev
                && metadata.ino() == expected_ino
            {
                debug!(path = ?self.path, "cleaning up socket file");
                if let Err(err) = std::fs::remove_file(&self.path) {
                    debug!(path = ?self.path, error = %err, "socket cleanup failed");
                }
            } else {
                debug!(
                    path = ?self.path,
                    "socket path identity changed; skipping cleanup"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::net::UnixListener;

    fn test_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("sttrelay-{tag}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn guard_removes_socket_on_drop() {
        let dir = test_dir("uds-drop");
        let sock_path = dir.join("relay.sock");

        prepare_socket_path(&sock_path).unwrap();
        let listener = UnixListener::bind(&sock_path).unwrap();
        let guard = SocketFileGuard::new(&sock_path, DEFAULT_SOCKET_MODE).unwrap();

        let mode = std::fs::metadata(&sock_path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);

        drop(listener);
        drop(guard);
        assert!(!sock_path.exists(), "socket file should be cleaned up on drop");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn stale_socket_is_replaced() {
        let dir = test_dir("uds-stale");
        let sock_path = dir.join("stale.sock");

        let stale = UnixListener::bind(&sock_path).unwrap();
        drop(stale);
        assert!(sock_path.exists());

        prepare_socket_path(&sock_path).unwrap();
        assert!(!sock_path.exists());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn path_too_long() {
        let long_path = PathBuf::from("/tmp/".to_string() + &"a".repeat(200) + ".sock");
        let result = prepare_socket_path(&long_path);
        assert!(matches!(result, Err(TransportError::PathTooLong { .. })));
    }

    #[test]
    fn rejects_existing_non_socket_file() {
        let dir = test_dir("uds-file");
        let sock_path = dir.join("not-a-socket.sock");
        std::fs::write(&sock_path, b"regular-file").unwrap();

        let result = prepare_socket_path(&sock_path);
        assert!(matches!(result, Err(TransportError::NotASocket { .. })));
        assert!(sock_path.exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn drop_does_not_remove_replaced_path() {
        let dir = test_dir("uds-race");
        let sock_path = dir.join("drop.sock");

        let listener = UnixListener::bind(&sock_path).unwrap();
        let guard = SocketFileGuard::new(&sock_path, DEFAULT_SOCKET_MODE).unwrap();

        std::fs::remove_file(&sock_path).unwrap();
        std::fs::write(&sock_path, b"replacement-file").unwrap();

        drop(listener);
        drop(guard);
        assert!(
            sock_path.exists(),
            "drop must not remove path if inode identity changed"
        );

        let _ = std::fs::remove_dir_all(&dir);
    }
}
