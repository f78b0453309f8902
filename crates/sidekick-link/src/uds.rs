use std::io::{ErrorKind, Read, Write};
use std::os::unix::fs::{FileTypeExt, MetadataExt, PermissionsExt};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::{Buf, BytesMut};
use tracing::{debug, info, warn};

use crate::error::{LinkError, Result};
use crate::traits::Link;

const RX_QUEUE_CAPACITY: usize = 1024;
const PUMP_CHUNK_SIZE: usize = 512;

/// Accepts host connections for the simulated device over a Unix domain
/// socket.
///
/// The socket file is created at bind time; a stale socket left by a
/// previous run is removed, but an existing non-socket path is refused.
pub struct UdsListener {
    listener: UnixListener,
    path: PathBuf,
    created_inode: Option<(u64, u64)>,
}

impl UdsListener {
    /// Permission mode applied to created socket paths.
    pub const SOCKET_MODE: u32 = 0o600;

    /// Unix `sockaddr_un.sun_path` is 108 bytes on Linux, 104 on macOS.
    #[cfg(target_os = "linux")]
    const MAX_PATH_LEN: usize = 108;
    #[cfg(not(target_os = "linux"))]
    const MAX_PATH_LEN: usize = 104;

    /// Bind and listen on a filesystem-path Unix domain socket.
    pub fn bind(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let len = path.as_os_str().len();
        if len >= Self::MAX_PATH_LEN {
            return Err(LinkError::PathTooLong {
                path,
                len,
                max: Self::MAX_PATH_LEN,
            });
        }

        if path.exists() {
            let bind_err = |source| LinkError::Bind {
                path: path.clone(),
                source,
            };
            let metadata = std::fs::symlink_metadata(&path).map_err(bind_err)?;
            if metadata.file_type().is_socket() {
                debug!(?path, "removing stale socket");
                std::fs::remove_file(&path).map_err(bind_err)?;
            } else {
                return Err(bind_err(std::io::Error::new(
                    ErrorKind::AlreadyExists,
                    "existing path is not a unix socket",
                )));
            }
        }

        let listener = UnixListener::bind(&path).map_err(|source| LinkError::Bind {
            path: path.clone(),
            source,
        })?;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(Self::SOCKET_MODE))
            .map_err(|source| LinkError::Bind {
                path: path.clone(),
                source,
            })?;
        let metadata = std::fs::symlink_metadata(&path).map_err(|source| LinkError::Bind {
            path: path.clone(),
            source,
        })?;

        info!(?path, "listening for host connections");
        Ok(Self {
            listener,
            path,
            created_inode: Some((metadata.dev(), metadata.ino())),
        })
    }

    /// Accept the next host connection (blocking) and hand back a
    /// non-blocking link for it.
    pub fn accept(&self) -> Result<UdsLink> {
        let (stream, _addr) = self.listener.accept().map_err(LinkError::Accept)?;
        debug!("host connected");
        UdsLink::from_stream(stream)
    }

    /// The path this listener is bound to.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for UdsListener {
    fn drop(&mut self) {
        // Only remove the path if it is still the socket we created.
        if let Some((dev, ino)) = self.created_inode {
            if let Ok(metadata) = std::fs::symlink_metadata(&self.path) {
                if metadata.file_type().is_socket()
                    && metadata.dev() == dev
                    && metadata.ino() == ino
                {
                    let _ = std::fs::remove_file(&self.path);
                }
            }
        }
    }
}

/// A [`Link`] over a connected Unix domain socket.
///
/// The stream runs in non-blocking mode; `available` pumps whatever the
/// kernel has buffered into an internal queue so the framing layer sees the
/// firmware-style count semantics. When the peer disconnects, the link
/// drains its queue and then goes permanently quiet.
pub struct UdsLink {
    stream: UnixStream,
    rx: BytesMut,
    peer_gone: Arc<AtomicBool>,
}

impl UdsLink {
    /// Connect to a listening device socket.
    pub fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let stream = UnixStream::connect(path).map_err(|source| LinkError::Connect {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(?path, "connected to device socket");
        Self::from_stream(stream)
    }

    fn from_stream(stream: UnixStream) -> Result<Self> {
        stream.set_nonblocking(true)?;
        Ok(Self {
            stream,
            rx: BytesMut::with_capacity(RX_QUEUE_CAPACITY),
            peer_gone: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Whether the peer has closed its end of the connection.
    pub fn is_peer_gone(&self) -> bool {
        self.peer_gone.load(Ordering::SeqCst)
    }

    /// Shared flag that flips once the peer disconnects. Lets a caller that
    /// has handed the link away keep watching for hangup.
    pub fn hangup_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.peer_gone)
    }

    fn pump(&mut self) {
        if self.is_peer_gone() {
            return;
        }
        let mut chunk = [0u8; PUMP_CHUNK_SIZE];
        loop {
            match self.stream.read(&mut chunk) {
                Ok(0) => {
                    debug!("peer closed connection");
                    self.peer_gone.store(true, Ordering::SeqCst);
                    return;
                }
                Ok(n) => self.rx.extend_from_slice(&chunk[..n]),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => return,
                Err(err) => {
                    warn!(%err, "link read error; treating peer as gone");
                    self.peer_gone.store(true, Ordering::SeqCst);
                    return;
                }
            }
        }
    }
}

impl Link for UdsLink {
    fn available(&mut self) -> usize {
        self.pump();
        self.rx.len()
    }

    fn read(&mut self, buf: &mut [u8]) -> usize {
        self.pump();
        let n = self.rx.len().min(buf.len());
        buf[..n].copy_from_slice(&self.rx[..n]);
        self.rx.advance(n);
        n
    }

    fn write(&mut self, buf: &[u8]) -> usize {
        let mut written = 0usize;
        while written < buf.len() {
            match self.stream.write(&buf[written..]) {
                Ok(0) => break,
                Ok(n) => written += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => {
                    warn!(%err, "link write error");
                    break;
                }
            }
        }
        written
    }
}
