//! Deadline storage backend decorator.
//!
//! Wraps another backend so that a stalled open or read fails with
//! [`TimedOut`](crate::error::ErrorKind::TimedOut) instead of blocking a
//! whole reload cycle.

use crate::error::ErrorKind;
use crate::models::{BoxAsyncRead, Opened};
use crate::{BackendHandle, StorageBackend, error::Result};
use async_trait::async_trait;
use pin_project_lite::pin_project;
use std::future::Future;
use std::io;
use std::path::Path;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, ReadBuf};
use tokio::time::{Instant, Sleep, sleep_until};

pin_project! {
    /// Async reader that errors once its deadline has passed.
    struct DeadlineRead {
        #[pin]
        inner: BoxAsyncRead,
        #[pin]
        sleep: Sleep,
    }
}

impl AsyncRead for DeadlineRead {
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        let this = self.project();
        if this.sleep.poll(cx).is_ready() {
            return Poll::Ready(Err(io::Error::new(io::ErrorKind::TimedOut, "read deadline elapsed")));
        }
        this.inner.poll_read(cx, buf)
    }
}

/// Bounded-latency storage backend.
///
/// The timeout covers the open and the subsequent read of the returned
/// stream together.
#[derive(Clone)]
pub struct DeadlineBackend {
    inner: BackendHandle,
    timeout: Duration,
}
impl DeadlineBackend {
    pub fn new(inner: BackendHandle, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait]
impl StorageBackend for DeadlineBackend {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn open(&self, path: &Path) -> Result<Opened> {
        let deadline = Instant::now() + self.timeout;
        let opened = match tokio::time::timeout_at(deadline, self.inner.open(path)).await {
            Ok(opened) => opened?,
            Err(_elapsed) => {
                tracing::warn!(backend = self.name(), path = %path.display(), timeout = ?self.timeout, "Storage open timed out");
                exn::bail!(ErrorKind::TimedOut(path.to_path_buf()));
            },
        };
        Ok(opened.map_reader(|inner| DeadlineRead {
            inner,
            sleep: sleep_until(deadline),
        }))
    }
}
