// Response finalization on the wire
// hyper answers unparseable requests (bad request line, bad header, oversized
// head) itself, without calling the service. Those heads get the interceptor
// here, just before they reach the socket.

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{ready, Context, Poll};

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use crate::http::HttpResponse;
use crate::interceptor::ResponseInterceptor;

/// Heads growing past this are forwarded untouched
const MAX_HEAD_SIZE: usize = 64 * 1024;

/// Responses handed to hyper by the service and not yet seen on the wire
///
/// One entry per response, in order. The entry is `true` when the request was
/// HEAD, in which case no body follows the head whatever `Content-Length` says.
#[derive(Debug, Clone, Default)]
pub struct ServedResponses(Arc<Mutex<VecDeque<bool>>>);

impl ServedResponses {
    pub fn record(&self, head_request: bool) {
        self.lock().push_back(head_request);
    }

    fn take(&self) -> Option<bool> {
        self.lock().pop_front()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<bool>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

enum WriteState {
    /// Collecting a response head
    Head(Vec<u8>),
    /// Forwarding this many body bytes
    Body(usize),
    /// Framing unknown (chunked, close-delimited, oversized head)
    Passthrough,
}

/// Connection stream that finalizes response heads hyper writes on its own
pub struct FinalizingStream<S> {
    inner: S,
    interceptor: Arc<dyn ResponseInterceptor>,
    served: ServedResponses,
    state: WriteState,
    /// Finalized head bytes not yet accepted by `inner`
    pending: Vec<u8>,
    pending_pos: usize,
}

impl<S> FinalizingStream<S> {
    pub fn new(inner: S, interceptor: Arc<dyn ResponseInterceptor>, served: ServedResponses) -> Self {
        Self {
            inner,
            interceptor,
            served,
            state: WriteState::Head(Vec::new()),
            pending: Vec::new(),
            pending_pos: 0,
        }
    }

    /// Queue a complete head and pick the framing of what follows it
    fn finish_head(&mut self, head: Vec<u8>) {
        let info = HeadInfo::parse(&head);

        // Anything the service produced was already intercepted
        let head_request = match self.served.take() {
            Some(head_request) => {
                self.pending = head;
                head_request
            }
            None => {
                self.pending = finalize_head(&head, info.status, self.interceptor.as_ref());
                false
            }
        };
        self.pending_pos = 0;

        let bodyless = head_request || info.status < 200 || info.status == 204 || info.status == 304;
        self.state = if info.status == 0 {
            WriteState::Passthrough
        } else if bodyless {
            WriteState::Head(Vec::new())
        } else if info.chunked {
            WriteState::Passthrough
        } else {
            match info.content_length {
                Some(0) => WriteState::Head(Vec::new()),
                Some(n) => WriteState::Body(n),
                None => WriteState::Passthrough,
            }
        };
    }
}

impl<S: AsyncWrite + Unpin> FinalizingStream<S> {
    fn poll_drain(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        while self.pending_pos < self.pending.len() {
            let n = ready!(Pin::new(&mut self.inner).poll_write(cx, &self.pending[self.pending_pos..]))?;
            if n == 0 {
                return Poll::Ready(Err(io::ErrorKind::WriteZero.into()));
            }
            self.pending_pos += n;
        }
        self.pending.clear();
        self.pending_pos = 0;
        Poll::Ready(Ok(()))
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for FinalizingStream<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_read(cx, buf)
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for FinalizingStream<S> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        ready!(this.poll_drain(cx))?;
        if buf.is_empty() {
            return Poll::Ready(Ok(0));
        }

        match &mut this.state {
            WriteState::Passthrough => Pin::new(&mut this.inner).poll_write(cx, buf),
            WriteState::Body(remaining) => {
                let limit = (*remaining).min(buf.len());
                let n = ready!(Pin::new(&mut this.inner).poll_write(cx, &buf[..limit]))?;
                *remaining -= n;
                if *remaining == 0 {
                    this.state = WriteState::Head(Vec::new());
                }
                Poll::Ready(Ok(n))
            }
            WriteState::Head(head) => {
                let already = head.len();
                head.extend_from_slice(buf);

                let search_from = already.saturating_sub(3);
                let end = head[search_from..]
                    .windows(4)
                    .position(|w| w == b"\r\n\r\n")
                    .map(|i| search_from + i + 4);

                match end {
                    Some(end) => {
                        head.truncate(end);
                        let head = std::mem::take(head);
                        this.finish_head(head);
                        Poll::Ready(Ok(end - already))
                    }
                    None if head.len() > MAX_HEAD_SIZE => {
                        this.pending = std::mem::take(head);
                        this.pending_pos = 0;
                        this.state = WriteState::Passthrough;
                        Poll::Ready(Ok(buf.len()))
                    }
                    None => Poll::Ready(Ok(buf.len())),
                }
            }
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        ready!(this.poll_drain(cx))?;
        Pin::new(&mut this.inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        // A partial head is sent as is
        if let WriteState::Head(head) = &mut this.state {
            if !head.is_empty() {
                this.pending.extend_from_slice(head);
                head.clear();
            }
        }
        ready!(this.poll_drain(cx))?;
        Pin::new(&mut this.inner).poll_shutdown(cx)
    }
}

/// What the framing of a response depends on
#[derive(Debug, PartialEq, Eq)]
struct HeadInfo {
    status: u16,
    content_length: Option<usize>,
    chunked: bool,
}

impl HeadInfo {
    fn parse(head: &[u8]) -> Self {
        let mut lines = head_lines(head);
        let status = lines
            .next()
            .and_then(|line| std::str::from_utf8(line).ok())
            .and_then(|line| line.split_whitespace().nth(1))
            .and_then(|code| code.parse().ok())
            .unwrap_or(0);

        let mut info = Self {
            status,
            content_length: None,
            chunked: false,
        };
        for (name, value) in lines.filter_map(split_header) {
            if name.eq_ignore_ascii_case("content-length") {
                info.content_length = value.parse().ok();
            } else if name.eq_ignore_ascii_case("transfer-encoding") {
                info.chunked = true;
            }
        }
        info
    }
}

/// Lines of a head, without the terminating blank line or CRLFs
fn head_lines(head: &[u8]) -> impl Iterator<Item = &[u8]> {
    head.split(|&b| b == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
        .filter(|line| !line.is_empty())
}

fn split_header(line: &[u8]) -> Option<(&str, &str)> {
    let line = std::str::from_utf8(line).ok()?;
    let (name, value) = line.split_once(':')?;
    Some((name.trim(), value.trim()))
}

/// Run `interceptor` on a head hyper produced and splice its headers in
///
/// Headers the interceptor sets replace any line of the same name.
fn finalize_head(head: &[u8], status: u16, interceptor: &dyn ResponseInterceptor) -> Vec<u8> {
    let Ok(status) = StatusCode::from_u16(status) else {
        return head.to_vec();
    };
    let mut response: HttpResponse = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = status;
    interceptor.on_response(&mut response);
    if response.headers().is_empty() {
        return head.to_vec();
    }

    let mut out = Vec::with_capacity(head.len() + 128);
    for (i, line) in head_lines(head).enumerate() {
        let replaced = i > 0
            && split_header(line).is_some_and(|(name, _)| {
                response.headers().contains_key(name.to_ascii_lowercase().as_str())
            });
        if !replaced {
            out.extend_from_slice(line);
            out.extend_from_slice(b"\r\n");
        }
    }
    for (name, value) in response.headers() {
        out.extend_from_slice(name.as_str().as_bytes());
        out.extend_from_slice(b": ");
        out.extend_from_slice(value.as_bytes());
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(b"\r\n");
    out
}
