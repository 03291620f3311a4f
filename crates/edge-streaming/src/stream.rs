//! Pull-based chunk stream.

use std::pin::Pin;
use std::task::{Context, Poll};

use edge_core::{RenderContext, RenderError, RenderNode};
use futures::Stream;

use crate::machine::{CancelHandle, RenderMachine, RenderStats};
use crate::options::RenderOptions;

/// Streams a render as ordered HTML chunks.
///
/// Buffered output is handed out before the walk advances. While the walk
/// waits on asynchronous work, whatever is already buffered is emitted as a
/// partial chunk. The stream ends after an error or a cancellation.
pub struct RenderStream {
    machine: RenderMachine,
    chunk_size: usize,
    started: bool,
    ended: bool,
}

impl RenderStream {
    pub fn new(root: RenderNode, context: RenderContext, options: RenderOptions) -> Self {
        let chunk_size = options.chunk_size.max(1);
        Self {
            machine: RenderMachine::new(root, context, options),
            chunk_size,
            started: false,
            ended: false,
        }
    }

    /// Poll for the next chunk of at most `size` bytes. `Ok(None)` means the
    /// stream has ended.
    pub fn poll_read(&mut self, cx: &mut Context<'_>, size: usize) -> Poll<Result<Option<String>, RenderError>> {
        if self.ended {
            return Poll::Ready(Ok(None));
        }
        if self.machine.is_cancelled() && self.machine.is_finished() {
            self.ended = true;
            return Poll::Ready(Ok(None));
        }

        let size = size.max(1);
        match self.machine.poll_fill(cx, size) {
            Poll::Ready(Ok(())) => {}
            Poll::Ready(Err(err)) => {
                self.ended = true;
                if err.is_cancelled() {
                    return Poll::Ready(Ok(None));
                }
                return Poll::Ready(Err(err));
            }
            Poll::Pending if self.machine.buffered() == 0 => return Poll::Pending,
            Poll::Pending => {}
        }

        if self.machine.buffered() == 0 {
            self.ended = true;
            return Poll::Ready(Ok(None));
        }

        let chunk = self.machine.take_chunk(size);
        if !self.started {
            self.started = true;
            self.machine.mark_first_chunk();
        }
        Poll::Ready(Ok(Some(chunk)))
    }

    /// Read the next chunk of at most `size` bytes.
    pub async fn read(&mut self, size: usize) -> Result<Option<String>, RenderError> {
        futures::future::poll_fn(|cx| self.poll_read(cx, size)).await
    }

    /// Stop rendering. Pending asynchronous work is dropped and the stream
    /// ends without an error.
    pub fn cancel(&mut self) {
        self.machine.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.machine.is_cancelled()
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.machine.cancel_handle()
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn stats(&self) -> &RenderStats {
        self.machine.stats()
    }

    pub fn context(&self) -> &RenderContext {
        self.machine.context()
    }

    pub fn into_context(self) -> RenderContext {
        self.machine.into_context()
    }
}

impl Stream for RenderStream {
    type Item = Result<String, RenderError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let size = this.chunk_size;
        this.poll_read(cx, size).map(Result::transpose)
    }
}

/// Start a streamed render.
pub fn render_to_stream(root: RenderNode, context: RenderContext, options: RenderOptions) -> RenderStream {
    RenderStream::new(root, context, options)
}
