use std::process::ExitStatus;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Child;
use tokio::task::JoinHandle;

use crate::error::RunnerError;
use crate::util::RingBytes;

pub(crate) struct Captured {
    pub status: ExitStatus,
    pub stdout: Arc<RingBytes>,
    pub stderr: Arc<RingBytes>,
}

/// Wait for `child` while draining its piped stdout/stderr into bounded rings.
pub(crate) async fn wait_with_capture(
    mut child: Child,
    capture_bytes: usize,
) -> Result<Captured, RunnerError> {
    let stdout = RingBytes::new(capture_bytes);
    let stderr = RingBytes::new(capture_bytes);

    let out_task = child.stdout.take().map(|rd| pump(rd, stdout.clone(), "stdout"));
    let err_task = child.stderr.take().map(|rd| pump(rd, stderr.clone(), "stderr"));

    let pid = child.id().unwrap_or_default();
    let status = child
        .wait()
        .await
        .map_err(|source| RunnerError::Wait { pid, source })?;

    for task in [out_task, err_task].into_iter().flatten() {
        match task.await {
            Ok(Ok(bytes)) => tracing::trace!(pid, bytes, "stream drained"),
            Ok(Err(e)) => tracing::warn!(pid, error = %e, "stream capture incomplete"),
            Err(e) => tracing::warn!(pid, error = %e, "stream pump task failed"),
        }
    }

    Ok(Captured {
        status,
        stdout,
        stderr,
    })
}

fn pump<R>(mut rd: R, ring: Arc<RingBytes>, label: &'static str) -> JoinHandle<Result<u64, RunnerError>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = vec![0u8; 16 * 1024];
        let mut total = 0u64;

        loop {
            let n = rd.read(&mut buf).await.map_err(|e| RunnerError::StreamIo {
                stream: label,
                source: e,
            })?;
            if n == 0 {
                break;
            }
            ring.push(&buf[..n]);
            total += n as u64;
        }

        Ok(total)
    })
}
