use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Streams the lines of `reader` over a bounded channel from a task of its
/// own, so the output of a handler is drained while its event is still being
/// written to it.
///
/// The task ends at EOF or once the receiver is dropped, both reported as
/// `Ok`. A read error ends it and is returned through the handle.
///
/// # Example
/// ```ignore
/// let mut child = tokio::process::Command::new("ls")
///     .stdout(std::process::Stdio::piped())
///     .spawn()?;
/// let (handle, mut rx) = concurrent_lines(child.stdout.take().unwrap(), 100);
///
/// while let Some(line) = rx.recv().await {
///     println!("{}", line);
/// }
/// handle.await??;
/// ```
pub fn concurrent_lines<R>(
    reader: R,
    channel_capacity: usize,
) -> (JoinHandle<std::io::Result<()>>, mpsc::Receiver<String>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel::<String>(channel_capacity);

    let task = tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Some(line) = lines.next_line().await? {
            if tx.send(line).await.is_err() {
                log::debug!("nobody reads the handler output anymore");
                break;
            }
        }
        Ok(())
    });

    (task, rx)
}
