//! Span-bounded streaming from an open archive file
//!
//! Copies exactly the requested number of bytes from a file's current
//! position into a chunked byte stream suitable for an HTTP response
//! body. The copy buffer is fixed-size, so memory per in-flight
//! request stays bounded no matter how large the span is. When the
//! client disconnects, the transport drops the stream and no further
//! reads happen.

use bytes::Bytes;
use futures::stream::{self, Stream};
use std::io;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tracing::error;

/// Fixed copy buffer size: large enough to amortise per-read
/// overhead, small enough to bound memory across concurrent requests.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Stream exactly `length` bytes from the file's current position.
///
/// The caller seeks to the span start before handing the file over.
/// Reads stop once the byte budget is exhausted even if the file is
/// longer. A file that ends early, or a read failure mid-stream,
/// surfaces as a stream error after headers are already committed:
/// it is logged here and the transport terminates the connection.
pub fn span_stream(file: File, length: u64) -> impl Stream<Item = io::Result<Bytes>> {
    stream::unfold((file, length), |(mut file, remaining)| async move {
        if remaining == 0 {
            return None;
        }

        let want = CHUNK_SIZE.min(usize::try_from(remaining).unwrap_or(CHUNK_SIZE));
        let mut buf = vec![0u8; want];

        match file.read(&mut buf).await {
            Ok(0) => {
                error!(remaining, "archive ended before the requested span was served");
                let err = io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "archive shorter than requested span",
                );
                Some((Err(err), (file, 0)))
            }
            Ok(n) => {
                buf.truncate(n);
                Some((Ok(Bytes::from(buf)), (file, remaining - n as u64)))
            }
            Err(e) => {
                error!(error = %e, "read failed mid-stream, terminating connection");
                Some((Err(e), (file, 0)))
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use tokio::io::AsyncSeekExt;

    async fn collect(mut stream: impl Stream<Item = io::Result<Bytes>> + Unpin) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        while let Some(chunk) = stream.next().await {
            out.extend_from_slice(&chunk?);
        }
        Ok(out)
    }

    fn fixture(contents: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents).unwrap();
        file
    }

    #[tokio::test]
    async fn test_copies_exactly_the_span() {
        let data: Vec<u8> = (0..=255u8).cycle().take(200_000).collect();
        let fixture = fixture(&data);

        let mut file = File::open(fixture.path()).await.unwrap();
        file.seek(std::io::SeekFrom::Start(1000)).await.unwrap();

        let copied = collect(Box::pin(span_stream(file, 150_000))).await.unwrap();
        assert_eq!(copied.len(), 150_000);
        assert_eq!(copied, &data[1000..151_000]);
    }

    #[tokio::test]
    async fn test_stops_at_budget_even_if_file_is_longer() {
        let fixture = fixture(&[0xABu8; 4096]);

        let file = File::open(fixture.path()).await.unwrap();
        let copied = collect(Box::pin(span_stream(file, 100))).await.unwrap();
        assert_eq!(copied, vec![0xABu8; 100]);
    }

    #[tokio::test]
    async fn test_zero_length_span_is_empty() {
        let fixture = fixture(b"irrelevant");

        let file = File::open(fixture.path()).await.unwrap();
        let copied = collect(Box::pin(span_stream(file, 0))).await.unwrap();
        assert!(copied.is_empty());
    }

    #[tokio::test]
    async fn test_short_file_surfaces_an_error() {
        let fixture = fixture(b"only ten b");

        let file = File::open(fixture.path()).await.unwrap();
        let err = collect(Box::pin(span_stream(file, 1000))).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
