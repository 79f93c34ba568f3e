//! Bounded body reads.
//!
//! Capture only ever needs a body up to `max_body_bytes`. Reading stops at
//! the first chunk past that limit and hands back what was read together
//! with the unread remainder, so the full body can still be rebuilt for
//! the downstream or drained for its length.

use axum::body::{Body, BodyDataStream};
use bytes::{Bytes, BytesMut};
use futures_util::{stream, StreamExt};

/// Outcome of [`read_bounded`].
pub enum BoundedBody {
    /// The whole body, within the limit.
    Complete(Bytes),
    /// The limit was crossed; `rest` has not been polled past `read`.
    Exceeded { read: Vec<Bytes>, rest: BodyDataStream },
    /// The body errored after yielding `read`.
    Failed { read: Vec<Bytes>, error: axum::Error },
}

impl BoundedBody {
    /// Rebuild a body carrying every byte of the original, including a
    /// trailing error.
    pub fn into_body(self) -> Body {
        match self {
            BoundedBody::Complete(bytes) => Body::from(bytes),
            BoundedBody::Exceeded { read, rest } => {
                Body::from_stream(stream::iter(read.into_iter().map(Ok)).chain(rest))
            }
            BoundedBody::Failed { read, error } => Body::from_stream(
                stream::iter(read.into_iter().map(Ok)).chain(stream::once(async move { Err(error) })),
            ),
        }
    }

    /// Character length of the whole body, draining whatever was not read.
    /// `None` if the body errors.
    pub async fn char_len(self) -> Option<usize> {
        match self {
            BoundedBody::Complete(bytes) => Some(utf8_char_len(&bytes)),
            BoundedBody::Exceeded { read, mut rest } => {
                let mut length: usize = read.iter().map(|chunk| utf8_char_len(chunk)).sum();
                while let Some(chunk) = rest.next().await {
                    length += utf8_char_len(&chunk.ok()?);
                }
                Some(length)
            }
            BoundedBody::Failed { .. } => None,
        }
    }
}

/// Read `body` until it ends or more than `limit` bytes have arrived.
pub async fn read_bounded(body: Body, limit: usize) -> BoundedBody {
    let mut rest = body.into_data_stream();
    let mut read = Vec::new();
    let mut total = 0usize;

    while let Some(chunk) = rest.next().await {
        match chunk {
            Ok(chunk) => {
                total += chunk.len();
                read.push(chunk);
                if total > limit {
                    return BoundedBody::Exceeded { read, rest };
                }
            }
            Err(error) => return BoundedBody::Failed { read, error },
        }
    }

    if read.len() == 1 {
        return BoundedBody::Complete(read.remove(0));
    }
    let mut buf = BytesMut::with_capacity(total);
    for chunk in &read {
        buf.extend_from_slice(chunk);
    }
    BoundedBody::Complete(buf.freeze())
}

/// Characters in UTF-8 text, counting every byte that does not continue a
/// sequence. Chunk boundaries may split a character without changing the sum.
pub fn utf8_char_len(bytes: &[u8]) -> usize {
    bytes.iter().filter(|b| (**b & 0xC0) != 0x80).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunked(chunks: &[&'static str]) -> Body {
        let chunks: Vec<Result<Bytes, std::io::Error>> =
            chunks.iter().map(|c| Ok(Bytes::from_static(c.as_bytes()))).collect();
        Body::from_stream(stream::iter(chunks))
    }

    #[tokio::test]
    async fn test_within_limit_is_complete() {
        match read_bounded(chunked(&["ab", "cd", "e"]), 5).await {
            BoundedBody::Complete(bytes) => assert_eq!(&bytes[..], b"abcde"),
            _ => panic!("expected a complete body"),
        }
    }

    #[tokio::test]
    async fn test_exceeded_rebuilds_every_byte() {
        let bounded = read_bounded(chunked(&["abc", "def", "ghi", "jkl"]), 4).await;
        assert!(matches!(bounded, BoundedBody::Exceeded { ref read, .. } if read.len() == 2));

        let rebuilt = axum::body::to_bytes(bounded.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&rebuilt[..], b"abcdefghijkl");
    }

    #[tokio::test]
    async fn test_exceeded_char_len_drains_rest() {
        let bounded = read_bounded(chunked(&["aa", "\u{e9}", "bbbb"]), 2).await;
        assert_eq!(bounded.char_len().await, Some(7));

        // "é" split across chunks still counts once.
        let split = Body::from_stream(stream::iter(vec![
            Ok::<_, std::io::Error>(Bytes::from_static(&[b'x', 0xC3])),
            Ok(Bytes::from_static(&[0xA9, b'y'])),
        ]));
        assert_eq!(read_bounded(split, 1).await.char_len().await, Some(3));
    }

    #[test]
    fn test_utf8_char_len() {
        assert_eq!(utf8_char_len(b""), 0);
        assert_eq!(utf8_char_len("h\u{e9}llo \u{1f600}".as_bytes()), 7);
    }
}
