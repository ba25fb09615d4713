//! Message Framing Codec
//!
//! Encodes and decodes the length-prefixed message envelope used on the
//! wire: a 4-byte unsigned big-endian payload length followed by exactly
//! that many payload bytes. The receiver reads the body in fixed-size
//! chunks until the declared length is satisfied, so a message survives TCP
//! coalescing and fragmentation intact.

use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{self, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::constants::LEN_PREFIX_SIZE;

/// Encode a payload into a single framed message
pub fn encode(payload: &[u8]) -> Bytes {
    let mut frame = BytesMut::with_capacity(LEN_PREFIX_SIZE + payload.len());
    frame.put_u32(payload.len() as u32);
    frame.put_slice(payload);
    frame.freeze()
}

/// Write one framed message and flush it
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&encode(payload)).await?;
    writer.flush().await
}

/// Read one framed message.
///
/// Returns `Ok(None)` when the stream ends before a whole frame arrives,
/// whether at the length prefix or inside the body. A partially assembled
/// payload is never surfaced; callers treat `None` the same as a
/// disconnect.
pub async fn read_frame<R>(reader: &mut R, chunk_size: usize) -> io::Result<Option<Bytes>>
where
    R: AsyncRead + Unpin,
{
    let mut prefix = [0u8; LEN_PREFIX_SIZE];
    let mut filled = 0;
    while filled < LEN_PREFIX_SIZE {
        let n = reader.read(&mut prefix[filled..]).await?;
        if n == 0 {
            return Ok(None);
        }
        filled += n;
    }
    let len = u32::from_be_bytes(prefix) as usize;

    let mut payload = BytesMut::with_capacity(len);
    let mut chunk = vec![0u8; chunk_size.min(len.max(1))];
    let chunks = len.div_ceil(chunk_size.max(1));
    for _ in 0..chunks {
        let want = chunk_size.min(len - payload.len());
        let mut got = 0;
        while got < want {
            let n = reader.read(&mut chunk[got..want]).await?;
            if n == 0 {
                return Ok(None);
            }
            got += n;
        }
        payload.put_slice(&chunk[..want]);
    }

    Ok(Some(payload.freeze()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::constants::DEFAULT_RECV_BUFFER;

    #[test]
    fn test_encode_prefixes_length() {
        let frame = encode(b"Hello");
        assert_eq!(&frame[..LEN_PREFIX_SIZE], &[0, 0, 0, 5]);
        assert_eq!(&frame[LEN_PREFIX_SIZE..], b"Hello");
    }

    #[test]
    fn test_encode_empty_payload() {
        let frame = encode(b"");
        assert_eq!(&frame[..], &[0, 0, 0, 0]);
    }

    #[tokio::test]
    async fn test_round_trip_across_chunk_boundaries() {
        // 10000 bytes spans three 4096-byte chunks (4096 + 4096 + 1808)
        for len in [0usize, 1, 4095, 4096, 4097, 10000] {
            let payload: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
            let frame = encode(&payload);

            let mut reader = &frame[..];
            let decoded = read_frame(&mut reader, DEFAULT_RECV_BUFFER)
                .await
                .unwrap()
                .expect("frame should decode");
            assert_eq!(&decoded[..], &payload[..], "length {}", len);
        }
    }

    #[tokio::test]
    async fn test_back_to_back_frames_keep_boundaries() {
        let mut wire = Vec::new();
        wire.extend_from_slice(&encode(b"first"));
        wire.extend_from_slice(&encode(b"second"));

        let mut reader = &wire[..];
        let first = read_frame(&mut reader, DEFAULT_RECV_BUFFER).await.unwrap();
        let second = read_frame(&mut reader, DEFAULT_RECV_BUFFER).await.unwrap();
        assert_eq!(first.as_deref(), Some(&b"first"[..]));
        assert_eq!(second.as_deref(), Some(&b"second"[..]));
    }

    #[tokio::test]
    async fn test_eof_before_prefix_is_no_message() {
        let mut reader = &b""[..];
        let decoded = read_frame(&mut reader, DEFAULT_RECV_BUFFER).await.unwrap();
        assert!(decoded.is_none());
    }

    #[tokio::test]
    async fn test_short_prefix_is_no_message() {
        let mut reader = &[0u8, 0][..];
        let decoded = read_frame(&mut reader, DEFAULT_RECV_BUFFER).await.unwrap();
        assert!(decoded.is_none());
    }

    #[tokio::test]
    async fn test_truncated_body_is_no_message() {
        let frame = encode(b"Hello");
        let mut reader = &frame[..frame.len() - 2];
        let decoded = read_frame(&mut reader, DEFAULT_RECV_BUFFER).await.unwrap();
        assert!(decoded.is_none(), "partial payload must not be surfaced");
    }

    #[tokio::test]
    async fn test_fragmented_delivery_reassembles() {
        // The length prefix and the body each arrive in several pieces.
        let frame = encode(b"fragmented message");
        let mut mock = tokio_test::io::Builder::new()
            .read(&frame[..2])
            .read(&frame[2..6])
            .read(&frame[6..11])
            .read(&frame[11..])
            .build();

        let decoded = read_frame(&mut mock, DEFAULT_RECV_BUFFER)
            .await
            .unwrap()
            .expect("fragmented frame should decode");
        assert_eq!(&decoded[..], b"fragmented message");
    }

    #[tokio::test]
    async fn test_small_chunk_size_reassembles() {
        let payload: Vec<u8> = (0..100u8).collect();
        let frame = encode(&payload);
        let mut reader = &frame[..];
        let decoded = read_frame(&mut reader, 7).await.unwrap().unwrap();
        assert_eq!(&decoded[..], &payload[..]);
    }
}
