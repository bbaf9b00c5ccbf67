use crate::codec::{read_varint, varint_len, write_varint, CodecError};
use crate::packets::ClientboundPacket;
use crate::session::{Outbound, Session};
use crate::version::ProtocolVersion;
use bytes::{Buf, BytesMut};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read as _, Write as _};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::trace;

/// Largest frame (and largest decompressed packet) we accept from a client.
pub const MAX_FRAME_LEN: usize = 2 * 1024 * 1024;

/// A framed protocol connection with optional compression.
pub struct Connection<S = TcpStream> {
    stream: S,
    read_buf: BytesMut,
    compression_threshold: Option<i32>,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            read_buf: BytesMut::with_capacity(4096),
            compression_threshold: None,
        }
    }

    /// Enable zlib compression with the given threshold.
    pub fn enable_compression(&mut self, threshold: i32) {
        self.compression_threshold = Some(threshold);
    }

    /// Read a single packet frame, returning (packet_id, payload).
    ///
    /// Cancel safe: bytes already read stay buffered for the next call.
    pub async fn read_packet(&mut self) -> anyhow::Result<(i32, BytesMut)> {
        loop {
            if let Some(result) = try_parse_packet(&mut self.read_buf, self.compression_threshold)?
            {
                return Ok(result);
            }
            let mut tmp = [0u8; 4096];
            let n = self.stream.read(&mut tmp).await?;
            if n == 0 {
                return Err(anyhow::anyhow!("Connection closed"));
            }
            self.read_buf.extend_from_slice(&tmp[..n]);
        }
    }

    /// Write a packet with the given ID and payload.
    pub async fn write_packet(&mut self, packet_id: i32, payload: &[u8]) -> anyhow::Result<()> {
        let frame = build_frame(packet_id, payload, self.compression_threshold)?;
        self.stream.write_all(&frame).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Encode and write one packet for a client speaking `protocol`.
    pub async fn send(
        &mut self,
        packet: &ClientboundPacket,
        protocol: ProtocolVersion,
    ) -> anyhow::Result<()> {
        let mut payload = BytesMut::new();
        packet.encode(&mut payload, protocol)?;
        trace!(
            "Write {} id=0x{:02X} len={}",
            packet.name(),
            packet.id(),
            payload.len()
        );
        self.write_packet(packet.id(), &payload).await
    }

    /// Carry out everything the session queued, in order. Returns `false`
    /// once the session asked for the connection to be closed.
    pub async fn flush_session(&mut self, session: &mut Session) -> anyhow::Result<bool> {
        for outbound in session.take_outbound() {
            match outbound {
                Outbound::Packet(packet) => self.send(&packet, session.protocol()).await?,
                Outbound::EnableCompression(threshold) => self.enable_compression(threshold),
                Outbound::Close => {
                    self.stream.shutdown().await?;
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }
}

// === Shared helpers ===

fn try_parse_packet(
    read_buf: &mut BytesMut,
    compression_threshold: Option<i32>,
) -> anyhow::Result<Option<(i32, BytesMut)>> {
    if read_buf.is_empty() {
        return Ok(None);
    }

    let mut peek = read_buf.clone();
    let length = match read_varint(&mut peek) {
        Ok(len) if len < 0 => return Err(CodecError::NegativeLength(len).into()),
        Ok(len) => len as usize,
        Err(CodecError::NotEnoughData) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    if length > MAX_FRAME_LEN {
        return Err(CodecError::FrameTooLarge(length).into());
    }

    let varint_bytes = read_buf.len() - peek.len();

    if peek.remaining() < length {
        return Ok(None);
    }

    read_buf.advance(varint_bytes);
    let mut packet_data = read_buf.split_to(length);

    if let Some(threshold) = compression_threshold {
        let data_length = read_varint(&mut packet_data)?;
        if data_length < 0 {
            return Err(CodecError::NegativeLength(data_length).into());
        }
        let data_length = data_length as usize;
        if data_length > MAX_FRAME_LEN {
            return Err(CodecError::FrameTooLarge(data_length).into());
        }
        if data_length > 0 {
            if data_length < threshold.max(0) as usize {
                return Err(CodecError::BadCompressedFrame {
                    declared: data_length,
                    reason: "below compression threshold",
                }
                .into());
            }
            packet_data = inflate(&packet_data, data_length)?;
        }
    }

    let packet_id = read_varint(&mut packet_data)?;
    trace!(
        "Read packet id=0x{:02X} len={}",
        packet_id,
        packet_data.len()
    );

    Ok(Some((packet_id, packet_data)))
}

/// Inflate a zlib body that must expand to exactly `data_length` bytes.
fn inflate(compressed: &[u8], data_length: usize) -> Result<BytesMut, CodecError> {
    let mut decompressed = vec![0u8; data_length];
    let mut decoder = ZlibDecoder::new(compressed);
    decoder
        .read_exact(&mut decompressed)
        .map_err(|_| CodecError::BadCompressedFrame {
            declared: data_length,
            reason: "inflates to fewer bytes",
        })?;
    if decoder.read(&mut [0u8; 1])? != 0 {
        return Err(CodecError::BadCompressedFrame {
            declared: data_length,
            reason: "inflates to more bytes",
        });
    }
    Ok(BytesMut::from(&decompressed[..]))
}

fn build_frame(
    packet_id: i32,
    payload: &[u8],
    compression_threshold: Option<i32>,
) -> std::io::Result<BytesMut> {
    let mut packet_buf = BytesMut::new();
    write_varint(&mut packet_buf, packet_id);
    packet_buf.extend_from_slice(payload);

    let mut frame = BytesMut::new();

    if let Some(threshold) = compression_threshold {
        let uncompressed_len = packet_buf.len() as i32;
        if uncompressed_len >= threshold {
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(&packet_buf)?;
            let compressed = encoder.finish()?;

            let data_length_size = varint_len(uncompressed_len);
            let total_length = data_length_size + compressed.len();
            write_varint(&mut frame, total_length as i32);
            write_varint(&mut frame, uncompressed_len);
            frame.extend_from_slice(&compressed);
        } else {
            let total_length = 1 + packet_buf.len();
            write_varint(&mut frame, total_length as i32);
            write_varint(&mut frame, 0);
            frame.extend_from_slice(&packet_buf);
        }
    } else {
        write_varint(&mut frame, packet_buf.len() as i32);
        frame.extend_from_slice(&packet_buf);
    }

    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packets::{KeepAlive, SetCompression};
    use std::io::Write;
    use tokio::io::duplex;
    use uuid::Uuid;

    #[test]
    fn test_uncompressed_frame() {
        let frame = build_frame(0x01, &[0xAA, 0xBB], None).unwrap();
        assert_eq!(frame.to_vec(), vec![0x03, 0x01, 0xAA, 0xBB]);
    }

    #[test]
    fn test_below_threshold_frame() {
        let frame = build_frame(0x01, &[0xAA], Some(256)).unwrap();
        assert_eq!(frame.to_vec(), vec![0x03, 0x00, 0x01, 0xAA]);
    }

    #[test]
    fn test_compressed_frame_roundtrip() {
        let payload = vec![7u8; 1000];
        let mut buf = build_frame(0x20, &payload, Some(64)).unwrap();
        assert!(buf.len() < payload.len());
        let (id, data) = try_parse_packet(&mut buf, Some(64)).unwrap().unwrap();
        assert_eq!(id, 0x20);
        assert_eq!(data.to_vec(), payload);
        assert!(buf.is_empty());
    }

    /// A compressed frame whose body is `body`, declaring `declared` as
    /// its uncompressed length.
    fn compressed_frame(declared: i32, body: &[u8]) -> BytesMut {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(body).unwrap();
        let compressed = encoder.finish().unwrap();
        let mut frame = BytesMut::new();
        write_varint(&mut frame, (varint_len(declared) + compressed.len()) as i32);
        write_varint(&mut frame, declared);
        frame.extend_from_slice(&compressed);
        frame
    }

    fn body(len: usize) -> Vec<u8> {
        let mut body = vec![0x20];
        body.extend(std::iter::repeat(9u8).take(len));
        body
    }

    #[test]
    fn test_understated_length_rejected() {
        let mut buf = compressed_frame(70, &body(100));
        let err = try_parse_packet(&mut buf, Some(64)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CodecError>(),
            Some(CodecError::BadCompressedFrame { declared: 70, .. })
        ));
    }

    #[test]
    fn test_overstated_length_rejected() {
        let mut buf = compressed_frame(200, &body(100));
        assert!(matches!(
            try_parse_packet(&mut buf, Some(64)).unwrap_err().downcast_ref::<CodecError>(),
            Some(CodecError::BadCompressedFrame { declared: 200, .. })
        ));
    }

    #[test]
    fn test_compressed_below_threshold_rejected() {
        // Truncation to 3 bytes would otherwise go unnoticed.
        let mut buf = compressed_frame(3, &body(100));
        assert!(matches!(
            try_parse_packet(&mut buf, Some(64)).unwrap_err().downcast_ref::<CodecError>(),
            Some(CodecError::BadCompressedFrame { declared: 3, .. })
        ));

        let mut buf = compressed_frame(11, &body(10));
        assert!(try_parse_packet(&mut buf, Some(64)).is_err());
    }

    #[test]
    fn test_exact_length_accepted() {
        let mut buf = compressed_frame(101, &body(100));
        let (id, data) = try_parse_packet(&mut buf, Some(64)).unwrap().unwrap();
        assert_eq!(id, 0x20);
        assert_eq!(data.len(), 100);
    }

    #[test]
    fn test_partial_frame_waits() {
        let frame = build_frame(0x05, &[1, 2, 3, 4], None).unwrap();
        let mut buf = BytesMut::from(&frame[..3]);
        assert!(try_parse_packet(&mut buf, None).unwrap().is_none());
        assert_eq!(buf.len(), 3);
        buf.extend_from_slice(&frame[3..]);
        let (id, data) = try_parse_packet(&mut buf, None).unwrap().unwrap();
        assert_eq!(id, 0x05);
        assert_eq!(&data[..], &[1, 2, 3, 4]);
    }

    #[test]
    fn test_overlong_length_rejected() {
        let mut buf = BytesMut::from(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01][..]);
        assert!(try_parse_packet(&mut buf, None).is_err());
    }

    #[test]
    fn test_oversized_frame_rejected() {
        let mut buf = BytesMut::new();
        write_varint(&mut buf, (MAX_FRAME_LEN + 1) as i32);
        assert!(try_parse_packet(&mut buf, None).is_err());
    }

    #[tokio::test]
    async fn test_read_write_over_stream() {
        let (client, server) = duplex(1024);
        let mut client = Connection::new(client);
        let mut server = Connection::new(server);

        client.write_packet(0x0B, &[0x2A]).await.unwrap();
        let (id, data) = server.read_packet().await.unwrap();
        assert_eq!(id, 0x0B);
        assert_eq!(&data[..], &[0x2A]);
    }

    #[tokio::test]
    async fn test_flush_applies_compression_in_order() {
        let (client, server) = duplex(4096);
        let mut client = Connection::new(client);
        let mut server = Connection::new(server);

        let mut session = Session::new("127.0.0.1:1".parse().unwrap(), Uuid::nil());
        session.set_protocol(ProtocolVersion::V1_12_2);
        session.transition(crate::state::ConnectionState::Login);
        session.send(SetCompression { threshold: 0 });
        session.enable_compression(0);
        assert!(server.flush_session(&mut session).await.unwrap());

        // SetCompression itself goes out plain.
        let (id, mut data) = client.read_packet().await.unwrap();
        assert_eq!(id, 0x03);
        assert_eq!(read_varint(&mut data).unwrap(), 0);
        client.enable_compression(0);

        session.transition(crate::state::ConnectionState::Play);
        session.send(KeepAlive { id: 5 });
        assert!(server.flush_session(&mut session).await.unwrap());
        let (id, data) = client.read_packet().await.unwrap();
        assert_eq!(id, 0x1F);
        assert_eq!(data.to_vec(), 5u64.to_be_bytes().to_vec());
    }

    #[tokio::test]
    async fn test_flush_stops_at_close() {
        let (client, server) = duplex(4096);
        let mut client = Connection::new(client);
        let mut server = Connection::new(server);

        let mut session = Session::new("127.0.0.1:1".parse().unwrap(), Uuid::nil());
        session.transition(crate::state::ConnectionState::Login);
        session.kick("Server is full");
        assert!(!server.flush_session(&mut session).await.unwrap());

        let (id, _) = client.read_packet().await.unwrap();
        assert_eq!(id, 0x00);
        assert!(client.read_packet().await.is_err());
    }
}
