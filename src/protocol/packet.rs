// src/protocol/packet.rs
use byteorder::{BigEndian, ByteOrder, ReadBytesExt};
use std::io::{self, Cursor, Read};
use tokio::io::{AsyncRead, AsyncReadExt};
use super::ProtocolError;

const MAX_VARINT_BYTES: usize = 5;
/// Upper bound for a single frame, well above any real status response.
pub const MAX_PACKET_LEN: usize = 2 * 1024 * 1024;

pub const HANDSHAKE: i32 = 0x00;
pub const STATUS_REQUEST: i32 = 0x00;
pub const STATUS_RESPONSE: i32 = 0x00;

/// Builds the body of one outgoing packet; `finish` prepends id and length.
#[derive(Debug, Default)]
pub struct PacketWriter {
    buf: Vec<u8>,
}

impl PacketWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn varint(mut self, value: i32) -> Self {
        write_varint(&mut self.buf, value);
        self
    }

    pub fn string(mut self, value: &str) -> Self {
        write_varint(&mut self.buf, value.len() as i32);
        self.buf.extend_from_slice(value.as_bytes());
        self
    }

    pub fn unsigned_short(mut self, value: u16) -> Self {
        let mut bytes = [0u8; 2];
        BigEndian::write_u16(&mut bytes, value);
        self.buf.extend_from_slice(&bytes);
        self
    }

    pub fn finish(self, packet_id: i32) -> Vec<u8> {
        let mut body = Vec::with_capacity(self.buf.len() + MAX_VARINT_BYTES);
        write_varint(&mut body, packet_id);
        body.extend_from_slice(&self.buf);

        let mut frame = Vec::with_capacity(body.len() + MAX_VARINT_BYTES);
        write_varint(&mut frame, body.len() as i32);
        frame.extend_from_slice(&body);
        frame
    }
}

pub fn handshake(protocol_version: i32, host: &str, port: u16) -> Vec<u8> {
    PacketWriter::new()
        .varint(protocol_version)
        .string(host)
        .unsigned_short(port)
        .varint(1) // next state: status
        .finish(HANDSHAKE)
}

pub fn status_request() -> Vec<u8> {
    PacketWriter::new().finish(STATUS_REQUEST)
}

pub fn write_varint(buf: &mut Vec<u8>, value: i32) {
    let mut value = value as u32;
    loop {
        if value & !0x7F == 0 {
            buf.push(value as u8);
            return;
        }
        buf.push((value as u8 & 0x7F) | 0x80);
        value >>= 7;
    }
}

/// Folds one VarInt byte into `acc`. Returns `Some` once the value is complete.
fn push_varint_byte(acc: &mut u32, position: usize, byte: u8) -> Result<Option<i32>, ProtocolError> {
    if position >= MAX_VARINT_BYTES {
        return Err(ProtocolError::Malformed("VarInt is too long".to_string()));
    }
    *acc |= ((byte & 0x7F) as u32) << (7 * position);
    if byte & 0x80 == 0 {
        Ok(Some(*acc as i32))
    } else {
        Ok(None)
    }
}

pub async fn read_varint<R: AsyncRead + Unpin>(reader: &mut R) -> Result<i32, ProtocolError> {
    let mut acc = 0u32;
    for position in 0..=MAX_VARINT_BYTES {
        let byte = reader.read_u8().await.map_err(eof_as_malformed)?;
        if let Some(value) = push_varint_byte(&mut acc, position, byte)? {
            return Ok(value);
        }
    }
    Err(ProtocolError::Malformed("VarInt is too long".to_string()))
}

/// A received frame, with the packet id already split off.
#[derive(Debug)]
pub struct Packet {
    pub id: i32,
    body: Cursor<Vec<u8>>,
}

impl Packet {
    pub async fn read<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Self, ProtocolError> {
        let length = read_varint(reader).await?;
        if length <= 0 || length as usize > MAX_PACKET_LEN {
            return Err(ProtocolError::Malformed(format!("invalid packet length {}", length)));
        }

        let mut frame = vec![0u8; length as usize];
        reader.read_exact(&mut frame).await.map_err(eof_as_malformed)?;

        let mut body = Cursor::new(frame);
        let id = body.read_varint()?;
        Ok(Self { id, body })
    }

    pub fn expect_id(self, expected: i32) -> Result<Self, ProtocolError> {
        if self.id != expected {
            return Err(ProtocolError::Malformed(format!(
                "unexpected packet id 0x{:02X}, expected 0x{:02X}",
                self.id, expected
            )));
        }
        Ok(self)
    }

    pub fn read_varint(&mut self) -> Result<i32, ProtocolError> {
        self.body.read_varint()
    }

    pub fn read_string(&mut self) -> Result<String, ProtocolError> {
        let length = self.read_varint()?;
        let remaining = self.body.get_ref().len() as u64 - self.body.position();
        if length < 0 || length as u64 > remaining {
            return Err(ProtocolError::Malformed(format!("invalid string length {}", length)));
        }
        let mut bytes = vec![0u8; length as usize];
        Read::read_exact(&mut self.body, &mut bytes).map_err(eof_as_malformed)?;
        String::from_utf8(bytes)
            .map_err(|e| ProtocolError::Malformed(format!("string is not UTF-8: {}", e)))
    }
}

trait ReadVarInt {
    fn read_varint(&mut self) -> Result<i32, ProtocolError>;
}

impl<T: Read> ReadVarInt for T {
    fn read_varint(&mut self) -> Result<i32, ProtocolError> {
        let mut acc = 0u32;
        for position in 0..=MAX_VARINT_BYTES {
            let byte = self.read_u8().map_err(eof_as_malformed)?;
            if let Some(value) = push_varint_byte(&mut acc, position, byte)? {
                return Ok(value);
            }
        }
        Err(ProtocolError::Malformed("VarInt is too long".to_string()))
    }
}

fn eof_as_malformed(e: io::Error) -> ProtocolError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        ProtocolError::Malformed("connection closed mid-packet".to_string())
    } else {
        ProtocolError::Io(e)
    }
}
