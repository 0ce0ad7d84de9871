//! Big-endian wire codec shared by the framer, NCP opcode bodies, and
//! telemetry records. Every multi-byte field in this system is a 16-bit (or
//! 32-bit) big-endian PDP-10/1822 word; this module gives each wire type a
//! `Serialize`/`Deserialize` impl instead of hand-writing byte shuffles at
//! every call site.

use std::fmt;

pub type Result<T> = std::result::Result<T, CodecError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    /// Tried to read `want` bytes but only `have` remained.
    UnexpectedEof { have: usize, want: usize },
    /// Tried to write `want` bytes into a buffer with `have` bytes of
    /// remaining capacity.
    BufferFull { have: usize, want: usize },
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEof { have, want } => {
                write!(f, "unexpected end of input: have {have} bytes, need {want}")
            }
            Self::BufferFull { have, want } => {
                write!(f, "output buffer full: {have} bytes free, need {want}")
            }
        }
    }
}

impl std::error::Error for CodecError {}

#[repr(transparent)]
pub struct Deserializer<'a>(&'a [u8]);

impl<'a> Deserializer<'a> {
    pub fn new(s: &'a [u8]) -> Self {
        Self(s)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.0.len()
    }

    pub fn skip(&mut self, by: usize) -> Result<&mut Self> {
        self.advance(by)?;
        Ok(self)
    }

    pub fn advance(&mut self, by: usize) -> Result<&'a [u8]> {
        if self.0.len() < by {
            return Err(CodecError::UnexpectedEof {
                have: self.0.len(),
                want: by,
            });
        }
        let (l, r) = self.0.split_at(by);
        self.0 = r;
        Ok(l)
    }

    pub fn advance_at_most(&mut self, by: usize) -> &'a [u8] {
        self.advance(by.min(self.0.len())).unwrap()
    }

    pub fn rest(&mut self) -> &'a [u8] {
        self.advance_at_most(self.0.len())
    }

    pub fn deserialize<T: Deserialize>(&mut self) -> Result<T> {
        T::deserialize(self)
    }
}

pub trait Deserialize: Sized {
    fn deserialize(data: &mut Deserializer<'_>) -> Result<Self>;
}

impl<const S: usize> Deserialize for [u8; S] {
    fn deserialize(data: &mut Deserializer<'_>) -> Result<Self> {
        data.advance(S).map(|s| s.try_into().unwrap())
    }
}

impl<const S: usize> Deserialize for heapless::Vec<u8, S> {
    fn deserialize(data: &mut Deserializer<'_>) -> Result<Self> {
        Ok(heapless::Vec::from_slice(data.advance_at_most(S)).unwrap())
    }
}

impl Deserialize for u8 {
    fn deserialize(data: &mut Deserializer<'_>) -> Result<Self> {
        Ok(data.advance(1)?[0])
    }
}

impl Deserialize for u16 {
    fn deserialize(data: &mut Deserializer<'_>) -> Result<Self> {
        data.deserialize().map(u16::from_be_bytes)
    }
}

impl Deserialize for u32 {
    fn deserialize(data: &mut Deserializer<'_>) -> Result<Self> {
        data.deserialize().map(u32::from_be_bytes)
    }
}

#[repr(transparent)]
pub struct Serializer<'a, const SIZE: usize>(&'a mut heapless::Vec<u8, SIZE>);

impl<'a, const SIZE: usize> Serializer<'a, SIZE> {
    pub fn new(vec: &'a mut heapless::Vec<u8, SIZE>) -> Self {
        Self(vec)
    }

    pub fn push(self, data: &[u8]) -> Result<Self> {
        let have = SIZE - self.0.len();
        match self.0.extend_from_slice(data) {
            Ok(_) => Ok(self),
            Err(_) => Err(CodecError::BufferFull {
                have,
                want: data.len(),
            }),
        }
    }

    pub fn serialize<T: Serialize>(self, v: T) -> Result<Self> {
        v.serialize(self)
    }
}

pub trait Serialize {
    fn serialize<const S: usize>(self, buffer: Serializer<S>) -> Result<Serializer<S>>;
}

impl<T: Copy + Serialize> Serialize for &T {
    fn serialize<const S: usize>(self, buffer: Serializer<S>) -> Result<Serializer<S>> {
        T::serialize(*self, buffer)
    }
}

impl Serialize for &[u8] {
    fn serialize<const S: usize>(self, buffer: Serializer<S>) -> Result<Serializer<S>> {
        buffer.push(self)
    }
}

impl<const SIZE: usize> Serialize for [u8; SIZE] {
    fn serialize<const S: usize>(self, buffer: Serializer<S>) -> Result<Serializer<S>> {
        buffer.serialize(&self[..])
    }
}

impl Serialize for u8 {
    fn serialize<const S: usize>(self, buffer: Serializer<S>) -> Result<Serializer<S>> {
        buffer.serialize([self])
    }
}

impl Serialize for u16 {
    fn serialize<const S: usize>(self, buffer: Serializer<S>) -> Result<Serializer<S>> {
        buffer.serialize(self.to_be_bytes())
    }
}

impl Serialize for u32 {
    fn serialize<const S: usize>(self, buffer: Serializer<S>) -> Result<Serializer<S>> {
        buffer.serialize(self.to_be_bytes())
    }
}

/// Serializes `v` into a freshly allocated bounded buffer.
pub fn encode<const S: usize>(v: impl Serialize) -> Result<heapless::Vec<u8, S>> {
    let mut buf = heapless::Vec::new();
    Serializer::new(&mut buf).serialize(v)?;
    Ok(buf)
}
