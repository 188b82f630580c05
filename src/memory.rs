use std::{
    error::Error,
    fmt,
    ops::{Index, IndexMut},
};

/// Single mailbox value. Signed, stored verbatim, never masked to three digits.
pub type Word = i64;

/// Amount of mailboxes, addressed `0..MEMORY_SIZE`.
pub const MEMORY_SIZE: usize = 100;

/// Leading bytes of a serialized image.
const OBJECT_MAGIC: &[u8; 4] = b"LMC\0";
const OBJECT_LEN: usize = OBJECT_MAGIC.len() + MEMORY_SIZE * std::mem::size_of::<Word>();

/// The 100 mailboxes of an assembled program. Index is address.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct MemoryImage {
    words: [Word; MEMORY_SIZE],
}

impl Default for MemoryImage {
    fn default() -> Self {
        MemoryImage {
            words: [0; MEMORY_SIZE],
        }
    }
}

impl MemoryImage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn words(&self) -> &[Word; MEMORY_SIZE] {
        &self.words
    }

    pub fn get(&self, addr: usize) -> Option<Word> {
        self.words.get(addr).copied()
    }

    /// Serialize as an object file: magic followed by big-endian words.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(OBJECT_LEN);
        bytes.extend_from_slice(OBJECT_MAGIC);
        for word in &self.words {
            bytes.extend_from_slice(&word.to_be_bytes());
        }
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ImageError> {
        if bytes.len() != OBJECT_LEN {
            return Err(ImageError::Length { found: bytes.len() });
        }
        let (magic, body) = bytes.split_at(OBJECT_MAGIC.len());
        if magic != OBJECT_MAGIC {
            return Err(ImageError::Magic);
        }
        let mut image = MemoryImage::new();
        for (word, chunk) in image
            .words
            .iter_mut()
            .zip(body.chunks_exact(std::mem::size_of::<Word>()))
        {
            let mut raw = [0; std::mem::size_of::<Word>()];
            raw.copy_from_slice(chunk);
            *word = Word::from_be_bytes(raw);
        }
        Ok(image)
    }
}

impl From<[Word; MEMORY_SIZE]> for MemoryImage {
    fn from(words: [Word; MEMORY_SIZE]) -> Self {
        MemoryImage { words }
    }
}

impl Index<usize> for MemoryImage {
    type Output = Word;

    fn index(&self, addr: usize) -> &Word {
        &self.words[addr]
    }
}

impl IndexMut<usize> for MemoryImage {
    fn index_mut(&mut self, addr: usize) -> &mut Word {
        &mut self.words[addr]
    }
}

/// Error reading an object file.
#[derive(Debug, PartialEq, Eq)]
pub enum ImageError {
    Magic,
    Length { found: usize },
}

impl Error for ImageError {}

impl fmt::Display for ImageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Magic => write!(f, "not an LMinC object file"),
            Self::Length { found } => write!(
                f,
                "object file should be {OBJECT_LEN} bytes long, found {found}"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_file_keeps_signed_words() {
        let mut image = MemoryImage::new();
        image[0] = 901;
        image[42] = -7;
        image[99] = 123_456;
        let bytes = image.to_bytes();
        assert_eq!(&bytes[..4], b"LMC\0");
        assert_eq!(MemoryImage::from_bytes(&bytes), Ok(image));
    }

    #[test]
    fn object_file_rejects_garbage() {
        assert_eq!(
            MemoryImage::from_bytes(b"LMC\0"),
            Err(ImageError::Length { found: 4 })
        );
        let mut bytes = MemoryImage::new().to_bytes();
        bytes[0] = b'X';
        assert_eq!(MemoryImage::from_bytes(&bytes), Err(ImageError::Magic));
    }
}
