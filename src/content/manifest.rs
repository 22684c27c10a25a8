//! Codec for the chunk list that stands in for a logical blob.
//!
//! On disk a manifest is the concatenation of lines
//! `"<40-hex oid> <decimal length>\n"`, nothing before, between or after
//! them. Concatenating the referenced chunks in order reproduces the
//! original blob bit-exactly.

use crate::content::chunk::Chunk;
use crate::error::{Error, Result};
use crate::odb::{Oid, OID_HEX_LEN};

/// Ordered list of the chunks that reconstruct a logical blob.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: Vec<Chunk>,
}

impl Manifest {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn push(&mut self, chunk: Chunk) {
        self.entries.push(chunk);
    }

    pub fn entries(&self) -> &[Chunk] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Summed payload length of all entries, the size of the blob the
    /// manifest reconstructs.
    pub fn total_len(&self) -> usize {
        self.entries.iter().map(|c| c.len).sum()
    }

    /// Serialises to the line format. An empty manifest encodes to an
    /// empty buffer.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = String::with_capacity(self.entries.len() * (OID_HEX_LEN + 12));
        for chunk in &self.entries {
            out.push_str(&format!("{} {}\n", chunk.oid, chunk.len));
        }
        out.into_bytes()
    }

    /// Parses a byte buffer as zero or more manifest lines.
    ///
    /// An empty buffer is a valid zero-entry manifest; anything else
    /// must follow the grammar exactly or the whole buffer is rejected
    /// with [`Error::ManifestFormat`].
    pub fn decode(data: &[u8]) -> Result<Manifest> {
        let mut entries = Vec::new();
        let mut rest = data;
        while !rest.is_empty() {
            let nl = rest
                .iter()
                .position(|&b| b == b'\n')
                .ok_or(Error::ManifestFormat)?;
            entries.push(parse_line(&rest[..nl])?);
            rest = &rest[nl + 1..];
        }
        Ok(Manifest { entries })
    }
}

fn parse_line(line: &[u8]) -> Result<Chunk> {
    if line.len() < OID_HEX_LEN + 2 || line[OID_HEX_LEN] != b' ' {
        return Err(Error::ManifestFormat);
    }

    let hex = std::str::from_utf8(&line[..OID_HEX_LEN])
        .map_err(|_| Error::ManifestFormat)?;
    let oid = Oid::from_hex(hex).map_err(|_| Error::ManifestFormat)?;

    let digits = &line[OID_HEX_LEN + 1..];
    if !digits.iter().all(u8::is_ascii_digit) {
        return Err(Error::ManifestFormat);
    }
    let len = std::str::from_utf8(digits)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or(Error::ManifestFormat)?;

    Ok(Chunk { oid, len })
}
