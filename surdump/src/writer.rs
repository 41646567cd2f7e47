//! Dump Writer. Frames [`Record`]s and [`ChangeEntry`]s into an
//! artifact and maintains a running integrity hash over exactly the bytes
//! written, in the order written, including the magic prefix.
//!
//! Wire shape per item, mirroring the length-prefixed-JSON framing used
//! elsewhere in this codebase's codec layer, generalized with a one-byte tag so a
//! decoder can distinguish a [`Record`] from a [`ChangeEntry`] without
//! buffering the whole payload first:
//!
//! ```text
//! tag: u8        (0 = Record, 1 = ChangeEntry)
//! len: u64 (BE)  (length of the JSON payload that follows)
//! payload: [u8; len]
//! ```

use std::io::Write;

use byteorder::{BigEndian, WriteBytesExt};
use sha2::{Digest, Sha256};

use crate::error::CResult;
use crate::model::{ArtifactKind, ChangeEntry, Item, Record};

const TAG_RECORD: u8 = 0;
const TAG_CHANGE: u8 = 1;

/// The outcome of [`DumpWriter::finish`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Finished {
    pub size: u64,
}

pub struct DumpWriter<W: Write> {
    sink: W,
    hasher: Sha256,
    size: u64,
}

impl<W: Write> DumpWriter<W> {
    pub fn new(sink: W) -> Self {
        Self { sink, hasher: Sha256::new(), size: 0 }
    }

    /// Writes the magic prefix identifying this artifact's kind. Must be the
    /// first call made against a fresh writer.
    pub fn write_magic(&mut self, kind: ArtifactKind) -> CResult<()> {
        self.write_hashed(kind.magic())
    }

    /// Appends one self-delimiting item.
    pub fn encode(&mut self, item: impl Into<Item>) -> CResult<()> {
        match item.into() {
            Item::Record(record) => self.encode_tagged(TAG_RECORD, &record),
            Item::Change(entry) => self.encode_tagged(TAG_CHANGE, &entry),
        }
    }

    pub fn encode_record(&mut self, record: &Record) -> CResult<()> {
        self.encode_tagged(TAG_RECORD, record)
    }

    pub fn encode_change(&mut self, entry: &ChangeEntry) -> CResult<()> {
        self.encode_tagged(TAG_CHANGE, entry)
    }

    fn encode_tagged<T: serde::Serialize>(&mut self, tag: u8, value: &T) -> CResult<()> {
        let payload = serde_json::to_vec(value)?;
        let mut header = Vec::with_capacity(9);
        header.push(tag);
        header.write_u64::<BigEndian>(payload.len() as u64)?;
        self.write_hashed(&header)?;
        self.write_hashed(&payload)
    }

    fn write_hashed(&mut self, bytes: &[u8]) -> CResult<()> {
        self.sink.write_all(bytes)?;
        self.hasher.update(bytes);
        self.size += bytes.len() as u64;
        Ok(())
    }

    /// Flushes the sink and returns the size and hex-encoded sha256 digest
    /// of exactly the bytes written.
    pub fn finish(mut self) -> CResult<(Finished, String)> {
        self.sink.flush()?;
        let digest = hex::encode(self.hasher.finalize());
        Ok((Finished { size: self.size }, digest))
    }
}

/// Decodes a full artifact's items back out, for tests and for the
/// directory scanner's integrity checks. Production restore tooling is out
/// of scope; this exists to make the writer's framing testable end to end.
pub fn decode_items(bytes: &[u8], kind: ArtifactKind) -> CResult<Vec<Item>> {
    let magic = kind.magic();
    if !bytes.starts_with(magic) {
        return Err(crate::error::Error::Integrity(format!(
            "expected magic {:?}, found {:?}",
            String::from_utf8_lossy(magic),
            String::from_utf8_lossy(&bytes[..magic.len().min(bytes.len())]),
        )));
    }
    let mut pos = magic.len();
    let mut items = Vec::new();
    while pos < bytes.len() {
        let tag = bytes[pos];
        pos += 1;
        let len_bytes: [u8; 8] = bytes[pos..pos + 8]
            .try_into()
            .map_err(|_| crate::error::Error::Integrity("truncated length prefix".into()))?;
        let len = u64::from_be_bytes(len_bytes) as usize;
        pos += 8;
        let payload = &bytes[pos..pos + len];
        pos += len;
        let item = match tag {
            TAG_RECORD => Item::Record(serde_json::from_slice(payload)?),
            TAG_CHANGE => Item::Change(serde_json::from_slice(payload)?),
            other => return Err(crate::error::Error::Integrity(format!("unknown item tag {other}"))),
        };
        items.push(item);
    }
    Ok(items)
}

#[cfg(test)]
mod test {
    use super::*;
    use sha2::{Digest, Sha256};

    #[test]
    fn round_trips_records_and_change_entries_in_order() {
        let mut buf = Vec::new();
        let mut writer = DumpWriter::new(&mut buf);
        writer.write_magic(ArtifactKind::Full).unwrap();
        writer
            .encode(Record { table: "t".into(), id: "1".into(), data: serde_json::Map::new() })
            .unwrap();
        writer
            .encode(ChangeEntry {
                table: "t".into(),
                versionstamp: 5,
                changes: vec![crate::model::ChangeDescriptor::Delete { id: "1".into() }],
            })
            .unwrap();
        let (finished, digest) = writer.finish().unwrap();

        assert_eq!(finished.size as usize, buf.len());
        let mut hasher = Sha256::new();
        hasher.update(&buf);
        assert_eq!(digest, hex::encode(hasher.finalize()));

        let items = decode_items(&buf, ArtifactKind::Full).unwrap();
        assert_eq!(items.len(), 2);
        assert!(matches!(items[0], Item::Record(_)));
        assert!(matches!(items[1], Item::Change(_)));
    }

    #[test]
    fn rejects_wrong_magic() {
        let mut buf = Vec::new();
        let mut writer = DumpWriter::new(&mut buf);
        writer.write_magic(ArtifactKind::Incremental).unwrap();
        writer.finish().unwrap();

        assert!(decode_items(&buf, ArtifactKind::Full).is_err());
    }
}
