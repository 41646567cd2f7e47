//! The data model shared by every component: versionstamps, records, change
//! entries and the artifact/manifest/chain types they assemble into.

use serde_derive::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Monotone 64-bit commit ordinal assigned by the database. Total order,
/// never reused, may skip. Equality across databases is meaningless -- a
/// versionstamp is only ever compared against others from the same
/// `(namespace, database)`.
pub type Versionstamp = u64;

/// One row, as enumerated by the table scanner. `id` is stringified for
/// stable display; `data` is the full row, including its identifier field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub table: String,
    pub id: String,
    pub data: serde_json::Map<String, serde_json::Value>,
}

/// A single change-feed event's payload. Many descriptors may share one
/// versionstamp (see [`ChangeEntry`]).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ChangeDescriptor {
    /// A table was (re)defined at this versionstamp.
    DefineTable { name: String },
    /// Post-image of an upserted row; must contain enough to reproduce the row.
    Update {
        id: String,
        data: serde_json::Map<String, serde_json::Value>,
    },
    /// Deletion of an identified row.
    Delete { id: String },
}

/// One change-feed scan result: all descriptors that committed at
/// `versionstamp` for `table`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChangeEntry {
    pub table: String,
    pub versionstamp: Versionstamp,
    pub changes: Vec<ChangeDescriptor>,
}

/// The two kinds of artifact this engine produces. `Display`/`FromStr` round
/// trip through the literal strings used on the wire and in manifests.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
pub enum ArtifactKind {
    #[strum(serialize = "FULL")]
    #[serde(rename = "FULL")]
    Full,
    #[strum(serialize = "INCREMENTAL")]
    #[serde(rename = "INCREMENTAL")]
    Incremental,
}

impl ArtifactKind {
    pub fn magic(&self) -> &'static [u8] {
        match self {
            ArtifactKind::Full => b"SURDUMP01",
            ArtifactKind::Incremental => b"SURINC01",
        }
    }
}

/// One item appended to an artifact by the dump writer. Distinguished
/// on decode by its schema keys, per the wire contract: `table`+`id`+`data`
/// is a [`Record`], `table`+`versionstamp`+`changes` is a [`ChangeEntry`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Item {
    Record(Record),
    Change(ChangeEntry),
}

impl From<Record> for Item {
    fn from(r: Record) -> Self {
        Item::Record(r)
    }
}

impl From<ChangeEntry> for Item {
    fn from(c: ChangeEntry) -> Self {
        Item::Change(c)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn artifact_kind_round_trips_through_its_wire_string() {
        assert_eq!("FULL".parse::<ArtifactKind>().unwrap(), ArtifactKind::Full);
        assert_eq!("INCREMENTAL".parse::<ArtifactKind>().unwrap(), ArtifactKind::Incremental);
        assert_eq!(ArtifactKind::Full.to_string(), "FULL");
    }

    #[test]
    fn item_untagged_decode_distinguishes_record_from_change_entry() {
        let record = Item::Record(Record {
            table: "person".into(),
            id: "1".into(),
            data: serde_json::Map::new(),
        });
        let encoded = serde_json::to_string(&record).unwrap();
        let decoded: Item = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, record);

        let change = Item::Change(ChangeEntry {
            table: "person".into(),
            versionstamp: 7,
            changes: vec![ChangeDescriptor::Delete { id: "1".into() }],
        });
        let encoded = serde_json::to_string(&change).unwrap();
        let decoded: Item = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, change);
    }
}
