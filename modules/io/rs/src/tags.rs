use eyre::{ensure, eyre, Result};
use noodles::sam::alignment::record::data::field::Tag;
use noodles::sam::alignment::record_buf::data::field::value::Array;
use noodles::sam::alignment::record_buf::data::field::Value;
use noodles::sam::alignment::RecordBuf;

/// Per-base binary flag stored in an auxiliary read tag (one 0/1 value per read base).
///
/// The tag is either a byte array (`B:C`/`B:c`) or a string of decimal digits. Anything that can't
/// be decoded into exactly one value per base is a hard error: callers index the values by read
/// position, so a partially decoded tag would silently misattribute bases.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BinaryTag {
    tag: Tag,
}

impl BinaryTag {
    /// Largest key the covariate can produce.
    pub const MAXIMUM_KEY_VALUE: u8 = 1;

    pub fn new(name: Option<&str>) -> Result<Self> {
        let name = name.ok_or_else(|| eyre!("No name provided for the binary tag covariate"))?;
        let bytes = name.as_bytes();
        ensure!(
            bytes.len() == 2,
            "Binary tag name must be exactly two characters, got '{name}'"
        );
        Ok(Self {
            tag: Tag::from([bytes[0], bytes[1]]),
        })
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    /// Decode the per-base values of the read.
    pub fn decode(&self, record: &RecordBuf) -> Result<Vec<u8>> {
        let length = record.sequence().len();
        let readname = || {
            record
                .name()
                .map(|name| name.to_string())
                .unwrap_or_else(|| "*".to_string())
        };

        let mut values = match record.data().get(&self.tag) {
            Some(Value::Array(Array::UInt8(values))) => values.clone(),
            Some(Value::Array(Array::Int8(values))) => values.iter().map(|x| *x as u8).collect(),
            Some(Value::String(string)) => string
                .iter()
                .enumerate()
                .map(|(pos, &symbol)| match symbol {
                    b'0'..=b'9' => Ok(symbol - b'0'),
                    _ => Err(eyre!(
                        "Read {}: binary tag {:?} has a non-digit symbol '{}' at position {pos}",
                        readname(),
                        self.tag,
                        symbol as char
                    )),
                })
                .collect::<Result<Vec<_>>>()?,
            Some(_) => {
                return Err(eyre!(
                    "Read {}: binary tag {:?} is neither a byte array nor a string",
                    readname(),
                    self.tag
                ))
            }
            None => {
                return Err(eyre!(
                    "Read {}: binary tag {:?} is missing",
                    readname(),
                    self.tag
                ))
            }
        };

        ensure!(
            values.len() >= length,
            "Read {}: binary tag {:?} holds {} values for {length} bases",
            readname(),
            self.tag,
            values.len()
        );
        values.truncate(length);
        Ok(values)
    }

    pub fn format_key(key: u8) -> String {
        key.to_string()
    }

    pub fn key_from_value(value: &str) -> Result<u8> {
        let key = value
            .trim()
            .parse::<u8>()
            .map_err(|err| eyre!("Invalid binary tag key '{value}': {err}"))?;
        ensure!(
            key <= Self::MAXIMUM_KEY_VALUE,
            "Binary tag key {key} exceeds the maximum of {}",
            Self::MAXIMUM_KEY_VALUE
        );
        Ok(key)
    }
}
