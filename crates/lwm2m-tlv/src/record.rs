//! The LwM2M TLV record format.
//!
//! A record is a type byte (identifier kind, identifier width, length
//! width), a 1- or 2-byte identifier, an inline or 1/2/3-byte length and
//! the value bytes. Object-instance and multiple-resource records nest
//! further records in their value.
//!
//! Reference: OMA-TS-LightweightM2M-V1_0, section 6.3.3 (TLV format).

use std::io::{Cursor, Read, Seek, Write};

use binrw::{BinRead, BinResult, BinWrite, Endian};

use crate::{Result, TlvError, Value};

const KIND_MASK: u8 = 0b1100_0000;
const ID_16BIT: u8 = 0b0010_0000;
const LEN_WIDTH_MASK: u8 = 0b0001_1000;
const LEN_INLINE_MASK: u8 = 0b0000_0111;

/// Identifier kind carried in bits 7..6 of the TLV type byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    ObjectInstance,
    ResourceInstance,
    MultipleResource,
    ResourceWithValue,
}

impl RecordKind {
    fn from_bits(bits: u8) -> RecordKind {
        match bits {
            0 => RecordKind::ObjectInstance,
            1 => RecordKind::ResourceInstance,
            2 => RecordKind::MultipleResource,
            _ => RecordKind::ResourceWithValue,
        }
    }

    fn bits(self) -> u8 {
        match self {
            RecordKind::ObjectInstance => 0,
            RecordKind::ResourceInstance => 1,
            RecordKind::MultipleResource => 2,
            RecordKind::ResourceWithValue => 3,
        }
    }

    /// Nested kinds carry further TLV records in their value.
    pub fn is_nested(self) -> bool {
        matches!(
            self,
            RecordKind::ObjectInstance | RecordKind::MultipleResource
        )
    }
}

/// One TLV record: kind, identifier and raw value bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct TlvRecord {
    pub kind: RecordKind,
    pub id: u16,
    pub value: Vec<u8>,
}

impl TlvRecord {
    /// Builds a resource-with-value record from a typed value.
    pub fn resource(id: u16, value: &Value) -> Result<TlvRecord> {
        Ok(TlvRecord {
            kind: RecordKind::ResourceWithValue,
            id,
            value: value.encode()?,
        })
    }

    /// Builds a resource-instance record from a typed value.
    pub fn resource_instance(id: u16, value: &Value) -> Result<TlvRecord> {
        Ok(TlvRecord {
            kind: RecordKind::ResourceInstance,
            id,
            value: value.encode()?,
        })
    }

    /// Builds a multiple-resource record wrapping resource instances.
    pub fn multiple_resource(id: u16, instances: &[TlvRecord]) -> Result<TlvRecord> {
        Ok(TlvRecord {
            kind: RecordKind::MultipleResource,
            id,
            value: Self::write_all(instances)?,
        })
    }

    /// Builds an object-instance record wrapping resource records.
    pub fn object_instance(iid: u16, resources: &[TlvRecord]) -> Result<TlvRecord> {
        Ok(TlvRecord {
            kind: RecordKind::ObjectInstance,
            id: iid,
            value: Self::write_all(resources)?,
        })
    }

    /// Parses a whole payload as a sequence of records.
    pub fn read_all(data: &[u8]) -> Result<Vec<TlvRecord>> {
        let mut cursor = Cursor::new(data);
        let mut records = Vec::new();
        while (cursor.position() as usize) < data.len() {
            records.push(TlvRecord::read_be(&mut cursor)?);
        }
        Ok(records)
    }

    /// Serializes a sequence of records into one payload.
    pub fn write_all(records: &[TlvRecord]) -> Result<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::new());
        for record in records {
            record.write_be(&mut cursor)?;
        }
        Ok(cursor.into_inner())
    }

    /// Parses the nested records of an object-instance or multiple-resource
    /// record.
    pub fn children(&self) -> Result<Vec<TlvRecord>> {
        if !self.kind.is_nested() {
            return Err(TlvError::MalformedTlv(format!(
                "record {} carries a value, not children",
                self.id
            )));
        }
        Self::read_all(&self.value)
    }
}

impl BinRead for TlvRecord {
    type Args<'a> = ();

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        _: Endian,
        _: Self::Args<'_>,
    ) -> BinResult<Self> {
        let type_byte = u8::read_options(reader, Endian::Big, ())?;
        let kind = RecordKind::from_bits((type_byte & KIND_MASK) >> 6);

        let id = if type_byte & ID_16BIT != 0 {
            u16::read_options(reader, Endian::Big, ())?
        } else {
            u16::from(u8::read_options(reader, Endian::Big, ())?)
        };

        let length = match (type_byte & LEN_WIDTH_MASK) >> 3 {
            0 => usize::from(type_byte & LEN_INLINE_MASK),
            1 => usize::from(u8::read_options(reader, Endian::Big, ())?),
            2 => usize::from(u16::read_options(reader, Endian::Big, ())?),
            _ => {
                let high = u8::read_options(reader, Endian::Big, ())?;
                let low = u16::read_options(reader, Endian::Big, ())?;
                (usize::from(high) << 16) | usize::from(low)
            }
        };

        let mut value = vec![0u8; length];
        reader.read_exact(&mut value)?;
        Ok(TlvRecord { kind, id, value })
    }
}

impl BinWrite for TlvRecord {
    type Args<'a> = ();

    fn write_options<W: Write + Seek>(
        &self,
        writer: &mut W,
        _: Endian,
        _: Self::Args<'_>,
    ) -> BinResult<()> {
        let length = self.value.len();
        if length > 0xFF_FFFF {
            return Err(binrw::Error::Custom {
                pos: writer.stream_position()?,
                err: Box::new(TlvError::ValueTooLong(length)),
            });
        }

        let mut type_byte = self.kind.bits() << 6;
        if self.id > 0xFF {
            type_byte |= ID_16BIT;
        }

        let len_width = if length < 8 {
            type_byte |= length as u8;
            0u8
        } else if length <= 0xFF {
            1
        } else if length <= 0xFFFF {
            2
        } else {
            3
        };
        type_byte |= len_width << 3;
        type_byte.write_options(writer, Endian::Big, ())?;

        if self.id > 0xFF {
            self.id.write_options(writer, Endian::Big, ())?;
        } else {
            (self.id as u8).write_options(writer, Endian::Big, ())?;
        }

        match len_width {
            0 => {}
            1 => (length as u8).write_options(writer, Endian::Big, ())?,
            2 => (length as u16).write_options(writer, Endian::Big, ())?,
            _ => {
                ((length >> 16) as u8).write_options(writer, Endian::Big, ())?;
                (length as u16).write_options(writer, Endian::Big, ())?;
            }
        }

        writer.write_all(&self.value)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lwm2m_tests::*;

    test_binrw! {
        TlvRecord => short_resource: TlvRecord {
            kind: RecordKind::ResourceWithValue,
            id: 1,
            value: vec![0x0e, 0x10],
        } => "c2010e10"
    }

    test_binrw! {
        TlvRecord => wide_identifier: TlvRecord {
            kind: RecordKind::ResourceWithValue,
            id: 0x0141,
            value: vec![0x7f],
        } => "e101417f"
    }

    test_binrw! {
        TlvRecord => explicit_length: TlvRecord {
            kind: RecordKind::ResourceWithValue,
            id: 3,
            value: b"package-1".to_vec(),
        } => "c803097061636b6167652d31"
    }

    // Multiple-resource example from the LwM2M TS: /id=6 holding two
    // one-byte resource instances (0 -> 1, 1 -> 5).
    test_binrw! {
        TlvRecord => multiple_resource: TlvRecord {
            kind: RecordKind::MultipleResource,
            id: 6,
            value: lwm2m_tests::decode_hex("410001410105"),
        } => "8606410001410105"
    }

    test_binrw! {
        TlvRecord => object_instance: TlvRecord {
            kind: RecordKind::ObjectInstance,
            id: 0,
            value: lwm2m_tests::decode_hex("c10001"),
        } => "0300c10001"
    }

    #[test]
    fn test_nested_children() {
        let inner = [
            TlvRecord::resource_instance(0, &Value::Int(1)).unwrap(),
            TlvRecord::resource_instance(1, &Value::Int(5)).unwrap(),
        ];
        let outer = TlvRecord::multiple_resource(6, &inner).unwrap();
        assert_eq!(outer.children().unwrap(), inner.to_vec());

        let leaf = TlvRecord::resource(1, &Value::Int(1)).unwrap();
        assert!(leaf.children().is_err());
    }

    #[test]
    fn test_read_all_sequence() {
        let records = [
            TlvRecord::resource(0, &Value::String("ACME".into())).unwrap(),
            TlvRecord::resource(1, &Value::Int(3600)).unwrap(),
        ];
        let payload = TlvRecord::write_all(&records).unwrap();
        assert_eq!(TlvRecord::read_all(&payload).unwrap(), records.to_vec());
    }

    #[test]
    fn test_truncated_record() {
        // Declares 4 value bytes but carries only 2.
        let data = lwm2m_tests::decode_hex("c4010e10");
        assert!(TlvRecord::read_all(&data).is_err());
    }

    #[test]
    fn test_long_value_round_trip() {
        let value = vec![0xabu8; 300];
        let record = TlvRecord {
            kind: RecordKind::ResourceWithValue,
            id: 0,
            value,
        };
        let bytes = TlvRecord::write_all(std::slice::from_ref(&record)).unwrap();
        // 16-bit length field selected.
        assert_eq!(bytes[0], 0b1101_0000);
        assert_eq!(TlvRecord::read_all(&bytes).unwrap()[0], record);
    }
}
