//! Shared test utilities for the `lwm2m-rs` workspace.
//!
//! The macros here drive hex-string round-trip tests against [`binrw`]
//! types. LwM2M payloads are big-endian, so the macros always use the
//! `_be` entry points; types that declare their own endianness are
//! unaffected by the hint.

#![forbid(unsafe_code)]

pub use hex;
pub use pastey;

/// Decodes a hex string, panicking with a test-friendly message on bad input.
pub fn decode_hex(data: &str) -> Vec<u8> {
    hex::decode(data).expect("invalid hex literal in test")
}

/// Generates a read test: parses the hex buffer and compares against the value.
#[macro_export]
macro_rules! test_binrw_read {
    ($ty:ty => $name:ident: $value:expr => $data:expr) => {
        $crate::pastey::paste! {
            #[test]
            fn [<test_ $name:snake _read>]() {
                let data = $crate::decode_hex($data);
                let mut cursor = ::std::io::Cursor::new(&data);
                let parsed = <$ty as ::binrw::BinRead>::read_be(&mut cursor)
                    .expect("read failed");
                assert_eq!(parsed, $value);
                assert_eq!(
                    cursor.position() as usize,
                    data.len(),
                    "trailing bytes left after read"
                );
            }
        }
    };
}

/// Generates a write test: serializes the value and compares against the hex buffer.
#[macro_export]
macro_rules! test_binrw_write {
    ($ty:ty => $name:ident: $value:expr => $data:expr) => {
        $crate::pastey::paste! {
            #[test]
            fn [<test_ $name:snake _write>]() {
                let mut cursor = ::std::io::Cursor::new(::std::vec::Vec::new());
                let value: $ty = $value;
                ::binrw::BinWrite::write_be(&value, &mut cursor).expect("write failed");
                assert_eq!(
                    $crate::hex::encode(cursor.into_inner()),
                    $data.to_lowercase()
                );
            }
        }
    };
}

/// Generates both a read and a write test for the same value/buffer pair.
#[macro_export]
macro_rules! test_binrw {
    ($ty:ty => $name:ident: $value:expr => $data:expr) => {
        $crate::test_binrw_read! { $ty => $name: $value => $data }
        $crate::test_binrw_write! { $ty => $name: $value => $data }
    };
}
