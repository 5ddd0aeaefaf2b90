//! The four-level LwM2M addressing hierarchy.

use crate::MsgError;

/// Marker for an unspecified identifier at any addressing level.
pub const ID_NONE: u16 = 0xFFFF;

/// An LwM2M target: object / object instance / resource / resource
/// instance, each 16 bits with [`ID_NONE`] meaning "not addressed".
///
/// Reference: OMA-TS-LightweightM2M-V1_0, section 6.2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Uri {
    pub oid: u16,
    pub oiid: u16,
    pub rid: u16,
    pub riid: u16,
}

impl Uri {
    /// Addresses a whole object.
    pub fn object(oid: u16) -> Uri {
        Uri {
            oid,
            oiid: ID_NONE,
            rid: ID_NONE,
            riid: ID_NONE,
        }
    }

    /// Addresses an object instance.
    pub fn instance(oid: u16, oiid: u16) -> Uri {
        Uri {
            oid,
            oiid,
            rid: ID_NONE,
            riid: ID_NONE,
        }
    }

    /// Addresses a resource.
    pub fn resource(oid: u16, oiid: u16, rid: u16) -> Uri {
        Uri {
            oid,
            oiid,
            rid,
            riid: ID_NONE,
        }
    }

    /// Addresses one instance of a multi-instance resource.
    pub fn resource_instance(oid: u16, oiid: u16, rid: u16, riid: u16) -> Uri {
        Uri {
            oid,
            oiid,
            rid,
            riid,
        }
    }

    pub fn has_instance(&self) -> bool {
        self.oiid != ID_NONE
    }

    pub fn has_resource(&self) -> bool {
        self.rid != ID_NONE
    }

    pub fn has_resource_instance(&self) -> bool {
        self.riid != ID_NONE
    }

    /// Parses a `/oid[/oiid[/rid[/riid]]]` path.
    pub fn parse(path: &str) -> crate::Result<Uri> {
        let invalid = || MsgError::InvalidPath(path.to_owned());
        let mut ids = [ID_NONE; 4];
        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
        if segments.is_empty() || segments.len() > 4 || segments[0].is_empty() {
            return Err(invalid());
        }
        for (slot, segment) in ids.iter_mut().zip(&segments) {
            *slot = segment.parse().map_err(|_| invalid())?;
        }
        Ok(Uri {
            oid: ids[0],
            oiid: ids[1],
            rid: ids[2],
            riid: ids[3],
        })
    }
}

impl std::fmt::Display for Uri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "/{}", self.oid)?;
        for id in [self.oiid, self.rid, self.riid] {
            if id == ID_NONE {
                break;
            }
            write!(f, "/{id}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        assert_eq!(Uri::parse("/3").unwrap(), Uri::object(3));
        assert_eq!(Uri::parse("/3/0").unwrap(), Uri::instance(3, 0));
        assert_eq!(Uri::parse("/5/0/1").unwrap(), Uri::resource(5, 0, 1));
        assert_eq!(
            Uri::parse("/3/0/6/1").unwrap(),
            Uri::resource_instance(3, 0, 6, 1)
        );
        assert_eq!(Uri::resource(1, 0, 8).to_string(), "/1/0/8");
        assert_eq!(Uri::object(33406).to_string(), "/33406");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for path in ["", "/", "/x", "/1/2/3/4/5", "/1//3"] {
            assert!(Uri::parse(path).is_err(), "path {path:?}");
        }
    }
}
