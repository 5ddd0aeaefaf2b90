//! Object instances: observation caches and notification attributes.

use lwm2m_msg::AttributeSet;
use lwm2m_tlv::Value;
use modular_bitfield::prelude::*;

/// Which notification attributes a server has written.
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeFlags {
    pub pmin: bool,
    pub pmax: bool,
    pub gt: bool,
    pub lt: bool,
    pub st: bool,
    #[skip]
    __: B3,
}

/// Notification attributes of one resource, with their presence mask.
///
/// Reference: OMA-TS-LightweightM2M-V1_0, section 5.1 (attributes).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NotifyAttributes {
    pub flags: AttributeFlags,
    /// Minimum period, seconds.
    pub pmin: u32,
    /// Maximum period, seconds.
    pub pmax: u32,
    pub gt: f64,
    pub lt: f64,
    pub st: f64,
}

impl NotifyAttributes {
    pub fn new() -> NotifyAttributes {
        NotifyAttributes {
            flags: AttributeFlags::new(),
            pmin: 0,
            pmax: 0,
            gt: 0.0,
            lt: 0.0,
            st: 0.0,
        }
    }

    /// Applies a Write-Attributes request, updating the presence mask.
    pub fn apply(&mut self, set: &AttributeSet) {
        if let Some(pmin) = set.pmin {
            self.pmin = pmin;
            self.flags.set_pmin(true);
        }
        if let Some(pmax) = set.pmax {
            self.pmax = pmax;
            self.flags.set_pmax(true);
        }
        if let Some(gt) = set.gt {
            self.gt = gt;
            self.flags.set_gt(true);
        }
        if let Some(lt) = set.lt {
            self.lt = lt;
            self.flags.set_lt(true);
        }
        if let Some(st) = set.st {
            self.st = st;
            self.flags.set_st(true);
        }
    }

    /// Renders the written attributes as link-format parameters.
    pub fn link_params(&self) -> String {
        let mut out = String::new();
        if self.flags.pmin() {
            out.push_str(&format!(";pmin={}", self.pmin));
        }
        if self.flags.pmax() {
            out.push_str(&format!(";pmax={}", self.pmax));
        }
        if self.flags.gt() {
            out.push_str(&format!(";gt={}", self.gt));
        }
        if self.flags.lt() {
            out.push_str(&format!(";lt={}", self.lt));
        }
        if self.flags.st() {
            out.push_str(&format!(";st={}", self.st));
        }
        out
    }
}

impl Default for NotifyAttributes {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
struct ResourceAttributes {
    rid: u16,
    attributes: NotifyAttributes,
}

/// An active observation relation on one resource.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub rid: u16,
    /// CoAP token of the observe relation.
    pub token: u64,
    /// Notification ordering counter.
    pub sequence: u32,
    /// Last value handed to the server.
    pub last: Option<Value>,
}

/// A live object instance.
#[derive(Debug)]
pub struct ObjectInstance {
    pub oid: u16,
    pub iid: u16,
    attributes: Vec<ResourceAttributes>,
    observations: Vec<Observation>,
}

impl ObjectInstance {
    pub fn new(oid: u16, iid: u16) -> ObjectInstance {
        ObjectInstance {
            oid,
            iid,
            attributes: Vec::new(),
            observations: Vec::new(),
        }
    }

    /// Attributes attached to a resource, when any were written.
    pub fn attributes(&self, rid: u16) -> Option<&NotifyAttributes> {
        self.attributes
            .iter()
            .find(|a| a.rid == rid)
            .map(|a| &a.attributes)
    }

    /// Attribute slot of a resource, created on first write.
    pub fn attributes_mut(&mut self, rid: u16) -> &mut NotifyAttributes {
        if let Some(i) = self.attributes.iter().position(|a| a.rid == rid) {
            return &mut self.attributes[i].attributes;
        }
        self.attributes.push(ResourceAttributes {
            rid,
            attributes: NotifyAttributes::new(),
        });
        &mut self.attributes.last_mut().expect("just pushed").attributes
    }

    /// Registers (or refreshes) an observation on a resource.
    pub fn observe(&mut self, rid: u16, token: u64, value: Value) {
        match self.observations.iter_mut().find(|o| o.rid == rid) {
            Some(observation) => {
                observation.token = token;
                observation.last = Some(value);
            }
            None => self.observations.push(Observation {
                rid,
                token,
                sequence: 0,
                last: Some(value),
            }),
        }
    }

    /// Drops an observation; true when one existed.
    pub fn cancel_observation(&mut self, rid: u16) -> bool {
        let before = self.observations.len();
        self.observations.retain(|o| o.rid != rid);
        before != self.observations.len()
    }

    pub fn observation(&self, rid: u16) -> Option<&Observation> {
        self.observations.iter().find(|o| o.rid == rid)
    }

    /// Caches a newly observed value, bumping the ordering counter.
    /// Returns the (token, sequence) pair to notify with.
    pub fn record_value(&mut self, rid: u16, value: Value) -> Option<(u64, u32)> {
        let observation = self.observations.iter_mut().find(|o| o.rid == rid)?;
        observation.sequence += 1;
        observation.last = Some(value);
        Some((observation.token, observation.sequence))
    }
}
