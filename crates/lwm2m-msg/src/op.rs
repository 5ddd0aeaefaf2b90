//! LwM2M operations and resource capability masks.

use modular_bitfield::prelude::*;

/// Device-management operation decoded from a CoAP request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Read,
    Discover,
    Write,
    WriteAttributes,
    Execute,
    Create,
    Delete,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Operation::Read => "Read",
            Operation::Discover => "Discover",
            Operation::Write => "Write",
            Operation::WriteAttributes => "Write-Attributes",
            Operation::Execute => "Execute",
            Operation::Create => "Create",
            Operation::Delete => "Delete",
        };
        write!(f, "{name}")
    }
}

/// Capability mask of a resource descriptor.
///
/// A set bit means the matching typed handler is present; a clear bit is a
/// first-class "no handler" value, distinct from a handler failure.
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpFlags {
    pub read: bool,
    pub write: bool,
    pub execute: bool,
    #[skip]
    __: B5,
}

impl OpFlags {
    /// Whether this mask admits the given operation.
    ///
    /// Write-Attributes and Discover are serviced by the dispatcher itself
    /// and need no per-resource capability.
    pub fn allows(&self, op: Operation) -> bool {
        match op {
            Operation::Read => self.read(),
            Operation::Write | Operation::Create => self.write(),
            Operation::Execute => self.execute(),
            Operation::Discover | Operation::WriteAttributes => true,
            Operation::Delete => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_mask() {
        let rw = OpFlags::new().with_read(true).with_write(true);
        assert!(rw.allows(Operation::Read));
        assert!(rw.allows(Operation::Write));
        assert!(!rw.allows(Operation::Execute));
        assert!(rw.allows(Operation::Discover));

        let exec_only = OpFlags::new().with_execute(true);
        assert!(!exec_only.allows(Operation::Read));
        assert!(exec_only.allows(Operation::Execute));
    }
}
