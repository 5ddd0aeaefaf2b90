//! Object and resource descriptors.

use lwm2m_msg::{OpFlags, Operation, Uri};
use lwm2m_tlv::{ResourceType, Value};

use crate::client::ClientContext;
use crate::registry::Registry;
use crate::status::HandlerResult;

/// Typed read handler of a resource.
pub type ReadHandler = fn(&mut ClientContext, &Registry, Uri) -> HandlerResult<Value>;
/// Typed write handler of a resource.
pub type WriteHandler = fn(&mut ClientContext, &Registry, Uri, &Value) -> HandlerResult<()>;
/// Typed execute handler of a resource.
pub type ExecuteHandler = fn(&mut ClientContext, &Registry, Uri, &[u8]) -> HandlerResult<()>;

/// How many instances an object admits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceLimit {
    Single,
    Bounded(u16),
    Unbounded,
}

impl InstanceLimit {
    /// Whether an instance id is inside the declared bound.
    pub fn admits(&self, iid: u16) -> bool {
        match self {
            InstanceLimit::Single => iid == 0,
            InstanceLimit::Bounded(max) => iid < *max,
            InstanceLimit::Unbounded => true,
        }
    }
}

/// Descriptor of one resource inside an object.
///
/// Each capability slot is an `Option`: an absent handler is "operation
/// not offered here", which the dispatcher answers with 4.05, never a
/// handler error.
pub struct ResourceDef {
    pub id: u16,
    pub rtype: ResourceType,
    /// 1 for single-instance resources.
    pub max_instances: u16,
    pub read: Option<ReadHandler>,
    pub write: Option<WriteHandler>,
    pub execute: Option<ExecuteHandler>,
}

impl ResourceDef {
    pub fn read_only(id: u16, rtype: ResourceType, read: ReadHandler) -> ResourceDef {
        ResourceDef {
            id,
            rtype,
            max_instances: 1,
            read: Some(read),
            write: None,
            execute: None,
        }
    }

    pub fn read_write(
        id: u16,
        rtype: ResourceType,
        read: ReadHandler,
        write: WriteHandler,
    ) -> ResourceDef {
        ResourceDef {
            id,
            rtype,
            max_instances: 1,
            read: Some(read),
            write: Some(write),
            execute: None,
        }
    }

    pub fn write_only(id: u16, rtype: ResourceType, write: WriteHandler) -> ResourceDef {
        ResourceDef {
            id,
            rtype,
            max_instances: 1,
            read: None,
            write: Some(write),
            execute: None,
        }
    }

    pub fn executable(id: u16, execute: ExecuteHandler) -> ResourceDef {
        ResourceDef {
            id,
            rtype: ResourceType::Unknown,
            max_instances: 1,
            read: None,
            write: None,
            execute: Some(execute),
        }
    }

    /// The capability mask derived from handler presence.
    pub fn ops(&self) -> OpFlags {
        OpFlags::new()
            .with_read(self.read.is_some())
            .with_write(self.write.is_some())
            .with_execute(self.execute.is_some())
    }

    /// Whether the declared capabilities admit the operation.
    pub fn supports(&self, op: Operation) -> bool {
        self.ops().allows(op)
    }
}

impl std::fmt::Debug for ResourceDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceDef")
            .field("id", &self.id)
            .field("rtype", &self.rtype)
            .field("max_instances", &self.max_instances)
            .field("ops", &self.ops())
            .finish()
    }
}

/// Descriptor of a supported object.
#[derive(Debug)]
pub struct ObjectDef {
    pub id: u16,
    pub limit: InstanceLimit,
    pub resources: Vec<ResourceDef>,
}

impl ObjectDef {
    /// Finds a resource descriptor by id. Linear; descriptor sets are small.
    pub fn resource(&self, rid: u16) -> Option<&ResourceDef> {
        self.resources.iter().find(|r| r.id == rid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stub_read(_: &mut ClientContext, _: &Registry, _: Uri) -> HandlerResult<Value> {
        Ok(Value::Int(0))
    }

    #[test]
    fn test_capability_derivation() {
        let def = ResourceDef::read_only(3, ResourceType::String, stub_read);
        assert!(def.supports(Operation::Read));
        assert!(!def.supports(Operation::Write));
        assert!(!def.supports(Operation::Execute));
        // Dispatcher-level ops need no handler.
        assert!(def.supports(Operation::Discover));
    }

    #[test]
    fn test_instance_limits() {
        assert!(InstanceLimit::Single.admits(0));
        assert!(!InstanceLimit::Single.admits(1));
        assert!(InstanceLimit::Bounded(4).admits(3));
        assert!(!InstanceLimit::Bounded(4).admits(4));
        assert!(InstanceLimit::Unbounded.admits(u16::MAX));
    }
}
