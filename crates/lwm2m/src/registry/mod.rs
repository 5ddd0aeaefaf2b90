//! The supported-object registry.
//!
//! Descriptors live in an arena indexed by [`ObjectHandle`]; lookups hand
//! out handles or short-lived borrows, never long-lived references.
//! Instances live beside the descriptors with their observation caches
//! and notification attributes. All lookups are linear scans over a few
//! dozen entries.

mod instance;
mod object;

pub use instance::{AttributeFlags, NotifyAttributes, ObjectInstance, Observation};
pub use object::{
    ExecuteHandler, InstanceLimit, ObjectDef, ReadHandler, ResourceDef, WriteHandler,
};

use crate::{Error, Result};

/// Arena index of a registered object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectHandle(usize);

/// Holds the client-facing descriptor list and the session-instance list.
#[derive(Default)]
pub struct Registry {
    objects: Vec<ObjectDef>,
    instances: Vec<ObjectInstance>,
}

impl Registry {
    pub fn new() -> Registry {
        Registry::default()
    }

    /// Adds an object descriptor, rejecting duplicate ids.
    pub fn register_object(&mut self, def: ObjectDef) -> Result<ObjectHandle> {
        if self.find_object(def.id).is_some() {
            return Err(Error::DuplicateObject(def.id));
        }
        self.objects.push(def);
        Ok(ObjectHandle(self.objects.len() - 1))
    }

    /// Looks an object up by id.
    pub fn find_object(&self, oid: u16) -> Option<ObjectHandle> {
        self.objects
            .iter()
            .position(|o| o.id == oid)
            .map(ObjectHandle)
    }

    /// Resolves a handle to its descriptor.
    pub fn object(&self, handle: ObjectHandle) -> &ObjectDef {
        &self.objects[handle.0]
    }

    /// Looks a resource descriptor up under an object handle.
    pub fn find_resource(&self, handle: ObjectHandle, rid: u16) -> Option<&ResourceDef> {
        self.object(handle).resource(rid)
    }

    /// Creates an instance, enforcing uniqueness and the instance bound.
    pub fn create_instance(&mut self, oid: u16, iid: u16) -> Result<()> {
        let handle = self.find_object(oid).ok_or(Error::ObjectNotFound(oid))?;
        if self.has_instance(oid, iid) {
            return Err(Error::InstanceExists(oid, iid));
        }
        if !self.object(handle).limit.admits(iid) {
            return Err(Error::InstanceOutOfBounds(oid, iid));
        }
        self.instances.push(ObjectInstance::new(oid, iid));
        Ok(())
    }

    /// Deletes an instance together with its observations and attributes.
    pub fn delete_instance(&mut self, oid: u16, iid: u16) -> Result<()> {
        let position = self
            .instances
            .iter()
            .position(|i| i.oid == oid && i.iid == iid)
            .ok_or(Error::InstanceNotFound(oid, iid))?;
        self.instances.remove(position);
        Ok(())
    }

    pub fn has_instance(&self, oid: u16, iid: u16) -> bool {
        self.instances.iter().any(|i| i.oid == oid && i.iid == iid)
    }

    pub fn instance(&self, oid: u16, iid: u16) -> Option<&ObjectInstance> {
        self.instances.iter().find(|i| i.oid == oid && i.iid == iid)
    }

    pub fn instance_mut(&mut self, oid: u16, iid: u16) -> Option<&mut ObjectInstance> {
        self.instances
            .iter_mut()
            .find(|i| i.oid == oid && i.iid == iid)
    }

    /// Number of live instances of an object.
    pub fn instance_count(&self, oid: u16) -> usize {
        self.instances.iter().filter(|i| i.oid == oid).count()
    }

    /// Sorted instance ids of an object.
    pub fn instances_of(&self, oid: u16) -> Vec<u16> {
        let mut ids: Vec<u16> = self
            .instances
            .iter()
            .filter(|i| i.oid == oid)
            .map(|i| i.iid)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Resource ids declared by an object, for full-object reads.
    pub fn list_resources(&self, oid: u16) -> Vec<u16> {
        self.find_object(oid)
            .map(|h| self.object(h).resources.iter().map(|r| r.id).collect())
            .unwrap_or_default()
    }

    /// Lowest free instance id of an object.
    pub fn next_instance_id(&self, oid: u16) -> u16 {
        let mut iid = 0;
        while self.has_instance(oid, iid) {
            iid += 1;
        }
        iid
    }

    /// The registration catalogue: every object except security (0),
    /// paired with its instance ids, sorted by object id.
    pub fn catalogue(&self) -> Vec<(u16, Vec<u16>)> {
        let mut entries: Vec<(u16, Vec<u16>)> = self
            .objects
            .iter()
            .filter(|o| o.id != crate::objects::SECURITY_OBJECT_ID)
            .map(|o| (o.id, self.instances_of(o.id)))
            .collect();
        entries.sort_unstable_by_key(|(oid, _)| *oid);
        entries
    }
}
