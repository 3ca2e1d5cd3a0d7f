// ── Device resource ──

use std::fmt;
use std::sync::Arc;

use crate::cache::{CacheLease, Cacheable, EntityCache};
use crate::model::{DeviceProfile, Identifier};

/// A read-only device a patient can be assigned.
pub struct Device {
    identifier: Identifier,
    name: Option<String>,
    model: Option<String>,
    manufacturer: Option<String>,
    _lease: CacheLease<Device>,
}

impl Device {
    /// Build an uncached device.
    pub fn detached(profile: DeviceProfile) -> Arc<Self> {
        let lease = CacheLease::detached(profile.identifier.clone());
        Arc::new(Self::from_profile(profile, lease))
    }

    fn from_profile(profile: DeviceProfile, lease: CacheLease<Self>) -> Self {
        Self {
            identifier: profile.identifier,
            name: profile.name,
            model: profile.model,
            manufacturer: profile.manufacturer,
            _lease: lease,
        }
    }

    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn manufacturer(&self) -> Option<&str> {
        self.manufacturer.as_deref()
    }

    pub fn profile(&self) -> DeviceProfile {
        DeviceProfile {
            identifier: self.identifier.clone(),
            name: self.name.clone(),
            model: self.model.clone(),
            manufacturer: self.manufacturer.clone(),
        }
    }
}

impl Cacheable for Device {
    type Key = Identifier;
    type Representation = DeviceProfile;
    type Context = ();

    const KIND: &'static str = "device";

    fn key_of(profile: &DeviceProfile) -> Identifier {
        profile.identifier.clone()
    }

    fn hydrate(profile: DeviceProfile, _context: &(), lease: CacheLease<Self>) -> Self {
        Self::from_profile(profile, lease)
    }
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("identifier", &self.identifier)
            .field("name", &self.name)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

pub type DeviceCache = EntityCache<Device>;
