pub mod identity;
pub mod image;
pub mod name;
pub mod profile;

pub use identity::{Identifier, Identity, IdentityKind};
pub use image::Image;
pub use name::{Name, NameFormat};
pub use profile::{AccountProfile, DeviceProfile, PatientProfile};
