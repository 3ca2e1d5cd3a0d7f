//! Identity-keyed entity runtime for patients, accounts and devices.
//!
//! Entities mirror state owned by a pluggable backend. The crate keeps one
//! canonical instance per identity, changes fields only after the backend
//! confirms, and tells observers about confirmed changes.
//!
//! - **[`Runtime`]**: owns the caches and services; constructed once.
//!   [`initialize()`](Runtime::initialize) bootstraps the directory and the
//!   account manager concurrently.
//!
//! - **[`EntityCache`]**: find-or-create by identity over weak handles.
//!   Each hydrated entity owns a [`CacheLease`] that removes its entry when
//!   the last strong owner lets go.
//!
//! - **Entities** ([`Patient`], [`Account`], [`Device`]): synchronous
//!   accessors over confirmed state, async mutators that delegate to a
//!   backend trait and broadcast on success.
//!
//! - **Services** ([`PatientDirectory`], [`AccountManager`]): discovery,
//!   membership and the primary account.
//!
//! - **[`JoinGroup`]**: fan-in for calls made of several sub-operations.
//!
//! - **Backends** ([`backend`]): [`DefaultBackend`] rejects every mutation;
//!   [`MemoryBackend`] applies them to an exportable in-memory store.

pub mod account;
pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod join;
pub mod model;
pub mod observer;
pub mod patient;
pub mod runtime;
pub(crate) mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use account::{
    Account, AccountBackend, AccountCache, AccountContext, AccountManager,
    AccountManagerBackend, AccountManagerObserver, AccountObserver, AccountSnapshot,
};
pub use backend::{DefaultBackend, MemoryBackend, StoreSnapshot};
pub use cache::{CacheLease, Cacheable, EntityCache};
pub use config::RuntimeConfig;
pub use error::DomainError;
pub use join::{Abandoned, JoinGroup, JoinTicket};
pub use observer::ObserverRegistry;
pub use patient::{
    Device, DeviceCache, Patient, PatientBackend, PatientCache, PatientContext,
    PatientDirectory, PatientDirectoryBackend, PatientDirectoryObserver, PatientObserver,
};
pub use runtime::{Backends, Runtime};
pub use stream::MembershipStream;

pub use model::{
    AccountProfile, DeviceProfile, Identifier, Identity, IdentityKind, Image, Name, NameFormat,
    PatientProfile,
};
