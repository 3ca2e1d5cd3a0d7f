// ── Membership storage ──

pub(crate) mod collection;

pub(crate) use collection::EntityCollection;
