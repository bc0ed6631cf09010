//! Read-only catalog endpoints plus the admin course form. The filtering and
//! ranking rules live in the store.

pub mod handlers;
