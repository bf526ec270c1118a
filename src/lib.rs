//! # parishboard
//!
//! Session/identity core and gated navigation for a multi-tenant church
//! dashboard client.
//!
//! ARCHITECTURE
//! ============
//! Identity backend → session resolver → auth store → (event listener
//! feeding back into the store) → dashboard navigator → content providers.
//! The store is the only shared mutable state and the single writer over
//! it; the navigator owns its module/gate state privately. Backends and
//! durable storage are trait seams so applications and tests swap in their
//! own collaborators.

pub mod backend;
pub mod config;
pub mod listener;
pub mod navigator;
pub mod resolver;
pub mod storage;
pub mod store;
pub mod user;

pub use backend::{
    AdminRecord, BackendError, IdentityBackend, MemberRecord, Session, SessionEvent,
    rest::RestBackend,
};
pub use config::{BackendConfig, StorageConfig};
pub use listener::AuthListener;
pub use navigator::{ContentProvider, ModuleId, ModuleTable, NavRequest, Navigator};
pub use resolver::{MASTER_PANEL_NAME, ResolutionError, resolve};
pub use storage::{DurableStorage, JsonFileStorage, StorageError};
pub use store::{AuthSnapshot, AuthStore};
pub use user::{Role, RoleParseError, StatusParseError, User, UserStatus};
