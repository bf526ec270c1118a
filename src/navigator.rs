//! Dashboard navigator — active-module state and the profile-completion
//! gate.
//!
//! DESIGN
//! ======
//! The navigator owns a closed module enumeration and a static table
//! mapping each module to its content provider. Deep-link requests are a
//! once-only signal: consumed on the next tick, never reapplied. The
//! profile gate is advisory — explicit navigation dismisses it, and only a
//! later auth-state change can re-show it.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::store::AuthSnapshot;
use crate::user::User;

// =============================================================================
// MODULE IDS
// =============================================================================

/// The closed set of dashboard modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleId {
    #[default]
    DashboardHome,
    PersonalInfo,
    MemberJourney,
    VocationalTest,
    Events,
    Courses,
    Devotionals,
    Offerings,
    Kids,
    MemberManagement,
    Ministries,
    FinancialPanel,
    LiveStreaming,
    SiteManagement,
    SystemSettings,
    SystemStatus,
}

impl ModuleId {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ModuleId::DashboardHome => "dashboard_home",
            ModuleId::PersonalInfo => "personal_info",
            ModuleId::MemberJourney => "member_journey",
            ModuleId::VocationalTest => "vocational_test",
            ModuleId::Events => "events",
            ModuleId::Courses => "courses",
            ModuleId::Devotionals => "devotionals",
            ModuleId::Offerings => "offerings",
            ModuleId::Kids => "kids",
            ModuleId::MemberManagement => "member_management",
            ModuleId::Ministries => "ministries",
            ModuleId::FinancialPanel => "financial_panel",
            ModuleId::LiveStreaming => "live_streaming",
            ModuleId::SiteManagement => "site_management",
            ModuleId::SystemSettings => "system_settings",
            ModuleId::SystemStatus => "system_status",
        }
    }
}

impl std::fmt::Display for ModuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// NAVIGATION REQUESTS
// =============================================================================

/// Typed navigation payload from external navigation (deep links).
/// Unknown kinds or module ids fail to deserialize — they never reach the
/// navigator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NavRequest {
    Navigate { module_id: ModuleId },
}

// =============================================================================
// CONTENT PROVIDERS
// =============================================================================

/// A module's content surface. Providers manage their own data fetching;
/// the navigator only mounts and unmounts them on module switch.
pub trait ContentProvider: Send + Sync {
    fn mount(&self) {}
    fn unmount(&self) {}
}

/// Closed, statically known mapping from module ids to providers. Module
/// ids without a registered provider resolve to the home provider — a
/// fail-safe default, never an error state.
pub struct ModuleTable {
    home: Arc<dyn ContentProvider>,
    providers: HashMap<ModuleId, Arc<dyn ContentProvider>>,
}

impl ModuleTable {
    #[must_use]
    pub fn new(home: Arc<dyn ContentProvider>) -> Self {
        Self { home, providers: HashMap::new() }
    }

    #[must_use]
    pub fn with(mut self, module: ModuleId, provider: Arc<dyn ContentProvider>) -> Self {
        self.providers.insert(module, provider);
        self
    }

    #[must_use]
    pub fn provider_for(&self, module: ModuleId) -> &Arc<dyn ContentProvider> {
        self.providers.get(&module).unwrap_or(&self.home)
    }
}

// =============================================================================
// NAVIGATOR
// =============================================================================

pub struct Navigator {
    table: ModuleTable,
    active_module: ModuleId,
    profile_gate_visible: bool,
    /// Pending deep-link request; consumed at most once.
    pending: Option<NavRequest>,
    /// Last `(user, is_loading)` pair the gate rule ran against.
    observed: Option<(Option<User>, bool)>,
}

impl Navigator {
    /// Build a navigator over the module table. The default module's
    /// provider is mounted immediately.
    #[must_use]
    pub fn new(table: ModuleTable) -> Self {
        let active_module = ModuleId::default();
        table.provider_for(active_module).mount();
        Self {
            table,
            active_module,
            profile_gate_visible: false,
            pending: None,
            observed: None,
        }
    }

    #[must_use]
    pub fn active_module(&self) -> ModuleId {
        self.active_module
    }

    #[must_use]
    pub fn profile_gate_visible(&self) -> bool {
        self.profile_gate_visible
    }

    #[must_use]
    pub fn active_provider(&self) -> &Arc<dyn ContentProvider> {
        self.table.provider_for(self.active_module)
    }

    /// Record an external navigation request for the next tick.
    pub fn request(&mut self, request: NavRequest) {
        self.pending = Some(request);
    }

    /// Advance the navigator against the current auth snapshot: consume a
    /// pending deep-link request (once-only), then re-evaluate the gate
    /// rule — but only when the observed `(user, is_loading)` pair actually
    /// changed, so an explicit dismissal survives unrelated ticks.
    pub fn tick(&mut self, snapshot: &AuthSnapshot) {
        if let Some(NavRequest::Navigate { module_id }) = self.pending.take() {
            debug!(module = %module_id, "deep-link navigation applied");
            self.set_active(module_id);
        }

        let current = (snapshot.user.clone(), snapshot.is_loading);
        if self.observed.as_ref() != Some(&current) {
            self.profile_gate_visible = !snapshot.is_loading
                && snapshot
                    .user
                    .as_ref()
                    .is_some_and(User::needs_profile_completion);
            self.observed = Some(current);
        }
    }

    /// Explicit UI navigation: switches module and dismisses the gate even
    /// if the underlying condition still holds.
    pub fn select_module(&mut self, module: ModuleId) {
        debug!(module = %module, "module selected");
        self.set_active(module);
        self.profile_gate_visible = false;
    }

    fn set_active(&mut self, module: ModuleId) {
        if module == self.active_module {
            return;
        }
        self.table.provider_for(self.active_module).unmount();
        self.active_module = module;
        self.table.provider_for(module).mount();
    }
}

#[cfg(test)]
#[path = "navigator_test.rs"]
mod tests;
