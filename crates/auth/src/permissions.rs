use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Permission identifier (e.g. "tokens.issue").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const EVENTS_REGISTER: Permission = Permission(Cow::Borrowed("events.register"));
    pub const EVENTS_STAR: Permission = Permission(Cow::Borrowed("events.star"));
    pub const EVENTS_CREATE: Permission = Permission(Cow::Borrowed("events.create"));
    pub const EVENTS_STATUS_UPDATE: Permission = Permission(Cow::Borrowed("events.status.update"));
    pub const TOKENS_ISSUE: Permission = Permission(Cow::Borrowed("tokens.issue"));
    pub const PROFILE_EDIT: Permission = Permission(Cow::Borrowed("profile.edit"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
