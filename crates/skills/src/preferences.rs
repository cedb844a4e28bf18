use themeloom_core::{PreferenceProfile, PreferenceStore};

/// A preference store holding one fixed profile, usually from config.
#[derive(Debug, Clone, Default)]
pub struct StaticPreferenceStore {
    profile: PreferenceProfile,
}

impl StaticPreferenceStore {
    pub fn new(profile: PreferenceProfile) -> Self {
        Self { profile }
    }
}

impl PreferenceStore for StaticPreferenceStore {
    fn profile(&self) -> PreferenceProfile {
        self.profile.clone()
    }
}
