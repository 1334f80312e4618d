use flipqs_core::{Permission, PermissionProbe};

/// Permission answers fixed at startup from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfiguredPermissions {
    pub overlay: bool,
    pub short_range_radio: bool,
}

impl ConfiguredPermissions {
    pub fn new(overlay: bool, short_range_radio: bool) -> Self {
        Self {
            overlay,
            short_range_radio,
        }
    }
}

impl Default for ConfiguredPermissions {
    fn default() -> Self {
        Self::new(true, true)
    }
}

impl PermissionProbe for ConfiguredPermissions {
    fn is_granted(&self, permission: Permission) -> bool {
        match permission {
            Permission::DrawOverlay => self.overlay,
            Permission::ShortRangeRadio => self.short_range_radio,
        }
    }
}
