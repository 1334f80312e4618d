//! Collaborators the panel consumes but does not implement: permission
//! checks, direct state queries, the overlay itself and user notices.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::types::{Capability, PanelAction, ToggleState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    /// Drawing on top of other apps.
    DrawOverlay,
    /// Runtime permission guarding the short-range radio on newer platforms.
    ShortRangeRadio,
}

pub trait PermissionProbe: Send + Sync {
    fn is_granted(&self, permission: Permission) -> bool;
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("{0} service unavailable")]
    Unavailable(Capability),
    #[error("Permission denied while querying {0}")]
    PermissionDenied(Capability),
    #[error("Query for {0} failed: {1}")]
    Failed(Capability, String),
}

#[async_trait]
pub trait NativeStateQuery: Send + Sync {
    async fn is_enabled(&self, capability: Capability) -> Result<bool, QueryError>;
}

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("Overlay construction failed: {0}")]
    Construction(String),
}

/// Builds overlay surfaces. The surface reports taps through `actions`.
pub trait OverlayHost: Send + Sync {
    fn create_surface(
        &self,
        actions: mpsc::Sender<PanelAction>,
    ) -> Result<Box<dyn OverlaySurface>, SurfaceError>;
}

/// Only ever touched from the UI task.
pub trait OverlaySurface: Send {
    fn render(&mut self, state: &ToggleState);
    fn close(&mut self);
}

pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}
