//! Resource and lister traits
//!
//! A resource type plugs into the sweep through two traits: a [`Lister`]
//! that enumerates live instances for one location pass, and the
//! [`Resource`] instances it returns, which know how to delete themselves.
//!
//! Filtering and wait handling are optional behaviors. Whether a type has
//! them is declared up front in its registration's [`Capabilities`] rather
//! than discovered by probing the instance, so the sweeper (and anyone
//! reading a registration) can see the full contract of a type in one
//! place. The trait keeps default implementations so types without a
//! capability implement nothing.

use super::error::{SweepError, Veto};
use super::params::ScanParams;
use super::settings::Settings;
use crate::gcp::GcpClient;
use async_trait::async_trait;

/// Optional behaviors a resource type declares
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// Instances may veto their own removal
    pub filter: bool,
    /// Removal starts an operation that must be polled to completion
    pub wait: bool,
}

impl Capabilities {
    pub const NONE: Capabilities = Capabilities {
        filter: false,
        wait: false,
    };

    pub fn with_filter(mut self) -> Self {
        self.filter = true;
        self
    }

    pub fn with_wait(mut self) -> Self {
        self.wait = true;
        self
    }
}

/// Enumerates a resource type's live instances for one pass
#[async_trait]
pub trait Lister: Send + Sync {
    /// List instances visible under `params`.
    ///
    /// Implementations call [`ScanParams::before_list`] first; passes that
    /// do not apply come back as [`SweepError::Skip`].
    async fn list(&self, params: &ScanParams) -> Result<Vec<Box<dyn Resource>>, SweepError>;
}

/// One live instance scheduled for removal
#[async_trait]
pub trait Resource: Send + Sync {
    /// Stable display identifier, unique within the type and location
    fn id(&self) -> String;

    /// Absorb per-type settings before filtering runs. Default: ignore them.
    fn apply_settings(&mut self, _settings: &Settings) {}

    /// Decide whether this instance should survive the sweep.
    ///
    /// Only consulted when the type's capabilities declare `filter`.
    fn filter(&self) -> Result<(), Veto> {
        Ok(())
    }

    /// Issue the deletion request
    async fn remove(&mut self, client: &GcpClient) -> Result<(), SweepError>;

    /// Poll a deletion that completes asynchronously.
    ///
    /// Returns `Ok(())` once the instance is gone, [`SweepError::WaitPending`]
    /// while the operation is still running. Implementations clear their
    /// operation handle on completion, so calling again after `Ok(())` is a
    /// no-op that performs no network traffic. Only consulted when the type's
    /// capabilities declare `wait`.
    async fn handle_wait(&mut self, _client: &GcpClient) -> Result<(), SweepError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_builders_compose() {
        let caps = Capabilities::NONE.with_filter().with_wait();
        assert!(caps.filter);
        assert!(caps.wait);
        assert_eq!(Capabilities::default(), Capabilities::NONE);
    }
}
