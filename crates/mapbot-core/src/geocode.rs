use std::time::Duration;

use async_trait::async_trait;

use crate::domain::Coordinates;

/// Hexagonal port for resolving a place name to coordinates.
///
/// Implementations return `None` both when the provider has no match and when
/// it is unreachable or times out. Callers cannot tell the two apart; the
/// adapter may log the difference.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, name: &str, timeout: Duration) -> Option<Coordinates>;
}
