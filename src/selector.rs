//! Accumulates map selections up to a fixed cap

use thiserror::Error;
use tracing::{debug, warn};

use crate::models::Location;

/// Number of locations a run works on
pub const MAX_LOCATIONS: usize = 4;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("You can only select {cap} locations.")]
pub struct SelectionRejected {
    pub cap: usize,
}

/// Ordered selection of map points. Order matters: the first point decides the
/// follow-up navigation after a run.
#[derive(Debug, Clone, Default)]
pub struct LocationSelector {
    locations: Vec<Location>,
}

impl LocationSelector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a point. Once the cap is reached the selection is left untouched.
    pub fn select(&mut self, location: Location) -> Result<&[Location], SelectionRejected> {
        if self.locations.len() >= MAX_LOCATIONS {
            warn!("Rejected selection {location}: already {MAX_LOCATIONS} locations");
            return Err(SelectionRejected { cap: MAX_LOCATIONS });
        }
        self.locations.push(location);
        debug!(
            "Selected {location} ({}/{MAX_LOCATIONS})",
            self.locations.len()
        );
        Ok(&self.locations)
    }

    #[must_use]
    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    /// Owned copy handed to a run so later selections cannot affect it
    #[must_use]
    pub fn snapshot(&self) -> Vec<Location> {
        self.locations.clone()
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.locations.len() >= MAX_LOCATIONS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_keeps_order() {
        let mut selector = LocationSelector::new();
        selector.select(Location::new(10.0, 20.0)).unwrap();
        selector.select(Location::new(30.0, 40.0)).unwrap();
        assert_eq!(
            selector.locations(),
            &[Location::new(10.0, 20.0), Location::new(30.0, 40.0)]
        );
    }

    #[test]
    fn test_duplicates_permitted() {
        let mut selector = LocationSelector::new();
        selector.select(Location::new(1.0, 1.0)).unwrap();
        selector.select(Location::new(1.0, 1.0)).unwrap();
        assert_eq!(selector.locations().len(), 2);
    }

    #[test]
    fn test_fifth_selection_rejected_without_mutation() {
        let mut selector = LocationSelector::new();
        for i in 0..4 {
            selector.select(Location::new(f64::from(i), 0.0)).unwrap();
        }
        assert!(selector.is_full());

        let before = selector.snapshot();
        let err = selector.select(Location::new(50.0, 50.0)).unwrap_err();
        assert_eq!(err.to_string(), "You can only select 4 locations.");
        assert_eq!(selector.snapshot(), before);
    }
}
