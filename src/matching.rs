use serde::Serialize;
use uuid::Uuid;

use crate::directory::DynDriverDirectory;
use crate::entities::{Coordinates, VehicleType};

/// Maximum distance from the pickup within which a driver is eligible, in km.
const MATCH_RADIUS_KM: f64 = 10.0;

/// A directory candidate together with its distance from the pickup.
#[derive(Debug, Clone, Serialize)]
pub struct RankedCandidate {
    pub driver_id: Uuid,
    pub distance_km: f64,
}

/// Ranks directory candidates by distance from the pickup. Read-only: the
/// caller performs the assignment transition and owns the race where the
/// chosen driver is taken in the meantime.
pub struct DriverMatcher {
    directory: DynDriverDirectory,
    match_radius_km: f64,
}

impl DriverMatcher {
    pub fn new(directory: DynDriverDirectory) -> Self {
        Self {
            directory,
            match_radius_km: MATCH_RADIUS_KM,
        }
    }

    /// The nearest eligible drivers, closest first, at most `limit` of them.
    ///
    /// A failing or unreachable directory degrades to an empty list; matching
    /// never surfaces upstream trouble to its caller.
    #[tracing::instrument(skip(self))]
    pub async fn find_nearest(
        &self,
        pickup: Coordinates,
        vehicle_type: VehicleType,
        limit: usize,
    ) -> Vec<RankedCandidate> {
        let candidates = match self.directory.query(vehicle_type).await {
            Ok(candidates) => candidates,
            Err(err) => {
                tracing::warn!(?err, "driver directory query failed, matching degrades to no candidates");
                return vec![];
            }
        };

        let mut ranked: Vec<RankedCandidate> = candidates
            .into_iter()
            .filter_map(|candidate| {
                let position = candidate.coordinates?;
                let distance_km = pickup.distance_km(&position);

                if distance_km > self.match_radius_km {
                    return None;
                }

                Some(RankedCandidate {
                    driver_id: candidate.driver_id,
                    distance_km,
                })
            })
            .collect();

        // stable sort keeps directory order between equally distant drivers
        ranked.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
        ranked.truncate(limit);

        ranked
    }

    /// The single best candidate, if any driver is in range.
    pub async fn assign_best(
        &self,
        pickup: Coordinates,
        vehicle_type: VehicleType,
    ) -> Option<RankedCandidate> {
        self.find_nearest(pickup, vehicle_type, 1)
            .await
            .into_iter()
            .next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{DriverCandidate, DriverDirectory, InMemoryDriverDirectory};
    use crate::error::{upstream_error, Error};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct UnreachableDirectory;

    #[async_trait]
    impl DriverDirectory for UnreachableDirectory {
        async fn query(&self, _: VehicleType) -> Result<Vec<DriverCandidate>, Error> {
            Err(upstream_error("connection refused"))
        }
    }

    fn pickup() -> Coordinates {
        Coordinates::new(10.762622, 106.660172)
    }

    fn candidate(lat: f64, lng: f64) -> DriverCandidate {
        DriverCandidate {
            driver_id: Uuid::new_v4(),
            coordinates: Some(Coordinates::new(lat, lng)),
            vehicle_type: VehicleType::Bike,
            rating: None,
        }
    }

    async fn directory_with(candidates: Vec<DriverCandidate>) -> DynDriverDirectory {
        let directory = InMemoryDriverDirectory::new();
        for c in candidates {
            directory.upsert(c).await;
        }

        Arc::new(directory)
    }

    #[tokio::test]
    async fn ranks_by_distance_and_respects_limit() {
        let far = candidate(10.80, 106.70); // a few km out
        let near = candidate(10.7627, 106.6602); // practically at the pickup
        let mid = candidate(10.7715, 106.6987);

        let directory = directory_with(vec![far.clone(), near.clone(), mid.clone()]).await;
        let matcher = DriverMatcher::new(directory);

        let ranked = matcher.find_nearest(pickup(), VehicleType::Bike, 5).await;
        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].driver_id, near.driver_id);
        assert!(ranked[0].distance_km <= ranked[1].distance_km);
        assert!(ranked[1].distance_km <= ranked[2].distance_km);

        let top_two = matcher.find_nearest(pickup(), VehicleType::Bike, 2).await;
        assert_eq!(top_two.len(), 2);
        assert_eq!(top_two[0].driver_id, near.driver_id);
    }

    #[tokio::test]
    async fn drivers_beyond_the_match_radius_are_excluded() {
        // ~0.9 degrees of latitude is ~100 km
        let out_of_range = candidate(11.70, 106.660172);
        let in_range = candidate(10.7715, 106.6987);

        let directory = directory_with(vec![out_of_range, in_range.clone()]).await;
        let matcher = DriverMatcher::new(directory);

        let ranked = matcher.find_nearest(pickup(), VehicleType::Bike, 5).await;
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].driver_id, in_range.driver_id);
        assert!(ranked[0].distance_km <= 10.0);
    }

    #[tokio::test]
    async fn candidates_without_a_position_are_skipped() {
        let mut unlocated = candidate(0.0, 0.0);
        unlocated.coordinates = None;
        let located = candidate(10.7715, 106.6987);

        let directory = directory_with(vec![unlocated, located.clone()]).await;
        let matcher = DriverMatcher::new(directory);

        let ranked = matcher.find_nearest(pickup(), VehicleType::Bike, 5).await;
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].driver_id, located.driver_id);
    }

    #[tokio::test]
    async fn equal_distances_keep_directory_order() {
        let first = candidate(10.7715, 106.6987);
        let mut second = candidate(10.7715, 106.6987);
        second.coordinates = first.coordinates;

        let directory = directory_with(vec![first.clone(), second.clone()]).await;
        let matcher = DriverMatcher::new(directory);

        let ranked = matcher.find_nearest(pickup(), VehicleType::Bike, 5).await;
        assert_eq!(ranked[0].driver_id, first.driver_id);
        assert_eq!(ranked[1].driver_id, second.driver_id);
    }

    #[tokio::test]
    async fn empty_directory_yields_empty_list() {
        let directory = directory_with(vec![]).await;
        let matcher = DriverMatcher::new(directory);

        assert!(matcher
            .find_nearest(pickup(), VehicleType::Bike, 5)
            .await
            .is_empty());
        assert!(matcher
            .assign_best(pickup(), VehicleType::Bike)
            .await
            .is_none());
    }

    #[tokio::test]
    async fn directory_failure_degrades_to_no_candidates() {
        let matcher = DriverMatcher::new(Arc::new(UnreachableDirectory));

        assert!(matcher
            .find_nearest(pickup(), VehicleType::Bike, 5)
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn assign_best_returns_the_nearest() {
        let near = candidate(10.7627, 106.6602);
        let far = candidate(10.7715, 106.6987);

        let directory = directory_with(vec![far, near.clone()]).await;
        let matcher = DriverMatcher::new(directory);

        let best = matcher
            .assign_best(pickup(), VehicleType::Bike)
            .await
            .unwrap();
        assert_eq!(best.driver_id, near.driver_id);
    }
}
