//! Cluster builder: groups members by resolved location and spreads
//! co-located members on a small circle so each stays clickable.
//!
//! Grouping is exact on the location key. Two inputs that resolve to
//! floating-point-adjacent but different points form separate groups.

use crate::location::{self, GeoPoint, LocatableEntity};
use serde::Serialize;
use std::collections::HashMap;
use std::f64::consts::PI;

/// Radius, in degrees, of the circle co-located members are spread on.
pub const SPREAD_RADIUS: f64 = 0.15;

/// A member with its derived map placement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedEntity {
    #[serde(flatten)]
    pub entity: LocatableEntity,
    pub base_position: GeoPoint,
    pub display_position: GeoPoint,
    pub location_key: String,
}

/// All placed members sharing one base position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationGroup {
    pub key: String,
    pub position: GeoPoint,
    pub entities: Vec<PlacedEntity>,
}

impl LocationGroup {
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// Grouping key for a point: both components joined by a comma.
///
/// Uses the shortest round-trip float formatting, so the same `f64` always
/// yields the same key.
pub fn location_key(point: &GeoPoint) -> String {
    format!("{},{}", point.lat, point.lng)
}

/// Place every entity using the default spread radius.
pub fn build(entities: &[LocatableEntity]) -> Vec<PlacedEntity> {
    build_with_radius(entities, SPREAD_RADIUS)
}

/// Place every entity, spreading groups of more than one on a circle of `radius`.
///
/// Output is ordered by group (first-seen key order), then by encounter order
/// within the group.
pub fn build_with_radius(entities: &[LocatableEntity], radius: f64) -> Vec<PlacedEntity> {
    let mut order: Vec<(String, GeoPoint, Vec<&LocatableEntity>)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for entity in entities {
        let base = location::resolve(entity.city.as_deref(), entity.country.as_deref());
        let key = location_key(&base);
        match index.get(&key) {
            Some(&i) => order[i].2.push(entity),
            None => {
                index.insert(key.clone(), order.len());
                order.push((key, base, vec![entity]));
            }
        }
    }

    let mut placed = Vec::with_capacity(entities.len());
    for (key, base, members) in order {
        let n = members.len();
        for (i, entity) in members.into_iter().enumerate() {
            let display = if n == 1 { base } else { spread(base, i, n, radius) };
            placed.push(PlacedEntity {
                entity: entity.clone(),
                base_position: base,
                display_position: display,
                location_key: key.clone(),
            });
        }
    }
    placed
}

/// Position of member `index` out of `count` on the circle around `base`.
pub fn spread(base: GeoPoint, index: usize, count: usize, radius: f64) -> GeoPoint {
    let angle = (index as f64 / count as f64) * PI * 2.0;
    GeoPoint::new(base.lat + angle.cos() * radius, base.lng + angle.sin() * radius)
}

/// Re-group placed entities by location key, keeping first-seen order.
pub fn group_by_location(placed: &[PlacedEntity]) -> Vec<LocationGroup> {
    let mut groups: Vec<LocationGroup> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for p in placed {
        match index.get(p.location_key.as_str()) {
            Some(&i) => groups[i].entities.push(p.clone()),
            None => {
                index.insert(p.location_key.as_str(), groups.len());
                groups.push(LocationGroup {
                    key: p.location_key.clone(),
                    position: p.base_position,
                    entities: vec![p.clone()],
                });
            }
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn entity(id: &str, city: Option<&str>, country: Option<&str>) -> LocatableEntity {
        LocatableEntity::new(id, city, country)
    }

    #[test]
    fn test_single_entity_not_spread() {
        let placed = build(&[entity("1", Some("London"), None)]);
        assert_eq!(placed.len(), 1);
        assert_eq!(placed[0].display_position, placed[0].base_position);
        assert_eq!(placed[0].base_position, GeoPoint::new(51.5074, -0.1278));
        assert_eq!(placed[0].location_key, "51.5074,-0.1278");
    }

    #[test]
    fn test_radial_spread_invariant() {
        let entities: Vec<_> = (0..5).map(|i| entity(&i.to_string(), Some("Tokyo"), None)).collect();
        let placed = build(&entities);
        let base = GeoPoint::new(35.6762, 139.6503);

        for p in &placed {
            assert_eq!(p.base_position, base);
            assert_relative_eq!(p.display_position.planar_distance(&base), SPREAD_RADIUS, epsilon = 1e-9);
        }
        for i in 0..placed.len() {
            for j in (i + 1)..placed.len() {
                assert_ne!(placed[i].display_position, placed[j].display_position);
            }
        }
        // Consecutive members are 2π/N apart.
        let step = 2.0 * PI / 5.0;
        for (i, p) in placed.iter().enumerate() {
            let angle = (p.display_position.lng - base.lng).atan2(p.display_position.lat - base.lat);
            let expected = i as f64 * step;
            let diff = (angle - expected).rem_euclid(2.0 * PI);
            assert!(diff < 1e-9 || (2.0 * PI - diff) < 1e-9, "member {} at angle {}", i, angle);
        }
    }

    #[test]
    fn test_first_member_sits_north() {
        let placed = build(&[entity("a", Some("Dhaka"), None), entity("b", Some("Dhaka"), None)]);
        assert_relative_eq!(placed[0].display_position.lat, 23.8103 + 0.15, epsilon = 1e-12);
        assert_relative_eq!(placed[0].display_position.lng, 90.4125, epsilon = 1e-12);
        assert_relative_eq!(placed[1].display_position.lat, 23.8103 - 0.15, epsilon = 1e-12);
        assert_relative_eq!(placed[1].display_position.lng, 90.4125, epsilon = 1e-12);
    }

    #[test]
    fn test_grouping_consistency_country_fallback() {
        let entities = vec![
            entity("1", Some("Dhaka"), None),
            entity("2", Some(""), Some("BD")),
            entity("3", Some("Dhaka"), None),
            entity("4", None, Some("BD")),
        ];
        let groups = group_by_location(&build(&entities));
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].position, GeoPoint::new(23.8103, 90.4125));
        assert_eq!(groups[0].len(), 2);
        assert_eq!(groups[1].position, GeoPoint::new(23.6850, 90.3563));
        assert_eq!(groups[1].len(), 2);
        let ids: Vec<_> = groups[1].entities.iter().map(|p| p.entity.id.as_str()).collect();
        assert_eq!(ids, ["2", "4"]);
    }

    #[test]
    fn test_unresolvable_collapse_to_world_center() {
        let entities = vec![
            entity("1", Some("Atlantis"), None),
            entity("2", None, Some("Narnia")),
            entity("3", None, None),
        ];
        let groups = group_by_location(&build(&entities));
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].position, GeoPoint::new(20.0, 0.0));
        assert_eq!(groups[0].key, "20,0");
        assert_eq!(groups[0].len(), 3);
    }

    #[test]
    fn test_first_seen_group_order() {
        let entities = vec![
            entity("1", Some("London"), None),
            entity("2", Some("Paris"), None),
            entity("3", Some("London"), None),
        ];
        let placed = build(&entities);
        let ids: Vec<_> = placed.iter().map(|p| p.entity.id.as_str()).collect();
        assert_eq!(ids, ["1", "3", "2"]);
    }

    #[test]
    fn test_build_is_deterministic() {
        let entities = vec![
            entity("1", Some("Lagos"), None),
            entity("2", Some("Lagos"), None),
            entity("3", Some("Lagos"), None),
        ];
        assert_eq!(build(&entities), build(&entities));
    }

    #[test]
    fn test_empty_input() {
        assert!(build(&[]).is_empty());
        assert!(group_by_location(&[]).is_empty());
    }

    #[test]
    fn test_custom_radius() {
        let entities = vec![entity("1", Some("Lima"), None), entity("2", Some("Lima"), None)];
        let placed = build_with_radius(&entities, 1.0);
        assert_relative_eq!(placed[0].display_position.planar_distance(&placed[0].base_position), 1.0, epsilon = 1e-12);
    }
}
