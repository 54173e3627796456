use bevy::prelude::*;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq)]
pub struct ZoneDefinition {
    pub id: String,
    pub center: Vec3,
    pub radius: f32,
}

impl ZoneDefinition {
    pub fn new(id: impl Into<String>, center: Vec3, radius: f32) -> Self {
        Self {
            id: id.into(),
            center,
            radius,
        }
    }

    pub fn contains(&self, point: Vec3) -> bool {
        point.distance(self.center) <= self.radius
    }
}

/// Everything the detector reports. Entered and Exited bracket a visit; DwellProgress fires every
/// frame in between; DwellCompleted fires at most once per visit.
#[derive(Message, Debug, Clone, PartialEq)]
pub enum ZoneEvent {
    Entered { zone_id: String },
    DwellProgress { zone_id: String, time_in_area: f64 },
    Exited { zone_id: String },
    DwellCompleted { zone_id: String },
}

impl ZoneEvent {
    pub fn zone_id(&self) -> &str {
        match self {
            Self::Entered { zone_id }
            | Self::DwellProgress { zone_id, .. }
            | Self::Exited { zone_id }
            | Self::DwellCompleted { zone_id } => zone_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZoneError {
    UnknownZone(String),
}

impl Display for ZoneError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownZone(id) => write!(f, "no zone registered with id `{id}`"),
        }
    }
}

impl Error for ZoneError {}

#[derive(Debug, Clone, Copy, PartialEq)]
struct DwellCompletion {
    threshold_secs: f64,
    fired: bool,
}

#[derive(Debug, Clone)]
struct ZoneSlot {
    definition: ZoneDefinition,
    inside: bool,
    entered_at: Option<f64>,
    dwell: Option<DwellCompletion>,
}

/// Proximity geofence over a set of circular zones, evaluated in registration order.
///
/// Timestamps are wall-clock seconds supplied by the caller, so dwell time is independent of
/// frame rate.
#[derive(Resource, Debug, Clone, Default)]
pub struct ZoneDetector {
    slots: Vec<ZoneSlot>,
}

impl ZoneDetector {
    /// Adds a zone, or replaces the definition of an existing one while keeping its runtime
    /// state and dwell registration.
    pub fn register_zone(&mut self, definition: ZoneDefinition) -> Option<ZoneDefinition> {
        if let Some(slot) = self.slot_mut(&definition.id) {
            return Some(std::mem::replace(&mut slot.definition, definition));
        }

        self.slots.push(ZoneSlot {
            definition,
            inside: false,
            entered_at: None,
            dwell: None,
        });
        None
    }

    /// Drops the zone and any in-flight dwell timer. Returns `false` for unknown ids.
    pub fn unregister_zone(&mut self, zone_id: &str) -> bool {
        let before = self.slots.len();
        self.slots.retain(|slot| slot.definition.id != zone_id);
        self.slots.len() != before
    }

    pub fn register_dwell_completion(
        &mut self,
        zone_id: &str,
        threshold_secs: f64,
    ) -> Result<(), ZoneError> {
        let slot = self
            .slot_mut(zone_id)
            .ok_or_else(|| ZoneError::UnknownZone(zone_id.to_string()))?;
        // A visit that already completed stays completed until the car leaves.
        let fired = slot.inside && slot.dwell.is_some_and(|dwell| dwell.fired);
        slot.dwell = Some(DwellCompletion {
            threshold_secs,
            fired,
        });
        Ok(())
    }

    pub fn update(&mut self, position: Vec3, now_secs: f64, mut emit: impl FnMut(ZoneEvent)) {
        for slot in &mut self.slots {
            let zone_id = &slot.definition.id;
            let inside = slot.definition.contains(position);

            if inside && !slot.inside {
                slot.inside = true;
                slot.entered_at = Some(now_secs);
                if let Some(dwell) = slot.dwell.as_mut() {
                    dwell.fired = false;
                }
                emit(ZoneEvent::Entered {
                    zone_id: zone_id.clone(),
                });
            } else if !inside && slot.inside {
                slot.inside = false;
                slot.entered_at = None;
                emit(ZoneEvent::Exited {
                    zone_id: zone_id.clone(),
                });
            }

            if !inside {
                continue;
            }

            let time_in_area = slot
                .entered_at
                .map_or(0.0, |entered_at| (now_secs - entered_at).max(0.0));
            emit(ZoneEvent::DwellProgress {
                zone_id: zone_id.clone(),
                time_in_area,
            });

            if let Some(dwell) = slot.dwell.as_mut() {
                if !dwell.fired && time_in_area >= dwell.threshold_secs {
                    dwell.fired = true;
                    emit(ZoneEvent::DwellCompleted {
                        zone_id: zone_id.clone(),
                    });
                }
            }
        }
    }

    pub fn is_in_zone(&self, zone_id: &str) -> bool {
        self.slot(zone_id).is_some_and(|slot| slot.inside)
    }

    /// Seconds since the current visit began, or 0 when outside.
    pub fn time_in_zone(&self, zone_id: &str, now_secs: f64) -> f64 {
        self.slot(zone_id)
            .filter(|slot| slot.inside)
            .and_then(|slot| slot.entered_at)
            .map_or(0.0, |entered_at| (now_secs - entered_at).max(0.0))
    }

    pub fn active_zones(&self) -> Vec<&str> {
        self.slots
            .iter()
            .filter(|slot| slot.inside)
            .map(|slot| slot.definition.id.as_str())
            .collect()
    }

    /// Forgets containment and entry times and re-arms every dwell completion. Registrations stay.
    pub fn reset(&mut self) {
        for slot in &mut self.slots {
            slot.inside = false;
            slot.entered_at = None;
            if let Some(dwell) = slot.dwell.as_mut() {
                dwell.fired = false;
            }
        }
    }

    pub fn zones(&self) -> impl Iterator<Item = &ZoneDefinition> {
        self.slots.iter().map(|slot| &slot.definition)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    fn slot(&self, zone_id: &str) -> Option<&ZoneSlot> {
        self.slots.iter().find(|slot| slot.definition.id == zone_id)
    }

    fn slot_mut(&mut self, zone_id: &str) -> Option<&mut ZoneSlot> {
        self.slots
            .iter_mut()
            .find(|slot| slot.definition.id == zone_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: f64 = 1.0 / 60.0;

    fn detector_with(zones: &[(&str, Vec3)], threshold_secs: f64) -> ZoneDetector {
        let mut detector = ZoneDetector::default();
        for (id, center) in zones {
            detector.register_zone(ZoneDefinition::new(*id, *center, 5.0));
            detector
                .register_dwell_completion(id, threshold_secs)
                .expect("zone was just registered");
        }
        detector
    }

    /// Parks at `position` for `seconds`, stepping at 60 Hz from `*now`. Returns emitted events.
    fn dwell(
        detector: &mut ZoneDetector,
        position: Vec3,
        now: &mut f64,
        seconds: f64,
    ) -> Vec<ZoneEvent> {
        let mut events = Vec::new();
        let end = *now + seconds;
        while *now <= end {
            detector.update(position, *now, |event| events.push(event));
            *now += FRAME;
        }
        events
    }

    fn completions(events: &[ZoneEvent], zone_id: &str) -> usize {
        events
            .iter()
            .filter(|event| matches!(event, ZoneEvent::DwellCompleted { zone_id: id } if id == zone_id))
            .count()
    }

    const OUTSIDE: Vec3 = Vec3::new(0.0, 0.25, 0.0);
    const ZONE_A: Vec3 = Vec3::new(25.0, 0.0, 25.0);
    const ZONE_B: Vec3 = Vec3::new(-25.0, 0.0, -25.0);

    #[test]
    fn dwell_completion_fires_once_per_visit() {
        let mut detector = detector_with(&[("a", ZONE_A)], 3.0);
        let mut now = 100.0;

        let first_visit = dwell(&mut detector, ZONE_A, &mut now, 6.0);
        assert_eq!(completions(&first_visit, "a"), 1);
        assert!(matches!(first_visit.first(), Some(ZoneEvent::Entered { .. })));

        let exit = dwell(&mut detector, OUTSIDE, &mut now, 0.5);
        assert!(exit.contains(&ZoneEvent::Exited {
            zone_id: "a".to_string()
        }));

        let second_visit = dwell(&mut detector, ZONE_A, &mut now, 3.5);
        assert_eq!(completions(&second_visit, "a"), 1);
    }

    #[test]
    fn leaving_restarts_the_dwell_timer() {
        let mut detector = detector_with(&[("a", ZONE_A)], 3.0);
        let mut now = 0.0;

        let mut events = dwell(&mut detector, ZONE_A, &mut now, 2.0);
        events.extend(dwell(&mut detector, OUTSIDE, &mut now, 1.0));
        events.extend(dwell(&mut detector, ZONE_A, &mut now, 2.0));

        assert_eq!(completions(&events, "a"), 0);
        assert!(detector.time_in_zone("a", now) < 2.1);
    }

    #[test]
    fn disjoint_zones_complete_independently() {
        let mut detector = detector_with(&[("a", ZONE_A), ("b", ZONE_B)], 3.0);
        let mut now = 0.0;

        let in_a = dwell(&mut detector, ZONE_A, &mut now, 3.5);
        assert_eq!(completions(&in_a, "a"), 1);
        assert_eq!(completions(&in_a, "b"), 0);

        let in_b = dwell(&mut detector, ZONE_B, &mut now, 3.5);
        assert_eq!(completions(&in_b, "b"), 1);
        assert_eq!(completions(&in_b, "a"), 0);
    }

    #[test]
    fn progress_reports_elapsed_time_while_inside() {
        let mut detector = detector_with(&[("a", ZONE_A)], 3.0);
        let mut events = Vec::new();

        detector.update(ZONE_A, 10.0, |event| events.push(event));
        detector.update(ZONE_A, 11.5, |event| events.push(event));

        assert_eq!(
            events.last(),
            Some(&ZoneEvent::DwellProgress {
                zone_id: "a".to_string(),
                time_in_area: 1.5
            })
        );
        assert!(detector.is_in_zone("a"));
        assert_eq!(detector.time_in_zone("a", 12.0), 2.0);
        assert_eq!(detector.active_zones(), vec!["a"]);
    }

    #[test]
    fn overlapping_zones_are_both_active() {
        let mut detector = detector_with(
            &[("a", Vec3::ZERO), ("b", Vec3::new(3.0, 0.0, 0.0))],
            3.0,
        );
        detector.update(Vec3::new(1.5, 0.0, 0.0), 0.0, |_| {});
        assert_eq!(detector.active_zones(), vec!["a", "b"]);
    }

    #[test]
    fn unregister_discards_in_flight_timer() {
        let mut detector = detector_with(&[("a", ZONE_A)], 3.0);
        let mut now = 0.0;
        dwell(&mut detector, ZONE_A, &mut now, 2.0);

        assert!(detector.unregister_zone("a"));
        assert!(!detector.unregister_zone("a"));

        let events = dwell(&mut detector, ZONE_A, &mut now, 3.0);
        assert!(events.is_empty());
        assert!(!detector.is_in_zone("a"));
        assert_eq!(detector.time_in_zone("a", now), 0.0);
    }

    #[test]
    fn dwell_registration_requires_known_zone() {
        let mut detector = ZoneDetector::default();
        assert_eq!(
            detector.register_dwell_completion("missing", 3.0),
            Err(ZoneError::UnknownZone("missing".to_string()))
        );
    }

    #[test]
    fn re_registering_replaces_definition_and_keeps_visit() {
        let mut detector = detector_with(&[("a", ZONE_A)], 3.0);
        detector.update(ZONE_A, 0.0, |_| {});

        let previous = detector.register_zone(ZoneDefinition::new("a", ZONE_A, 8.0));
        assert_eq!(previous.map(|zone| zone.radius), Some(5.0));
        assert_eq!(detector.len(), 1);
        assert!(detector.is_in_zone("a"));
    }

    #[test]
    fn re_registering_dwell_mid_visit_does_not_fire_again() {
        let mut detector = detector_with(&[("a", ZONE_A)], 3.0);
        let mut now = 0.0;
        let mut events = dwell(&mut detector, ZONE_A, &mut now, 3.5);

        detector.register_zone(ZoneDefinition::new("a", ZONE_A, 6.0));
        detector
            .register_dwell_completion("a", 3.0)
            .expect("zone is registered");
        events.extend(dwell(&mut detector, ZONE_A, &mut now, 1.0));
        assert_eq!(completions(&events, "a"), 1);

        events.extend(dwell(&mut detector, OUTSIDE, &mut now, 0.5));
        events.extend(dwell(&mut detector, ZONE_A, &mut now, 3.5));
        assert_eq!(completions(&events, "a"), 2);
    }

    #[test]
    fn reset_rearms_completions_but_keeps_zones() {
        let mut detector = detector_with(&[("a", ZONE_A)], 3.0);
        let mut now = 0.0;
        dwell(&mut detector, ZONE_A, &mut now, 3.5);

        detector.reset();
        assert!(detector.active_zones().is_empty());
        assert_eq!(detector.len(), 1);

        let events = dwell(&mut detector, ZONE_A, &mut now, 3.5);
        assert_eq!(completions(&events, "a"), 1);
    }
}
