//! Time-slot allocation for a single runway.

use math::Length;

use crate::comm::MessageState;
use crate::traffic::{self, AircraftId, Arena};

#[cfg(test)]
mod tests;

/// Default minimum interval in seconds between two slots of the same runway.
pub const SEPARATION: i64 = 120;
/// Distance from the threshold of the final approach fix.
pub const APPROACH_DISTANCE_TO_FINAL: Length<f64> = Length::from_nm(5.);

/// Aircraft waiting for a runway, ordered by assigned slot.
///
/// Slots are stored on the traffic records; the queue only holds ids.
#[derive(Debug, Clone)]
pub struct RunwayQueue {
    airport:           String,
    runway:            String,
    ids:               Vec<AircraftId>,
    currently_cleared: Option<AircraftId>,
    separation:        i64,
}

impl RunwayQueue {
    #[must_use]
    pub fn new(airport: impl Into<String>, runway: impl Into<String>, separation: i64) -> Self {
        Self {
            airport: airport.into(),
            runway: runway.into(),
            ids: Vec::new(),
            currently_cleared: None,
            separation,
        }
    }

    #[must_use]
    pub fn airport(&self) -> &str { &self.airport }

    #[must_use]
    pub fn runway(&self) -> &str { &self.runway }

    #[must_use]
    pub fn separation(&self) -> i64 { self.separation }

    /// Queued aircraft in slot order.
    #[must_use]
    pub fn ids(&self) -> &[AircraftId] { &self.ids }

    #[must_use]
    pub fn size(&self) -> usize { self.ids.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.ids.is_empty() }

    #[must_use]
    pub fn contains(&self, id: AircraftId) -> bool { self.ids.contains(&id) }

    fn slot_of(arena: &Arena, id: AircraftId) -> Result<i64, traffic::Error> {
        let record = arena.get(id)?;
        Ok(record.runway_slot.unwrap_or(record.planned_time))
    }

    /// Assigns a runway slot to `id` and queues it.
    ///
    /// The slot is the earliest time not before the planned time of the aircraft
    /// that keeps the separation to both neighbours.
    /// Requesting again for a queued aircraft returns its existing slot.
    pub fn request_time_slot(&mut self, id: AircraftId, arena: &mut Arena) -> Result<i64, traffic::Error> {
        let planned = arena.get(id)?.planned_time;

        if self.contains(id) {
            return Self::slot_of(arena, id);
        }

        let slots = self
            .ids
            .iter()
            .map(|&queued| Self::slot_of(arena, queued))
            .collect::<Result<Vec<_>, _>>()?;
        let slot = self.find_slot(planned, &slots);

        arena.get_mut(id)?.runway_slot = Some(slot);
        self.ids.push(id);
        self.resort(arena);
        bevy::log::debug!(
            "{id} assigned slot {slot} (planned {planned}) on {} {}",
            self.airport,
            self.runway
        );
        Ok(slot)
    }

    fn find_slot(&self, planned: i64, slots: &[i64]) -> i64 {
        let separation = self.separation;
        let (Some(&first), Some(&last)) = (slots.first(), slots.last()) else { return planned };

        if planned + separation <= first {
            return planned;
        }

        for (&current, &next) in slots.iter().zip(&slots[1..]) {
            if planned + separation < next {
                let candidate = planned.max(current + separation);
                if candidate + separation <= next {
                    return candidate;
                }
            }
        }

        planned.max(last + separation)
    }

    /// Stable sort by slot. Ids missing from the arena sort last.
    fn resort(&mut self, arena: &Arena) {
        self.ids.sort_by_key(|&id| Self::slot_of(arena, id).unwrap_or(i64::MAX));
    }

    /// Moves the slot of the head of the queue to `new_slot` and shifts all later slots by the same delta.
    ///
    /// `new_slot` is clamped to be no earlier than `now`.
    pub fn update_first(&mut self, new_slot: i64, now: i64, arena: &mut Arena) -> Result<(), traffic::Error> {
        let Some(&first) = self.ids.first() else { return Ok(()) };
        let new_slot = new_slot.max(now);
        let old_slot = Self::slot_of(arena, first)?;
        let delta = new_slot - old_slot;
        if delta == 0 {
            return Ok(());
        }

        for &id in &self.ids {
            let record = arena.get_mut(id)?;
            let slot = record.runway_slot.unwrap_or(record.planned_time);
            record.runway_slot = Some(slot + delta);
        }
        bevy::log::debug!("Shifted {} {} queue by {delta}s", self.airport, self.runway);
        Ok(())
    }

    /// Removes `id` from the queue, returning whether it was queued.
    ///
    /// Any removal ends the current runway clearance, whoever holds it.
    pub fn remove_from_queue(&mut self, id: AircraftId) -> bool {
        self.currently_cleared = None;
        let Some(index) = self.ids.iter().position(|&queued| queued == id) else { return false };
        self.ids.remove(index);
        true
    }

    #[must_use]
    pub fn first_in_departure_queue(&self) -> Option<AircraftId> { self.ids.first().copied() }

    /// The first queued aircraft whose main dialogue is in `state`.
    #[must_use]
    pub fn first_of_status(&self, state: MessageState, arena: &Arena) -> Option<AircraftId> {
        self.ids
            .iter()
            .copied()
            .find(|&id| arena.get(id).is_ok_and(|record| record.state == state))
    }

    #[must_use]
    pub fn get_by_id(&self, id: AircraftId) -> Option<usize> { self.ids.iter().position(|&queued| queued == id) }

    /// The aircraft currently cleared onto the runway.
    ///
    /// Unaffected by resorting; cleared by any [`remove_from_queue`](Self::remove_from_queue).
    #[must_use]
    pub fn currently_cleared(&self) -> Option<AircraftId> { self.currently_cleared }

    pub fn set_currently_cleared(&mut self, id: Option<AircraftId>) { self.currently_cleared = id; }
}
