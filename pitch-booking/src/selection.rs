use chrono::{DateTime, FixedOffset, Utc};
use pitch_catalog::pricing::total_price;
use pitch_catalog::TimeOfDay;
use serde::{Deserialize, Serialize};

use crate::slots::{local_to_utc, DayAvailability};

pub const MAX_SELECTED_SLOTS: usize = 2;

/// Slots a customer has picked on one day's availability.
///
/// Mirrors the booking page: clicks on occupied slots do nothing, a free slot
/// toggles in or out, at most two slots are held and the second one must sit
/// right next to the first. Rejected clicks leave the selection untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotSelection {
    indices: Vec<usize>,
}

impl SlotSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether the selection changed.
    pub fn toggle(&mut self, index: usize, day: &DayAvailability) -> bool {
        let Some(slot) = day.slot(index) else {
            return false;
        };
        if slot.occupied {
            return false;
        }

        if let Some(pos) = self.indices.iter().position(|i| *i == index) {
            self.indices.remove(pos);
            return true;
        }

        let accepted = match self.indices.first().copied() {
            None => true,
            Some(first) => self.indices.len() < MAX_SELECTED_SLOTS && first.abs_diff(index) == 1,
        };
        if accepted {
            self.indices.push(index);
            self.indices.sort_unstable();
        }
        accepted
    }

    pub fn clear(&mut self) {
        self.indices.clear();
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn selected_times(&self, day: &DayAvailability) -> Vec<TimeOfDay> {
        self.indices
            .iter()
            .filter_map(|i| day.slot(*i).map(|s| s.start))
            .collect()
    }

    pub fn total_price(&self, price_per_hour: i64) -> i64 {
        total_price(price_per_hour, self.len() as u32)
    }

    /// UTC interval covered by the selection, `None` when empty.
    pub fn interval(&self, day: &DayAvailability, offset: FixedOffset) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let first = day.slot(*self.indices.first()?)?;
        let last = day.slot(*self.indices.last()?)?;
        Some((
            local_to_utc(first.start.on(day.date), offset),
            local_to_utc(last.end.on(day.date), offset),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slots::{utc_offset, SlotView};
    use chrono::{Duration, NaiveDate};
    use pitch_catalog::DayOfWeek;

    fn day(occupied: &[usize]) -> DayAvailability {
        let starts = ["08:00", "09:00", "10:00", "11:00"];
        DayAvailability {
            date: NaiveDate::from_ymd_opt(2030, 1, 7).unwrap(),
            day_of_week: DayOfWeek::Monday,
            slots: starts
                .iter()
                .enumerate()
                .map(|(index, s)| {
                    let start: TimeOfDay = s.parse().unwrap();
                    SlotView {
                        index,
                        start,
                        end: start.checked_add_minutes(60).unwrap(),
                        occupied: occupied.contains(&index),
                    }
                })
                .collect(),
        }
    }

    #[test]
    fn test_select_two_adjacent() {
        let day = day(&[]);
        let mut sel = SlotSelection::new();
        assert!(sel.toggle(2, &day));
        assert!(sel.toggle(1, &day));
        assert_eq!(sel.indices(), &[1, 2]);
        assert_eq!(sel.selected_times(&day), vec!["09:00".parse().unwrap(), "10:00".parse().unwrap()]);
    }

    #[test]
    fn test_non_adjacent_second_slot_is_ignored() {
        let day = day(&[]);
        let mut sel = SlotSelection::new();
        sel.toggle(0, &day);
        assert!(!sel.toggle(2, &day));
        assert_eq!(sel.len(), 1);
        assert_eq!(sel.indices(), &[0]);
    }

    #[test]
    fn test_occupied_slot_is_ignored() {
        let day = day(&[1]);
        let mut sel = SlotSelection::new();
        assert!(!sel.toggle(1, &day));
        assert!(sel.is_empty());

        sel.toggle(0, &day);
        assert!(!sel.toggle(1, &day));
        assert_eq!(sel.indices(), &[0]);
    }

    #[test]
    fn test_cap_and_toggle_off() {
        let day = day(&[]);
        let mut sel = SlotSelection::new();
        sel.toggle(1, &day);
        sel.toggle(2, &day);
        // A third slot is never accepted, even when adjacent
        assert!(!sel.toggle(3, &day));
        assert_eq!(sel.len(), 2);

        // Clicking a selected slot removes it
        assert!(sel.toggle(1, &day));
        assert_eq!(sel.indices(), &[2]);
        assert!(sel.toggle(3, &day));
        assert_eq!(sel.indices(), &[2, 3]);
    }

    #[test]
    fn test_out_of_range_index() {
        let day = day(&[]);
        let mut sel = SlotSelection::new();
        assert!(!sel.toggle(10, &day));
        assert!(sel.is_empty());
    }

    #[test]
    fn test_total_price_and_interval() {
        let day = day(&[]);
        let mut sel = SlotSelection::new();
        assert_eq!(sel.total_price(4500), 0);
        assert_eq!(sel.interval(&day, utc_offset(0).unwrap()), None);

        sel.toggle(0, &day);
        sel.toggle(1, &day);
        assert_eq!(sel.total_price(4500), 9000);

        let (start, end) = sel.interval(&day, utc_offset(-60).unwrap()).unwrap();
        assert_eq!(start, day.date.and_hms_opt(9, 0, 0).unwrap().and_utc());
        assert_eq!(end - start, Duration::hours(2));
    }
}
