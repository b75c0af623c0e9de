use std::collections::BTreeSet;

use schedule_cell::models::Slot;

/// Keeps slots that are not past and not occupied, in ascending time order.
pub fn reconcile(candidates: &[Slot], occupied: &BTreeSet<String>) -> Vec<Slot> {
    let mut bookable: Vec<Slot> = candidates
        .iter()
        .filter(|slot| slot.available && !occupied.contains(&slot.time))
        .cloned()
        .collect();
    bookable.sort_by_key(|slot| slot.starts_at);
    bookable.dedup_by_key(|slot| slot.starts_at);
    bookable
}
