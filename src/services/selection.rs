//! Winner selection.
//!
//! Pure functions over an event snapshot and an injected RNG, so settlement
//! is deterministic under a seeded generator.

use crate::models::{LuckyEvent, SelectionMode};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::BTreeMap;

/// Winners in selection order plus their prize-code assignment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub winners: Vec<String>,
    pub assigned_codes: BTreeMap<String, String>,
}

/// Select winners for an event whose registration window has closed.
///
/// Registrants are taken in registration order. An empty pool or an empty
/// code list selects nobody. Unrecognized selection modes select randomly.
pub fn select_winners<R: Rng>(event: &LuckyEvent, rng: &mut R) -> Selection {
    let registrants: Vec<String> = event
        .registrants_in_order()
        .into_iter()
        .map(|(id, _)| id)
        .collect();

    if registrants.is_empty() || event.codes.is_empty() {
        return Selection::default();
    }

    match event.selection_mode_enum() {
        SelectionMode::Custom => custom_selection(event, &registrants),
        SelectionMode::Random => random_selection(&registrants, &event.codes, rng),
    }
}

/// Uniform draw: Fisher–Yates shuffle, then the first `min(registrants,
/// codes)` shuffled entries win, codes assigned index-aligned.
fn random_selection<R: Rng>(registrants: &[String], codes: &[String], rng: &mut R) -> Selection {
    let mut shuffled = registrants.to_vec();
    shuffled.shuffle(rng);

    let winner_count = shuffled.len().min(codes.len());
    let mut selection = Selection::default();
    for (index, winner) in shuffled.into_iter().take(winner_count).enumerate() {
        selection
            .assigned_codes
            .insert(winner.clone(), codes[index].clone());
        selection.winners.push(winner);
    }
    selection
}

/// Slot draw: each configured slot names a 1-based registration position.
/// Positions without a slot never win; slots past the pool select nobody.
/// Falls back to the legacy "first N registrants win" shape when no slot
/// map is present.
fn custom_selection(event: &LuckyEvent, registrants: &[String]) -> Selection {
    let mut selection = Selection::default();

    if let Some(code_to_slot) = &event.custom_winner_slots {
        // Invert to slot → code; slot 0 or missing skips the code, and on a
        // duplicate slot the code appearing later in `codes` order wins.
        let mut slot_to_code: BTreeMap<u32, &String> = BTreeMap::new();
        for code in &event.codes {
            if let Some(slot) = code_to_slot.get(code) {
                if *slot > 0 {
                    slot_to_code.insert(*slot, code);
                }
            }
        }

        for (index, registrant) in registrants.iter().enumerate() {
            let order = (index + 1) as u32;
            if let Some(code) = slot_to_code.get(&order) {
                selection
                    .assigned_codes
                    .insert(registrant.clone(), (*code).clone());
                selection.winners.push(registrant.clone());
            }
        }
        return selection;
    }

    if let Some(winner_slots) = event.winner_slots {
        let winner_count = registrants.len().min(winner_slots as usize);
        for (index, registrant) in registrants.iter().take(winner_count).enumerate() {
            let code = &event.codes[index % event.codes.len()];
            selection
                .assigned_codes
                .insert(registrant.clone(), code.clone());
            selection.winners.push(registrant.clone());
        }
    }

    selection
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;

    fn event_with(mode: &str, extra: serde_json::Value) -> LuckyEvent {
        let mut doc = json!({
            "name": "launch",
            "startTime": 0,
            "endTime": 100,
            "resultTime": 200,
            "codes": ["A", "B", "C"],
            "selectionMode": mode,
            "registeredUsers": {
                "0000000000000001-aa": "u1",
                "0000000000000002-aa": "u2",
                "0000000000000003-aa": "u3"
            }
        });
        doc.as_object_mut()
            .unwrap()
            .extend(extra.as_object().cloned().unwrap_or_default());
        serde_json::from_value(doc).unwrap()
    }

    #[test]
    fn random_mode_bounds_winner_count() {
        let mut rng = StdRng::seed_from_u64(7);
        let event = event_with("random", json!({"codes": ["A", "B"]}));
        let selection = select_winners(&event, &mut rng);
        assert_eq!(selection.winners.len(), 2);
        assert_eq!(selection.assigned_codes.len(), 2);

        let event = event_with("random", json!({"codes": ["A", "B", "C", "D", "E"]}));
        let selection = select_winners(&event, &mut rng);
        assert_eq!(selection.winners.len(), 3);
    }

    #[test]
    fn random_mode_assigns_codes_index_aligned() {
        let mut rng = StdRng::seed_from_u64(7);
        let event = event_with("random", json!({}));
        let selection = select_winners(&event, &mut rng);
        for (index, winner) in selection.winners.iter().enumerate() {
            assert_eq!(
                selection.assigned_codes.get(winner),
                Some(&event.codes[index])
            );
        }
    }

    #[test]
    fn random_mode_winners_are_distinct_registrants() {
        let mut rng = StdRng::seed_from_u64(42);
        let event = event_with("random", json!({}));
        let selection = select_winners(&event, &mut rng);
        let mut deduped = selection.winners.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), selection.winners.len());
        let registrants: Vec<String> = event
            .registrants_in_order()
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert!(selection.winners.iter().all(|w| registrants.contains(w)));
    }

    #[test]
    fn custom_mode_matches_slots_to_registration_order() {
        let mut rng = StdRng::seed_from_u64(0);
        let event = event_with(
            "custom",
            json!({"codes": ["A", "B"], "customWinnerSlots": {"A": 1, "B": 3}}),
        );
        let selection = select_winners(&event, &mut rng);
        assert_eq!(
            selection.winners,
            vec!["0000000000000001-aa".to_string(), "0000000000000003-aa".to_string()]
        );
        assert_eq!(
            selection.assigned_codes.get("0000000000000001-aa"),
            Some(&"A".to_string())
        );
        assert_eq!(
            selection.assigned_codes.get("0000000000000003-aa"),
            Some(&"B".to_string())
        );
        assert!(!selection.assigned_codes.contains_key("0000000000000002-aa"));
    }

    #[test]
    fn custom_mode_skips_zero_and_out_of_range_slots() {
        let mut rng = StdRng::seed_from_u64(0);
        let event = event_with(
            "custom",
            json!({"customWinnerSlots": {"A": 0, "B": 2, "C": 9}}),
        );
        let selection = select_winners(&event, &mut rng);
        assert_eq!(selection.winners, vec!["0000000000000002-aa".to_string()]);
    }

    #[test]
    fn custom_mode_falls_back_to_legacy_winner_slots() {
        let mut rng = StdRng::seed_from_u64(0);
        let event = event_with("custom", json!({"codes": ["A", "B"], "winnerSlots": 3}));
        let selection = select_winners(&event, &mut rng);
        // First three registrants win, codes wrap modulo the code list.
        assert_eq!(selection.winners.len(), 3);
        assert_eq!(
            selection.assigned_codes.get("0000000000000003-aa"),
            Some(&"A".to_string())
        );
    }

    #[test]
    fn empty_pool_selects_nobody() {
        let mut rng = StdRng::seed_from_u64(0);
        let event: LuckyEvent = serde_json::from_value(json!({
            "name": "launch",
            "startTime": 0,
            "endTime": 100,
            "resultTime": 200,
            "codes": ["A"],
            "selectionMode": "random"
        }))
        .unwrap();
        let selection = select_winners(&event, &mut rng);
        assert!(selection.winners.is_empty());
        assert!(selection.assigned_codes.is_empty());
    }

    #[test]
    fn first_winner_frequency_is_roughly_uniform() {
        let mut rng = StdRng::seed_from_u64(1234);
        let event = event_with("random", json!({"codes": ["A"]}));
        let trials = 3000;
        let mut first_wins: BTreeMap<String, u32> = BTreeMap::new();
        for _ in 0..trials {
            let selection = select_winners(&event, &mut rng);
            *first_wins.entry(selection.winners[0].clone()).or_insert(0) += 1;
        }
        assert_eq!(first_wins.len(), 3);
        for count in first_wins.values() {
            let frequency = f64::from(*count) / f64::from(trials);
            assert!(
                (0.28..0.39).contains(&frequency),
                "first-winner frequency {} outside uniform band",
                frequency
            );
        }
    }
}
