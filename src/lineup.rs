//! Billing-priority ordering and show titling for multi-act lineups.

use crate::domain::{BillingPosition, LineupSlot, SlotStatus};

/// Total order over billing tiers: headliner before co-headliner before
/// unspecified before support before local support.
pub fn priority(position: Option<BillingPosition>) -> u8 {
    match position {
        Some(BillingPosition::Headliner) => 1,
        Some(BillingPosition::CoHeadliner) => 2,
        None => 3,
        Some(BillingPosition::Support) => 4,
        Some(BillingPosition::LocalSupport) => 5,
    }
}

fn slot_key(slot: &LineupSlot) -> (u8, u32, u8) {
    (
        priority(slot.billing_position),
        slot.performance_order.unwrap_or(u32::MAX),
        match slot.status {
            SlotStatus::Confirmed => 0,
            SlotStatus::Pending => 1,
        },
    )
}

/// Sort slots into billing order and rewrite performance order 1..n.
pub fn assign(mut slots: Vec<LineupSlot>) -> Vec<LineupSlot> {
    slots.sort_by_key(slot_key);
    for (i, slot) in slots.iter_mut().enumerate() {
        slot.performance_order = Some(i as u32 + 1);
    }
    slots
}

/// Max name length for the comma-list title form.
const SHORT_NAME: usize = 10;

/// Deterministic human-readable title for a lineup. Pure and total: an
/// empty lineup renders as "TBA".
pub fn title(slots: &[LineupSlot]) -> String {
    let mut ordered: Vec<&LineupSlot> = slots.iter().collect();
    ordered.sort_by_key(|s| slot_key(s));

    let names: Vec<&str> = ordered.iter().map(|s| s.artist_name.as_str()).collect();
    match names.len() {
        0 => "TBA".to_string(),
        1 => names[0].to_string(),
        2 => format!("{} & {}", names[0], names[1]),
        n => {
            let top: Vec<&str> = ordered
                .iter()
                .filter(|s| priority(s.billing_position) <= 2)
                .map(|s| s.artist_name.as_str())
                .collect();
            if top.len() >= 2 && top.len() < n {
                // Co-headline pair (or more) plus support acts.
                return format!("{} + {} more", top.join(" & "), n - top.len());
            }

            let same_tier = ordered
                .windows(2)
                .all(|w| priority(w[0].billing_position) == priority(w[1].billing_position));
            let short = names.iter().take(3).all(|name| name.len() <= SHORT_NAME);
            if same_tier && short {
                if n == 3 {
                    return names.join(", ");
                }
                return format!("{} +{} more", names[..3].join(", "), n - 3);
            }

            format!("{} + {} more", names[0], n - 1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn slot(name: &str, position: Option<BillingPosition>) -> LineupSlot {
        LineupSlot {
            artist_id: Uuid::new_v4(),
            artist_name: name.to_string(),
            billing_position: position,
            performance_order: None,
            status: SlotStatus::Confirmed,
        }
    }

    #[test]
    fn priority_total_order() {
        assert!(priority(Some(BillingPosition::Headliner)) < priority(Some(BillingPosition::CoHeadliner)));
        assert!(priority(Some(BillingPosition::CoHeadliner)) < priority(None));
        assert!(priority(None) < priority(Some(BillingPosition::Support)));
        assert!(priority(Some(BillingPosition::Support)) < priority(Some(BillingPosition::LocalSupport)));
    }

    #[test]
    fn assign_orders_by_billing_then_explicit_order() {
        let mut opener = slot("Opener", Some(BillingPosition::Support));
        opener.performance_order = Some(2);
        let mut closer = slot("Closer", Some(BillingPosition::Support));
        closer.performance_order = Some(1);
        let headliner = slot("Headliner", Some(BillingPosition::Headliner));

        let assigned = assign(vec![opener, headliner, closer]);
        let names: Vec<&str> = assigned.iter().map(|s| s.artist_name.as_str()).collect();
        assert_eq!(names, vec!["Headliner", "Closer", "Opener"]);
        assert_eq!(
            assigned.iter().map(|s| s.performance_order).collect::<Vec<_>>(),
            vec![Some(1), Some(2), Some(3)]
        );
    }

    #[test]
    fn confirmed_sorts_before_pending_within_a_tier() {
        let mut maybe = slot("Maybe", None);
        maybe.status = SlotStatus::Pending;
        let sure = slot("Sure", None);

        let assigned = assign(vec![maybe, sure]);
        assert_eq!(assigned[0].artist_name, "Sure");
    }

    #[test]
    fn empty_lineup_is_tba() {
        assert_eq!(title(&[]), "TBA");
    }

    #[test]
    fn solo_act_uses_its_name() {
        assert_eq!(title(&[slot("Lightning Bolt", None)]), "Lightning Bolt");
    }

    #[test]
    fn two_acts_join_with_ampersand() {
        let slots = vec![
            slot("Wand", Some(BillingPosition::Headliner)),
            slot("Chastity", Some(BillingPosition::Support)),
        ];
        assert_eq!(title(&slots), "Wand & Chastity");
    }

    #[test]
    fn headliner_with_support_counts_the_rest() {
        let slots = vec![
            slot("A", Some(BillingPosition::Headliner)),
            slot("B", Some(BillingPosition::Support)),
            slot("C", Some(BillingPosition::Support)),
        ];
        assert_eq!(title(&slots), "A + 2 more");
    }

    #[test]
    fn co_headline_pair_with_support() {
        let slots = vec![
            slot("Big Star", Some(BillingPosition::Headliner)),
            slot("Luna Moth", Some(BillingPosition::CoHeadliner)),
            slot("Locals", Some(BillingPosition::LocalSupport)),
        ];
        assert_eq!(title(&slots), "Big Star & Luna Moth + 1 more");
    }

    #[test]
    fn same_tier_short_names_list_out() {
        let slots = vec![
            slot("Ems", None),
            slot("Gag", None),
            slot("Dreamdecay", Some(BillingPosition::Headliner)),
            slot("Soft Boil", None),
        ];
        // Mixed tiers, so the default form wins.
        assert_eq!(title(&slots), "Dreamdecay + 3 more");

        let same = vec![slot("Ems", None), slot("Gag", None), slot("Puce", None)];
        assert_eq!(title(&same), "Ems, Gag, Puce");

        let four = vec![
            slot("Ems", None),
            slot("Gag", None),
            slot("Puce", None),
            slot("Vexx", None),
        ];
        assert_eq!(title(&four), "Ems, Gag, Puce +1 more");
    }

    #[test]
    fn title_never_panics_on_odd_input() {
        let mut odd = slot("", Some(BillingPosition::LocalSupport));
        odd.performance_order = Some(u32::MAX);
        assert_eq!(title(&[odd]), "");
    }
}
