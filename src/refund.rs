//! Carrier refund rules and the compensation calculator.
//!
//! The rule table is static configuration: each carrier maps to an ordered
//! list of delay bands with a payout. The calculator is pure and never
//! errors; anything it cannot resolve degrades to a zero amount.

use crate::models::{Carrier, Ticket, TicketType};

/// No compensation is ever owed below this delay, regardless of carrier.
pub const MIN_QUALIFYING_DELAY_MINUTES: i32 = 60;

/// Payout of a matched rule condition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payout {
    /// Fixed amount in the ticket's currency unit
    Fixed(i32),
    /// Percentage of the ticket price, rounded half-up
    Percentage(i32),
}

/// One delay band of a carrier's rule set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleCondition {
    pub min_delay_minutes: i32,
    pub max_delay_minutes: Option<i32>,
    pub payout: Payout,
}

const RAIL_BANDS: &[RuleCondition] = &[
    RuleCondition {
        min_delay_minutes: 60,
        max_delay_minutes: Some(119),
        payout: Payout::Percentage(25),
    },
    RuleCondition {
        min_delay_minutes: 120,
        max_delay_minutes: None,
        payout: Payout::Percentage(50),
    },
];

const FLIXBUS_BANDS: &[RuleCondition] = &[RuleCondition {
    min_delay_minutes: 120,
    max_delay_minutes: None,
    payout: Payout::Percentage(25),
}];

/// Rule set for a carrier key, or `None` when the carrier has no rules.
pub fn rules_for(carrier: Carrier) -> Option<&'static [RuleCondition]> {
    match carrier {
        Carrier::Cd | Carrier::CdEticket | Carrier::Regiojet | Carrier::Default => {
            Some(RAIL_BANDS)
        }
        Carrier::Flixbus => Some(FLIXBUS_BANDS),
        Carrier::Other => None,
    }
}

/// First condition whose band contains the delay.
pub fn matching_condition(rules: &[RuleCondition], delay_minutes: i32) -> Option<&RuleCondition> {
    rules.iter().find(|condition| {
        delay_minutes >= condition.min_delay_minutes
            && condition
                .max_delay_minutes
                .map_or(true, |max| delay_minutes <= max)
    })
}

/// Amount owed for a matched condition against a ticket price.
pub fn payout_amount(condition: &RuleCondition, price: i32) -> i32 {
    match condition.payout {
        Payout::Fixed(value) => value,
        // half-up integer rounding of price * percent / 100
        Payout::Percentage(percent) => {
            ((i64::from(price) * i64::from(percent) + 50) / 100) as i32
        }
    }
}

/// Carrier key used for rule lookup. Digital CD tickets are compensated
/// under the e-ticket rule set rather than the nominal carrier.
pub fn effective_carrier(ticket: &Ticket) -> Carrier {
    if ticket.carrier == Carrier::Cd && ticket.ticket_type == TicketType::Digital {
        Carrier::CdEticket
    } else {
        ticket.carrier
    }
}

/// Compensation owed for a ticket, in its currency unit.
///
/// Unknown carriers and unmatched delays resolve to 0; this path never
/// falls back to the `default` rule set.
pub fn calculate_refund(ticket: &Ticket) -> i32 {
    if ticket.delay_minutes < MIN_QUALIFYING_DELAY_MINUTES {
        return 0;
    }

    let Some(rules) = rules_for(effective_carrier(ticket)) else {
        return 0;
    };

    match matching_condition(rules, ticket.delay_minutes) {
        Some(condition) => payout_amount(condition, ticket.price),
        None => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TicketStatus, TransportType};
    use chrono::{NaiveDate, NaiveTime, Utc};
    use uuid::Uuid;

    fn ticket(carrier: Carrier, ticket_type: TicketType, delay: i32, price: i32) -> Ticket {
        Ticket {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            ticket_type,
            transport_type: TransportType::Train,
            carrier,
            route_number: "R123".to_string(),
            departure_station: "Praha hl.n.".to_string(),
            arrival_station: "Brno hl.n.".to_string(),
            departure_date: NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
            departure_time: NaiveTime::from_hms_opt(14, 30, 0).unwrap(),
            arrival_date: NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
            arrival_time: NaiveTime::from_hms_opt(16, 45, 0).unwrap(),
            status: TicketStatus::Active,
            delay_minutes: delay,
            price,
            image_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn delays_under_an_hour_pay_nothing() {
        for delay in [0, 1, 30, 59] {
            let t = ticket(Carrier::Cd, TicketType::Scanned, delay, 580);
            assert_eq!(calculate_refund(&t), 0, "delay {delay}");
        }
    }

    #[test]
    fn cd_bands_pay_quarter_then_half() {
        let t = ticket(Carrier::Cd, TicketType::Scanned, 75, 580);
        assert_eq!(calculate_refund(&t), 145);

        let t = ticket(Carrier::Cd, TicketType::Scanned, 150, 580);
        assert_eq!(calculate_refund(&t), 290);

        // band edges
        let t = ticket(Carrier::Cd, TicketType::Scanned, 60, 580);
        assert_eq!(calculate_refund(&t), 145);
        let t = ticket(Carrier::Cd, TicketType::Scanned, 119, 580);
        assert_eq!(calculate_refund(&t), 145);
        let t = ticket(Carrier::Cd, TicketType::Scanned, 120, 580);
        assert_eq!(calculate_refund(&t), 290);
    }

    #[test]
    fn digital_cd_tickets_use_the_eticket_rule_set() {
        let t = ticket(Carrier::Cd, TicketType::Digital, 75, 580);
        assert_eq!(effective_carrier(&t), Carrier::CdEticket);
        assert_eq!(calculate_refund(&t), 145);

        // a scanned CD ticket keeps the nominal carrier key
        let t = ticket(Carrier::Cd, TicketType::Scanned, 75, 580);
        assert_eq!(effective_carrier(&t), Carrier::Cd);
    }

    #[test]
    fn regiojet_shares_the_rail_bands() {
        let t = ticket(Carrier::Regiojet, TicketType::Digital, 90, 300);
        assert_eq!(calculate_refund(&t), 75);
        let t = ticket(Carrier::Regiojet, TicketType::Digital, 130, 300);
        assert_eq!(calculate_refund(&t), 150);
    }

    #[test]
    fn flixbus_only_pays_from_two_hours() {
        let t = ticket(Carrier::Flixbus, TicketType::Digital, 90, 400);
        assert_eq!(calculate_refund(&t), 0);
        let t = ticket(Carrier::Flixbus, TicketType::Digital, 130, 400);
        assert_eq!(calculate_refund(&t), 100);
    }

    #[test]
    fn unknown_carrier_pays_nothing_instead_of_falling_back() {
        let t = ticket(Carrier::Other, TicketType::Digital, 150, 1000);
        assert_eq!(calculate_refund(&t), 0);
    }

    #[test]
    fn percentage_amounts_round_half_up() {
        // 25% of 333 is 83.25 -> 83; 25% of 334 is 83.5 -> 84
        let t = ticket(Carrier::Cd, TicketType::Scanned, 75, 333);
        assert_eq!(calculate_refund(&t), 83);
        let t = ticket(Carrier::Cd, TicketType::Scanned, 75, 334);
        assert_eq!(calculate_refund(&t), 84);
    }

    #[test]
    fn matching_prefers_the_first_containing_band() {
        let rules = rules_for(Carrier::Cd).unwrap();
        assert_eq!(
            matching_condition(rules, 70).unwrap().payout,
            Payout::Percentage(25)
        );
        assert_eq!(
            matching_condition(rules, 200).unwrap().payout,
            Payout::Percentage(50)
        );
        assert!(matching_condition(rules, 59).is_none());
    }
}
