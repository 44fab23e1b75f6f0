//! End-to-end refund scenarios over the rules core: what a monitoring pass
//! decides for a ticket and what the resulting claim is worth.

use chrono::{Duration, NaiveTime, Utc};
use uuid::Uuid;

use kompenzo_server::claim_service::claim_amount;
use kompenzo_server::delay_monitor::{
    is_eligible, parse_train_number, plan_delay_update, DelayUpdate,
};
use kompenzo_server::models::{Carrier, Ticket, TicketStatus, TicketType, TransportType};
use kompenzo_server::refund::calculate_refund;

fn cd_train_ticket(delay: i32, price: i32) -> Ticket {
    let today = Utc::now().date_naive();
    Ticket {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        ticket_type: TicketType::Scanned,
        transport_type: TransportType::Train,
        carrier: Carrier::Cd,
        route_number: "EC176".to_string(),
        departure_station: "Praha hl.n.".to_string(),
        arrival_station: "Ostrava hl.n.".to_string(),
        departure_date: today - Duration::days(1),
        departure_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        arrival_date: today - Duration::days(1),
        arrival_time: NaiveTime::from_hms_opt(11, 30, 0).unwrap(),
        status: TicketStatus::Active,
        delay_minutes: delay,
        price,
        image_url: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[test]
fn cd_ticket_at_580_crowns_pays_the_published_bands() {
    let mut ticket = cd_train_ticket(75, 580);
    assert_eq!(calculate_refund(&ticket), 145);

    ticket.delay_minutes = 150;
    assert_eq!(calculate_refund(&ticket), 290);
}

#[test]
fn flixbus_ticket_at_400_crowns_only_pays_past_two_hours() {
    let mut ticket = cd_train_ticket(90, 400);
    ticket.carrier = Carrier::Flixbus;
    assert_eq!(calculate_refund(&ticket), 0);

    ticket.delay_minutes = 130;
    assert_eq!(calculate_refund(&ticket), 100);
}

/// A watched ticket with a recorded delay of 10 minutes and a
/// carrier-reported delay of 65 gets its delay raised, is marked delayed,
/// and yields exactly one claim worth 25% of the price.
#[test]
fn a_monitoring_pass_promotes_a_delayed_ticket_and_prices_its_claim() {
    let ticket = cd_train_ticket(10, 580);
    let today = Utc::now().date_naive();

    // the ticket is in the monitoring set and its route parses
    assert!(is_eligible(&ticket, today));
    assert_eq!(parse_train_number(&ticket.route_number), Some(176));

    // the carrier reports 65 minutes: the pass persists the delay and
    // flips the status
    let update = plan_delay_update(ticket.delay_minutes, 65).unwrap();
    assert_eq!(
        update,
        DelayUpdate {
            delay_minutes: 65,
            status: TicketStatus::Delayed,
        }
    );

    // the updated ticket leaves the monitoring set, so the next pass
    // cannot refile
    let mut updated = ticket.clone();
    updated.delay_minutes = update.delay_minutes;
    updated.status = update.status;
    assert!(!is_eligible(&updated, today));

    // and a second pass reporting the same delay plans no mutation at all
    assert_eq!(plan_delay_update(updated.delay_minutes, 65), None);

    // the auto-filed claim is worth the 25% band in both rule paths
    assert_eq!(calculate_refund(&updated), 145);
    assert_eq!(
        claim_amount(updated.carrier, updated.delay_minutes, updated.price).unwrap(),
        145
    );
}

#[test]
fn reported_delays_below_the_recorded_value_are_ignored() {
    let ticket = cd_train_ticket(40, 580);
    assert_eq!(plan_delay_update(ticket.delay_minutes, 20), None);
    assert_eq!(plan_delay_update(ticket.delay_minutes, 40), None);

    // growth below the floor stays active and files nothing
    let update = plan_delay_update(ticket.delay_minutes, 55).unwrap();
    assert_eq!(update.status, TicketStatus::Active);
    let mut updated = ticket.clone();
    updated.delay_minutes = update.delay_minutes;
    assert_eq!(calculate_refund(&updated), 0);
}
