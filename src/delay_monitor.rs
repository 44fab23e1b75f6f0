//! Delay monitor - keeps active tickets' delays current and auto-files
//! refund claims once a delay crosses the compensation floor.
//!
//! One monitoring pass scans a single user's eligible tickets against the
//! carrier delay lookup. A scheduler re-runs the pass on a fixed interval
//! per user; stopping a schedule suppresses future firings but never
//! cancels a pass already in flight.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use tokio::sync::Notify;
use tokio::time::{interval, Duration, MissedTickBehavior};
use uuid::Uuid;

use crate::carrier_api::DelayProvider;
use crate::claim_service::ClaimService;
use crate::models::{
    Carrier, MonitorReport, Ticket, TicketStatus, TransportType, UpdateTicketRequest,
};
use crate::notifications::{MonitorEvent, Notifier};
use crate::refund::{calculate_refund, MIN_QUALIFYING_DELAY_MINUTES};
use crate::ticket_service::TicketService;

/// Tickets older than this are no longer polled.
const MONITORING_WINDOW_DAYS: i64 = 14;

/// Whether a ticket belongs to the monitoring set: an active CD train
/// ticket without a confirmed delay, departed within the last two weeks.
pub fn is_eligible(ticket: &Ticket, today: NaiveDate) -> bool {
    ticket.status == TicketStatus::Active
        && ticket.carrier == Carrier::Cd
        && ticket.transport_type == TransportType::Train
        && ticket.delay_minutes < MIN_QUALIFYING_DELAY_MINUTES
        && ticket.departure_date > today - ChronoDuration::days(MONITORING_WINDOW_DAYS)
}

/// Numeric train number embedded in a route designation ("EC176" -> 176).
/// `None` when the designation carries no digits.
pub fn parse_train_number(route_number: &str) -> Option<u32> {
    let digits: String = route_number.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// Pending ticket mutation decided for a reported delay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayUpdate {
    pub delay_minutes: i32,
    pub status: TicketStatus,
}

/// Decide what to persist for a reported delay. Recorded delays only ever
/// grow; a reported value at or below the recorded one changes nothing.
pub fn plan_delay_update(recorded: i32, reported: i32) -> Option<DelayUpdate> {
    if reported <= recorded {
        return None;
    }

    let status = if reported >= MIN_QUALIFYING_DELAY_MINUTES {
        TicketStatus::Delayed
    } else {
        TicketStatus::Active
    };

    Some(DelayUpdate {
        delay_minutes: reported,
        status,
    })
}

/// Delay monitor service for one deployment
pub struct DelayMonitorService {
    ticket_service: Arc<TicketService>,
    claim_service: Arc<ClaimService>,
    delay_provider: Arc<dyn DelayProvider>,
    notifier: Notifier,
}

impl DelayMonitorService {
    pub fn new(
        ticket_service: Arc<TicketService>,
        claim_service: Arc<ClaimService>,
        delay_provider: Arc<dyn DelayProvider>,
        notifier: Notifier,
    ) -> Self {
        Self {
            ticket_service,
            claim_service,
            delay_provider,
            notifier,
        }
    }

    /// Run one monitoring pass for a user. Any failure inside the pass is
    /// logged and reported as a zero delta; the next scheduled pass is
    /// unaffected.
    pub async fn monitor_user_tickets(&self, user_id: &Uuid) -> MonitorReport {
        match self.run_pass(user_id).await {
            Ok(report) => report,
            Err(e) => {
                tracing::error!(%user_id, "delay monitoring pass failed: {e:#}");
                MonitorReport::default()
            }
        }
    }

    async fn run_pass(&self, user_id: &Uuid) -> Result<MonitorReport> {
        let tickets = self.ticket_service.get_tickets_for_user(user_id).await?;
        let today = Utc::now().date_naive();
        let eligible: Vec<Ticket> = tickets
            .into_iter()
            .filter(|ticket| is_eligible(ticket, today))
            .collect();

        if eligible.is_empty() {
            return Ok(MonitorReport::default());
        }

        let mut report = MonitorReport::default();

        for ticket in eligible {
            let Some(train_number) = parse_train_number(&ticket.route_number) else {
                continue;
            };

            let reported = self
                .delay_provider
                .train_delay(train_number, ticket.departure_date)
                .await;

            let Some(update) = plan_delay_update(ticket.delay_minutes, reported) else {
                continue;
            };

            let updated = self
                .ticket_service
                .update_ticket(
                    &ticket.id,
                    UpdateTicketRequest {
                        status: Some(update.status),
                        delay_minutes: Some(update.delay_minutes),
                        ..Default::default()
                    },
                )
                .await?;

            let Some(updated) = updated else {
                continue;
            };

            report.updated_tickets += 1;
            self.notifier.publish(MonitorEvent::TicketDelayUpdated {
                ticket_id: updated.id,
                user_id: *user_id,
                delay_minutes: updated.delay_minutes,
            });

            if update.delay_minutes >= MIN_QUALIFYING_DELAY_MINUTES
                && self.auto_file_claim(user_id, &updated).await?
            {
                report.new_claims += 1;
            }
        }

        tracing::info!(
            %user_id,
            updated_tickets = report.updated_tickets,
            new_claims = report.new_claims,
            "delay monitoring pass complete"
        );

        Ok(report)
    }

    /// File a claim for a newly delayed ticket unless one already exists or
    /// no compensation is owed. Returns whether a claim was created.
    async fn auto_file_claim(&self, user_id: &Uuid, ticket: &Ticket) -> Result<bool> {
        if calculate_refund(ticket) <= 0 {
            return Ok(false);
        }

        // scan of the user's claim list; not atomic with the insert below
        let existing = self.claim_service.get_claims_for_user(user_id).await?;
        if existing.iter().any(|claim| claim.ticket_id == ticket.id) {
            return Ok(false);
        }

        let claim = self
            .claim_service
            .create_claim(&ticket.id, user_id)
            .await
            .map_err(anyhow::Error::from)?;

        tracing::info!(ticket_id = %ticket.id, claim_id = %claim.id, amount = claim.amount, "claim auto-filed");
        self.notifier.publish(MonitorEvent::ClaimCreated {
            claim_id: claim.id,
            ticket_id: ticket.id,
            user_id: *user_id,
            amount: claim.amount,
        });

        Ok(true)
    }
}

struct MonitorJob {
    stopped: Arc<AtomicBool>,
    wake: Arc<Notify>,
}

/// Interval scheduler for per-user monitoring loops
#[derive(Default)]
pub struct MonitorScheduler {
    jobs: Mutex<HashMap<Uuid, MonitorJob>>,
}

impl MonitorScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a monitoring loop for a user. Returns false when one is
    /// already running. The first pass fires after one full interval, not
    /// immediately.
    pub fn start(
        &self,
        monitor: Arc<DelayMonitorService>,
        user_id: Uuid,
        interval_minutes: u64,
    ) -> bool {
        let stopped = Arc::new(AtomicBool::new(false));
        let wake = Arc::new(Notify::new());

        {
            let mut jobs = self.jobs.lock().expect("monitor job table poisoned");
            if jobs.contains_key(&user_id) {
                return false;
            }
            jobs.insert(
                user_id,
                MonitorJob {
                    stopped: stopped.clone(),
                    wake: wake.clone(),
                },
            );
        }

        tracing::info!(%user_id, interval_minutes, "delay monitoring scheduled");

        tokio::spawn(async move {
            let mut ticker = interval(Duration::from_secs(interval_minutes.max(1) * 60));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // the first tick of a tokio interval fires immediately; consume
            // it so passes run on the interval boundary like a wall timer
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = wake.notified() => break,
                }
                if stopped.load(Ordering::SeqCst) {
                    break;
                }
                monitor.monitor_user_tickets(&user_id).await;
            }

            tracing::info!(%user_id, "delay monitoring loop exited");
        });

        true
    }

    /// Stop a user's monitoring loop. Only future firings are suppressed;
    /// a pass already executing completes on its own. Returns false when no
    /// loop was running.
    pub fn stop(&self, user_id: &Uuid) -> bool {
        let job = {
            let mut jobs = self.jobs.lock().expect("monitor job table poisoned");
            jobs.remove(user_id)
        };

        match job {
            Some(job) => {
                job.stopped.store(true, Ordering::SeqCst);
                job.wake.notify_one();
                tracing::info!(%user_id, "delay monitoring stop requested");
                true
            }
            None => false,
        }
    }

    /// Whether a monitoring loop is registered for the user
    pub fn is_running(&self, user_id: &Uuid) -> bool {
        self.jobs
            .lock()
            .expect("monitor job table poisoned")
            .contains_key(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TicketType;
    use chrono::{NaiveTime, Utc};

    fn ticket(
        carrier: Carrier,
        transport: TransportType,
        status: TicketStatus,
        delay: i32,
        departed_days_ago: i64,
    ) -> Ticket {
        let today = Utc::now().date_naive();
        Ticket {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            ticket_type: TicketType::Scanned,
            transport_type: transport,
            carrier,
            route_number: "R123".to_string(),
            departure_station: "Praha hl.n.".to_string(),
            arrival_station: "Brno hl.n.".to_string(),
            departure_date: today - ChronoDuration::days(departed_days_ago),
            departure_time: NaiveTime::from_hms_opt(14, 30, 0).unwrap(),
            arrival_date: today - ChronoDuration::days(departed_days_ago),
            arrival_time: NaiveTime::from_hms_opt(16, 45, 0).unwrap(),
            status,
            delay_minutes: delay,
            price: 580,
            image_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn recent_active_cd_train_tickets_are_eligible() {
        let today = Utc::now().date_naive();
        let t = ticket(Carrier::Cd, TransportType::Train, TicketStatus::Active, 10, 3);
        assert!(is_eligible(&t, today));
    }

    #[test]
    fn ineligible_tickets_are_never_polled() {
        let today = Utc::now().date_naive();

        let wrong_carrier = ticket(
            Carrier::Regiojet,
            TransportType::Train,
            TicketStatus::Active,
            0,
            3,
        );
        assert!(!is_eligible(&wrong_carrier, today));

        let bus = ticket(Carrier::Cd, TransportType::Bus, TicketStatus::Active, 0, 3);
        assert!(!is_eligible(&bus, today));

        let already_delayed = ticket(
            Carrier::Cd,
            TransportType::Train,
            TicketStatus::Delayed,
            75,
            3,
        );
        assert!(!is_eligible(&already_delayed, today));

        let confirmed_delay = ticket(
            Carrier::Cd,
            TransportType::Train,
            TicketStatus::Active,
            60,
            3,
        );
        assert!(!is_eligible(&confirmed_delay, today));

        let too_old = ticket(Carrier::Cd, TransportType::Train, TicketStatus::Active, 0, 15);
        assert!(!is_eligible(&too_old, today));
    }

    #[test]
    fn train_numbers_are_parsed_from_route_designations() {
        assert_eq!(parse_train_number("R123"), Some(123));
        assert_eq!(parse_train_number("EC176"), Some(176));
        assert_eq!(parse_train_number("553"), Some(553));
        assert_eq!(parse_train_number("Ex 571"), Some(571));
        assert_eq!(parse_train_number("IC"), None);
        assert_eq!(parse_train_number(""), None);
    }

    #[test]
    fn delay_updates_are_monotone() {
        // a reported delay at or below the recorded one changes nothing
        assert_eq!(plan_delay_update(65, 65), None);
        assert_eq!(plan_delay_update(70, 40), None);
        assert_eq!(plan_delay_update(0, 0), None);
    }

    #[test]
    fn crossing_the_floor_marks_the_ticket_delayed() {
        assert_eq!(
            plan_delay_update(10, 65),
            Some(DelayUpdate {
                delay_minutes: 65,
                status: TicketStatus::Delayed,
            })
        );
        assert_eq!(
            plan_delay_update(10, 30),
            Some(DelayUpdate {
                delay_minutes: 30,
                status: TicketStatus::Active,
            })
        );
        assert_eq!(
            plan_delay_update(59, 60),
            Some(DelayUpdate {
                delay_minutes: 60,
                status: TicketStatus::Delayed,
            })
        );
    }

    #[tokio::test]
    async fn stopping_an_unknown_user_is_a_no_op() {
        let scheduler = MonitorScheduler::new();
        assert!(!scheduler.stop(&Uuid::new_v4()));
    }
}
