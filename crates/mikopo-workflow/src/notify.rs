//! Best-effort notification fan-out.
//!
//! Recipients are the loan's officer plus every agency admin and manager (and
//! the accountant pool for submissions). Each delivery is attempted
//! independently; all failures are logged and swallowed. The recipient lookup
//! is not atomic with the transition — a member added in between may be
//! missed, which is acceptable: the audit log, not this channel, is the
//! compliance record.

use std::time::Duration;

use mikopo_core::{
  actor::Role,
  loan::Loan,
  notification::{LoanEvent, NewNotification},
  store::{Directory, Notifier},
};
use tokio::time::timeout;

/// Bound on the recipient lookup so a slow directory never delays delivery
/// indefinitely. On timeout the fan-out degrades to the officer alone.
pub(crate) const RECIPIENT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

pub(crate) async fn dispatch_event<D, N>(
  directory: &D,
  notifier: &N,
  event: LoanEvent,
  loan: &Loan,
  lookup_timeout: Duration,
) where
  D: Directory,
  N: Notifier,
{
  let mut roles = vec![Role::Admin, Role::Manager];
  if event == LoanEvent::Submitted {
    roles.push(Role::Accountant);
  }

  let mut recipients = vec![loan.officer_id];
  match timeout(
    lookup_timeout,
    directory.members_with_roles(loan.agency_id, &roles),
  )
  .await
  {
    Ok(Ok(ids)) => recipients.extend(ids),
    Ok(Err(e)) => tracing::warn!(
      agency = %loan.agency_id,
      error = %e,
      "recipient lookup failed; notifying the officer only"
    ),
    Err(_) => tracing::warn!(
      agency = %loan.agency_id,
      "recipient lookup timed out; notifying the officer only"
    ),
  }
  recipients.sort_unstable();
  recipients.dedup();

  for recipient_id in recipients {
    let input = NewNotification {
      recipient_id,
      agency_id: loan.agency_id,
      loan_id: loan.loan_id,
      event,
      title: title_for(event),
      message: message_for(event, loan),
      link: Some(format!("/loans/{}", loan.loan_id)),
    };
    // One failed delivery never blocks the rest.
    if let Err(e) = notifier.send(input).await {
      tracing::warn!(
        recipient = %recipient_id,
        error = %e,
        "notification delivery failed"
      );
    }
  }
}

fn title_for(event: LoanEvent) -> String {
  match event {
    LoanEvent::Submitted => "Loan submitted for review",
    LoanEvent::Approved => "Loan approved",
    LoanEvent::Rejected => "Loan rejected",
    LoanEvent::Disbursed => "Loan disbursed",
  }
  .to_owned()
}

fn message_for(event: LoanEvent, loan: &Loan) -> String {
  let amount =
    format!("{}.{:02}", loan.amount_minor / 100, loan.amount_minor % 100);
  match event {
    LoanEvent::Submitted => {
      format!("Loan {} ({amount}) is awaiting review.", loan.loan_id)
    }
    LoanEvent::Approved => {
      format!("Loan {} ({amount}) was approved.", loan.loan_id)
    }
    LoanEvent::Rejected => {
      format!("Loan {} ({amount}) was rejected.", loan.loan_id)
    }
    LoanEvent::Disbursed => {
      format!("Loan {} ({amount}) was disbursed.", loan.loan_id)
    }
  }
}
