//! Workflow tests against in-memory spy mocks with fault injection.

use std::{
  collections::{HashMap, HashSet},
  sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
  },
  time::Duration,
};

use chrono::Utc;
use mikopo_core::{
  actor::{Actor, Role},
  agency::{Agency, Member, PlanType},
  audit::{AuditEntry, NewAuditEntry},
  loan::{Decision, Loan, LoanStatus, NewLoan, StatusWrite},
  notification::{LoanEvent, NewNotification, Notification},
  store::{
    Directory, LedgerMirror, LoanStore, Notifier, TransitionOutcome,
  },
};
use thiserror::Error;
use uuid::Uuid;

use crate::{Error, LoanWorkflow, notify};

#[derive(Debug, Error)]
#[error("injected failure")]
struct Injected;

// ─── Mock primary store ──────────────────────────────────────────────────────

#[derive(Default)]
struct MockStore {
  loans:             Mutex<HashMap<Uuid, Loan>>,
  loan_audit:        Mutex<Vec<AuditEntry>>,
  agency_audit:      Mutex<Vec<AuditEntry>>,
  fail_apply:        AtomicBool,
  force_conflict:    AtomicBool,
  fail_loan_audit:   AtomicBool,
  fail_agency_audit: AtomicBool,
}

impl MockStore {
  fn seed(&self, loan: Loan) {
    self.loans.lock().unwrap().insert(loan.loan_id, loan);
  }

  fn status_of(&self, loan_id: Uuid) -> LoanStatus {
    self.loans.lock().unwrap()[&loan_id].status
  }
}

impl LoanStore for MockStore {
  type Error = Injected;

  async fn add_agency(
    &self,
    name: String,
    plan: PlanType,
  ) -> Result<Agency, Injected> {
    Ok(Agency {
      agency_id: Uuid::new_v4(),
      name,
      plan,
      created_at: Utc::now(),
    })
  }

  async fn get_agency(&self, _: Uuid) -> Result<Option<Agency>, Injected> {
    Ok(None)
  }

  async fn add_member(
    &self,
    agency_id: Uuid,
    user_id: Uuid,
    role: Role,
  ) -> Result<Member, Injected> {
    Ok(Member { user_id, agency_id, role, created_at: Utc::now() })
  }

  async fn add_loan(&self, input: NewLoan) -> Result<Loan, Injected> {
    let loan = Loan {
      loan_id:      Uuid::new_v4(),
      agency_id:    input.agency_id,
      status:       LoanStatus::Draft,
      amount_minor: input.amount_minor,
      officer_id:   input.officer_id,
      created_by:   input.created_by,
      created_at:   Utc::now(),
      approval:     None,
      disbursed_at: None,
      disbursed_by: None,
      closed_at:    None,
      closed_by:    None,
    };
    self.seed(loan.clone());
    Ok(loan)
  }

  async fn get_loan(
    &self,
    agency_id: Uuid,
    loan_id: Uuid,
  ) -> Result<Option<Loan>, Injected> {
    Ok(
      self
        .loans
        .lock()
        .unwrap()
        .get(&loan_id)
        .filter(|l| l.agency_id == agency_id)
        .cloned(),
    )
  }

  async fn list_loans(
    &self,
    agency_id: Uuid,
    status: Option<LoanStatus>,
  ) -> Result<Vec<Loan>, Injected> {
    Ok(
      self
        .loans
        .lock()
        .unwrap()
        .values()
        .filter(|l| {
          l.agency_id == agency_id
            && status.is_none_or(|s| l.status == s)
        })
        .cloned()
        .collect(),
    )
  }

  async fn apply_transition(
    &self,
    agency_id: Uuid,
    loan_id: Uuid,
    write: StatusWrite,
  ) -> Result<TransitionOutcome, Injected> {
    if self.fail_apply.load(Ordering::Relaxed) {
      return Err(Injected);
    }
    let mut loans = self.loans.lock().unwrap();
    let Some(loan) =
      loans.get_mut(&loan_id).filter(|l| l.agency_id == agency_id)
    else {
      return Ok(TransitionOutcome::Missing);
    };
    if self.force_conflict.load(Ordering::Relaxed)
      || loan.status != write.expected
    {
      return Ok(TransitionOutcome::Conflict { actual: loan.status });
    }
    loan.status = write.target;
    if let Some(approval) = write.approval {
      loan.approval = Some(approval);
    }
    match write.target {
      LoanStatus::Disbursed => {
        loan.disbursed_at = Some(write.at);
        loan.disbursed_by = Some(write.performed_by);
      }
      LoanStatus::Closed => {
        loan.closed_at = Some(write.at);
        loan.closed_by = Some(write.performed_by);
      }
      _ => {}
    }
    Ok(TransitionOutcome::Applied(loan.clone()))
  }

  async fn append_loan_audit(
    &self,
    entry: NewAuditEntry,
  ) -> Result<AuditEntry, Injected> {
    if self.fail_loan_audit.load(Ordering::Relaxed) {
      return Err(Injected);
    }
    let entry = AuditEntry {
      entry_id:          Uuid::new_v4(),
      loan_id:           entry.loan_id,
      agency_id:         entry.agency_id,
      action:            entry.action,
      previous_status:   entry.previous_status,
      new_status:        entry.new_status,
      performed_by:      entry.performed_by,
      performed_by_role: entry.performed_by_role,
      at:                Utc::now(),
      notes:             entry.notes,
      approval:          entry.approval,
    };
    self.loan_audit.lock().unwrap().push(entry.clone());
    Ok(entry)
  }

  async fn append_agency_audit(
    &self,
    entry: &AuditEntry,
  ) -> Result<(), Injected> {
    if self.fail_agency_audit.load(Ordering::Relaxed) {
      return Err(Injected);
    }
    self.agency_audit.lock().unwrap().push(entry.clone());
    Ok(())
  }

  async fn list_loan_audit(
    &self,
    _agency_id: Uuid,
    loan_id: Uuid,
  ) -> Result<Vec<AuditEntry>, Injected> {
    Ok(
      self
        .loan_audit
        .lock()
        .unwrap()
        .iter()
        .filter(|e| e.loan_id == loan_id)
        .cloned()
        .collect(),
    )
  }

  async fn list_agency_audit(
    &self,
    agency_id: Uuid,
  ) -> Result<Vec<AuditEntry>, Injected> {
    Ok(
      self
        .agency_audit
        .lock()
        .unwrap()
        .iter()
        .filter(|e| e.agency_id == agency_id)
        .cloned()
        .collect(),
    )
  }
}

// ─── Mock ledger mirror ──────────────────────────────────────────────────────

#[derive(Default)]
struct MockLedger {
  writes: Mutex<Vec<(Uuid, LoanStatus)>>,
  fail:   AtomicBool,
}

impl LedgerMirror for MockLedger {
  type Error = Injected;

  async fn mirror_transition(
    &self,
    _agency_id: Uuid,
    loan_id: Uuid,
    write: &StatusWrite,
  ) -> Result<(), Injected> {
    if self.fail.load(Ordering::Relaxed) {
      return Err(Injected);
    }
    self.writes.lock().unwrap().push((loan_id, write.target));
    Ok(())
  }
}

// ─── Mock directory & notifier ───────────────────────────────────────────────

#[derive(Default)]
struct MockDirectory {
  members: Mutex<Vec<(Uuid, Role)>>,
  delay:   Mutex<Option<Duration>>,
  fail:    AtomicBool,
}

impl Directory for MockDirectory {
  type Error = Injected;

  async fn members_with_roles(
    &self,
    _agency_id: Uuid,
    roles: &[Role],
  ) -> Result<Vec<Uuid>, Injected> {
    let delay = *self.delay.lock().unwrap();
    if let Some(d) = delay {
      tokio::time::sleep(d).await;
    }
    if self.fail.load(Ordering::Relaxed) {
      return Err(Injected);
    }
    Ok(
      self
        .members
        .lock()
        .unwrap()
        .iter()
        .filter(|(_, role)| roles.contains(role))
        .map(|(id, _)| *id)
        .collect(),
    )
  }
}

#[derive(Default)]
struct MockNotifier {
  sent:     Mutex<Vec<NewNotification>>,
  fail_all: AtomicBool,
  fail_for: Mutex<HashSet<Uuid>>,
}

impl Notifier for MockNotifier {
  type Error = Injected;

  async fn send(
    &self,
    input: NewNotification,
  ) -> Result<Notification, Injected> {
    if self.fail_all.load(Ordering::Relaxed)
      || self.fail_for.lock().unwrap().contains(&input.recipient_id)
    {
      return Err(Injected);
    }
    let sent = Notification {
      notification_id: Uuid::new_v4(),
      recipient_id:    input.recipient_id,
      agency_id:       input.agency_id,
      loan_id:         input.loan_id,
      event:           input.event,
      title:           input.title.clone(),
      message:         input.message.clone(),
      link:            input.link.clone(),
      sent_at:         Utc::now(),
    };
    self.sent.lock().unwrap().push(input);
    Ok(sent)
  }

  async fn list_for_user(
    &self,
    user_id: Uuid,
  ) -> Result<Vec<Notification>, Injected> {
    let _ = user_id;
    Ok(Vec::new())
  }
}

// ─── Fixture ─────────────────────────────────────────────────────────────────

struct Fixture {
  store:     Arc<MockStore>,
  ledger:    Arc<MockLedger>,
  directory: Arc<MockDirectory>,
  notifier:  Arc<MockNotifier>,
  workflow:
    LoanWorkflow<MockStore, MockLedger, MockDirectory, MockNotifier>,
}

fn fixture() -> Fixture {
  let store = Arc::new(MockStore::default());
  let ledger = Arc::new(MockLedger::default());
  let directory = Arc::new(MockDirectory::default());
  let notifier = Arc::new(MockNotifier::default());
  let workflow = LoanWorkflow::new(
    Arc::clone(&store),
    Arc::clone(&ledger),
    Arc::clone(&directory),
    Arc::clone(&notifier),
  );
  Fixture { store, ledger, directory, notifier, workflow }
}

fn loan_in(agency_id: Uuid, officer_id: Uuid, status: LoanStatus) -> Loan {
  Loan {
    loan_id: Uuid::new_v4(),
    agency_id,
    status,
    amount_minor: 250_000,
    officer_id,
    created_by: officer_id,
    created_at: Utc::now(),
    approval: None,
    disbursed_at: None,
    disbursed_by: None,
    closed_at: None,
    closed_by: None,
  }
}

fn actor(role: Role) -> Actor {
  Actor { user_id: Uuid::new_v4(), role }
}

// ─── Submit ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn owner_officer_submits_draft_loan() {
  let f = fixture();
  let agency = Uuid::new_v4();
  let officer = actor(Role::LoanOfficer);
  let loan = loan_in(agency, officer.user_id, LoanStatus::Draft);
  f.store.seed(loan.clone());

  let receipt = f
    .workflow
    .submit_for_review(agency, loan.loan_id, &officer)
    .await
    .unwrap();

  assert_eq!(receipt.previous, LoanStatus::Draft);
  assert_eq!(receipt.loan.status, LoanStatus::Pending);

  let audit = f.store.loan_audit.lock().unwrap();
  assert_eq!(audit.len(), 1);
  assert_eq!(audit[0].previous_status, Some(LoanStatus::Draft));
  assert_eq!(audit[0].new_status, LoanStatus::Pending);
  assert_eq!(audit[0].performed_by, officer.user_id);
  assert_eq!(audit[0].performed_by_role, Role::LoanOfficer);
}

#[tokio::test]
async fn non_owner_officer_cannot_submit() {
  let f = fixture();
  let agency = Uuid::new_v4();
  let loan = loan_in(agency, Uuid::new_v4(), LoanStatus::Draft);
  f.store.seed(loan.clone());

  let other = actor(Role::LoanOfficer);
  let err = f
    .workflow
    .submit_for_review(agency, loan.loan_id, &other)
    .await
    .unwrap_err();

  assert!(matches!(err, Error::Denied { .. }));
  assert_eq!(f.store.status_of(loan.loan_id), LoanStatus::Draft);
  assert!(f.store.loan_audit.lock().unwrap().is_empty());
}

#[tokio::test]
async fn missing_loan_is_reported_without_side_effects() {
  let f = fixture();
  let err = f
    .workflow
    .submit_for_review(Uuid::new_v4(), Uuid::new_v4(), &actor(Role::Admin))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::LoanNotFound(_)));
  assert!(f.ledger.writes.lock().unwrap().is_empty());
}

#[tokio::test]
async fn loans_are_invisible_across_tenants() {
  let f = fixture();
  let loan = loan_in(Uuid::new_v4(), Uuid::new_v4(), LoanStatus::Draft);
  f.store.seed(loan.clone());

  let err = f
    .workflow
    .submit_for_review(Uuid::new_v4(), loan.loan_id, &actor(Role::Admin))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::LoanNotFound(_)));
}

// ─── Denial has zero side effects ────────────────────────────────────────────

#[tokio::test]
async fn denied_approval_leaves_no_trace() {
  let f = fixture();
  let agency = Uuid::new_v4();
  let loan = loan_in(agency, Uuid::new_v4(), LoanStatus::Pending);
  f.store.seed(loan.clone());

  let customer = actor(Role::Customer);
  let err = f
    .workflow
    .approve(agency, loan.loan_id, &customer, None)
    .await
    .unwrap_err();

  match err {
    Error::Denied { reason } => assert!(reason.contains("customer")),
    other => panic!("expected Denied, got {other:?}"),
  }
  assert_eq!(f.store.status_of(loan.loan_id), LoanStatus::Pending);
  assert!(f.ledger.writes.lock().unwrap().is_empty());
  assert!(f.store.loan_audit.lock().unwrap().is_empty());
  assert!(f.store.agency_audit.lock().unwrap().is_empty());
  assert!(f.notifier.sent.lock().unwrap().is_empty());
}

// ─── Composite approve / reject ──────────────────────────────────────────────

#[tokio::test]
async fn approve_from_pending_audits_both_edges() {
  let f = fixture();
  let agency = Uuid::new_v4();
  let loan = loan_in(agency, Uuid::new_v4(), LoanStatus::Pending);
  f.store.seed(loan.clone());

  let reviewer = actor(Role::Underwriter);
  let receipt = f
    .workflow
    .approve(agency, loan.loan_id, &reviewer, Some("fine".into()))
    .await
    .unwrap();

  assert_eq!(receipt.loan.status, LoanStatus::Approved);
  assert_eq!(receipt.previous, LoanStatus::UnderReview);

  let audit = f.store.loan_audit.lock().unwrap();
  assert_eq!(audit.len(), 2);
  assert_eq!(audit[0].previous_status, Some(LoanStatus::Pending));
  assert_eq!(audit[0].new_status, LoanStatus::UnderReview);
  assert!(audit[0].approval.is_none());
  assert_eq!(audit[1].previous_status, Some(LoanStatus::UnderReview));
  assert_eq!(audit[1].new_status, LoanStatus::Approved);
  assert!(audit[0].at <= audit[1].at);

  let approval = audit[1].approval.as_ref().unwrap();
  assert_eq!(approval.decision, Decision::Approved);
  assert_eq!(approval.reviewed_by, reviewer.user_id);
  assert_eq!(approval.previous_status, LoanStatus::UnderReview);
  assert_eq!(approval.new_status, LoanStatus::Approved);
  assert_eq!(approval.notes.as_deref(), Some("fine"));

  // The loan carries the decision record too.
  let stored = f.store.loans.lock().unwrap()[&loan.loan_id].clone();
  assert_eq!(stored.approval.unwrap().decision, Decision::Approved);
}

#[tokio::test]
async fn approve_from_under_review_audits_one_edge() {
  let f = fixture();
  let agency = Uuid::new_v4();
  let loan = loan_in(agency, Uuid::new_v4(), LoanStatus::UnderReview);
  f.store.seed(loan.clone());

  f.workflow
    .approve(agency, loan.loan_id, &actor(Role::Manager), None)
    .await
    .unwrap();

  assert_eq!(f.store.loan_audit.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn reject_from_pending_terminates_the_loan() {
  let f = fixture();
  let agency = Uuid::new_v4();
  let loan = loan_in(agency, Uuid::new_v4(), LoanStatus::Pending);
  f.store.seed(loan.clone());

  let receipt = f
    .workflow
    .reject(agency, loan.loan_id, &actor(Role::Admin), Some("kyc".into()))
    .await
    .unwrap();

  assert_eq!(receipt.loan.status, LoanStatus::Rejected);
  let audit = f.store.loan_audit.lock().unwrap();
  assert_eq!(audit.len(), 2);
  assert_eq!(audit[1].approval.as_ref().unwrap().decision, Decision::Rejected);
}

#[tokio::test]
async fn approve_is_denied_outside_review_states() {
  let f = fixture();
  let agency = Uuid::new_v4();
  let loan = loan_in(agency, Uuid::new_v4(), LoanStatus::Approved);
  f.store.seed(loan.clone());

  let err = f
    .workflow
    .approve(agency, loan.loan_id, &actor(Role::Admin), None)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Denied { .. }));
}

// ─── Disburse ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn disburse_activates_in_the_same_call() {
  let f = fixture();
  let agency = Uuid::new_v4();
  let loan = loan_in(agency, Uuid::new_v4(), LoanStatus::Approved);
  f.store.seed(loan.clone());

  let accountant = actor(Role::Accountant);
  let receipt = f
    .workflow
    .disburse(agency, loan.loan_id, &accountant, None)
    .await
    .unwrap();

  // The caller sees the first step; the store has settled on Active.
  assert_eq!(receipt.previous, LoanStatus::Approved);
  assert_eq!(receipt.loan.status, LoanStatus::Disbursed);
  assert_eq!(f.store.status_of(loan.loan_id), LoanStatus::Active);

  let stored = f.store.loans.lock().unwrap()[&loan.loan_id].clone();
  assert!(stored.disbursed_at.is_some());
  assert_eq!(stored.disbursed_by, Some(accountant.user_id));

  let audit = f.store.loan_audit.lock().unwrap();
  assert_eq!(audit.len(), 2);
  assert_eq!(audit[0].new_status, LoanStatus::Disbursed);
  assert_eq!(audit[1].new_status, LoanStatus::Active);
  assert!(audit[0].at <= audit[1].at);
}

#[tokio::test]
async fn disburse_honours_a_supplied_date() {
  let f = fixture();
  let agency = Uuid::new_v4();
  let loan = loan_in(agency, Uuid::new_v4(), LoanStatus::Approved);
  f.store.seed(loan.clone());

  let when = Utc::now() - chrono::TimeDelta::days(3);
  f.workflow
    .disburse(agency, loan.loan_id, &actor(Role::Admin), Some(when))
    .await
    .unwrap();

  let stored = f.store.loans.lock().unwrap()[&loan.loan_id].clone();
  assert_eq!(stored.disbursed_at, Some(when));
}

#[tokio::test]
async fn manager_cannot_disburse() {
  let f = fixture();
  let agency = Uuid::new_v4();
  let loan = loan_in(agency, Uuid::new_v4(), LoanStatus::Approved);
  f.store.seed(loan.clone());

  let err = f
    .workflow
    .disburse(agency, loan.loan_id, &actor(Role::Manager), None)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Denied { .. }));
  assert_eq!(f.store.status_of(loan.loan_id), LoanStatus::Approved);
}

// ─── Close ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn close_from_active_records_closure() {
  let f = fixture();
  let agency = Uuid::new_v4();
  let loan = loan_in(agency, Uuid::new_v4(), LoanStatus::Active);
  f.store.seed(loan.clone());

  let admin = actor(Role::Admin);
  let receipt = f
    .workflow
    .close(agency, loan.loan_id, &admin, Some("repaid in full".into()))
    .await
    .unwrap();

  assert_eq!(receipt.loan.status, LoanStatus::Closed);
  let stored = f.store.loans.lock().unwrap()[&loan.loan_id].clone();
  assert!(stored.closed_at.is_some());
  assert_eq!(stored.closed_by, Some(admin.user_id));
}

// ─── Dual-store failure semantics ────────────────────────────────────────────

#[tokio::test]
async fn mirror_failure_does_not_fail_the_call() {
  let f = fixture();
  let agency = Uuid::new_v4();
  let officer = actor(Role::LoanOfficer);
  let loan = loan_in(agency, officer.user_id, LoanStatus::Draft);
  f.store.seed(loan.clone());
  f.ledger.fail.store(true, Ordering::Relaxed);

  let receipt = f
    .workflow
    .submit_for_review(agency, loan.loan_id, &officer)
    .await
    .unwrap();

  assert_eq!(receipt.loan.status, LoanStatus::Pending);
  assert_eq!(f.store.loan_audit.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn mirror_is_written_for_each_edge() {
  let f = fixture();
  let agency = Uuid::new_v4();
  let loan = loan_in(agency, Uuid::new_v4(), LoanStatus::Pending);
  f.store.seed(loan.clone());

  f.workflow
    .approve(agency, loan.loan_id, &actor(Role::Admin), None)
    .await
    .unwrap();

  let writes = f.ledger.writes.lock().unwrap();
  assert_eq!(
    *writes,
    vec![
      (loan.loan_id, LoanStatus::UnderReview),
      (loan.loan_id, LoanStatus::Approved),
    ]
  );
}

#[tokio::test]
async fn primary_failure_fails_the_call_and_writes_no_audit() {
  let f = fixture();
  let agency = Uuid::new_v4();
  let officer = actor(Role::LoanOfficer);
  let loan = loan_in(agency, officer.user_id, LoanStatus::Draft);
  f.store.seed(loan.clone());
  f.store.fail_apply.store(true, Ordering::Relaxed);

  let err = f
    .workflow
    .submit_for_review(agency, loan.loan_id, &officer)
    .await
    .unwrap_err();

  assert!(matches!(err, Error::Store(_)));
  assert!(f.store.loan_audit.lock().unwrap().is_empty());
  assert!(f.notifier.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn loan_audit_failure_is_surfaced() {
  let f = fixture();
  let agency = Uuid::new_v4();
  let officer = actor(Role::LoanOfficer);
  let loan = loan_in(agency, officer.user_id, LoanStatus::Draft);
  f.store.seed(loan.clone());
  f.store.fail_loan_audit.store(true, Ordering::Relaxed);

  let err = f
    .workflow
    .submit_for_review(agency, loan.loan_id, &officer)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Store(_)));
}

#[tokio::test]
async fn agency_audit_failure_is_swallowed() {
  let f = fixture();
  let agency = Uuid::new_v4();
  let officer = actor(Role::LoanOfficer);
  let loan = loan_in(agency, officer.user_id, LoanStatus::Draft);
  f.store.seed(loan.clone());
  f.store.fail_agency_audit.store(true, Ordering::Relaxed);

  let receipt = f
    .workflow
    .submit_for_review(agency, loan.loan_id, &officer)
    .await
    .unwrap();

  assert_eq!(receipt.loan.status, LoanStatus::Pending);
  assert_eq!(f.store.loan_audit.lock().unwrap().len(), 1);
  assert!(f.store.agency_audit.lock().unwrap().is_empty());
}

// ─── Optimistic concurrency ──────────────────────────────────────────────────

#[tokio::test]
async fn stale_status_surfaces_as_conflict() {
  let f = fixture();
  let agency = Uuid::new_v4();
  let officer = actor(Role::LoanOfficer);
  let loan = loan_in(agency, officer.user_id, LoanStatus::Draft);
  f.store.seed(loan.clone());

  // Another caller wins the race between our load and our write.
  f.store.force_conflict.store(true, Ordering::Relaxed);

  let err = f
    .workflow
    .submit_for_review(agency, loan.loan_id, &officer)
    .await
    .unwrap_err();

  match err {
    Error::Conflict { loan_id, expected, .. } => {
      assert_eq!(loan_id, loan.loan_id);
      assert_eq!(expected, LoanStatus::Draft);
    }
    other => panic!("expected Conflict, got {other:?}"),
  }
  assert!(f.store.loan_audit.lock().unwrap().is_empty());
}

// ─── Notification dispatch ───────────────────────────────────────────────────

#[tokio::test]
async fn submitted_fan_out_reaches_officer_admins_and_accountants() {
  let f = fixture();
  let agency = Uuid::new_v4();
  let officer_id = Uuid::new_v4();
  let admin_id = Uuid::new_v4();
  let accountant_id = Uuid::new_v4();
  let customer_id = Uuid::new_v4();
  f.directory.members.lock().unwrap().extend([
    (admin_id, Role::Admin),
    (accountant_id, Role::Accountant),
    (customer_id, Role::Customer),
  ]);

  let loan = loan_in(agency, officer_id, LoanStatus::Pending);
  notify::dispatch_event(
    f.directory.as_ref(),
    f.notifier.as_ref(),
    LoanEvent::Submitted,
    &loan,
    Duration::from_secs(1),
  )
  .await;

  let sent = f.notifier.sent.lock().unwrap();
  let mut recipients: Vec<Uuid> =
    sent.iter().map(|n| n.recipient_id).collect();
  recipients.sort_unstable();
  let mut expected = vec![officer_id, admin_id, accountant_id];
  expected.sort_unstable();
  assert_eq!(recipients, expected);
  assert!(sent.iter().all(|n| n.event == LoanEvent::Submitted));
  assert!(sent.iter().all(|n| n.loan_id == loan.loan_id));
}

#[tokio::test]
async fn approved_fan_out_excludes_accountants() {
  let f = fixture();
  let agency = Uuid::new_v4();
  let officer_id = Uuid::new_v4();
  let manager_id = Uuid::new_v4();
  let accountant_id = Uuid::new_v4();
  f.directory.members.lock().unwrap().extend([
    (manager_id, Role::Manager),
    (accountant_id, Role::Accountant),
  ]);

  let loan = loan_in(agency, officer_id, LoanStatus::Approved);
  notify::dispatch_event(
    f.directory.as_ref(),
    f.notifier.as_ref(),
    LoanEvent::Approved,
    &loan,
    Duration::from_secs(1),
  )
  .await;

  let sent = f.notifier.sent.lock().unwrap();
  let recipients: Vec<Uuid> = sent.iter().map(|n| n.recipient_id).collect();
  assert!(recipients.contains(&officer_id));
  assert!(recipients.contains(&manager_id));
  assert!(!recipients.contains(&accountant_id));
}

#[tokio::test]
async fn fan_out_dedupes_an_officer_who_is_also_a_manager() {
  let f = fixture();
  let agency = Uuid::new_v4();
  let officer_id = Uuid::new_v4();
  f.directory.members.lock().unwrap().push((officer_id, Role::Manager));

  let loan = loan_in(agency, officer_id, LoanStatus::Approved);
  notify::dispatch_event(
    f.directory.as_ref(),
    f.notifier.as_ref(),
    LoanEvent::Approved,
    &loan,
    Duration::from_secs(1),
  )
  .await;

  assert_eq!(f.notifier.sent.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn slow_directory_degrades_to_officer_only() {
  let f = fixture();
  let agency = Uuid::new_v4();
  let officer_id = Uuid::new_v4();
  f.directory.members.lock().unwrap().push((Uuid::new_v4(), Role::Admin));
  *f.directory.delay.lock().unwrap() = Some(Duration::from_millis(200));

  let loan = loan_in(agency, officer_id, LoanStatus::Approved);
  notify::dispatch_event(
    f.directory.as_ref(),
    f.notifier.as_ref(),
    LoanEvent::Approved,
    &loan,
    Duration::from_millis(10),
  )
  .await;

  let sent = f.notifier.sent.lock().unwrap();
  assert_eq!(sent.len(), 1);
  assert_eq!(sent[0].recipient_id, officer_id);
}

#[tokio::test]
async fn directory_failure_degrades_to_officer_only() {
  let f = fixture();
  let agency = Uuid::new_v4();
  let officer_id = Uuid::new_v4();
  f.directory.members.lock().unwrap().push((Uuid::new_v4(), Role::Admin));
  f.directory.fail.store(true, Ordering::Relaxed);

  let loan = loan_in(agency, officer_id, LoanStatus::Approved);
  notify::dispatch_event(
    f.directory.as_ref(),
    f.notifier.as_ref(),
    LoanEvent::Approved,
    &loan,
    Duration::from_secs(1),
  )
  .await;

  let sent = f.notifier.sent.lock().unwrap();
  assert_eq!(sent.len(), 1);
  assert_eq!(sent[0].recipient_id, officer_id);
}

#[tokio::test]
async fn one_failed_delivery_does_not_block_the_rest() {
  let f = fixture();
  let agency = Uuid::new_v4();
  let officer_id = Uuid::new_v4();
  let admin_id = Uuid::new_v4();
  let manager_id = Uuid::new_v4();
  f.directory.members.lock().unwrap().extend([
    (admin_id, Role::Admin),
    (manager_id, Role::Manager),
  ]);
  f.notifier.fail_for.lock().unwrap().insert(admin_id);

  let loan = loan_in(agency, officer_id, LoanStatus::Approved);
  notify::dispatch_event(
    f.directory.as_ref(),
    f.notifier.as_ref(),
    LoanEvent::Approved,
    &loan,
    Duration::from_secs(1),
  )
  .await;

  let sent = f.notifier.sent.lock().unwrap();
  let mut recipients: Vec<Uuid> =
    sent.iter().map(|n| n.recipient_id).collect();
  recipients.sort_unstable();
  let mut expected = vec![officer_id, manager_id];
  expected.sort_unstable();
  assert_eq!(recipients, expected);
}

#[tokio::test]
async fn delivery_failure_never_changes_the_transition_outcome() {
  let f = fixture();
  let agency = Uuid::new_v4();
  let officer = actor(Role::LoanOfficer);
  let loan = loan_in(agency, officer.user_id, LoanStatus::Draft);
  f.store.seed(loan.clone());
  f.notifier.fail_all.store(true, Ordering::Relaxed);

  let receipt = f
    .workflow
    .submit_for_review(agency, loan.loan_id, &officer)
    .await
    .unwrap();

  assert_eq!(receipt.loan.status, LoanStatus::Pending);
  assert_eq!(f.store.loan_audit.lock().unwrap().len(), 1);
}
