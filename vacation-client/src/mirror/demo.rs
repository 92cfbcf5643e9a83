//! Built-in demo data set

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use shared::models::{Decision, Employee, RequestState, VacationRequest};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0)
        .single()
        .unwrap_or_default()
}

fn employee(id: u64, name: &str, email: &str) -> Employee {
    Employee::new(id, name, email)
}

struct Seed {
    id: u64,
    title: &'static str,
    requester: Employee,
    start: NaiveDate,
    end: NaiveDate,
    total_days: u32,
    reason: &'static str,
    state: RequestState,
    created: DateTime<Utc>,
    decision: Option<(Employee, DateTime<Utc>, &'static str)>,
}

impl Seed {
    fn build(self) -> VacationRequest {
        let author = self.requester.as_user_ref();
        let (decision, modified, editor) = match self.decision {
            Some((approver, decided_at, notes)) => {
                let editor = approver.as_user_ref();
                let decision = Decision {
                    approver,
                    decided_at,
                    notes: Some(notes.to_string()),
                };
                (Some(decision), decided_at, editor)
            }
            None => (None, self.created, author.clone()),
        };

        VacationRequest {
            id: self.id,
            title: self.title.to_string(),
            requester: self.requester,
            start_date: self.start,
            end_date: self.end,
            total_days: self.total_days,
            reason: Some(self.reason.to_string()),
            state: self.state,
            requested_at: self.created,
            decision,
            created_at: self.created,
            modified_at: modified,
            created_by: author,
            last_modified_by: editor,
        }
    }
}

/// Five requests in mixed states (2 pending, 2 approved, 1 rejected)
pub fn demo_requests() -> Vec<VacationRequest> {
    let manager = employee(201, "Carlos Manager", "carlos.manager@example.com");
    let supervisor = employee(202, "Ana Supervisor", "ana.supervisor@example.com");

    let seeds = vec![
        Seed {
            id: 1,
            title: "Summer holiday - Joao Silva",
            requester: employee(101, "Joao Silva", "joao.silva@example.com"),
            start: date(2024, 1, 15),
            end: date(2024, 1, 29),
            total_days: 15,
            reason: "Summer holiday with the family",
            state: RequestState::Pending,
            created: at(2023, 12, 10, 9, 30),
            decision: None,
        },
        Seed {
            id: 2,
            title: "Year-end break - Maria Santos",
            requester: employee(102, "Maria Santos", "maria.santos@example.com"),
            start: date(2023, 12, 20),
            end: date(2024, 1, 5),
            total_days: 10,
            reason: "Year-end break",
            state: RequestState::Approved,
            created: at(2023, 11, 15, 14, 20),
            decision: Some((manager.clone(), at(2023, 11, 18, 10, 15), "Approved. Enjoy!")),
        },
        Seed {
            id: 3,
            title: "School holidays - Pedro Costa",
            requester: employee(103, "Pedro Costa", "pedro.costa@example.com"),
            start: date(2024, 7, 1),
            end: date(2024, 7, 15),
            total_days: 15,
            reason: "Looking after the kids during school holidays",
            state: RequestState::Rejected,
            created: at(2024, 5, 20, 11, 45),
            decision: Some((
                supervisor,
                at(2024, 5, 25, 16, 30),
                "Clashes with a priority project. Please reschedule for August.",
            )),
        },
        Seed {
            id: 4,
            title: "Early leave - Ana Lima",
            requester: employee(104, "Ana Lima", "ana.lima@example.com"),
            start: date(2024, 3, 10),
            end: date(2024, 3, 20),
            total_days: 8,
            reason: "Family wedding",
            state: RequestState::Approved,
            created: at(2024, 2, 1, 13, 15),
            decision: Some((manager, at(2024, 2, 3, 9, 45), "Approved for an important family event.")),
        },
        Seed {
            id: 5,
            title: "Carnival - Roberto Oliveira",
            requester: employee(105, "Roberto Oliveira", "roberto.oliveira@example.com"),
            start: date(2024, 2, 12),
            end: date(2024, 2, 16),
            total_days: 5,
            reason: "Carnival week",
            state: RequestState::Pending,
            created: at(2024, 1, 20, 10, 30),
            decision: None,
        },
    ];

    seeds.into_iter().map(Seed::build).collect()
}
