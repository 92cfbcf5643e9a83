//! Domain models

pub mod employee;
pub mod vacation;

pub use employee::{Employee, UserRef};
pub use vacation::{
    Decision, MAX_TITLE_LEN, MAX_TOTAL_DAYS, RequestState, VacationDraft, VacationRequest,
};
