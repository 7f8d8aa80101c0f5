//! # Till Commands
//!
//! The operations the till exposes. Each takes the state it needs and
//! returns `ApiResult<T>`; the CLI in `main.rs` is one caller.
//!
//! | Module | Commands |
//! |---|---|
//! | [`catalog`] | list, search, add, update, delete, import, alerts |
//! | [`bill`] | add / remove lines, customer phone, view, clear |
//! | [`sale`] | record, apply stock, commit, invoice |
//! | [`history`] | history, daily report, orphan sweep |

pub mod bill;
pub mod catalog;
pub mod history;
pub mod sale;
