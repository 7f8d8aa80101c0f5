//! # Bill State
//!
//! Holds the bill being assembled at the counter.
//!
//! ## Thread Safety
//! The bill is wrapped in `Arc<Mutex<T>>` so several commands can share it.
//! Only one of them modifies it at a time.
//!
//! ```text
//! Operator Action          Command                 Bill Change
//! ───────────────          ───────                 ───────────
//! Pick medicine ─────────► add_to_bill() ────────► add_line / merge
//! Remove row ────────────► remove_from_bill() ───► remove_line(i)
//! Type phone ────────────► set_customer_phone() ─► customer_phone
//! Abandon ───────────────► clear_bill() ─────────► clear()
//! Commit ────────────────► commit_bill() ────────► snapshot, then clear
//! ```
//!
//! Nothing here touches stock. Stock only changes when a bill is committed.

use std::sync::{Arc, Mutex};

use apothecary_core::Bill;
use chrono::Utc;

use crate::error::{ApiError, ApiResult};

/// Shared handle to the in-progress bill.
#[derive(Debug, Clone)]
pub struct BillState {
    bill: Arc<Mutex<Bill>>,
}

impl Default for BillState {
    fn default() -> Self {
        BillState::new()
    }
}

impl BillState {
    /// Creates a state holding an empty bill started now.
    pub fn new() -> Self {
        BillState {
            bill: Arc::new(Mutex::new(Bill::new(Utc::now()))),
        }
    }

    /// Runs `f` with read access to the bill.
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let totals = bill_state.with_bill(|bill| bill.totals())?;
    /// ```
    pub fn with_bill<F, R>(&self, f: F) -> ApiResult<R>
    where
        F: FnOnce(&Bill) -> R,
    {
        let bill = self
            .bill
            .lock()
            .map_err(|_| ApiError::internal("Bill state is unavailable"))?;
        Ok(f(&bill))
    }

    /// Runs `f` with write access to the bill.
    pub fn with_bill_mut<F, R>(&self, f: F) -> ApiResult<R>
    where
        F: FnOnce(&mut Bill) -> R,
    {
        let mut bill = self
            .bill
            .lock()
            .map_err(|_| ApiError::internal("Bill state is unavailable"))?;
        Ok(f(&mut bill))
    }

    /// A copy of the current bill.
    pub fn snapshot(&self) -> ApiResult<Bill> {
        self.with_bill(Bill::clone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_between_clones() {
        let state = BillState::new();
        let other = state.clone();

        state
            .with_bill_mut(|b| b.set_customer_phone("9876543210"))
            .unwrap();

        let phone = other.with_bill(|b| b.customer_phone.clone()).unwrap();
        assert_eq!(phone, "9876543210");
    }

    #[test]
    fn test_poisoned_lock_is_an_error() {
        let state = BillState::new();
        let poisoner = state.clone();

        let _ = std::thread::spawn(move || {
            poisoner
                .with_bill_mut(|_| panic!("operator closed the till"))
                .ok();
        })
        .join();

        let err = state.snapshot().unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::Internal);
    }
}
