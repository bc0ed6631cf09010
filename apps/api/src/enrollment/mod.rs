//! Course enrollment against a proof of payment.
//!
//! Re-purchasing a course the user already has is allowed: the transaction
//! is appended again while the enrollment set stays deduplicated. The store
//! performs both writes as one unit.

pub mod handlers;

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::models::payment::Payment;
use crate::models::user::PublicUser;
use crate::store::{Store, StoreError};

#[derive(Debug, Error)]
pub enum EnrollmentError {
    #[error("unknown user")]
    UnknownUser,

    #[error("unknown course")]
    UnknownCourse,

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Serialize)]
pub struct EnrollmentReceipt {
    pub transaction: Payment,
    pub user: PublicUser,
}

pub struct EnrollmentRecorder {
    store: Arc<dyn Store>,
}

impl EnrollmentRecorder {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn enroll(
        &self,
        user_id: &str,
        course_id: &str,
        amount: f64,
        payment_id: &str,
    ) -> Result<EnrollmentReceipt, EnrollmentError> {
        if self.store.find_by_id(user_id).await?.is_none() {
            return Err(EnrollmentError::UnknownUser);
        }
        if self.store.course_by_id(course_id).await?.is_none() {
            return Err(EnrollmentError::UnknownCourse);
        }

        let payment = Payment {
            transaction_id: payment_id.to_string(),
            user_id: user_id.to_string(),
            course_id: course_id.to_string(),
            amount,
            timestamp: Utc::now(),
        };

        // The user may have been removed between the lookup and the write.
        let user = self
            .store
            .record_enrollment(&payment)
            .await?
            .ok_or(EnrollmentError::UnknownUser)?;

        info!(%user_id, %course_id, transaction_id = %payment_id, "enrollment recorded");
        Ok(EnrollmentReceipt {
            transaction: payment,
            user: user.to_public(),
        })
    }
}
