//! Payment journal trait.

use crate::StoreError;
use fomo_types::PaymentRecord;
use uuid::Uuid;

/// Durable record of in-flight governance payments.
pub trait PaymentJournal {
    /// Insert or overwrite a payment record.
    fn put_payment(&self, record: &PaymentRecord) -> Result<(), StoreError>;

    fn get_payment(&self, id: &Uuid) -> Result<Option<PaymentRecord>, StoreError>;

    /// Payments that are neither recorded nor abandoned, oldest first.
    fn unsettled_payments(&self) -> Result<Vec<PaymentRecord>, StoreError>;
}
