use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway not configured: {0}")]
    NotConfigured(String),
    #[error("gateway request failed: {0}")]
    Http(String),
    #[error("gateway returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("unexpected gateway response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            GatewayError::Decode(e.to_string())
        } else {
            GatewayError::Http(e.to_string())
        }
    }
}

/// What the payer is asked to pay.
#[derive(Debug, Clone, Serialize)]
pub struct BillRequest {
    pub payer_email: String,
    pub payer_msisdn: String,
    pub payer_name: String,
    /// Minor units.
    pub amount: i64,
    pub short_description: String,
    /// Our payment id; echoed back as `reference` in the callback.
    pub external_reference: String,
    /// Minutes before the bill lapses.
    pub expiry_period: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bill {
    pub bill_id: String,
}

/// A bill as the provider currently records it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillStatus {
    pub bill_id: String,
    /// `ready`, `processed`, `paid`, `expired`...
    pub state: String,
}

impl BillStatus {
    pub fn is_paid(&self) -> bool {
        matches!(self.state.as_str(), "paid" | "processed")
    }
}

/// A hosted-billing provider.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_bill(&self, req: &BillRequest) -> Result<Bill, GatewayError>;

    /// Prompt the payer's phone to approve the bill.
    async fn push_ussd(&self, bill_id: &str, payment_system: &str, msisdn: &str) -> Result<(), GatewayError>;

    /// Look the bill up on the provider; callbacks are only trusted once this says paid.
    async fn fetch_bill(&self, bill_id: &str) -> Result<BillStatus, GatewayError>;

    /// Hosted page where the payer can settle the bill.
    fn portal_url(&self, bill_id: &str) -> Result<String, GatewayError>;
}

/// In-memory gateway for tests and local runs without merchant credentials.
///
/// Bills stay `ready` until [`MockGateway::settle`] is called, so nothing
/// paid through a real provider can be confirmed here.
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MockGateway {
        next: AtomicUsize,
        fail: AtomicBool,
        pub bills: Mutex<Vec<BillRequest>>,
        pub pushes: Mutex<Vec<(String, String, String)>>,
        states: Mutex<HashMap<String, String>>,
    }

    impl MockGateway {
        /// Make every following call fail with an API error.
        pub fn fail_requests(&self, fail: bool) {
            self.fail.store(fail, Ordering::SeqCst);
        }

        pub fn bill_count(&self) -> usize {
            self.bills.lock().map(|b| b.len()).unwrap_or_default()
        }

        /// Record `bill_id` as paid by the payer.
        pub fn settle(&self, bill_id: &str) {
            if let Ok(mut states) = self.states.lock() {
                if let Some(state) = states.get_mut(bill_id) {
                    *state = "paid".into();
                }
            }
        }

        fn check(&self) -> Result<(), GatewayError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(GatewayError::Api { status: 503, message: "unavailable".into() });
            }
            Ok(())
        }
    }

    #[async_trait]
    impl PaymentGateway for MockGateway {
        async fn create_bill(&self, req: &BillRequest) -> Result<Bill, GatewayError> {
            self.check()?;
            let n = self.next.fetch_add(1, Ordering::SeqCst) + 1;
            if let Ok(mut bills) = self.bills.lock() {
                bills.push(req.clone());
            }
            let bill_id = format!("MOCK{n:06}");
            if let Ok(mut states) = self.states.lock() {
                states.insert(bill_id.clone(), "ready".into());
            }
            Ok(Bill { bill_id })
        }

        async fn fetch_bill(&self, bill_id: &str) -> Result<BillStatus, GatewayError> {
            self.check()?;
            let state = self.states.lock().ok().and_then(|s| s.get(bill_id).cloned());
            match state {
                Some(state) => Ok(BillStatus { bill_id: bill_id.to_string(), state }),
                None => Err(GatewayError::Api { status: 404, message: format!("unknown bill {bill_id}") }),
            }
        }

        async fn push_ussd(&self, bill_id: &str, payment_system: &str, msisdn: &str) -> Result<(), GatewayError> {
            self.check()?;
            if let Ok(mut pushes) = self.pushes.lock() {
                pushes.push((bill_id.to_string(), payment_system.to_string(), msisdn.to_string()));
            }
            Ok(())
        }

        fn portal_url(&self, bill_id: &str) -> Result<String, GatewayError> {
            Ok(format!("https://pay.example.test/?invoice_number={bill_id}"))
        }
    }
}
