//! EBILLING merchant API client.
//!
//! Bills are created with HTTP basic auth (merchant username, shared key).
//! The payer then settles either on the hosted portal or through a USSD push
//! to their phone; EBILLING reports the outcome to our callback.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use configs::EbillingConfig;

use super::gateway::{Bill, BillRequest, BillStatus, GatewayError, PaymentGateway};

pub struct EbillingClient {
    client: Client,
    server_url: String,
    post_url: String,
    username: String,
    shared_key: String,
    redirect_url: String,
}

#[derive(Debug, Deserialize)]
struct CreateBillResponse {
    e_bill: Bill,
}

#[derive(Debug, Deserialize)]
struct FetchBillResponse {
    e_bill: BillStatus,
}

#[derive(Debug, Serialize)]
struct UssdPushRequest<'a> {
    payment_system_name: &'a str,
    payer_msisdn: &'a str,
}

impl EbillingClient {
    pub fn new(cfg: &EbillingConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            server_url: cfg.server_url.trim_end_matches('/').to_string(),
            post_url: cfg.post_url.clone(),
            username: cfg.username.clone(),
            shared_key: cfg.shared_key.clone(),
            redirect_url: cfg.redirect_url.clone(),
        })
    }

    fn ensure_credentials(&self) -> Result<(), GatewayError> {
        if self.username.is_empty() || self.shared_key.is_empty() {
            return Err(GatewayError::NotConfigured("ebilling.username and ebilling.shared_key are required".into()));
        }
        Ok(())
    }

    async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<reqwest::Response, GatewayError> {
        self.ensure_credentials()?;
        let url = format!("{}{}", self.server_url, path);
        self.send(self.client.post(&url).json(body)).await
    }

    async fn get(&self, path: &str) -> Result<reqwest::Response, GatewayError> {
        self.ensure_credentials()?;
        let url = format!("{}{}", self.server_url, path);
        self.send(self.client.get(&url)).await
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, GatewayError> {
        let response = request.basic_auth(&self.username, Some(&self.shared_key)).send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let message = response.text().await.unwrap_or_default();
            Err(GatewayError::Api { status: status.as_u16(), message })
        }
    }
}

#[async_trait]
impl PaymentGateway for EbillingClient {
    #[instrument(skip(self, req), fields(reference = %req.external_reference, amount = req.amount))]
    async fn create_bill(&self, req: &BillRequest) -> Result<Bill, GatewayError> {
        let response = self.post("/e_bills", req).await?;
        let body: CreateBillResponse = response.json().await?;
        debug!(bill_id = %body.e_bill.bill_id, "ebilling_bill_created");
        Ok(body.e_bill)
    }

    #[instrument(skip(self, msisdn))]
    async fn push_ussd(&self, bill_id: &str, payment_system: &str, msisdn: &str) -> Result<(), GatewayError> {
        let body = UssdPushRequest { payment_system_name: payment_system, payer_msisdn: msisdn };
        self.post(&format!("/e_bills/{}/ussd_push", bill_id), &body).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn fetch_bill(&self, bill_id: &str) -> Result<BillStatus, GatewayError> {
        let response = self.get(&format!("/e_bills/{}", bill_id)).await?;
        let body: FetchBillResponse = response.json().await?;
        debug!(bill_id = %body.e_bill.bill_id, state = %body.e_bill.state, "ebilling_bill_fetched");
        Ok(body.e_bill)
    }

    fn portal_url(&self, bill_id: &str) -> Result<String, GatewayError> {
        let mut params = vec![("invoice_number", bill_id)];
        if !self.redirect_url.is_empty() {
            params.push(("eb_callbackurl", self.redirect_url.as_str()));
        }
        Url::parse_with_params(&self.post_url, &params)
            .map(String::from)
            .map_err(|e| GatewayError::NotConfigured(format!("ebilling.post_url: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn cfg(server_url: &str) -> EbillingConfig {
        EbillingConfig {
            server_url: server_url.to_string(),
            post_url: "https://test.billing-easy.net".into(),
            username: "merchant".into(),
            shared_key: "key".into(),
            redirect_url: "https://shop.test/paid".into(),
            expiry_period_minutes: 60,
            timeout_secs: 5,
        }
    }

    fn request() -> BillRequest {
        BillRequest {
            payer_email: "buyer@shop.test".into(),
            payer_msisdn: "074000000".into(),
            payer_name: "Buyer".into(),
            amount: 4_000,
            short_description: "Order ORD-1".into(),
            external_reference: "ref-1".into(),
            expiry_period: 60,
        }
    }

    #[tokio::test]
    async fn create_bill_posts_with_basic_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/e_bills"))
            .and(header("authorization", "Basic bWVyY2hhbnQ6a2V5"))
            .and(body_partial_json(serde_json::json!({ "amount": 4000, "external_reference": "ref-1" })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "e_bill": { "bill_id": "5550001234", "state": "ready" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = EbillingClient::new(&cfg(&server.uri())).unwrap();
        let bill = client.create_bill(&request()).await.unwrap();
        assert_eq!(bill.bill_id, "5550001234");
    }

    #[tokio::test]
    async fn ussd_push_targets_bill() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/e_bills/5550001234/ussd_push"))
            .and(body_json(serde_json::json!({ "payment_system_name": "airtelmoney", "payer_msisdn": "074000000" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "message": "Accepted" })))
            .expect(1)
            .mount(&server)
            .await;

        let client = EbillingClient::new(&cfg(&server.uri())).unwrap();
        client.push_ussd("5550001234", "airtelmoney", "074000000").await.unwrap();
    }

    #[tokio::test]
    async fn fetch_bill_reads_state() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/e_bills/5550001234"))
            .and(header("authorization", "Basic bWVyY2hhbnQ6a2V5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "e_bill": { "bill_id": "5550001234", "state": "paid", "amount": 4000 }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = EbillingClient::new(&cfg(&server.uri())).unwrap();
        let bill = client.fetch_bill("5550001234").await.unwrap();
        assert!(bill.is_paid());
        assert_eq!(bill.bill_id, "5550001234");
    }

    #[tokio::test]
    async fn api_errors_surface_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/e_bills"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
            .mount(&server)
            .await;

        let client = EbillingClient::new(&cfg(&server.uri())).unwrap();
        match client.create_bill(&request()).await {
            Err(GatewayError::Api { status, message }) => {
                assert_eq!(status, 401);
                assert_eq!(message, "bad credentials");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_credentials_fail_before_any_request() {
        let mut c = cfg("http://127.0.0.1:9");
        c.shared_key.clear();
        let client = EbillingClient::new(&c).unwrap();
        assert!(matches!(client.create_bill(&request()).await, Err(GatewayError::NotConfigured(_))));
    }

    #[test]
    fn portal_url_carries_bill_and_callback() {
        let client = EbillingClient::new(&cfg("http://localhost")).unwrap();
        let url = client.portal_url("5550001234").unwrap();
        assert_eq!(
            url,
            "https://test.billing-easy.net/?invoice_number=5550001234&eb_callbackurl=https%3A%2F%2Fshop.test%2Fpaid"
        );
    }
}
