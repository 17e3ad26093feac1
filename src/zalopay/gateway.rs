use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::{mac, CreateOrderParams, CreateOrderResponse, QueryOrderResponse, ZaloPayError};
use crate::config::ZaloPayConfig;

/// HTTP client for the ZaloPay merchant API.
#[derive(Clone)]
pub struct ZaloPayGateway {
    client: Client,
    config: ZaloPayConfig,
}

impl ZaloPayGateway {
    pub fn new(config: ZaloPayConfig) -> Result<Self, ZaloPayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs.max(1)))
            .build()?;
        Ok(Self::with_client(config, client))
    }

    pub fn with_client(config: ZaloPayConfig, client: Client) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &ZaloPayConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.endpoint.trim_end_matches('/'), path)
    }

    fn ensure_configured(&self) -> Result<(), ZaloPayError> {
        if self.config.is_configured() {
            Ok(())
        } else {
            Err(ZaloPayError::NotConfigured)
        }
    }

    async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        form: &[(&str, String)],
    ) -> Result<T, ZaloPayError> {
        let response = self.client.post(self.url(path)).form(form).send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            let text = String::from_utf8_lossy(&body).into_owned();
            warn!(status = status.as_u16(), path, "ZaloPay returned an error status");
            return Err(ZaloPayError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(serde_json::from_slice(&body)?)
    }

    /// Opens a payment session. A non-success `return_code` is an error.
    #[instrument(skip(self, params), fields(app_trans_id = %params.app_trans_id, amount = params.amount))]
    pub async fn create_order(
        &self,
        params: &CreateOrderParams,
    ) -> Result<CreateOrderResponse, ZaloPayError> {
        self.ensure_configured()?;
        let mac = mac::sign(&self.config.key1, &params.mac_input(self.config.app_id));

        let mut form = vec![
            ("app_id", self.config.app_id.to_string()),
            ("app_user", params.app_user.clone()),
            ("app_trans_id", params.app_trans_id.clone()),
            ("app_time", params.app_time.to_string()),
            ("amount", params.amount.to_string()),
            ("item", params.item.clone()),
            ("embed_data", params.embed_data.clone()),
            ("description", params.description.clone()),
            ("bank_code", params.bank_code.clone()),
            ("mac", mac),
        ];
        if let Some(callback_url) = params
            .callback_url
            .clone()
            .or_else(|| self.config.callback_url.clone())
        {
            form.push(("callback_url", callback_url));
        }

        let response: CreateOrderResponse = self.post_form("create", &form).await?;
        debug!(return_code = response.return_code, "ZaloPay create answered");
        if !response.is_success() {
            return Err(ZaloPayError::Rejected {
                return_code: response.return_code,
                message: response
                    .sub_return_message
                    .clone()
                    .unwrap_or_else(|| response.return_message.clone()),
            });
        }
        Ok(response)
    }

    /// Asks the gateway where a payment stands.
    #[instrument(skip(self))]
    pub async fn query_order(&self, app_trans_id: &str) -> Result<QueryOrderResponse, ZaloPayError> {
        self.ensure_configured()?;
        let mac = mac::sign(
            &self.config.key1,
            &format!("{}|{}|{}", self.config.app_id, app_trans_id, self.config.key1),
        );
        let form = [
            ("app_id", self.config.app_id.to_string()),
            ("app_trans_id", app_trans_id.to_string()),
            ("mac", mac),
        ];

        let response: QueryOrderResponse = self.post_form("query", &form).await?;
        debug!(return_code = response.return_code, is_processing = response.is_processing, "ZaloPay query answered");
        Ok(response)
    }
}
