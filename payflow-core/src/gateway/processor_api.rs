//! Gateway implementations backed by the processor REST API.

use async_trait::async_trait;
use k256::ecdsa::VerifyingKey;
use payflow_sdk::client::ProcessorClient;
use payflow_sdk::objects::{Invoice, InvoiceRequest, Transfer, TransferRequest};
use payflow_sdk::signature::parse_public_key_pem;

use super::{GatewayError, InvoiceGateway, PublicKeySource, TransferGateway, VerifyError};

const PAID_STATUS: &str = "paid";

#[async_trait]
impl InvoiceGateway for ProcessorClient {
    async fn create_invoices(
        &self,
        invoices: Vec<InvoiceRequest>,
    ) -> Result<Vec<Invoice>, GatewayError> {
        let requested = invoices.len();
        let created = ProcessorClient::create_invoices(self, invoices).await?;
        if requested > 0 && created.is_empty() {
            return Err(GatewayError::EmptyResponse("invoices"));
        }
        Ok(created)
    }

    async fn list_paid_invoices(&self, limit: u32) -> Result<Vec<Invoice>, GatewayError> {
        Ok(self.list_invoices(Some(PAID_STATUS), limit).await?)
    }
}

#[async_trait]
impl TransferGateway for ProcessorClient {
    async fn create_transfers(
        &self,
        transfers: Vec<TransferRequest>,
    ) -> Result<Vec<Transfer>, GatewayError> {
        let requested = transfers.len();
        let created = ProcessorClient::create_transfers(self, transfers).await?;
        if requested > 0 && created.is_empty() {
            return Err(GatewayError::EmptyResponse("transfers"));
        }
        Ok(created)
    }
}

#[async_trait]
impl PublicKeySource for ProcessorClient {
    async fn fetch_public_key(&self) -> Result<VerifyingKey, VerifyError> {
        let keys = self
            .public_keys(1)
            .await
            .map_err(|e| VerifyError::KeyUnavailable(e.to_string()))?;
        let Some(entry) = keys.into_iter().next() else {
            return Err(VerifyError::KeyUnavailable(
                "processor returned no public keys".to_string(),
            ));
        };
        parse_public_key_pem(&entry.content).map_err(|e| VerifyError::KeyUnavailable(e.to_string()))
    }
}
