//! Client for the tenant management API

use reqwest::{Client, Response};
use serde_json::json;
use tracing::{debug, info};
use vaultload_config::{HttpConfig, ProvisionConfig};

use crate::error::TenantApiError;

/// Creates, bootstraps and deletes tenants
#[derive(Debug, Clone)]
pub struct TenantClient {
    client: Client,
    config: ProvisionConfig,
}

impl TenantClient {
    pub fn new(config: &ProvisionConfig, http: &HttpConfig) -> Result<Self, TenantApiError> {
        let client = Client::builder()
            .timeout(http.timeout)
            .user_agent(&http.user_agent)
            .danger_accept_invalid_certs(!http.verify_ssl)
            .redirect(reqwest::redirect::Policy::limited(http.max_redirects as usize))
            .build()?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: Client, config: &ProvisionConfig) -> Self {
        Self {
            client,
            config: config.clone(),
        }
    }

    fn admin_url(&self, path: &str) -> String {
        format!("{}/{}", self.config.admin_endpoint.trim_end_matches('/'), path)
    }

    /// `POST {admin}/tenant`
    pub async fn create_tenant(&self, tenant: &str) -> Result<(), TenantApiError> {
        let url = self.admin_url("tenant");
        info!("Creating tenant {} via {}", tenant, url);

        let mut request = self.client.post(&url).json(&json!({
            "tenant": tenant,
            "user": self.config.admin_user,
        }));
        if let Some(authorization) = &self.config.admin_authorization {
            request = request.header(reqwest::header::AUTHORIZATION, authorization);
        }

        let response = request.send().await?;
        check_status("create tenant", response).await
    }

    /// `POST {tenant_base}/initialize`
    pub async fn initialize_admin(&self, tenant: &str) -> Result<(), TenantApiError> {
        let url = format!("{}/initialize", self.config.tenant_base_url(tenant));
        info!("Initializing admin {} on {}", self.config.admin_user, url);

        let response = self
            .client
            .post(&url)
            .json(&json!({
                "username": self.config.admin_user,
                "password": self.config.admin_password(),
            }))
            .send()
            .await?;
        check_status("initialize admin", response).await
    }

    /// Create the tenant and its initial admin
    pub async fn provision(&self, tenant: &str) -> Result<(), TenantApiError> {
        self.create_tenant(tenant).await?;
        self.initialize_admin(tenant).await
    }

    /// `DELETE {admin}/tenant/{tenant}`
    pub async fn delete_tenant(&self, tenant: &str) -> Result<(), TenantApiError> {
        let url = self.admin_url(&format!("tenant/{}", tenant));
        info!("Deleting tenant {} via {}", tenant, url);

        let response = self.client.delete(&url).send().await?;
        check_status("delete tenant", response).await
    }
}

async fn check_status(operation: &'static str, response: Response) -> Result<(), TenantApiError> {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    if !status.is_success() {
        return Err(TenantApiError::Status {
            operation,
            status: status.as_u16(),
            body,
        });
    }

    debug!("{} response: {}", operation, body);
    Ok(())
}
