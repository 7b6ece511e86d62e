//! Proxmox VE REST client
//!
//! Features:
//! - Ticket login on `/access/ticket` (username/password)
//! - `PVEAuthCookie` sent with every request
//! - Optional TLS verification (self-signed certificates are the PVE default)
//! - `{ "data": ... }` envelopes unwrapped into typed answers

use super::types::{Envelope, NodeEntry, VmEntry, VmRuntimeConfig, VmStatus};
use super::{ClusterApi, ClusterError};
use crate::config::HookConfig;
use reqwest::header::COOKIE;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info};

/// Port of the PVE API daemon (pveproxy)
pub const DEFAULT_API_PORT: u16 = 8006;

const TICKET_PATH: &str = "/access/ticket";

#[derive(Debug, Deserialize)]
struct TicketData {
    ticket: String,
    #[serde(default)]
    username: Option<String>,
}

pub struct ProxmoxClient {
    http: reqwest::Client,
    base_url: String,
    ticket: String,
}

impl ProxmoxClient {
    /// Log in to the API rooted at `base_url` (e.g. `https://pve1:8006/api2/json`)
    pub async fn connect(
        base_url: impl Into<String>,
        user: &str,
        password: &str,
        verify_tls: bool,
    ) -> Result<Self, ClusterError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(!verify_tls)
            .build()?;

        debug!("Requesting ticket from {} as {}", base_url, user);
        let response = http
            .post(format!("{}{}", base_url, TICKET_PATH))
            .form(&[("username", user), ("password", password)])
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(ClusterError::AuthFailed(format!("login rejected for {}", user)));
            }
            status if !status.is_success() => {
                return Err(ClusterError::Api {
                    status: status.as_u16(),
                    path: TICKET_PATH.to_string(),
                });
            }
            _ => {}
        }

        let envelope: Envelope<Option<TicketData>> = decode(response, TICKET_PATH).await?;
        // PVE answers 200 with `data: null` on bad credentials for some realms
        let ticket = envelope
            .data
            .ok_or_else(|| ClusterError::AuthFailed(format!("no ticket issued for {}", user)))?;

        info!(
            "Authenticated to {} as {}",
            base_url,
            ticket.username.as_deref().unwrap_or(user)
        );

        Ok(Self {
            http,
            base_url,
            ticket: ticket.ticket,
        })
    }

    /// Log in with the hook configuration
    pub async fn from_config(config: &HookConfig) -> Result<Self, ClusterError> {
        Self::connect(
            Self::api_url(&config.hostname),
            &config.user,
            &config.password,
            config.verify_tls,
        )
        .await
    }

    /// API root for a hostname, `https` on port 8006 unless given otherwise
    pub fn api_url(hostname: &str) -> String {
        let host = hostname.trim_end_matches('/');
        if host.contains("://") {
            return format!("{}/api2/json", host);
        }

        let has_port = host
            .rsplit_once(':')
            .is_some_and(|(_, port)| !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()));
        if has_port {
            format!("https://{}/api2/json", host)
        } else {
            format!("https://{}:{}/api2/json", host, DEFAULT_API_PORT)
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClusterError> {
        debug!("GET {}", path);
        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .header(COOKIE, format!("PVEAuthCookie={}", self.ticket))
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(ClusterError::AuthFailed(format!("ticket rejected on {}", path)));
            }
            status if !status.is_success() => {
                return Err(ClusterError::Api {
                    status: status.as_u16(),
                    path: path.to_string(),
                });
            }
            _ => {}
        }

        let envelope: Envelope<T> = decode(response, path).await?;
        Ok(envelope.data)
    }
}

async fn decode<T: DeserializeOwned>(
    response: reqwest::Response,
    path: &str,
) -> Result<T, ClusterError> {
    response.json().await.map_err(|source| ClusterError::Decode {
        path: path.to_string(),
        source,
    })
}

impl ClusterApi for ProxmoxClient {
    async fn nodes(&self) -> Result<Vec<NodeEntry>, ClusterError> {
        self.get("/nodes").await
    }

    async fn node_vms(&self, node: &str) -> Result<Vec<VmEntry>, ClusterError> {
        self.get(&format!("/nodes/{}/qemu", node)).await
    }

    async fn vm_config(&self, node: &str, vm_id: u32) -> Result<VmRuntimeConfig, ClusterError> {
        self.get(&format!("/nodes/{}/qemu/{}/config", node, vm_id)).await
    }

    async fn vm_status(&self, node: &str, vm_id: u32) -> Result<VmStatus, ClusterError> {
        self.get(&format!("/nodes/{}/qemu/{}/status/current", node, vm_id))
            .await
    }
}
