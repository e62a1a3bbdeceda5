// Credentials and OAuth device authorization.
// Holds the session token and runs GitHub's device flow to obtain one.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
#[cfg(unix)]
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use reqwest::{Client, header::ACCEPT};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{GhdashError, Result};
use crate::github::{GitHubApi, User};

const DEVICE_CODE_URL: &str = "https://github.com/login/device/code";
const ACCESS_TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
const DEVICE_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:device_code";
const DEFAULT_SCOPES: &str = "read:user user:follow public_repo gist";

/// Extra wait GitHub asks for after a `slow_down` response.
const SLOW_DOWN_STEP: Duration = Duration::from_secs(5);

/// Where a token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Personal,
    OAuth,
}

/// A GitHub token and its kind.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub token: String,
    pub kind: TokenKind,
}

impl Credential {
    pub fn personal(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            kind: TokenKind::Personal,
        }
    }

    pub fn oauth(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            kind: TokenKind::OAuth,
        }
    }

    /// Confirm the token works by asking who it belongs to.
    pub async fn validate(&self, api: &dyn GitHubApi) -> Result<User> {
        let user = api.current_user().await?;
        info!("Authenticated as {}", user.login);
        Ok(user)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("kind", &self.kind)
            .finish()
    }
}

/// Default location of the saved credential.
pub fn credentials_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "ghdash").map(|dirs| dirs.config_dir().join("credentials.json"))
}

/// Holds the credential for one session, optionally backed by a file.
#[derive(Debug, Default)]
pub struct CredentialSlot {
    current: Mutex<Option<Credential>>,
    path: Option<PathBuf>,
}

impl CredentialSlot {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Slot persisted at `path`, loading whatever is already saved there.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let current = read_credential(&path);
        Self {
            current: Mutex::new(current),
            path: Some(path),
        }
    }

    pub fn get(&self) -> Option<Credential> {
        self.lock().clone()
    }

    /// Hold `credential` for this session. Only device-flow tokens are
    /// written to the backing file; personal tokens stay in memory.
    pub fn store(&self, credential: Credential) -> Result<()> {
        if credential.kind == TokenKind::OAuth {
            if let Some(path) = &self.path {
                write_credential(path, &credential)?;
            }
        }
        *self.lock() = Some(credential);
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        *self.lock() = None;
        if let Some(path) = &self.path {
            match fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Credential>> {
        self.current.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Write the credential readable by the owner only.
fn write_credential(path: &Path, credential: &Credential) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path)?;
    // `mode` only applies on creation
    #[cfg(unix)]
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    file.write_all(serde_json::to_string(credential)?.as_bytes())?;
    Ok(())
}

fn read_credential(path: &Path) -> Option<Credential> {
    let contents = fs::read_to_string(path).ok()?;
    match serde_json::from_str(&contents) {
        Ok(credential) => Some(credential),
        Err(e) => {
            debug!("Ignoring unreadable credential file {}: {e}", path.display());
            None
        }
    }
}

/// Code the user enters at the verification page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingVerification {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    pub expires_at: DateTime<Utc>,
    pub interval: Duration,
}

/// Result of one poll of the token endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DevicePollOutcome {
    Pending,
    /// Keep polling, but wait longer between attempts.
    SlowDown,
    Authorized(Credential),
    Expired,
    Denied,
}

#[derive(Debug, Deserialize)]
struct DeviceCodeResponse {
    device_code: String,
    user_code: String,
    verification_uri: String,
    expires_in: u64,
    interval: u64,
}

#[derive(Debug, Default, Deserialize)]
struct AccessTokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

impl AccessTokenResponse {
    fn into_outcome(self) -> Result<DevicePollOutcome> {
        if let Some(token) = self.access_token {
            return Ok(DevicePollOutcome::Authorized(Credential::oauth(token)));
        }

        match self.error.as_deref() {
            Some("authorization_pending") => Ok(DevicePollOutcome::Pending),
            Some("slow_down") => Ok(DevicePollOutcome::SlowDown),
            Some("expired_token") => Ok(DevicePollOutcome::Expired),
            Some("access_denied") => Ok(DevicePollOutcome::Denied),
            Some(other) => Err(GhdashError::DeviceFlow(
                self.error_description.unwrap_or_else(|| other.to_string()),
            )),
            None => Err(GhdashError::DeviceFlow(
                "token endpoint returned neither a token nor an error".to_string(),
            )),
        }
    }
}

/// OAuth device authorization against github.com.
pub struct DeviceFlow {
    client: Client,
    client_id: String,
    scopes: String,
}

impl DeviceFlow {
    pub fn new(client_id: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent("ghdash")
            .build()
            .map_err(GhdashError::Api)?;
        Ok(Self {
            client,
            client_id: client_id.into(),
            scopes: DEFAULT_SCOPES.to_string(),
        })
    }

    pub fn with_scopes(mut self, scopes: impl Into<String>) -> Self {
        self.scopes = scopes.into();
        self
    }

    /// Request a device and user code pair.
    pub async fn start(&self) -> Result<PendingVerification> {
        let response: DeviceCodeResponse = self
            .client
            .post(DEVICE_CODE_URL)
            .header(ACCEPT, "application/json")
            .form(&[("client_id", self.client_id.as_str()), ("scope", self.scopes.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        debug!("Device flow started, polling every {}s", response.interval);
        Ok(PendingVerification {
            device_code: response.device_code,
            user_code: response.user_code,
            verification_uri: response.verification_uri,
            expires_at: Utc::now() + chrono::Duration::seconds(response.expires_in as i64),
            interval: Duration::from_secs(response.interval.max(1)),
        })
    }

    /// Ask once whether the user has approved the device.
    pub async fn poll(&self, pending: &PendingVerification) -> Result<DevicePollOutcome> {
        let response: AccessTokenResponse = self
            .client
            .post(ACCESS_TOKEN_URL)
            .header(ACCEPT, "application/json")
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("device_code", pending.device_code.as_str()),
                ("grant_type", DEVICE_GRANT_TYPE),
            ])
            .send()
            .await?
            .json()
            .await?;

        response.into_outcome()
    }

    /// Poll at the server-provided interval until the flow resolves.
    pub async fn wait_for_authorization(
        &self,
        pending: &PendingVerification,
    ) -> Result<Credential> {
        let mut interval = pending.interval;

        loop {
            if Utc::now() >= pending.expires_at {
                return Err(GhdashError::DeviceFlow("the device code expired".to_string()));
            }

            tokio::time::sleep(interval).await;

            match self.poll(pending).await? {
                DevicePollOutcome::Authorized(credential) => return Ok(credential),
                DevicePollOutcome::Pending => {}
                DevicePollOutcome::SlowDown => interval += SLOW_DOWN_STEP,
                DevicePollOutcome::Expired => {
                    return Err(GhdashError::DeviceFlow("the device code expired".to_string()));
                }
                DevicePollOutcome::Denied => {
                    return Err(GhdashError::DeviceFlow("access was denied".to_string()));
                }
            }
        }
    }
}
