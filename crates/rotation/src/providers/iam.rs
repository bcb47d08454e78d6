//! AWS IAM key authority
//!
//! Lists, creates, deactivates and deletes the access keys of the IAM user
//! owning the presented key. No user name is sent; IAM resolves it from the
//! request signature.
//!
//! ```rust,ignore
//! use keyrot_rotation::providers::{IamAuthority, IamAuthorityConfig};
//!
//! let config = IamAuthorityConfig {
//!     endpoint_url: Some("http://localhost:4566".into()),
//!     ..Default::default()
//! };
//! let authority = IamAuthority::new(config).await?;
//! ```

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_iam::Client;
use aws_sdk_iam::config::Credentials;
use aws_sdk_iam::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_iam::types::StatusType;
use serde::{Deserialize, Serialize};

use crate::core::{
    AccessCredentials, AuthorityError, ConfigurationError, CredentialPair, Identity, PairId,
    PairStatus, RemoteIdentityState, RemoteOperation,
};
use crate::traits::KeyAuthority;
use crate::utils::SecretString;

/// IAM is a global service; requests are signed for this region
pub const DEFAULT_REGION: &str = "us-east-1";

/// IAM authority configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct IamAuthorityConfig {
    /// Signing region, [`DEFAULT_REGION`] if unset
    pub region: Option<String>,

    /// Custom endpoint (for LocalStack or other IAM-compatible services)
    pub endpoint_url: Option<String>,
}

impl IamAuthorityConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if let Some(region) = &self.region
            && (region.is_empty()
                || !region
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'))
        {
            return Err(ConfigurationError::InvalidValue {
                field: "region".into(),
                reason: format!("'{region}' is not a region name"),
            });
        }

        if let Some(endpoint) = &self.endpoint_url
            && !(endpoint.starts_with("http://") || endpoint.starts_with("https://"))
        {
            return Err(ConfigurationError::InvalidValue {
                field: "endpoint_url".into(),
                reason: format!("'{endpoint}' must start with http:// or https://"),
            });
        }

        Ok(())
    }
}

/// Key authority backed by AWS IAM
#[derive(Clone)]
pub struct IamAuthority {
    base: SdkConfig,
    config: IamAuthorityConfig,
}

impl std::fmt::Debug for IamAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IamAuthority")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl IamAuthority {
    /// Load the shared SDK configuration
    ///
    /// Ambient credentials are never used: every call is signed with the pair
    /// it is given.
    pub async fn new(config: IamAuthorityConfig) -> Result<Self, ConfigurationError> {
        config.validate()?;

        let region = config.region.clone().unwrap_or_else(|| DEFAULT_REGION.to_string());
        let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(Region::new(region));
        if let Some(endpoint) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        let base = loader.load().await;

        tracing::info!(
            authority = "AWS IAM",
            region = ?config.region,
            endpoint = ?config.endpoint_url,
            "initialized key authority"
        );

        Ok(Self { base, config })
    }

    fn client(&self, auth: &AccessCredentials) -> Client {
        let credentials = auth.secret_access_key.expose_secret(|secret| {
            Credentials::new(auth.access_key_id.as_str(), secret, None, None, "keyrot")
        });
        let conf = aws_sdk_iam::config::Builder::from(&self.base)
            .credentials_provider(credentials)
            .build();
        Client::from_conf(conf)
    }
}

/// Map an SDK failure onto the engine's error vocabulary
fn classify<E, R>(
    operation: RemoteOperation,
    err: &SdkError<E, R>,
    auth: &AccessCredentials,
    target: Option<&PairId>,
) -> AuthorityError
where
    E: ProvideErrorMetadata,
{
    let Some(service) = err.as_service_error() else {
        return AuthorityError::service(operation, transport_message(err));
    };

    match (service.code(), target) {
        (Some("InvalidClientTokenId" | "SignatureDoesNotMatch"), _) => {
            AuthorityError::InvalidCredentials {
                operation,
                access_key_id: auth.access_key_id.clone(),
            }
        }
        (Some("LimitExceeded"), _) => AuthorityError::LimitExceeded { operation },
        (Some("NoSuchEntity"), Some(pair_id)) => AuthorityError::NoSuchPair {
            operation,
            pair_id: pair_id.clone(),
        },
        (code, _) => AuthorityError::service(
            operation,
            format!(
                "{}: {}",
                code.unwrap_or("unknown"),
                service.message().unwrap_or("no message")
            ),
        ),
    }
}

fn transport_message<E, R>(err: &SdkError<E, R>) -> String {
    match err {
        SdkError::TimeoutError(_) => "request timed out".to_string(),
        SdkError::DispatchFailure(_) => "request could not be dispatched".to_string(),
        SdkError::ConstructionFailure(_) => "request could not be built".to_string(),
        SdkError::ResponseError(_) => "response could not be read".to_string(),
        _ => "unexpected SDK failure".to_string(),
    }
}

fn pair_id(operation: RemoteOperation, raw: &str) -> Result<PairId, AuthorityError> {
    PairId::new(raw).map_err(|err| AuthorityError::MalformedResponse {
        operation,
        reason: err.to_string(),
    })
}

#[async_trait]
impl KeyAuthority for IamAuthority {
    #[tracing::instrument(skip(self, identity), fields(authority = "IAM", profile = %identity.profile))]
    async fn list_pairs(&self, identity: &Identity) -> Result<RemoteIdentityState, AuthorityError> {
        let operation = RemoteOperation::ListPairs;
        let auth = &identity.credentials;

        let output = self
            .client(auth)
            .list_access_keys()
            .send()
            .await
            .map_err(|err| classify(operation, &err, auth, None))?;

        output
            .access_key_metadata()
            .iter()
            .map(|meta| {
                let id = meta.access_key_id().ok_or_else(|| AuthorityError::MalformedResponse {
                    operation,
                    reason: "access key without id".into(),
                })?;
                let status = match meta.status() {
                    Some(StatusType::Active) => PairStatus::Active,
                    Some(StatusType::Inactive) => PairStatus::Inactive,
                    other => {
                        return Err(AuthorityError::MalformedResponse {
                            operation,
                            reason: format!("access key {id} has status {other:?}"),
                        });
                    }
                };
                Ok(CredentialPair::listed(pair_id(operation, id)?, status))
            })
            .collect()
    }

    #[tracing::instrument(skip(self, auth), fields(authority = "IAM", auth = %auth.access_key_id))]
    async fn create_pair(&self, auth: &AccessCredentials) -> Result<CredentialPair, AuthorityError> {
        let operation = RemoteOperation::CreatePair;

        let output = self
            .client(auth)
            .create_access_key()
            .send()
            .await
            .map_err(|err| classify(operation, &err, auth, None))?;

        let key = output.access_key().ok_or_else(|| AuthorityError::MalformedResponse {
            operation,
            reason: "response carries no access key".into(),
        })?;

        Ok(CredentialPair::created(
            pair_id(operation, key.access_key_id())?,
            SecretString::new(key.secret_access_key()),
        ))
    }

    #[tracing::instrument(skip(self, auth), fields(authority = "IAM", pair = %pair_id))]
    async fn deactivate_pair(
        &self,
        auth: &AccessCredentials,
        pair_id: &PairId,
    ) -> Result<(), AuthorityError> {
        let operation = RemoteOperation::DeactivatePair;

        self.client(auth)
            .update_access_key()
            .access_key_id(pair_id.as_str())
            .status(StatusType::Inactive)
            .send()
            .await
            .map_err(|err| classify(operation, &err, auth, Some(pair_id)))?;
        Ok(())
    }

    #[tracing::instrument(skip(self, auth), fields(authority = "IAM", pair = %pair_id))]
    async fn delete_pair(
        &self,
        auth: &AccessCredentials,
        pair_id: &PairId,
    ) -> Result<(), AuthorityError> {
        let operation = RemoteOperation::DeletePair;

        self.client(auth)
            .delete_access_key()
            .access_key_id(pair_id.as_str())
            .send()
            .await
            .map_err(|err| classify(operation, &err, auth, Some(pair_id)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(IamAuthorityConfig::default().validate().is_ok());
    }

    #[test]
    fn test_config_rejects_bad_endpoint() {
        let config = IamAuthorityConfig {
            endpoint_url: Some("localhost:4566".into()),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::InvalidValue { field, .. }) if field == "endpoint_url"
        ));
    }

    #[test]
    fn test_config_rejects_bad_region() {
        let config = IamAuthorityConfig {
            region: Some("US East".into()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
