//! Role fallback through the directory membership API.
//!
//! Used only when a validated token carries no roles. Group and
//! directory-role display names become role names. Every failure degrades
//! to an empty list so the request continues unprivileged.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use crate::config::AuthConfig;
use crate::credentials::ServiceCredentialCache;
use crate::errors::TransportError;
use crate::http::send_json;
use crate::traits::RoleLookup;

/// Membership entry types treated as role sources. Administrative units and
/// other directory objects are skipped.
pub const ROLE_SOURCE_TYPES: [&str; 2] = ["#microsoft.graph.group", "#microsoft.graph.directoryRole"];

/// Upper bound on membership pages followed for one lookup.
pub const MAX_MEMBERSHIP_PAGES: usize = 50;

#[derive(Deserialize)]
struct MembershipPage {
    #[serde(default)]
    value: Vec<MembershipEntry>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

#[derive(Deserialize)]
struct MembershipEntry {
    #[serde(rename = "@odata.type", default)]
    odata_type: String,
    #[serde(rename = "displayName")]
    display_name: Option<String>,
}

/// Resolves role names from a user's group and directory-role memberships.
pub struct GraphRoleResolver {
    client: reqwest::Client,
    graph_base_url: String,
    credentials: Arc<ServiceCredentialCache>,
}

impl GraphRoleResolver {
    #[must_use]
    pub fn new(
        client: reqwest::Client,
        graph_base_url: impl Into<String>,
        credentials: Arc<ServiceCredentialCache>,
    ) -> Self {
        Self {
            client,
            graph_base_url: graph_base_url.into(),
            credentials,
        }
    }

    #[must_use]
    pub fn from_config(config: &AuthConfig, client: reqwest::Client) -> Self {
        let credentials = Arc::new(ServiceCredentialCache::from_config(config, client.clone()));
        Self::new(client, config.graph_base_url.clone(), credentials)
    }

    fn member_of_url(&self, subject_id: &str) -> Result<Url, TransportError> {
        let invalid = |reason: &str| TransportError::InvalidUrl {
            url: self.graph_base_url.clone(),
            reason: reason.to_owned(),
        };
        // Dot segments would be dropped rather than escaped.
        if matches!(subject_id, "." | "..") {
            return Err(invalid("subject id is a dot segment"));
        }
        let mut url = Url::parse(&self.graph_base_url).map_err(|e| invalid(&e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| invalid("not a base URL"))?
            .pop_if_empty()
            .extend(["users", subject_id, "memberOf"]);
        Ok(url)
    }

    /// Walk every page of the membership listing.
    ///
    /// Continuation links must stay on the origin of the first page, which
    /// is where the service credential is meant to go.
    async fn collect_roles(&self, subject_id: &str) -> Result<Vec<String>, TransportError> {
        let credential = self.credentials.get().await?;
        let first = self.member_of_url(subject_id)?;

        let mut roles = Vec::new();
        let mut next = Some(first.clone());
        for _ in 0..MAX_MEMBERSHIP_PAGES {
            let Some(url) = next.take() else {
                return Ok(roles);
            };
            let request = self
                .client
                .get(url.as_str())
                .bearer_auth(credential.expose_secret());
            let page: MembershipPage = send_json(request, url.as_str()).await?;

            roles.extend(
                page.value
                    .into_iter()
                    .filter(|entry| ROLE_SOURCE_TYPES.contains(&entry.odata_type.as_str()))
                    .filter_map(|entry| entry.display_name)
                    .filter(|name| !name.is_empty()),
            );
            next = page
                .next_link
                .as_deref()
                .map(|link| continuation(&first, link))
                .transpose()?;
        }

        match next {
            None => Ok(roles),
            Some(url) => Err(TransportError::InvalidResponse {
                url: url.into(),
                reason: format!("membership listing exceeds {MAX_MEMBERSHIP_PAGES} pages"),
            }),
        }
    }
}

fn continuation(first: &Url, link: &str) -> Result<Url, TransportError> {
    let invalid = |reason: String| TransportError::InvalidResponse {
        url: first.to_string(),
        reason,
    };
    let next = first
        .join(link)
        .map_err(|e| invalid(format!("invalid next link: {e}")))?;
    if next.origin() != first.origin() {
        return Err(invalid("next link leaves the membership API origin".to_owned()));
    }
    Ok(next)
}

#[async_trait]
impl RoleLookup for GraphRoleResolver {
    #[tracing::instrument(name = "role_fallback", skip_all)]
    async fn lookup_roles(&self, subject_id: &str) -> Vec<String> {
        if subject_id.is_empty() {
            return Vec::new();
        }
        match self.collect_roles(subject_id).await {
            Ok(roles) => roles,
            Err(err) => {
                tracing::warn!(error = %err, "role fallback failed; continuing without roles");
                Vec::new()
            }
        }
    }
}
