//! Google Cloud
//!
//! Resource types are tagged `Google.<service>.<collection>`, e.g.
//! `Google.compute.networks`. Defaults target global Compute Engine
//! collections; regional and zonal resources declare their own endpoints
//! under `domain.extra.endpoints`.

use crate::adapter::{RestAdapter, RestProfile, message_has, type_name};
use crate::transport::HttpTransport;
use driftflow_cloud::{
    CloudError, CredentialResolver, Endpoint, Endpoints, LroStyle, Method, PageMode, Pagination,
    ResourceMeta, Result, UpdateStyle,
};
use std::sync::Arc;

pub const BASE_URL: &str = "https://compute.googleapis.com";
pub const TOKEN_VAR: &str = "GOOGLE_ACCESS_TOKEN";
pub const PROJECT_VAR: &str = "GOOGLE_PROJECT";

pub const PROFILE: RestProfile = RestProfile {
    name: "google",
    defaults,
    is_rate_limited,
};

pub fn adapter(credentials: &dyn CredentialResolver) -> Result<RestAdapter> {
    let token = credentials.require(TOKEN_VAR)?;
    let transport = HttpTransport::new(BASE_URL, token)?;
    Ok(RestAdapter::new(PROFILE, Arc::new(transport))
        .with_context("project", credentials.get(PROJECT_VAR)))
}

fn defaults(kind: &str) -> ResourceMeta {
    let service = kind.split('.').nth(1).unwrap_or("compute");
    let collection = type_name(kind);
    let list = format!("/{service}/v1/projects/{{project}}/global/{collection}");
    let item = format!("{list}/{{resourceId}}");

    ResourceMeta {
        endpoints: Endpoints {
            list: Some(Endpoint::path(Method::Get, list.clone()).with_query(["filter"])),
            get: Some(Endpoint::path(Method::Get, item.clone())),
            create: Some(Endpoint::path(Method::Post, list).with_query(["requestId"])),
            update: Some(Endpoint::path(Method::Patch, item.clone()).with_query(["requestId"])),
            delete: Some(Endpoint::path(Method::Delete, item)),
            poll: None,
        },
        lro_style: Some(LroStyle::GoogleOperation),
        update_style: Some(UpdateStyle::Patch),
        pagination: Some(Pagination {
            items: "/items".to_string(),
            next: Some("/nextPageToken".to_string()),
            id: Some("/name".to_string()),
            mode: PageMode::Token {
                param: "pageToken".to_string(),
            },
        }),
        id_field: Some("/name".to_string()),
        ..Default::default()
    }
}

fn is_rate_limited(error: &CloudError) -> bool {
    match error.status() {
        Some(429) => true,
        Some(403) => message_has(error, &["rateLimitExceeded", "userRateLimitExceeded"]),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use driftflow_cloud::{ProviderAdapter, StaticCredentials, Template};

    #[test]
    fn test_defaults_for_global_collection() {
        let meta = defaults("Google.compute.firewalls");
        let get = meta.endpoints.get.unwrap();
        assert_eq!(
            get.template,
            Template::Path("/compute/v1/projects/{project}/global/firewalls/{resourceId}".into())
        );
        assert_eq!(meta.lro_style, Some(LroStyle::GoogleOperation));
        assert_eq!(meta.endpoints.update.unwrap().method, Method::Patch);
    }

    #[test]
    fn test_rate_limit_classification() {
        assert!(is_rate_limited(&CloudError::api(Some(429), "Too Many Requests")));
        assert!(is_rate_limited(&CloudError::api(
            Some(403),
            "403 Forbidden: {\"error\":{\"errors\":[{\"reason\":\"rateLimitExceeded\"}]}}"
        )));
        assert!(!is_rate_limited(&CloudError::api(Some(403), "403 Forbidden: permission denied")));
    }

    #[test]
    fn test_adapter_requires_token_and_carries_project() {
        let err = adapter(&StaticCredentials::new()).err().unwrap();
        assert!(matches!(err, CloudError::MissingCredential(ref v) if v == TOKEN_VAR));

        let creds = StaticCredentials::new()
            .with(TOKEN_VAR, "ya29.token")
            .with(PROJECT_VAR, "acme");
        let adapter = adapter(&creds).unwrap();
        assert_eq!(adapter.name(), "google");
        assert_eq!(adapter.context().get("project").map(String::as_str), Some("acme"));
    }
}
