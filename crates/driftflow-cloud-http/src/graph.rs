//! Microsoft Graph
//!
//! Resource types are tagged `Microsoft.Graph/<collection>`, e.g.
//! `Microsoft.Graph/groups`. Graph calls complete synchronously and page
//! through `@odata.nextLink`.

use crate::adapter::{RestAdapter, RestProfile, type_name};
use crate::transport::HttpTransport;
use driftflow_cloud::{
    CloudError, CredentialResolver, Endpoint, Endpoints, LroStyle, Method, PageMode, Pagination,
    ResourceMeta, Result, UpdateStyle,
};
use std::sync::Arc;

pub const BASE_URL: &str = "https://graph.microsoft.com/v1.0";
pub const TOKEN_VAR: &str = "MSGRAPH_ACCESS_TOKEN";

pub const PROFILE: RestProfile = RestProfile {
    name: "msgraph",
    defaults,
    is_rate_limited,
};

pub fn adapter(credentials: &dyn CredentialResolver) -> Result<RestAdapter> {
    let token = credentials.require(TOKEN_VAR)?;
    let transport = HttpTransport::new(BASE_URL, token)?.with_header("ConsistencyLevel", "eventual");
    Ok(RestAdapter::new(PROFILE, Arc::new(transport)))
}

fn defaults(kind: &str) -> ResourceMeta {
    let collection = type_name(kind);
    let list = format!("/{collection}");
    let item = format!("/{collection}/{{resourceId}}");

    ResourceMeta {
        endpoints: Endpoints {
            list: Some(Endpoint::path(Method::Get, list.clone()).with_query(["$filter", "$top"])),
            get: Some(Endpoint::path(Method::Get, item.clone())),
            create: Some(Endpoint::path(Method::Post, list)),
            update: Some(Endpoint::path(Method::Patch, item.clone())),
            delete: Some(Endpoint::path(Method::Delete, item)),
            poll: None,
        },
        lro_style: Some(LroStyle::None),
        update_style: Some(UpdateStyle::Patch),
        pagination: Some(Pagination {
            items: "/value".to_string(),
            next: Some("/@odata.nextLink".to_string()),
            id: Some("/id".to_string()),
            mode: PageMode::Link,
        }),
        id_field: Some("/id".to_string()),
        ..Default::default()
    }
}

/// Graph throttles with 429 and, under load, 503 with `Retry-After`
fn is_rate_limited(error: &CloudError) -> bool {
    matches!(error.status(), Some(429) | Some(503))
}

#[cfg(test)]
mod tests {
    use super::*;
    use driftflow_cloud::Template;

    #[test]
    fn test_group_defaults() {
        let meta = defaults("Microsoft.Graph/groups");
        assert_eq!(
            meta.endpoints.update.unwrap(),
            Endpoint::path(Method::Patch, "/groups/{resourceId}")
        );
        assert_eq!(
            meta.endpoints.list.unwrap().template,
            Template::Path("/groups".into())
        );
        assert_eq!(meta.pagination.unwrap().next.as_deref(), Some("/@odata.nextLink"));
    }

    #[test]
    fn test_throttling_statuses() {
        assert!(is_rate_limited(&CloudError::api(Some(503), "Service Unavailable")));
        assert!(!is_rate_limited(&CloudError::api(Some(400), "Bad Request")));
    }
}
