//! Azure Resource Manager
//!
//! Resource types use ARM names (`Microsoft.Network/virtualNetworks`).
//! Resources are addressed by their full ARM id, created with PUT under a
//! resource group and completed through `Azure-AsyncOperation` monitors.
//! Every endpoint takes the `api-version` query parameter, usually declared
//! in `domain.extra.query`.

use crate::adapter::{RestAdapter, RestProfile};
use crate::transport::HttpTransport;
use driftflow_cloud::{
    CloudError, CredentialResolver, Endpoint, Endpoints, LroStyle, Method, PageMode, Pagination,
    ResourceMeta, Result, UpdateStyle,
};
use std::sync::Arc;

pub const BASE_URL: &str = "https://management.azure.com";
pub const TOKEN_VAR: &str = "AZURE_ACCESS_TOKEN";
pub const SUBSCRIPTION_VAR: &str = "AZURE_SUBSCRIPTION_ID";

const API_VERSION: &str = "api-version";

pub const PROFILE: RestProfile = RestProfile {
    name: "azure",
    defaults,
    is_rate_limited,
};

pub fn adapter(credentials: &dyn CredentialResolver) -> Result<RestAdapter> {
    let token = credentials.require(TOKEN_VAR)?;
    let transport = HttpTransport::new(BASE_URL, token)?;
    Ok(RestAdapter::new(PROFILE, Arc::new(transport))
        .with_context("subscriptionId", credentials.get(SUBSCRIPTION_VAR)))
}

fn defaults(_kind: &str) -> ResourceMeta {
    let collection =
        "/subscriptions/{subscriptionId}/resourceGroups/{resourceGroup}/providers/{resourceType}";
    let by_id = "{resourceId}";

    ResourceMeta {
        endpoints: Endpoints {
            list: Some(Endpoint::path(Method::Get, collection).with_query([API_VERSION])),
            get: Some(Endpoint::path(Method::Get, by_id).with_query([API_VERSION])),
            create: Some(
                Endpoint::path(Method::Put, format!("{collection}/{{name}}"))
                    .with_query([API_VERSION]),
            ),
            update: Some(Endpoint::path(Method::Put, by_id).with_query([API_VERSION])),
            delete: Some(Endpoint::path(Method::Delete, by_id).with_query([API_VERSION])),
            poll: None,
        },
        lro_style: Some(LroStyle::AzureAsync),
        update_style: Some(UpdateStyle::Put),
        pagination: Some(Pagination {
            items: "/value".to_string(),
            next: Some("/nextLink".to_string()),
            id: Some("/id".to_string()),
            mode: PageMode::Link,
        }),
        id_field: Some("/id".to_string()),
        ..Default::default()
    }
}

fn is_rate_limited(error: &CloudError) -> bool {
    error.status() == Some(429)
}
