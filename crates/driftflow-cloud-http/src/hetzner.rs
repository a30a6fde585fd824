//! Hetzner Cloud
//!
//! `Hetzner::Cloud::Server` maps to `/servers`. Mutations return an
//! `action` object polled through `/actions/{actionId}`; list responses
//! page with a numeric `page` parameter.

use crate::adapter::{RestAdapter, RestProfile, message_has, plural, snake_case, type_name};
use crate::transport::HttpTransport;
use driftflow_cloud::{
    CloudError, CredentialResolver, Endpoint, Endpoints, LroStyle, Method, PageMode, Pagination,
    ResourceMeta, Result, UpdateStyle,
};
use std::sync::Arc;

pub const BASE_URL: &str = "https://api.hetzner.cloud/v1";
pub const TOKEN_VAR: &str = "HCLOUD_TOKEN";

pub const PROFILE: RestProfile = RestProfile {
    name: "hetzner",
    defaults,
    is_rate_limited,
};

pub fn adapter(credentials: &dyn CredentialResolver) -> Result<RestAdapter> {
    let token = credentials.require(TOKEN_VAR)?;
    let transport = HttpTransport::new(BASE_URL, token)?;
    Ok(RestAdapter::new(PROFILE, Arc::new(transport)))
}

fn defaults(kind: &str) -> ResourceMeta {
    let singular = snake_case(type_name(kind));
    let collection = plural(&singular);
    let list = format!("/{collection}");
    let item = format!("/{collection}/{{resourceId}}");

    ResourceMeta {
        endpoints: Endpoints {
            list: Some(Endpoint::path(Method::Get, list.clone()).with_query(["label_selector", "name"])),
            get: Some(Endpoint::path(Method::Get, item.clone())),
            create: Some(Endpoint::path(Method::Post, list)),
            update: Some(Endpoint::path(Method::Put, item.clone())),
            delete: Some(Endpoint::path(Method::Delete, item)),
            poll: Some(Endpoint::path(Method::Get, "/actions/{actionId}")),
        },
        lro_style: Some(LroStyle::HetznerAction),
        update_style: Some(UpdateStyle::Patch),
        pagination: Some(Pagination {
            items: format!("/{collection}"),
            next: Some("/meta/pagination/next_page".to_string()),
            id: Some("/id".to_string()),
            mode: PageMode::Token {
                param: "page".to_string(),
            },
        }),
        id_field: Some("/id".to_string()),
        envelope: Some(singular),
        ..Default::default()
    }
}

fn is_rate_limited(error: &CloudError) -> bool {
    error.status() == Some(429) || message_has(error, &["rate_limit_exceeded"])
}
