//! DigitalOcean
//!
//! `DigitalOcean::Droplet` maps to the `/droplets` collection with bodies
//! wrapped in a `droplet` envelope. Droplet actions are polled through
//! `/actions/{actionId}`.

use crate::adapter::{RestAdapter, RestProfile, plural, snake_case, type_name};
use crate::transport::HttpTransport;
use driftflow_cloud::{
    CloudError, CredentialResolver, Endpoint, Endpoints, LroStyle, Method, PageMode, Pagination,
    ResourceMeta, Result, UpdateStyle,
};
use std::sync::Arc;

pub const BASE_URL: &str = "https://api.digitalocean.com/v2";
pub const TOKEN_VAR: &str = "DIGITALOCEAN_TOKEN";

pub const PROFILE: RestProfile = RestProfile {
    name: "digitalocean",
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
            list: Some(Endpoint::path(Method::Get, list.clone()).with_query(["tag_name"])),
            get: Some(Endpoint::path(Method::Get, item.clone())),
            create: Some(Endpoint::path(Method::Post, list)),
            update: Some(Endpoint::path(Method::Put, item.clone())),
            delete: Some(Endpoint::path(Method::Delete, item)),
            poll: Some(Endpoint::path(Method::Get, "/actions/{actionId}")),
        },
        lro_style: Some(LroStyle::DigitalOceanAction),
        update_style: Some(UpdateStyle::Put),
        pagination: Some(Pagination {
            items: format!("/{collection}"),
            next: Some("/links/pages/next".to_string()),
            id: Some("/id".to_string()),
            mode: PageMode::Link,
        }),
        id_field: Some("/id".to_string()),
        envelope: Some(singular),
        ..Default::default()
    }
}

fn is_rate_limited(error: &CloudError) -> bool {
    error.status() == Some(429)
}
