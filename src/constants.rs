pub mod network {
    pub const SERVICESTAGE_BASE: &str = "https://servicestage.cn-north-4.myhuaweicloud.com";
    pub const CAE_BASE: &str = "https://cae.cn-north-4.myhuaweicloud.com";
    pub const FUNCTIONGRAPH_BASE: &str = "https://functiongraph.cn-north-4.myhuaweicloud.com";
    pub const TIMEOUT_HTTP_SECS: u64 = 60;
    pub const USER_AGENT: &str = concat!("servicestage-mcp/", env!("CARGO_PKG_VERSION"));
}

pub mod retry {
    pub const MAX_RETRIES: usize = 2;
    pub const BASE_DELAY_MS: u64 = 300;
    pub const JITTER_MS: u64 = 100;
}

pub mod poll {
    pub const PROVISION_INTERVAL_MS: u64 = 3_000;
    pub const PROVISION_TIMEOUT_MS: u64 = 300_000;
}

pub mod status {
    pub const POLL_TIMEOUT: u16 = 408;
    pub const TRANSPORT_FAILURE: u16 = 599;
}

pub mod headers {
    pub const AUTH_TOKEN: &str = "X-Auth-Token";
    pub const ENVIRONMENT_ID: &str = "X-Environment-ID";
}

pub mod spec {
    pub const DEFAULT_TENANT_PARAM: &str = "project_id";
    pub const JSON_MEDIA_TYPE: &str = "application/json";
}

pub mod protocols {
    pub const ALLOWED_HTTP: &[&str] = &["http:", "https:"];
}
