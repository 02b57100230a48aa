mod fingerprint;
mod lifecycle;
mod model;

pub use fingerprint::fingerprint;
pub use lifecycle::{generate_rule, LifecycleError, RuleLifecycle};
pub use model::{
    decode_scrape_config, encode_scrape_config, HighCardSeries, RelabelRule, ScrapeConfigDoc,
    ScrapeJob,
};
