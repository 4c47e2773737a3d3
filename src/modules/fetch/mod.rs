pub mod request;
pub mod resilient_fetcher;
pub mod retry_policy;
pub mod transport;

pub use request::{BrowserHeaders, FetchRequest, UpstreamResponse};
pub use resilient_fetcher::ResilientFetcher;
pub use retry_policy::{classify_status, AttemptOutcome, RetryAttempt, RetryPolicy, StatusClass};
pub use transport::{HttpTransport, ReqwestTransport};
