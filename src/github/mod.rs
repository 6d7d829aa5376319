//! GitHub API gateway.
//!
//! | Module        | Contents                                            |
//! |---------------|-----------------------------------------------------|
//! | `transport`   | `Transport` trait and the `reqwest` implementation  |
//! | `rate_limit`  | quota state shared by all workers                   |
//! | `retry`       | bounded retry policy                                |
//! | `pagination`  | `Link` header parsing and lazy `Pages`              |
//! | `wire`        | raw payloads mapped into domain records             |
//! | `gateway`     | `Gateway`: reads, retries and the two writes        |

pub mod gateway;
pub mod pagination;
pub mod rate_limit;
pub mod retry;
pub mod transport;
pub mod wire;

pub use gateway::{DEFAULT_API_URL, Gateway, GatewayConfig, MutationResult};
pub use pagination::{Pages, parse_next_link};
pub use rate_limit::{RateLimitState, RateLimiter};
pub use retry::RetryPolicy;
pub use transport::{ApiRequest, ApiResponse, HttpMethod, ReqwestTransport, ResponseMeta, Transport};
