// src/transport/mod.rs
//
// Устойчивый транспорт к каталогам: ограниченное число попыток,
// фиксированный таймаут на попытку, паузы между повторами и `Retry-After`.

pub mod http;
pub mod payload;
pub mod retry;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::pace::{CancelFlag, Sleeper};

pub use http::{HttpFault, HttpGet, HttpReply, ReqwestHttp};
pub use payload::{recognize_product, CatalogProduct};
pub use retry::{AttemptOutcome, FetchFailure, RetryPolicy, RetryState, DEFAULT_MAX_RETRY_AFTER};

pub struct ResilientTransport {
    http: Arc<dyn HttpGet>,
    sleeper: Arc<dyn Sleeper>,
    policy: RetryPolicy,
    timeout: Duration,
    cancel: Option<CancelFlag>,
}

impl ResilientTransport {
    pub fn new(
        http: Arc<dyn HttpGet>,
        sleeper: Arc<dyn Sleeper>,
        policy: RetryPolicy,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            sleeper,
            policy,
            timeout,
            cancel: None,
        }
    }

    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    #[inline]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// GET с повторами. Отмена проверяется перед каждой попыткой.
    pub fn request(&self, url: &str) -> Result<CatalogProduct, FetchFailure> {
        let mut state = RetryState::Attempting(1);
        loop {
            state = match state {
                RetryState::Attempting(attempt) => {
                    if self.cancel.as_ref().is_some_and(CancelFlag::is_cancelled) {
                        debug!(url, attempt, "request cancelled");
                        return Err(FetchFailure::Cancelled);
                    }
                    let outcome = self.attempt(url);
                    self.policy.next(attempt, outcome)
                }
                RetryState::BackingOff { next, delay } => {
                    debug!(url, next, ?delay, "backing off before retry");
                    self.sleeper.sleep(delay);
                    RetryState::Attempting(next)
                }
                RetryState::Terminal(result) => {
                    if let Err(e) = &result {
                        if *e != FetchFailure::NotFound {
                            warn!(url, error = %e, "catalog request failed");
                        }
                    }
                    return result;
                }
            };
        }
    }

    fn attempt(&self, url: &str) -> AttemptOutcome<CatalogProduct> {
        match self.http.get(url, self.timeout) {
            Ok(reply) => match reply.status {
                200 => recognize_product(&reply.body)
                    .map_or(AttemptOutcome::NotFound, AttemptOutcome::Found),
                404 => AttemptOutcome::NotFound,
                429 => AttemptOutcome::RateLimited {
                    retry_after: reply.retry_after,
                },
                status => AttemptOutcome::Status(status),
            },
            Err(HttpFault::Timeout) => AttemptOutcome::Timeout,
            Err(HttpFault::Connect(message)) => AttemptOutcome::Connection(message),
        }
    }
}
