// src/transport/retry.rs
//
// Повторы как явный автомат состояний. Здесь нет ни ввода-вывода, ни сна:
// `RetryPolicy::next` по номеру попытки и её исходу говорит, что делать дальше.

use std::time::Duration;

use thiserror::Error;

/// Исход одной попытки, уже разобранный транспортом.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttemptOutcome<T> {
    Found(T),
    /// 404 или 200 без распознанного товара.
    NotFound,
    /// 429; `retry_after` из заголовка, если был.
    RateLimited { retry_after: Option<Duration> },
    /// Любой другой HTTP-статус.
    Status(u16),
    Timeout,
    Connection(String),
}

/// Окончательная неудача запроса к одному источнику.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum FetchFailure {
    #[error("not found")]
    NotFound,
    #[error("timed out after {attempts} attempt(s)")]
    Timeout { attempts: u32 },
    #[error("connection failed after {attempts} attempt(s): {message}")]
    Connection { attempts: u32, message: String },
    #[error("rate limited after {attempts} attempt(s)")]
    RateLimited { attempts: u32 },
    #[error("unexpected HTTP {status} after {attempts} attempt(s)")]
    UnexpectedStatus { status: u16, attempts: u32 },
    #[error("cancelled")]
    Cancelled,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RetryState<T> {
    /// Выполнить попытку с номером `n` (с единицы).
    Attempting(u32),
    /// Подождать `delay`, затем попытка `next`.
    BackingOff { next: u32, delay: Duration },
    Terminal(Result<T, FetchFailure>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    retry_delay: Duration,
    max_retry_after: Duration,
}

/// Самый долгий `Retry-After`, который ещё стоит ждать.
pub const DEFAULT_MAX_RETRY_AFTER: Duration = Duration::from_secs(60);

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

impl RetryPolicy {
    /// `max_attempts` меньше единицы поднимается до единицы.
    #[inline]
    pub fn new(max_attempts: u32, retry_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            retry_delay,
            max_retry_after: DEFAULT_MAX_RETRY_AFTER,
        }
    }

    /// `Retry-After` длиннее этого завершает запрос как `RateLimited`.
    #[must_use]
    #[inline]
    pub fn with_max_retry_after(mut self, max_retry_after: Duration) -> Self {
        self.max_retry_after = max_retry_after;
        self
    }

    #[inline]
    pub fn max_retry_after(&self) -> Duration {
        self.max_retry_after
    }

    #[inline]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    #[inline]
    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    /// Переход после попытки `attempt`. После последней попытки всегда
    /// `Terminal`, без ожидания.
    pub fn next<T>(&self, attempt: u32, outcome: AttemptOutcome<T>) -> RetryState<T> {
        let exhausted = attempt >= self.max_attempts;
        let retry = |delay: Duration, failure: FetchFailure| {
            if exhausted {
                RetryState::Terminal(Err(failure))
            } else {
                RetryState::BackingOff {
                    next: attempt + 1,
                    delay,
                }
            }
        };
        match outcome {
            AttemptOutcome::Found(value) => RetryState::Terminal(Ok(value)),
            AttemptOutcome::NotFound => RetryState::Terminal(Err(FetchFailure::NotFound)),
            AttemptOutcome::RateLimited { retry_after: Some(delay) }
                if delay > self.max_retry_after =>
            {
                RetryState::Terminal(Err(FetchFailure::RateLimited { attempts: attempt }))
            }
            AttemptOutcome::RateLimited { retry_after } => retry(
                retry_after.unwrap_or(self.retry_delay),
                FetchFailure::RateLimited { attempts: attempt },
            ),
            AttemptOutcome::Status(status) => retry(
                self.retry_delay,
                FetchFailure::UnexpectedStatus {
                    status,
                    attempts: attempt,
                },
            ),
            AttemptOutcome::Timeout => {
                retry(self.retry_delay, FetchFailure::Timeout { attempts: attempt })
            }
            AttemptOutcome::Connection(message) => retry(
                self.retry_delay,
                FetchFailure::Connection {
                    attempts: attempt,
                    message,
                },
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_secs(1))
    }

    #[test]
    fn success_and_not_found_are_terminal_immediately() {
        assert_eq!(
            policy().next(1, AttemptOutcome::Found("x")),
            RetryState::Terminal(Ok("x"))
        );
        assert_eq!(
            policy().next::<()>(1, AttemptOutcome::NotFound),
            RetryState::Terminal(Err(FetchFailure::NotFound))
        );
    }

    #[test]
    fn rate_limit_honours_retry_after_then_gives_up() {
        let p = policy();
        assert_eq!(
            p.next::<()>(
                1,
                AttemptOutcome::RateLimited {
                    retry_after: Some(Duration::from_secs(7))
                }
            ),
            RetryState::BackingOff {
                next: 2,
                delay: Duration::from_secs(7)
            }
        );
        assert_eq!(
            p.next::<()>(2, AttemptOutcome::RateLimited { retry_after: None }),
            RetryState::BackingOff {
                next: 3,
                delay: Duration::from_secs(1)
            }
        );
        assert_eq!(
            p.next::<()>(3, AttemptOutcome::RateLimited { retry_after: None }),
            RetryState::Terminal(Err(FetchFailure::RateLimited { attempts: 3 }))
        );
    }

    #[test]
    fn retry_after_beyond_ceiling_ends_immediately() {
        let p = policy();
        assert_eq!(p.max_retry_after(), Duration::from_secs(60));
        assert_eq!(
            p.next::<()>(
                1,
                AttemptOutcome::RateLimited {
                    retry_after: Some(Duration::from_secs(86_400))
                }
            ),
            RetryState::Terminal(Err(FetchFailure::RateLimited { attempts: 1 }))
        );
        // ровно на потолке ещё ждём
        assert_eq!(
            p.next::<()>(
                1,
                AttemptOutcome::RateLimited {
                    retry_after: Some(Duration::from_secs(60))
                }
            ),
            RetryState::BackingOff {
                next: 2,
                delay: Duration::from_secs(60)
            }
        );

        let strict = policy().with_max_retry_after(Duration::from_secs(5));
        assert!(matches!(
            strict.next::<()>(
                2,
                AttemptOutcome::RateLimited {
                    retry_after: Some(Duration::from_secs(6))
                }
            ),
            RetryState::Terminal(Err(FetchFailure::RateLimited { attempts: 2 }))
        ));
    }

    #[test]
    fn transient_faults_carry_attempt_count() {
        let p = RetryPolicy::new(2, Duration::from_millis(10));
        assert!(matches!(
            p.next::<()>(1, AttemptOutcome::Timeout),
            RetryState::BackingOff { next: 2, .. }
        ));
        assert_eq!(
            p.next::<()>(2, AttemptOutcome::Connection("refused".into())),
            RetryState::Terminal(Err(FetchFailure::Connection {
                attempts: 2,
                message: "refused".into()
            }))
        );
        assert_eq!(
            p.next::<()>(2, AttemptOutcome::Status(503)),
            RetryState::Terminal(Err(FetchFailure::UnexpectedStatus {
                status: 503,
                attempts: 2
            }))
        );
    }

    #[test]
    fn single_attempt_policy_never_backs_off() {
        let p = RetryPolicy::new(0, Duration::from_secs(1));
        assert_eq!(p.max_attempts(), 1);
        assert_eq!(
            p.next::<()>(1, AttemptOutcome::Timeout),
            RetryState::Terminal(Err(FetchFailure::Timeout { attempts: 1 }))
        );
    }
}
