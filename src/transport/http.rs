// src/transport/http.rs
//
// Шов для HTTP. Транспорт видит только `HttpGet`; в тестах — скриптовые
// заглушки, в бою — блокирующий клиент reqwest.

use std::time::Duration;

use reqwest::header::RETRY_AFTER;
use thiserror::Error;

/// Ответ сервера: статус, `Retry-After` (если разобрался) и тело.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub retry_after: Option<Duration>,
    pub body: Vec<u8>,
}

impl HttpReply {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            retry_after: None,
            body: body.into(),
        }
    }

    #[must_use]
    pub fn with_retry_after(mut self, delay: Duration) -> Self {
        self.retry_after = Some(delay);
        self
    }
}

/// Ответа не было вовсе.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum HttpFault {
    #[error("request timed out")]
    Timeout,
    #[error("connection failed: {0}")]
    Connect(String),
}

pub trait HttpGet: Send + Sync {
    fn get(&self, url: &str, timeout: Duration) -> Result<HttpReply, HttpFault>;
}

/// Блокирующий клиент reqwest.
#[derive(Clone, Debug)]
pub struct ReqwestHttp {
    client: reqwest::blocking::Client,
}

impl ReqwestHttp {
    pub fn new(user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }
}

impl HttpGet for ReqwestHttp {
    fn get(&self, url: &str, timeout: Duration) -> Result<HttpReply, HttpFault> {
        let resp = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .map_err(fault)?;
        let status = resp.status().as_u16();
        let retry_after = resp
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after);
        let body = resp.bytes().map_err(fault)?.to_vec();
        Ok(HttpReply {
            status,
            retry_after,
            body,
        })
    }
}

fn fault(e: reqwest::Error) -> HttpFault {
    if e.is_timeout() {
        HttpFault::Timeout
    } else {
        HttpFault::Connect(e.to_string())
    }
}

/// `Retry-After` в форме delta-seconds. HTTP-дата не поддерживается:
/// тогда берётся обычная задержка повтора.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_after_seconds_only() {
        assert_eq!(parse_retry_after(" 2 "), Some(Duration::from_secs(2)));
        assert_eq!(parse_retry_after("0"), Some(Duration::ZERO));
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"), None);
        assert_eq!(parse_retry_after("-1"), None);
    }
}
