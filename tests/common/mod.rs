// tests/common/mod.rs
//
// Общие заглушки интеграционных тестов: скриптовый HTTP, записывающее
// ожидание, считающий декодер.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use image::GrayImage;
use ultrascan::prelude::*;

pub const ACME: &str =
    r#"{"status":1,"product":{"brands":"Acme","product_name":"Widget","categories":"Toys"}}"#;

/// Ответы по очереди; когда очередь пуста — `fallback`. Все URL записываются.
pub struct ScriptedHttp {
    script: Mutex<VecDeque<Result<HttpReply, HttpFault>>>,
    fallback: Result<HttpReply, HttpFault>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedHttp {
    pub fn new(
        script: Vec<Result<HttpReply, HttpFault>>,
        fallback: Result<HttpReply, HttpFault>,
    ) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            fallback,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn always(reply: Result<HttpReply, HttpFault>) -> Arc<Self> {
        Self::new(Vec::new(), reply)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl HttpGet for ScriptedHttp {
    fn get(&self, url: &str, _timeout: Duration) -> Result<HttpReply, HttpFault> {
        self.calls.lock().unwrap().push(url.to_owned());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

#[derive(Default)]
pub struct RecordingSleeper {
    naps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn naps(&self) -> Vec<Duration> {
        self.naps.lock().unwrap().clone()
    }

    pub fn total(&self) -> Duration {
        self.naps().iter().sum()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.naps.lock().unwrap().push(duration);
    }
}

/// Ничего не находит, только считает вызовы.
#[derive(Default)]
pub struct CountingDecoder {
    calls: AtomicUsize,
}

impl CountingDecoder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DecodePrimitive for CountingDecoder {
    fn decode(&self, _image: &GrayImage) -> Vec<RawSymbol> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Vec::new()
    }
}

pub fn ok(body: &str) -> Result<HttpReply, HttpFault> {
    Ok(HttpReply::new(200, body.as_bytes()))
}

pub fn status(code: u16) -> Result<HttpReply, HttpFault> {
    Ok(HttpReply::new(code, Vec::new()))
}

pub fn scanner_with(
    config: ScannerConfig,
    http: &Arc<ScriptedHttp>,
    sleeper: &Arc<RecordingSleeper>,
) -> Scanner {
    Scanner::builder(config)
        .http(http.clone())
        .sleeper(sleeper.clone())
        .build()
        .expect("scanner")
}

pub fn scanner(http: &Arc<ScriptedHttp>, sleeper: &Arc<RecordingSleeper>) -> Scanner {
    scanner_with(ScannerConfig::default(), http, sleeper)
}
