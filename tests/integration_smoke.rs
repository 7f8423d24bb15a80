// tests/integration_smoke.rs
//
// Интеграционные «дымовые» тесты верхнего уровня: синтетический кадр →
// поиск → проверенный штрих-код (→ товар).

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use common::{ok, scanner_with, CountingDecoder, RecordingSleeper, ScriptedHttp, ACME};
use ultrascan::prelude::*;
use ultrascan::synth;

fn fast_config() -> ScannerConfig {
    let mut config = ScannerConfig::default();
    config.acquisition.inter_attempt_delay_ms = 0;
    config
}

#[test]
fn synthetic_ean13_is_acquired() {
    // 113 модулей × 7 px = 791 px: кадр не апскейлится
    let img = synth::ean13_image("5901234123457", 7, 200).unwrap();
    let http = ScriptedHttp::always(ok(ACME));
    let sleeper = RecordingSleeper::new();
    let scanner = scanner_with(fast_config(), &http, &sleeper);

    let found = scanner.acquire(&Frame::from_luma(&img)).expect("barcode");
    assert_eq!(found.payload(), "5901234123457");
    assert_eq!(found.symbology(), &Symbology::Ean13);
    assert!(found.source().is_some());
}

#[test]
fn rotated_barcode_is_found_by_the_grid() {
    let img = synth::ean13_image("5901234123457", 7, 200).unwrap();
    let rotated = image::imageops::rotate90(&img);
    let mut config = fast_config();
    config.acquisition.min_frame_width = 100;
    let http = ScriptedHttp::always(ok(ACME));
    let sleeper = RecordingSleeper::new();
    let scanner = scanner_with(config, &http, &sleeper);

    let found = scanner.acquire(&Frame::from_luma(&rotated)).expect("barcode");
    assert_eq!(found.payload(), "5901234123457");
    // повернули на 90° по часовой — обратно ещё 270°
    assert_eq!(found.source().map(|s| s.rotation), Some(Rotation::Rot270));
}

#[test]
fn parallel_grid_finds_the_same_barcode() {
    let img = synth::ean13_image("5901234123457", 7, 200).unwrap();
    let rotated = image::imageops::rotate90(&img);
    let frame = Frame::from_luma(&rotated);
    let http = ScriptedHttp::always(ok(ACME));
    let sleeper = RecordingSleeper::new();

    let mut config = fast_config();
    config.acquisition.min_frame_width = 100;
    let sequential = scanner_with(config.clone(), &http, &sleeper).acquire(&frame);
    config.acquisition.parallel_grid = true;
    let parallel = scanner_with(config, &http, &sleeper).acquire(&frame);

    assert!(parallel.is_some());
    assert_eq!(parallel, sequential);
}

#[test]
fn synthetic_code128_is_acquired() {
    let img = synth::code128_image("abc123", 'B', 6, 200).unwrap();
    let http = ScriptedHttp::always(ok(ACME));
    let sleeper = RecordingSleeper::new();
    let scanner = scanner_with(fast_config(), &http, &sleeper);

    let found = scanner.acquire(&Frame::from_luma(&img)).expect("barcode");
    assert_eq!(found.payload(), "abc123");
    assert_eq!(found.symbology(), &Symbology::Code128);
}

#[test]
fn blank_frame_exhausts_every_cell() {
    let decoder = Arc::new(CountingDecoder::default());
    let sleeper = RecordingSleeper::new();
    let scanner = Scanner::builder(ScannerConfig::default())
        .decoder(decoder.clone())
        .http(ScriptedHttp::always(ok(ACME)))
        .sleeper(sleeper.clone())
        .build()
        .unwrap();

    let buf = vec![255u8; 640 * 120];
    let frame = Frame::gray(&buf, 640, 120).unwrap();
    assert!(scanner.acquire(&frame).is_none());

    let variants = scanner.config().acquisition.plan.len();
    assert_eq!(decoder.calls(), variants * 4 * 2);
    // пауза между вариантами, после последнего — нет
    assert_eq!(sleeper.naps(), vec![Duration::from_secs(1); variants - 1]);
}

#[test]
fn rgb_frames_are_accepted() {
    let gray = synth::ean13_image("036000291452", 7, 200).unwrap();
    let rgb = image::DynamicImage::ImageLuma8(gray).to_rgb8();
    let http = ScriptedHttp::always(ok(ACME));
    let sleeper = RecordingSleeper::new();
    let scanner = scanner_with(fast_config(), &http, &sleeper);

    let found = scanner.acquire(&Frame::from_rgb(&rgb)).expect("barcode");
    assert_eq!(found.payload(), "036000291452");
    assert_eq!(found.symbology(), &Symbology::UpcA);
}

#[test]
fn acquired_barcode_resolves_to_product() {
    let img = synth::ean13_image("5901234123457", 7, 200).unwrap();
    let http = ScriptedHttp::always(ok(ACME));
    let sleeper = RecordingSleeper::new();
    let scanner = scanner_with(fast_config(), &http, &sleeper);

    let barcode = scanner.acquire(&Frame::from_luma(&img)).expect("barcode");
    match scanner.resolve_barcode(&barcode) {
        Ok(Resolution::Product(p)) => {
            assert_eq!(p.company, "Acme");
            assert_eq!(p.barcode, "5901234123457");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn cadence_throttles_until_interval_elapsed() {
    let img = synth::ean13_image("5901234123457", 7, 200).unwrap();
    let http = ScriptedHttp::always(ok(ACME));
    let sleeper = RecordingSleeper::new();
    let scanner = scanner_with(fast_config(), &http, &sleeper);
    let frame = Frame::from_luma(&img);
    let t0 = Instant::now();

    let (first, cadence) = scanner.acquire_paced(&frame, scanner.cadence(), t0);
    assert!(matches!(first, AcquireOutcome::Found(_)));

    let (second, _) = scanner.acquire_paced(&frame, cadence, t0 + Duration::from_secs(1));
    assert_eq!(second, AcquireOutcome::Throttled);

    let (third, _) = scanner.acquire_paced(&frame, cadence, t0 + Duration::from_secs(2));
    assert!(matches!(third, AcquireOutcome::Found(_)));
}
