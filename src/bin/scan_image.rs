use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use ultrascan::prelude::*;

/// Найти штрих-код на изображении и (по желанию) найти товар.
///
/// Примеры:
///   cargo run --bin scan_image -- photo.jpg
///   cargo run --bin scan_image -- photo.png --resolve --json
///   cargo run --bin scan_image -- --payload 5901234123457
#[derive(Parser, Debug)]
#[command(name = "scan_image", version)]
struct Args {
    /// PNG / JPEG / PGM.
    image: Option<PathBuf>,

    /// Пропустить поиск на кадре и разрешить эту строку.
    #[arg(long, conflicts_with = "image")]
    payload: Option<String>,

    /// Символика для --payload (EAN13, UPC_A, CODE128, QRCODE, CODE39 ...).
    #[arg(long, requires = "payload")]
    symbology: Option<String>,

    /// Запросить товар в каталогах.
    #[arg(long)]
    resolve: bool,

    /// JSON-конфигурация сканера.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Без паузы между вариантами предобработки.
    #[arg(long)]
    no_delay: bool,

    /// Вывод в JSON.
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => ScannerConfig::load(path)?,
        None => ScannerConfig::default(),
    };
    if args.no_delay {
        config.acquisition.inter_attempt_delay_ms = 0;
    }
    let scanner = Scanner::new(config)?;

    if let Some(payload) = &args.payload {
        let declared = args.symbology.as_deref().map(|s| match s.parse::<Symbology>() {
            Ok(sym) => sym,
            Err(never) => match never {},
        });
        print_resolution(&scanner.resolve(payload, declared), args.json)?;
        return Ok(());
    }

    let path = args
        .image
        .as_ref()
        .context("укажите файл изображения или --payload")?;
    let rgb = image::open(path)
        .with_context(|| format!("не удалось открыть {}", path.display()))?
        .to_rgb8();
    let frame = Frame::from_rgb(&rgb);

    let started = std::time::Instant::now();
    let Some(barcode) = scanner.acquire(&frame) else {
        if args.json {
            println!("null");
        } else {
            println!("Штрих-код не найден ({} мс)", ms(started.elapsed()));
        }
        std::process::exit(1);
    };

    if args.json && !args.resolve {
        println!("{}", serde_json::to_string_pretty(&barcode)?);
    } else if !args.json {
        println!("{}: {}", barcode.symbology(), barcode.payload());
        if let Some(src) = barcode.source() {
            println!(
                "  вариант {}, поворот {}°, {}",
                src.variant,
                src.rotation.degrees(),
                match src.polarity {
                    Polarity::Normal => "прямая полярность",
                    Polarity::Inverted => "инверсия",
                }
            );
        }
        println!("  время поиска: {} мс", ms(started.elapsed()));
    }

    if args.resolve {
        print_resolution(&scanner.resolve_barcode(&barcode), args.json)?;
    }
    Ok(())
}

fn print_resolution(result: &Result<Resolution, ResolutionError>, json: bool) -> Result<()> {
    if json {
        let value = match result {
            Ok(r) => serde_json::to_value(r)?,
            Err(e) => serde_json::json!({ "error": e.to_string() }),
        };
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }
    match result {
        Ok(Resolution::Product(p)) => {
            println!("Товар: {}", p.product_name);
            println!("  производитель: {}", p.company);
            println!("  категория: {}", p.category);
            if let Some(url) = &p.image_url {
                println!("  изображение: {url}");
            }
            println!("  источник: {}", p.provider);
        }
        Ok(Resolution::Content(QrContent::Url { url, protocol })) => {
            println!("Ссылка ({protocol}): {url}");
        }
        Ok(Resolution::Content(QrContent::Text { text })) => println!("Текст: {text}"),
        Ok(Resolution::Inventory(status)) => {
            println!("Склад: {} — {}", status.barcode, status.message);
        }
        Err(e) => println!("Ошибка: {e}"),
    }
    Ok(())
}

fn ms(d: Duration) -> u128 {
    d.as_millis()
}
