use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;
use ultrascan::prelude::*;
use ultrascan::synth;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Kind {
    /// EAN-13 (13 цифр) или UPC-A (12 цифр).
    Ean,
    Code128,
}

/// Сгенерировать синтетический штрих-код и прогнать через поиск.
///
/// По умолчанию — EAN-13 5901234123457, модуль 3 px, высота 200 px.
///
/// Примеры:
///   cargo run --bin scan_synthetic --
///   cargo run --bin scan_synthetic -- --code 036000291452
///   cargo run --bin scan_synthetic -- --kind code128 --code abc123 --write out.png
#[derive(Parser, Debug)]
#[command(name = "scan_synthetic", version)]
struct Args {
    #[arg(long, value_enum, default_value_t = Kind::Ean)]
    kind: Kind,

    #[arg(long, default_value = "5901234123457")]
    code: String,

    /// Набор Code 128: A, B или C.
    #[arg(long, default_value_t = 'B')]
    set: char,

    /// Ширина модуля, px.
    #[arg(long, default_value_t = 3)]
    unit: usize,

    /// Высота картинки, px.
    #[arg(long, default_value_t = 200)]
    height: u32,

    /// Повернуть на 90° перед поиском.
    #[arg(long)]
    rotate: bool,

    /// Сохранить картинку (формат по расширению).
    #[arg(long)]
    write: Option<PathBuf>,

    /// Запросить товар в каталогах.
    #[arg(long)]
    resolve: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut img = match args.kind {
        Kind::Ean => synth::ean13_image(&args.code, args.unit, args.height)?,
        Kind::Code128 => synth::code128_image(&args.code, args.set, args.unit, args.height)?,
    };
    if args.rotate {
        img = image::imageops::rotate90(&img);
    }
    if let Some(path) = &args.write {
        img.save(path)?;
        println!("Картинка сохранена: {}", path.display());
    }

    let mut config = ScannerConfig::default();
    config.acquisition.inter_attempt_delay_ms = 0;
    let scanner = Scanner::new(config)?;

    let frame = Frame::from_luma(&img);
    let Some(barcode) = scanner.acquire(&frame) else {
        bail!("ничего не распознано");
    };
    println!("{}: {}", barcode.symbology(), barcode.payload());

    if args.resolve {
        match scanner.resolve_barcode(&barcode) {
            Ok(resolution) => println!("{}", serde_json::to_string_pretty(&resolution)?),
            Err(e) => println!("Ошибка: {e}"),
        }
    }
    Ok(())
}
