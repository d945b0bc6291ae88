use std::env;
use std::fs;
use std::path::PathBuf;

use jinja_lens::{Driver, EngineConfig};
use log::LevelFilter;
use simple_logger::SimpleLogger;

fn main() {
    // 日志写到 stderr，RUST_LOG 可以覆盖级别
    if let Err(e) = SimpleLogger::new().with_level(LevelFilter::Warn).env().init() {
        eprintln!("logger: {}", e);
    }

    // 1. 命令行参数：[--config file.json] <files or directories...>
    let mut args = env::args().skip(1);
    let mut config = EngineConfig::default();
    let mut paths = Vec::new();
    while let Some(arg) = args.next() {
        if arg == "--config" {
            let Some(config_path) = args.next() else {
                eprintln!("Error: --config needs a file");
                std::process::exit(2);
            };
            config = match fs::read_to_string(&config_path)
                .map_err(|e| e.to_string())
                .and_then(|text| EngineConfig::from_json_str(&text).map_err(|e| e.to_string()))
            {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Error: {}: {}", config_path, e);
                    std::process::exit(2);
                }
            };
        } else {
            paths.push(PathBuf::from(arg));
        }
    }

    if paths.is_empty() {
        println!("Usage: jinja-lens [--config config.json] <templates, backend files or directories...>");
        return;
    }

    // 2. 检查
    let mut driver = Driver::new(config);
    match driver.check_files(&paths) {
        Ok(diagnostics) if diagnostics.is_empty() => {}
        Ok(diagnostics) => {
            eprintln!("{}", diagnostics.join("\n\n"));
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    }
}
