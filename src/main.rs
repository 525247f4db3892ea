use anyhow::{Context, Result};
use env_logger::{Env, Target};
use pitch_perfect::audio_input::AudioInput;
use pitch_perfect::audio_output::AudioOutput;
use pitch_perfect::config::Config;
use pitch_perfect::tui::TuiApp;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

fn main() -> Result<()> {
    // コマンドライン引数をパース
    let args: Vec<String> = std::env::args().collect();

    // デバイス一覧表示モード
    if args.len() > 1 && args[1] == "--show-interfaces" {
        env_logger::Builder::from_env(Env::default().default_filter_or("warn"))
            .format_timestamp(None)
            .init();
        let config = Config::load_or_default("config.toml")?;
        AudioInput::list_devices(&config.audio.exclude_device_pattern)?;
        AudioOutput::list_devices()?;
        return Ok(());
    }

    // 設定ファイル生成モード
    if args.len() > 1 && args[1] == "--generate-config" {
        let config_path = if args.len() > 2 {
            &args[2]
        } else {
            "config.toml"
        };
        Config::write_default(config_path)?;
        println!("設定ファイルを生成しました: {}", config_path);
        return Ok(());
    }

    // 設定ファイルのパス
    let config_path = if args.len() > 1 && !args[1].starts_with("--") {
        &args[1]
    } else {
        "config.toml"
    };

    // 設定を読み込み
    let config = Config::load_or_default(config_path)?;
    config.validate()?;

    // TUIが端末を使うため、ログはファイルへ書き出す
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.output.log_file)
        .with_context(|| format!("ログファイルを開けません: {}", config.output.log_file))?;
    env_logger::Builder::from_env(Env::default().default_filter_or(config.output.log_level.as_str()))
        .target(Target::Pipe(Box::new(log_file)))
        .init();

    log::info!("pitch-perfect を起動します");
    // 読み込み時点ではロガーが未初期化のため、ここで改めて警告する
    if let Some(warning) = missing_config_warning(config_path) {
        log::warn!("{}", warning);
    }
    log::info!("設定: {:?}", config);

    // Ctrl+C ハンドラを設定
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = running.clone();
    ctrlc::set_handler(move || {
        log::info!("停止シグナルを受信しました...");
        running_clone.store(false, Ordering::SeqCst);
    })?;

    let mut app = TuiApp::new(config, running);
    app.run()?;

    log::info!("pitch-perfect を終了しました");
    Ok(())
}

/// 設定ファイルが無い場合の警告文
fn missing_config_warning(config_path: &str) -> Option<String> {
    (!Path::new(config_path).exists()).then(|| {
        format!(
            "設定ファイルが見つかりません。デフォルト設定を使用します: {}",
            config_path
        )
    })
}
