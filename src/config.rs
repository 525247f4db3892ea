use crate::types::{EffectPreset, Modulation, PlaybackSettings};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub recording: RecordingConfig,
    #[serde(default)]
    pub effects: EffectsConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// オーディオデバイス設定
///
/// # デフォルト値
///
/// - `input_device_id`: "default" (システムのデフォルト入力)
/// - `output_device_id`: "default" (システムのデフォルト出力)
/// - `exclude_device_pattern`: "" (除外なし)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AudioConfig {
    #[serde(default = "default_device_id")]
    pub input_device_id: String,
    #[serde(default = "default_device_id")]
    pub output_device_id: String,
    /// 入力デバイス一覧から除外するデバイス名の正規表現
    #[serde(default)]
    pub exclude_device_pattern: String,
}

/// 録音設定
///
/// 録音ファイルは常に同じパスに上書きされる。
///
/// # デフォルト値
///
/// - `output_dir`: ドキュメントディレクトリ配下の "pitch-perfect"
/// - `file_name`: "recordName.wav"
/// - `status_interval_ms`: 1000 ms
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RecordingConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default = "default_file_name")]
    pub file_name: String,
    #[serde(default = "default_status_interval_ms")]
    pub status_interval_ms: u64,
}

/// エフェクトプリセットの値
///
/// # デフォルト値
///
/// - `pitch_up_cents`: 1000
/// - `pitch_down_cents`: -1000
/// - `fast_rate`: 1.5
/// - `slow_rate`: 0.5
/// - `reverb_wet_dry_mix`: 50 (%)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EffectsConfig {
    #[serde(default = "default_pitch_up_cents")]
    pub pitch_up_cents: f32,
    #[serde(default = "default_pitch_down_cents")]
    pub pitch_down_cents: f32,
    #[serde(default = "default_fast_rate")]
    pub fast_rate: f32,
    #[serde(default = "default_slow_rate")]
    pub slow_rate: f32,
    #[serde(default = "default_reverb_wet_dry_mix")]
    pub reverb_wet_dry_mix: f32,
}

/// ログ出力設定
///
/// TUI動作中はログを画面ではなくファイルへ書き出す。
///
/// # デフォルト値
///
/// - `log_level`: "info"
/// - `log_file`: "pitch-perfect.log"
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_file")]
    pub log_file: String,
}

// Default functions
fn default_device_id() -> String {
    "default".to_string()
}

fn default_output_dir() -> String {
    dirs::document_dir()
        .map(|dir| dir.join("pitch-perfect"))
        .unwrap_or_else(|| PathBuf::from("./recordings"))
        .to_string_lossy()
        .into_owned()
}

fn default_file_name() -> String {
    "recordName.wav".to_string()
}

fn default_status_interval_ms() -> u64 {
    1000
}

fn default_pitch_up_cents() -> f32 {
    1000.0
}

fn default_pitch_down_cents() -> f32 {
    -1000.0
}

fn default_fast_rate() -> f32 {
    1.5
}

fn default_slow_rate() -> f32 {
    0.5
}

fn default_reverb_wet_dry_mix() -> f32 {
    50.0
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "pitch-perfect.log".to_string()
}

/// レート倍率の許容範囲
const RATE_RANGE: std::ops::RangeInclusive<f32> = (1.0 / 32.0)..=32.0;
/// ピッチシフト量の許容範囲 (セント)
const PITCH_RANGE: std::ops::RangeInclusive<f32> = -2400.0..=2400.0;

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            input_device_id: default_device_id(),
            output_device_id: default_device_id(),
            exclude_device_pattern: String::new(),
        }
    }
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            file_name: default_file_name(),
            status_interval_ms: default_status_interval_ms(),
        }
    }
}

impl Default for EffectsConfig {
    fn default() -> Self {
        Self {
            pitch_up_cents: default_pitch_up_cents(),
            pitch_down_cents: default_pitch_down_cents(),
            fast_rate: default_fast_rate(),
            slow_rate: default_slow_rate(),
            reverb_wet_dry_mix: default_reverb_wet_dry_mix(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_file: default_log_file(),
        }
    }
}

impl RecordingConfig {
    /// 録音ファイルの固定パス
    pub fn file_path(&self) -> PathBuf {
        Path::new(&self.output_dir).join(&self.file_name)
    }
}

impl EffectsConfig {
    /// プリセットに対応する再生設定
    ///
    /// どのプリセットもレート・ピッチ・エコー・リバーブのうち1つだけを有効にする。
    pub fn settings_for(&self, preset: EffectPreset) -> PlaybackSettings {
        let modulation = match preset {
            EffectPreset::PitchUp => Modulation::Pitch(self.pitch_up_cents),
            EffectPreset::PitchDown => Modulation::Pitch(self.pitch_down_cents),
            EffectPreset::Fast => Modulation::Rate(self.fast_rate),
            EffectPreset::Slow => Modulation::Rate(self.slow_rate),
            EffectPreset::Echo | EffectPreset::Reverb => Modulation::None,
        };

        PlaybackSettings {
            modulation,
            echo: preset == EffectPreset::Echo,
            reverb: preset == EffectPreset::Reverb,
        }
    }
}

impl Config {
    /// 設定ファイルから読み込み
    ///
    /// TOML形式の設定ファイルをパースしてConfig構造体を生成する。
    ///
    /// # Errors
    ///
    /// ファイルの読み込みまたはパースに失敗した場合にエラーを返す。
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use pitch_perfect::config::Config;
    /// let config = Config::from_file("config.toml").unwrap();
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("設定ファイルの読み込みに失敗: {:?}", path.as_ref()))?;
        let config: Config =
            toml::from_str(&content).with_context(|| "設定ファイルのパースに失敗")?;
        Ok(config)
    }

    /// デフォルト設定をファイルに書き出し
    ///
    /// 既存のファイルは上書きされる。
    pub fn write_default<P: AsRef<Path>>(path: P) -> Result<()> {
        let config = Config::default();
        let content =
            toml::to_string_pretty(&config).with_context(|| "設定のシリアライズに失敗")?;
        fs::write(path.as_ref(), content)
            .with_context(|| format!("設定ファイルの書き込みに失敗: {:?}", path.as_ref()))?;
        Ok(())
    }

    /// 設定ファイルがあれば読み込み、なければデフォルトを使用
    ///
    /// # Errors
    ///
    /// ファイルが存在するがパースに失敗した場合にエラーを返す。
    /// ファイルが存在しない場合はエラーにならず、デフォルト設定を返す。
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            log::warn!(
                "設定ファイルが見つかりません。デフォルト設定を使用します: {:?}",
                path.as_ref()
            );
            Ok(Config::default())
        }
    }

    /// 値の範囲を検証
    pub fn validate(&self) -> Result<()> {
        let effects = &self.effects;
        for (name, rate) in [("fast_rate", effects.fast_rate), ("slow_rate", effects.slow_rate)] {
            if !RATE_RANGE.contains(&rate) {
                bail!("effects.{} は 1/32 から 32 の範囲で指定してください: {}", name, rate);
            }
        }
        for (name, cents) in [
            ("pitch_up_cents", effects.pitch_up_cents),
            ("pitch_down_cents", effects.pitch_down_cents),
        ] {
            if !PITCH_RANGE.contains(&cents) {
                bail!("effects.{} は ±2400 セントの範囲で指定してください: {}", name, cents);
            }
        }
        if !(0.0..=100.0).contains(&effects.reverb_wet_dry_mix) {
            bail!(
                "effects.reverb_wet_dry_mix は 0 から 100 の範囲で指定してください: {}",
                effects.reverb_wet_dry_mix
            );
        }
        if self.recording.status_interval_ms == 0 {
            bail!("recording.status_interval_ms は 1 以上を指定してください");
        }
        if self.recording.file_name.is_empty() {
            bail!("recording.file_name が空です");
        }
        regex_lite::Regex::new(&self.audio.exclude_device_pattern).with_context(|| {
            format!(
                "audio.exclude_device_pattern が不正な正規表現です: {}",
                self.audio.exclude_device_pattern
            )
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.audio.input_device_id, "default");
        assert_eq!(config.recording.file_name, "recordName.wav");
        assert_eq!(config.recording.status_interval_ms, 1000);
        assert_eq!(config.effects.pitch_up_cents, 1000.0);
        assert_eq!(config.effects.pitch_down_cents, -1000.0);
        assert_eq!(config.effects.fast_rate, 1.5);
        assert_eq!(config.effects.slow_rate, 0.5);
        assert_eq!(config.effects.reverb_wet_dry_mix, 50.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_write_and_read_config() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path();

        Config::write_default(path).unwrap();

        let config = Config::from_file(path).unwrap();
        assert_eq!(config.effects.fast_rate, 1.5);
        assert_eq!(config.output.log_level, "info");
    }

    #[test]
    fn test_custom_config() {
        let toml_content = r#"
[audio]
input_device_id = "USB Microphone"
output_device_id = "Speakers"
exclude_device_pattern = "Webcam|Background"

[recording]
output_dir = "/tmp/test"
file_name = "take.wav"
status_interval_ms = 500

[effects]
pitch_up_cents = 700.0
pitch_down_cents = -500.0
fast_rate = 2.0
slow_rate = 0.25
reverb_wet_dry_mix = 80.0

[output]
log_level = "debug"
log_file = "/tmp/test.log"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::from_file(temp_file.path()).unwrap();

        assert_eq!(config.audio.input_device_id, "USB Microphone");
        assert_eq!(config.audio.output_device_id, "Speakers");
        assert_eq!(config.recording.file_path(), PathBuf::from("/tmp/test/take.wav"));
        assert_eq!(config.recording.status_interval_ms, 500);
        assert_eq!(config.effects.pitch_up_cents, 700.0);
        assert_eq!(config.effects.fast_rate, 2.0);
        assert_eq!(config.effects.reverb_wet_dry_mix, 80.0);
        assert_eq!(config.output.log_level, "debug");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_or_default_nonexistent() {
        let config = Config::load_or_default("nonexistent_file.toml").unwrap();
        assert_eq!(config.recording.file_name, "recordName.wav");
    }

    #[test]
    fn test_partial_config() {
        // 一部の設定のみ記述した場合、残りはデフォルト値が使われる
        let toml_content = r#"
[effects]
slow_rate = 0.75
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::from_file(temp_file.path()).unwrap();

        assert_eq!(config.effects.slow_rate, 0.75);
        assert_eq!(config.effects.fast_rate, 1.5);
        assert_eq!(config.audio.output_device_id, "default");
        assert_eq!(config.recording.status_interval_ms, 1000);
    }

    #[test]
    fn test_validate_rejects_out_of_range_values() {
        let mut config = Config::default();
        config.effects.slow_rate = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.effects.pitch_up_cents = 3000.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.effects.reverb_wet_dry_mix = 120.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.recording.status_interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.audio.exclude_device_pattern = "(unclosed".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_each_preset_enables_exactly_one_effect() {
        let effects = EffectsConfig::default();

        for preset in EffectPreset::ALL {
            let settings = effects.settings_for(preset);
            let active = [
                settings.modulation.pitch_cents().is_some_and(|c| c > 0.0),
                settings.modulation.pitch_cents().is_some_and(|c| c < 0.0),
                settings.modulation.rate().is_some_and(|r| r > 1.0),
                settings.modulation.rate().is_some_and(|r| r < 1.0),
                settings.echo,
                settings.reverb,
            ];
            assert_eq!(
                active.iter().filter(|&&on| on).count(),
                1,
                "{:?} must enable exactly one effect",
                preset
            );
        }

        assert_eq!(
            effects.settings_for(EffectPreset::Fast).modulation,
            Modulation::Rate(1.5)
        );
        assert_eq!(
            effects.settings_for(EffectPreset::PitchDown).modulation,
            Modulation::Pitch(-1000.0)
        );
    }
}
