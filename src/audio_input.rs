use crate::config::AudioConfig;
use crate::error::{AppError, Result};
use crate::types::{AudioChunk, AudioFormat};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use crossbeam_channel::{Sender, TrySendError};
use regex_lite::Regex;

/// マイクからのモノラル音声入力
///
/// デバイスのデフォルト設定でストリームを開き、
/// 全チャンネルをモノラルにダウンミックスして `AudioChunk` として送信する。
pub struct AudioInput {
    device: cpal::Device,
    config: cpal::StreamConfig,
    sample_format: cpal::SampleFormat,
    stream: Option<cpal::Stream>,
}

impl AudioInput {
    /// 新しいAudioInputを作成
    pub fn new(config: &AudioConfig) -> Result<Self> {
        let host = cpal::default_host();

        log::debug!("設定: {:?}", config);

        // デバイスを取得
        let device = if config.input_device_id == "default" {
            host.default_input_device().ok_or_else(|| {
                AppError::DeviceUnavailable("デフォルト入力デバイスが見つかりません".to_string())
            })?
        } else {
            // デバイスIDが指定されている場合は、デバイス一覧から検索
            Self::input_devices(&config.exclude_device_pattern)?
                .into_iter()
                .find(|d| d.name().ok().as_deref() == Some(config.input_device_id.as_str()))
                .ok_or_else(|| {
                    AppError::DeviceUnavailable(format!(
                        "デバイスが見つかりません: {}",
                        config.input_device_id
                    ))
                })?
        };

        log::info!("入力デバイス: {:?}", device.name());

        // デバイスの設定を取得
        let default_config = device.default_input_config().map_err(|e| {
            AppError::DeviceUnavailable(format!("デフォルト入力設定が取得できません: {}", e))
        })?;

        log::info!(
            "デバイス設定: {:?}, {}Hz, {}ch",
            default_config.sample_format(),
            default_config.sample_rate().0,
            default_config.channels()
        );

        Ok(Self {
            device,
            sample_format: default_config.sample_format(),
            config: default_config.config(),
            stream: None,
        })
    }

    /// 送信されるチャンクのフォーマット (常にモノラル)
    pub fn format(&self) -> AudioFormat {
        AudioFormat {
            sample_rate: self.config.sample_rate.0,
            channels: 1,
        }
    }

    /// ストリームを開始
    ///
    /// # Arguments
    /// * `sender` - チャンクの送信先。満杯の場合はチャンクを破棄する
    pub fn start(&mut self, sender: Sender<AudioChunk>) -> Result<()> {
        let stream = match self.sample_format {
            cpal::SampleFormat::F32 => self.build_stream::<f32>(sender)?,
            cpal::SampleFormat::I16 => self.build_stream::<i16>(sender)?,
            cpal::SampleFormat::U16 => self.build_stream::<u16>(sender)?,
            cpal::SampleFormat::I32 => self.build_stream::<i32>(sender)?,
            other => {
                return Err(AppError::DeviceUnavailable(format!(
                    "サポートされていないサンプルフォーマット: {:?}",
                    other
                )))
            }
        };

        stream.play().map_err(AppError::from_input_play)?;
        self.stream = Some(stream);

        log::info!("音声入力ストリームを開始しました");

        Ok(())
    }

    /// ストリームを構築
    fn build_stream<T>(&self, sender: Sender<AudioChunk>) -> Result<cpal::Stream>
    where
        T: SizedSample + Send + 'static,
        f32: FromSample<T>,
    {
        let num_channels = self.config.channels.max(1) as usize;
        let format = self.format();

        let data_callback = move |data: &[T], _info: &cpal::InputCallbackInfo| {
            // インターリーブされたフレームをモノラルに平均化
            let samples = data
                .chunks(num_channels)
                .map(|frame| {
                    let sum: f32 = frame
                        .iter()
                        .map(|&sample| f32::from_sample(sample))
                        .sum();
                    let mixed = (sum / frame.len() as f32).clamp(-1.0, 1.0);
                    (mixed * i16::MAX as f32) as i16
                })
                .collect();

            // 非同期送信（ブロッキングしない）
            match sender.try_send(AudioChunk { samples, format }) {
                Ok(_) => {}
                Err(TrySendError::Full(_)) => {
                    log::warn!("入力チャンクの送信失敗: バッファ満杯");
                }
                Err(TrySendError::Disconnected(_)) => {
                    log::debug!("入力チャンクの送信失敗: 受信側が終了");
                }
            }
        };

        let error_callback = move |err| {
            log::error!("ストリームエラー: {}", err);
        };

        self.device
            .build_input_stream(&self.config, data_callback, error_callback, None)
            .map_err(AppError::from_input_stream)
    }

    /// ストリームを停止
    pub fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            log::info!("音声入力ストリームを停止しました");
        }
    }

    /// デバイス一覧を表示
    pub fn list_devices(exclude_pattern: &str) -> anyhow::Result<()> {
        let host = cpal::default_host();
        let default_name = host.default_input_device().and_then(|d| d.name().ok());
        println!("=== 利用可能な入力デバイス ===");

        for (idx, device) in Self::input_devices(exclude_pattern)?.into_iter().enumerate() {
            let name = device.name()?;
            let marker = if default_name.as_deref() == Some(name.as_str()) {
                " (デフォルト)"
            } else {
                ""
            };
            println!("  [{}] {}{}", idx, name, marker);

            device.supported_input_configs()?.for_each(|config_range| {
                println!(
                    "      フォーマット: {:?}, {}-{}Hz, {}ch",
                    config_range.sample_format(),
                    config_range.min_sample_rate().0,
                    config_range.max_sample_rate().0,
                    config_range.channels()
                );
            });
        }
        println!();

        Ok(())
    }

    /// 除外パターンに一致するデバイスを除いた入力デバイス一覧を取得
    fn input_devices(exclude_pattern: &str) -> Result<Vec<cpal::Device>> {
        let host = cpal::default_host();
        let excluded = if exclude_pattern.is_empty() {
            None
        } else {
            Some(Regex::new(exclude_pattern).map_err(|e| {
                AppError::DeviceUnavailable(format!("除外パターンが不正です: {}", e))
            })?)
        };

        let devices = host
            .input_devices()
            .map_err(|e| AppError::DeviceUnavailable(e.to_string()))?
            .filter(|device| match (&excluded, device.name()) {
                (Some(regex), Ok(name)) => !regex.is_match(&name),
                _ => true,
            })
            .collect();
        Ok(devices)
    }
}

impl Drop for AudioInput {
    fn drop(&mut self) {
        self.stop();
    }
}
