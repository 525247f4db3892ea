use crate::config::AudioConfig;
use crate::error::{AppError, Result};
use crate::graph::Renderer;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use std::sync::{Arc, Mutex};

/// 音声出力デバイスマネージャ
///
/// デバイスのデフォルト設定でストリームを開き、レンダラーのモノラル出力を全チャンネルに複製する。
pub struct AudioOutput {
    device: Device,
    config: StreamConfig,
    sample_format: SampleFormat,
    stream: Option<Stream>,
}

impl AudioOutput {
    /// 新しいAudioOutputを作成
    pub fn new(config: &AudioConfig) -> Result<Self> {
        let host = cpal::default_host();

        // デバイスを選択
        let device = if config.output_device_id == "default" {
            host.default_output_device().ok_or_else(|| {
                AppError::DeviceUnavailable("デフォルト出力デバイスが見つかりません".to_string())
            })?
        } else {
            host.output_devices()
                .map_err(|e| AppError::DeviceUnavailable(e.to_string()))?
                .find(|d| d.name().map(|n| n == config.output_device_id).unwrap_or(false))
                .ok_or_else(|| {
                    AppError::DeviceUnavailable(format!(
                        "出力デバイス '{}' が見つかりません",
                        config.output_device_id
                    ))
                })?
        };

        log::info!("出力デバイス: {:?}", device.name());

        let default_config = device.default_output_config().map_err(|e| {
            AppError::DeviceUnavailable(format!("デフォルト出力設定が取得できません: {}", e))
        })?;

        log::info!(
            "出力デバイス設定: {:?}, {}Hz, {}ch",
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

    /// 出力ストリームのサンプルレート
    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    /// デバイス一覧を表示
    pub fn list_devices() -> anyhow::Result<()> {
        let host = cpal::default_host();
        println!("=== 利用可能な出力デバイス ===");

        for (idx, device) in host.output_devices()?.enumerate() {
            let name = device.name()?;
            let is_default = host
                .default_output_device()
                .and_then(|d| d.name().ok())
                .map(|default_name| default_name == name)
                .unwrap_or(false);

            let marker = if is_default { " (デフォルト)" } else { "" };
            println!("  [{}] {}{}", idx, name, marker);

            if let Ok(config) = device.default_output_config() {
                println!(
                    "      サンプルレート: {} Hz, チャンネル数: {}",
                    config.sample_rate().0,
                    config.channels()
                );
            }
        }

        Ok(())
    }

    /// レンダラーを駆動する出力ストリームを開始
    pub fn start(&mut self, renderer: Arc<Mutex<Renderer>>) -> Result<()> {
        // デバイスのサンプルフォーマットに応じてストリームを構築
        let stream = match self.sample_format {
            SampleFormat::F32 => self.build_stream::<f32>(renderer)?,
            SampleFormat::I16 => self.build_stream::<i16>(renderer)?,
            SampleFormat::U16 => self.build_stream::<u16>(renderer)?,
            SampleFormat::I32 => self.build_stream::<i32>(renderer)?,
            other => {
                return Err(AppError::EngineStartFailed(format!(
                    "サポートされていないサンプルフォーマット: {:?}",
                    other
                )))
            }
        };

        stream
            .play()
            .map_err(|e| AppError::EngineStartFailed(format!("ストリームの再生開始に失敗: {}", e)))?;

        log::info!(
            "出力ストリーム開始: サンプルレート={}Hz, チャンネル={}",
            self.config.sample_rate.0,
            self.config.channels
        );

        self.stream = Some(stream);
        Ok(())
    }

    /// 指定されたサンプルフォーマットで出力ストリームを構築
    fn build_stream<T>(&self, renderer: Arc<Mutex<Renderer>>) -> Result<Stream>
    where
        T: SizedSample + Sample + FromSample<f32> + Send + 'static,
    {
        let channels = self.config.channels.max(1) as usize;
        let mut mono: Vec<f32> = Vec::new();

        self.device
            .build_output_stream(
                &self.config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    let frames = data.len() / channels;
                    mono.resize(frames, 0.0);

                    match renderer.lock() {
                        Ok(mut renderer) => renderer.render(&mut mono),
                        Err(_) => mono.fill(0.0),
                    }

                    for (frame, &value) in data.chunks_mut(channels).zip(mono.iter()) {
                        let sample = T::from_sample(value.clamp(-1.0, 1.0));
                        frame.fill(sample);
                    }
                },
                move |err| {
                    log::error!("出力ストリームエラー: {}", err);
                },
                None,
            )
            .map_err(|e| AppError::EngineStartFailed(format!("出力ストリームの構築に失敗: {}", e)))
    }

    /// 音声ストリームを停止
    pub fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            log::info!("出力ストリームを停止しました");
        }
    }
}

/// レンダラーを駆動する出力先
///
/// 再生セッションはこのトレイト越しにデバイスを扱う。
pub trait OutputSink {
    /// 出力のサンプルレート
    fn sample_rate(&self) -> u32;
    /// レンダラーの駆動を開始する。戻った時点で再生が始まっている
    fn start(&mut self, renderer: Arc<Mutex<Renderer>>) -> Result<()>;
    fn stop(&mut self);
}

/// 設定から出力先を開く関数
pub type OutputOpener = fn(&AudioConfig) -> Result<Box<dyn OutputSink>>;

/// 設定された出力デバイスを開く
pub fn open_device(config: &AudioConfig) -> Result<Box<dyn OutputSink>> {
    Ok(Box::new(AudioOutput::new(config)?))
}

impl OutputSink for AudioOutput {
    fn sample_rate(&self) -> u32 {
        AudioOutput::sample_rate(self)
    }

    fn start(&mut self, renderer: Arc<Mutex<Renderer>>) -> Result<()> {
        AudioOutput::start(self, renderer)
    }

    fn stop(&mut self) {
        AudioOutput::stop(self)
    }
}

impl Drop for AudioOutput {
    fn drop(&mut self) {
        self.stop();
    }
}
