use crate::audio_file::{AudioFile, Playhead};
use crate::audio_output::{self, OutputOpener, OutputSink};
use crate::completion::{remaining_duration, CompletionTimer};
use crate::config::{AudioConfig, EffectsConfig};
use crate::error::Result;
use crate::graph::{PlaybackGraph, Renderer};
use crate::types::{EffectPreset, PlaybackSettings};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// エフェクトボタン群の状態
///
/// 再生中は全ボタンが無効になり、再生終了で一度だけ有効に戻る。
#[derive(Debug)]
pub struct EffectPanel {
    enabled: bool,
    active: Option<EffectPreset>,
}

impl EffectPanel {
    pub fn new() -> Self {
        Self {
            enabled: true,
            active: None,
        }
    }

    /// ボタンを押す。無効状態なら `false`
    pub fn press(&mut self, preset: EffectPreset) -> bool {
        if !self.enabled {
            return false;
        }
        self.enabled = false;
        self.active = Some(preset);
        true
    }

    /// ボタンを有効に戻す。無効→有効に変わった場合のみ `true`
    pub fn release(&mut self) -> bool {
        if self.enabled {
            return false;
        }
        self.enabled = true;
        self.active = None;
        true
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// 再生中のプリセット
    pub fn active(&self) -> Option<EffectPreset> {
        self.active
    }
}

impl Default for EffectPanel {
    fn default() -> Self {
        Self::new()
    }
}

/// 1回分の再生
///
/// 出力先とグラフを所有し、完了タイマーが発火するか停止されるまで生きる。
pub struct PlaybackSession {
    output: Box<dyn OutputSink>,
    renderer: Arc<Mutex<Renderer>>,
    playhead: Playhead,
    timer: CompletionTimer,
    total_frames: u64,
    settings: PlaybackSettings,
}

impl PlaybackSession {
    /// グラフを組み立てて再生を開始し、完了タイマーを設定する
    ///
    /// タイマーは出力の開始が戻った時刻から数える。
    pub fn start(
        file: &AudioFile,
        settings: PlaybackSettings,
        mut output: Box<dyn OutputSink>,
        effects: &EffectsConfig,
    ) -> Result<Self> {
        let graph = PlaybackGraph::assemble(settings);
        let renderer = graph.build_renderer(file, output.sample_rate(), effects);
        let playhead = renderer.playhead();
        let renderer = Arc::new(Mutex::new(renderer));

        output.start(renderer.clone())?;
        let started_at = Instant::now();

        let delay = remaining_duration(
            file.length(),
            playhead.frames(),
            file.sample_rate(),
            settings.rate(),
        );
        let mut timer = CompletionTimer::default();
        timer.arm(started_at, delay);

        log::info!(
            "再生開始: {:?}, {}段, 終了まで {:.2}秒",
            settings,
            graph.stages().len(),
            delay.as_secs_f64()
        );

        Ok(Self {
            output,
            renderer,
            playhead,
            timer,
            total_frames: file.length(),
            settings,
        })
    }

    /// 完了タイマーを確認し、発火していれば再生を止めて `true` を返す
    pub fn poll(&mut self, now: Instant) -> bool {
        if self.timer.poll(now) {
            log::info!("再生完了");
            self.stop();
            true
        } else {
            false
        }
    }

    /// 再生を止め、グラフをリセットする
    pub fn stop(&mut self) {
        self.timer.cancel();
        self.output.stop();
        if let Ok(mut renderer) = self.renderer.lock() {
            renderer.reset();
        }
    }

    /// 再生位置の割合 (0.0 ~ 1.0)
    pub fn progress(&self) -> f64 {
        if self.total_frames == 0 {
            return 1.0;
        }
        (self.playhead.frames() as f64 / self.total_frames as f64).min(1.0)
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        self.timer.remaining(now).unwrap_or(Duration::ZERO)
    }

    pub fn settings(&self) -> PlaybackSettings {
        self.settings
    }
}

/// プレイヤー画面のコントローラ
///
/// 画面を開いたときに録音を一度だけ読み込み、ボタン操作ごとに再生セッションを作る。
pub struct Player {
    file: AudioFile,
    audio: AudioConfig,
    open_output: OutputOpener,
    effects: EffectsConfig,
    panel: EffectPanel,
    session: Option<PlaybackSession>,
}

impl Player {
    /// 録音ファイルを読み込んでプレイヤーを作成
    pub fn open<P: AsRef<Path>>(path: P, audio: &AudioConfig, effects: &EffectsConfig) -> Result<Self> {
        let file = AudioFile::open(path)?;
        Ok(Self::with_output(file, audio, effects, audio_output::open_device))
    }

    /// 読み込み済みの録音と出力先の開き方を指定して作成
    pub fn with_output(
        file: AudioFile,
        audio: &AudioConfig,
        effects: &EffectsConfig,
        open_output: OutputOpener,
    ) -> Self {
        Self {
            file,
            audio: audio.clone(),
            open_output,
            effects: effects.clone(),
            panel: EffectPanel::new(),
            session: None,
        }
    }

    /// エフェクトボタンを押して再生する
    ///
    /// ボタンが無効な間は何もせず `Ok(false)` を返す。
    /// 再生の開始に失敗した場合はボタンを有効に戻してエラーを返す。
    pub fn trigger(&mut self, preset: EffectPreset) -> Result<bool> {
        if !self.panel.press(preset) {
            return Ok(false);
        }

        let settings = self.effects.settings_for(preset);
        let started = (self.open_output)(&self.audio).and_then(|output| {
            PlaybackSession::start(&self.file, settings, output, &self.effects)
        });
        match started {
            Ok(session) => {
                self.session = Some(session);
                Ok(true)
            }
            Err(e) => {
                log::error!("再生開始に失敗: {}", e);
                self.panel.release();
                Err(e)
            }
        }
    }

    /// 完了タイマーを確認する。再生が終わってボタンが有効に戻った場合に `true`
    pub fn poll(&mut self, now: Instant) -> bool {
        let finished = self
            .session
            .as_mut()
            .map(|session| session.poll(now))
            .unwrap_or(false);

        if finished {
            self.session = None;
            self.panel.release()
        } else {
            false
        }
    }

    /// 再生を中断する (停止操作や画面を離れるとき)
    pub fn stop(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.stop();
            log::info!("再生を中断しました");
        }
        self.panel.release();
    }

    pub fn file(&self) -> &AudioFile {
        &self.file
    }

    pub fn panel(&self) -> &EffectPanel {
        &self.panel
    }

    pub fn session(&self) -> Option<&PlaybackSession> {
        self.session.as_ref()
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.stop();
    }
}
