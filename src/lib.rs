//! pitch-perfect - 声を録音してエフェクト付きで再生するターミナルアプリ
//!
//! マイクから1つの固定ファイルへ録音し、その録音を6種類のプリセット
//! (高い声・低い声・早回し・スロー・エコー・リバーブ) で再生します。
//!
//! # 主な機能
//!
//! - **録音**: 入力デバイスの音声をモノラル16bit WAVとして保存
//! - **ステータス表示**: 録音中は1秒ごとに "Recording . . ." と経過秒数を更新
//! - **エフェクト再生**: 再生ごとに処理グラフを組み立て直し、出力デバイスへ流す
//! - **完了検知**: 残り時間からタイマーを設定し、再生終了でボタンを有効に戻す
//!
//! # アーキテクチャ
//!
//! ```text
//! [Microphone] → [AudioInput] → [Recorder] → [WavWriter] → recordName.wav
//!                                    ↓
//!                               [LevelMeter]
//!
//! recordName.wav → [AudioFile] → [TimePitch] → [Echo]? → [Reverb]? → [AudioOutput]
//!                                     ↓
//!                                [Playhead] → [CompletionTimer] → ボタン再有効化
//! ```
//!
//! # 使用例
//!
//! ```no_run
//! use pitch_perfect::config::Config;
//! use pitch_perfect::types::EffectPreset;
//!
//! let config = Config::load_or_default("config.toml").unwrap();
//! let settings = config.effects.settings_for(EffectPreset::Echo);
//! assert!(settings.echo);
//! ```

pub mod audio_file;
pub mod audio_input;
pub mod audio_output;
pub mod completion;
pub mod config;
pub mod effects;
pub mod error;
pub mod graph;
pub mod meter;
pub mod player;
pub mod recorder;
pub mod status_ticker;
pub mod tui;
pub mod tui_state;
pub mod types;
pub mod wav_writer;
