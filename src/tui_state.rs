use crate::error::AppError;
use crate::meter::SILENCE_DB;
use crate::recorder::Recording;
use crate::status_ticker::StatusTicker;
use std::time::Duration;

/// 表示中の画面
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Screen {
    /// 録音画面
    Recorder,
    /// 再生画面
    Player,
}

/// 閉じるまで表示し続ける通知
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub message: String,
}

impl From<&AppError> for Notice {
    fn from(err: &AppError) -> Self {
        Self {
            title: err.title().to_string(),
            message: err.to_string(),
        }
    }
}

/// 録音画面の表示状態
pub struct RecorderView {
    pub is_recording: bool,
    pub ticker: StatusTicker,
    /// 入力レベル (dB)
    pub level_db: f32,
}

impl RecorderView {
    pub fn new(status_interval: Duration) -> Self {
        Self {
            is_recording: false,
            ticker: StatusTicker::new(status_interval),
            level_db: SILENCE_DB,
        }
    }

    /// 画面に戻ってきたときの初期化
    pub fn appear(&mut self) {
        self.ticker.reset();
        self.level_db = SILENCE_DB;
    }
}

/// TUI全体の状態
pub struct TuiState {
    pub screen: Screen,
    pub recorder: RecorderView,
    /// 最後に確定した録音
    pub last_recording: Option<Recording>,
    pub notice: Option<Notice>,
}

impl TuiState {
    pub fn new(status_interval: Duration) -> Self {
        Self {
            screen: Screen::Recorder,
            recorder: RecorderView::new(status_interval),
            last_recording: None,
            notice: None,
        }
    }

    /// エラーを通知として表示する
    pub fn notify(&mut self, err: &AppError) {
        log::warn!("{}: {}", err.title(), err);
        self.notice = Some(Notice::from(err));
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    /// 録音中は再生画面へ移動できない
    ///
    /// 録音が無い場合は移動を試み、ファイルを読めない旨を通知する。
    pub fn can_open_player(&self) -> bool {
        !self.recorder.is_recording
    }
}
