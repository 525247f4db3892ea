use thiserror::Error;

/// オーディオ関連の失敗
///
/// デバイス・ファイル・エンジンのどの失敗もプロセスを終了させず、
/// 呼び出し側 (TUI) に通知として表示される。
#[derive(Error, Debug)]
pub enum AppError {
    #[error("マイクへのアクセスが拒否されました。システム設定を確認してください: {0}")]
    PermissionDenied(String),

    #[error("オーディオデバイスが利用できません: {0}")]
    DeviceUnavailable(String),

    #[error("録音ファイルを読み込めません: {0}")]
    FileUnreadable(String),

    #[error("オーディオエンジンの開始に失敗: {0}")]
    EngineStartFailed(String),

    #[error("録音中にエラーが発生しました: {0}")]
    RecordingFailed(String),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// 通知ダイアログのタイトル
    pub fn title(&self) -> &'static str {
        match self {
            AppError::PermissionDenied(_) => "Recording Disabled",
            AppError::DeviceUnavailable(_) => "Audio Session Error",
            AppError::FileUnreadable(_) => "Audio File Error",
            AppError::EngineStartFailed(_) => "Audio Engine Error",
            AppError::RecordingFailed(_) => "Recording Failed",
        }
    }

    /// 入力ストリーム構築時のエラーを分類
    pub(crate) fn from_input_stream(err: cpal::BuildStreamError) -> Self {
        match err {
            cpal::BuildStreamError::BackendSpecific { ref err }
                if is_permission_error(&err.description) =>
            {
                AppError::PermissionDenied(err.description.clone())
            }
            other => AppError::DeviceUnavailable(other.to_string()),
        }
    }

    /// 入力ストリーム開始時のエラーを分類
    pub(crate) fn from_input_play(err: cpal::PlayStreamError) -> Self {
        match err {
            cpal::PlayStreamError::BackendSpecific { ref err }
                if is_permission_error(&err.description) =>
            {
                AppError::PermissionDenied(err.description.clone())
            }
            other => AppError::DeviceUnavailable(other.to_string()),
        }
    }

    /// WAVファイル作成時のエラーを分類
    pub(crate) fn from_wav_create(err: hound::Error) -> Self {
        match err {
            hound::Error::IoError(ref io)
                if io.kind() == std::io::ErrorKind::PermissionDenied =>
            {
                AppError::PermissionDenied(io.to_string())
            }
            other => AppError::RecordingFailed(other.to_string()),
        }
    }
}

/// バックエンド固有のエラー文言からアクセス拒否を判定
fn is_permission_error(description: &str) -> bool {
    let lower = description.to_lowercase();
    ["permission", "denied", "not permitted", "unauthorized"]
        .iter()
        .any(|needle| lower.contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_titles_follow_failure_kind() {
        assert_eq!(
            AppError::PermissionDenied(String::new()).title(),
            "Recording Disabled"
        );
        assert_eq!(
            AppError::FileUnreadable(String::new()).title(),
            "Audio File Error"
        );
        assert_eq!(
            AppError::EngineStartFailed(String::new()).title(),
            "Audio Engine Error"
        );
    }

    #[test]
    fn test_backend_permission_error_is_classified() {
        let err = cpal::BuildStreamError::BackendSpecific {
            err: cpal::BackendSpecificError {
                description: "Operation not permitted".to_string(),
            },
        };
        assert!(matches!(
            AppError::from_input_stream(err),
            AppError::PermissionDenied(_)
        ));

        assert!(matches!(
            AppError::from_input_stream(cpal::BuildStreamError::DeviceNotAvailable),
            AppError::DeviceUnavailable(_)
        ));
    }

    #[test]
    fn test_wav_permission_error_is_classified() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        assert!(matches!(
            AppError::from_wav_create(hound::Error::IoError(io)),
            AppError::PermissionDenied(_)
        ));
        assert!(matches!(
            AppError::from_wav_create(hound::Error::Unsupported),
            AppError::RecordingFailed(_)
        ));
    }
}
