use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "設定ファイルが見つかりません。以下の場所を確認してください:\n\
        - カレントディレクトリ: hostflow.kdl, hostflow.local.kdl, .hostflow.kdl, .hostflow.local.kdl\n\
        - ./.hostflow/ ディレクトリ\n\
        - ~/.config/hostflow/hostflow.kdl\n\
        または HOSTFLOW_CONFIG_PATH 環境変数で直接指定できます"
    )]
    ConfigFileNotFound,

    #[error("KDLパースエラー: {path}\n理由: {source}")]
    KdlParse {
        path: PathBuf,
        #[source]
        source: kdl::KdlError,
    },

    #[error("無効な設定: {0}")]
    InvalidValue(String),

    #[error("IO エラー: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
