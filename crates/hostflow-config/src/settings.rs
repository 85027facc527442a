//! 設定値の型定義
//!
//! `Settings` は起動時に一度だけ組み立てられ、以降は読み取り専用で
//! 各コマンドに渡されます。

use hostflow_cloud::{CloudKind, DEFAULT_REACHABILITY_TIMEOUT, DEFAULT_SSH_PORT, DEFAULT_STATE_PATH};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// ツール全体の設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// 使用するクラウド (未指定なら CLI 引数や既存の状態ファイルから決定)
    pub cloud: Option<CloudKind>,

    /// 状態ファイルのパス
    pub state_file: PathBuf,

    pub ssh: SshSettings,
    pub wait: WaitSettings,
    pub ec2: Ec2Settings,
    pub rackspace: RackspaceSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cloud: None,
            state_file: PathBuf::from(DEFAULT_STATE_PATH),
            ssh: SshSettings::default(),
            wait: WaitSettings::default(),
            ec2: Ec2Settings::default(),
            rackspace: RackspaceSettings::default(),
        }
    }
}

impl Settings {
    /// 指定クラウドの SSH 鍵ファイル
    pub fn key_file(&self, cloud: CloudKind) -> Option<&Path> {
        match cloud {
            CloudKind::Ec2 => self.ec2.key_file.as_deref(),
            CloudKind::Rackspace => self.rackspace.key_file.as_deref(),
        }
    }

    /// OpenStack 系の環境変数で Rackspace の認証情報を補完
    ///
    /// 設定ファイルの値が優先されます。
    pub fn apply_env(&mut self) {
        let rs = &mut self.rackspace;
        fill_from_env(&mut rs.username, "OS_USERNAME");
        fill_from_env(&mut rs.password, "OS_PASSWORD");
        fill_from_env(&mut rs.api_key, "OS_API_KEY");

        if rs.region.is_none() {
            rs.region = std::env::var("OS_REGION_NAME").ok().filter(|v| !v.is_empty());
        }
    }
}

fn fill_from_env(slot: &mut Option<String>, var: &str) {
    if slot.is_none()
        && let Ok(value) = std::env::var(var)
        && !value.is_empty()
    {
        *slot = Some(value);
    }
}

/// リモート接続設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshSettings {
    pub user: String,
    pub port: u16,
}

impl Default for SshSettings {
    fn default() -> Self {
        Self {
            user: "centos".to_string(),
            port: DEFAULT_SSH_PORT,
        }
    }
}

/// 待機・ポーリング設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitSettings {
    /// 状態ポーリングの最大回数 (未指定ならプロバイダの既定値)
    pub poll_attempts: Option<u32>,

    /// SSH 到達待ちのタイムアウト
    pub ssh_timeout: Duration,
}

impl Default for WaitSettings {
    fn default() -> Self {
        Self {
            poll_attempts: None,
            ssh_timeout: DEFAULT_REACHABILITY_TIMEOUT,
        }
    }
}

/// EC2 インスタンス作成パラメータ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ec2Settings {
    pub region: String,
    pub ami: String,
    pub instance_type: String,
    pub key_pair: Option<String>,
    pub key_file: Option<PathBuf>,
    pub security_groups: Vec<String>,
    pub root_volume_gib: i32,
    pub name: String,
}

impl Default for Ec2Settings {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            ami: "ami-6d1c2007".to_string(),
            instance_type: "t2.medium".to_string(),
            key_pair: None,
            key_file: None,
            security_groups: Vec::new(),
            root_volume_gib: 250,
            name: "hostflow".to_string(),
        }
    }
}

/// Rackspace (OpenStack Nova) サーバー作成パラメータ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RackspaceSettings {
    pub identity_url: String,
    /// "rackspace" なら API キー認証、それ以外はパスワード認証
    pub auth_system: String,
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub region: Option<String>,
    pub flavor: String,
    pub image: String,
    pub key_pair: Option<String>,
    pub key_file: Option<PathBuf>,
    pub instance_name: String,
}

impl Default for RackspaceSettings {
    fn default() -> Self {
        Self {
            identity_url: "https://identity.api.rackspacecloud.com/v2.0".to_string(),
            auth_system: "rackspace".to_string(),
            username: None,
            password: None,
            api_key: None,
            region: None,
            flavor: "2 GB General Purpose v1".to_string(),
            image: "CentOS 7 (PVHVM)".to_string(),
            key_pair: None,
            key_file: None,
            instance_name: "hostflow".to_string(),
        }
    }
}

/// 先頭の `~` をホームディレクトリに展開
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    if path == "~"
        && let Some(home) = dirs::home_dir()
    {
        return home;
    }
    PathBuf::from(path)
}
