pub mod error;
pub mod parser;
pub mod settings;

pub use error::*;
pub use parser::{parse_settings_file, parse_settings_str};
pub use settings::{
    Ec2Settings, RackspaceSettings, Settings, SshSettings, WaitSettings, expand_tilde,
};

use std::path::PathBuf;

/// プロジェクトのhostflow.kdlファイルを探す
///
/// 以下の優先順位で設定ファイルを検索:
/// 1. 環境変数 HOSTFLOW_CONFIG_PATH (直接パス指定)
/// 2. カレントディレクトリ: hostflow.local.kdl, .hostflow.local.kdl, hostflow.kdl, .hostflow.kdl
/// 3. ./.hostflow/ ディレクトリ内: 同様の順序
/// 4. ~/.config/hostflow/hostflow.kdl (グローバル設定)
pub fn find_config_file() -> Result<PathBuf> {
    // 1. 環境変数で直接指定
    if let Ok(config_path) = std::env::var("HOSTFLOW_CONFIG_PATH") {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
    }

    let current_dir = std::env::current_dir()?;
    let candidates = [
        "hostflow.local.kdl",
        ".hostflow.local.kdl",
        "hostflow.kdl",
        ".hostflow.kdl",
    ];

    // 2. カレントディレクトリで検索
    for filename in &candidates {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(path);
        }
    }

    // 3. ./.hostflow/ ディレクトリで検索
    let project_dir = current_dir.join(".hostflow");
    if project_dir.is_dir() {
        for filename in &candidates {
            let path = project_dir.join(filename);
            if path.exists() {
                return Ok(path);
            }
        }
    }

    // 4. グローバル設定ファイル (~/.config/hostflow/hostflow.kdl)
    if let Some(config_dir) = dirs::config_dir() {
        let global_config = config_dir.join("hostflow").join("hostflow.kdl");
        if global_config.exists() {
            return Ok(global_config);
        }
    }

    // どの設定ファイルも見つからなかった
    Err(ConfigError::ConfigFileNotFound)
}

/// 設定を読み込む
///
/// 設定ファイルが無ければ既定値を使います。どちらの場合も
/// OpenStack 系の環境変数で認証情報を補完します。
pub fn load_settings() -> Result<Settings> {
    let mut settings = match find_config_file() {
        Ok(path) => {
            tracing::debug!("Using config file: {}", path.display());
            parse_settings_file(&path)?
        }
        Err(ConfigError::ConfigFileNotFound) => {
            tracing::debug!("No config file found, using defaults");
            Settings::default()
        }
        Err(e) => return Err(e),
    };

    settings.apply_env();
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    #[test]
    #[serial]
    fn test_find_config_file_in_current_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        fs::write(temp_dir.path().join("hostflow.kdl"), "// test").unwrap();

        std::env::set_current_dir(&temp_dir).unwrap();

        let result = temp_env::with_var_unset("HOSTFLOW_CONFIG_PATH", find_config_file);
        assert!(result.unwrap().ends_with("hostflow.kdl"));

        std::env::set_current_dir(original_dir).unwrap();
    }

    #[test]
    #[serial]
    fn test_find_config_file_local_priority() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        // hostflow.kdl と hostflow.local.kdl の両方を作成
        fs::write(temp_dir.path().join("hostflow.kdl"), "// global").unwrap();
        fs::write(temp_dir.path().join("hostflow.local.kdl"), "// local").unwrap();

        std::env::set_current_dir(&temp_dir).unwrap();

        let result =
            temp_env::with_var_unset("HOSTFLOW_CONFIG_PATH", find_config_file).unwrap();

        // hostflow.local.kdl が優先される
        assert!(result.ends_with("hostflow.local.kdl"));

        std::env::set_current_dir(original_dir).unwrap();
    }

    #[test]
    #[serial]
    fn test_find_config_file_in_project_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        let project_dir = temp_dir.path().join(".hostflow");
        fs::create_dir(&project_dir).unwrap();
        fs::write(project_dir.join("hostflow.kdl"), "// in project dir").unwrap();

        std::env::set_current_dir(&temp_dir).unwrap();

        let result =
            temp_env::with_var_unset("HOSTFLOW_CONFIG_PATH", find_config_file).unwrap();
        assert!(result.ends_with(".hostflow/hostflow.kdl"));

        std::env::set_current_dir(original_dir).unwrap();
    }

    #[test]
    #[serial]
    fn test_find_config_file_env_var() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("custom.kdl");
        fs::write(&config_path, "// custom").unwrap();

        let result = temp_env::with_var(
            "HOSTFLOW_CONFIG_PATH",
            Some(config_path.to_str().unwrap()),
            find_config_file,
        )
        .unwrap();
        assert_eq!(result, config_path);
    }

    #[test]
    #[serial]
    fn test_load_settings_from_env_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("custom.kdl");
        fs::write(&config_path, "cloud \"rackspace\"\nssh {\n    user \"root\"\n}\n").unwrap();

        let settings = temp_env::with_vars(
            [
                ("HOSTFLOW_CONFIG_PATH", Some(config_path.to_str().unwrap())),
                ("OS_USERNAME", Some("jenkins")),
            ],
            load_settings,
        )
        .unwrap();

        assert_eq!(settings.cloud, Some(hostflow_cloud::CloudKind::Rackspace));
        assert_eq!(settings.ssh.user, "root");
        assert_eq!(settings.rackspace.username.as_deref(), Some("jenkins"));
    }

    #[test]
    #[serial]
    fn test_hidden_file_priority() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        // .hostflow.local.kdl と hostflow.kdl を作成
        fs::write(temp_dir.path().join(".hostflow.local.kdl"), "// hidden local").unwrap();
        fs::write(temp_dir.path().join("hostflow.kdl"), "// visible").unwrap();

        std::env::set_current_dir(&temp_dir).unwrap();

        let result =
            temp_env::with_var_unset("HOSTFLOW_CONFIG_PATH", find_config_file).unwrap();

        // .hostflow.local.kdl が優先される
        assert!(result.ends_with(".hostflow.local.kdl"));

        std::env::set_current_dir(original_dir).unwrap();
    }
}
