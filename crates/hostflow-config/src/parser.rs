//! KDL設定ファイルのパース

use crate::error::{ConfigError, Result};
use crate::settings::{
    Ec2Settings, RackspaceSettings, Settings, SshSettings, WaitSettings, expand_tilde,
};
use hostflow_cloud::CloudKind;
use kdl::{KdlDocument, KdlNode};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// KDLファイルを読み込んで Settings を生成
pub fn parse_settings_file<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    let doc: KdlDocument = content.parse().map_err(|source| ConfigError::KdlParse {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!("Parsed config file: {}", path.display());
    parse_document(&doc)
}

/// KDL文字列をパース
pub fn parse_settings_str(content: &str) -> Result<Settings> {
    let doc: KdlDocument = content.parse().map_err(|source| ConfigError::KdlParse {
        path: PathBuf::from("<inline>"),
        source,
    })?;
    parse_document(&doc)
}

fn parse_document(doc: &KdlDocument) -> Result<Settings> {
    let mut settings = Settings::default();

    for node in doc.nodes() {
        match node.name().value() {
            "cloud" => {
                if let Some(value) = first_string(node) {
                    let kind = value.parse::<CloudKind>().map_err(ConfigError::InvalidValue)?;
                    settings.cloud = Some(kind);
                }
            }
            "state-file" => {
                if let Some(value) = first_string(node) {
                    settings.state_file = expand_tilde(value);
                }
            }
            "ssh" => settings.ssh = parse_ssh(node)?,
            "wait" => settings.wait = parse_wait(node)?,
            "ec2" => settings.ec2 = parse_ec2(node)?,
            "rackspace" => settings.rackspace = parse_rackspace(node),
            other => {
                tracing::warn!("Unknown config node ignored: {}", other);
            }
        }
    }

    Ok(settings)
}

fn parse_ssh(node: &KdlNode) -> Result<SshSettings> {
    let mut ssh = SshSettings::default();

    for child in children(node) {
        match child.name().value() {
            "user" => {
                if let Some(value) = first_string(child) {
                    ssh.user = value.to_string();
                }
            }
            "port" => {
                if let Some(value) = first_integer(child) {
                    ssh.port = u16::try_from(value).map_err(|_| {
                        ConfigError::InvalidValue(format!("ssh port out of range: {}", value))
                    })?;
                }
            }
            _ => {}
        }
    }

    Ok(ssh)
}

fn parse_wait(node: &KdlNode) -> Result<WaitSettings> {
    let mut wait = WaitSettings::default();

    for child in children(node) {
        match child.name().value() {
            "poll-attempts" => {
                if let Some(value) = first_integer(child) {
                    let attempts = u32::try_from(value).ok().filter(|v| *v > 0).ok_or_else(|| {
                        ConfigError::InvalidValue(format!(
                            "poll-attempts must be a positive integer: {}",
                            value
                        ))
                    })?;
                    wait.poll_attempts = Some(attempts);
                }
            }
            "ssh-timeout" => {
                if let Some(value) = first_integer(child) {
                    let secs = u64::try_from(value).map_err(|_| {
                        ConfigError::InvalidValue(format!("ssh-timeout must not be negative: {}", value))
                    })?;
                    wait.ssh_timeout = Duration::from_secs(secs);
                }
            }
            _ => {}
        }
    }

    Ok(wait)
}

fn parse_ec2(node: &KdlNode) -> Result<Ec2Settings> {
    let mut ec2 = Ec2Settings::default();

    for child in children(node) {
        match child.name().value() {
            "region" => set_string(child, &mut ec2.region),
            "ami" => set_string(child, &mut ec2.ami),
            "instance-type" => set_string(child, &mut ec2.instance_type),
            "name" => set_string(child, &mut ec2.name),
            "key-pair" => ec2.key_pair = first_string(child).map(|s| s.to_string()),
            "key-file" => ec2.key_file = first_string(child).map(expand_tilde),
            "security-groups" => {
                // 複数のセキュリティグループを引数として受け取る
                ec2.security_groups = all_strings(child);
            }
            "root-volume-gib" => {
                if let Some(value) = first_integer(child) {
                    ec2.root_volume_gib = i32::try_from(value)
                        .ok()
                        .filter(|v| *v > 0)
                        .ok_or_else(|| {
                            ConfigError::InvalidValue(format!(
                                "root-volume-gib must be a positive integer: {}",
                                value
                            ))
                        })?;
                }
            }
            _ => {}
        }
    }

    Ok(ec2)
}

fn parse_rackspace(node: &KdlNode) -> RackspaceSettings {
    let mut rs = RackspaceSettings::default();

    for child in children(node) {
        match child.name().value() {
            "identity-url" => set_string(child, &mut rs.identity_url),
            "auth-system" => set_string(child, &mut rs.auth_system),
            "flavor" => set_string(child, &mut rs.flavor),
            "image" => set_string(child, &mut rs.image),
            "instance-name" => set_string(child, &mut rs.instance_name),
            "username" => rs.username = first_string(child).map(|s| s.to_string()),
            "password" => rs.password = first_string(child).map(|s| s.to_string()),
            "api-key" => rs.api_key = first_string(child).map(|s| s.to_string()),
            "region" => rs.region = first_string(child).map(|s| s.to_string()),
            "key-pair" => rs.key_pair = first_string(child).map(|s| s.to_string()),
            "key-file" => rs.key_file = first_string(child).map(expand_tilde),
            _ => {}
        }
    }

    rs
}

fn children(node: &KdlNode) -> impl Iterator<Item = &KdlNode> {
    node.children().into_iter().flat_map(|doc| doc.nodes().iter())
}

fn first_string(node: &KdlNode) -> Option<&str> {
    node.entries().first().and_then(|e| e.value().as_string())
}

fn first_integer(node: &KdlNode) -> Option<i128> {
    node.entries().first().and_then(|e| e.value().as_integer())
}

fn all_strings(node: &KdlNode) -> Vec<String> {
    node.entries()
        .iter()
        .filter_map(|e| e.value().as_string().map(|s| s.to_string()))
        .collect()
}

fn set_string(node: &KdlNode, slot: &mut String) {
    if let Some(value) = first_string(node) {
        *slot = value.to_string();
    }
}
