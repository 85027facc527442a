use colored::Colorize;
use hostflow_cloud::{
    CloudError, CloudKind, InstanceRecord, JsonStateFile, LifecycleReconciler, ProviderClient,
    ReconcileOptions, StateStore, TcpProbe,
};
use hostflow_cloud_aws::Ec2Client;
use hostflow_cloud_rackspace::RackspaceClient;
use hostflow_config::Settings;
use hostflow_remote::SshTarget;

/// 1回のコマンド実行で使うプロバイダ・状態ファイル・設定の組
pub struct Context {
    pub settings: Settings,
    pub store: JsonStateFile,
    pub provider: Box<dyn ProviderClient>,
    probe: TcpProbe,
}

impl Context {
    /// クラウドを決定してプロバイダを組み立てる
    pub async fn open(flag: Option<CloudKind>, settings: Settings) -> anyhow::Result<Self> {
        Self::open_optional(flag, settings)
            .await?
            .ok_or_else(no_cloud_error)
    }

    /// クラウドを決められず、追跡中のインスタンスもない場合は `None`
    pub async fn open_optional(
        flag: Option<CloudKind>,
        settings: Settings,
    ) -> anyhow::Result<Option<Self>> {
        let store = JsonStateFile::new(&settings.state_file);
        let record = store.load().await?;

        let Some(kind) = select_cloud(flag, &settings, record.as_ref()) else {
            return Ok(None);
        };
        tracing::debug!(cloud = %kind, "Cloud selected");

        let provider = build_provider(kind, &settings).await;
        Ok(Some(Self {
            settings,
            store,
            provider,
            probe: TcpProbe::new(),
        }))
    }

    pub fn kind(&self) -> CloudKind {
        self.provider.kind()
    }

    pub fn reconciler(&self) -> LifecycleReconciler<'_> {
        LifecycleReconciler::new(self.provider.as_ref(), &self.store, &self.probe)
            .with_options(reconcile_options(self.provider.as_ref(), &self.settings))
    }

    pub fn ssh_target(&self, record: &InstanceRecord) -> anyhow::Result<SshTarget> {
        ssh_target(record, &self.settings)
    }
}

/// クラウドの決定順: フラグ/環境変数 → 設定ファイル → 既存の状態ファイル
pub fn select_cloud(
    flag: Option<CloudKind>,
    settings: &Settings,
    record: Option<&InstanceRecord>,
) -> Option<CloudKind> {
    flag.or(settings.cloud)
        .or_else(|| record.map(|r| r.cloud_kind))
}

fn no_cloud_error() -> anyhow::Error {
    anyhow::anyhow!(
        "クラウドが指定されていません\n\
         --cloud ec2|rackspace、環境変数 HOSTFLOW_CLOUD、または設定ファイルの cloud ノードで指定してください"
    )
}

pub async fn build_provider(kind: CloudKind, settings: &Settings) -> Box<dyn ProviderClient> {
    match kind {
        CloudKind::Ec2 => Box::new(Ec2Client::new(settings.ec2.clone()).await),
        CloudKind::Rackspace => Box::new(RackspaceClient::new(settings.rackspace.clone())),
    }
}

pub fn reconcile_options(provider: &dyn ProviderClient, settings: &Settings) -> ReconcileOptions {
    ReconcileOptions {
        ssh_port: settings.ssh.port,
        reachability_timeout: settings.wait.ssh_timeout,
        poll: settings
            .wait
            .poll_attempts
            .map(|attempts| provider.poll_policy().with_max_attempts(attempts)),
        image_poll: None,
    }
}

/// 状態ファイルの記録と設定から接続先を組み立てる
pub fn ssh_target(record: &InstanceRecord, settings: &Settings) -> anyhow::Result<SshTarget> {
    let host = record
        .ip_address
        .as_deref()
        .or(record.public_dns_name.as_deref())
        .ok_or_else(|| {
            anyhow::anyhow!(
                "インスタンス {} のアドレスが不明です。`hostflow up` を実行してください",
                record.id
            )
        })?;

    Ok(SshTarget::new(&settings.ssh.user, host)
        .with_port(settings.ssh.port)
        .with_key_file(settings.key_file(record.cloud_kind).map(|p| p.to_path_buf())))
}

/// 追跡中のインスタンスと接続先を状態ファイルから取得（プロバイダAPIは呼ばない）
pub async fn tracked_target(
    flag: Option<CloudKind>,
    settings: &Settings,
) -> anyhow::Result<(InstanceRecord, SshTarget)> {
    let store = JsonStateFile::new(&settings.state_file);
    let record = store.load().await?.ok_or(CloudError::NoState)?;

    if let Some(kind) = flag
        && kind != record.cloud_kind
    {
        anyhow::bail!(
            "追跡中のインスタンス {} は {} 上にあります（--cloud {} と一致しません）",
            record.id,
            record.cloud_kind,
            kind
        );
    }

    let target = ssh_target(&record, settings)?;
    Ok((record, target))
}

/// `ssh ...` 形式の接続コマンド
pub fn connect_command(target: &SshTarget) -> String {
    let mut parts = vec!["ssh".to_string()];
    parts.extend(target.identity_args());
    parts.push(target.destination());
    parts.join(" ")
}

/// 状態・アドレス・接続コマンドを表示
pub fn print_summary(record: &InstanceRecord, settings: &Settings) {
    println!();
    println!("  ID:   {}", record.id.cyan());
    println!("  状態: {}", record.state.green());
    match record
        .ip_address
        .as_deref()
        .or(record.public_dns_name.as_deref())
    {
        Some(address) => println!("  IP:   {}", address.cyan()),
        None => println!("  IP:   {}", "(未割り当て)".dimmed()),
    }
    if let Ok(target) = ssh_target(record, settings) {
        println!("  接続: {}", connect_command(&target).bold());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn record() -> InstanceRecord {
        InstanceRecord::new("i-0abc", CloudKind::Ec2, "running").with_ip("203.0.113.5")
    }

    #[test]
    fn test_select_cloud_precedence() {
        let mut settings = Settings::default();
        let tracked = InstanceRecord::new("srv-1", CloudKind::Rackspace, "ACTIVE");

        assert_eq!(select_cloud(None, &settings, None), None);
        assert_eq!(
            select_cloud(None, &settings, Some(&tracked)),
            Some(CloudKind::Rackspace)
        );

        settings.cloud = Some(CloudKind::Ec2);
        assert_eq!(
            select_cloud(None, &settings, Some(&tracked)),
            Some(CloudKind::Ec2)
        );
        assert_eq!(
            select_cloud(Some(CloudKind::Rackspace), &settings, None),
            Some(CloudKind::Rackspace)
        );
    }

    #[test]
    fn test_ssh_target_uses_cloud_key_file() {
        let mut settings = Settings::default();
        settings.ec2.key_file = Some(PathBuf::from("/keys/ec2.pem"));
        settings.rackspace.key_file = Some(PathBuf::from("/keys/rax.pem"));

        let target = ssh_target(&record(), &settings).unwrap();
        assert_eq!(target.destination(), "centos@203.0.113.5");
        assert_eq!(connect_command(&target), "ssh -i /keys/ec2.pem centos@203.0.113.5");
    }

    #[test]
    fn test_ssh_target_falls_back_to_dns_name() {
        let mut record = InstanceRecord::new("i-0abc", CloudKind::Ec2, "running");
        record.public_dns_name = Some("ec2-203-0-113-5.compute-1.amazonaws.com".to_string());

        let target = ssh_target(&record, &Settings::default()).unwrap();
        assert_eq!(target.host, "ec2-203-0-113-5.compute-1.amazonaws.com");
    }

    #[test]
    fn test_ssh_target_without_address() {
        let record = InstanceRecord::new("i-0abc", CloudKind::Ec2, "stopped");
        assert!(ssh_target(&record, &Settings::default()).is_err());
    }

    #[test]
    fn test_reconcile_options_from_settings() {
        let mut settings = Settings::default();
        settings.ssh.port = 2222;
        settings.wait.poll_attempts = Some(7);

        let provider = RackspaceClient::new(settings.rackspace.clone());
        let options = reconcile_options(&provider, &settings);

        assert_eq!(options.ssh_port, 2222);
        assert_eq!(options.reachability_timeout, settings.wait.ssh_timeout);
        let poll = options.poll.unwrap();
        assert_eq!(poll.max_attempts, 7);
        assert_eq!(poll.interval, provider.poll_policy().interval);
    }
}
