mod commands;
mod utils;

use clap::{Parser, Subcommand};
use colored::Colorize;
use hostflow_cloud::{CloudError, CloudKind, InstanceSpec};

#[derive(Parser)]
#[command(name = "hostflow")]
#[command(about = "ビルドホストを一台、立ち上げて、整えて、片付ける。", long_about = None)]
struct Cli {
    /// 使用するクラウド (ec2, rackspace)
    #[arg(long, global = true, env = "HOSTFLOW_CLOUD")]
    cloud: Option<CloudKind>,

    /// デバッグログを出力
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// インスタンスを作成・起動し、SSHで接続できるまで待つ
    Up {
        /// インスタンス名（省略時は設定ファイルの値）
        #[arg(long)]
        name: Option<String>,
        /// イメージ (AMI ID またはイメージ名)
        #[arg(long)]
        image: Option<String>,
        /// インスタンスタイプ / フレーバー
        #[arg(long)]
        size: Option<String>,
    },
    /// インスタンスを停止
    #[command(visible_alias = "down")]
    Halt,
    /// インスタンスとボリュームを削除し、状態ファイルを消す
    #[command(visible_alias = "terminate")]
    Destroy,
    /// 追跡中のインスタンスの状態を表示
    Status,
    /// インスタンスからイメージを作成
    Image {
        /// イメージ名
        name: String,
        /// イメージの説明
        #[arg(short, long, default_value = "")]
        description: String,
    },
    /// SOURCE_PATH のディレクトリをホストへ同期
    Rsync,
    /// ホストにSSHで接続
    Ssh {
        /// ssh に渡す追加引数（-- 以降）
        #[arg(last = true)]
        args: Vec<String>,
    },
    /// ホストのプロビジョニング
    #[command(subcommand)]
    Provision(ProvisionCommands),
    /// バージョン情報を表示
    Version,
}

#[derive(Subcommand)]
pub enum ProvisionCommands {
    /// OSのアップデートを適用
    Updates,
    /// パッケージをインストール（インストール済みはスキップ）
    Packages {
        /// パッケージ名
        #[arg(required = true)]
        packages: Vec<String>,
        /// 有効にするリポジトリ
        #[arg(long)]
        repo: Option<String>,
    },
    /// URLからパッケージをインストール
    PackageUrl {
        /// インストール確認に使うパッケージ名
        name: String,
        /// パッケージのURL
        url: String,
    },
    /// systemd サービスを操作
    Service {
        /// サービス名
        name: String,
        /// 自動起動を無効にする
        #[arg(long)]
        disable: bool,
        /// 起動ではなく停止する
        #[arg(long)]
        stop: bool,
        /// マスクを解除してから操作する
        #[arg(long)]
        unmask: bool,
    },
    /// firewalld をインストールして有効化
    Firewalld,
    /// firewalld にサービスを追加
    FirewallService {
        /// サービス名 (例: http)
        service: String,
        /// 再起動で消える一時的な設定にする
        #[arg(long)]
        runtime_only: bool,
    },
    /// firewalld にポートを追加
    FirewallPort {
        /// ポート (例: 8080/tcp)
        port: String,
        /// 再起動で消える一時的な設定にする
        #[arg(long)]
        runtime_only: bool,
    },
    /// SELinux を無効化
    SelinuxOff,
    /// Docker をインストールして起動
    Docker,
    /// Docker イメージを事前に取得
    DockerImage {
        /// イメージ名
        image: String,
    },
    /// Docker コンテナを強制削除
    ContainerRm {
        /// コンテナ名
        name: String,
    },
    /// Docker イメージを強制削除
    ImageRm {
        /// イメージ名
        image: String,
    },
    /// CPU アーキテクチャを表示
    Arch,
    /// pip で Python モジュールをインストール
    Pip {
        /// モジュール名
        #[arg(required = true)]
        modules: Vec<String>,
        /// root 権限でシステム全体にインストール
        #[arg(long, conflicts_with = "local")]
        system: bool,
        /// ホストではなく手元のマシンにインストール
        #[arg(long)]
        local: bool,
    },
    /// pip を最新版に更新
    PipUpgrade {
        /// root 権限でシステムの pip を更新
        #[arg(long)]
        system: bool,
    },
    /// Ruby gem をインストール
    Gem {
        /// gem 名
        #[arg(required = true)]
        gems: Vec<String>,
        /// root 権限でシステム全体にインストール
        #[arg(long)]
        system: bool,
    },
    /// EPEL リポジトリを追加
    Epel,
    /// ZFS on Linux のリポジトリを追加して zfs をインストール
    Zfs {
        /// zfs-testing リポジトリからインストール（デバッグシンボル付き）
        #[arg(long)]
        testing: bool,
    },
    /// git をソースからビルドして /usr/local にインストール
    GitSource {
        /// git のバージョン
        #[arg(long, default_value = "2.4.6")]
        version: String,
    },
    /// Git リポジトリをクローン
    GitClone {
        /// リポジトリURL
        url: String,
        /// クローン先ディレクトリ（ホームからの相対パス）
        dir: String,
    },
    /// ホストを再起動
    Reboot,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    // ログはstderrに出力
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "✗ エラー:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Versionコマンドは設定ファイル不要
    if matches!(cli.command, Commands::Version) {
        println!("hostflow {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let settings = hostflow_config::load_settings()?;
    tracing::debug!(state_file = %settings.state_file.display(), "Settings loaded");

    // コマンドディスパッチ
    match cli.command {
        Commands::Up { name, image, size } => {
            let ctx = utils::Context::open(cli.cloud, settings).await?;
            let spec = InstanceSpec { name, image, size };
            commands::up::handle(&ctx, &spec).await?;
        }
        Commands::Halt => {
            let ctx = utils::Context::open_optional(cli.cloud, settings).await?;
            commands::halt::handle(ctx.as_ref()).await?;
        }
        Commands::Destroy => {
            let ctx = utils::Context::open_optional(cli.cloud, settings).await?;
            commands::destroy::handle(ctx.as_ref()).await?;
        }
        Commands::Status => {
            let ctx = utils::Context::open_optional(cli.cloud, settings)
                .await?
                .ok_or(CloudError::NoState)?;
            commands::status::handle(&ctx).await?;
        }
        Commands::Image { name, description } => {
            let ctx = utils::Context::open_optional(cli.cloud, settings)
                .await?
                .ok_or(CloudError::NoState)?;
            commands::image::handle(&ctx, &name, &description).await?;
        }
        Commands::Rsync => {
            commands::rsync::handle(cli.cloud, &settings).await?;
        }
        Commands::Ssh { args } => {
            commands::ssh::handle(cli.cloud, &settings, &args).await?;
        }
        Commands::Provision(step) => {
            commands::provision::handle(cli.cloud, &settings, step).await?;
        }
        Commands::Version => {
            unreachable!("Version is handled before config loading");
        }
    }

    Ok(())
}
