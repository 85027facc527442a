use crate::ProvisionCommands;
use crate::utils;
use colored::Colorize;
use hostflow_cloud::CloudKind;
use hostflow_config::Settings;
use hostflow_remote::{Provisioner, SshShell, install_python_modules_locally};

pub async fn handle(
    cloud: Option<CloudKind>,
    settings: &Settings,
    step: ProvisionCommands,
) -> anyhow::Result<()> {
    // 手元のマシンで完結するのでホストには接続しない
    if let ProvisionCommands::Pip {
        modules,
        local: true,
        ..
    } = &step
    {
        println!("{}", "手元のマシンに Python モジュールをインストール中...".yellow());
        install_python_modules_locally(modules).await?;
        println!("  ✓ インストール完了: {}", modules.join(", ").cyan());
        return Ok(());
    }

    let (record, target) = utils::tracked_target(cloud, settings).await?;
    println!(
        "{}",
        format!("{} ({}) をプロビジョニング中...", record.id, target.host).yellow()
    );

    let shell = SshShell::new(target);
    let provisioner = Provisioner::new(&shell);

    match step {
        ProvisionCommands::Updates => {
            provisioner.install_os_updates().await?;
            println!("  ✓ アップデート完了");
        }
        ProvisionCommands::Packages { packages, repo } => {
            let installed = provisioner
                .install_packages(&packages, repo.as_deref())
                .await?;
            if installed.is_empty() {
                println!("  ℹ すべてインストール済みです");
            } else {
                println!("  ✓ インストール完了: {}", installed.join(", ").cyan());
            }
        }
        ProvisionCommands::PackageUrl { name, url } => {
            if provisioner.install_package_from_url(&name, &url).await? {
                println!("  ✓ {} をインストールしました", name.cyan());
            } else {
                println!("  ℹ {} はインストール済みです", name);
            }
        }
        ProvisionCommands::Service {
            name,
            disable,
            stop,
            unmask,
        } => {
            provisioner.systemd(&name, !stop, !disable, unmask).await?;
            let action = if stop { "停止" } else { "起動" };
            let boot = if disable { "無効" } else { "有効" };
            println!("  ✓ {}: {} / 自動起動{}", name.cyan(), action, boot);
        }
        ProvisionCommands::Firewalld => {
            provisioner.enable_firewalld().await?;
            println!("  ✓ firewalld を有効化しました");
        }
        ProvisionCommands::FirewallService {
            service,
            runtime_only,
        } => {
            provisioner
                .add_firewalld_service(&service, !runtime_only)
                .await?;
            println!("  ✓ サービス {} を許可しました", service.cyan());
        }
        ProvisionCommands::FirewallPort { port, runtime_only } => {
            provisioner.add_firewalld_port(&port, !runtime_only).await?;
            println!("  ✓ ポート {} を許可しました", port.cyan());
        }
        ProvisionCommands::SelinuxOff => {
            let reboot_needed = provisioner.disable_selinux().await?;
            println!("  ✓ SELinux を無効化しました");
            if reboot_needed {
                println!(
                    "  ⚠ 反映には再起動が必要です: {}",
                    "hostflow provision reboot".cyan()
                );
            }
        }
        ProvisionCommands::Docker => {
            provisioner.install_docker().await?;
            if provisioner.create_docker_group().await? {
                println!("  ✓ docker グループを作成しました");
            }
            println!("  ✓ Docker を起動しました");
        }
        ProvisionCommands::DockerImage { image } => {
            provisioner.cache_docker_image(&image).await?;
            println!("  ✓ {} を取得しました", image.cyan());
        }
        ProvisionCommands::ContainerRm { name } => {
            if provisioner.remove_container(&name).await? {
                println!("  ✓ コンテナ {} を削除しました", name.cyan());
            } else {
                println!("  ℹ コンテナ {} は存在しません", name);
            }
        }
        ProvisionCommands::ImageRm { image } => {
            if provisioner.remove_image(&image).await? {
                println!("  ✓ イメージ {} を削除しました", image.cyan());
            } else {
                println!("  ℹ イメージ {} は存在しません", image);
            }
        }
        ProvisionCommands::Arch => {
            println!("  {}", provisioner.arch().await?.cyan());
        }
        ProvisionCommands::Pip {
            modules, system, ..
        } => {
            provisioner.install_python_modules(&modules, system).await?;
            println!("  ✓ インストール完了: {}", modules.join(", ").cyan());
        }
        ProvisionCommands::PipUpgrade { system } => {
            provisioner.upgrade_pip(system).await?;
            println!("  ✓ pip を更新しました");
        }
        ProvisionCommands::Gem { gems, system } => {
            provisioner.install_gems(&gems, system).await?;
            println!("  ✓ インストール完了: {}", gems.join(", ").cyan());
        }
        ProvisionCommands::Epel => {
            if provisioner.add_epel_repository().await? {
                println!("  ✓ EPEL リポジトリを追加しました");
            } else {
                println!("  ℹ EPEL リポジトリは追加済みです");
            }
        }
        ProvisionCommands::Zfs { testing } => {
            if provisioner.add_zfs_repository().await? {
                println!("  ✓ ZFS on Linux リポジトリを追加しました");
            }
            let installed = if testing {
                provisioner.install_zfs_from_testing().await?
            } else {
                !provisioner
                    .install_packages(&["zfs".to_string()], None)
                    .await?
                    .is_empty()
            };
            if installed {
                println!("  ✓ zfs をインストールしました");
            } else {
                println!("  ℹ zfs はインストール済みです");
            }
        }
        ProvisionCommands::GitSource { version } => {
            if provisioner.install_git_from_source(&version).await? {
                println!("  ✓ git {} をビルドしてインストールしました", version.cyan());
            } else {
                println!("  ℹ ソースからビルドした git が既にあります");
            }
        }
        ProvisionCommands::GitClone { url, dir } => {
            if provisioner.git_clone(&url, &dir).await? {
                println!("  ✓ {} にクローンしました", dir.cyan());
            } else {
                println!("  ℹ {} は既に存在します", dir);
            }
        }
        ProvisionCommands::Reboot => {
            provisioner.reboot().await?;
            println!("  ✓ 再起動を要求しました");
        }
    }
    Ok(())
}
