use crate::utils;
use colored::Colorize;
use hostflow_cloud::CloudKind;
use hostflow_config::Settings;

pub async fn handle(cloud: Option<CloudKind>, settings: &Settings) -> anyhow::Result<()> {
    // リモートに触れる前に同期元を確認
    let source = hostflow_remote::source_path_from_env()?;
    let (_, target) = utils::tracked_target(cloud, settings).await?;

    println!(
        "{}",
        format!("{} を {} へ同期中...", source.display(), target.destination()).yellow()
    );
    hostflow_remote::rsync_source(&source, &target).await?;
    println!("  ✓ 同期完了");
    Ok(())
}
