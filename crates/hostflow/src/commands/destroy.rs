use crate::utils::Context;
use colored::Colorize;
use hostflow_cloud::Outcome;

pub async fn handle(ctx: Option<&Context>) -> anyhow::Result<()> {
    println!("{}", "インスタンスを削除中...".yellow());

    let Some(ctx) = ctx else {
        println!("  ℹ 追跡中のインスタンスはありません");
        return Ok(());
    };

    let lock = ctx.store.acquire_lock().await?;
    let result = ctx.reconciler().destroy().await;
    lock.release().await?;

    match result? {
        Outcome::Destroyed { id, volume_id } => {
            println!("  ✓ インスタンス {} を削除しました", id.cyan());
            if let Some(volume_id) = volume_id {
                println!("  ✓ ボリューム {} を削除しました", volume_id.cyan());
            }
            println!("  ✓ 状態ファイルを削除しました");
        }
        Outcome::NothingTracked => println!("  ℹ 追跡中のインスタンスはありません"),
        other => tracing::debug!(%other, "Unexpected outcome from destroy"),
    }
    Ok(())
}
