use crate::utils::{self, Context};
use colored::Colorize;
use hostflow_cloud::{CloudError, InstanceSpec, Outcome, StateStore};

pub async fn handle(ctx: &Context, spec: &InstanceSpec) -> anyhow::Result<()> {
    println!(
        "{}",
        format!("{} のインスタンスを起動中...", ctx.provider.display_name()).yellow()
    );

    let lock = ctx.store.acquire_lock().await?;
    let tracked_before = ctx.store.exists().await?;
    let result = ctx.reconciler().up(spec).await;
    lock.release().await?;

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            if let Some(id) = untracked_instance(&e, tracked_before) {
                print_untracked_notice(id, ctx.provider.display_name());
            }
            return Err(e.into());
        }
    };

    match &outcome {
        Outcome::Created(_) => println!("  ✓ 作成完了"),
        Outcome::Started(_) => println!("  ✓ 起動完了"),
        Outcome::AlreadyRunning(_) => println!("  ℹ インスタンスは既に起動しています"),
        other => tracing::debug!(%other, "Unexpected outcome from up"),
    }

    if let Some(record) = outcome.record() {
        utils::print_summary(record, &ctx.settings);
    }
    Ok(())
}

/// 作成直後の遷移に失敗し、状態ファイルに残らなかったインスタンスのID
fn untracked_instance(err: &CloudError, tracked_before: bool) -> Option<&str> {
    if tracked_before {
        return None;
    }
    err.instance_id()
}

fn print_untracked_notice(id: &str, provider: &str) {
    println!();
    println!(
        "  {} インスタンス {} は作成されましたが、状態ファイルに記録されていません",
        "⚠".yellow(),
        id.cyan().bold()
    );
    println!(
        "    次の {} は新しいインスタンスを作成します。不要なら {} 上で手動で削除してください",
        "hostflow up".cyan(),
        provider
    );
}
