use crate::utils::{self, Context};
use colored::Colorize;
use hostflow_cloud::Outcome;

pub async fn handle(ctx: Option<&Context>) -> anyhow::Result<()> {
    println!("{}", "インスタンスを停止中...".yellow());

    let Some(ctx) = ctx else {
        println!("  ℹ 追跡中のインスタンスはありません");
        return Ok(());
    };

    let lock = ctx.store.acquire_lock().await?;
    let result = ctx.reconciler().halt().await;
    lock.release().await?;

    match result? {
        Outcome::NothingTracked => println!("  ℹ 追跡中のインスタンスはありません"),
        outcome => {
            println!("  ✓ 停止完了");
            if let Some(record) = outcome.record() {
                utils::print_summary(record, &ctx.settings);
            }
        }
    }
    Ok(())
}
