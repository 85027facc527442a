use crate::utils::{self, Context};
use colored::Colorize;
use hostflow_cloud::InstancePhase;

pub async fn handle(ctx: &Context) -> anyhow::Result<()> {
    let (record, phase) = ctx.reconciler().status().await?;

    println!(
        "{}",
        format!("{} のインスタンス", ctx.provider.display_name()).bold()
    );
    let marker = match phase {
        InstancePhase::Running => "●".green(),
        InstancePhase::Stopped | InstancePhase::Terminated => "○".red(),
        InstancePhase::Failed => "✗".red(),
        _ => "◐".yellow(),
    };
    println!("  {} {} ({})", marker, phase, record.cloud_kind);
    if let Some(volume_id) = &record.volume_id {
        println!("  ボリューム: {}", volume_id.cyan());
    }
    utils::print_summary(&record, &ctx.settings);
    Ok(())
}
