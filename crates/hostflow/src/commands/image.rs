use crate::utils::Context;
use colored::Colorize;

pub async fn handle(ctx: &Context, name: &str, description: &str) -> anyhow::Result<()> {
    println!("{}", format!("イメージ '{}' を作成中...", name).yellow());
    println!(
        "{}",
        "  完了まで数十分かかることがあります".dimmed()
    );

    let image_id = ctx.reconciler().create_image(name, description).await?;

    println!("  ✓ イメージ作成完了");
    println!("  イメージID: {}", image_id.cyan());
    println!(
        "  {} 次回 `hostflow up --image {}` で利用できます",
        "ヒント:".bold(),
        image_id
    );
    Ok(())
}
