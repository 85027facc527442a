use crate::utils;
use hostflow_cloud::CloudKind;
use hostflow_config::Settings;

pub async fn handle(
    cloud: Option<CloudKind>,
    settings: &Settings,
    args: &[String],
) -> anyhow::Result<()> {
    let (_, target) = utils::tracked_target(cloud, settings).await?;

    let code = hostflow_remote::open_shell(&target, args).await?;
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
