//! 采集网关进程：加载设备定义，按节拍刷新，Ctrl-C 停止。

mod bootstrap;

use gw_config::{GatewayConfig, load_devices};
use gw_sampler::Sampler;
use gw_telemetry::{init_tracing, metrics};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在），便于直接 cargo run 启动
    dotenvy::dotenv().ok();
    // 从环境变量加载运行配置
    let config = GatewayConfig::from_env()?;
    // 初始化结构化日志
    init_tracing();

    let definitions = load_devices(&config.devices_file)?;
    info!(
        devices = definitions.len(),
        file = %config.devices_file.display(),
        "device definitions loaded"
    );

    let sampler = Sampler::new(config.tick_interval());
    for device in bootstrap::build_devices(definitions, &config).await? {
        sampler.add_device(device)?;
    }

    let mut ticks = sampler.subscribe();
    sampler.start();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                break;
            }
            received = ticks.recv() => match received {
                Ok(tick) => {
                    let snapshot = metrics().snapshot();
                    debug!(
                        tick,
                        refresh_success = snapshot.device_refresh_success,
                        refresh_failure = snapshot.device_refresh_failure,
                        events_appended = snapshot.events_appended,
                        "tick completed"
                    );
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "tick listener lagged"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    sampler.shutdown().await;
    info!("gateway stopped");
    Ok(())
}
