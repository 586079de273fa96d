use std::time::Duration;

use mobile_base::{GoalPose, MobileBaseConfig};
use mobile_base_remote::connect_mobile_base;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    const ENDPOINT: &str = "http://[::1]:50061";

    let base = connect_mobile_base(ENDPOINT, MobileBaseConfig::default()).await?;
    println!("{base}");

    println!("Utility");
    dbg!(base.model_version()?);
    dbg!(base.battery_voltage()?);
    dbg!(base.odometry()?);

    println!("Mobility");
    base.set_speed(0.1, 0.0, 0.0)?;
    let outcome = base
        .goto_async(
            GoalPose::new(0.5, 0.0, 0.0),
            Some(Duration::from_secs(5)),
            None,
        )
        .await?;
    dbg!(outcome);

    println!("Lidar");
    dbg!(base.safety().config()?);
    dbg!(base.safety().obstacle_detection_status()?);

    Ok(())
}
