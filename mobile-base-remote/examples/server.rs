use mobile_base::{DummyLidar, DummyMobility, DummyUtility};
use mobile_base_remote::serve_mobile_base;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let addr = "[::1]:50061".parse()?;
    println!("serving a dummy mobile base on {addr}");
    serve_mobile_base(
        DummyUtility::new(),
        DummyMobility::new(),
        DummyLidar::new(),
        addr,
    )
    .await?;
    Ok(())
}
