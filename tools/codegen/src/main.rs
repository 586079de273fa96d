//! Regenerates `mobile-base-remote/src/generated` from the protobuf
//! definitions. Requires `protoc`.

use std::{
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use anyhow::Result;
use fs_err as fs;

fn main() -> Result<()> {
    let mut workspace_root = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    workspace_root.pop(); // codegen
    workspace_root.pop(); // tools
    gen_grpc(&workspace_root)?;
    Ok(())
}

fn gen_grpc(workspace_root: &Path) -> Result<()> {
    let proto_dir = &workspace_root.join("mobile-base-remote/proto");
    let out_dir = &workspace_root.join("mobile-base-remote/src/generated");
    fs::create_dir_all(out_dir)?;
    tonic_build::configure()
        .build_client(true)
        .build_server(true)
        .out_dir(out_dir)
        .compile_protos(&[proto_dir.join("mobile_base.proto")], &[proto_dir])?;

    let path = &out_dir.join("mobile_base.rs");
    // Ignore any errors.
    let _ = Command::new("rustfmt")
        .arg("--edition=2021")
        .arg(path)
        .stderr(Stdio::null())
        .status();
    println!("generated {}", path.display());
    Ok(())
}
