fn main() -> Result<(), Box<dyn std::error::Error>> {
    // builds shouldn't depend on a system protoc
    std::env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path()?);

    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .compile_protos(&["proto/openolt.proto", "proto/tech_profile.proto"], &["proto"])?;

    Ok(())
}
