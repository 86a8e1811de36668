use std::{env, path::PathBuf};

fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR set by cargo"));
    let descriptor_path = out_dir.join("test_messages.bin");

    prost_build::Config::new()
        .file_descriptor_set_path(&descriptor_path)
        .compile_protos(&["proto/test_messages.proto"], &["proto/"])
        .expect("compiling test_messages.proto");

    println!("cargo:rerun-if-changed=proto/test_messages.proto");
}
